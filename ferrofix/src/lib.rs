/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # Ferrofix
//!
//! A FIX protocol engine for Rust.
//!
//! Ferrofix encodes, decodes, validates and exchanges FIX 4.x/5.x
//! messages over TCP, maintaining per-session state (sequence numbers,
//! logon, resend, heartbeat) on top of a pluggable message store.
//!
//! ## Features
//!
//! - **Dictionary-driven codec**: repeating groups and length-prefixed
//!   data fields parse per the FIX data dictionary
//! - **Full session layer**: logon/logout, heartbeat and test-request
//!   liveness, gap detection, resend with gap fill, sequence reset,
//!   session-day boundaries
//! - **Durable sends**: outbound messages hit the store before the wire
//! - **Async engine**: tokio acceptor and initiator with one task per
//!   session
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ferrofix::prelude::*;
//! use std::sync::Arc;
//!
//! let sid = SessionId::new("FIX.4.2", "SERVER", "CLIENT").unwrap();
//! let config = SessionConfig::new(sid, ConnectionType::Acceptor);
//! let dictionary = Arc::new(Dictionary::session_defaults(Version::Fix42));
//! let session = Session::new(
//!     config,
//!     dictionary,
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(NullApplication),
//! );
//!
//! let acceptor = SocketAcceptor::bind("0.0.0.0:9876").await?;
//! acceptor.add_session(session).await;
//! acceptor.start();
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`]: field primitives, field maps, messages, errors
//! - [`dictionary`]: FIX specification schema, XML loading, validation
//! - [`tagvalue`]: tag=value wire encoding and decoding
//! - [`session`]: session layer protocol implementation
//! - [`store`]: message persistence contract
//! - [`transport`]: TCP framing
//! - [`engine`]: acceptor/initiator lifecycle

pub mod core {
    //! Field primitives, field maps, messages and errors.
    pub use ferrofix_core::*;
}

pub mod dictionary {
    //! FIX specification schema, XML loading and validation.
    pub use ferrofix_dictionary::*;
}

pub mod tagvalue {
    //! Tag=value wire encoding and decoding.
    pub use ferrofix_tagvalue::*;
}

pub mod session {
    //! Session layer protocol implementation.
    pub use ferrofix_session::*;
}

pub mod store {
    //! Message persistence contract.
    pub use ferrofix_store::*;
}

pub mod transport {
    //! TCP framing.
    pub use ferrofix_transport::*;
}

pub mod engine {
    //! Acceptor/initiator lifecycle.
    pub use ferrofix_engine::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Core types
    pub use ferrofix_core::{
        CompId, ConvertError, DecodeError, EncodeError, Field, FieldMap, FixError, Message,
        MsgType, Result, SeqNum, SessionError, SessionId, StoreError, UtcTimestamp,
    };

    // Dictionary
    pub use ferrofix_dictionary::{
        Dictionary, FieldDef, FieldType, GroupDef, MessageDef, ValidationError, Validator, Version,
    };

    // Tag-value codec
    pub use ferrofix_tagvalue::{MessageDecoder, MessageEncoder, calculate_checksum};

    // Session
    pub use ferrofix_session::{
        Application, ConnectionType, DoNotSend, FromAdminError, FromAppError, HeartbeatClock,
        NullApplication, Session, SessionConfig, SessionSchedule, SessionState, Settings,
    };

    // Store
    pub use ferrofix_store::{MemoryStore, MessageStore};

    // Transport
    pub use ferrofix_transport::{FixFrameCodec, FrameError};

    // Engine
    pub use ferrofix_engine::{SessionRegistry, SocketAcceptor, SocketInitiator};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_imports() {
        let _seq = SeqNum::new(1);
        let _ts = UtcTimestamp::now();
        let _mt = MsgType::Logon;
    }

    #[test]
    fn test_version_mapping() {
        assert_eq!(Version::Fix42.begin_string(), "FIX.4.2");
        assert_eq!(Version::Fix50.appl_ver_id(), Some("9"));
    }
}
