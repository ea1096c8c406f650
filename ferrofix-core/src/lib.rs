/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # Ferrofix Core
//!
//! Core types, field primitives and error definitions for the ferrofix
//! FIX protocol engine.
//!
//! This crate provides the building blocks used across all ferrofix crates:
//! - **Error types**: unified error handling with `thiserror`
//! - **Converters**: bit-exact parse/emit pairs for every FIX field type
//! - **FieldMap**: ordered tag/value collections with repeating groups
//! - **Message**: header/body/trailer maps plus parse status
//! - **Core types**: `SeqNum`, `CompId`, `SessionId`

pub mod convert;
pub mod error;
pub mod fieldmap;
pub mod message;
pub mod types;

pub use convert::{UtcDate, UtcTime, UtcTimestamp};
pub use error::{
    ConvertError, ConvertKind, DecodeError, EncodeError, FixError, Result, SessionError,
    StoreError,
};
pub use fieldmap::{Field, FieldMap, FieldOrder, SOH};
pub use message::{Message, MessageStatus, MsgType, is_admin_msg_type};
pub use types::{CompId, SeqNum, SessionId, tags};
