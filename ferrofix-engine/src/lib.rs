/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # Ferrofix Engine
//!
//! Connection lifecycle for the ferrofix FIX engine.
//!
//! This crate provides:
//! - **[`SocketAcceptor`]**: listens and routes inbound connections to
//!   their sessions by CompIDs
//! - **[`SocketInitiator`]**: connects outward, logs on and reconnects
//! - **[`SessionRegistry`]**: the mutex-guarded session membership set
//!
//! The [`Application`] callback interface is re-exported from the
//! session crate.

mod connection;

pub mod acceptor;
pub mod initiator;

pub use acceptor::{SessionRegistry, SocketAcceptor};
pub use ferrofix_session::{
    Application, DoNotSend, FromAdminError, FromAppError, NullApplication,
};
pub use initiator::SocketInitiator;

#[cfg(test)]
mod tests {
    use super::*;
    use ferrofix_core::types::SessionId;
    use ferrofix_dictionary::{Dictionary, Version};
    use ferrofix_session::{ConnectionType, Session, SessionConfig};
    use ferrofix_store::MemoryStore;
    use std::sync::Arc;
    use std::time::Duration;

    fn dictionary() -> Arc<Dictionary> {
        Arc::new(Dictionary::session_defaults(Version::Fix42))
    }

    fn make_session(
        sender: &str,
        target: &str,
        connection_type: ConnectionType,
        connect_to: Option<u16>,
    ) -> Session {
        let sid = SessionId::new("FIX.4.2", sender, target).unwrap();
        let mut config = SessionConfig::new(sid, connection_type);
        config.logout_grace = Duration::from_millis(100);
        if let Some(port) = connect_to {
            config.socket_connect_host = Some("127.0.0.1".to_string());
            config.socket_connect_port = Some(port);
        }
        Session::new(
            config,
            dictionary(),
            Arc::new(MemoryStore::new()),
            Arc::new(NullApplication),
        )
    }

    #[test]
    fn test_registry_membership() {
        let registry = SessionRegistry::new();
        assert!(registry.is_empty());

        let session = make_session("A", "B", ConnectionType::Acceptor, None);
        let sid = session.session_id().clone();
        registry.insert(session);

        assert_eq!(registry.len(), 1);
        assert!(registry.get(&sid).is_some());
        assert!(registry.get(&sid.reversed()).is_none());

        registry.remove(&sid);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_logon_handshake_over_tcp() {
        let acceptor = SocketAcceptor::bind("127.0.0.1:0").await.unwrap();
        let port = acceptor.local_addr().port();
        acceptor
            .add_session(make_session("SERVER", "CLIENT", ConnectionType::Acceptor, None))
            .await;
        acceptor.start();

        let initiator = SocketInitiator::new().with_reconnect_interval(Duration::from_millis(200));
        initiator
            .add_session(make_session(
                "CLIENT",
                "SERVER",
                ConnectionType::Initiator,
                Some(port),
            ))
            .await;
        initiator.start();

        let client_sid = SessionId::new("FIX.4.2", "CLIENT", "SERVER").unwrap();
        let server_sid = SessionId::new("FIX.4.2", "SERVER", "CLIENT").unwrap();
        let client = initiator.registry().get(&client_sid).unwrap();
        let server = acceptor.registry().get(&server_sid).unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let logged_on =
                client.lock().await.is_logged_on() && server.lock().await.is_logged_on();
            if logged_on {
                break;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "logon handshake did not complete"
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        initiator.stop();
        acceptor.stop();
        initiator.join().await;
        acceptor.join().await;
    }
}
