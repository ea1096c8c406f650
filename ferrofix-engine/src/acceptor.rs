/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Socket acceptor: listens for counterparty connections and routes
//! each one to its session by the CompIDs on the first inbound frame.

use crate::connection::{peer_session_id, run_connection};
use bytes::BytesMut;
use ferrofix_core::types::SessionId;
use ferrofix_session::Session;
use ferrofix_transport::FixFrameCodec;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::codec::Decoder;
use tracing::{error, info, warn};

/// The set of sessions an acceptor or initiator drives.
///
/// The lock is held only for membership changes and lookups; all
/// session state transitions happen on the owning connection task.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, Arc<tokio::sync::Mutex<Session>>>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session under its identity.
    pub fn insert(&self, session: Session) -> Arc<tokio::sync::Mutex<Session>> {
        let sid = session.session_id().clone();
        let session = Arc::new(tokio::sync::Mutex::new(session));
        self.sessions.lock().insert(sid, Arc::clone(&session));
        session
    }

    /// Looks up a session by identity.
    #[must_use]
    pub fn get(&self, sid: &SessionId) -> Option<Arc<tokio::sync::Mutex<Session>>> {
        self.sessions.lock().get(sid).cloned()
    }

    /// Removes a session.
    pub fn remove(&self, sid: &SessionId) -> Option<Arc<tokio::sync::Mutex<Session>>> {
        self.sessions.lock().remove(sid)
    }

    /// Snapshot of all registered sessions.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<tokio::sync::Mutex<Session>>> {
        self.sessions.lock().values().cloned().collect()
    }

    /// Number of registered sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// True when no sessions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

/// Accepts counterparty connections and dispatches them to sessions.
pub struct SocketAcceptor {
    local_addr: SocketAddr,
    listener: Mutex<Option<TcpListener>>,
    registry: Arc<SessionRegistry>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl SocketAcceptor {
    /// Binds the listening socket.
    ///
    /// # Errors
    /// Propagates the bind failure.
    pub async fn bind(addr: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            local_addr,
            listener: Mutex::new(Some(listener)),
            registry: Arc::new(SessionRegistry::new()),
            shutdown_tx,
            tasks: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// The bound listen address.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The session registry.
    #[must_use]
    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }

    /// Registers a session and reports its creation to the application.
    pub async fn add_session(&self, session: Session) {
        session.notify_created().await;
        info!(session = %session.session_id(), "session registered");
        self.registry.insert(session);
    }

    /// Starts the accept loop.
    ///
    /// # Panics
    /// Panics if called twice; the listener is consumed on first start.
    pub fn start(&self) {
        let listener = self
            .listener
            .lock()
            .take()
            .expect("acceptor already started");
        let registry = Arc::clone(&self.registry);
        let shutdown_rx = self.shutdown_tx.subscribe();
        let tasks = Arc::clone(&self.tasks);
        info!(addr = %self.local_addr, "acceptor listening");

        let accept_tasks = Arc::clone(&self.tasks);
        let handle = tokio::spawn(async move {
            let mut shutdown = shutdown_rx.clone();
            loop {
                tokio::select! {
                    accepted = listener.accept() => {
                        match accepted {
                            Ok((stream, addr)) => {
                                info!(%addr, "connection accepted");
                                let registry = Arc::clone(&registry);
                                let shutdown = shutdown_rx.clone();
                                let handle = tokio::spawn(async move {
                                    accept_connection(stream, registry, shutdown).await;
                                });
                                accept_tasks.lock().push(handle);
                            }
                            Err(err) => {
                                error!(error = %err, "accept failed");
                                break;
                            }
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }
        });
        tasks.lock().push(handle);
    }

    /// Requests shutdown: each connection sends a Logout, waits its
    /// grace window and closes.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Waits for every connection task to exit.
    pub async fn join(&self) {
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
        for handle in handles {
            let _ = handle.await;
        }
    }
}

/// Reads the first frame, routes it to the owning session, then hands
/// the connection over to the session loop.
async fn accept_connection(
    stream: TcpStream,
    registry: Arc<SessionRegistry>,
    shutdown: watch::Receiver<bool>,
) {
    let (mut rd, wr) = stream.into_split();
    let mut codec = FixFrameCodec::new();
    let mut buf = BytesMut::with_capacity(8 * 1024);

    let first_frame = loop {
        match codec.decode(&mut buf) {
            Ok(Some(frame)) => break frame,
            Ok(None) => match rd.read_buf(&mut buf).await {
                Ok(0) | Err(_) => {
                    warn!("connection closed before a complete frame arrived");
                    return;
                }
                Ok(_) => {}
            },
            Err(err) => {
                warn!(error = %err, "unframeable connection dropped");
                return;
            }
        }
    };

    let Some(sid) = peer_session_id(&first_frame) else {
        warn!("first frame carries no session identity, dropping");
        return;
    };
    let Some(session) = registry.get(&sid) else {
        warn!(session = %sid, "no session registered for connection");
        return;
    };

    run_connection(rd, wr, buf, codec, session, shutdown, Some(first_frame)).await;
}
