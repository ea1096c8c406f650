/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Socket initiator: connects to counterparties, sends the first Logon
//! and reconnects on a fixed interval until stopped.

use crate::acceptor::SessionRegistry;
use crate::connection::run_connection;
use bytes::BytesMut;
use ferrofix_session::Session;
use ferrofix_transport::FixFrameCodec;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{info, warn};

/// Connects sessions outward and keeps them connected.
pub struct SocketInitiator {
    registry: Arc<SessionRegistry>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    reconnect_interval: Duration,
}

impl SocketInitiator {
    /// Creates an initiator with a 5-second reconnect interval.
    #[must_use]
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            registry: Arc::new(SessionRegistry::new()),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
            reconnect_interval: Duration::from_secs(5),
        }
    }

    /// Sets the pause between reconnect attempts.
    #[must_use]
    pub const fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
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

    /// Starts a connect loop for every registered session.
    pub fn start(&self) {
        for session in self.registry.all() {
            let shutdown = self.shutdown_tx.subscribe();
            let reconnect = self.reconnect_interval;
            let handle = tokio::spawn(async move {
                connect_loop(session, shutdown, reconnect).await;
            });
            self.tasks.lock().push(handle);
        }
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

impl Default for SocketInitiator {
    fn default() -> Self {
        Self::new()
    }
}

/// Connects, logs on, drives the connection, and retries after a pause
/// until shutdown.
async fn connect_loop(
    session: Arc<tokio::sync::Mutex<Session>>,
    mut shutdown: watch::Receiver<bool>,
    reconnect_interval: Duration,
) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        let addr = {
            let session = session.lock().await;
            let config = session.config();
            let (Some(host), Some(port)) =
                (config.socket_connect_host.clone(), config.socket_connect_port)
            else {
                warn!(session = %session.session_id(), "initiator session has no connect address");
                return;
            };
            format!("{host}:{port}")
        };

        match TcpStream::connect(&addr).await {
            Ok(stream) => {
                info!(%addr, "connected");
                let (rd, mut wr) = stream.into_split();

                // first Logon goes out before any reads
                let outbound = {
                    let mut session = session.lock().await;
                    if let Err(err) = session.logon(Instant::now()).await {
                        warn!(error = %err, "logon failed");
                        return;
                    }
                    session.take_outbound()
                };
                let mut write_failed = false;
                for frame in outbound {
                    if wr.write_all(&frame).await.is_err() {
                        write_failed = true;
                        break;
                    }
                }
                if !write_failed {
                    run_connection(
                        rd,
                        wr,
                        BytesMut::with_capacity(8 * 1024),
                        FixFrameCodec::new(),
                        Arc::clone(&session),
                        shutdown.clone(),
                        None,
                    )
                    .await;
                }
            }
            Err(err) => {
                warn!(%addr, error = %err, "connect failed");
            }
        }

        if *shutdown.borrow() {
            return;
        }
        tokio::select! {
            () = sleep(reconnect_interval) => {}
            _ = shutdown.changed() => return,
        }
    }
}
