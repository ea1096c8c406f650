/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Per-connection transport driver.
//!
//! One task per connection: frames inbound bytes with
//! [`FixFrameCodec`], feeds them to the session, ticks the session
//! clock once a second, and flushes whatever outbound frames the
//! session queued. The session is single-writer: every state
//! transition happens on this task.

use bytes::{Bytes, BytesMut};
use ferrofix_core::types::SessionId;
use ferrofix_session::Session;
use ferrofix_transport::FixFrameCodec;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, watch};
use tokio_util::codec::Decoder;
use tracing::{debug, warn};

/// SOH delimiter.
const SOH: u8 = 0x01;

/// Extracts the session identity a framed message routes to: the
/// frame's TargetCompID is our SenderCompID and vice versa.
#[must_use]
pub(crate) fn peer_session_id(frame: &[u8]) -> Option<SessionId> {
    let mut begin_string = None;
    let mut sender = None;
    let mut target = None;
    for field in frame.split(|&b| b == SOH) {
        let mut parts = field.splitn(2, |&b| b == b'=');
        let (Some(tag), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let value = std::str::from_utf8(value).ok()?;
        match tag {
            b"8" => begin_string = Some(value),
            b"49" => sender = Some(value),
            b"56" => target = Some(value),
            _ => {}
        }
        if begin_string.is_some() && sender.is_some() && target.is_some() {
            break;
        }
    }
    SessionId::new(begin_string?, target?, sender?)
}

async fn flush(wr: &mut OwnedWriteHalf, frames: Vec<Bytes>) -> std::io::Result<()> {
    for frame in frames {
        wr.write_all(&frame).await?;
    }
    Ok(())
}

/// Feeds one frame to the session and flushes its replies. Returns
/// `false` when the connection must drop.
async fn handle_frame(
    session: &Arc<Mutex<Session>>,
    frame: &[u8],
    wr: &mut OwnedWriteHalf,
) -> bool {
    let (result, outbound) = {
        let mut session = session.lock().await;
        let result = session.on_message(frame, Instant::now()).await;
        (result, session.take_outbound())
    };
    if flush(wr, outbound).await.is_err() {
        return false;
    }
    if let Err(err) = result {
        warn!(error = %err, "session error, dropping connection");
        return false;
    }
    true
}

/// Runs one connection to completion. `initial` carries a frame the
/// caller already read while routing the connection to its session.
pub(crate) async fn run_connection(
    mut rd: OwnedReadHalf,
    mut wr: OwnedWriteHalf,
    mut buf: BytesMut,
    mut codec: FixFrameCodec,
    session: Arc<Mutex<Session>>,
    mut shutdown: watch::Receiver<bool>,
    initial: Option<BytesMut>,
) {
    if let Some(frame) = initial
        && !handle_frame(&session, &frame, &mut wr).await
    {
        session.lock().await.on_disconnect(Instant::now()).await;
        return;
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    'connection: loop {
        tokio::select! {
            read = rd.read_buf(&mut buf) => {
                match read {
                    Ok(0) | Err(_) => break 'connection,
                    Ok(_) => loop {
                        match codec.decode(&mut buf) {
                            Ok(Some(frame)) => {
                                if !handle_frame(&session, &frame, &mut wr).await {
                                    break 'connection;
                                }
                            }
                            Ok(None) => break,
                            Err(err) => {
                                warn!(error = %err, "framing failure, dropping connection");
                                break 'connection;
                            }
                        }
                    },
                }
            }
            _ = ticker.tick() => {
                let (result, outbound) = {
                    let mut session = session.lock().await;
                    let result = session.tick(Instant::now()).await;
                    (result, session.take_outbound())
                };
                if flush(&mut wr, outbound).await.is_err() || result.is_err() {
                    break 'connection;
                }
            }
            _ = shutdown.changed() => {
                // orderly shutdown: logout, flush, bounded grace, close
                let grace = {
                    let mut session = session.lock().await;
                    let grace = session.config().logout_grace;
                    if session.is_logged_on() {
                        let _ = session.logout(Some("engine stopping"), Instant::now()).await;
                    }
                    let outbound = session.take_outbound();
                    drop(session);
                    let _ = flush(&mut wr, outbound).await;
                    grace
                };
                tokio::time::sleep(grace).await;
                break 'connection;
            }
        }
    }

    debug!("connection task exiting");
    session.lock().await.on_disconnect(Instant::now()).await;
}
