/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # Ferrofix Session
//!
//! FIX session layer protocol implementation for the ferrofix engine.
//!
//! This crate provides:
//! - **[`Session`]**: the sans-I/O per-session state machine (logon,
//!   heartbeat, gap recovery, resend, sequence reset, logout)
//! - **[`HeartbeatClock`]**: externally-ticked liveness timers
//! - **[`SessionSchedule`]**: session-day boundaries
//! - **[`Application`]**: the upward callback interface
//! - **Configuration**: [`Settings`] and [`SessionConfig`]

pub mod application;
pub mod config;
pub mod heartbeat;
pub mod schedule;
pub mod session;
pub mod settings;

pub use application::{Application, DoNotSend, FromAdminError, FromAppError, NullApplication};
pub use config::{ConnectionType, SessionConfig};
pub use heartbeat::{HeartbeatAction, HeartbeatClock};
pub use schedule::SessionSchedule;
pub use session::{Session, SessionState};
pub use settings::Settings;
