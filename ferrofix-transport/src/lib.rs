/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # Ferrofix Transport
//!
//! TCP framing for the ferrofix engine: a tokio codec that splits the
//! byte stream into complete FIX messages using the BodyLength prefix
//! and the `10=NNN<SOH>` trailer.

pub mod codec;

pub use codec::{FixFrameCodec, FrameError};
