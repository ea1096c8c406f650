/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Tokio codec for FIX message framing.
//!
//! Splits a TCP byte stream into complete FIX messages by reading the
//! `BodyLength (9)` prefix and locating the `10=NNN<SOH>` trailer. The
//! framed bytes are handed to the message decoder untouched; checksum
//! verification happens there.

use bytes::{BufMut, BytesMut};
use memchr::memchr;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// SOH delimiter.
const SOH: u8 = 0x01;

/// Wire length of the trailer field `10=NNN<SOH>`.
const TRAILER_LEN: usize = 7;

/// Errors that can occur during framing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Stream does not start with `8=`.
    #[error("invalid begin string: message must start with 8=")]
    InvalidBeginString,

    /// The second field is not `9=`.
    #[error("missing body length field (tag 9)")]
    MissingBodyLength,

    /// The BodyLength value is not a decimal number.
    #[error("invalid body length value")]
    InvalidBodyLength,

    /// The bytes where `10=NNN<SOH>` should sit are something else.
    #[error("malformed trailer: expected 10=NNN<SOH>")]
    MalformedTrailer,

    /// Message exceeds the maximum size.
    #[error("message too large: {size} bytes exceeds maximum {max_size}")]
    MessageTooLarge {
        /// Computed message size.
        size: usize,
        /// Maximum allowed size.
        max_size: usize,
    },

    /// I/O error.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Tokio codec producing one complete FIX message per frame.
#[derive(Debug, Clone)]
pub struct FixFrameCodec {
    max_message_size: usize,
}

impl FixFrameCodec {
    /// Creates a codec with a 1 MiB frame limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_message_size: 1024 * 1024,
        }
    }

    /// Sets the maximum frame size.
    #[must_use]
    pub const fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }
}

impl Default for FixFrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FixFrameCodec {
    type Item = BytesMut;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // shortest plausible frame: 8=FIX.4.x|9=N|35=0|10=NNN|
        if src.len() < 20 {
            return Ok(None);
        }
        if &src[0..2] != b"8=" {
            return Err(FrameError::InvalidBeginString);
        }

        let Some(first_soh) = memchr(SOH, src) else {
            return Ok(None);
        };

        let body_len_start = first_soh + 1;
        if src.len() < body_len_start + 2 {
            return Ok(None);
        }
        if &src[body_len_start..body_len_start + 2] != b"9=" {
            return Err(FrameError::MissingBodyLength);
        }
        let Some(rel_soh) = memchr(SOH, &src[body_len_start..]) else {
            return Ok(None);
        };
        let body_len_soh = body_len_start + rel_soh;

        let body_length: usize = std::str::from_utf8(&src[body_len_start + 2..body_len_soh])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(FrameError::InvalidBodyLength)?;

        // BodyLength counts from after its own SOH up to the `1` of 10=
        let total_length = body_len_soh + 1 + body_length + TRAILER_LEN;
        if total_length > self.max_message_size {
            return Err(FrameError::MessageTooLarge {
                size: total_length,
                max_size: self.max_message_size,
            });
        }
        if src.len() < total_length {
            src.reserve(total_length - src.len());
            return Ok(None);
        }

        let trailer = &src[total_length - TRAILER_LEN..total_length];
        if &trailer[0..3] != b"10="
            || trailer[6] != SOH
            || !trailer[3..6].iter().all(u8::is_ascii_digit)
        {
            return Err(FrameError::MalformedTrailer);
        }

        Ok(Some(src.split_to(total_length)))
    }
}

impl Encoder<&[u8]> for FixFrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len());
        dst.put_slice(item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrofix_tagvalue::calculate_checksum;

    fn make_message(body: &str) -> Vec<u8> {
        let header = format!("8=FIX.4.2\x019={}\x01", body.len());
        let without_checksum = format!("{header}{body}");
        let checksum = calculate_checksum(without_checksum.as_bytes());
        format!("{without_checksum}10={checksum:03}\x01").into_bytes()
    }

    #[test]
    fn test_decode_complete_message() {
        let mut codec = FixFrameCodec::new();
        let msg = make_message("35=0\x0134=2\x01");
        let mut buf = BytesMut::from(&msg[..]);

        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.as_ref(), msg.as_slice());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_incomplete_returns_none() {
        let mut codec = FixFrameCodec::new();
        let msg = make_message("35=0\x0134=2\x01");
        let mut buf = BytesMut::from(&msg[..msg.len() - 5]);

        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        // buffered bytes stay put for the next read
        assert_eq!(buf.len(), msg.len() - 5);
    }

    #[test]
    fn test_decode_two_pipelined_messages() {
        let mut codec = FixFrameCodec::new();
        let m1 = make_message("35=0\x0134=2\x01");
        let m2 = make_message("35=1\x0134=3\x01112=PING\x01");
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&m1);
        buf.extend_from_slice(&m2);

        let f1 = codec.decode(&mut buf).unwrap().unwrap();
        let f2 = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(f1.as_ref(), m1.as_slice());
        assert_eq!(f2.as_ref(), m2.as_slice());
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_decode_message_with_embedded_soh_in_data() {
        // framing relies on BodyLength, so an embedded SOH in a data
        // field does not split the frame
        let mut codec = FixFrameCodec::new();
        let msg = make_message("35=A\x0195=5\x0196=AB\x01CD\x01");
        let mut buf = BytesMut::from(&msg[..]);

        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.as_ref(), msg.as_slice());
    }

    #[test]
    fn test_decode_rejects_bad_begin_string() {
        let mut codec = FixFrameCodec::new();
        let mut buf = BytesMut::from(&b"9=FIX.4.2\x019=5\x0135=0\x0110=000\x01"[..]);
        assert_eq!(
            codec.decode(&mut buf).unwrap_err(),
            FrameError::InvalidBeginString
        );
    }

    #[test]
    fn test_decode_rejects_bad_body_length() {
        let mut codec = FixFrameCodec::new();
        let mut buf = BytesMut::from(&b"8=FIX.4.2\x019=abc\x0135=0\x0110=000\x01"[..]);
        assert_eq!(
            codec.decode(&mut buf).unwrap_err(),
            FrameError::InvalidBodyLength
        );
    }

    #[test]
    fn test_decode_rejects_malformed_trailer() {
        let mut codec = FixFrameCodec::new();
        // BodyLength points at bytes that are not 10=NNN|
        let mut buf = BytesMut::from(&b"8=FIX.4.2\x019=5\x0135=0\x0158=xxxxxxx\x01"[..]);
        assert_eq!(
            codec.decode(&mut buf).unwrap_err(),
            FrameError::MalformedTrailer
        );
    }

    #[test]
    fn test_decode_respects_max_size() {
        let mut codec = FixFrameCodec::new().with_max_message_size(32);
        let msg = make_message("35=0\x0158=AAAAAAAAAAAAAAAAAAAAAAAAAAAA\x01");
        let mut buf = BytesMut::from(&msg[..]);
        assert!(matches!(
            codec.decode(&mut buf).unwrap_err(),
            FrameError::MessageTooLarge { .. }
        ));
    }

    #[test]
    fn test_encode_passthrough() {
        let mut codec = FixFrameCodec::new();
        let msg = make_message("35=0\x01");
        let mut dst = BytesMut::new();
        codec.encode(&msg[..], &mut dst).unwrap();
        assert_eq!(dst.as_ref(), msg.as_slice());
    }
}
