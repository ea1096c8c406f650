/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Error types for the ferrofix FIX protocol engine.
//!
//! This module provides a unified error hierarchy using `thiserror` for typed,
//! domain-specific errors across all ferrofix operations.

use std::ops::Range;
use thiserror::Error;

/// Result type alias using [`FixError`] as the error type.
pub type Result<T> = std::result::Result<T, FixError>;

/// Top-level error type for all ferrofix operations.
#[derive(Debug, Error)]
pub enum FixError {
    /// Error during message decoding.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Error during message encoding.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Error in session layer operations.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Error in message store operations.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// I/O error from underlying transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reason a field value failed to convert to its typed representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertKind {
    /// Value is empty.
    Empty,
    /// A byte that should have been a decimal digit was not.
    BadDigit,
    /// Leading zero on a multi-digit integer.
    LeadingZero,
    /// Value exceeds the permitted digit count or numeric range.
    OutOfRange,
    /// Value has the wrong byte length for a fixed-width type.
    BadLength,
    /// Value does not match the type's grammar.
    BadFormat,
    /// A date or time component is outside its permitted range.
    ComponentRange,
    /// Char value outside the printable range.
    NotPrintable,
    /// Boolean value other than 'Y' or 'N'.
    NotBoolean,
}

impl std::fmt::Display for ConvertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Empty => "empty value",
            Self::BadDigit => "non-digit byte",
            Self::LeadingZero => "leading zero",
            Self::OutOfRange => "value out of range",
            Self::BadLength => "wrong length",
            Self::BadFormat => "malformed value",
            Self::ComponentRange => "date/time component out of range",
            Self::NotPrintable => "non-printable character",
            Self::NotBoolean => "expected 'Y' or 'N'",
        };
        f.write_str(s)
    }
}

/// Typed error returned by the field converters.
///
/// `span` is the byte range of the offending input, relative to the start
/// of the value being parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at {span:?}")]
pub struct ConvertError {
    /// What went wrong.
    pub kind: ConvertKind,
    /// Byte range of the offending input.
    pub span: Range<usize>,
}

impl ConvertError {
    /// Creates a converter error covering the given byte range.
    #[must_use]
    pub const fn new(kind: ConvertKind, span: Range<usize>) -> Self {
        Self { kind, span }
    }

    /// Creates a converter error pointing at a single byte.
    #[must_use]
    pub const fn at(kind: ConvertKind, pos: usize) -> Self {
        Self {
            kind,
            span: pos..pos + 1,
        }
    }
}

/// Errors that occur during FIX message decoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Message buffer is incomplete, need more data.
    #[error("incomplete message, need more data")]
    Incomplete,

    /// Invalid BeginString field (tag 8).
    #[error("invalid begin string: expected 8=FIX.x.y")]
    InvalidBeginString,

    /// Missing BodyLength field (tag 9).
    #[error("missing body length field (tag 9)")]
    MissingBodyLength,

    /// Invalid BodyLength value.
    #[error("invalid body length value")]
    InvalidBodyLength,

    /// Declared BodyLength does not match the counted bytes.
    #[error("body length mismatch: declared {declared}, counted {counted}")]
    BodyLengthMismatch {
        /// Declared BodyLength value.
        declared: usize,
        /// Counted bytes between BodyLength's SOH and the start of `10=`.
        counted: usize,
    },

    /// Missing MsgType field (tag 35).
    #[error("missing msg type field (tag 35)")]
    MissingMsgType,

    /// Missing CheckSum field (tag 10).
    #[error("missing checksum field (tag 10)")]
    MissingCheckSum,

    /// Checksum mismatch between computed and declared values.
    #[error("checksum mismatch: computed {computed}, declared {declared}")]
    ChecksumMismatch {
        /// Computed checksum value.
        computed: u8,
        /// Declared checksum value in message.
        declared: u8,
    },

    /// Tag bytes were not a valid positive integer.
    #[error("malformed tag at byte {offset}")]
    MalformedTag {
        /// Byte offset of the tag within the message.
        offset: usize,
    },

    /// A length-prefixed data field did not end where its length said.
    #[error("data length mismatch for tag {tag}: declared {declared} bytes")]
    DataLengthMismatch {
        /// Tag of the data field.
        tag: u32,
        /// Declared byte count from the preceding length field.
        declared: usize,
    },

    /// Repeating group entry count disagrees with the declared count.
    #[error("group count mismatch for tag {count_tag}: declared {declared}, found {found}")]
    GroupCountMismatch {
        /// The tag containing the group count.
        count_tag: u32,
        /// Declared number of group entries.
        declared: usize,
        /// Actual number of group entries found.
        found: usize,
    },

    /// Invalid UTF-8 in string field.
    #[error("invalid utf-8 in field: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// A field value failed typed conversion.
    #[error("conversion failed for tag {tag}: {source}")]
    Convert {
        /// The tag whose value failed to convert.
        tag: u32,
        /// The converter error.
        #[source]
        source: ConvertError,
    },

    /// Field lookup failed.
    #[error("field not found: tag {tag}")]
    FieldNotFound {
        /// The missing tag.
        tag: u32,
    },

    /// Message exceeds maximum allowed size.
    #[error("message too large: {size} bytes exceeds maximum {max_size}")]
    MessageTooLarge {
        /// Actual message size in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max_size: usize,
    },
}

/// Errors that occur during FIX message encoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Missing required field during encoding.
    #[error("missing required field: tag {tag}")]
    MissingRequiredField {
        /// The tag number of the missing field.
        tag: u32,
    },

    /// Invalid field value for encoding.
    #[error("invalid field value for tag {tag}: {reason}")]
    InvalidFieldValue {
        /// The tag number of the field.
        tag: u32,
        /// Description of why the value is invalid.
        reason: String,
    },
}

/// Errors in FIX session layer operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Session is not in the correct state for the operation.
    #[error("invalid session state: expected {expected}, current {current}")]
    InvalidState {
        /// Expected state for the operation.
        expected: String,
        /// Current session state.
        current: String,
    },

    /// Logon was rejected.
    #[error("logon rejected: {reason}")]
    LogonRejected {
        /// Reason for rejection.
        reason: String,
    },

    /// CompID or BeginString on an inbound message does not match the session.
    #[error("session identity mismatch on tag {tag}")]
    IdentityMismatch {
        /// The header tag that mismatched (8, 49 or 56).
        tag: u32,
    },

    /// Heartbeat timeout - no response to TestRequest.
    #[error("heartbeat timeout after {elapsed_ms} milliseconds")]
    HeartbeatTimeout {
        /// Elapsed time in milliseconds since last message.
        elapsed_ms: u64,
    },

    /// Sequence number too low without PossDupFlag.
    #[error("MsgSeqNum too low, expected {expected} received {received}")]
    SequenceTooLow {
        /// Minimum expected sequence number.
        expected: u64,
        /// Received sequence number.
        received: u64,
    },

    /// A message failed framing validation and the connection must drop.
    #[error("framing failure: {0}")]
    Framing(#[from] DecodeError),

    /// Session configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The transport is gone.
    #[error("disconnected")]
    Disconnected,

    /// Failure persisting an outbound message; the send did not happen.
    #[error("send aborted by store failure: {0}")]
    SendAborted(#[from] StoreError),
}

/// Errors in message store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Failed to store message.
    #[error("failed to store message seq={seq_num}: {reason}")]
    SetFailed {
        /// Sequence number of the message.
        seq_num: u64,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to retrieve messages.
    #[error("failed to retrieve messages {begin}..={end}: {reason}")]
    GetFailed {
        /// Begin of the requested range.
        begin: u64,
        /// End of the requested range.
        end: u64,
        /// Reason for failure.
        reason: String,
    },

    /// Store is corrupted.
    #[error("store corrupted: {reason}")]
    Corrupted {
        /// Description of the corruption.
        reason: String,
    },

    /// I/O error in persistent store.
    #[error("store i/o error: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_error_display() {
        let err = ConvertError::at(ConvertKind::BadDigit, 3);
        assert_eq!(err.to_string(), "non-digit byte at 3..4");
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::ChecksumMismatch {
            computed: 100,
            declared: 200,
        };
        assert_eq!(
            err.to_string(),
            "checksum mismatch: computed 100, declared 200"
        );
    }

    #[test]
    fn test_fix_error_from_decode() {
        let decode_err = DecodeError::Incomplete;
        let fix_err: FixError = decode_err.into();
        assert!(matches!(fix_err, FixError::Decode(DecodeError::Incomplete)));
    }

    #[test]
    fn test_session_error_seq_too_low_text() {
        let err = SessionError::SequenceTooLow {
            expected: 5,
            received: 2,
        };
        assert_eq!(err.to_string(), "MsgSeqNum too low, expected 5 received 2");
    }

    #[test]
    fn test_session_error_from_store() {
        let store_err = StoreError::Io("disk full".to_string());
        let session_err: SessionError = store_err.into();
        assert!(matches!(session_err, SessionError::SendAborted(_)));
    }
}
