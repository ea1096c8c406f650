/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FIX message representation.
//!
//! A [`Message`] is three [`FieldMap`]s (header, body, trailer) plus a
//! parse [`MessageStatus`]. The header always serializes its
//! `BeginString`, `BodyLength`, `MsgType` prefix first; the trailer
//! serializes `CheckSum` last.

use crate::fieldmap::{FieldMap, FieldOrder};
use crate::types::tags;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// FIX message types relevant to the session layer, with a `Custom`
/// fallback for everything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MsgType {
    /// Heartbeat (0) - Session level.
    #[default]
    Heartbeat,
    /// Test Request (1) - Session level.
    TestRequest,
    /// Resend Request (2) - Session level.
    ResendRequest,
    /// Reject (3) - Session level.
    Reject,
    /// Sequence Reset (4) - Session level.
    SequenceReset,
    /// Logout (5) - Session level.
    Logout,
    /// Logon (A) - Session level.
    Logon,
    /// Execution Report (8).
    ExecutionReport,
    /// Order Cancel Reject (9).
    OrderCancelReject,
    /// New Order Single (D).
    NewOrderSingle,
    /// Order Cancel Request (F).
    OrderCancelRequest,
    /// Order Cancel/Replace Request (G).
    OrderCancelReplaceRequest,
    /// Quote Request (R).
    QuoteRequest,
    /// Quote (S).
    Quote,
    /// Market Data Request (V).
    MarketDataRequest,
    /// Market Data Snapshot/Full Refresh (W).
    MarketDataSnapshotFullRefresh,
    /// Market Data Incremental Refresh (X).
    MarketDataIncrementalRefresh,
    /// Business Message Reject (j).
    BusinessMessageReject,
    /// Any other message type.
    Custom(String),
}

impl std::str::FromStr for MsgType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "0" => Self::Heartbeat,
            "1" => Self::TestRequest,
            "2" => Self::ResendRequest,
            "3" => Self::Reject,
            "4" => Self::SequenceReset,
            "5" => Self::Logout,
            "A" => Self::Logon,
            "8" => Self::ExecutionReport,
            "9" => Self::OrderCancelReject,
            "D" => Self::NewOrderSingle,
            "F" => Self::OrderCancelRequest,
            "G" => Self::OrderCancelReplaceRequest,
            "R" => Self::QuoteRequest,
            "S" => Self::Quote,
            "V" => Self::MarketDataRequest,
            "W" => Self::MarketDataSnapshotFullRefresh,
            "X" => Self::MarketDataIncrementalRefresh,
            "j" => Self::BusinessMessageReject,
            other => Self::Custom(other.to_string()),
        })
    }
}

impl MsgType {
    /// The wire value of this message type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Heartbeat => "0",
            Self::TestRequest => "1",
            Self::ResendRequest => "2",
            Self::Reject => "3",
            Self::SequenceReset => "4",
            Self::Logout => "5",
            Self::Logon => "A",
            Self::ExecutionReport => "8",
            Self::OrderCancelReject => "9",
            Self::NewOrderSingle => "D",
            Self::OrderCancelRequest => "F",
            Self::OrderCancelReplaceRequest => "G",
            Self::QuoteRequest => "R",
            Self::Quote => "S",
            Self::MarketDataRequest => "V",
            Self::MarketDataSnapshotFullRefresh => "W",
            Self::MarketDataIncrementalRefresh => "X",
            Self::BusinessMessageReject => "j",
            Self::Custom(s) => s.as_str(),
        }
    }

    /// True for the administrative set `{0, 1, 2, 3, 4, 5, A}`.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Self::Heartbeat
                | Self::TestRequest
                | Self::ResendRequest
                | Self::Reject
                | Self::SequenceReset
                | Self::Logout
                | Self::Logon
        )
    }

    /// True for application messages.
    #[must_use]
    pub fn is_app(&self) -> bool {
        !self.is_admin()
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// True when a MsgType wire value names an administrative message.
#[must_use]
pub fn is_admin_msg_type(value: &[u8]) -> bool {
    matches!(value, b"0" | b"1" | b"2" | b"3" | b"4" | b"5" | b"A")
}

/// Parse status recorded while decoding a message.
///
/// Flags accumulate; `error_position` records the field index of the
/// first out-of-order tag, `offending` retains the raw bytes of a field
/// whose declared data length disagreed with the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageStatus {
    flags: u8,
    error_position: u32,
    offending: Option<Bytes>,
}

impl MessageStatus {
    /// A tag arrived out of its required order.
    pub const TAG_OUT_OF_ORDER: u8 = 0b0001;
    /// A tag was not a valid positive integer.
    pub const MALFORMED_TAG: u8 = 0b0010;
    /// A length-prefixed field did not end where its length declared.
    pub const DATA_LENGTH_MISMATCH: u8 = 0b0100;

    /// True when no status flag is set.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.flags == 0
    }

    /// True when the given flag bit is set.
    #[must_use]
    pub const fn has(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    /// Records an out-of-order tag at the given field position; only the
    /// first position is kept.
    pub fn mark_out_of_order(&mut self, position: u32) {
        if !self.has(Self::TAG_OUT_OF_ORDER) {
            self.error_position = position;
        }
        self.flags |= Self::TAG_OUT_OF_ORDER;
    }

    /// Records a malformed tag.
    pub fn mark_malformed_tag(&mut self) {
        self.flags |= Self::MALFORMED_TAG;
    }

    /// Records a data-length mismatch, retaining the raw field bytes for
    /// error reporting.
    pub fn mark_data_length_mismatch(&mut self, raw: Bytes) {
        self.flags |= Self::DATA_LENGTH_MISMATCH;
        self.offending = Some(raw);
    }

    /// Field position of the first out-of-order tag.
    #[must_use]
    pub const fn error_position(&self) -> u32 {
        self.error_position
    }

    /// Raw bytes of the field behind a data-length mismatch.
    #[must_use]
    pub fn offending(&self) -> Option<&Bytes> {
        self.offending.as_ref()
    }
}

/// A FIX message: header, body and trailer field maps plus parse status.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Standard header; serializes `8, 9, 35` first.
    pub header: FieldMap,
    /// Message body.
    pub body: FieldMap,
    /// Standard trailer; serializes `10` last.
    pub trailer: FieldMap,
    status: MessageStatus,
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

impl Message {
    /// Creates an empty message with correctly ordered header and
    /// trailer maps.
    #[must_use]
    pub fn new() -> Self {
        Self {
            header: FieldMap::with_order(FieldOrder::Header),
            body: FieldMap::new(),
            trailer: FieldMap::with_order(FieldOrder::Trailer),
            status: MessageStatus::default(),
        }
    }

    /// Creates a message of the given type.
    #[must_use]
    pub fn with_msg_type(msg_type: &MsgType) -> Self {
        let mut msg = Self::new();
        msg.header.set_str(tags::MSG_TYPE, msg_type.as_str());
        msg
    }

    /// Creates a message from already-populated maps and status.
    #[must_use]
    pub fn from_parts(
        header: FieldMap,
        body: FieldMap,
        trailer: FieldMap,
        status: MessageStatus,
    ) -> Self {
        Self {
            header,
            body,
            trailer,
            status,
        }
    }

    /// The message type, when the header carries one.
    #[must_use]
    pub fn msg_type(&self) -> Option<MsgType> {
        self.header
            .get_str(tags::MSG_TYPE)
            .map(|s| s.parse().unwrap_or(MsgType::Custom(s.to_string())))
    }

    /// The MsgSeqNum (34), when present and valid.
    #[must_use]
    pub fn seq_num(&self) -> Option<u64> {
        self.header.get_uint(tags::MSG_SEQ_NUM).ok()
    }

    /// True when the MsgType is in the administrative set. Messages with
    /// no MsgType classify as not-admin.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.header
            .get_field(tags::MSG_TYPE)
            .is_some_and(|f| is_admin_msg_type(f.value()))
    }

    /// True when PossDupFlag (43) is `Y`.
    #[must_use]
    pub fn poss_dup(&self) -> bool {
        self.header.get_bool(tags::POSS_DUP_FLAG).unwrap_or(false)
    }

    /// The parse status.
    #[must_use]
    pub const fn status(&self) -> &MessageStatus {
        &self.status
    }

    /// Mutable access to the parse status.
    pub fn status_mut(&mut self) -> &mut MessageStatus {
        &mut self.status
    }
}
