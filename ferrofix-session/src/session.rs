/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! The per-session protocol state machine.
//!
//! A [`Session`] is sans-I/O: the transport driver feeds it framed
//! inbound bytes via [`Session::on_message`], ticks it with
//! [`Session::tick`], and drains the encoded outbound frames it queues
//! with [`Session::take_outbound`]. The session-layer protocol lives here:
//! logon/logout negotiation, heartbeat liveness, sequence-gap recovery,
//! resend processing, sequence reset and the session-day boundary.
//!
//! Every outbound message is persisted to the [`MessageStore`] before
//! its bytes are released; a store failure aborts the send without
//! consuming the sequence number.

use crate::application::{Application, FromAdminError, FromAppError};
use crate::config::{ConnectionType, SessionConfig};
use crate::heartbeat::{HeartbeatAction, HeartbeatClock};
use crate::schedule::SessionSchedule;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use ferrofix_core::convert::UtcTimestamp;
use ferrofix_core::error::{DecodeError, SessionError};
use ferrofix_core::message::{Message, MsgType};
use ferrofix_core::types::{SessionId, tags};
use ferrofix_dictionary::{Dictionary, Validator};
use ferrofix_store::MessageStore;
use ferrofix_tagvalue::{MessageDecoder, MessageEncoder};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Connection state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport, or transport up but no logon exchanged.
    Disconnected,
    /// We sent a Logon and await the counterparty's.
    LogonSent,
    /// A valid Logon arrived and is being answered.
    LogonReceived,
    /// Logon exchange complete; traffic flows.
    LoggedOn,
    /// We sent a Logout and await confirmation.
    LogoutSent,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "Disconnected",
            Self::LogonSent => "LogonSent",
            Self::LogonReceived => "LogonReceived",
            Self::LoggedOn => "LoggedOn",
            Self::LogoutSent => "LogoutSent",
        };
        f.write_str(s)
    }
}

/// One FIX session: protocol state, stores and callbacks.
pub struct Session {
    config: SessionConfig,
    dictionary: Arc<Dictionary>,
    store: Arc<dyn MessageStore>,
    application: Arc<dyn Application>,
    state: SessionState,
    clock: HeartbeatClock,
    schedule: Option<SessionSchedule>,
    /// `[begin, end]` of the gap being recovered, if any.
    pending_resend: Option<(u64, u64)>,
    /// Messages received ahead of sequence, held until the gap closes.
    gap_queue: BTreeMap<u64, Message>,
    outbound: VecDeque<Bytes>,
    logon_sent_at: Option<Instant>,
    disconnect_at: Option<Instant>,
}

impl Session {
    /// Creates a session in the `Disconnected` state.
    #[must_use]
    pub fn new(
        config: SessionConfig,
        dictionary: Arc<Dictionary>,
        store: Arc<dyn MessageStore>,
        application: Arc<dyn Application>,
    ) -> Self {
        let schedule = match (config.start_time, config.end_time) {
            (Some(start), Some(end)) => Some(match (config.start_day, config.end_day) {
                (Some(sd), Some(ed)) => SessionSchedule::weekly(sd, start, ed, end),
                _ => SessionSchedule::daily(start, end),
            }),
            _ => None,
        };
        let clock = HeartbeatClock::new(config.heart_bt_int, Instant::now());
        Self {
            config,
            dictionary,
            store,
            application,
            state: SessionState::Disconnected,
            clock,
            schedule,
            pending_resend: None,
            gap_queue: BTreeMap::new(),
            outbound: VecDeque::new(),
            logon_sent_at: None,
            disconnect_at: None,
        }
    }

    /// The session identity.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.config.session_id
    }

    /// The session configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The current connection state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// True once the logon exchange completed.
    #[must_use]
    pub fn is_logged_on(&self) -> bool {
        self.state == SessionState::LoggedOn
    }

    /// The gap currently being recovered, if any.
    #[must_use]
    pub const fn pending_resend(&self) -> Option<(u64, u64)> {
        self.pending_resend
    }

    /// Drains the encoded frames waiting for the transport.
    pub fn take_outbound(&mut self) -> Vec<Bytes> {
        self.outbound.drain(..).collect()
    }

    /// Reports session creation to the application.
    pub async fn notify_created(&self) {
        self.application.on_create(&self.config.session_id).await;
    }

    /// Initiator entry point: sends the first Logon.
    ///
    /// # Errors
    /// Store failures abort the send.
    pub async fn logon(&mut self, now: Instant) -> Result<(), SessionError> {
        if self.config.reset_on_logon {
            self.store.reset().await?;
        }
        let mut msg = self.build_admin(&MsgType::Logon);
        msg.body.set_int(tags::ENCRYPT_METHOD, 0);
        msg.body
            .set_int(tags::HEART_BT_INT, self.clock.interval().as_secs() as i64);
        if self.config.reset_on_logon {
            msg.body.set_bool(tags::RESET_SEQ_NUM_FLAG, true);
        }
        self.send_message(msg, now).await?;
        self.state = SessionState::LogonSent;
        self.logon_sent_at = Some(now);
        info!(session = %self.config.session_id, "logon sent");
        Ok(())
    }

    /// Sends a Logout and starts the grace window.
    ///
    /// # Errors
    /// Store failures abort the send.
    pub async fn logout(&mut self, text: Option<&str>, now: Instant) -> Result<(), SessionError> {
        let mut msg = self.build_admin(&MsgType::Logout);
        if let Some(text) = text {
            msg.body.set_str(tags::TEXT, text);
        }
        self.send_message(msg, now).await?;
        self.state = SessionState::LogoutSent;
        self.disconnect_at = Some(now + self.config.logout_grace);
        info!(session = %self.config.session_id, "logout sent");
        Ok(())
    }

    /// Sends an application message: stamps the header, runs `to_app`,
    /// persists, then queues the bytes.
    ///
    /// # Errors
    /// Store failures abort the send and the sequence number does not
    /// advance.
    pub async fn send_app(&mut self, msg: Message, now: Instant) -> Result<(), SessionError> {
        self.send_message(msg, now).await
    }

    /// Handles one complete framed inbound message.
    ///
    /// # Errors
    /// An `Err` means the connection must drop: framing failures,
    /// identity mismatches, sequence regressions. Any queued outbound
    /// frames (Reject, Logout) should still be flushed first.
    pub async fn on_message(&mut self, raw: &[u8], now: Instant) -> Result<(), SessionError> {
        self.clock.record_received(now);

        let decoder = MessageDecoder::new(&self.dictionary);
        let msg = match decoder.decode(raw) {
            Ok(msg) => msg,
            Err(err) => {
                warn!(session = %self.config.session_id, error = %err, "framing failure");
                return Err(SessionError::Framing(err));
            }
        };
        let msg_type = msg.msg_type().ok_or(SessionError::Framing(DecodeError::MissingMsgType))?;

        self.verify_identity(&msg, now).await?;

        // ResetSeqNumFlag=Y on a Logon resets both sides before the
        // sequence compare
        if msg_type == MsgType::Logon
            && msg.body.get_bool(tags::RESET_SEQ_NUM_FLAG).unwrap_or(false)
            && (self.store.next_target_seq_num() != 1 || self.store.next_sender_seq_num() != 1)
        {
            info!(session = %self.config.session_id, "sequence reset requested by logon");
            self.store.reset().await?;
        }
        if msg_type == MsgType::Logon
            && self.config.reset_on_logon
            && self.config.connection_type == ConnectionType::Acceptor
            && self.state == SessionState::Disconnected
        {
            self.store.reset().await?;
        }

        // a hard SequenceReset (GapFillFlag != Y) applies regardless of
        // its own sequence number
        if msg_type == MsgType::SequenceReset
            && !msg.body.get_bool(tags::GAP_FILL_FLAG).unwrap_or(false)
        {
            return self.handle_hard_reset(&msg, now).await;
        }

        let Some(seq) = msg.seq_num() else {
            self.logout(Some("MsgSeqNum missing"), now).await?;
            return Err(SessionError::Framing(DecodeError::FieldNotFound {
                tag: tags::MSG_SEQ_NUM,
            }));
        };
        let expected = self.store.next_target_seq_num();

        if seq == expected {
            self.process_in_sequence(msg, now).await?;
            self.drain_gap_queue(now).await?;
            Ok(())
        } else if seq > expected {
            debug!(
                session = %self.config.session_id,
                expected, received = seq, "sequence gap detected"
            );
            // a gapped Logon still establishes the session; the gap is
            // recovered behind it
            if msg_type == MsgType::Logon {
                self.handle_logon(&msg, now).await?;
            } else {
                self.gap_queue.insert(seq, msg);
            }
            if self.pending_resend.is_none() {
                let mut resend = self.build_admin(&MsgType::ResendRequest);
                resend.body.set_uint(tags::BEGIN_SEQ_NO, expected);
                resend.body.set_uint(tags::END_SEQ_NO, 0);
                self.send_message(resend, now).await?;
                self.pending_resend = Some((expected, seq.saturating_sub(1)));
            }
            Ok(())
        } else {
            // seq < expected
            if msg.poss_dup() {
                // a replayed gap fill still moves the counter forward
                if msg_type == MsgType::SequenceReset
                    && let Ok(new_seq) = msg.body.get_uint(tags::NEW_SEQ_NO)
                    && new_seq > expected
                {
                    self.store.set_next_target_seq_num(new_seq);
                    self.drain_gap_queue(now).await?;
                    return Ok(());
                }
                debug!(
                    session = %self.config.session_id,
                    seq, expected, "dropping duplicate"
                );
                return Ok(());
            }
            let text = format!("MsgSeqNum too low, expected {expected} received {seq}");
            self.logout(Some(&text), now).await?;
            Err(SessionError::SequenceTooLow {
                expected,
                received: seq,
            })
        }
    }

    /// Drives the timers: logon deadline, logout grace, session-day
    /// boundary, heartbeat and test-request generation.
    ///
    /// # Errors
    /// An `Err` means the connection must drop.
    pub async fn tick(&mut self, now: Instant) -> Result<(), SessionError> {
        if let Some(at) = self.disconnect_at
            && now >= at
        {
            return Err(SessionError::Disconnected);
        }

        if self.state == SessionState::LogonSent
            && let Some(sent_at) = self.logon_sent_at
            && now.duration_since(sent_at) >= self.config.logon_timeout
        {
            warn!(session = %self.config.session_id, "logon timed out");
            return Err(SessionError::Disconnected);
        }

        if self.state == SessionState::LoggedOn {
            self.check_session_day(now, Utc::now()).await?;
        }

        if self.state != SessionState::LoggedOn {
            return Ok(());
        }

        match self.clock.poll(now) {
            HeartbeatAction::None => Ok(()),
            HeartbeatAction::SendHeartbeat => {
                let msg = self.build_admin(&MsgType::Heartbeat);
                self.send_message(msg, now).await
            }
            HeartbeatAction::SendTestRequest(id) => {
                let mut msg = self.build_admin(&MsgType::TestRequest);
                msg.body.set_str(tags::TEST_REQ_ID, &id);
                self.send_message(msg, now).await
            }
            HeartbeatAction::Disconnect => {
                let elapsed_ms = self.clock.interval().as_millis() as u64 * 2;
                warn!(session = %self.config.session_id, "test request unanswered");
                Err(SessionError::HeartbeatTimeout { elapsed_ms })
            }
        }
    }

    /// The transport dropped. Clears connection state and, when
    /// configured, resets sequence numbers.
    pub async fn on_disconnect(&mut self, now: Instant) {
        let was_established = !matches!(self.state, SessionState::Disconnected);
        self.state = SessionState::Disconnected;
        self.clock.reset(now);
        self.gap_queue.clear();
        self.pending_resend = None;
        self.logon_sent_at = None;
        self.disconnect_at = None;
        if self.config.reset_on_disconnect
            && let Err(err) = self.store.reset().await
        {
            warn!(session = %self.config.session_id, error = %err, "reset on disconnect failed");
        }
        if was_established {
            info!(session = %self.config.session_id, "disconnected");
            self.application.on_logout(&self.config.session_id).await;
        }
    }

    // -- inbound processing ------------------------------------------------

    /// Checks BeginString and both CompIDs against the session identity.
    async fn verify_identity(&mut self, msg: &Message, now: Instant) -> Result<(), SessionError> {
        let sid = &self.config.session_id;
        if msg.header.get_str(tags::BEGIN_STRING) != Some(sid.begin_string.as_str()) {
            warn!(session = %sid, "begin string mismatch");
            return Err(SessionError::IdentityMismatch {
                tag: tags::BEGIN_STRING,
            });
        }
        // inbound sender is our target and vice versa
        let sender_ok = msg.header.get_str(tags::SENDER_COMP_ID)
            == Some(sid.target_comp_id.as_str());
        let target_ok = msg.header.get_str(tags::TARGET_COMP_ID)
            == Some(sid.sender_comp_id.as_str());
        if sender_ok && target_ok {
            return Ok(());
        }
        let tag = if sender_ok {
            tags::TARGET_COMP_ID
        } else {
            tags::SENDER_COMP_ID
        };
        warn!(session = %sid, tag, "comp id mismatch");
        let ref_seq = msg.seq_num().unwrap_or(0);
        self.send_reject(ref_seq, 9, Some(tag), "CompID problem", now)
            .await?;
        self.store.incr_next_target_seq_num();
        Err(SessionError::IdentityMismatch { tag })
    }

    /// Handles a message whose sequence number matched expectations:
    /// validates, dispatches, advances the target counter.
    async fn process_in_sequence(
        &mut self,
        msg: Message,
        now: Instant,
    ) -> Result<(), SessionError> {
        let seq = msg.seq_num().unwrap_or(0);

        if self.config.check_latency
            && let Ok(sending_time) = msg.header.get_utc_timestamp(tags::SENDING_TIME)
            && let Some(dt) = sending_time.to_datetime()
        {
            let skew = (Utc::now() - dt).abs().to_std().unwrap_or_default();
            if skew > self.config.max_latency {
                self.send_reject(seq, 10, Some(tags::SENDING_TIME), "SendingTime accuracy problem", now)
                    .await?;
                self.store.incr_next_target_seq_num();
                return Ok(());
            }
        }

        let dictionary = Arc::clone(&self.dictionary);
        let validator = Validator::new(&dictionary)
            .check_fields_out_of_order(self.config.validate_fields_out_of_order)
            .check_fields_have_values(self.config.validate_fields_have_values)
            .check_user_defined_fields(self.config.validate_user_defined_fields);
        if let Err(err) = validator.validate(&msg) {
            debug!(session = %self.config.session_id, error = %err, "message rejected");
            self.send_reject(seq, err.reject_reason(), err.ref_tag(), &err.to_string(), now)
                .await?;
            self.store.incr_next_target_seq_num();
            return Ok(());
        }

        let msg_type = msg
            .msg_type()
            .ok_or(SessionError::Framing(DecodeError::MissingMsgType))?;

        // an acceptor's first message must be a Logon
        if self.state == SessionState::Disconnected
            && self.config.connection_type == ConnectionType::Acceptor
            && msg_type != MsgType::Logon
        {
            warn!(session = %self.config.session_id, msg_type = %msg_type, "first message is not a logon");
            let current = self.state.to_string();
            self.store.incr_next_target_seq_num();
            self.logout(Some("first message is not a logon"), now).await?;
            return Err(SessionError::InvalidState {
                expected: "Logon".to_string(),
                current,
            });
        }

        if msg_type.is_admin() {
            let application = Arc::clone(&self.application);
            if let Err(err) = application.from_admin(&msg, &self.config.session_id).await {
                return self.handle_admin_callback_error(&msg_type, err, seq, now).await;
            }
            match msg_type {
                MsgType::Logon => self.handle_logon(&msg, now).await?,
                MsgType::Heartbeat => {
                    self.clock.on_heartbeat(msg.body.get_str(tags::TEST_REQ_ID));
                }
                MsgType::TestRequest => {
                    let mut reply = self.build_admin(&MsgType::Heartbeat);
                    if let Some(id) = msg.body.get_str(tags::TEST_REQ_ID) {
                        let id = id.to_string();
                        reply.body.set_str(tags::TEST_REQ_ID, &id);
                    }
                    self.send_message(reply, now).await?;
                }
                MsgType::ResendRequest => self.handle_resend_request(&msg, now).await?,
                MsgType::SequenceReset => {
                    // gap-fill variant; the hard reset never reaches here
                    return self.handle_gap_fill(&msg, now).await;
                }
                MsgType::Logout => return self.handle_logout_received(now).await,
                MsgType::Reject => {
                    warn!(
                        session = %self.config.session_id,
                        ref_seq = msg.body.get_str(tags::REF_SEQ_NUM).unwrap_or("?"),
                        text = msg.body.get_str(tags::TEXT).unwrap_or(""),
                        "reject received"
                    );
                }
                _ => unreachable!("admin set is closed"),
            }
        } else {
            let application = Arc::clone(&self.application);
            if let Err(err) = application.from_app(&msg, &self.config.session_id).await {
                self.handle_app_callback_error(&msg, err, seq, now).await?;
            }
        }

        self.store.incr_next_target_seq_num();
        Ok(())
    }

    /// Replays gap-queued messages that became in-sequence.
    async fn drain_gap_queue(&mut self, now: Instant) -> Result<(), SessionError> {
        loop {
            let expected = self.store.next_target_seq_num();
            if let Some((_, end)) = self.pending_resend
                && expected > end
            {
                debug!(session = %self.config.session_id, "gap recovery complete");
                self.pending_resend = None;
            }
            match self.gap_queue.remove(&expected) {
                Some(queued) => self.process_in_sequence(queued, now).await?,
                None => return Ok(()),
            }
        }
    }

    async fn handle_admin_callback_error(
        &mut self,
        msg_type: &MsgType,
        err: FromAdminError,
        seq: u64,
        now: Instant,
    ) -> Result<(), SessionError> {
        if let FromAdminError::RejectLogon(reason) = &err {
            if *msg_type == MsgType::Logon {
                info!(session = %self.config.session_id, reason = %reason, "logon refused by application");
                self.store.incr_next_target_seq_num();
                self.logout(Some(reason), now).await?;
                return Err(SessionError::LogonRejected {
                    reason: reason.clone(),
                });
            }
            self.store.incr_next_target_seq_num();
            return Ok(());
        }
        self.send_reject(seq, err.reject_reason().unwrap_or(99), err.ref_tag(), &err.to_string(), now)
            .await?;
        self.store.incr_next_target_seq_num();
        Ok(())
    }

    async fn handle_app_callback_error(
        &mut self,
        msg: &Message,
        err: FromAppError,
        seq: u64,
        now: Instant,
    ) -> Result<(), SessionError> {
        match err {
            FromAppError::UnsupportedMessageType => {
                let ref_msg_type = msg
                    .header
                    .get_str(tags::MSG_TYPE)
                    .unwrap_or_default()
                    .to_string();
                let mut reject = self.build_admin(&MsgType::BusinessMessageReject);
                reject.body.set_uint(tags::REF_SEQ_NUM, seq);
                reject.body.set_str(tags::REF_MSG_TYPE, &ref_msg_type);
                // BusinessRejectReason 3 = unsupported message type
                reject.body.set_int(tags::BUSINESS_REJECT_REASON, 3);
                self.send_message(reject, now).await
            }
            other => {
                self.send_reject(
                    seq,
                    other.reject_reason().unwrap_or(99),
                    other.ref_tag(),
                    &other.to_string(),
                    now,
                )
                .await
            }
        }
    }

    /// Logon negotiation: adopt the counterparty's HeartBtInt, answer
    /// when accepting, and report logon to the application.
    async fn handle_logon(&mut self, msg: &Message, now: Instant) -> Result<(), SessionError> {
        if let Ok(interval) = msg.body.get_int(tags::HEART_BT_INT)
            && interval > 0
        {
            self.clock
                .set_interval(std::time::Duration::from_secs(interval as u64));
        }
        let reset_flag = msg.body.get_bool(tags::RESET_SEQ_NUM_FLAG).unwrap_or(false);

        match self.config.connection_type {
            ConnectionType::Acceptor => {
                self.state = SessionState::LogonReceived;
                let mut reply = self.build_admin(&MsgType::Logon);
                reply.body.set_int(tags::ENCRYPT_METHOD, 0);
                reply
                    .body
                    .set_int(tags::HEART_BT_INT, self.clock.interval().as_secs() as i64);
                if reset_flag {
                    reply.body.set_bool(tags::RESET_SEQ_NUM_FLAG, true);
                }
                self.send_message(reply, now).await?;
            }
            ConnectionType::Initiator => {
                if self.state != SessionState::LogonSent {
                    warn!(session = %self.config.session_id, "unexpected logon");
                }
                self.logon_sent_at = None;
            }
        }
        self.state = SessionState::LoggedOn;
        info!(session = %self.config.session_id, "logged on");
        self.application.on_logon(&self.config.session_id).await;
        Ok(())
    }

    /// Replays stored messages for a ResendRequest, collapsing admin
    /// messages and unstored slots into SequenceReset-GapFills and
    /// re-sending application messages with `PossDupFlag=Y` and
    /// `OrigSendingTime` preserved.
    async fn handle_resend_request(
        &mut self,
        msg: &Message,
        now: Instant,
    ) -> Result<(), SessionError> {
        let begin = msg
            .body
            .get_uint(tags::BEGIN_SEQ_NO)
            .map_err(SessionError::Framing)?;
        let end = msg
            .body
            .get_uint(tags::END_SEQ_NO)
            .map_err(SessionError::Framing)?;
        let last_sent = self.store.next_sender_seq_num().saturating_sub(1);
        let end = if end == 0 || end > last_sent { last_sent } else { end };
        if begin > end {
            return Ok(());
        }
        info!(session = %self.config.session_id, begin, end, "resend requested");

        let stored: BTreeMap<u64, Bytes> = self
            .store
            .get(begin, end)
            .await?
            .into_iter()
            .collect();
        let dictionary = Arc::clone(&self.dictionary);
        let decoder = MessageDecoder::new(&dictionary);

        let mut gap_start: Option<u64> = None;
        for seq in begin..=end {
            let resendable = stored
                .get(&seq)
                .and_then(|bytes| decoder.decode(bytes).ok())
                .filter(|stored_msg| !stored_msg.is_admin());

            match resendable {
                Some(mut original) => {
                    if let Some(start) = gap_start.take() {
                        self.push_gap_fill(start, seq)?;
                    }
                    let orig_sending_time = original
                        .header
                        .get_str(tags::SENDING_TIME)
                        .map(str::to_string);
                    original.header.set_bool(tags::POSS_DUP_FLAG, true);
                    if let Some(orig) = orig_sending_time {
                        original.header.set_str(tags::ORIG_SENDING_TIME, &orig);
                    }
                    original
                        .header
                        .set_utc_timestamp(tags::SENDING_TIME, UtcTimestamp::now());
                    let bytes = MessageEncoder::new()
                        .encode(&mut original)
                        .map_err(|e| SessionError::Configuration(e.to_string()))?;
                    self.outbound.push_back(bytes.freeze());
                }
                None => {
                    gap_start.get_or_insert(seq);
                }
            }
        }
        if let Some(start) = gap_start {
            self.push_gap_fill(start, end + 1)?;
        }
        self.clock.record_sent(now);
        Ok(())
    }

    /// Emits one SequenceReset-GapFill covering `[start, new_seq)`.
    /// Replayed traffic bypasses the store and the sender counter.
    fn push_gap_fill(&mut self, start: u64, new_seq: u64) -> Result<(), SessionError> {
        let sid = self.config.session_id.clone();
        let mut gap_fill = self.build_admin(&MsgType::SequenceReset);
        gap_fill.header.set_str(tags::BEGIN_STRING, &sid.begin_string);
        gap_fill
            .header
            .set_str(tags::SENDER_COMP_ID, sid.sender_comp_id.as_str());
        gap_fill
            .header
            .set_str(tags::TARGET_COMP_ID, sid.target_comp_id.as_str());
        gap_fill.header.set_uint(tags::MSG_SEQ_NUM, start);
        gap_fill.header.set_bool(tags::POSS_DUP_FLAG, true);
        gap_fill
            .header
            .set_utc_timestamp(tags::SENDING_TIME, UtcTimestamp::now());
        gap_fill.body.set_bool(tags::GAP_FILL_FLAG, true);
        gap_fill.body.set_uint(tags::NEW_SEQ_NO, new_seq);
        let bytes = MessageEncoder::new()
            .encode(&mut gap_fill)
            .map_err(|e| SessionError::Configuration(e.to_string()))?;
        self.outbound.push_back(bytes.freeze());
        Ok(())
    }

    /// SequenceReset with `GapFillFlag=Y`: moves the target counter
    /// forward, rejecting attempts to move it backwards.
    async fn handle_gap_fill(&mut self, msg: &Message, now: Instant) -> Result<(), SessionError> {
        let new_seq = msg
            .body
            .get_uint(tags::NEW_SEQ_NO)
            .map_err(SessionError::Framing)?;
        let expected = self.store.next_target_seq_num();
        if new_seq > expected {
            debug!(session = %self.config.session_id, new_seq, "gap fill");
            // the caller's drain loop picks up any queued message that
            // just became in-sequence
            self.store.set_next_target_seq_num(new_seq);
            Ok(())
        } else {
            let seq = msg.seq_num().unwrap_or(0);
            self.send_reject(
                seq,
                5,
                Some(tags::NEW_SEQ_NO),
                &format!("attempt to lower sequence number to {new_seq}"),
                now,
            )
            .await?;
            self.store.incr_next_target_seq_num();
            Ok(())
        }
    }

    /// SequenceReset with `GapFillFlag=N` (or absent): unconditionally
    /// repositions the target counter, regardless of its own MsgSeqNum.
    async fn handle_hard_reset(&mut self, msg: &Message, now: Instant) -> Result<(), SessionError> {
        let new_seq = msg
            .body
            .get_uint(tags::NEW_SEQ_NO)
            .map_err(SessionError::Framing)?;
        info!(session = %self.config.session_id, new_seq, "sequence reset");
        self.store.set_next_target_seq_num(new_seq);
        self.drain_gap_queue(now).await
    }

    /// Inbound Logout: confirm when we initiated, otherwise reply and
    /// schedule the disconnect after the grace window.
    async fn handle_logout_received(&mut self, now: Instant) -> Result<(), SessionError> {
        self.store.incr_next_target_seq_num();
        if self.state == SessionState::LogoutSent {
            info!(session = %self.config.session_id, "logout confirmed");
            self.finalize_logout(now).await?;
            return Err(SessionError::Disconnected);
        }
        info!(session = %self.config.session_id, "logout received");
        let reply = self.build_admin(&MsgType::Logout);
        self.send_message(reply, now).await?;
        self.state = SessionState::LogoutSent;
        self.finalize_logout(now).await?;
        self.disconnect_at = Some(now + self.config.logout_grace);
        Ok(())
    }

    async fn finalize_logout(&mut self, _now: Instant) -> Result<(), SessionError> {
        if self.config.reset_on_logout {
            self.store.reset().await.map_err(SessionError::SendAborted)?;
        }
        self.application.on_logout(&self.config.session_id).await;
        Ok(())
    }

    /// Sequence numbers reset at the session-day boundary.
    async fn check_session_day(
        &mut self,
        now: Instant,
        now_utc: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        let Some(schedule) = self.schedule else {
            return Ok(());
        };
        let creation: DateTime<Utc> = self.store.creation_time().into();
        if schedule.is_same_session(creation, now_utc) {
            return Ok(());
        }
        info!(session = %self.config.session_id, "session day boundary, resetting");
        self.logout(Some("session day over"), now).await?;
        self.store.reset().await.map_err(SessionError::SendAborted)?;
        Ok(())
    }

    // -- outbound ----------------------------------------------------------

    /// A message skeleton with the session's standard header.
    fn build_admin(&self, msg_type: &MsgType) -> Message {
        Message::with_msg_type(msg_type)
    }

    /// Stamps, persists and queues one outbound message. The store write
    /// must succeed before the sequence number advances and the bytes
    /// are released.
    async fn send_message(&mut self, mut msg: Message, now: Instant) -> Result<(), SessionError> {
        let sid = self.config.session_id.clone();
        let seq = self.store.next_sender_seq_num();

        msg.header.set_str(tags::BEGIN_STRING, &sid.begin_string);
        msg.header
            .set_str(tags::SENDER_COMP_ID, sid.sender_comp_id.as_str());
        msg.header
            .set_str(tags::TARGET_COMP_ID, sid.target_comp_id.as_str());
        msg.header.set_uint(tags::MSG_SEQ_NUM, seq);
        msg.header
            .set_utc_timestamp(tags::SENDING_TIME, UtcTimestamp::now());

        let application = Arc::clone(&self.application);
        if msg.is_admin() {
            application.to_admin(&mut msg, &sid).await;
        } else if application.to_app(&mut msg, &sid).await.is_err() {
            debug!(session = %sid, "outbound message dropped by application");
            return Ok(());
        }

        let bytes = MessageEncoder::new()
            .encode(&mut msg)
            .map_err(|e| SessionError::Configuration(e.to_string()))?;

        self.store.set(seq, &bytes).await.map_err(SessionError::SendAborted)?;
        self.store.incr_next_sender_seq_num();
        self.clock.record_sent(now);
        self.outbound.push_back(bytes.freeze());
        Ok(())
    }

    /// Queues a session-level Reject referencing the offending message.
    async fn send_reject(
        &mut self,
        ref_seq: u64,
        reason: u32,
        ref_tag: Option<u32>,
        text: &str,
        now: Instant,
    ) -> Result<(), SessionError> {
        let mut reject = self.build_admin(&MsgType::Reject);
        reject.body.set_uint(tags::REF_SEQ_NUM, ref_seq);
        reject.body.set_uint(tags::SESSION_REJECT_REASON, u64::from(reason));
        if let Some(tag) = ref_tag {
            reject.body.set_uint(tags::REF_TAG_ID, u64::from(tag));
        }
        if !text.is_empty() {
            reject.body.set_str(tags::TEXT, text);
        }
        self.send_message(reject, now).await
    }
}
