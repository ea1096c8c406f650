/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Heartbeat and TestRequest timing.
//!
//! One [`HeartbeatClock`] per session, ticked externally with an
//! explicit `now` so the session task owns the clock:
//! - no outbound traffic for a full interval sends a Heartbeat
//! - no inbound traffic for 1.2 intervals sends a TestRequest
//! - a TestRequest unanswered for another interval means the connection
//!   is dead

use ferrofix_core::convert::UtcTimestamp;
use std::time::{Duration, Instant};

/// What the session should do after a clock poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatAction {
    /// Nothing due.
    None,
    /// Send a Heartbeat (35=0).
    SendHeartbeat,
    /// Send a TestRequest (35=1) carrying this TestReqID.
    SendTestRequest(String),
    /// The pending TestRequest went unanswered; drop the connection.
    Disconnect,
}

/// Heartbeat timing state for one session.
#[derive(Debug)]
pub struct HeartbeatClock {
    interval: Duration,
    last_sent: Instant,
    last_received: Instant,
    pending: Option<(String, Instant)>,
}

impl HeartbeatClock {
    /// Creates a clock; both directions count from `now`.
    #[must_use]
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_sent: now,
            last_received: now,
            pending: None,
        }
    }

    /// Replaces the interval, e.g. after Logon negotiation.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// The active heartbeat interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Records an outbound message.
    pub fn record_sent(&mut self, now: Instant) {
        self.last_sent = now;
    }

    /// Records an inbound message.
    pub fn record_received(&mut self, now: Instant) {
        self.last_received = now;
    }

    /// Records an inbound Heartbeat; a matching TestReqID clears the
    /// pending TestRequest.
    pub fn on_heartbeat(&mut self, test_req_id: Option<&str>) {
        if let (Some((pending, _)), Some(received)) = (&self.pending, test_req_id)
            && pending == received
        {
            self.pending = None;
        }
    }

    /// The pending TestReqID, if one is outstanding.
    #[must_use]
    pub fn pending_test_req_id(&self) -> Option<&str> {
        self.pending.as_ref().map(|(id, _)| id.as_str())
    }

    /// Evaluates the timers at `now`. A returned `SendTestRequest` arms
    /// the pending state; the session must actually send it.
    pub fn poll(&mut self, now: Instant) -> HeartbeatAction {
        if let Some((_, sent_at)) = &self.pending
            && now.duration_since(*sent_at) >= self.interval
        {
            return HeartbeatAction::Disconnect;
        }

        // inbound silence threshold is 1.2 intervals
        let inbound_deadline = self.interval + self.interval / 5;
        if self.pending.is_none() && now.duration_since(self.last_received) >= inbound_deadline {
            let id = UtcTimestamp::now().format().as_str().to_string();
            self.pending = Some((id.clone(), now));
            return HeartbeatAction::SendTestRequest(id);
        }

        if now.duration_since(self.last_sent) >= self.interval {
            return HeartbeatAction::SendHeartbeat;
        }

        HeartbeatAction::None
    }

    /// Clears all timing state, e.g. on reconnect.
    pub fn reset(&mut self, now: Instant) {
        self.last_sent = now;
        self.last_received = now;
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HBI: Duration = Duration::from_secs(30);

    #[test]
    fn test_nothing_due_initially() {
        let start = Instant::now();
        let mut clock = HeartbeatClock::new(HBI, start);
        assert_eq!(clock.poll(start), HeartbeatAction::None);
        assert_eq!(
            clock.poll(start + Duration::from_secs(29)),
            HeartbeatAction::None
        );
    }

    #[test]
    fn test_heartbeat_due_after_interval_of_outbound_silence() {
        let start = Instant::now();
        let mut clock = HeartbeatClock::new(HBI, start);
        clock.record_received(start + Duration::from_secs(30));

        assert_eq!(
            clock.poll(start + Duration::from_secs(30)),
            HeartbeatAction::SendHeartbeat
        );

        clock.record_sent(start + Duration::from_secs(30));
        assert_eq!(
            clock.poll(start + Duration::from_secs(31)),
            HeartbeatAction::None
        );
    }

    #[test]
    fn test_test_request_after_inbound_silence() {
        let start = Instant::now();
        let mut clock = HeartbeatClock::new(HBI, start);
        // keep outbound fresh so only the inbound timer can fire
        clock.record_sent(start + Duration::from_secs(35));

        let action = clock.poll(start + Duration::from_secs(36));
        let HeartbeatAction::SendTestRequest(id) = action else {
            panic!("expected SendTestRequest, got {action:?}");
        };
        assert_eq!(clock.pending_test_req_id(), Some(id.as_str()));

        // no second test request while one is pending
        clock.record_sent(start + Duration::from_secs(36));
        assert_eq!(
            clock.poll(start + Duration::from_secs(37)),
            HeartbeatAction::None
        );
    }

    #[test]
    fn test_matching_heartbeat_clears_pending() {
        let start = Instant::now();
        let mut clock = HeartbeatClock::new(HBI, start);
        clock.record_sent(start + Duration::from_secs(36));
        let HeartbeatAction::SendTestRequest(id) = clock.poll(start + Duration::from_secs(36))
        else {
            panic!("expected SendTestRequest");
        };

        clock.on_heartbeat(Some("wrong-id"));
        assert!(clock.pending_test_req_id().is_some());

        clock.on_heartbeat(Some(&id));
        assert!(clock.pending_test_req_id().is_none());
    }

    #[test]
    fn test_unanswered_test_request_disconnects() {
        let start = Instant::now();
        let mut clock = HeartbeatClock::new(HBI, start);
        clock.record_sent(start + Duration::from_secs(36));
        let _ = clock.poll(start + Duration::from_secs(36));

        assert_eq!(
            clock.poll(start + Duration::from_secs(36 + 30)),
            HeartbeatAction::Disconnect
        );
    }

    #[test]
    fn test_reset_clears_pending() {
        let start = Instant::now();
        let mut clock = HeartbeatClock::new(HBI, start);
        clock.record_sent(start + Duration::from_secs(36));
        let _ = clock.poll(start + Duration::from_secs(36));
        assert!(clock.pending_test_req_id().is_some());

        clock.reset(start + Duration::from_secs(40));
        assert!(clock.pending_test_req_id().is_none());
        assert_eq!(
            clock.poll(start + Duration::from_secs(41)),
            HeartbeatAction::None
        );
    }
}
