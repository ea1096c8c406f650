/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session configuration.

use crate::settings::Settings;
use chrono::{NaiveTime, Weekday};
use ferrofix_core::error::SessionError;
use ferrofix_core::types::SessionId;
use std::path::PathBuf;
use std::time::Duration;

/// Whether the session accepts or initiates the TCP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    /// Waits for the counterparty to connect and log on.
    Acceptor,
    /// Connects and sends the first Logon.
    Initiator,
}

impl std::str::FromStr for ConnectionType {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "acceptor" => Ok(Self::Acceptor),
            "initiator" => Ok(Self::Initiator),
            other => Err(SessionError::Configuration(format!(
                "ConnectionType must be acceptor or initiator, got `{other}`"
            ))),
        }
    }
}

/// Configuration for one FIX session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The session identity.
    pub session_id: SessionId,
    /// Acceptor or initiator.
    pub connection_type: ConnectionType,
    /// Listen port (acceptor).
    pub socket_accept_port: Option<u16>,
    /// Peer host (initiator).
    pub socket_connect_host: Option<String>,
    /// Peer port (initiator).
    pub socket_connect_port: Option<u16>,
    /// Heartbeat interval.
    pub heart_bt_int: Duration,
    /// Session-day window start.
    pub start_time: Option<NaiveTime>,
    /// Session-day window end.
    pub end_time: Option<NaiveTime>,
    /// Weekly session start day.
    pub start_day: Option<Weekday>,
    /// Weekly session end day.
    pub end_day: Option<Weekday>,
    /// Reset sequence numbers when logging on.
    pub reset_on_logon: bool,
    /// Reset sequence numbers after logout completes.
    pub reset_on_logout: bool,
    /// Reset sequence numbers when the transport drops.
    pub reset_on_disconnect: bool,
    /// Path of the session data dictionary (FIX 4.x).
    pub data_dictionary: Option<PathBuf>,
    /// Path of the FIXT transport dictionary.
    pub transport_data_dictionary: Option<PathBuf>,
    /// Path of the application dictionary (FIX 5.x).
    pub app_data_dictionary: Option<PathBuf>,
    /// Reject messages whose fields are out of required order.
    pub validate_fields_out_of_order: bool,
    /// Reject fields present without a value.
    pub validate_fields_have_values: bool,
    /// Validate user-defined tags (5000..=9999) against the dictionary.
    pub validate_user_defined_fields: bool,
    /// Check SendingTime accuracy on inbound messages.
    pub check_latency: bool,
    /// Maximum tolerated SendingTime divergence.
    pub max_latency: Duration,
    /// How long an initiator waits for the Logon reply.
    pub logon_timeout: Duration,
    /// Grace window between Logout exchange and disconnect.
    pub logout_grace: Duration,
    /// Maximum inbound message size in bytes.
    pub max_message_size: usize,
}

impl SessionConfig {
    /// Creates a configuration with the defaults QuickFIX-style engines
    /// ship with.
    #[must_use]
    pub fn new(session_id: SessionId, connection_type: ConnectionType) -> Self {
        Self {
            session_id,
            connection_type,
            socket_accept_port: None,
            socket_connect_host: None,
            socket_connect_port: None,
            heart_bt_int: Duration::from_secs(30),
            start_time: None,
            end_time: None,
            start_day: None,
            end_day: None,
            reset_on_logon: false,
            reset_on_logout: false,
            reset_on_disconnect: false,
            data_dictionary: None,
            transport_data_dictionary: None,
            app_data_dictionary: None,
            validate_fields_out_of_order: true,
            validate_fields_have_values: true,
            validate_user_defined_fields: false,
            check_latency: false,
            max_latency: Duration::from_secs(120),
            logon_timeout: Duration::from_secs(10),
            logout_grace: Duration::from_secs(5),
            max_message_size: 1024 * 1024,
        }
    }

    /// Sets the heartbeat interval.
    #[must_use]
    pub const fn with_heart_bt_int(mut self, interval: Duration) -> Self {
        self.heart_bt_int = interval;
        self
    }

    /// Sets the reset-on-logon flag.
    #[must_use]
    pub const fn with_reset_on_logon(mut self, reset: bool) -> Self {
        self.reset_on_logon = reset;
        self
    }

    /// Sets the daily session window.
    #[must_use]
    pub const fn with_session_window(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    /// Builds a configuration from a [`Settings`] dictionary using the
    /// standard key names (case-insensitive).
    ///
    /// # Errors
    /// `SessionError::Configuration` when required keys are missing or
    /// malformed.
    pub fn from_settings(settings: &Settings) -> Result<Self, SessionError> {
        let missing =
            |key: &str| SessionError::Configuration(format!("missing required setting `{key}`"));

        let begin_string = settings.get("BeginString").ok_or_else(|| missing("BeginString"))?;
        let sender = settings
            .get("SenderCompID")
            .ok_or_else(|| missing("SenderCompID"))?;
        let target = settings
            .get("TargetCompID")
            .ok_or_else(|| missing("TargetCompID"))?;
        let mut session_id = SessionId::new(begin_string, sender, target).ok_or_else(|| {
            SessionError::Configuration("CompID exceeds maximum length".to_string())
        })?;
        if let Some(qualifier) = settings.get("SessionQualifier") {
            session_id = session_id.with_qualifier(qualifier);
        }

        let connection_type: ConnectionType = settings
            .get("ConnectionType")
            .ok_or_else(|| missing("ConnectionType"))?
            .parse()?;

        let mut config = Self::new(session_id, connection_type);

        if let Some(port) = settings.get_int("SocketAcceptPort") {
            config.socket_accept_port = u16::try_from(port).ok();
        }
        if let Some(host) = settings.get("SocketConnectHost") {
            config.socket_connect_host = Some(host.to_string());
        }
        if let Some(port) = settings.get_int("SocketConnectPort") {
            config.socket_connect_port = u16::try_from(port).ok();
        }
        if let Some(interval) = settings.get_int("HeartBtInt") {
            if interval <= 0 {
                return Err(SessionError::Configuration(
                    "HeartBtInt must be positive".to_string(),
                ));
            }
            config.heart_bt_int = Duration::from_secs(interval as u64);
        }
        config.start_time = settings.get_time("StartTime");
        config.end_time = settings.get_time("EndTime");
        config.start_day = settings.get_day("StartDay");
        config.end_day = settings.get_day("EndDay");
        if let Some(v) = settings.get_bool("ResetOnLogon") {
            config.reset_on_logon = v;
        }
        if let Some(v) = settings.get_bool("ResetOnLogout") {
            config.reset_on_logout = v;
        }
        if let Some(v) = settings.get_bool("ResetOnDisconnect") {
            config.reset_on_disconnect = v;
        }
        config.data_dictionary = settings.get("DataDictionary").map(PathBuf::from);
        config.transport_data_dictionary =
            settings.get("TransportDataDictionary").map(PathBuf::from);
        config.app_data_dictionary = settings.get("AppDataDictionary").map(PathBuf::from);
        if let Some(v) = settings.get_bool("ValidateFieldsOutOfOrder") {
            config.validate_fields_out_of_order = v;
        }
        if let Some(v) = settings.get_bool("ValidateFieldsHaveValues") {
            config.validate_fields_have_values = v;
        }
        if let Some(v) = settings.get_bool("ValidateUserDefinedFields") {
            config.validate_user_defined_fields = v;
        }
        if let Some(v) = settings.get_bool("CheckLatency") {
            config.check_latency = v;
        }
        if let Some(v) = settings.get_int("MaxLatency") {
            config.max_latency = Duration::from_secs(v.max(0) as u64);
        }

        match connection_type {
            ConnectionType::Acceptor if config.socket_accept_port.is_none() => Err(
                SessionError::Configuration("acceptor requires SocketAcceptPort".to_string()),
            ),
            ConnectionType::Initiator
                if config.socket_connect_host.is_none()
                    || config.socket_connect_port.is_none() =>
            {
                Err(SessionError::Configuration(
                    "initiator requires SocketConnectHost and SocketConnectPort".to_string(),
                ))
            }
            _ => Ok(config),
        }
    }
}
