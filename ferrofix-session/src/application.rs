/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Application callback interface.
//!
//! The session layer hands messages upward through this trait and lets
//! the application veto or decorate outbound traffic. Inbound callback
//! errors turn into session Rejects (or a BusinessMessageReject for
//! unsupported message types); [`DoNotSend`] silently drops an outbound
//! message before it is sequenced.

use async_trait::async_trait;
use ferrofix_core::message::Message;
use ferrofix_core::types::SessionId;
use thiserror::Error;

/// Returned by [`Application::to_app`] / [`Application::to_admin`] to
/// stop an outbound message from being sent. The sequence number is not
/// consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("do not send")]
pub struct DoNotSend;

/// Errors an application may raise from [`Application::from_admin`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FromAdminError {
    /// Refuse the counterparty's Logon; the session logs out.
    #[error("logon rejected: {0}")]
    RejectLogon(String),

    /// A field the application needs is missing.
    #[error("field not found: tag {0}")]
    FieldNotFound(u32),

    /// A field value has the wrong format for its type.
    #[error("incorrect data format for tag {0}")]
    IncorrectDataFormat(u32),

    /// A field value is outside its permitted set.
    #[error("incorrect tag value for tag {0}")]
    IncorrectTagValue(u32),
}

impl FromAdminError {
    /// The SessionRejectReason (373) code for the Reject this error
    /// produces. `RejectLogon` does not reject; it logs the session out.
    #[must_use]
    pub const fn reject_reason(&self) -> Option<u32> {
        match self {
            Self::RejectLogon(_) => None,
            Self::FieldNotFound(_) => Some(1),
            Self::IncorrectDataFormat(_) => Some(6),
            Self::IncorrectTagValue(_) => Some(5),
        }
    }

    /// The RefTagID (371) to report.
    #[must_use]
    pub const fn ref_tag(&self) -> Option<u32> {
        match self {
            Self::RejectLogon(_) => None,
            Self::FieldNotFound(tag)
            | Self::IncorrectDataFormat(tag)
            | Self::IncorrectTagValue(tag) => Some(*tag),
        }
    }
}

/// Errors an application may raise from [`Application::from_app`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FromAppError {
    /// The message type is not supported; the session answers with a
    /// BusinessMessageReject.
    #[error("unsupported message type")]
    UnsupportedMessageType,

    /// A field the application needs is missing.
    #[error("field not found: tag {0}")]
    FieldNotFound(u32),

    /// A field value is outside its permitted set.
    #[error("incorrect tag value for tag {0}")]
    IncorrectTagValue(u32),
}

impl FromAppError {
    /// The SessionRejectReason (373) code, for errors answered with a
    /// session Reject.
    #[must_use]
    pub const fn reject_reason(&self) -> Option<u32> {
        match self {
            Self::UnsupportedMessageType => None,
            Self::FieldNotFound(_) => Some(1),
            Self::IncorrectTagValue(_) => Some(5),
        }
    }

    /// The RefTagID (371) to report.
    #[must_use]
    pub const fn ref_tag(&self) -> Option<u32> {
        match self {
            Self::UnsupportedMessageType => None,
            Self::FieldNotFound(tag) | Self::IncorrectTagValue(tag) => Some(*tag),
        }
    }
}

/// Application callback interface for session events and messages.
#[async_trait]
pub trait Application: Send + Sync {
    /// Called when a session is created.
    async fn on_create(&self, session_id: &SessionId);

    /// Called when the session reaches the logged-on state.
    async fn on_logon(&self, session_id: &SessionId);

    /// Called when the session logs out or disconnects.
    async fn on_logout(&self, session_id: &SessionId);

    /// Called before an administrative message is sent; the message may
    /// be decorated in place.
    async fn to_admin(&self, message: &mut Message, session_id: &SessionId);

    /// Called when an administrative message is received.
    ///
    /// # Errors
    /// Returning [`FromAdminError::RejectLogon`] for a Logon refuses the
    /// session; other errors produce a session Reject.
    #[allow(clippy::wrong_self_convention)]
    async fn from_admin(
        &self,
        message: &Message,
        session_id: &SessionId,
    ) -> Result<(), FromAdminError>;

    /// Called before an application message is sent.
    ///
    /// # Errors
    /// Returning [`DoNotSend`] drops the message without consuming a
    /// sequence number.
    async fn to_app(&self, message: &mut Message, session_id: &SessionId)
    -> Result<(), DoNotSend>;

    /// Called when an application message is received, in strict
    /// MsgSeqNum order.
    ///
    /// # Errors
    /// [`FromAppError::UnsupportedMessageType`] produces a
    /// BusinessMessageReject; other errors a session Reject.
    #[allow(clippy::wrong_self_convention)]
    async fn from_app(&self, message: &Message, session_id: &SessionId)
    -> Result<(), FromAppError>;
}

/// Accept-everything application implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullApplication;

#[async_trait]
impl Application for NullApplication {
    async fn on_create(&self, _session_id: &SessionId) {}

    async fn on_logon(&self, _session_id: &SessionId) {}

    async fn on_logout(&self, _session_id: &SessionId) {}

    async fn to_admin(&self, _message: &mut Message, _session_id: &SessionId) {}

    async fn from_admin(
        &self,
        _message: &Message,
        _session_id: &SessionId,
    ) -> Result<(), FromAdminError> {
        Ok(())
    }

    async fn to_app(
        &self,
        _message: &mut Message,
        _session_id: &SessionId,
    ) -> Result<(), DoNotSend> {
        Ok(())
    }

    async fn from_app(
        &self,
        _message: &Message,
        _session_id: &SessionId,
    ) -> Result<(), FromAppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_admin_error_mapping() {
        assert_eq!(
            FromAdminError::RejectLogon("no".into()).reject_reason(),
            None
        );
        assert_eq!(FromAdminError::FieldNotFound(55).reject_reason(), Some(1));
        assert_eq!(FromAdminError::FieldNotFound(55).ref_tag(), Some(55));
        assert_eq!(
            FromAdminError::IncorrectDataFormat(108).reject_reason(),
            Some(6)
        );
        assert_eq!(
            FromAdminError::IncorrectTagValue(98).reject_reason(),
            Some(5)
        );
    }

    #[test]
    fn test_from_app_error_mapping() {
        assert_eq!(FromAppError::UnsupportedMessageType.reject_reason(), None);
        assert_eq!(FromAppError::IncorrectTagValue(54).reject_reason(), Some(5));
        assert_eq!(FromAppError::FieldNotFound(11).ref_tag(), Some(11));
    }

    #[tokio::test]
    async fn test_null_application_accepts_everything() {
        let app = NullApplication;
        let sid = SessionId::new("FIX.4.2", "A", "B").unwrap();
        let msg = Message::new();

        app.on_create(&sid).await;
        app.on_logon(&sid).await;
        assert!(app.from_admin(&msg, &sid).await.is_ok());
        assert!(app.from_app(&msg, &sid).await.is_ok());
        app.on_logout(&sid).await;
    }
}
