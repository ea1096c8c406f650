/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Message store trait definition.
//!
//! A store holds both session sequence numbers and the outbound message
//! log used to answer resend requests. The session layer persists every
//! outbound message with [`MessageStore::set`] *before* releasing it to
//! the transport and advancing the sender counter; a failed `set` aborts
//! the send.

use async_trait::async_trait;
use bytes::Bytes;
use ferrofix_core::error::StoreError;
use std::time::SystemTime;

/// Abstract interface for FIX message storage.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Stores an outbound message under its sequence number. Idempotent:
    /// storing the same sequence number again overwrites.
    ///
    /// The write must be durable before this returns `Ok`.
    ///
    /// # Errors
    /// Returns `StoreError` if the message cannot be stored; the caller
    /// must not advance its sequence number.
    async fn set(&self, seq_num: u64, message: &[u8]) -> Result<(), StoreError>;

    /// Retrieves stored messages in `[begin, end]` inclusive; `end == 0`
    /// means "to infinity". Sequence numbers with nothing stored are
    /// simply absent from the result, letting the caller emit gap fills.
    ///
    /// # Errors
    /// Returns `StoreError` if retrieval fails.
    async fn get(&self, begin: u64, end: u64) -> Result<Vec<(u64, Bytes)>, StoreError>;

    /// The next sequence number to assign to an outbound message.
    fn next_sender_seq_num(&self) -> u64;

    /// The next sequence number expected from the counterparty.
    fn next_target_seq_num(&self) -> u64;

    /// Sets the next sender sequence number.
    fn set_next_sender_seq_num(&self, seq: u64);

    /// Sets the next target sequence number.
    fn set_next_target_seq_num(&self, seq: u64);

    /// Increments the next sender sequence number.
    fn incr_next_sender_seq_num(&self) {
        self.set_next_sender_seq_num(self.next_sender_seq_num() + 1);
    }

    /// Increments the next target sequence number.
    fn incr_next_target_seq_num(&self) {
        self.set_next_target_seq_num(self.next_target_seq_num() + 1);
    }

    /// When this session's store was created; the session-day boundary
    /// compares against this.
    fn creation_time(&self) -> SystemTime;

    /// Atomically truncates the message log, resets both counters to 1
    /// and restamps the creation time.
    ///
    /// # Errors
    /// Returns `StoreError` if the reset fails.
    async fn reset(&self) -> Result<(), StoreError>;

    /// Reloads state from the backing storage, for backends shared with
    /// other processes.
    ///
    /// # Errors
    /// Returns `StoreError` if the refresh fails.
    async fn refresh(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CountingStore {
        sender: Mutex<u64>,
        target: Mutex<u64>,
    }

    #[async_trait]
    impl MessageStore for CountingStore {
        async fn set(&self, _seq_num: u64, _message: &[u8]) -> Result<(), StoreError> {
            Ok(())
        }

        async fn get(&self, _begin: u64, _end: u64) -> Result<Vec<(u64, Bytes)>, StoreError> {
            Ok(vec![])
        }

        fn next_sender_seq_num(&self) -> u64 {
            *self.sender.lock()
        }

        fn next_target_seq_num(&self) -> u64 {
            *self.target.lock()
        }

        fn set_next_sender_seq_num(&self, seq: u64) {
            *self.sender.lock() = seq;
        }

        fn set_next_target_seq_num(&self, seq: u64) {
            *self.target.lock() = seq;
        }

        fn creation_time(&self) -> SystemTime {
            SystemTime::UNIX_EPOCH
        }

        async fn reset(&self) -> Result<(), StoreError> {
            *self.sender.lock() = 1;
            *self.target.lock() = 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_incr_defaults_build_on_setters() {
        let store = CountingStore::default();
        store.set_next_sender_seq_num(5);
        store.incr_next_sender_seq_num();
        assert_eq!(store.next_sender_seq_num(), 6);

        store.set_next_target_seq_num(9);
        store.incr_next_target_seq_num();
        assert_eq!(store.next_target_seq_num(), 10);
    }

    #[tokio::test]
    async fn test_refresh_default_is_noop() {
        let store = CountingStore::default();
        assert!(store.refresh().await.is_ok());
    }
}
