/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! In-memory message store implementation.
//!
//! Loses everything on process exit; intended for tests and
//! applications that accept sequence resets on restart.

use crate::traits::MessageStore;
use async_trait::async_trait;
use bytes::Bytes;
use ferrofix_core::error::StoreError;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::time::SystemTime;

/// State guarded by one lock so `reset` is atomic across the log, both
/// counters and the creation time.
#[derive(Debug)]
struct Inner {
    messages: BTreeMap<u64, Bytes>,
    next_sender_seq: u64,
    next_target_seq: u64,
    creation_time: SystemTime,
}

/// In-memory message store backed by a `BTreeMap` for range queries.
#[derive(Debug)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Creates an empty store with both counters at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                messages: BTreeMap::new(),
                next_sender_seq: 1,
                next_target_seq: 1,
                creation_time: SystemTime::now(),
            }),
        }
    }

    /// Creates a store with the given starting sequence numbers.
    #[must_use]
    pub fn with_initial_seq_nums(sender: u64, target: u64) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.write();
            inner.next_sender_seq = sender;
            inner.next_target_seq = target;
        }
        store
    }

    /// Number of stored messages.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.inner.read().messages.len()
    }

    /// True when a message is stored under the sequence number.
    #[must_use]
    pub fn contains(&self, seq_num: u64) -> bool {
        self.inner.read().messages.contains_key(&seq_num)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn set(&self, seq_num: u64, message: &[u8]) -> Result<(), StoreError> {
        self.inner
            .write()
            .messages
            .insert(seq_num, Bytes::copy_from_slice(message));
        Ok(())
    }

    async fn get(&self, begin: u64, end: u64) -> Result<Vec<(u64, Bytes)>, StoreError> {
        let inner = self.inner.read();
        let end = if end == 0 { u64::MAX } else { end };
        Ok(inner
            .messages
            .range(begin..=end)
            .map(|(seq, bytes)| (*seq, bytes.clone()))
            .collect())
    }

    fn next_sender_seq_num(&self) -> u64 {
        self.inner.read().next_sender_seq
    }

    fn next_target_seq_num(&self) -> u64 {
        self.inner.read().next_target_seq
    }

    fn set_next_sender_seq_num(&self, seq: u64) {
        self.inner.write().next_sender_seq = seq;
    }

    fn set_next_target_seq_num(&self, seq: u64) {
        self.inner.write().next_target_seq = seq;
    }

    fn creation_time(&self) -> SystemTime {
        self.inner.read().creation_time
    }

    async fn reset(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        inner.messages.clear();
        inner.next_sender_seq = 1;
        inner.next_target_seq = 1;
        inner.creation_time = SystemTime::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_store() {
        let store = MemoryStore::new();
        assert_eq!(store.next_sender_seq_num(), 1);
        assert_eq!(store.next_target_seq_num(), 1);
        assert_eq!(store.message_count(), 0);
    }

    #[tokio::test]
    async fn test_set_is_idempotent_overwrite() {
        let store = MemoryStore::new();
        store.set(1, b"first").await.unwrap();
        store.set(1, b"second").await.unwrap();

        assert_eq!(store.message_count(), 1);
        let got = store.get(1, 1).await.unwrap();
        assert_eq!(got[0].1.as_ref(), b"second");
    }

    #[tokio::test]
    async fn test_get_range_skips_missing_slots() {
        let store = MemoryStore::new();
        store.set(1, b"m1").await.unwrap();
        store.set(2, b"m2").await.unwrap();
        store.set(5, b"m5").await.unwrap();

        let got = store.get(1, 5).await.unwrap();
        let seqs: Vec<u64> = got.iter().map(|(s, _)| *s).collect();
        assert_eq!(seqs, vec![1, 2, 5]);
    }

    #[tokio::test]
    async fn test_get_zero_end_means_infinity() {
        let store = MemoryStore::new();
        store.set(3, b"m3").await.unwrap();
        store.set(900, b"m900").await.unwrap();

        let got = store.get(1, 0).await.unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[1].0, 900);
    }

    #[tokio::test]
    async fn test_incr_seq_nums() {
        let store = MemoryStore::new();
        store.incr_next_sender_seq_num();
        store.incr_next_target_seq_num();
        store.incr_next_target_seq_num();
        assert_eq!(store.next_sender_seq_num(), 2);
        assert_eq!(store.next_target_seq_num(), 3);
    }

    #[tokio::test]
    async fn test_reset_is_atomic_across_state() {
        let store = MemoryStore::with_initial_seq_nums(10, 20);
        store.set(9, b"m9").await.unwrap();
        let before = store.creation_time();

        store.reset().await.unwrap();

        assert_eq!(store.message_count(), 0);
        assert_eq!(store.next_sender_seq_num(), 1);
        assert_eq!(store.next_target_seq_num(), 1);
        assert!(store.creation_time() >= before);
    }
}
