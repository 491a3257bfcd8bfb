//! Key model and the key-store lookup contract the codec consumes.
//!
//! The store itself — refresh polling, persistence, rotation policy — is an
//! external collaborator; this module defines only the immutable `Key`
//! record and the read-only trait the codec calls through.

use std::collections::HashMap;

use zeroize::Zeroizing;

/// A symmetric key as distributed out of band. Immutable after load; the
/// codec never mutates a `Key`, it only reads one via [`KeyStore`]. The
/// secret is wrapped in `Zeroizing` so it is wiped when the last `Key`
/// holding it is dropped.
#[derive(Debug, Clone)]
pub struct Key {
    pub id: i64,
    pub site_id: i32,
    pub secret: Zeroizing<Vec<u8>>,
    pub created: i64,
    pub activates: i64,
    pub expires: i64,
}

impl Key {
    pub fn new(id: i64, site_id: i32, secret: Vec<u8>, created: i64, activates: i64, expires: i64) -> Self {
        Self { id, site_id, secret: Zeroizing::new(secret), created, activates, expires }
    }

    /// A key is active at `t` iff `activates <= t < expires`.
    pub fn is_active(&self, now_ms: i64) -> bool {
        self.activates <= now_ms && now_ms < self.expires
    }
}

/// Read-only lookup contract the envelope codec requires from a key store.
///
/// Implementations own refresh/persistence/rotation; the codec only calls
/// through this trait, and treats it as the sole shared mutable resource —
/// it must support concurrent reads, hence `Send + Sync`.
pub trait KeyStore: Send + Sync {
    fn try_get_key(&self, id: i64) -> Option<Key>;
    fn try_get_active_site_key(&self, site_id: i32, now_ms: i64) -> Option<Key>;
    fn is_valid(&self, now_ms: i64) -> bool;
}

/// Simple in-memory store, useful for tests and as a reference
/// implementation of the [`KeyStore`] contract.
pub struct InMemoryKeyStore {
    keys: HashMap<i64, Key>,
    last_refreshed_ms: i64,
    refresh_window_ms: i64,
}

impl InMemoryKeyStore {
    pub fn new(keys: Vec<Key>, last_refreshed_ms: i64, refresh_window_ms: i64) -> Self {
        let keys = keys.into_iter().map(|k| (k.id, k)).collect();
        Self { keys, last_refreshed_ms, refresh_window_ms }
    }
}

impl KeyStore for InMemoryKeyStore {
    fn try_get_key(&self, id: i64) -> Option<Key> {
        self.keys.get(&id).cloned()
    }

    fn try_get_active_site_key(&self, site_id: i32, now_ms: i64) -> Option<Key> {
        self.keys
            .values()
            .filter(|k| k.site_id == site_id && k.is_active(now_ms))
            .max_by_key(|k| k.activates)
            .cloned()
    }

    fn is_valid(&self, now_ms: i64) -> bool {
        now_ms - self.last_refreshed_ms <= self.refresh_window_ms
    }
}
