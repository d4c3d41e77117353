//! Stored cache records with expiration metadata.
//!
//! Two record shapes are persisted by storage backends:
//!
//! - [`CacheEntry`] - one response under one cache key
//! - [`ListExpiry`] - the expiration of a whole list table, whose rows are
//!   stored separately
//!
//! Expiration timestamps are absolute epoch milliseconds. A record is expired
//! once `expire - now <= 0`, so a record expiring exactly now is expired.

use serde::{Deserialize, Serialize};

use crate::Payload;

/// A cached response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Key the entry is stored under.
    pub cache_key: String,
    /// Cached response data.
    pub data: Payload,
    /// Absolute expiration, epoch milliseconds.
    pub expire: i64,
}

impl CacheEntry {
    /// Creates a new entry.
    pub fn new(cache_key: impl Into<String>, data: Payload, expire: i64) -> Self {
        Self {
            cache_key: cache_key.into(),
            data,
            expire,
        }
    }

    /// Returns `true` if the entry is expired at `now` (epoch milliseconds).
    pub fn is_expired(&self, now: i64) -> bool {
        is_expired(self.expire, now)
    }
}

/// Expiration record gating an entire list table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListExpiry {
    /// Name of the gated table.
    pub name: String,
    /// Absolute expiration, epoch milliseconds.
    pub expire: i64,
}

impl ListExpiry {
    /// Creates a new list expiration record.
    pub fn new(name: impl Into<String>, expire: i64) -> Self {
        Self {
            name: name.into(),
            expire,
        }
    }

    /// Returns `true` if the list is expired at `now` (epoch milliseconds).
    pub fn is_expired(&self, now: i64) -> bool {
        is_expired(self.expire, now)
    }
}

/// Returns `true` if a record expiring at `expire` is expired at `now`.
#[inline]
pub fn is_expired(expire: i64, now: i64) -> bool {
    expire.saturating_sub(now) <= 0
}

/// Absolute expiration for a lifetime of `exp_seconds` starting at `now`.
#[inline]
pub fn expire_at(now: i64, exp_seconds: u64) -> i64 {
    let lifetime = i64::try_from(exp_seconds.saturating_mul(1000)).unwrap_or(i64::MAX);
    now.saturating_add(lifetime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiring_now_counts_as_expired() {
        assert!(is_expired(1_000, 1_000));
        assert!(is_expired(999, 1_000));
        assert!(!is_expired(1_001, 1_000));
    }

    #[test]
    fn zero_expire_is_always_expired() {
        assert!(is_expired(0, 1));
    }

    #[test]
    fn expire_at_converts_seconds_to_millis() {
        assert_eq!(expire_at(1_000, 60), 61_000);
        assert_eq!(expire_at(i64::MAX - 1, 60), i64::MAX);
    }
}
