//! In-process download cache.
//!
//! A rendered table is staged under a fresh token and handed out exactly once.
//! Entries older than the cache's time-to-live are refused and can be purged.
//! Safe to share across threads.
//!
//! Library-only: meant for an embedding service that renders a table now and
//! serves it on a later request. The `gs` binary writes exports straight to
//! disk with `write_table_file` and does not go through this cache.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;
use crate::io::export::table_to_csv_string;
use crate::report::Table;

/// Default time-to-live for staged downloads.
pub const DEFAULT_TTL_SECONDS: i64 = 600;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("no download staged under token {0}")]
    Missing(Uuid),

    #[error("download {0} expired")]
    Expired(Uuid),
}

/// A staged CSV download.
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub file_name: String,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct DownloadCache {
    ttl: Duration,
    entries: Mutex<HashMap<Uuid, Download>>,
}

impl Default for DownloadCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_TTL_SECONDS))
    }
}

impl DownloadCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Render `table` as CSV and stage it under a new token.
    pub fn prepare(&self, file_name: &str, table: &Table) -> Result<Uuid, AppError> {
        self.prepare_at(file_name, table, Utc::now())
    }

    /// Remove and return the download staged under `token`.
    pub fn fetch(&self, token: Uuid) -> Result<Download, CacheError> {
        self.fetch_at(token, Utc::now())
    }

    /// Drop every expired entry; returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn prepare_at(&self, file_name: &str, table: &Table, now: DateTime<Utc>) -> Result<Uuid, AppError> {
        let payload = table_to_csv_string(table)?;
        let token = Uuid::new_v4();
        self.lock().insert(
            token,
            Download {
                file_name: file_name.to_string(),
                payload,
                created_at: now,
            },
        );
        tracing::debug!(%token, file_name, "download staged");
        Ok(token)
    }

    fn fetch_at(&self, token: Uuid, now: DateTime<Utc>) -> Result<Download, CacheError> {
        let download = self.lock().remove(&token).ok_or(CacheError::Missing(token))?;
        if self.is_expired(&download, now) {
            return Err(CacheError::Expired(token));
        }
        Ok(download)
    }

    fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, d| now - d.created_at <= self.ttl);
        before - entries.len()
    }

    fn is_expired(&self, download: &Download, now: DateTime<Utc>) -> bool {
        now - download.created_at > self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Download>> {
        // The map stays consistent even if a holder panicked.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        let mut t = Table::for_parameters();
        t.push_column("plantA", vec![1.0, 3.0, 22.0, 41.0, 2.0]).unwrap();
        t
    }

    #[test]
    fn fetch_consumes_the_entry() {
        let cache = DownloadCache::default();
        let token = cache.prepare("parameters.csv", &table()).unwrap();
        assert_eq!(cache.len(), 1);

        let d = cache.fetch(token).unwrap();
        assert_eq!(d.file_name, "parameters.csv");
        assert!(d.payload.starts_with(",plantA\na,1\n"));
        assert!(cache.is_empty());
        assert_eq!(cache.fetch(token).unwrap_err(), CacheError::Missing(token));
    }

    #[test]
    fn unknown_token_is_missing() {
        let cache = DownloadCache::default();
        let token = Uuid::new_v4();
        assert_eq!(cache.fetch(token).unwrap_err(), CacheError::Missing(token));
    }

    #[test]
    fn expired_entries_are_refused_and_purged() {
        let cache = DownloadCache::new(Duration::seconds(60));
        let t0 = Utc::now();
        let old = cache.prepare_at("old.csv", &table(), t0).unwrap();
        let fresh = cache.prepare_at("fresh.csv", &table(), t0 + Duration::seconds(50)).unwrap();

        let later = t0 + Duration::seconds(90);
        assert_eq!(cache.fetch_at(old, later).unwrap_err(), CacheError::Expired(old));

        let stale = cache.prepare_at("stale.csv", &table(), t0).unwrap();
        assert_eq!(cache.purge_expired_at(later), 1);
        assert_eq!(cache.fetch_at(stale, later).unwrap_err(), CacheError::Missing(stale));
        assert_eq!(cache.fetch_at(fresh, later).unwrap().file_name, "fresh.csv");
    }

    #[test]
    fn cache_is_shared_across_threads() {
        let cache = DownloadCache::default();
        let tokens: Vec<Uuid> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(|| cache.prepare("t.csv", &table()).unwrap())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(cache.len(), 4);
        for token in tokens {
            assert!(cache.fetch(token).is_ok());
        }
    }
}
