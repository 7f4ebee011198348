//! In-memory remote store
//!
//! Deterministic [`RemoteSyncService`] used by the crate's own tests and
//! downstream harnesses. Implements the version-acceptance and idempotency
//! rules exactly; faults can be scripted to exercise retry paths.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use super::{PushOutcome, RemoteRow, RemoteSyncService};
use crate::error::{Error, Result};
use crate::models::{now_ms, EntityKind};

#[derive(Debug, Clone)]
struct Stored {
    row: RemoteRow,
    /// Server-side change stamp used by `fetch_updated_since`
    stamped_at: i64,
}

#[derive(Default)]
struct Inner {
    rows: HashMap<(EntityKind, String), Stored>,
    faults: VecDeque<Error>,
    calls: usize,
}

/// An authoritative store held in memory
#[derive(Default)]
pub struct MemoryRemote {
    inner: Mutex<Inner>,
}

impl MemoryRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue an error to be returned by the next remote call, before any
    /// state is touched
    pub fn inject_fault(&self, error: Error) {
        self.lock().faults.push_back(error);
    }

    /// Place a row on the remote directly (simulating another device)
    pub fn seed(&self, kind: EntityKind, row: RemoteRow) {
        let mut inner = self.lock();
        let stamped_at = now_ms();
        inner
            .rows
            .insert((kind, row.id.clone()), Stored { row, stamped_at });
    }

    /// Current remote state of a row, tombstones included
    #[must_use]
    pub fn row(&self, kind: EntityKind, id: &str) -> Option<RemoteRow> {
        self.lock()
            .rows
            .get(&(kind, id.to_string()))
            .map(|stored| stored.row.clone())
    }

    /// Live (non-tombstone) rows of a kind
    #[must_use]
    pub fn live_count(&self, kind: EntityKind) -> usize {
        self.lock()
            .rows
            .iter()
            .filter(|((k, _), stored)| *k == kind && !stored.row.is_tombstone())
            .count()
    }

    /// Total remote calls that got past fault injection checks
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.lock().calls
    }

    fn begin_call(inner: &mut Inner) -> Result<()> {
        if let Some(fault) = inner.faults.pop_front() {
            return Err(fault);
        }
        inner.calls += 1;
        Ok(())
    }
}

impl RemoteSyncService for MemoryRemote {
    async fn upsert(
        &self,
        kind: EntityKind,
        row: &RemoteRow,
        expected_version: i64,
    ) -> Result<PushOutcome> {
        let mut inner = self.lock();
        Self::begin_call(&mut inner)?;

        let key = (kind, row.id.clone());
        let outcome = match inner.rows.get(&key) {
            None => {
                inner.rows.insert(
                    key,
                    Stored {
                        row: row.clone(),
                        stamped_at: now_ms(),
                    },
                );
                PushOutcome::Applied
            }
            // Exact replay of an accepted write (retried after an ambiguous
            // network failure): acknowledge without reapplying
            Some(existing)
                if existing.row.row_version == expected_version
                    && existing.row.payload == row.payload =>
            {
                PushOutcome::Applied
            }
            Some(existing) if expected_version == existing.row.row_version + 1 => {
                inner.rows.insert(
                    key,
                    Stored {
                        row: row.clone(),
                        stamped_at: now_ms(),
                    },
                );
                PushOutcome::Applied
            }
            Some(existing) => PushOutcome::Conflict(existing.row.clone()),
        };
        Ok(outcome)
    }

    async fn soft_delete(
        &self,
        kind: EntityKind,
        id: &str,
        expected_version: i64,
    ) -> Result<PushOutcome> {
        let mut inner = self.lock();
        Self::begin_call(&mut inner)?;

        let key = (kind, id.to_string());
        let outcome = match inner.rows.get(&key) {
            // Deleting what was never created (or already collected) is a
            // no-op acknowledgement
            None => PushOutcome::Applied,
            Some(existing) if existing.row.is_tombstone() => PushOutcome::Applied,
            Some(existing) if expected_version == existing.row.row_version + 1 => {
                let now = now_ms();
                let mut tombstone = existing.row.clone();
                tombstone.row_version = expected_version;
                tombstone.updated_at = now;
                tombstone.deleted_at = Some(now);
                inner.rows.insert(
                    key,
                    Stored {
                        row: tombstone,
                        stamped_at: now,
                    },
                );
                PushOutcome::Applied
            }
            Some(existing) => PushOutcome::Conflict(existing.row.clone()),
        };
        Ok(outcome)
    }

    async fn fetch_updated_since(
        &self,
        kind: EntityKind,
        since: Option<i64>,
    ) -> Result<Vec<RemoteRow>> {
        let mut inner = self.lock();
        Self::begin_call(&mut inner)?;

        let mut changed: Vec<&Stored> = inner
            .rows
            .iter()
            .filter(|((k, _), stored)| *k == kind && since.is_none_or(|ts| stored.stamped_at > ts))
            .map(|(_, stored)| stored)
            .collect();
        changed.sort_by_key(|stored| stored.stamped_at);
        Ok(changed.into_iter().map(|stored| stored.row.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(id: &str, version: i64) -> RemoteRow {
        RemoteRow {
            id: id.to_string(),
            payload: serde_json::json!({ "title": "Backyard" }),
            row_version: version,
            created_at: 1,
            updated_at: version,
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn create_then_replay_is_idempotent() {
        let remote = MemoryRemote::new();
        let kind = EntityKind::Watchlist;
        let first = row("w1", 1);

        let outcome = remote.upsert(kind, &first, 1).await.unwrap();
        assert_eq!(outcome, PushOutcome::Applied);

        // Same version, same payload: the ambiguous-retry case
        let outcome = remote.upsert(kind, &first, 1).await.unwrap();
        assert_eq!(outcome, PushOutcome::Applied);
        assert_eq!(remote.live_count(kind), 1);
    }

    #[tokio::test]
    async fn stale_version_conflicts_with_current_row() {
        let remote = MemoryRemote::new();
        let kind = EntityKind::Watchlist;
        remote.seed(kind, row("w1", 3));

        let outcome = remote.upsert(kind, &row("w1", 3), 3).await.unwrap();
        match outcome {
            PushOutcome::Conflict(current) => assert_eq!(current.row_version, 3),
            PushOutcome::Applied => panic!("expected conflict"),
        }
    }

    #[tokio::test]
    async fn delete_of_absent_row_is_acknowledged() {
        let remote = MemoryRemote::new();
        let outcome = remote
            .soft_delete(EntityKind::Watchlist, "ghost", 2)
            .await
            .unwrap();
        assert_eq!(outcome, PushOutcome::Applied);
    }

    #[tokio::test]
    async fn delete_is_not_double_applied() {
        let remote = MemoryRemote::new();
        let kind = EntityKind::Watchlist;
        remote.seed(kind, row("w1", 1));

        assert_eq!(
            remote.soft_delete(kind, "w1", 2).await.unwrap(),
            PushOutcome::Applied
        );
        let tombstone = remote.row(kind, "w1").unwrap();
        assert_eq!(tombstone.row_version, 2);

        // Replay after an ambiguous failure
        assert_eq!(
            remote.soft_delete(kind, "w1", 2).await.unwrap(),
            PushOutcome::Applied
        );
        assert_eq!(remote.row(kind, "w1").unwrap().row_version, 2);
    }

    #[tokio::test]
    async fn fetch_honors_the_watermark() {
        let remote = MemoryRemote::new();
        let kind = EntityKind::Watchlist;
        remote.seed(kind, row("w1", 1));
        let cutoff = now_ms() + 1;

        let all = remote.fetch_updated_since(kind, None).await.unwrap();
        assert_eq!(all.len(), 1);

        let none = remote.fetch_updated_since(kind, Some(cutoff)).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn injected_faults_surface_before_state_changes() {
        let remote = MemoryRemote::new();
        remote.inject_fault(Error::Authentication("expired".into()));

        let result = remote.upsert(EntityKind::Watchlist, &row("w1", 1), 1).await;
        assert!(matches!(result, Err(Error::Authentication(_))));
        assert_eq!(remote.live_count(EntityKind::Watchlist), 0);
        assert_eq!(remote.call_count(), 0);
    }
}
