//! Remote sync service boundary
//!
//! The remote store is an external collaborator. This module defines the
//! wire row, the push outcomes, and the service trait; `http` talks to the
//! real backend and `memory` is a deterministic implementation for tests.

mod http;
mod memory;

pub use http::{HttpRemote, RemoteEndpoint};
pub use memory::MemoryRemote;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::EntityKind;

/// A row as exchanged with the remote store: the entity's type-specific
/// fields as a JSON document plus the versioning envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRow {
    pub id: String,
    pub payload: serde_json::Value,
    pub row_version: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl RemoteRow {
    pub const fn is_tombstone(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Result of a push the remote actually processed
#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    /// The write was accepted (or was an exact replay of an accepted write)
    Applied,
    /// The submitted row version was stale; the remote's current row is
    /// returned so the caller can resolve
    Conflict(RemoteRow),
}

/// Contract consumed by the sync orchestrator.
///
/// Implementations must be idempotent under retry: resubmitting the same row
/// with the same version yields the same outcome, never a duplicate row or a
/// double-applied delete.
#[allow(async_fn_in_trait)]
pub trait RemoteSyncService {
    /// Create or update a row. `expected_version` is the submitted row
    /// version; the remote accepts it when the row is absent (creates) or
    /// when it is exactly one greater than the remote's current version.
    async fn upsert(
        &self,
        kind: EntityKind,
        row: &RemoteRow,
        expected_version: i64,
    ) -> Result<PushOutcome>;

    /// Propagate a tombstone. Deleting an absent or already-deleted row is
    /// acknowledged as applied.
    async fn soft_delete(
        &self,
        kind: EntityKind,
        id: &str,
        expected_version: i64,
    ) -> Result<PushOutcome>;

    /// Rows of `kind` changed on the remote since the given watermark
    /// (`None` fetches everything). Includes tombstones.
    async fn fetch_updated_since(
        &self,
        kind: EntityKind,
        since: Option<i64>,
    ) -> Result<Vec<RemoteRow>>;
}
