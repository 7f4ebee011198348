//! Sync lifecycle types shared by every mutable entity

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Result;
use crate::models::UserId;

/// Current Unix timestamp in milliseconds
#[must_use]
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Per-row sync lifecycle state.
///
/// `PendingOwner` rows were created by a guest session and only become
/// push-eligible once ownership adoption rewrites them to `PendingCreate`.
/// `Failed` keeps the prior pending intent; the next explicit sync trigger
/// re-enters the pending state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    PendingOwner,
    PendingCreate,
    PendingUpdate,
    PendingDelete,
    Synced,
    Failed,
}

impl SyncStatus {
    /// Stable string form used as the database column value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendingOwner => "pending_owner",
            Self::PendingCreate => "pending_create",
            Self::PendingUpdate => "pending_update",
            Self::PendingDelete => "pending_delete",
            Self::Synced => "synced",
            Self::Failed => "failed",
        }
    }

    /// States eligible for the push phase (excludes `PendingOwner`)
    #[must_use]
    pub const fn is_push_pending(self) -> bool {
        matches!(
            self,
            Self::PendingCreate | Self::PendingUpdate | Self::PendingDelete
        )
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending_owner" => Ok(Self::PendingOwner),
            "pending_create" => Ok(Self::PendingCreate),
            "pending_update" => Ok(Self::PendingUpdate),
            "pending_delete" => Ok(Self::PendingDelete),
            "synced" => Ok(Self::Synced),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown sync status: {other}")),
        }
    }
}

/// The sync-tracking quintuple carried by every mutable entity.
///
/// `row_version` strictly increases on every local mutation and is the basis
/// for conflict detection. `deleted_at` marks a tombstone awaiting remote
/// acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMeta {
    pub status: SyncStatus,
    pub row_version: i64,
    pub last_synced_at: Option<i64>,
    pub deleted_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl SyncMeta {
    /// Fresh metadata for a locally created row
    #[must_use]
    pub fn new(status: SyncStatus) -> Self {
        let now = now_ms();
        Self {
            status,
            row_version: 1,
            last_synced_at: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a local mutation: bump the version, refresh `updated_at`, and
    /// move to `PendingUpdate` unless the row is still an unsynced creation.
    pub fn touch(&mut self) {
        self.row_version += 1;
        self.updated_at = now_ms();
        if !matches!(self.status, SyncStatus::PendingCreate | SyncStatus::PendingOwner) {
            self.status = SyncStatus::PendingUpdate;
        }
    }

    /// Mark the row as a tombstone awaiting deletion propagation
    pub fn mark_deleted(&mut self) {
        let now = now_ms();
        self.row_version += 1;
        self.updated_at = now;
        self.deleted_at = Some(now);
        self.status = SyncStatus::PendingDelete;
    }

    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// The six entity types that participate in synchronization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Watchlist,
    WatchlistRule,
    WatchlistEntry,
    ObservedBirdPhoto,
    WatchlistShare,
}

impl EntityKind {
    /// Parent-before-child order required by remote foreign keys
    pub const SYNC_ORDER: [Self; 6] = [
        Self::User,
        Self::Watchlist,
        Self::WatchlistRule,
        Self::WatchlistEntry,
        Self::ObservedBirdPhoto,
        Self::WatchlistShare,
    ];

    /// Local table holding rows of this kind
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Watchlist => "watchlists",
            Self::WatchlistRule => "watchlist_rules",
            Self::WatchlistEntry => "watchlist_entries",
            Self::ObservedBirdPhoto => "observed_bird_photos",
            Self::WatchlistShare => "watchlist_shares",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Implemented by every entity the store and sync engine handle.
///
/// The `meta` field must serialize under the key `"meta"`; the store splits
/// it out into indexed columns so sync state is never persisted twice.
pub trait SyncEntity: Clone + Serialize + DeserializeOwned {
    const KIND: EntityKind;

    /// String form of the entity's unique id
    fn id_str(&self) -> String;

    fn meta(&self) -> &SyncMeta;

    fn meta_mut(&mut self) -> &mut SyncMeta;

    /// Stamp the owning user onto entities that carry one. Default: no-op.
    fn assign_owner(&mut self, _owner: &UserId) {}

    /// Reject malformed input before it is persisted or pushed. Default: ok.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}
