//! Watchlist share model

use serde::{Deserialize, Serialize};

use crate::models::{
    now_ms, EntityKind, ShareId, SyncEntity, SyncMeta, SyncStatus, UserId, WatchlistId,
};

/// Permission level granted on a shared watchlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharePermission {
    Read,
    Write,
}

/// Grants `user_id` access to a shared watchlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistShare {
    pub id: ShareId,
    pub watchlist_id: WatchlistId,
    pub user_id: UserId,
    pub permission: SharePermission,
    pub shared_at: i64,
    pub shared_by: UserId,
    pub meta: SyncMeta,
}

impl WatchlistShare {
    #[must_use]
    pub fn new(
        watchlist_id: WatchlistId,
        user_id: UserId,
        permission: SharePermission,
        shared_by: UserId,
    ) -> Self {
        Self {
            id: ShareId::new(),
            watchlist_id,
            user_id,
            permission,
            shared_at: now_ms(),
            shared_by,
            meta: SyncMeta::new(SyncStatus::PendingCreate),
        }
    }
}

impl SyncEntity for WatchlistShare {
    const KIND: EntityKind = EntityKind::WatchlistShare;

    fn id_str(&self) -> String {
        self.id.as_str()
    }

    fn meta(&self) -> &SyncMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut SyncMeta {
        &mut self.meta
    }
}
