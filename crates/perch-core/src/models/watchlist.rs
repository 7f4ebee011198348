//! Watchlist model

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{EntityKind, SyncEntity, SyncMeta, SyncStatus, UserId, WatchlistId};

/// Whether a watchlist is private to its owner or shared with other users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchlistKind {
    Personal,
    Shared,
}

/// A named collection of bird observations.
///
/// `owner_id` is `None` while the list is guest-owned; ownership adoption
/// fills it in when the session authenticates. `observed_count` and
/// `species_count` are denormalized for list screens and recomputed by the
/// query engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watchlist {
    pub id: WatchlistId,
    pub owner_id: Option<UserId>,
    pub kind: WatchlistKind,
    pub title: String,
    /// Human-readable location descriptor (e.g. "Cape May, NJ")
    pub location: Option<String>,
    pub observed_count: u32,
    pub species_count: u32,
    /// Reference to the cover image, resolved by the presentation layer
    pub cover_image: Option<String>,
    pub meta: SyncMeta,
}

impl Watchlist {
    /// Create a personal watchlist. Ownership is stamped by the store from
    /// the current session.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: WatchlistId::new(),
            owner_id: None,
            kind: WatchlistKind::Personal,
            title: title.into(),
            location: None,
            observed_count: 0,
            species_count: 0,
            cover_image: None,
            meta: SyncMeta::new(SyncStatus::PendingCreate),
        }
    }
}

impl SyncEntity for Watchlist {
    const KIND: EntityKind = EntityKind::Watchlist;

    fn id_str(&self) -> String {
        self.id.as_str()
    }

    fn meta(&self) -> &SyncMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut SyncMeta {
        &mut self.meta
    }

    fn assign_owner(&mut self, owner: &UserId) {
        self.owner_id = Some(*owner);
    }

    fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("watchlist title must not be empty".into()));
        }
        Ok(())
    }
}
