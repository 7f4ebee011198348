//! Watchlist entry model

use serde::{Deserialize, Serialize};

use crate::models::bird::BirdId;
use crate::models::{now_ms, EntityKind, EntryId, SyncEntity, SyncMeta, SyncStatus, WatchlistId};

/// Whether a bird has been observed or is still on the wishlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationStatus {
    Observed,
    ToObserve,
}

/// A coordinate with an optional display name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    pub name: Option<String>,
}

/// An inclusive Unix-ms date window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: i64,
    pub end: i64,
}

/// One bird's membership in a watchlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub id: EntryId,
    pub watchlist_id: WatchlistId,
    pub bird_id: BirdId,
    pub nickname: Option<String>,
    pub status: ObservationStatus,
    pub notes: Option<String>,
    pub added_date: i64,
    pub observation_date: Option<i64>,
    /// Planned observation window for `ToObserve` entries
    pub to_observe_window: Option<DateWindow>,
    pub observed_by: Option<String>,
    pub location: Option<GeoPoint>,
    pub priority: i32,
    pub notify_upcoming: bool,
    pub meta: SyncMeta,
}

impl WatchlistEntry {
    #[must_use]
    pub fn new(watchlist_id: WatchlistId, bird_id: BirdId, status: ObservationStatus) -> Self {
        Self {
            id: EntryId::new(),
            watchlist_id,
            bird_id,
            nickname: None,
            status,
            notes: None,
            added_date: now_ms(),
            observation_date: None,
            to_observe_window: None,
            observed_by: None,
            location: None,
            priority: 0,
            notify_upcoming: false,
            meta: SyncMeta::new(SyncStatus::PendingCreate),
        }
    }

    /// The date an entry sorts by; `None` sorts after any dated entry.
    #[must_use]
    pub const fn effective_date(&self) -> Option<i64> {
        self.observation_date
    }
}

impl SyncEntity for WatchlistEntry {
    const KIND: EntityKind = EntityKind::WatchlistEntry;

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
