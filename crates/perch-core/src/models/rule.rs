//! Watchlist rule model

use serde::{Deserialize, Serialize};

use crate::models::{EntityKind, RuleId, SyncEntity, SyncMeta, SyncStatus, WatchlistId};

/// The filter a rule applies, as a tagged variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKind {
    /// Match birds by body shape (and optionally size class)
    Species { shape: String, size: Option<u8> },
    /// Match observations inside a geofence
    Location { lat: f64, lon: f64, radius_km: f64 },
    /// Match observations within a date window (Unix ms, inclusive)
    DateRange { start: i64, end: i64 },
}

/// An optional structured filter attached to a watchlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistRule {
    pub id: RuleId,
    pub watchlist_id: WatchlistId,
    pub rule: RuleKind,
    pub active: bool,
    pub priority: i32,
    pub meta: SyncMeta,
}

impl WatchlistRule {
    #[must_use]
    pub fn new(watchlist_id: WatchlistId, rule: RuleKind) -> Self {
        Self {
            id: RuleId::new(),
            watchlist_id,
            rule,
            active: true,
            priority: 0,
            meta: SyncMeta::new(SyncStatus::PendingCreate),
        }
    }
}

impl SyncEntity for WatchlistRule {
    const KIND: EntityKind = EntityKind::WatchlistRule;

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_kind_serializes_with_type_tag() {
        let rule = RuleKind::Location {
            lat: 40.0,
            lon: -74.9,
            radius_km: 5.0,
        };
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["type"], "location");
        assert_eq!(json["radius_km"], 5.0);
    }
}
