//! Data models for Perch

pub mod bird;
mod entry;
mod ids;
mod photo;
mod rule;
mod share;
mod sync;
mod user;
mod watchlist;

pub use bird::{Bird, BirdCatalog, BirdId, FieldMark, Rarity};
pub use entry::{DateWindow, GeoPoint, ObservationStatus, WatchlistEntry};
pub use ids::{EntryId, PhotoId, RuleId, ShareId, UserId, WatchlistId};
pub use photo::ObservedBirdPhoto;
pub use rule::{RuleKind, WatchlistRule};
pub use share::{SharePermission, WatchlistShare};
pub use sync::{now_ms, EntityKind, SyncEntity, SyncMeta, SyncStatus};
pub use user::User;
pub use watchlist::{Watchlist, WatchlistKind};
