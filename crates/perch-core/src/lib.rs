//! perch-core - Core library for Perch
//!
//! This crate contains the shared models, local store, and sync engine used
//! by all Perch interfaces. It is offline-first: every mutation lands in the
//! local store immediately and reconciles with the remote in the background.

pub mod adoption;
pub mod db;
pub mod error;
pub mod models;
pub mod query;
pub mod remote;
pub mod retry;
pub mod session;
pub mod sync;

pub use db::EntityStore;
pub use error::{Error, Result};
pub use models::{Bird, BirdCatalog, User, Watchlist, WatchlistEntry};
pub use session::Session;
pub use sync::{SyncOrchestrator, SyncSummary};
