//! Local storage layer for Perch

mod connection;
mod migrations;
mod store;

pub use connection::Database;
pub use store::{EntityStore, LocalRow};
