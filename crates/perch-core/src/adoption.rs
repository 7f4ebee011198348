//! Ownership adoption
//!
//! When a guest session authenticates (sign-up, login, OTP verification),
//! every row created during the guest session is reassigned to the new user
//! and becomes push-eligible.

use std::sync::Arc;

use crate::db::EntityStore;
use crate::error::Result;
use crate::models::User;

/// Reassigns guest-owned rows to an authenticated identity
pub struct OwnershipAdoption {
    store: Arc<EntityStore>,
}

impl OwnershipAdoption {
    #[must_use]
    pub const fn new(store: Arc<EntityStore>) -> Self {
        Self { store }
    }

    /// Adopt every `PendingOwner` row for `user` and sign the session in.
    ///
    /// The reassignment is a single transaction: either the whole guest row
    /// set moves to `PendingCreate` with the owner stamped on, or none of it
    /// does. Row versions are untouched — this is still each row's first
    /// sync attempt. Returns the number of rows adopted.
    pub fn adopt(&self, user: &User) -> Result<usize> {
        let adopted = self.store.adopt_pending_owner(&user.id)?;
        self.store.session().sign_in(user.id);
        tracing::info!(user = %user.id, adopted, "guest rows adopted");
        Ok(adopted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        EntityKind, ObservationStatus, SyncEntity, SyncStatus, Watchlist, WatchlistEntry,
    };
    use crate::session::Session;
    use pretty_assertions::assert_eq;

    fn guest_store() -> Arc<EntityStore> {
        Arc::new(EntityStore::open_in_memory(Session::guest()).unwrap())
    }

    #[test]
    fn adoption_reassigns_every_guest_row() {
        let store = guest_store();
        let list = store.create(Watchlist::new("Backyard")).unwrap();
        let other = store.create(Watchlist::new("Coastal trip")).unwrap();
        let entry = store
            .create(WatchlistEntry::new(
                list.id,
                "northern-cardinal".into(),
                ObservationStatus::Observed,
            ))
            .unwrap();
        assert_eq!(list.meta.status, SyncStatus::PendingOwner);
        assert!(list.owner_id.is_none());

        let user = User::new("Robin", "robin@example.com");
        let adopted = OwnershipAdoption::new(Arc::clone(&store))
            .adopt(&user)
            .unwrap();
        assert_eq!(adopted, 3);

        assert_eq!(
            store
                .count_with_status(EntityKind::Watchlist, SyncStatus::PendingOwner)
                .unwrap(),
            0
        );
        assert_eq!(
            store
                .count_with_status(EntityKind::WatchlistEntry, SyncStatus::PendingOwner)
                .unwrap(),
            0
        );

        for id in [list.id, other.id] {
            let adopted_list: Watchlist = store.get(&id.as_str()).unwrap().unwrap();
            assert_eq!(adopted_list.owner_id, Some(user.id));
            assert_eq!(adopted_list.meta.status, SyncStatus::PendingCreate);
            // Still this row's first sync attempt
            assert_eq!(adopted_list.meta.row_version, 1);
        }

        let adopted_entry: WatchlistEntry = store.get(&entry.id_str()).unwrap().unwrap();
        assert_eq!(adopted_entry.meta.status, SyncStatus::PendingCreate);

        assert_eq!(store.session().current(), Some(user.id));
    }

    #[test]
    fn adoption_leaves_synced_rows_alone() {
        let store = Arc::new(
            EntityStore::open_in_memory(Session::signed_in(crate::models::UserId::new())).unwrap(),
        );
        let list = store.create(Watchlist::new("Already owned")).unwrap();
        assert_eq!(list.meta.status, SyncStatus::PendingCreate);

        let user = User::new("Wren", "wren@example.com");
        let adopted = OwnershipAdoption::new(Arc::clone(&store))
            .adopt(&user)
            .unwrap();
        assert_eq!(adopted, 0);

        let untouched: Watchlist = store.get(&list.id.as_str()).unwrap().unwrap();
        assert_ne!(untouched.owner_id, Some(user.id));
    }
}
