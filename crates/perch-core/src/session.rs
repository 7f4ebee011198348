//! Current-identity handle shared by the store and adoption service

use std::sync::{Arc, PoisonError, RwLock};

use crate::models::UserId;

/// Tracks who is signed in. Cloning shares the same underlying state.
///
/// A guest session makes the store tag new rows `PendingOwner`; signing in
/// (normally via [`crate::adoption::OwnershipAdoption`]) switches creation to
/// `PendingCreate` with the owner stamped on.
#[derive(Debug, Clone, Default)]
pub struct Session {
    current: Arc<RwLock<Option<UserId>>>,
}

impl Session {
    /// A session with no authenticated user
    #[must_use]
    pub fn guest() -> Self {
        Self::default()
    }

    /// A session already authenticated as `user`
    #[must_use]
    pub fn signed_in(user: UserId) -> Self {
        let session = Self::default();
        session.sign_in(user);
        session
    }

    #[must_use]
    pub fn current(&self) -> Option<UserId> {
        *self
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn is_guest(&self) -> bool {
        self.current().is_none()
    }

    pub fn sign_in(&self, user: UserId) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(user);
    }

    pub fn sign_out(&self) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let session = Session::guest();
        let other = session.clone();
        assert!(other.is_guest());

        let user = UserId::new();
        session.sign_in(user);
        assert_eq!(other.current(), Some(user));
    }
}
