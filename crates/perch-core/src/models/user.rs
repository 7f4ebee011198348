//! User identity model

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{EntityKind, SyncEntity, SyncMeta, SyncStatus, UserId};

/// An authenticated account. Created at signup or first login, updated on
/// profile edit, never hard-deleted by this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub gender: Option<String>,
    pub email: String,
    /// Reference to the profile photo, resolved by the presentation layer
    pub photo: Option<String>,
    pub meta: SyncMeta,
}

impl User {
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            name: name.into(),
            gender: None,
            email: email.into(),
            photo: None,
            meta: SyncMeta::new(SyncStatus::PendingCreate),
        }
    }
}

impl SyncEntity for User {
    const KIND: EntityKind = EntityKind::User;

    fn id_str(&self) -> String {
        self.id.as_str()
    }

    fn meta(&self) -> &SyncMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut SyncMeta {
        &mut self.meta
    }

    fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() {
            return Err(Error::Validation("user email must not be empty".into()));
        }
        Ok(())
    }
}
