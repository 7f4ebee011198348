//! Observed-bird photo model

use serde::{Deserialize, Serialize};

use crate::models::{EntityKind, EntryId, PhotoId, SyncEntity, SyncMeta, SyncStatus};

/// A photo attached to a watchlist entry.
///
/// Upload state is derived from `uploaded_at`/`remote_url`, never stored as
/// a separate flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedBirdPhoto {
    pub id: PhotoId,
    pub entry_id: EntryId,
    pub local_path: String,
    pub remote_url: Option<String>,
    pub captured_at: i64,
    pub uploaded_at: Option<i64>,
    pub meta: SyncMeta,
}

impl ObservedBirdPhoto {
    #[must_use]
    pub fn new(entry_id: EntryId, local_path: impl Into<String>, captured_at: i64) -> Self {
        Self {
            id: PhotoId::new(),
            entry_id,
            local_path: local_path.into(),
            remote_url: None,
            captured_at,
            uploaded_at: None,
            meta: SyncMeta::new(SyncStatus::PendingCreate),
        }
    }

    /// Whether the photo has reached remote storage
    #[must_use]
    pub const fn is_uploaded(&self) -> bool {
        self.uploaded_at.is_some() && self.remote_url.is_some()
    }
}

impl SyncEntity for ObservedBirdPhoto {
    const KIND: EntityKind = EntityKind::ObservedBirdPhoto;

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
    fn upload_state_is_derived() {
        let mut photo = ObservedBirdPhoto::new(EntryId::new(), "/tmp/p.jpg", 1);
        assert!(!photo.is_uploaded());

        photo.remote_url = Some("https://cdn.example/p.jpg".into());
        assert!(!photo.is_uploaded());

        photo.uploaded_at = Some(2);
        assert!(photo.is_uploaded());
    }
}
