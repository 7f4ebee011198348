//! Entity store: durable CRUD over watchlist data plus the row-level API the
//! sync and adoption layers drive.
//!
//! Each entity persists as one row: type-specific fields in a JSON payload,
//! the sync quintuple broken out into columns. The two are split on write
//! and rejoined on read, so sync state is stored exactly once.

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{now_ms, EntityKind, SyncEntity, SyncMeta, SyncStatus, UserId};
use crate::remote::RemoteRow;
use crate::session::Session;

const ROW_COLUMNS: &str =
    "id, payload, sync_status, row_version, last_synced_at, deleted_at, created_at, updated_at";

/// A stored row in its raw form: id, JSON payload, sync metadata.
/// This is what the sync layer pushes and reconciles.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalRow {
    pub id: String,
    pub payload: Value,
    pub meta: SyncMeta,
}

impl LocalRow {
    /// Envelope sent to the remote store
    #[must_use]
    pub fn to_remote(&self) -> RemoteRow {
        RemoteRow {
            id: self.id.clone(),
            payload: self.payload.clone(),
            row_version: self.meta.row_version,
            created_at: self.meta.created_at,
            updated_at: self.meta.updated_at,
            deleted_at: self.meta.deleted_at,
        }
    }
}

struct RawRow {
    id: String,
    payload: String,
    status: String,
    row_version: i64,
    last_synced_at: Option<i64>,
    deleted_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl RawRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            payload: row.get(1)?,
            status: row.get(2)?,
            row_version: row.get(3)?,
            last_synced_at: row.get(4)?,
            deleted_at: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn meta(&self) -> Result<SyncMeta> {
        Ok(SyncMeta {
            status: self.status.parse().map_err(Error::Validation)?,
            row_version: self.row_version,
            last_synced_at: self.last_synced_at,
            deleted_at: self.deleted_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }

    fn into_local(self) -> Result<LocalRow> {
        let meta = self.meta()?;
        Ok(LocalRow {
            payload: serde_json::from_str(&self.payload)?,
            id: self.id,
            meta,
        })
    }
}

/// The single writer over the local durable store.
///
/// Writes are serialized through one connection guarded by a mutex, so a
/// sync cycle never observes a row mid-mutation.
pub struct EntityStore {
    db: Mutex<Database>,
    session: Session,
}

impl EntityStore {
    /// Open (or create) the store at the given path
    pub fn open(path: impl AsRef<Path>, session: Session) -> Result<Self> {
        Ok(Self {
            db: Mutex::new(Database::open(path)?),
            session,
        })
    }

    /// Open an in-memory store (useful for testing)
    pub fn open_in_memory(session: Session) -> Result<Self> {
        Ok(Self {
            db: Mutex::new(Database::open_in_memory()?),
            session,
        })
    }

    /// The identity handle this store stamps new rows with
    pub const fn session(&self) -> &Session {
        &self.session
    }

    fn lock(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---- typed CRUD -------------------------------------------------------

    /// Persist a new entity. Sync metadata is assigned here: `PendingCreate`
    /// with the owner stamped when a user is signed in, `PendingOwner` for
    /// guest sessions.
    pub fn create<T: SyncEntity>(&self, mut entity: T) -> Result<T> {
        entity.validate()?;

        let status = match self.session.current() {
            Some(owner) => {
                entity.assign_owner(&owner);
                SyncStatus::PendingCreate
            }
            None => SyncStatus::PendingOwner,
        };
        *entity.meta_mut() = SyncMeta::new(status);

        let payload = split_payload(&entity)?;
        let meta = entity.meta().clone();
        let db = self.lock();
        db.connection().execute(
            &format!(
                "INSERT INTO {} ({ROW_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                T::KIND.table()
            ),
            params![
                entity.id_str(),
                payload.to_string(),
                meta.status.as_str(),
                meta.row_version,
                meta.last_synced_at,
                meta.deleted_at,
                meta.created_at,
                meta.updated_at,
            ],
        )?;
        tracing::debug!(kind = %T::KIND, id = %entity.id_str(), status = %meta.status, "created");
        Ok(entity)
    }

    /// Fetch an entity by id, excluding soft-deleted rows
    pub fn get<T: SyncEntity>(&self, id: &str) -> Result<Option<T>> {
        let db = self.lock();
        let raw = load_raw(db.connection(), T::KIND, id, false)?;
        drop(db);
        raw.map(|raw| {
            let meta = raw.meta()?;
            rejoin(&raw.payload, meta)
        })
        .transpose()
    }

    /// Apply a mutation to an existing entity. Bumps the row version, stamps
    /// `updated_at`, and marks the row `PendingUpdate` (unsynced creations
    /// stay creations).
    pub fn update<T: SyncEntity>(&self, id: &str, mutate: impl FnOnce(&mut T)) -> Result<T> {
        let db = self.lock();
        let raw = load_raw(db.connection(), T::KIND, id, false)?
            .ok_or_else(|| Error::NotFound(format!("{}/{id}", T::KIND)))?;

        let mut entity: T = rejoin(&raw.payload, raw.meta()?)?;
        mutate(&mut entity);
        entity.validate()?;
        entity.meta_mut().touch();

        let payload = split_payload(&entity)?;
        let meta = entity.meta().clone();
        db.connection().execute(
            &format!(
                "UPDATE {} SET payload = ?1, sync_status = ?2, row_version = ?3, updated_at = ?4
                 WHERE id = ?5",
                T::KIND.table()
            ),
            params![
                payload.to_string(),
                meta.status.as_str(),
                meta.row_version,
                meta.updated_at,
                id,
            ],
        )?;
        tracing::debug!(kind = %T::KIND, id, row_version = meta.row_version, "updated");
        Ok(entity)
    }

    /// Mark a row as deleted without removing it: the tombstone stays until
    /// the remote acknowledges the delete. Deleting a watchlist cascades to
    /// its rules, entries, shares, and the entries' photos.
    pub fn soft_delete(&self, kind: EntityKind, id: &str) -> Result<()> {
        let mut db = self.lock();
        let tx = db.connection_mut().transaction()?;

        let affected = tombstone(&tx, kind, id)?;
        if affected == 0 {
            return Err(Error::NotFound(format!("{kind}/{id}")));
        }
        if kind == EntityKind::Watchlist {
            cascade_watchlist_delete(&tx, id)?;
        }

        tx.commit()?;
        tracing::debug!(%kind, id, "soft deleted");
        Ok(())
    }

    /// All non-deleted entities of a type, oldest first
    pub fn list<T: SyncEntity>(&self) -> Result<Vec<T>> {
        let db = self.lock();
        let mut stmt = db.connection().prepare(&format!(
            "SELECT {ROW_COLUMNS} FROM {} WHERE deleted_at IS NULL ORDER BY created_at",
            T::KIND.table()
        ))?;
        let raws = stmt
            .query_map([], RawRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);
        drop(db);

        raws.into_iter()
            .map(|raw| {
                let meta = raw.meta()?;
                rejoin(&raw.payload, meta)
            })
            .collect()
    }

    /// Non-deleted entities matching a predicate
    pub fn query<T: SyncEntity>(&self, predicate: impl Fn(&T) -> bool) -> Result<Vec<T>> {
        Ok(self.list::<T>()?.into_iter().filter(predicate).collect())
    }

    // ---- row-level API (sync and adoption layers) -------------------------

    /// Rows awaiting push, oldest creation first. Excludes `PendingOwner`,
    /// which is not push-eligible, and includes tombstones.
    pub fn pending_push_rows(&self, kind: EntityKind) -> Result<Vec<LocalRow>> {
        let db = self.lock();
        let mut stmt = db.connection().prepare(&format!(
            "SELECT {ROW_COLUMNS} FROM {}
             WHERE sync_status IN ('pending_create', 'pending_update', 'pending_delete')
             ORDER BY created_at",
            kind.table()
        ))?;
        let raws = stmt
            .query_map([], RawRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);
        drop(db);

        raws.into_iter().map(RawRow::into_local).collect()
    }

    /// A row in its raw form, tombstones included
    pub fn get_row(&self, kind: EntityKind, id: &str) -> Result<Option<LocalRow>> {
        let db = self.lock();
        let raw = load_raw(db.connection(), kind, id, true)?;
        drop(db);
        raw.map(RawRow::into_local).transpose()
    }

    /// Count rows of a kind in a given sync status (tombstones included)
    pub fn count_with_status(&self, kind: EntityKind, status: SyncStatus) -> Result<usize> {
        let db = self.lock();
        let count: i64 = db.connection().query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE sync_status = ?1",
                kind.table()
            ),
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Record a successful push. Guarded on `expected_version` so a UI
    /// mutation that raced the remote call is never clobbered; returns false
    /// when the row changed mid-flight and the status was left alone.
    pub fn mark_synced(
        &self,
        kind: EntityKind,
        id: &str,
        expected_version: i64,
        new_version: i64,
    ) -> Result<bool> {
        let db = self.lock();
        let affected = db.connection().execute(
            &format!(
                "UPDATE {} SET sync_status = 'synced', last_synced_at = ?1, row_version = ?2
                 WHERE id = ?3 AND row_version = ?4",
                kind.table()
            ),
            params![now_ms(), new_version, id, expected_version],
        )?;
        Ok(affected > 0)
    }

    /// Remove an acknowledged tombstone from local storage entirely
    pub fn finish_delete(&self, kind: EntityKind, id: &str, expected_version: i64) -> Result<bool> {
        let db = self.lock();
        let affected = db.connection().execute(
            &format!(
                "DELETE FROM {} WHERE id = ?1 AND row_version = ?2 AND deleted_at IS NOT NULL",
                kind.table()
            ),
            params![id, expected_version],
        )?;
        Ok(affected > 0)
    }

    /// Record retry exhaustion. The pending intent is preserved in
    /// `deleted_at`/payload; the next sync trigger re-derives it.
    pub fn mark_failed(&self, kind: EntityKind, id: &str, expected_version: i64) -> Result<bool> {
        let db = self.lock();
        let affected = db.connection().execute(
            &format!(
                "UPDATE {} SET sync_status = 'failed' WHERE id = ?1 AND row_version = ?2",
                kind.table()
            ),
            params![id, expected_version],
        )?;
        Ok(affected > 0)
    }

    /// Re-enter failed rows into their pending state for another attempt
    pub fn requeue_failed(&self, kind: EntityKind) -> Result<usize> {
        let db = self.lock();
        let affected = db.connection().execute(
            &format!(
                "UPDATE {table} SET sync_status = CASE
                     WHEN deleted_at IS NOT NULL THEN 'pending_delete'
                     WHEN last_synced_at IS NULL THEN 'pending_create'
                     ELSE 'pending_update'
                 END
                 WHERE sync_status = 'failed'",
                table = kind.table()
            ),
            [],
        )?;
        Ok(affected)
    }

    /// Accept an authoritative remote row: tombstones remove the local row,
    /// anything else is inserted or overwritten as `Synced`.
    pub fn apply_remote(&self, kind: EntityKind, row: &RemoteRow) -> Result<()> {
        let db = self.lock();
        if row.is_tombstone() {
            db.connection().execute(
                &format!("DELETE FROM {} WHERE id = ?1", kind.table()),
                params![row.id],
            )?;
            return Ok(());
        }
        db.connection().execute(
            &format!(
                "INSERT INTO {} ({ROW_COLUMNS}) VALUES (?1, ?2, 'synced', ?3, ?4, NULL, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                     payload = excluded.payload,
                     sync_status = 'synced',
                     row_version = excluded.row_version,
                     last_synced_at = excluded.last_synced_at,
                     deleted_at = NULL,
                     updated_at = excluded.updated_at",
                kind.table()
            ),
            params![
                row.id,
                row.payload.to_string(),
                row.row_version,
                now_ms(),
                row.created_at,
                row.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Pull watermark: the most recent acknowledgement across rows of a kind
    pub fn watermark(&self, kind: EntityKind) -> Result<Option<i64>> {
        let db = self.lock();
        let max: Option<i64> = db.connection().query_row(
            &format!("SELECT MAX(last_synced_at) FROM {}", kind.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(max)
    }

    /// Reassign every guest-created row to `owner` in one transaction:
    /// owner-bearing payloads get the id, every `PendingOwner` row becomes
    /// `PendingCreate`, row versions stay put (it is still the first sync
    /// attempt). Returns the number of rows adopted.
    pub fn adopt_pending_owner(&self, owner: &UserId) -> Result<usize> {
        let mut db = self.lock();
        let tx = db.connection_mut().transaction()?;
        let mut adopted = 0;

        for kind in EntityKind::SYNC_ORDER {
            let pending: Vec<(String, String)> = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT id, payload FROM {} WHERE sync_status = 'pending_owner'",
                    kind.table()
                ))?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<rusqlite::Result<_>>()?;
                rows
            };

            for (id, payload) in pending {
                let mut value: Value = serde_json::from_str(&payload)?;
                if let Some(map) = value.as_object_mut() {
                    if map.contains_key("owner_id") {
                        map.insert("owner_id".into(), Value::String(owner.as_str()));
                    }
                }
                tx.execute(
                    &format!(
                        "UPDATE {} SET payload = ?1, sync_status = 'pending_create' WHERE id = ?2",
                        kind.table()
                    ),
                    params![value.to_string(), id],
                )?;
                adopted += 1;
            }
        }

        tx.commit()?;
        Ok(adopted)
    }
}

// ---- helpers --------------------------------------------------------------

fn split_payload<T: SyncEntity>(entity: &T) -> Result<Value> {
    let mut value = serde_json::to_value(entity)?;
    let map = value
        .as_object_mut()
        .ok_or_else(|| Error::Validation("entity must serialize to a JSON object".into()))?;
    map.remove("meta");
    Ok(value)
}

fn rejoin<T: SyncEntity>(payload: &str, meta: SyncMeta) -> Result<T> {
    let mut value: Value = serde_json::from_str(payload)?;
    let map = value
        .as_object_mut()
        .ok_or_else(|| Error::Validation("stored payload is not a JSON object".into()))?;
    map.insert("meta".into(), serde_json::to_value(&meta)?);
    Ok(serde_json::from_value(value)?)
}

fn load_raw(
    conn: &Connection,
    kind: EntityKind,
    id: &str,
    include_deleted: bool,
) -> Result<Option<RawRow>> {
    let filter = if include_deleted {
        ""
    } else {
        " AND deleted_at IS NULL"
    };
    let raw = conn
        .query_row(
            &format!(
                "SELECT {ROW_COLUMNS} FROM {} WHERE id = ?1{filter}",
                kind.table()
            ),
            params![id],
            RawRow::from_row,
        )
        .optional()?;
    Ok(raw)
}

fn tombstone(conn: &Connection, kind: EntityKind, id: &str) -> Result<usize> {
    let now = now_ms();
    Ok(conn.execute(
        &format!(
            "UPDATE {} SET sync_status = 'pending_delete', deleted_at = ?1, updated_at = ?1,
                 row_version = row_version + 1
             WHERE id = ?2 AND deleted_at IS NULL",
            kind.table()
        ),
        params![now, id],
    )?)
}

/// Logical cascade: tombstone everything hanging off a watchlist so the
/// deletions propagate remotely in their own right.
fn cascade_watchlist_delete(conn: &Connection, watchlist_id: &str) -> Result<()> {
    let now = now_ms();

    // Photos first, while the entry rows still identify their parent
    conn.execute(
        "UPDATE observed_bird_photos SET sync_status = 'pending_delete', deleted_at = ?1,
             updated_at = ?1, row_version = row_version + 1
         WHERE deleted_at IS NULL AND json_extract(payload, '$.entry_id') IN (
             SELECT id FROM watchlist_entries
             WHERE json_extract(payload, '$.watchlist_id') = ?2 AND deleted_at IS NULL
         )",
        params![now, watchlist_id],
    )?;

    for kind in [
        EntityKind::WatchlistRule,
        EntityKind::WatchlistEntry,
        EntityKind::WatchlistShare,
    ] {
        conn.execute(
            &format!(
                "UPDATE {} SET sync_status = 'pending_delete', deleted_at = ?1, updated_at = ?1,
                     row_version = row_version + 1
                 WHERE deleted_at IS NULL AND json_extract(payload, '$.watchlist_id') = ?2",
                kind.table()
            ),
            params![now, watchlist_id],
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ObservationStatus, ObservedBirdPhoto, RuleKind, SharePermission, Watchlist,
        WatchlistEntry, WatchlistRule, WatchlistShare,
    };
    use pretty_assertions::assert_eq;

    fn signed_in_store() -> (EntityStore, UserId) {
        let user = UserId::new();
        let store = EntityStore::open_in_memory(Session::signed_in(user)).unwrap();
        (store, user)
    }

    #[test]
    fn create_stamps_owner_when_signed_in() {
        let (store, user) = signed_in_store();
        let list = store.create(Watchlist::new("Backyard")).unwrap();

        assert_eq!(list.owner_id, Some(user));
        assert_eq!(list.meta.status, SyncStatus::PendingCreate);
        assert_eq!(list.meta.row_version, 1);
        assert!(list.meta.last_synced_at.is_none());
    }

    #[test]
    fn guest_creations_wait_for_an_owner() {
        let store = EntityStore::open_in_memory(Session::guest()).unwrap();
        let list = store.create(Watchlist::new("Backyard")).unwrap();

        assert!(list.owner_id.is_none());
        assert_eq!(list.meta.status, SyncStatus::PendingOwner);
        // Guest rows are not push-eligible
        assert!(store
            .pending_push_rows(EntityKind::Watchlist)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn create_rejects_invalid_entities() {
        let (store, _) = signed_in_store();
        let result = store.create(Watchlist::new("   "));
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(store.list::<Watchlist>().unwrap().is_empty());
    }

    #[test]
    fn row_version_increases_with_every_mutation() {
        let (store, _) = signed_in_store();
        let list = store.create(Watchlist::new("Backyard")).unwrap();
        let id = list.id.as_str();

        let v2: Watchlist = store
            .update(&id, |l: &mut Watchlist| l.title = "Back yard".into())
            .unwrap();
        let v3: Watchlist = store
            .update(&id, |l: &mut Watchlist| l.title = "Garden".into())
            .unwrap();

        assert_eq!(v2.meta.row_version, 2);
        assert_eq!(v3.meta.row_version, 3);
        // Unsynced creations stay creations through edits
        assert_eq!(v3.meta.status, SyncStatus::PendingCreate);
    }

    #[test]
    fn update_after_sync_marks_pending_update() {
        let (store, _) = signed_in_store();
        let list = store.create(Watchlist::new("Backyard")).unwrap();
        let id = list.id.as_str();
        assert!(store
            .mark_synced(EntityKind::Watchlist, &id, 1, 1)
            .unwrap());

        let edited: Watchlist = store
            .update(&id, |l: &mut Watchlist| l.title = "Garden".into())
            .unwrap();
        assert_eq!(edited.meta.status, SyncStatus::PendingUpdate);
        assert_eq!(edited.meta.row_version, 2);
    }

    #[test]
    fn update_of_missing_row_is_not_found() {
        let (store, _) = signed_in_store();
        let result = store.update("no-such-id", |l: &mut Watchlist| l.title = "x".into());
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn soft_delete_hides_the_row_but_keeps_the_tombstone() {
        let (store, _) = signed_in_store();
        let list = store.create(Watchlist::new("Backyard")).unwrap();
        let id = list.id.as_str();

        store.soft_delete(EntityKind::Watchlist, &id).unwrap();

        assert!(store.get::<Watchlist>(&id).unwrap().is_none());
        assert!(store.list::<Watchlist>().unwrap().is_empty());

        let rows = store.pending_push_rows(EntityKind::Watchlist).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].meta.is_deleted());
        assert_eq!(rows[0].meta.status, SyncStatus::PendingDelete);
        assert_eq!(rows[0].meta.row_version, 2);
    }

    #[test]
    fn soft_delete_of_missing_row_is_not_found() {
        let (store, _) = signed_in_store();
        let result = store.soft_delete(EntityKind::Watchlist, "no-such-id");
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn deleting_a_watchlist_cascades_to_its_children() {
        let (store, user) = signed_in_store();
        let list = store.create(Watchlist::new("Backyard")).unwrap();
        let other = store.create(Watchlist::new("Coastal trip")).unwrap();

        let entry = store
            .create(WatchlistEntry::new(
                list.id,
                "northern-cardinal".into(),
                ObservationStatus::Observed,
            ))
            .unwrap();
        store
            .create(WatchlistRule::new(
                list.id,
                RuleKind::Species {
                    shape: "A".into(),
                    size: None,
                },
            ))
            .unwrap();
        store
            .create(WatchlistShare::new(
                list.id,
                UserId::new(),
                SharePermission::Read,
                user,
            ))
            .unwrap();
        store
            .create(ObservedBirdPhoto::new(entry.id, "/tmp/cardinal.jpg", 1))
            .unwrap();
        let unrelated = store
            .create(WatchlistEntry::new(
                other.id,
                "house-sparrow".into(),
                ObservationStatus::ToObserve,
            ))
            .unwrap();

        store
            .soft_delete(EntityKind::Watchlist, &list.id.as_str())
            .unwrap();

        for kind in [
            EntityKind::WatchlistRule,
            EntityKind::ObservedBirdPhoto,
            EntityKind::WatchlistShare,
        ] {
            assert_eq!(
                store.count_with_status(kind, SyncStatus::PendingDelete).unwrap(),
                1,
                "{kind} should be tombstoned"
            );
        }
        assert!(store.get::<WatchlistEntry>(&entry.id.as_str()).unwrap().is_none());

        // The other watchlist and its entry are untouched
        assert!(store.get::<Watchlist>(&other.id.as_str()).unwrap().is_some());
        assert!(store
            .get::<WatchlistEntry>(&unrelated.id.as_str())
            .unwrap()
            .is_some());
    }

    #[test]
    fn mark_synced_is_guarded_by_the_expected_version() {
        let (store, _) = signed_in_store();
        let list = store.create(Watchlist::new("Backyard")).unwrap();
        let id = list.id.as_str();

        // A UI edit raced the push: version moved to 2
        store
            .update(&id, |l: &mut Watchlist| l.title = "Garden".into())
            .unwrap();

        assert!(!store.mark_synced(EntityKind::Watchlist, &id, 1, 1).unwrap());
        let row = store.get_row(EntityKind::Watchlist, &id).unwrap().unwrap();
        assert_eq!(row.meta.status, SyncStatus::PendingCreate);

        assert!(store.mark_synced(EntityKind::Watchlist, &id, 2, 2).unwrap());
        let row = store.get_row(EntityKind::Watchlist, &id).unwrap().unwrap();
        assert_eq!(row.meta.status, SyncStatus::Synced);
        assert!(row.meta.last_synced_at.is_some());
    }

    #[test]
    fn finish_delete_removes_only_acknowledged_tombstones() {
        let (store, _) = signed_in_store();
        let list = store.create(Watchlist::new("Backyard")).unwrap();
        let id = list.id.as_str();

        // Not a tombstone yet
        assert!(!store.finish_delete(EntityKind::Watchlist, &id, 1).unwrap());

        store.soft_delete(EntityKind::Watchlist, &id).unwrap();
        assert!(store.finish_delete(EntityKind::Watchlist, &id, 2).unwrap());
        assert!(store.get_row(EntityKind::Watchlist, &id).unwrap().is_none());
    }

    #[test]
    fn requeue_failed_rederives_the_pending_intent() {
        let (store, _) = signed_in_store();
        let created = store.create(Watchlist::new("Never synced")).unwrap();
        let edited = store.create(Watchlist::new("Synced then edited")).unwrap();
        let deleted = store.create(Watchlist::new("Deleted")).unwrap();

        store
            .mark_synced(EntityKind::Watchlist, &edited.id.as_str(), 1, 1)
            .unwrap();
        store
            .update(&edited.id.as_str(), |l: &mut Watchlist| {
                l.title = "Edited".into();
            })
            .unwrap();
        store
            .soft_delete(EntityKind::Watchlist, &deleted.id.as_str())
            .unwrap();

        for (id, version) in [(&created.id, 1), (&edited.id, 2), (&deleted.id, 2)] {
            store
                .mark_failed(EntityKind::Watchlist, &id.as_str(), version)
                .unwrap();
        }
        assert_eq!(
            store
                .count_with_status(EntityKind::Watchlist, SyncStatus::Failed)
                .unwrap(),
            3
        );

        assert_eq!(store.requeue_failed(EntityKind::Watchlist).unwrap(), 3);
        let status_of = |id: &str| {
            store
                .get_row(EntityKind::Watchlist, id)
                .unwrap()
                .unwrap()
                .meta
                .status
        };
        assert_eq!(status_of(&created.id.as_str()), SyncStatus::PendingCreate);
        assert_eq!(status_of(&edited.id.as_str()), SyncStatus::PendingUpdate);
        assert_eq!(status_of(&deleted.id.as_str()), SyncStatus::PendingDelete);
    }

    #[test]
    fn apply_remote_inserts_and_overwrites_as_synced() {
        let (store, _) = signed_in_store();
        let incoming = RemoteRow {
            id: "w-remote".into(),
            payload: serde_json::json!({
                "id": "w-remote",
                "owner_id": null,
                "kind": "personal",
                "title": "From another device",
                "location": null,
                "observed_count": 0,
                "species_count": 0,
                "cover_image": null,
            }),
            row_version: 4,
            created_at: 10,
            updated_at: 20,
            deleted_at: None,
        };
        store.apply_remote(EntityKind::Watchlist, &incoming).unwrap();

        let row = store
            .get_row(EntityKind::Watchlist, "w-remote")
            .unwrap()
            .unwrap();
        assert_eq!(row.meta.status, SyncStatus::Synced);
        assert_eq!(row.meta.row_version, 4);
        assert!(row.meta.last_synced_at.is_some());
        assert_eq!(store.watermark(EntityKind::Watchlist).unwrap(), row.meta.last_synced_at);

        let tombstone = RemoteRow {
            deleted_at: Some(30),
            row_version: 5,
            ..incoming
        };
        store.apply_remote(EntityKind::Watchlist, &tombstone).unwrap();
        assert!(store.get_row(EntityKind::Watchlist, "w-remote").unwrap().is_none());
    }
}
