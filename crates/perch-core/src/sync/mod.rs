//! Sync orchestrator
//!
//! Drives the push/pull reconciliation loop between the local store and the
//! remote service, one entity kind at a time in parent-before-child order.
//! Conflicts resolve by last-write-wins on `updated_at`; transient failures
//! back off per [`RetryPolicy`]; a cycle is never atomic across kinds, since
//! every row's status is tracked independently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::db::{EntityStore, LocalRow};
use crate::error::{Error, Result, TransientKind};
use crate::models::{EntityKind, SyncStatus};
use crate::remote::{PushOutcome, RemoteRow, RemoteSyncService};
use crate::retry::RetryPolicy;

/// Tunables for the sync loop
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub retry: RetryPolicy,
}

/// What a sync cycle accomplished. Returned instead of thrown: per-row
/// failures land in `failed`, not in an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub pushed: usize,
    pub pulled: usize,
    pub conflicts_resolved: usize,
    pub failed: usize,
    /// The cycle stopped early (connectivity loss or cancellation); rows not
    /// yet reached keep their pending status
    pub aborted: bool,
    /// A cycle was already in flight; this trigger did nothing
    pub coalesced: bool,
}

impl SyncSummary {
    fn coalesced() -> Self {
        Self {
            coalesced: true,
            ..Self::default()
        }
    }
}

/// Cooperative cancellation for an in-flight cycle. Checked between rows, so
/// no row is ever left half-written.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    fn reset(&self) {
        self.flag.store(false, Ordering::Relaxed);
    }
}

/// Whether to keep working through the cycle
enum Flow {
    Continue,
    Abort,
}

/// Reconciles local pending rows with the remote authoritative store
pub struct SyncOrchestrator<R> {
    store: Arc<EntityStore>,
    remote: R,
    options: SyncOptions,
    gate: tokio::sync::Mutex<()>,
    cancel: CancelHandle,
}

impl<R: RemoteSyncService> SyncOrchestrator<R> {
    pub fn new(store: Arc<EntityStore>, remote: R) -> Self {
        Self::with_options(store, remote, SyncOptions::default())
    }

    pub fn with_options(store: Arc<EntityStore>, remote: R, options: SyncOptions) -> Self {
        Self {
            store,
            remote,
            options,
            gate: tokio::sync::Mutex::new(()),
            cancel: CancelHandle::default(),
        }
    }

    /// Handle for cancelling an in-flight cycle (e.g. on app background)
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Run one sync cycle. Safe to call repeatedly: a trigger while a cycle
    /// is in flight is coalesced, not queued.
    ///
    /// Only setup-level and authentication errors propagate; everything else
    /// is accounted for in the summary.
    pub async fn trigger_sync(&self) -> Result<SyncSummary> {
        let Ok(_guard) = self.gate.try_lock() else {
            tracing::debug!("sync already in flight; coalescing trigger");
            return Ok(SyncSummary::coalesced());
        };
        self.cancel.reset();

        let mut summary = SyncSummary::default();
        tracing::info!("sync cycle started");

        for kind in EntityKind::SYNC_ORDER {
            // An explicit trigger re-enters failed rows into their pending state
            self.store.requeue_failed(kind)?;

            if matches!(self.push_kind(kind, &mut summary).await?, Flow::Abort) {
                summary.aborted = true;
                return Ok(summary);
            }
            if matches!(self.pull_kind(kind, &mut summary).await?, Flow::Abort) {
                summary.aborted = true;
                return Ok(summary);
            }
        }

        tracing::info!(
            pushed = summary.pushed,
            pulled = summary.pulled,
            conflicts = summary.conflicts_resolved,
            failed = summary.failed,
            "sync cycle finished"
        );
        Ok(summary)
    }

    async fn push_kind(&self, kind: EntityKind, summary: &mut SyncSummary) -> Result<Flow> {
        for row in self.store.pending_push_rows(kind)? {
            if self.cancel.is_cancelled() {
                tracing::debug!(%kind, "sync cancelled during push phase");
                return Ok(Flow::Abort);
            }
            if matches!(self.push_row(kind, row, summary).await?, Flow::Abort) {
                return Ok(Flow::Abort);
            }
        }
        Ok(Flow::Continue)
    }

    /// Upsert or delete, depending on whether the row is a tombstone
    async fn call_push(&self, kind: EntityKind, row: &LocalRow) -> Result<PushOutcome> {
        if row.meta.is_deleted() {
            self.remote
                .soft_delete(kind, &row.id, row.meta.row_version)
                .await
        } else {
            let wire = row.to_remote();
            self.remote.upsert(kind, &wire, wire.row_version).await
        }
    }

    async fn push_row(
        &self,
        kind: EntityKind,
        row: LocalRow,
        summary: &mut SyncSummary,
    ) -> Result<Flow> {
        let mut attempt = 0;
        loop {
            match self.call_push(kind, &row).await {
                Ok(PushOutcome::Applied) => {
                    self.finish_applied(kind, &row)?;
                    summary.pushed += 1;
                    return Ok(Flow::Continue);
                }
                Ok(PushOutcome::Conflict(remote_row)) => {
                    summary.conflicts_resolved += 1;
                    return self.resolve_conflict(kind, row, remote_row, summary).await;
                }
                Err(error @ Error::Authentication(_)) => {
                    tracing::warn!(%kind, id = %row.id, "authentication failed; halting sync cycle");
                    return Err(error);
                }
                Err(error) if self.options.retry.should_retry(&error, attempt) => {
                    let delay = self.options.retry.delay(attempt);
                    tracing::debug!(
                        %kind, id = %row.id, attempt, ?delay, %error,
                        "push failed; backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) if error.transient_kind() == Some(TransientKind::NoConnectivity) => {
                    tracing::warn!(%error, "connectivity lost; aborting remainder of cycle");
                    return Ok(Flow::Abort);
                }
                Err(error) => {
                    tracing::warn!(%kind, id = %row.id, %error, "push exhausted; marking row failed");
                    self.store.mark_failed(kind, &row.id, row.meta.row_version)?;
                    summary.failed += 1;
                    return Ok(Flow::Continue);
                }
            }
        }
    }

    fn finish_applied(&self, kind: EntityKind, row: &LocalRow) -> Result<()> {
        if row.meta.is_deleted() {
            // Tombstone acknowledged: the row leaves local storage for good
            self.store.finish_delete(kind, &row.id, row.meta.row_version)?;
        } else {
            self.store
                .mark_synced(kind, &row.id, row.meta.row_version, row.meta.row_version)?;
        }
        Ok(())
    }

    /// Last-write-wins on `updated_at`: a strictly newer local row is
    /// republished once at the version the remote expects; otherwise the
    /// remote row overwrites the local pending change.
    async fn resolve_conflict(
        &self,
        kind: EntityKind,
        local: LocalRow,
        remote_row: RemoteRow,
        summary: &mut SyncSummary,
    ) -> Result<Flow> {
        if local.meta.updated_at > remote_row.updated_at {
            let forced_version = remote_row.row_version + 1;
            tracing::debug!(
                %kind, id = %local.id, forced_version,
                "conflict: local row is newer; republishing"
            );

            let mut forced = local.clone();
            forced.meta.row_version = forced_version;
            match self.call_push(kind, &forced).await {
                Ok(PushOutcome::Applied) => {
                    if forced.meta.is_deleted() {
                        self.store
                            .finish_delete(kind, &forced.id, local.meta.row_version)?;
                    } else {
                        self.store.mark_synced(
                            kind,
                            &forced.id,
                            local.meta.row_version,
                            forced_version,
                        )?;
                    }
                    summary.pushed += 1;
                    Ok(Flow::Continue)
                }
                Ok(PushOutcome::Conflict(_)) => {
                    // The remote moved again mid-resolution; the next cycle
                    // re-resolves from fresh state
                    tracing::debug!(%kind, id = %local.id, "republish conflicted; leaving row pending");
                    Ok(Flow::Continue)
                }
                Err(error @ Error::Authentication(_)) => Err(error),
                Err(error) if error.transient_kind() == Some(TransientKind::NoConnectivity) => {
                    Ok(Flow::Abort)
                }
                Err(error) => {
                    tracing::warn!(%kind, id = %local.id, %error, "republish failed; marking row failed");
                    self.store.mark_failed(kind, &local.id, local.meta.row_version)?;
                    summary.failed += 1;
                    Ok(Flow::Continue)
                }
            }
        } else {
            tracing::debug!(%kind, id = %local.id, "conflict: remote row is newer; accepting it");
            self.store.apply_remote(kind, &remote_row)?;
            Ok(Flow::Continue)
        }
    }

    async fn pull_kind(&self, kind: EntityKind, summary: &mut SyncSummary) -> Result<Flow> {
        let since = self.store.watermark(kind)?;

        let mut attempt = 0;
        let rows = loop {
            match self.remote.fetch_updated_since(kind, since).await {
                Ok(rows) => break rows,
                Err(error @ Error::Authentication(_)) => return Err(error),
                Err(error) if self.options.retry.should_retry(&error, attempt) => {
                    let delay = self.options.retry.delay(attempt);
                    tracing::debug!(%kind, attempt, ?delay, %error, "pull failed; backing off");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) if error.transient_kind() == Some(TransientKind::NoConnectivity) => {
                    tracing::warn!(%error, "connectivity lost; aborting remainder of cycle");
                    return Ok(Flow::Abort);
                }
                Err(error) => {
                    tracing::warn!(%kind, %error, "pull exhausted; skipping this kind for now");
                    return Ok(Flow::Continue);
                }
            }
        };

        for row in rows {
            if self.cancel.is_cancelled() {
                tracing::debug!(%kind, "sync cancelled during pull phase");
                return Ok(Flow::Abort);
            }
            match self.store.get_row(kind, &row.id)? {
                None => {
                    // A tombstone for a row we never had needs no action
                    if !row.is_tombstone() {
                        self.store.apply_remote(kind, &row)?;
                        summary.pulled += 1;
                    }
                }
                Some(local) if local.meta.status == SyncStatus::Synced => {
                    self.store.apply_remote(kind, &row)?;
                    summary.pulled += 1;
                }
                // Pending local change: the next push phase reconciles it
                Some(_) => {}
            }
        }
        Ok(Flow::Continue)
    }
}
