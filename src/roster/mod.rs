//! Live moderator view over the submission collection.
//!
//! A view moves Uninitialized -> Subscribed -> Closed. While subscribed, every
//! snapshot from the standing query replaces the whole list. Once closed the
//! listener is cancelled and anything arriving late is dropped.
//!
//! Deletes never touch the list locally, with one exception: a fully
//! successful `delete_all` clears it right away.

mod confirm;

pub use confirm::{Confirm, ConfirmPrompt};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::db::{Collection, Snapshot};
use crate::errors::messages;
use crate::models::{RosterPhase, RosterSnapshot, Submission};

#[derive(Debug, PartialEq, Eq)]
pub enum RosterError {
    /// The standing query could not be established or was lost
    Subscription,
    /// A single delete failed
    Write,
    /// A bulk delete could not read the ids to remove; nothing was deleted
    BulkListing,
    /// Some deletes of a bulk delete failed; successful ones stay deleted
    PartialDelete { deleted: usize, failed: usize },
    /// The view is not subscribed
    NotOpen,
    /// `open` was called on a view that is past Uninitialized
    AlreadyOpened,
}

impl std::fmt::Display for RosterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterError::Subscription => f.write_str("roster subscription failed"),
            RosterError::Write => f.write_str("delete failed"),
            RosterError::BulkListing => f.write_str("bulk delete could not list submissions"),
            RosterError::PartialDelete { deleted, failed } => {
                write!(f, "bulk delete incomplete: {} deleted, {} failed", deleted, failed)
            }
            RosterError::NotOpen => f.write_str("roster is not open"),
            RosterError::AlreadyOpened => f.write_str("roster already opened"),
        }
    }
}

impl std::error::Error for RosterError {}

/// Outcome of a confirmed or declined delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Declined,
    Deleted(usize),
}

#[derive(Debug)]
struct RosterState {
    phase: RosterPhase,
    loading: bool,
    banner: Option<String>,
    revision: i64,
    submissions: Vec<Submission>,
}

impl RosterState {
    /// Replace the list with a full snapshot. Returns false if discarded.
    fn apply(&mut self, snapshot: Snapshot) -> bool {
        if self.phase != RosterPhase::Subscribed {
            return false;
        }
        self.revision = snapshot.revision;
        self.submissions = snapshot.submissions;
        self.loading = false;
        self.banner = None;
        true
    }
}

/// Counts an in-flight delete for as long as it lives.
struct PendingGuard(Arc<AtomicUsize>);

impl PendingGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// One moderator's live list, bound to a single subscription.
pub struct RosterView<C> {
    collection: Arc<C>,
    state: Arc<RwLock<RosterState>>,
    pending: Arc<AtomicUsize>,
    cancel: CancellationToken,
}

impl<C: Collection> RosterView<C> {
    pub fn new(collection: Arc<C>) -> Self {
        Self {
            collection,
            state: Arc::new(RwLock::new(RosterState {
                phase: RosterPhase::Uninitialized,
                loading: true,
                banner: None,
                revision: 0,
                submissions: Vec::new(),
            })),
            pending: Arc::new(AtomicUsize::new(0)),
            cancel: CancellationToken::new(),
        }
    }

    /// Register the standing query and start applying its snapshots.
    ///
    /// On failure the view stays Uninitialized with a banner, so opening again
    /// is the retry.
    pub async fn open(&self) -> Result<(), RosterError> {
        if self.state.read().await.phase != RosterPhase::Uninitialized {
            return Err(RosterError::AlreadyOpened);
        }

        let subscription = match self.collection.subscribe().await {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::error!("Error fetching submissions: {}", e);
                let mut state = self.state.write().await;
                state.loading = false;
                state.banner = Some(messages::FETCH_FAILED.to_string());
                return Err(RosterError::Subscription);
            }
        };

        {
            let mut state = self.state.write().await;
            if state.phase != RosterPhase::Uninitialized {
                return Err(RosterError::AlreadyOpened);
            }
            state.phase = RosterPhase::Subscribed;
            state.apply(subscription.initial);
            tracing::debug!(
                revision = state.revision,
                count = state.submissions.len(),
                "Roster subscribed"
            );
        }

        tokio::spawn(listen(
            Arc::clone(&self.state),
            subscription.updates,
            self.cancel.clone(),
        ));

        Ok(())
    }

    /// Cancel the subscription. Idempotent.
    pub async fn close(&self) {
        let mut state = self.state.write().await;
        if state.phase != RosterPhase::Closed {
            state.phase = RosterPhase::Closed;
            tracing::debug!("Roster closed");
        }
        drop(state);
        self.cancel.cancel();
    }

    pub async fn phase(&self) -> RosterPhase {
        self.state.read().await.phase
    }

    /// Subscribed and still receiving snapshots.
    pub async fn is_live(&self) -> bool {
        let state = self.state.read().await;
        state.phase == RosterPhase::Subscribed && state.banner.is_none()
    }

    pub async fn snapshot(&self) -> RosterSnapshot {
        let state = self.state.read().await;
        RosterSnapshot {
            phase: state.phase,
            loading: state.loading,
            banner: state.banner.clone(),
            pending_deletes: self.pending.load(Ordering::SeqCst),
            revision: state.revision,
            submissions: state.submissions.clone(),
        }
    }

    /// Delete one submission after confirmation.
    ///
    /// The list is left alone; the next snapshot removes the item.
    pub async fn delete_one<F: Confirm>(
        &self,
        id: &str,
        confirm: &F,
    ) -> Result<DeleteOutcome, RosterError> {
        self.ensure_subscribed().await?;

        let prompt = ConfirmPrompt::DeleteOne { id: id.to_string() };
        if !confirm.confirm(&prompt).await {
            return Ok(DeleteOutcome::Declined);
        }

        let _pending = PendingGuard::new(&self.pending);
        match self.collection.delete(id).await {
            Ok(()) => {
                tracing::info!(%id, "Submission deleted");
                Ok(DeleteOutcome::Deleted(1))
            }
            Err(e) => {
                tracing::error!(%id, "Error deleting submission: {}", e);
                Err(RosterError::Write)
            }
        }
    }

    /// Delete every submission currently in the collection after confirmation.
    ///
    /// Ids are re-read from the collection and deleted concurrently. There is
    /// no rollback: on partial failure the survivors show up with the next
    /// snapshot.
    pub async fn delete_all<F: Confirm>(&self, confirm: &F) -> Result<DeleteOutcome, RosterError> {
        self.ensure_subscribed().await?;

        if !confirm.confirm(&ConfirmPrompt::DeleteAll).await {
            return Ok(DeleteOutcome::Declined);
        }

        let _pending = PendingGuard::new(&self.pending);
        let ids = self.collection.list_ids().await.map_err(|e| {
            tracing::error!("Error listing submissions for bulk delete: {}", e);
            RosterError::BulkListing
        })?;

        let mut deletes = JoinSet::new();
        for id in ids {
            let collection = Arc::clone(&self.collection);
            deletes.spawn(async move {
                let result = collection.delete(&id).await;
                (id, result)
            });
        }

        let mut deleted = 0;
        let mut failed = 0;
        while let Some(joined) = deletes.join_next().await {
            match joined {
                Ok((_, Ok(()))) => deleted += 1,
                Ok((id, Err(e))) => {
                    tracing::error!(%id, "Error deleting submission: {}", e);
                    failed += 1;
                }
                Err(e) => {
                    tracing::error!("Delete task failed: {}", e);
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            tracing::warn!(deleted, failed, "Bulk delete incomplete");
            return Err(RosterError::PartialDelete { deleted, failed });
        }

        let mut state = self.state.write().await;
        if state.phase == RosterPhase::Subscribed {
            state.submissions.clear();
        }
        tracing::info!(deleted, "All submissions deleted");

        Ok(DeleteOutcome::Deleted(deleted))
    }

    async fn ensure_subscribed(&self) -> Result<(), RosterError> {
        match self.state.read().await.phase {
            RosterPhase::Subscribed => Ok(()),
            _ => Err(RosterError::NotOpen),
        }
    }
}

impl<C> Drop for RosterView<C> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Apply snapshots until cancelled or the stream ends.
async fn listen(
    state: Arc<RwLock<RosterState>>,
    mut updates: broadcast::Receiver<Snapshot>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            received = updates.recv() => match received {
                Ok(snapshot) => {
                    let revision = snapshot.revision;
                    if !state.write().await.apply(snapshot) {
                        tracing::debug!(revision, "Discarded snapshot for closed roster");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // The next snapshot is complete, so skipped ones are superseded
                    tracing::warn!(skipped, "Roster lagged behind snapshot stream");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::error!("Submission stream closed");
                    let mut state = state.write().await;
                    if state.phase == RosterPhase::Subscribed {
                        state.banner = Some(messages::FETCH_FAILED.to_string());
                    }
                    break;
                }
            }
        }
    }
    tracing::debug!("Roster listener stopped");
}
