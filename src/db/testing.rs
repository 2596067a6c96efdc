//! Test doubles for the submission collection.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use tokio::sync::{broadcast, Barrier};

use super::{
    init_database, Collection, NewSubmission, Snapshot, StoreError, SubmissionId, SubmissionStore,
    Subscription, WriteTime,
};
use crate::models::{Service, Status};

/// A store backed by a fresh database in a temp dir.
pub async fn temp_store() -> (SubmissionStore, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let pool = init_database(&dir.path().join("test.sqlite"))
        .await
        .expect("Failed to init DB");
    (SubmissionStore::new(pool, 64), dir)
}

pub fn new_submission(name: &str) -> NewSubmission {
    NewSubmission {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        service: Service::Web,
        message: "hi".to_string(),
        status: Status::Pending,
        timestamp: WriteTime::ServerTime,
    }
}

/// Wraps a real store and injects failures.
///
/// With `hold_notifications` the subscription stream is detached from the
/// store and only moves when the test calls `release`.
pub struct FlakyCollection {
    pub inner: SubmissionStore,
    failing_deletes: Mutex<HashSet<String>>,
    fail_creates: AtomicBool,
    fail_subscribe: AtomicBool,
    fail_list_ids: AtomicBool,
    delete_gate: Mutex<Option<Arc<Barrier>>>,
    deletes_in_flight: AtomicUsize,
    peak_deletes_in_flight: AtomicUsize,
    held: Mutex<Option<broadcast::Sender<Snapshot>>>,
    pub delete_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
}

impl FlakyCollection {
    pub fn new(inner: SubmissionStore) -> Self {
        Self {
            inner,
            failing_deletes: Mutex::new(HashSet::new()),
            fail_creates: AtomicBool::new(false),
            fail_subscribe: AtomicBool::new(false),
            fail_list_ids: AtomicBool::new(false),
            delete_gate: Mutex::new(None),
            deletes_in_flight: AtomicUsize::new(0),
            peak_deletes_in_flight: AtomicUsize::new(0),
            held: Mutex::new(None),
            delete_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
        }
    }

    pub async fn temp() -> (Arc<Self>, TempDir) {
        let (store, dir) = temp_store().await;
        (Arc::new(Self::new(store)), dir)
    }

    pub fn fail_delete_of(&self, id: &str) {
        self.failing_deletes.lock().unwrap().insert(id.to_string());
    }

    pub fn fail_creates(&self) {
        self.fail_creates.store(true, Ordering::SeqCst);
    }

    pub fn fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    pub fn fail_list_ids(&self) {
        self.fail_list_ids.store(true, Ordering::SeqCst);
    }

    /// Park every delete until `parties` of them are waiting at once.
    pub fn park_deletes(&self, parties: usize) {
        *self.delete_gate.lock().unwrap() = Some(Arc::new(Barrier::new(parties)));
    }

    /// Most deletes that were ever in flight together.
    pub fn peak_deletes_in_flight(&self) -> usize {
        self.peak_deletes_in_flight.load(Ordering::SeqCst)
    }

    pub fn hold_notifications(&self) {
        let (sender, _) = broadcast::channel(16);
        *self.held.lock().unwrap() = Some(sender);
    }

    /// Deliver the store's current state to held subscribers.
    pub async fn release(&self) {
        let snapshot = self.inner.snapshot().await.unwrap();
        let sender = self.held.lock().unwrap().clone();
        if let Some(sender) = sender {
            let _ = sender.send(snapshot);
        }
    }

    /// Drop the held stream as if the backend went away.
    pub fn hang_up(&self) {
        self.held.lock().unwrap().take();
    }

    pub fn deletes(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

impl Collection for FlakyCollection {
    async fn create(&self, doc: NewSubmission) -> Result<SubmissionId, StoreError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("create disabled".to_string()));
        }
        self.inner.create(doc).await
    }

    async fn subscribe(&self) -> Result<Subscription, StoreError> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("subscribe disabled".to_string()));
        }
        let held = self.held.lock().unwrap().as_ref().map(|s| s.subscribe());
        match held {
            Some(updates) => Ok(Subscription {
                initial: self.inner.snapshot().await?,
                updates,
            }),
            None => self.inner.subscribe().await,
        }
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.deletes_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_deletes_in_flight
            .fetch_max(in_flight, Ordering::SeqCst);

        let gate = self.delete_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.wait().await;
        }

        let result = if self.failing_deletes.lock().unwrap().contains(id) {
            Err(StoreError::Rejected(format!("delete of {} disabled", id)))
        } else {
            self.inner.delete(id).await
        };
        self.deletes_in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn list_ids(&self) -> Result<Vec<SubmissionId>, StoreError> {
        if self.fail_list_ids.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("listing disabled".to_string()));
        }
        self.inner.list_ids().await
    }
}
