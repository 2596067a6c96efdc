//! SQLite-backed submission collection.
//!
//! Writes are serialized behind one async mutex so that revisions, server
//! timestamps and published snapshots all follow the order writes were applied.
//! If a post-write snapshot cannot be built, the notifier is replaced so that
//! every open standing query ends instead of going quietly stale.

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tokio::sync::{broadcast, Mutex};

use super::collection::{
    Collection, NewSubmission, Snapshot, StoreError, SubmissionId, Subscription, WriteTime,
};
use crate::models::{Service, Status, Submission};

/// Last server time handed out, so stamps never go backwards.
#[derive(Debug, Default)]
struct WriteClock {
    last_timestamp: Option<DateTime<Utc>>,
}

/// Submission collection persisted in SQLite with live snapshot fan-out.
pub struct SubmissionStore {
    pool: SqlitePool,
    clock: Mutex<WriteClock>,
    notify_capacity: usize,
    notifier: RwLock<broadcast::Sender<Snapshot>>,
}

impl SubmissionStore {
    pub fn new(pool: SqlitePool, notify_capacity: usize) -> Self {
        let notify_capacity = notify_capacity.max(1);
        let (notifier, _) = broadcast::channel(notify_capacity);
        Self {
            pool,
            clock: Mutex::new(WriteClock::default()),
            notify_capacity,
            notifier: RwLock::new(notifier),
        }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Read the full collection, newest first, at a single revision.
    pub async fn snapshot(&self) -> Result<Snapshot, StoreError> {
        let mut tx = self.pool.begin().await?;

        let meta = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&mut *tx)
            .await?;
        let rows = sqlx::query(
            "SELECT id, name, email, service, message, status, timestamp FROM submissions ORDER BY timestamp DESC, seq DESC",
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let submissions = rows
            .iter()
            .map(submission_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Snapshot {
            revision: meta.get("revision_id"),
            submissions,
        })
    }

    /// Number of live standing queries.
    pub fn subscriber_count(&self) -> usize {
        self.notifier
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .receiver_count()
    }

    /// Resolve a server-time directive against the write clock.
    async fn server_time(&self, clock: &mut WriteClock) -> Result<DateTime<Utc>, StoreError> {
        if clock.last_timestamp.is_none() {
            let row = sqlx::query("SELECT MAX(timestamp) AS latest FROM submissions")
                .fetch_one(&self.pool)
                .await?;
            let latest: Option<String> = row.get("latest");
            clock.last_timestamp = latest
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|t| t.with_timezone(&Utc));
        }

        let now = Utc::now();
        let stamped = match clock.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        clock.last_timestamp = Some(stamped);
        Ok(stamped)
    }

    /// Broadcast the post-write state. Must be called with the write clock held.
    async fn publish(&self) {
        match self.snapshot().await {
            Ok(snapshot) => {
                let revision = snapshot.revision;
                let notifier = self.notifier.read().unwrap_or_else(PoisonError::into_inner);
                if notifier.send(snapshot).is_err() {
                    tracing::trace!(revision, "No subscribers for snapshot");
                }
            }
            Err(e) => {
                // Dropping the old sender closes every receiver
                let (fresh, _) = broadcast::channel(self.notify_capacity);
                let mut notifier = self.notifier.write().unwrap_or_else(PoisonError::into_inner);
                let dropped = notifier.receiver_count();
                *notifier = fresh;
                tracing::error!(
                    subscribers = dropped,
                    "Failed to build snapshot after write, ending subscriptions: {}",
                    e
                );
            }
        }
    }
}

impl Collection for SubmissionStore {
    async fn create(&self, doc: NewSubmission) -> Result<SubmissionId, StoreError> {
        let mut clock = self.clock.lock().await;

        let timestamp = match doc.timestamp {
            WriteTime::ServerTime => self.server_time(&mut clock).await?,
        };
        let timestamp = timestamp.to_rfc3339_opts(SecondsFormat::Micros, true);
        let id = uuid::Uuid::new_v4().to_string();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO submissions (id, name, email, service, message, status, timestamp) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&doc.name)
        .bind(&doc.email)
        .bind(doc.service.as_str())
        .bind(&doc.message)
        .bind(doc.status.as_str())
        .bind(&timestamp)
        .execute(&mut *tx)
        .await?;

        bump_revision(&mut tx).await?;
        tx.commit().await?;

        tracing::debug!(%id, %timestamp, "Submission created");
        self.publish().await;

        Ok(id)
    }

    async fn subscribe(&self) -> Result<Subscription, StoreError> {
        // Holding the clock keeps writes out between registering and reading
        let _clock = self.clock.lock().await;
        let updates = self
            .notifier
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribe();
        let initial = self.snapshot().await?;

        Ok(Subscription { initial, updates })
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let _clock = self.clock.lock().await;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM submissions WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        bump_revision(&mut tx).await?;
        tx.commit().await?;

        tracing::debug!(%id, "Submission deleted");
        self.publish().await;

        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<SubmissionId>, StoreError> {
        let rows = sqlx::query("SELECT id FROM submissions ORDER BY timestamp DESC, seq DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|row| row.get("id")).collect())
    }
}

async fn bump_revision(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
        .bind(&now)
        .execute(conn)
        .await?;
    Ok(())
}

fn submission_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Submission, StoreError> {
    let service: String = row.get("service");
    let status: String = row.get("status");

    Ok(Submission {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        service: Service::from_str(&service)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown service {:?}", service)))?,
        message: row.get("message"),
        timestamp: row.get("timestamp"),
        status: Status::from_str(&status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown status {:?}", status)))?,
    })
}
