//! In-memory admin sessions.
//!
//! Each session owns at most one roster view. Signing out or idling past the
//! session TTL tears that view down.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::{AdminCredentials, AuthError};
use crate::db::Collection;
use crate::errors::AppError;
use crate::roster::RosterView;

struct AdminSession<C> {
    created_at: Instant,
    last_seen: RwLock<Instant>,
    roster: Mutex<Option<Arc<RosterView<C>>>>,
}

impl<C: Collection> AdminSession<C> {
    async fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(*self.last_seen.read().await) >= ttl
    }

    async fn touch(&self) {
        *self.last_seen.write().await = Instant::now();
    }

    async fn close_roster(&self) {
        let view = self.roster.lock().await.take();
        if let Some(view) = view {
            view.close().await;
        }
    }
}

/// Signed-in admin sessions keyed by opaque token.
///
/// A session expires once it has gone unused for longer than the TTL.
pub struct SessionRegistry<C> {
    collection: Arc<C>,
    ttl: Duration,
    sessions: RwLock<HashMap<String, Arc<AdminSession<C>>>>,
}

impl<C: Collection> SessionRegistry<C> {
    pub fn new(collection: Arc<C>, ttl: Duration) -> Self {
        Self {
            collection,
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Check credentials and open a new session.
    pub async fn sign_in(
        &self,
        credentials: &AdminCredentials,
        email: &str,
        password: &str,
    ) -> Result<String, AuthError> {
        if let Err(e) = credentials.verify(email, password) {
            tracing::warn!("Admin sign-in rejected: {}", e);
            return Err(e);
        }

        self.reap_expired().await;

        let now = Instant::now();
        let token = uuid::Uuid::new_v4().simple().to_string();
        let session = Arc::new(AdminSession {
            created_at: now,
            last_seen: RwLock::new(now),
            roster: Mutex::new(None),
        });
        self.sessions.write().await.insert(token.clone(), session);

        tracing::info!("Admin signed in");
        Ok(token)
    }

    /// End a session and close its roster. Returns false for unknown tokens.
    pub async fn sign_out(&self, token: &str) -> bool {
        let removed = self.sessions.write().await.remove(token);
        let Some(session) = removed else {
            return false;
        };

        session.close_roster().await;
        tracing::info!("Admin signed out");
        true
    }

    pub async fn is_authenticated(&self, token: &str) -> bool {
        self.live_session(token).await.is_some()
    }

    /// The session's live roster, opening a fresh one when there is none or the
    /// current one has lost its stream.
    pub async fn roster(&self, token: &str) -> Result<Arc<RosterView<C>>, AppError> {
        let session = self
            .live_session(token)
            .await
            .ok_or(AuthError::InvalidSession)?;

        let mut slot = session.roster.lock().await;
        if let Some(view) = slot.as_ref() {
            if view.is_live().await {
                return Ok(Arc::clone(view));
            }
        }

        let view = Arc::new(RosterView::new(Arc::clone(&self.collection)));
        view.open().await?;

        if let Some(stale) = slot.replace(Arc::clone(&view)) {
            stale.close().await;
        }
        Ok(view)
    }

    /// Close the session's roster if one is open.
    pub async fn close_roster(&self, token: &str) -> Result<(), AuthError> {
        let session = self
            .live_session(token)
            .await
            .ok_or(AuthError::InvalidSession)?;

        session.close_roster().await;
        Ok(())
    }

    /// Drop every expired session and close its roster. Returns how many went.
    pub async fn reap_expired(&self) -> usize {
        let now = Instant::now();
        let expired = {
            let mut sessions = self.sessions.write().await;
            let mut expired_tokens = Vec::new();
            for (token, session) in sessions.iter() {
                if session.is_expired(self.ttl, now).await {
                    expired_tokens.push(token.clone());
                }
            }
            expired_tokens
                .iter()
                .filter_map(|token| sessions.remove(token))
                .collect::<Vec<_>>()
        };

        for session in &expired {
            session.close_roster().await;
            tracing::info!(
                age_secs = session.created_at.elapsed().as_secs(),
                "Admin session expired"
            );
        }
        expired.len()
    }

    /// Sweep expired sessions every `every` until the registry is dropped.
    pub fn spawn_reaper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let registry: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let reaped = registry.reap_expired().await;
                if reaped > 0 {
                    tracing::debug!(reaped, "Reaped expired admin sessions");
                }
            }
        })
    }

    /// Look up a session, refreshing it when live and expiring it otherwise.
    async fn live_session(&self, token: &str) -> Option<Arc<AdminSession<C>>> {
        let session = self.sessions.read().await.get(token).cloned()?;

        if session.is_expired(self.ttl, Instant::now()).await {
            let removed = self.sessions.write().await.remove(token);
            if let Some(session) = removed {
                session.close_roster().await;
                tracing::info!("Admin session expired");
            }
            return None;
        }

        session.touch().await;
        Some(session)
    }
}
