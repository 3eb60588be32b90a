//! Path-keyed store of sessions whose consumer went away.
//!
//! When a consumer is torn down its provider state and navigation snapshot
//! are parked here under the root path; the next consumer for the same root
//! takes them back out. Taking an entry removes it, so at most one consumer
//! drives a session at a time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::navigation::NavigationSnapshot;
use crate::provider::ProviderState;

/// Everything kept for a detached consumer.
#[derive(Debug, Clone)]
pub struct ParkedSession {
    /// Unique id of this parking, for log correlation.
    pub id: String,
    pub provider: Option<ProviderState>,
    pub navigation: Option<NavigationSnapshot>,
    pub parked_at: DateTime<Utc>,
}

impl ParkedSession {
    pub fn new(provider: Option<ProviderState>, navigation: Option<NavigationSnapshot>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            provider,
            navigation,
            parked_at: Utc::now(),
        }
    }
}

/// Thread-safe registry of parked sessions.
///
/// Cheap to clone; clones share the same entries. Create one per process
/// (or per test) and hand it to every controller that should be able to
/// resume another's session.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<String, ParkedSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a session under `root`, replacing any entry already there.
    pub fn detach(&self, root: &str, session: ParkedSession) {
        let id = session.id.clone();
        if let Some(previous) = self.sessions.insert(root.to_string(), session) {
            tracing::debug!(root = %root, replaced = %previous.id, "Replaced parked session");
        }
        tracing::info!(root = %root, session_id = %id, "Session parked");
    }

    /// Take the session parked under `root`, if any.
    pub fn reattach(&self, root: &str) -> Option<ParkedSession> {
        let (_, session) = self.sessions.remove(root)?;
        tracing::info!(
            root = %root,
            session_id = %session.id,
            parked_secs = (Utc::now() - session.parked_at).num_seconds(),
            "Session reattached"
        );
        Some(session)
    }

    /// Park provider state only, unless an entry already exists.
    ///
    /// Used by a provider that stops on its own (paused) while its consumer
    /// is still alive. Returns `true` if the state was parked.
    pub fn park_provider(&self, root: &str, state: ProviderState) -> bool {
        match self.sessions.entry(root.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let session = ParkedSession::new(Some(state), None);
                tracing::debug!(root = %root, session_id = %session.id, "Provider parked itself");
                slot.insert(session);
                true
            }
        }
    }

    /// Remove an entry created by [`Self::park_provider`].
    ///
    /// Entries carrying a navigation snapshot belong to a detached consumer
    /// and are left alone.
    pub fn reclaim_provider(&self, root: &str) -> bool {
        self.sessions
            .remove_if(root, |_, session| session.navigation.is_none())
            .is_some()
    }

    pub fn contains(&self, root: &str) -> bool {
        self.sessions.contains_key(root)
    }

    /// Roots with a parked session.
    pub fn roots(&self) -> Vec<String> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
