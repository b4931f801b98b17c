// src/conversation/registry.rs — Session registry: session id -> conversation
//
// The map lock is a plain mutex held only for lookups and inserts, never across
// an await. Each session sits behind its own async mutex; holding it for the
// whole request serializes operations on one session while different sessions
// run in parallel.
//
// Idle time is tracked on the map entry and refreshed under the map lock, so a
// sweep can never remove a session between lookup and the caller locking it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::sequencer::{Sequencer, DEFAULT_HISTORY_WINDOW};
use crate::infra::errors::{ParlayError, Result};
use crate::scenario::ScenarioCatalog;

pub type SessionHandle = Arc<tokio::sync::Mutex<ConversationSession>>;

/// One learner's run through a scenario.
#[derive(Debug)]
pub struct ConversationSession {
    pub session_id: String,
    pub sequencer: Sequencer,
    pub created_at: DateTime<Utc>,
}

impl ConversationSession {
    pub fn scenario_code(&self) -> Option<&str> {
        self.sequencer
            .scenario()
            .ok()
            .map(|s| s.scenario_code.as_str())
    }
}

struct SessionEntry {
    scenario_code: String,
    handle: SessionHandle,
    last_seen: DateTime<Utc>,
}

pub struct SessionRegistry {
    catalog: Arc<ScenarioCatalog>,
    sessions: Mutex<HashMap<String, SessionEntry>>,
    history_window: usize,
}

impl SessionRegistry {
    pub fn new(catalog: Arc<ScenarioCatalog>) -> Self {
        Self {
            catalog,
            sessions: Mutex::new(HashMap::new()),
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub fn catalog(&self) -> &Arc<ScenarioCatalog> {
        &self.catalog
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return the session for `session_id`, creating it when absent or when it is
    /// bound to a different scenario (the old session is replaced, not merged).
    /// Unknown scenario codes select the catalog default. The flag is true when a
    /// new session was created.
    pub fn get_or_create(&self, session_id: &str, scenario_code: &str) -> (SessionHandle, bool) {
        let scenario = self.catalog.resolve_or_default(scenario_code);
        let mut sessions = self.lock();
        let now = Utc::now();

        if let Some(entry) = sessions.get_mut(session_id) {
            if entry.scenario_code == scenario.scenario_code {
                entry.last_seen = now;
                return (Arc::clone(&entry.handle), false);
            }
            tracing::info!(
                "Session '{}' switching scenario '{}' -> '{}'",
                session_id,
                entry.scenario_code,
                scenario.scenario_code
            );
        } else {
            tracing::info!(
                "Session '{}' created with scenario '{}'",
                session_id,
                scenario.scenario_code
            );
        }

        let mut sequencer = Sequencer::new().with_history_window(self.history_window);
        let scenario_code = scenario.scenario_code.clone();
        sequencer.initialize(scenario);

        let handle = Arc::new(tokio::sync::Mutex::new(ConversationSession {
            session_id: session_id.to_string(),
            sequencer,
            created_at: now,
        }));
        sessions.insert(
            session_id.to_string(),
            SessionEntry {
                scenario_code,
                handle: Arc::clone(&handle),
                last_seen: now,
            },
        );
        (handle, true)
    }

    pub fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.lock().get_mut(session_id).map(|e| {
            e.last_seen = Utc::now();
            Arc::clone(&e.handle)
        })
    }

    /// Restart an existing session from its first step.
    pub async fn reset(&self, session_id: &str) -> Result<()> {
        let handle = self
            .get(session_id)
            .ok_or_else(|| ParlayError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;
        let mut session = handle.lock().await;
        session.sequencer.reset()?;
        tracing::info!("Session '{}' reset", session_id);
        Ok(())
    }

    /// Drop a session. Returns whether it existed.
    pub fn remove(&self, session_id: &str) -> bool {
        let removed = self.lock().remove(session_id).is_some();
        if removed {
            tracing::info!("Session '{}' removed", session_id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove sessions not looked up for longer than `max_idle`. Sessions busy
    /// with a request are skipped. Returns the number removed.
    pub fn sweep_idle(&self, max_idle: chrono::Duration) -> usize {
        let cutoff = Utc::now() - max_idle;
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_seen >= cutoff || entry.handle.try_lock().is_err());
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!("Swept {} idle session(s)", removed);
        }
        removed
    }
}
