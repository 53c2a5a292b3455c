//! Per-session chat transcripts.
//!
//! Sessions are created on demand, expire after a period of inactivity, and are
//! evicted oldest-first (skipping any with a chat in flight) when the store is
//! full. Each transcript has its own lock so one exchange per session is in
//! flight at a time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::assistant::Transcript;

pub type SharedTranscript = Arc<Mutex<Transcript>>;

struct SessionEntry {
    transcript: SharedTranscript,
    last_accessed: Instant,
}

pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    max_sessions: usize,
    timeout: Duration,
}

impl SessionStore {
    pub fn new(max_sessions: usize, timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
            timeout,
        }
    }

    /// Resume `session_id` if known, otherwise start a fresh transcript under it
    /// (or under a new id when none is given).
    pub async fn get_or_create(&self, session_id: Option<String>) -> (String, SharedTranscript) {
        let mut sessions = self.sessions.lock().await;

        if let Some(ref id) = session_id {
            if let Some(entry) = sessions.get_mut(id) {
                entry.last_accessed = Instant::now();
                return (id.clone(), entry.transcript.clone());
            }
        }

        if sessions.len() >= self.max_sessions {
            // Sessions with a chat in flight hold their transcript lock and are not evictable
            let oldest_idle = sessions
                .iter()
                .filter(|(_, e)| e.transcript.try_lock().is_ok())
                .min_by_key(|(_, e)| e.last_accessed)
                .map(|(id, _)| id.clone());

            match oldest_idle {
                Some(oldest_id) => {
                    sessions.remove(&oldest_id);
                    info!("Removed oldest session {} to make room", oldest_id);
                }
                None => warn!(
                    "All {} sessions are busy; exceeding the session limit",
                    sessions.len()
                ),
            }
        }

        let new_id = session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let transcript: SharedTranscript = Arc::new(Mutex::new(Transcript::new()));

        sessions.insert(
            new_id.clone(),
            SessionEntry {
                transcript: transcript.clone(),
                last_accessed: Instant::now(),
            },
        );

        info!("Created new session: {}", new_id);
        (new_id, transcript)
    }

    pub async fn get(&self, session_id: &str) -> Option<SharedTranscript> {
        let mut sessions = self.sessions.lock().await;
        sessions.get_mut(session_id).map(|entry| {
            entry.last_accessed = Instant::now();
            entry.transcript.clone()
        })
    }

    /// End a session, discarding its transcript.
    pub async fn remove(&self, session_id: &str) -> bool {
        let removed = self.sessions.lock().await.remove(session_id).is_some();
        if removed {
            info!("Ended session: {}", session_id);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Drop sessions idle for longer than the timeout. Returns how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before_count = sessions.len();

        sessions.retain(|id, entry| {
            let expired = entry.last_accessed.elapsed() > self.timeout;
            if expired {
                debug!("Expiring session: {}", id);
            }
            !expired
        });

        let removed = before_count - sessions.len();
        if removed > 0 {
            info!("Cleaned up {} expired sessions", removed);
        }
        removed
    }
}
