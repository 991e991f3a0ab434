//! Session ownership and the async two-phase compaction protocol
//!
//! Each session wraps its window in a `RwLock`: appends and compaction
//! results are writers, context and stats are readers. The summarizer call
//! itself runs with no lock held; the task re-acquires the write lock only
//! to apply or discard the result.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::PoisonError;
use std::time::{Duration, Instant};

use callshadow_protocol::{ContextSnapshot, ConversationStats, Turn, TurnInput};
use tokio::sync::RwLock;
use tokio::time::timeout;

use crate::config::MemoryConfig;
use crate::error::MemoryError;
use crate::summarizer::Summarizer;
use crate::window::{CompactionBatch, MemoryWindow};

/// One live conversation: the window plus the machinery that serializes
/// writers and runs compaction off the append path.
pub struct Session {
    id: String,
    window: Arc<RwLock<MemoryWindow>>,
    last_activity: StdMutex<Instant>,
    closed: Arc<AtomicBool>,
    summarizer: Option<Arc<dyn Summarizer>>,
    summarizer_timeout: Duration,
    summary_max_chars: usize,
}

impl Session {
    fn new(id: &str, config: &MemoryConfig, summarizer: Option<Arc<dyn Summarizer>>) -> Self {
        Self {
            id: id.to_string(),
            window: Arc::new(RwLock::new(MemoryWindow::new(id, config))),
            last_activity: StdMutex::new(Instant::now()),
            closed: Arc::new(AtomicBool::new(false)),
            summarizer,
            summarizer_timeout: config.summarizer_timeout(),
            summary_max_chars: config.summary_max_chars,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Append one turn and return its sequence number. Never fails and never
    /// waits on the summarizer: when the soft threshold is crossed the
    /// summarization runs as a detached task.
    pub async fn append(&self, input: TurnInput) -> u64 {
        self.touch();
        let (sequence, batch) = {
            let mut window = self.window.write().await;
            let sequence = window.append(input);
            let batch = if self.summarizer.is_some() {
                window.begin_compaction()
            } else {
                None
            };
            (sequence, batch)
        };

        if let (Some(batch), Some(summarizer)) = (batch, self.summarizer.clone()) {
            tokio::spawn(run_compaction(
                self.id.clone(),
                Arc::clone(&self.window),
                Arc::clone(&self.closed),
                summarizer,
                batch,
                self.summarizer_timeout,
                self.summary_max_chars,
            ));
        }
        sequence
    }

    /// Summary plus up to `max_turns` most recent turns, oldest first.
    pub async fn context(&self, max_turns: Option<usize>) -> ContextSnapshot {
        self.touch();
        self.window.read().await.context(max_turns)
    }

    /// Aggregate counts over the live turns.
    pub async fn stats(&self) -> ConversationStats {
        self.touch();
        self.window.read().await.stats()
    }

    pub async fn last_turn(&self) -> Option<Turn> {
        self.window.read().await.last_turn().cloned()
    }

    pub async fn turn_count(&self) -> usize {
        self.window.read().await.len()
    }

    /// Reset turns and summary; the session itself stays registered.
    pub async fn clear(&self) {
        self.touch();
        self.window.write().await.clear();
    }

    fn touch(&self) {
        // the critical section is a plain store, so a poisoned lock still
        // holds a usable value
        *self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn last_activity(&self) -> Instant {
        *self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Second phase of compaction, detached from the append path. The
/// summarizer runs with no lock held; the write lock is re-acquired only to
/// apply or discard the result.
async fn run_compaction(
    session_id: String,
    window: Arc<RwLock<MemoryWindow>>,
    closed: Arc<AtomicBool>,
    summarizer: Arc<dyn Summarizer>,
    batch: CompactionBatch,
    deadline: Duration,
    summary_max_chars: usize,
) {
    let result = timeout(deadline, summarizer.summarize(&batch.turns, summary_max_chars)).await;

    let mut window = window.write().await;
    if closed.load(Ordering::SeqCst) {
        window.abort_compaction(batch.ticket);
        tracing::debug!(session_id = %session_id, "session deleted mid-compaction, result dropped");
        return;
    }
    match result {
        Ok(Ok(text)) => {
            if window.apply_summary(batch.ticket, text) {
                tracing::debug!(
                    session_id = %session_id,
                    summarized = batch.turns.len(),
                    live = window.len(),
                    "compaction applied"
                );
            } else {
                tracing::debug!(session_id = %session_id, "stale compaction result dropped");
            }
        }
        Ok(Err(error)) => {
            window.abort_compaction(batch.ticket);
            tracing::warn!(session_id = %session_id, %error, "summarization failed, turns kept");
        }
        Err(_) => {
            window.abort_compaction(batch.ticket);
            tracing::warn!(
                session_id = %session_id,
                timeout_ms = deadline.as_millis() as u64,
                "summarization timed out, turns kept"
            );
        }
    }
}

/// Owns all live sessions. The map lock protects only lookups, inserts, and
/// removals; it is never held across a summarizer call or a per-session
/// lock acquisition.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    config: MemoryConfig,
    summarizer: Option<Arc<dyn Summarizer>>,
}

impl SessionRegistry {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config: config.normalized(),
            summarizer: None,
        }
    }

    /// Attach the summarization collaborator. Without one, windows fall back
    /// to hard FIFO eviction only.
    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Return the session for `id`, creating it on first access. Touches the
    /// activity clock either way.
    pub async fn get_or_create(&self, id: &str) -> Arc<Session> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(id) {
                session.touch();
                return Arc::clone(session);
            }
        }
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(id.to_string()).or_insert_with(|| {
            tracing::info!(session_id = %id, "session created");
            Arc::new(Session::new(id, &self.config, self.summarizer.clone()))
        });
        session.touch();
        Arc::clone(session)
    }

    /// Lookup without creation, for diagnostics endpoints.
    pub async fn get(&self, id: &str) -> Result<Arc<Session>, MemoryError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .map(Arc::clone)
            .ok_or_else(|| MemoryError::SessionNotFound(id.to_string()))
    }

    /// Remove a session. Idempotent; returns whether anything was removed.
    /// In-flight summarization results for the session are dropped.
    pub async fn delete(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id);
        match removed {
            Some(session) => {
                session.close();
                tracing::info!(session_id = %id, "session deleted");
                true
            }
            None => false,
        }
    }

    /// Remove sessions idle longer than `idle_timeout`. Candidates are
    /// gathered under the read lock, then re-checked under the write lock so
    /// a session revived by a concurrent `get_or_create` survives.
    pub async fn sweep_expired(&self, idle_timeout: Duration) -> usize {
        let now = Instant::now();
        let candidates: Vec<String> = {
            let sessions = self.sessions.read().await;
            sessions
                .iter()
                .filter(|(_, session)| now.duration_since(session.last_activity()) >= idle_timeout)
                .map(|(id, _)| id.clone())
                .collect()
        };
        if candidates.is_empty() {
            return 0;
        }

        let mut removed = 0;
        let mut sessions = self.sessions.write().await;
        for id in candidates {
            let still_idle = sessions
                .get(&id)
                .is_some_and(|s| now.duration_since(s.last_activity()) >= idle_timeout);
            if still_idle {
                if let Some(session) = sessions.remove(&id) {
                    session.close();
                    removed += 1;
                }
            }
        }
        if removed > 0 {
            tracing::info!(removed, "idle sessions swept");
        }
        removed
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
