//! Conversation memory: bounded per-conversation exchange windows.
//!
//! A [`SessionStore`] maps conversation ids to [`MemorySession`]s. Each
//! session keeps only the most recent `window` exchanges; appending beyond
//! that evicts the oldest one. Sessions live as long as the store does.
//!
//! Every session guards its buffer with its own lock, so queries on
//! different conversations never contend and a single append is atomic.

use ragdesk_core::error::MemoryError;
use ragdesk_core::message::{ConversationId, Exchange};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, error, info};

/// Rendered history when a conversation has no exchanges yet.
pub const NO_HISTORY: &str = "No previous conversation history.";
/// Rendered history when the session could not be read.
pub const HISTORY_UNAVAILABLE: &str = "Error accessing chat history.";

/// The bounded exchange history of one conversation.
#[derive(Debug)]
pub struct MemorySession {
    conversation_id: ConversationId,
    window: usize,
    exchanges: Mutex<VecDeque<Exchange>>,
}

impl MemorySession {
    /// Create an empty session keeping at most `window` exchanges (min 1).
    pub fn new(conversation_id: ConversationId, window: usize) -> Self {
        let window = window.max(1);
        Self {
            conversation_id,
            window,
            exchanges: Mutex::new(VecDeque::with_capacity(window)),
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Remember one exchange, evicting the oldest once over the window.
    pub fn append(
        &self,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Result<(), MemoryError> {
        let mut exchanges = self.exchanges.lock().map_err(|e| {
            MemoryError::Poisoned(format!("session {}: {e}", self.conversation_id))
        })?;

        exchanges.push_back(Exchange::new(question, answer));
        while exchanges.len() > self.window {
            exchanges.pop_front();
        }

        debug!(
            conversation_id = %self.conversation_id,
            len = exchanges.len(),
            "Exchange saved to memory"
        );
        Ok(())
    }

    /// Snapshot of the exchanges, oldest first.
    pub fn exchanges(&self) -> Result<Vec<Exchange>, MemoryError> {
        let exchanges = self.exchanges.lock().map_err(|e| {
            MemoryError::Poisoned(format!("session {}: {e}", self.conversation_id))
        })?;
        Ok(exchanges.iter().cloned().collect())
    }

    /// Number of exchanges currently held.
    pub fn len(&self) -> usize {
        self.exchanges
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render the history as alternating `User:` / `AI:` lines.
    pub fn try_format(&self) -> Result<String, MemoryError> {
        let exchanges = self.exchanges()?;
        if exchanges.is_empty() {
            return Ok(NO_HISTORY.to_string());
        }

        let turns: Vec<String> = exchanges
            .iter()
            .map(|e| format!("User: {}\nAI: {}", e.question, e.answer))
            .collect();

        Ok(format!("Conversation History:\n{}", turns.join("\n")))
    }

    /// Like [`try_format`](Self::try_format) but never fails: a read failure
    /// degrades to [`HISTORY_UNAVAILABLE`] so generation can go on without
    /// history.
    pub fn format(&self) -> String {
        match self.try_format() {
            Ok(text) => text,
            Err(e) => {
                error!(
                    conversation_id = %self.conversation_id,
                    error = %e,
                    "Error formatting chat history"
                );
                HISTORY_UNAVAILABLE.to_string()
            }
        }
    }
}

/// Registry of memory sessions keyed by conversation id.
///
/// Constructed once by the host and shared (behind an `Arc`) with whatever
/// answers questions.
#[derive(Debug)]
pub struct SessionStore {
    window: usize,
    sessions: RwLock<HashMap<ConversationId, Arc<MemorySession>>>,
}

impl SessionStore {
    /// Create an empty store whose sessions keep `window` exchanges.
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// The session for `id`, created empty on first reference.
    pub fn get_or_create(&self, id: &ConversationId) -> Result<Arc<MemorySession>, MemoryError> {
        if let Some(session) = self.get(id)? {
            return Ok(session);
        }

        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| MemoryError::Poisoned(format!("session registry: {e}")))?;

        let session = sessions
            .entry(id.clone())
            .or_insert_with(|| {
                info!(conversation_id = %id, window = self.window, "Memory initialized for conversation");
                Arc::new(MemorySession::new(id.clone(), self.window))
            })
            .clone();

        Ok(session)
    }

    /// The session for `id`, if one exists.
    pub fn get(&self, id: &ConversationId) -> Result<Option<Arc<MemorySession>>, MemoryError> {
        let sessions = self
            .sessions
            .read()
            .map_err(|e| MemoryError::Poisoned(format!("session registry: {e}")))?;
        Ok(sessions.get(id).cloned())
    }

    pub fn contains(&self, id: &ConversationId) -> bool {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(id)
    }

    /// Number of known conversations.
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(5)
    }
}
