//! The query handler: one question in, one answer out.
//!
//! A query moves through a fixed sequence of stages:
//!
//! `Received → Validated → Retrieved → Assembled → Generated → Sanitized → Persisted → Returned`
//!
//! Any stage can fail. Fatal failures end the query with a fixed apology and
//! leave memory untouched; sanitizer and persistence failures only degrade
//! the result. Collaborator calls run behind panic containment, and the whole
//! pipeline sits behind one more boundary, so [`QueryHandler::handle`]
//! always produces an answer.

use crate::prompt;
use crate::sanitizer::{self, SanitizeError};
use crate::util::{LOG_PREVIEW_CHARS, panic_message, preview};
use futures::FutureExt;
use ragdesk_core::error::{ProviderError, QueryError, UNKNOWN_FAILURE_REPLY};
use ragdesk_core::message::QueryId;
use ragdesk_core::provider::Provider;
use ragdesk_core::retriever::{Passage, Retriever, join_passages};
use ragdesk_memory::MemorySession;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{Instrument, debug, error, info, info_span, warn};

// ── Types ─────────────────────────────────────────────────────────────────

/// Pipeline stage of a single query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Stage {
    #[default]
    Received,
    Validated,
    Retrieved,
    Assembled,
    Generated,
    Sanitized,
    Persisted,
    Returned,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Retrieved => "retrieved",
            Self::Assembled => "assembled",
            Self::Generated => "generated",
            Self::Sanitized => "sanitized",
            Self::Persisted => "persisted",
            Self::Returned => "returned",
        };
        f.write_str(name)
    }
}

/// Where and why a query stopped.
#[derive(Debug, Clone)]
pub struct QueryFailure {
    /// The stage that was being attempted.
    pub stage: Stage,
    pub error: QueryError,
}

/// Result of handling one query.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    /// Text for the caller: the sanitized answer or a fixed apology.
    pub answer: String,
    /// Last stage entered.
    pub stage: Stage,
    /// Set when the query ended early.
    pub failure: Option<QueryFailure>,
    /// Non-fatal problems the query recovered from.
    pub degraded: Vec<QueryError>,
}

impl QueryOutcome {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    fn failed(stage: Stage, error: QueryError, degraded: Vec<QueryError>) -> Self {
        let answer = error
            .apology()
            .unwrap_or(UNKNOWN_FAILURE_REPLY)
            .to_string();
        Self {
            answer,
            stage,
            failure: Some(QueryFailure { stage, error }),
            degraded,
        }
    }
}

#[derive(Debug, Default)]
struct Progress {
    stage: Stage,
    degraded: Vec<QueryError>,
}

impl Progress {
    fn enter(&mut self, stage: Stage) {
        debug!(%stage, "Entering stage");
        self.stage = stage;
    }
}

// ── Handler ───────────────────────────────────────────────────────────────

/// Orchestrates retrieval, prompt assembly, generation, sanitization and
/// memory update for one query.
pub struct QueryHandler {
    retriever: Option<Arc<dyn Retriever>>,
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    sanitizer: fn(&str) -> Result<String, SanitizeError>,
}

impl QueryHandler {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            retriever: None,
            provider,
            model: model.into(),
            temperature: 0.2,
            max_tokens: None,
            sanitizer: sanitizer::try_sanitize,
        }
    }

    /// Attach the passage retriever. Without one every query fails at
    /// retrieval with the "information system" reply.
    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Replace the answer sanitizer. A sanitizer error keeps the raw answer.
    pub fn with_sanitizer(mut self, sanitizer: fn(&str) -> Result<String, SanitizeError>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn has_retriever(&self) -> bool {
        self.retriever.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Answer `question` within `session`.
    ///
    /// Never fails and never panics outward. On success the exchange has been
    /// appended to the session (unless persistence degraded); on failure the
    /// session is left as it was.
    pub async fn handle(
        &self,
        question: &str,
        query_id: &QueryId,
        session: &MemorySession,
        domain_instructions: &str,
    ) -> QueryOutcome {
        let span = info_span!(
            "query",
            query_id = %query_id,
            conversation_id = %session.conversation_id()
        );

        let mut progress = Progress::default();
        let result = AssertUnwindSafe(
            self.run(question, session, domain_instructions, &mut progress)
                .instrument(span.clone()),
        )
        .catch_unwind()
        .await;

        let Progress { stage, degraded } = progress;
        match result {
            Ok(Ok(answer)) => QueryOutcome {
                answer,
                stage,
                failure: None,
                degraded,
            },
            Ok(Err(err)) => QueryOutcome::failed(stage, err, degraded),
            Err(payload) => {
                let message = panic_message(&payload);
                span.in_scope(|| error!(%stage, panic = %message, "Unexpected error while handling query"));
                QueryOutcome::failed(stage, QueryError::UnknownFailure(message), degraded)
            }
        }
    }

    async fn run(
        &self,
        question: &str,
        session: &MemorySession,
        domain_instructions: &str,
        progress: &mut Progress,
    ) -> Result<String, QueryError> {
        info!(question = %preview(question, LOG_PREVIEW_CHARS), "Processing query");

        progress.enter(Stage::Validated);
        if question.trim().is_empty() {
            warn!("Empty question received");
            return Err(QueryError::EmptyInput);
        }

        progress.enter(Stage::Retrieved);
        let passages = self.retrieve(question).await?;
        let context = join_passages(&passages);
        info!(
            passages = passages.len(),
            context = %preview(&context, LOG_PREVIEW_CHARS),
            "Retrieved context"
        );

        progress.enter(Stage::Assembled);
        let history = session.format();
        debug!(history = %preview(&history, LOG_PREVIEW_CHARS), "Chat history");
        let request = prompt::assemble(domain_instructions, &context, &history, question);

        progress.enter(Stage::Generated);
        let raw = self.generate(request).await?;

        progress.enter(Stage::Sanitized);
        let answer = match (self.sanitizer)(&raw) {
            Ok(clean) => clean,
            Err(e) => {
                warn!(error = %e, "Sanitizer failed, returning unsanitized answer");
                progress
                    .degraded
                    .push(QueryError::SanitizationFailure(e.to_string()));
                raw
            }
        };

        progress.enter(Stage::Persisted);
        match session.append(question, answer.as_str()) {
            Ok(()) => debug!(
                history = %preview(&session.format(), LOG_PREVIEW_CHARS),
                "Saved exchange to memory"
            ),
            Err(e) => {
                error!(error = %e, "Error saving exchange to memory");
                warn!("Proceeding with answer despite memory save failure");
                progress.degraded.push(QueryError::MemoryPersistFailure(e));
            }
        }

        progress.enter(Stage::Returned);
        info!(answer = %preview(&answer, LOG_PREVIEW_CHARS), "Final answer");
        Ok(answer)
    }

    async fn retrieve(&self, question: &str) -> Result<Vec<Passage>, QueryError> {
        let Some(retriever) = &self.retriever else {
            error!("Retriever not available");
            return Err(QueryError::RetrieverUnavailable(
                "no retriever configured".into(),
            ));
        };

        match AssertUnwindSafe(retriever.search(question)).catch_unwind().await {
            Ok(Ok(passages)) => Ok(passages),
            Ok(Err(e)) => {
                error!(retriever = retriever.name(), error = %e, "Retrieval failed");
                Err(QueryError::from_retrieval(e))
            }
            Err(payload) => {
                let message = panic_message(&payload);
                error!(retriever = retriever.name(), panic = %message, "Retriever panicked");
                Err(QueryError::RetrieverFailure(message))
            }
        }
    }

    async fn generate(&self, request: prompt::GenerationRequest) -> Result<String, QueryError> {
        let request = request.into_provider_request(&self.model, self.temperature, self.max_tokens);

        match AssertUnwindSafe(self.provider.complete(request))
            .catch_unwind()
            .await
        {
            Ok(Ok(response)) => {
                debug!(
                    provider = self.provider.name(),
                    model = %response.model,
                    "Completion received"
                );
                Ok(response.message.content)
            }
            Ok(Err(e)) => {
                log_generation_error(self.provider.name(), &e);
                Err(QueryError::from_generation(e))
            }
            Err(payload) => {
                let message = panic_message(&payload);
                error!(provider = self.provider.name(), panic = %message, "Provider panicked");
                Err(QueryError::GenerationOtherFailure(message))
            }
        }
    }
}

fn log_generation_error(provider: &str, err: &ProviderError) {
    if err.is_provider_specific() {
        error!(provider = provider, error = %err, "Provider error during generation");
    } else {
        error!(provider = provider, error = %err, "Unexpected error during generation");
    }
}
