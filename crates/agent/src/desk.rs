//! The support desk facade: the single entry point hosts call.
//!
//! [`SupportDesk::answer_question`] resolves the conversation id, makes sure
//! a memory session exists, hands the question to the [`QueryHandler`], and
//! always returns the conversation id with the answer, even when everything
//! underneath fails.

use crate::handler::QueryHandler;
use crate::util::{LOG_PREVIEW_CHARS, panic_message, preview};
use futures::FutureExt;
use ragdesk_config::{AppConfig, DomainInstructions};
use ragdesk_core::error::{QueryError, UNKNOWN_FAILURE_REPLY};
use ragdesk_core::message::{ConversationId, QueryId};
use ragdesk_memory::{KnowledgeBase, SessionStore};
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span, warn};

/// Reply when the caller sends an empty question.
pub const ASK_FOR_QUESTION_REPLY: &str =
    "It looks like you didn't ask a question. How can I help you today?";
/// Reply when the facade itself hits an unexpected fault.
pub const DESK_FAILURE_REPLY: &str =
    "We're sorry, an unexpected error occurred. Please try again or contact support.";

/// What a caller gets back for every question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub conversation_id: ConversationId,
}

/// Answers questions against per-conversation memory.
pub struct SupportDesk {
    handler: QueryHandler,
    sessions: Arc<SessionStore>,
    domain: DomainInstructions,
}

impl SupportDesk {
    pub fn new(handler: QueryHandler, sessions: Arc<SessionStore>, domain: DomainInstructions) -> Self {
        Self {
            handler,
            sessions,
            domain,
        }
    }

    /// Wire a desk from configuration: the configured provider, the
    /// knowledge directory as retriever, a fresh session store, and the
    /// configured domain instructions.
    ///
    /// A knowledge directory that cannot be loaded leaves the desk without a
    /// retriever; questions then get the "information system" reply.
    pub fn from_config(config: &AppConfig) -> Self {
        let provider = ragdesk_providers::build_from_config(config);
        let mut handler = QueryHandler::new(provider, &config.default_model)
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens);

        match &config.knowledge.path {
            Some(path) => match KnowledgeBase::from_dir(path, config.knowledge.top_k) {
                Ok(kb) => handler = handler.with_retriever(Arc::new(kb)),
                Err(e) => warn!(error = %e, "Knowledge base not loaded, answering without a retriever"),
            },
            None => warn!("No knowledge path configured, answering without a retriever"),
        }

        Self::new(
            handler,
            Arc::new(SessionStore::new(config.memory.history_window)),
            DomainInstructions::new(config.domain.instructions.clone()),
        )
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Live domain instructions. Updates apply from the next question on.
    pub fn domain(&self) -> &DomainInstructions {
        &self.domain
    }

    pub fn handler(&self) -> &QueryHandler {
        &self.handler
    }

    /// Answer `question` in the conversation `conversation_id`.
    ///
    /// A missing or blank id starts a new conversation. Never fails: every
    /// fault becomes an apologetic answer carrying the conversation id.
    pub async fn answer_question(
        &self,
        question: &str,
        conversation_id: Option<&str>,
    ) -> AnswerResponse {
        let conversation_id = ConversationId::or_new(conversation_id);
        let query_id = QueryId::new();
        let span = info_span!(
            "answer_question",
            query_id = %query_id,
            conversation_id = %conversation_id
        );

        let result = AssertUnwindSafe(
            self.answer(question, &conversation_id, &query_id)
                .instrument(span.clone()),
        )
        .catch_unwind()
        .await;

        let answer = match result {
            Ok(answer) => answer,
            Err(payload) => {
                let message = panic_message(&payload);
                span.in_scope(|| error!(panic = %message, "Critical error in answer_question"));
                DESK_FAILURE_REPLY.to_string()
            }
        };

        AnswerResponse {
            answer,
            conversation_id,
        }
    }

    async fn answer(
        &self,
        question: &str,
        conversation_id: &ConversationId,
        query_id: &QueryId,
    ) -> String {
        info!(question = %preview(question, LOG_PREVIEW_CHARS), "Question received");

        if question.trim().is_empty() {
            warn!("Empty question received");
            return ASK_FOR_QUESTION_REPLY.to_string();
        }

        let session = match self.sessions.get_or_create(conversation_id) {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Failed to initialize memory for conversation");
                return QueryError::MemoryInitFailure(e)
                    .apology()
                    .unwrap_or(UNKNOWN_FAILURE_REPLY)
                    .to_string();
            }
        };

        let domain = self.domain.current();
        let outcome = self
            .handler
            .handle(question, query_id, &session, &domain)
            .await;

        if let Some(failure) = &outcome.failure {
            warn!(stage = %failure.stage, error = %failure.error, "Query failed");
        }
        for problem in &outcome.degraded {
            warn!(error = %problem, "Query degraded");
        }

        outcome.answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use ragdesk_core::error::{MEMORY_INIT_REPLY, RETRIEVER_UNAVAILABLE_REPLY};

    fn desk_with(provider: Arc<ScriptedProvider>, domain: DomainInstructions) -> SupportDesk {
        let handler = QueryHandler::new(provider, "test-model")
            .with_retriever(Arc::new(StaticRetriever::hours()));
        SupportDesk::new(handler, Arc::new(SessionStore::new(5)), domain)
    }

    fn desk(texts: &[&str]) -> (SupportDesk, Arc<ScriptedProvider>) {
        let provider = Arc::new(ScriptedProvider::texts(texts));
        (desk_with(provider.clone(), DomainInstructions::default()), provider)
    }

    #[tokio::test]
    async fn first_turn_gets_fresh_conversation_id() {
        let (desk, _) = desk(&["Hi there!"]);

        let response = desk.answer_question("Hello", None).await;

        assert_eq!(response.answer, "Hi there!");
        assert!(!response.conversation_id.as_str().is_empty());
        let session = desk.sessions().get(&response.conversation_id).unwrap().unwrap();
        assert_eq!(session.len(), 1);
    }

    #[tokio::test]
    async fn supplied_id_is_echoed_and_reused() {
        let (desk, provider) = desk(&["9am.", "10am."]);

        let first = desk.answer_question("When do you open?", Some("c1")).await;
        let second = desk.answer_question("And Saturday?", Some("c1")).await;

        assert_eq!(first.conversation_id.as_str(), "c1");
        assert_eq!(second.conversation_id.as_str(), "c1");
        assert_eq!(desk.sessions().len(), 1);
        assert!(provider.requests()[1].messages[1]
            .content
            .contains("User: When do you open?\nAI: 9am."));
    }

    #[tokio::test]
    async fn blank_id_is_replaced() {
        let (desk, _) = desk(&["ok"]);
        let response = desk.answer_question("Hours?", Some("   ")).await;
        assert_ne!(response.conversation_id.as_str().trim(), "");
    }

    #[tokio::test]
    async fn padded_id_is_echoed_verbatim() {
        let (desk, _) = desk(&["ok"]);

        let empty = desk.answer_question("   ", Some(" c1 ")).await;
        assert_eq!(empty.conversation_id.as_str(), " c1 ");

        let answered = desk.answer_question("Hours?", Some(" c1 ")).await;
        assert_eq!(answered.conversation_id.as_str(), " c1 ");
        assert!(desk.sessions().contains(&" c1 ".into()));
        assert!(!desk.sessions().contains(&"c1".into()));
    }

    #[tokio::test]
    async fn empty_question_never_touches_memory() {
        let (desk, provider) = desk(&[]);

        let response = desk.answer_question("  ", Some("c9")).await;

        assert_eq!(response.answer, ASK_FOR_QUESTION_REPLY);
        assert_eq!(response.conversation_id.as_str(), "c9");
        assert!(!desk.sessions().contains(&"c9".into()));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn domain_instructions_are_read_per_question() {
        let domain = DomainInstructions::new("You support a bakery.");
        let provider = Arc::new(ScriptedProvider::texts(&["a", "b"]));
        let desk = desk_with(provider.clone(), domain.clone());

        desk.answer_question("Hours?", Some("c1")).await;
        domain.set("You support a bike shop.");
        desk.answer_question("Hours?", Some("c1")).await;

        let requests = provider.requests();
        assert!(requests[0].messages[0].content.contains("bakery"));
        assert!(requests[1].messages[0].content.contains("bike shop"));
        assert!(!requests[1].messages[0].content.contains("bakery"));
    }

    #[tokio::test]
    async fn handler_failures_keep_conversation_id() {
        let handler = QueryHandler::new(Arc::new(ScriptedProvider::texts(&[])), "m");
        let desk = SupportDesk::new(
            handler,
            Arc::new(SessionStore::default()),
            DomainInstructions::default(),
        );

        let response = desk.answer_question("Where are you?", Some("c2")).await;

        assert_eq!(response.answer, RETRIEVER_UNAVAILABLE_REPLY);
        assert_eq!(response.conversation_id.as_str(), "c2");
        // The session exists but holds nothing.
        let session = desk.sessions().get(&"c2".into()).unwrap().unwrap();
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn panic_outside_handler_is_contained_then_memory_init_fails() {
        let (desk, provider) = desk(&["unused", "unused"]);
        let _guard = tracing::subscriber::set_default(PanicOnEvent {
            message: "Memory initialized for conversation",
        });

        // The panic fires while the session registry is write-locked.
        let first = desk.answer_question("Hours?", Some("c3")).await;
        assert_eq!(first.answer, DESK_FAILURE_REPLY);
        assert_eq!(first.conversation_id.as_str(), "c3");

        // The poisoned registry now fails session setup.
        let second = desk.answer_question("Hours?", Some("c4")).await;
        assert_eq!(second.answer, MEMORY_INIT_REPLY);
        assert_eq!(second.conversation_id.as_str(), "c4");

        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn from_config_without_knowledge_has_no_retriever() {
        let config = AppConfig {
            default_model: "gpt-4o-mini".into(),
            ..AppConfig::default()
        };
        let desk = SupportDesk::from_config(&config);
        assert!(!desk.handler().has_retriever());
        assert_eq!(desk.handler().model(), "gpt-4o-mini");
        assert_eq!(desk.sessions().window(), 5);
    }

    #[test]
    fn from_config_loads_knowledge_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("faq.md"), "Refunds take 5 days.").unwrap();

        let mut config = AppConfig::default();
        config.knowledge.path = Some(dir.path().to_path_buf());
        config.domain.instructions = "You support an online store.".into();

        let desk = SupportDesk::from_config(&config);
        assert!(desk.handler().has_retriever());
        assert_eq!(desk.domain().current(), "You support an online store.");
    }

    #[test]
    fn answer_response_serializes_flat() {
        let response = AnswerResponse {
            answer: "Hi".into(),
            conversation_id: "c1".into(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["answer"], "Hi");
        assert_eq!(json["conversation_id"], "c1");
    }
}
