//! Shared test doubles for handler and desk tests.

use ragdesk_core::error::{ProviderError, RetrieverError};
use ragdesk_core::message::Message;
use ragdesk_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use ragdesk_core::retriever::{Passage, Retriever};
use ragdesk_memory::MemorySession;
use std::collections::VecDeque;
use std::sync::Mutex;

pub fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A provider that replays scripted results in order and records every
/// request it receives. Once the script runs out it reports `Internal`.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(text_response(t))).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Internal("script exhausted".into())))
    }
}

/// A provider whose completion panics.
pub struct PanickingProvider;

#[async_trait::async_trait]
impl Provider for PanickingProvider {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        panic!("completion client crashed")
    }
}

/// A retriever returning the same passages for every query.
pub struct StaticRetriever {
    passages: Vec<Passage>,
    calls: Mutex<usize>,
}

impl StaticRetriever {
    pub fn new(passages: Vec<Passage>) -> Self {
        Self {
            passages,
            calls: Mutex::new(0),
        }
    }

    pub fn hours() -> Self {
        Self::new(vec![
            Passage::new("The clinic is open Monday to Friday, 9am to 5pm."),
            Passage::new("On Saturdays we open from 10am to 2pm."),
        ])
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl Retriever for StaticRetriever {
    fn name(&self) -> &str {
        "static"
    }

    async fn search(&self, _query: &str) -> Result<Vec<Passage>, RetrieverError> {
        *self.calls.lock().unwrap() += 1;
        Ok(self.passages.clone())
    }
}

/// A retriever that always returns the given error.
pub struct FailingRetriever(pub RetrieverError);

impl FailingRetriever {
    pub fn search_failed() -> Self {
        Self(RetrieverError::SearchFailed("vector store timed out".into()))
    }
}

#[async_trait::async_trait]
impl Retriever for FailingRetriever {
    fn name(&self) -> &str {
        "failing"
    }

    async fn search(&self, _query: &str) -> Result<Vec<Passage>, RetrieverError> {
        Err(self.0.clone())
    }
}

/// A retriever whose search panics.
pub struct PanickingRetriever;

#[async_trait::async_trait]
impl Retriever for PanickingRetriever {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn search(&self, _query: &str) -> Result<Vec<Passage>, RetrieverError> {
        panic!("index corrupted")
    }
}

/// Poison the session's history lock so reads and appends fail.
pub fn poison_session(session: &MemorySession) {
    struct Explosive;

    impl From<Explosive> for String {
        fn from(_: Explosive) -> String {
            panic!("poison the session lock")
        }
    }

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _ = session.append(Explosive, "unused");
    }));
    assert!(result.is_err());
}

/// A tracing subscriber that panics when an event with `message` is logged.
///
/// Lets tests inject a fault at a precise logging point, for example while a
/// lock is held.
pub struct PanicOnEvent {
    pub message: &'static str,
}

struct MessageVisitor(String);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl tracing::Subscriber for PanicOnEvent {
    fn enabled(&self, _metadata: &tracing::Metadata<'_>) -> bool {
        true
    }

    fn new_span(&self, _attrs: &tracing::span::Attributes<'_>) -> tracing::span::Id {
        tracing::span::Id::from_u64(1)
    }

    fn record(&self, _span: &tracing::span::Id, _values: &tracing::span::Record<'_>) {}

    fn record_follows_from(&self, _span: &tracing::span::Id, _follows: &tracing::span::Id) {}

    fn event(&self, event: &tracing::Event<'_>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        if visitor.0 == self.message {
            panic!("fault injected at: {}", self.message);
        }
    }

    fn enter(&self, _span: &tracing::span::Id) {}

    fn exit(&self, _span: &tracing::span::Id) {}
}
