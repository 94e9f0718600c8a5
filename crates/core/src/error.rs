//! Error types for the ragdesk domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`QueryError`] is the
//! per-query taxonomy the query handler reports against.

use thiserror::Error;

/// The top-level error type for ragdesk operations outside the query path.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Retriever errors ---
    #[error("Retriever error: {0}")]
    Retriever(#[from] RetrieverError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Internal provider error: {0}")]
    Internal(String),
}

impl ProviderError {
    /// Whether this failure came from the provider itself (API, transport,
    /// quota) rather than from local setup or an unexpected fault.
    pub fn is_provider_specific(&self) -> bool {
        !matches!(self, Self::NotConfigured(_) | Self::Internal(_))
    }
}

#[derive(Debug, Clone, Error)]
pub enum RetrieverError {
    #[error("Retriever unavailable: {0}")]
    Unavailable(String),

    #[error("Search failed: {0}")]
    SearchFailed(String),
}

#[derive(Debug, Clone, Error)]
pub enum MemoryError {
    #[error("Session lock poisoned: {0}")]
    Poisoned(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

// --- Query taxonomy ---

/// Clarification returned when the handler receives an empty question.
pub const EMPTY_INPUT_REPLY: &str =
    "I'm sorry, it seems you didn't provide a question. How can I assist you today?";
/// Reply when no retriever is available.
pub const RETRIEVER_UNAVAILABLE_REPLY: &str = "I'm sorry, we're experiencing an issue with our information system. Please try again later or contact support.";
/// Reply when the retriever call itself fails.
pub const RETRIEVER_FAILURE_REPLY: &str = "I'm sorry, I couldn't retrieve the necessary information from our information system. Please try rephrasing your question or contact our support team.";
/// Reply for provider-specific generation failures.
pub const GENERATION_PROVIDER_REPLY: &str = "I'm sorry, there was an issue processing your request. Please try again or contact support for assistance.";
/// Reply for any other generation failure.
pub const GENERATION_OTHER_REPLY: &str =
    "An unexpected error occurred. Please try again later or reach out to our support team.";
/// Reply when a conversation session cannot be set up.
pub const MEMORY_INIT_REPLY: &str =
    "I'm sorry, there was an issue setting up the conversation. Please try again.";
/// Reply for anything the pipeline did not anticipate.
pub const UNKNOWN_FAILURE_REPLY: &str = "We're sorry, an unexpected error occurred. Please try again later or contact our support team for assistance.";

/// Everything that can go wrong while answering one query.
///
/// `MemoryPersistFailure` and `SanitizationFailure` are non-fatal: the query
/// still returns an answer and the failure is only recorded.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    #[error("empty question")]
    EmptyInput,

    #[error("retriever unavailable: {0}")]
    RetrieverUnavailable(String),

    #[error("retriever failure: {0}")]
    RetrieverFailure(String),

    #[error("generation failed at provider: {0}")]
    GenerationProviderFailure(ProviderError),

    #[error("generation failed: {0}")]
    GenerationOtherFailure(String),

    #[error("memory initialisation failed: {0}")]
    MemoryInitFailure(MemoryError),

    #[error("memory persist failed: {0}")]
    MemoryPersistFailure(MemoryError),

    #[error("sanitization failed: {0}")]
    SanitizationFailure(String),

    #[error("unknown failure: {0}")]
    UnknownFailure(String),
}

impl QueryError {
    /// Classify a completion failure into its generation failure class.
    pub fn from_generation(err: ProviderError) -> Self {
        if err.is_provider_specific() {
            Self::GenerationProviderFailure(err)
        } else {
            Self::GenerationOtherFailure(err.to_string())
        }
    }

    /// Classify a retriever failure.
    pub fn from_retrieval(err: RetrieverError) -> Self {
        match err {
            RetrieverError::Unavailable(reason) => Self::RetrieverUnavailable(reason),
            RetrieverError::SearchFailed(reason) => Self::RetrieverFailure(reason),
        }
    }

    /// Whether the query can still produce an answer after this failure.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::MemoryPersistFailure(_) | Self::SanitizationFailure(_)
        )
    }

    /// The fixed user-facing text for a fatal failure.
    ///
    /// Non-fatal failures never reach the user and return `None`.
    pub fn apology(&self) -> Option<&'static str> {
        match self {
            Self::EmptyInput => Some(EMPTY_INPUT_REPLY),
            Self::RetrieverUnavailable(_) => Some(RETRIEVER_UNAVAILABLE_REPLY),
            Self::RetrieverFailure(_) => Some(RETRIEVER_FAILURE_REPLY),
            Self::GenerationProviderFailure(_) => Some(GENERATION_PROVIDER_REPLY),
            Self::GenerationOtherFailure(_) => Some(GENERATION_OTHER_REPLY),
            Self::MemoryInitFailure(_) => Some(MEMORY_INIT_REPLY),
            Self::UnknownFailure(_) => Some(UNKNOWN_FAILURE_REPLY),
            Self::MemoryPersistFailure(_) | Self::SanitizationFailure(_) => None,
        }
    }
}
