//! # ragdesk Core
//!
//! Domain types, traits, and error definitions for the ragdesk support agent.
//! This crate has **no framework dependencies**: it defines the domain model
//! that the other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here. Implementations
//! live in their respective crates. This enables:
//! - Swapping the LLM backend or the document retriever via configuration
//! - Easy testing with scripted stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod provider;
pub mod retriever;

// Re-export key types at crate root for ergonomics
pub use error::{Error, MemoryError, ProviderError, QueryError, Result, RetrieverError};
pub use message::{ConversationId, Exchange, Message, QueryId, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use retriever::{Passage, Retriever, join_passages};
