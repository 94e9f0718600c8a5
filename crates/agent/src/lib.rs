//! The ragdesk query pipeline.
//!
//! A question flows through the [`SupportDesk`] facade into the
//! [`QueryHandler`], which retrieves context, assembles the prompt, asks the
//! completion provider, sanitizes the answer and records the exchange:
//!
//! 1. **Validate** the question (empty questions get a clarification)
//! 2. **Retrieve** passages from the knowledge retriever
//! 3. **Assemble** the prompt with domain instructions and chat history
//! 4. **Generate** the answer via the configured provider
//! 5. **Sanitize** leaked scaffolding out of the answer
//! 6. **Persist** the exchange to the conversation's memory session
//!
//! Failures at any step become fixed, user-safe replies.

pub mod desk;
pub mod handler;
pub mod prompt;
pub mod sanitizer;
mod util;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use desk::{ASK_FOR_QUESTION_REPLY, AnswerResponse, DESK_FAILURE_REPLY, SupportDesk};
pub use handler::{QueryFailure, QueryHandler, QueryOutcome, Stage};
pub use prompt::{FIXED_SYSTEM_PROMPT, GenerationRequest, assemble};
pub use sanitizer::{SanitizeError, sanitize, try_sanitize};
pub use util::LOG_PREVIEW_CHARS;
