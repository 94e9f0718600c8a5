//! Completion provider implementations for ragdesk.
//!
//! All providers implement the `ragdesk_core::Provider` trait.
//! [`build_from_config`] selects the configured one.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
