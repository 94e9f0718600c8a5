//! Memory and knowledge for ragdesk.
//!
//! - [`session`]: per-conversation bounded exchange history
//! - [`knowledge`]: directory-backed keyword retriever

pub mod knowledge;
pub mod session;

pub use knowledge::KnowledgeBase;
pub use session::{HISTORY_UNAVAILABLE, MemorySession, NO_HISTORY, SessionStore};
