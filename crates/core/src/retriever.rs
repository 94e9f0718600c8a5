//! Retriever trait: the document search collaborator.
//!
//! The retriever is the read side of the knowledge store: given the raw
//! user question it returns the passages worth putting in front of the
//! model. How the passages were indexed is not the agent's concern.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::RetrieverError;

/// A single retrieved passage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    /// The passage text
    pub content: String,

    /// Where the passage came from (file name, URL, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Relevance score (set by search)
    #[serde(default)]
    pub score: f32,
}

impl Passage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: None,
            score: 0.0,
        }
    }
}

/// The core Retriever trait.
///
/// Implementations: keyword knowledge base, test stubs.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// The retriever name (e.g., "knowledge_base").
    fn name(&self) -> &str;

    /// Find passages relevant to `query`. An empty result is not an error.
    async fn search(&self, query: &str) -> std::result::Result<Vec<Passage>, RetrieverError>;
}

/// Join the non-empty passage texts with a blank line.
pub fn join_passages(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|p| p.content.as_str())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_skips_empty_passages() {
        let passages = vec![
            Passage::new("Opening hours are 9 to 5."),
            Passage::new(""),
            Passage::new("We are closed on Sundays."),
        ];
        assert_eq!(
            join_passages(&passages),
            "Opening hours are 9 to 5.\n\nWe are closed on Sundays."
        );
    }

    #[test]
    fn join_of_nothing_is_empty() {
        assert_eq!(join_passages(&[]), "");
    }

    #[test]
    fn passage_serialization_omits_missing_source() {
        let json = serde_json::to_string(&Passage::new("text")).unwrap();
        assert!(!json.contains("source"));
    }
}
