//! Keyword knowledge base: a small directory-backed retriever.
//!
//! Loads every `.md` / `.txt` file under a directory, splits each into
//! paragraph passages, and ranks passages by how often the question's
//! keywords occur in them. Good enough for FAQs and policy pages; swap in a
//! vector store behind the same `Retriever` trait for anything larger.

use async_trait::async_trait;
use ragdesk_core::error::RetrieverError;
use ragdesk_core::retriever::{Passage, Retriever};
use std::path::Path;
use tracing::{debug, info, warn};

/// Words too common to say anything about relevance.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "you", "your", "with", "what", "when", "where", "how", "can",
    "does", "this", "that", "have", "has", "from", "about", "which", "who", "will", "would",
    "could", "should", "there", "their", "our", "any", "please", "tell",
];

/// A keyword-scored passage collection.
pub struct KnowledgeBase {
    passages: Vec<Passage>,
    top_k: usize,
}

impl KnowledgeBase {
    /// Build from ready-made passages.
    pub fn from_passages(passages: Vec<Passage>, top_k: usize) -> Self {
        Self {
            passages,
            top_k: top_k.max(1),
        }
    }

    /// Load every `.md` / `.txt` file directly under `dir`.
    ///
    /// A missing or unreadable directory is reported as `Unavailable`;
    /// unreadable individual files are skipped with a warning.
    pub fn from_dir(dir: &Path, top_k: usize) -> Result<Self, RetrieverError> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            RetrieverError::Unavailable(format!("cannot read {}: {e}", dir.display()))
        })?;

        let mut files: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| matches!(ext, "md" | "txt"))
            })
            .collect();
        files.sort();

        let mut passages = Vec::new();
        for path in &files {
            let content = match std::fs::read_to_string(path) {
                Ok(c) => c,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable document");
                    continue;
                }
            };

            let source = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            passages.extend(split_paragraphs(&content).into_iter().map(|text| Passage {
                content: text,
                source: Some(source.clone()),
                score: 0.0,
            }));
        }

        info!(
            dir = %dir.display(),
            files = files.len(),
            passages = passages.len(),
            "Knowledge base loaded"
        );
        Ok(Self::from_passages(passages, top_k))
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

#[async_trait]
impl Retriever for KnowledgeBase {
    fn name(&self) -> &str {
        "knowledge_base"
    }

    async fn search(&self, query: &str) -> Result<Vec<Passage>, RetrieverError> {
        let keywords = keywords(query);
        if keywords.is_empty() {
            debug!("Query has no searchable keywords");
            return Ok(Vec::new());
        }

        let mut results: Vec<Passage> = self
            .passages
            .iter()
            .filter_map(|p| {
                let lower = p.content.to_lowercase();
                let occurrences: usize = keywords.iter().map(|k| lower.matches(k.as_str()).count()).sum();
                if occurrences == 0 {
                    return None;
                }
                let mut hit = p.clone();
                hit.score = occurrences as f32 / (p.content.len() as f32 / 100.0).max(1.0);
                Some(hit)
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(self.top_k);

        debug!(keywords = keywords.len(), hits = results.len(), "Knowledge base searched");
        Ok(results)
    }
}

/// Split a document on blank lines into trimmed, non-empty paragraphs.
fn split_paragraphs(content: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n").trim().to_string());
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n").trim().to_string());
    }

    paragraphs
}

/// Lowercased query words of three or more characters, minus stopwords.
fn keywords(query: &str) -> Vec<String> {
    let mut words: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect();
    words.sort();
    words.dedup();
    words
}
