//! Output sanitizer for model answers.
//!
//! Models sometimes leak prompt scaffolding ("Final Answer:") or emit a
//! mangled placeholder address instead of a real one. [`sanitize`] strips
//! the former and rewrites the latter. It never fails: if the patterns
//! cannot be used the input comes back unchanged.

use regex_lite::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::warn;

/// Phrase substituted for the placeholder email artifact.
pub const EMAIL_SUBSTITUTE: &str = "the correct email address";

#[derive(Debug, Clone, Error)]
pub enum SanitizeError {
    #[error("sanitizer pattern failed to compile: {0}")]
    Pattern(String),

    #[error("sanitizer rewrite did not converge")]
    Unsettled,
}

/// Every character `str::trim` treats as whitespace. regex-lite's `\s` is
/// ASCII-only, so the non-ASCII ones are spelled out.
const WS: &str = "[\\s\u{85}\u{a0}\u{1680}\u{2000}-\u{200a}\u{2028}\u{2029}\u{202f}\u{205f}\u{3000}]";

struct Patterns {
    leading_label: Regex,
    line_label: Regex,
    placeholder_email: Regex,
}

static PATTERNS: LazyLock<Result<Patterns, regex_lite::Error>> = LazyLock::new(|| {
    Ok(Patterns {
        leading_label: Regex::new(&format!("(?i)^{WS}*(?:Final Answer:{WS}*)+"))?,
        line_label: Regex::new(&format!("(?i)\\n{WS}*(?:Final Answer:{WS}*)+"))?,
        placeholder_email: Regex::new(r"(?i)\[email protected\]")?,
    })
});

impl Patterns {
    fn pass(&self, text: &str) -> String {
        let text = self.leading_label.replace_all(text.trim(), "");
        let text = self.line_label.replace_all(text.trim(), "\n");
        let text = self.placeholder_email.replace_all(text.trim(), EMAIL_SUBSTITUTE);
        text.trim().to_string()
    }
}

/// Strip scaffolding labels and placeholder emails, reporting failures.
///
/// Passes repeat until the text stops changing, so the result is a fixed
/// point: sanitizing it again returns it unchanged. Every repeat must shrink
/// the text, which bounds the loop.
pub fn try_sanitize(text: &str) -> Result<String, SanitizeError> {
    let patterns = PATTERNS
        .as_ref()
        .map_err(|e| SanitizeError::Pattern(e.to_string()))?;

    let mut current = patterns.pass(text);
    loop {
        let next = patterns.pass(&current);
        if next == current {
            return Ok(current);
        }
        if next.len() >= current.len() {
            return Err(SanitizeError::Unsettled);
        }
        current = next;
    }
}

/// Sanitize a model answer; on any failure the input is returned as-is.
pub fn sanitize(text: &str) -> String {
    match try_sanitize(text) {
        Ok(clean) => clean,
        Err(e) => {
            warn!(error = %e, "Sanitizer failed, returning unsanitized text");
            text.to_string()
        }
    }
}
