//! Token counting.
//!
//! Uses an exact tokenizer when one is plugged in, and otherwise a
//! character-based heuristic tuned per [`ContentKind`]: code is denser than
//! prose, structured data denser still, and long identifiers and whitespace
//! runs cost extra. Counts are memoized by a SHA-256 of the content, so the
//! same text costs the same everywhere in a run.

use docpack_core::{ContentKind, TokenCountError};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Something that can count tokens exactly for a target model.
pub trait ExactTokenizer: Send + Sync {
    /// Human-readable tokenizer name, for logs.
    fn name(&self) -> &str;

    /// Number of tokens `text` encodes to.
    fn count(&self, text: &str) -> Result<usize, TokenCountError>;
}

type CacheKey = (ContentKind, [u8; 32]);

/// Memoizing token counter. One per run; safe to share across scoring threads.
pub struct TokenCounter {
    tokenizer: Option<Box<dyn ExactTokenizer>>,
    cache: RwLock<HashMap<CacheKey, usize>>,
}

impl TokenCounter {
    /// A counter that only uses the heuristic.
    pub fn new() -> Self {
        Self {
            tokenizer: None,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// A counter backed by an exact tokenizer, falling back to the heuristic
    /// whenever encoding fails.
    pub fn with_tokenizer(tokenizer: Box<dyn ExactTokenizer>) -> Self {
        Self {
            tokenizer: Some(tokenizer),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Name of the exact tokenizer, if one is plugged in.
    pub fn tokenizer_name(&self) -> Option<&str> {
        self.tokenizer.as_deref().map(|t| t.name())
    }

    /// Count tokens for `content`, memoized. Always ≥ 1.
    pub fn count(&self, content: &str, kind: ContentKind) -> usize {
        let key = cache_key(content, kind);

        if let Some(&hit) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return hit;
        }

        let tokens = self.measure(content, kind);
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, tokens);
        tokens
    }

    /// Count without recording the result. Used for the many throwaway
    /// candidates the compressor tries.
    pub fn count_transient(&self, content: &str, kind: ContentKind) -> usize {
        let key = cache_key(content, kind);
        if let Some(&hit) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return hit;
        }
        self.measure(content, kind)
    }

    /// Number of memoized entries.
    pub fn cache_len(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Drop every memoized entry.
    pub fn clear(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn measure(&self, content: &str, kind: ContentKind) -> usize {
        if let Some(tokenizer) = &self.tokenizer {
            match tokenizer.count(content) {
                Ok(n) => return n.max(1),
                Err(e) => {
                    tracing::debug!(
                        tokenizer = tokenizer.name(),
                        error = %e,
                        "Exact token count failed, using heuristic"
                    );
                }
            }
        }
        estimate_tokens(content, kind)
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter")
            .field("tokenizer", &self.tokenizer_name())
            .field("cached", &self.cache_len())
            .finish()
    }
}

fn cache_key(content: &str, kind: ContentKind) -> CacheKey {
    let digest: [u8; 32] = Sha256::digest(content.as_bytes()).into();
    (kind, digest)
}

// ── Heuristic ─────────────────────────────────────────────────────────────

/// Characters per token before adjustments.
const fn chars_per_token(kind: ContentKind) -> f64 {
    match kind {
        ContentKind::Code => 3.5,
        ContentKind::Documentation => 4.0,
        ContentKind::Structured => 3.0,
        ContentKind::Text => 4.0,
    }
}

const DENSITY_WEIGHT: f64 = 0.5;
const LONG_WORD_WEIGHT: f64 = 0.25;
const LONG_WORD_CHARS: usize = 8;
const WHITESPACE_RUN_COST: f64 = 0.5;

/// Estimate the token count for a string.
///
/// `chars / ratio(kind)`, scaled up by punctuation density (code), delimiter
/// density (structured data) and the share of long words, plus half a token
/// per whitespace run. Rounds up; never below 1.
pub fn estimate_tokens(text: &str, kind: ContentKind) -> usize {
    let chars = text.chars().count();
    if chars == 0 {
        return 1;
    }

    let base = chars as f64 / chars_per_token(kind);

    let mut factor = 1.0;
    match kind {
        ContentKind::Code => factor += density(text, chars, is_code_punctuation) * DENSITY_WEIGHT,
        ContentKind::Structured => {
            factor += density(text, chars, is_structural_delimiter) * DENSITY_WEIGHT
        }
        ContentKind::Documentation | ContentKind::Text => {}
    }
    factor += long_word_ratio(text) * LONG_WORD_WEIGHT;

    let runs = whitespace_runs(text) as f64 * WHITESPACE_RUN_COST;

    ((base * factor) + runs).ceil().max(1.0) as usize
}

fn density(text: &str, chars: usize, pred: fn(char) -> bool) -> f64 {
    text.chars().filter(|c| pred(*c)).count() as f64 / chars as f64
}

fn is_code_punctuation(c: char) -> bool {
    matches!(
        c,
        '(' | ')' | '[' | ']' | '{' | '}' | '<' | '>' | ';' | ':' | ',' | '.' | '=' | '+' | '-'
            | '*' | '/' | '&' | '|' | '!' | '?' | '"' | '\'' | '@' | '#' | '%'
    )
}

fn is_structural_delimiter(c: char) -> bool {
    matches!(c, '{' | '}' | '[' | ']' | ':' | ',' | '"' | '=')
}

fn long_word_ratio(text: &str) -> f64 {
    let mut words = 0usize;
    let mut long = 0usize;
    for word in text.split_whitespace() {
        words += 1;
        if word.chars().count() >= LONG_WORD_CHARS {
            long += 1;
        }
    }
    if words == 0 {
        0.0
    } else {
        long as f64 / words as f64
    }
}

/// Maximal runs of two or more whitespace characters.
fn whitespace_runs(text: &str) -> usize {
    let mut runs = 0;
    let mut current = 0;
    for c in text.chars() {
        if c.is_whitespace() {
            current += 1;
        } else {
            if current >= 2 {
                runs += 1;
            }
            current = 0;
        }
    }
    if current >= 2 {
        runs += 1;
    }
    runs
}

// ── Hugging Face tokenizer ────────────────────────────────────────────────

#[cfg(feature = "hf-tokenizer")]
pub use hf::HfTokenizer;

#[cfg(feature = "hf-tokenizer")]
mod hf {
    use super::ExactTokenizer;
    use docpack_core::TokenCountError;
    use std::path::Path;
    use tokenizers::Tokenizer;

    /// Exact counts from a Hugging Face `tokenizer.json`.
    pub struct HfTokenizer {
        name: String,
        inner: Tokenizer,
    }

    impl HfTokenizer {
        pub fn from_file(path: &Path) -> Result<Self, TokenCountError> {
            let inner = Tokenizer::from_file(path).map_err(|e| {
                TokenCountError::TokenizerUnavailable(format!("{}: {e}", path.display()))
            })?;
            Ok(Self {
                name: path.display().to_string(),
                inner,
            })
        }
    }

    impl ExactTokenizer for HfTokenizer {
        fn name(&self) -> &str {
            &self.name
        }

        fn count(&self, text: &str) -> Result<usize, TokenCountError> {
            self.inner
                .encode(text, false)
                .map(|encoding| encoding.len())
                .map_err(|e| TokenCountError::Encoding(e.to_string()))
        }
    }
}
