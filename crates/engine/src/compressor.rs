//! Content compression: shorten an item's text to a token ceiling while
//! keeping the parts a reader needs most.
//!
//! Every strategy either produces text that fits or gives up, in which case
//! the whole content is replaced by [`OMITTED_MARKER`]. Compressing text that
//! already fits returns it unchanged, so compression is idempotent.

use crate::token::TokenCounter;
use docpack_core::ContentKind;
use std::sync::Arc;

/// Appended where code or structured content was cut.
pub const TRUNCATION_MARKER: &str = "# ... (truncated)";

/// Appended where prose was cut mid-paragraph.
pub const ELLIPSIS: &str = "...";

/// Stands in for content that could not be shortened enough.
pub const OMITTED_MARKER: &str = "[...]";

pub fn is_omitted(content: &str) -> bool {
    content == OMITTED_MARKER
}

pub struct ContentCompressor {
    counter: Arc<TokenCounter>,
}

impl ContentCompressor {
    pub fn new(counter: Arc<TokenCounter>) -> Self {
        Self { counter }
    }

    /// Token count under this compressor's counter.
    pub fn count(&self, content: &str, kind: ContentKind) -> usize {
        self.counter.count(content, kind)
    }

    /// Shorten `content` to at most `max_tokens`.
    pub fn compress(&self, content: &str, max_tokens: usize, kind: ContentKind) -> String {
        if is_omitted(content) || self.counter.count(content, kind) <= max_tokens {
            return content.to_string();
        }

        let attempt = match kind {
            ContentKind::Code => self.compress_code(content, max_tokens),
            ContentKind::Documentation => self.compress_documentation(content, max_tokens),
            ContentKind::Structured => self.compress_structured(content, max_tokens),
            ContentKind::Text => self.compress_text(content, max_tokens, kind),
        };

        match attempt {
            Some(text) if !text.trim().is_empty() && self.fits(&text, max_tokens, kind) => {
                tracing::trace!(%kind, max_tokens, "Compressed content");
                text
            }
            _ => OMITTED_MARKER.to_string(),
        }
    }

    fn fits(&self, text: &str, max_tokens: usize, kind: ContentKind) -> bool {
        self.counter.count_transient(text, kind) <= max_tokens
    }

    /// Keep declarations, comments and docstrings; drop bodies.
    fn compress_code(&self, content: &str, max_tokens: usize) -> Option<String> {
        let kept = outline_code(content);
        self.longest_fitting_prefix(&kept, max_tokens, ContentKind::Code)
    }

    /// Keep top-level lines; drop nested detail.
    fn compress_structured(&self, content: &str, max_tokens: usize) -> Option<String> {
        let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
        let top = lines.iter().map(|l| indent_of(l)).min()?;
        let kept: Vec<&str> = lines.into_iter().filter(|l| indent_of(l) == top).collect();
        self.longest_fitting_prefix(&kept, max_tokens, ContentKind::Structured)
    }

    /// First paragraph, then as many following paragraphs as fit.
    fn compress_documentation(&self, content: &str, max_tokens: usize) -> Option<String> {
        let paragraphs: Vec<&str> = content
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let (first, rest) = paragraphs.split_first()?;

        let kind = ContentKind::Documentation;
        if !self.fits(first, max_tokens, kind) {
            return self.compress_text(first, max_tokens, kind);
        }

        let mut kept = (*first).to_string();
        for paragraph in rest {
            let candidate = format!("{kept}\n\n{paragraph}");
            if !self.fits(&candidate, max_tokens, kind) {
                break;
            }
            kept = candidate;
        }
        Some(kept)
    }

    /// Whole sentences while they fit, then an ellipsis.
    fn compress_text(&self, content: &str, max_tokens: usize, kind: ContentKind) -> Option<String> {
        let mut kept = String::new();
        let mut best = None;
        for sentence in sentences(content) {
            if !kept.is_empty() {
                kept.push(' ');
            }
            kept.push_str(sentence);
            let candidate = format!("{kept} {ELLIPSIS}");
            if !self.fits(&candidate, max_tokens, kind) {
                break;
            }
            best = Some(candidate);
        }
        best
    }

    /// The longest prefix of `lines`, plus the truncation marker, that fits.
    fn longest_fitting_prefix(
        &self,
        lines: &[&str],
        max_tokens: usize,
        kind: ContentKind,
    ) -> Option<String> {
        let mut best = None;
        for end in 1..=lines.len() {
            let candidate = format!("{}\n{TRUNCATION_MARKER}", lines[..end].join("\n"));
            if !self.fits(&candidate, max_tokens, kind) {
                break;
            }
            best = Some(candidate);
        }
        best
    }
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

const DECLARATION_PREFIXES: &[&str] = &[
    "class ",
    "def ",
    "async def ",
    "fn ",
    "pub ",
    "async fn ",
    "struct ",
    "enum ",
    "trait ",
    "impl ",
    "interface ",
    "function ",
    "export ",
    "type ",
    "const ",
    "@",
];

const COMMENT_PREFIXES: &[&str] = &["#", "//", "/*", "*", "--"];

/// Lines of a code item worth keeping: the leading line (items open with
/// their declaration), other declarations, comments, and docstring blocks.
fn outline_code(content: &str) -> Vec<&str> {
    let mut kept = Vec::new();
    let mut open_docstring: Option<&str> = None;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim_start();

        if let Some(delim) = open_docstring {
            kept.push(line);
            if trimmed.contains(delim) {
                open_docstring = None;
            }
            continue;
        }

        if let Some(delim) = ["\"\"\"", "'''"].into_iter().find(|d| trimmed.starts_with(d)) {
            kept.push(line);
            if !trimmed[delim.len()..].contains(delim) {
                open_docstring = Some(delim);
            }
            continue;
        }

        let keep = i == 0
            || DECLARATION_PREFIXES.iter().any(|p| trimmed.starts_with(p))
            || COMMENT_PREFIXES.iter().any(|p| trimmed.starts_with(p));
        if keep && !trimmed.is_empty() {
            kept.push(line);
        }
    }
    kept
}

/// Sentences with their terminators, whitespace-normalized.
fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
            if at_boundary {
                let end = i + c.len_utf8();
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    out.push(sentence);
                }
                start = end;
            }
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::ExactTokenizer;
    use docpack_core::TokenCountError;

    struct Words;

    impl ExactTokenizer for Words {
        fn name(&self) -> &str {
            "words"
        }

        fn count(&self, text: &str) -> Result<usize, TokenCountError> {
            Ok(text.split_whitespace().count())
        }
    }

    fn compressor() -> ContentCompressor {
        ContentCompressor::new(Arc::new(TokenCounter::with_tokenizer(Box::new(Words))))
    }

    const CODE: &str = "class Parser(Base):\n    \"\"\"Parses things.\"\"\"\n    def parse(self, text):\n        # split first\n        parts = text.split()\n        return [p.strip() for p in parts if p]\n    def reset(self):\n        self.state = None\n        self.buffer = []";

    #[test]
    fn fitting_content_is_untouched() {
        let c = compressor();
        assert_eq!(c.compress("a b c", 3, ContentKind::Text), "a b c");
    }

    #[test]
    fn code_keeps_declarations_and_comments() {
        let c = compressor();
        let out = c.compress(CODE, 20, ContentKind::Code);
        assert!(out.contains("class Parser(Base):"));
        assert!(out.contains("def parse(self, text):"));
        assert!(out.contains("# split first"));
        assert!(out.contains("\"\"\"Parses things.\"\"\""));
        assert!(!out.contains("return"));
        assert!(out.ends_with(TRUNCATION_MARKER));
        assert!(c.count(&out, ContentKind::Code) <= 20);
    }

    #[test]
    fn code_outline_is_cut_to_fit() {
        let c = compressor();
        let out = c.compress(CODE, 8, ContentKind::Code);
        assert!(out.starts_with("class Parser(Base):"));
        assert!(!out.contains("def reset"));
        assert!(c.count(&out, ContentKind::Code) <= 8);
    }

    #[test]
    fn multiline_docstrings_are_kept_whole() {
        let code = "def f():\n    \"\"\"\n    Does f.\n    \"\"\"\n    x = 1\n    return x";
        assert_eq!(
            outline_code(code),
            vec!["def f():", "    \"\"\"", "    Does f.", "    \"\"\""]
        );
    }

    #[test]
    fn documentation_keeps_leading_paragraphs() {
        let c = compressor();
        let doc = "First paragraph here.\n\nSecond one is here.\n\nThird paragraph is much longer than the others are.";
        let out = c.compress(doc, 8, ContentKind::Documentation);
        assert_eq!(out, "First paragraph here.\n\nSecond one is here.");
    }

    #[test]
    fn oversized_first_paragraph_falls_back_to_sentences() {
        let c = compressor();
        let doc = "One two three. Four five six. Seven eight nine.\n\nMore.";
        let out = c.compress(doc, 7, ContentKind::Documentation);
        assert_eq!(out, "One two three. Four five six. ...");
    }

    #[test]
    fn text_cuts_at_sentence_boundaries() {
        let c = compressor();
        let text = "Alpha beta. Gamma delta epsilon! Zeta eta theta iota?";
        assert_eq!(c.compress(text, 4, ContentKind::Text), "Alpha beta. ...");
        assert_eq!(sentences("e.g. this. And that"), vec!["e.g.", "this.", "And that"]);
    }

    #[test]
    fn structured_keeps_top_level_keys() {
        let c = compressor();
        let toml = "name: demo\nsettings:\n  debug: true\n  level: high and verbose\nversion: 1";
        let out = c.compress(toml, 8, ContentKind::Structured);
        assert_eq!(out, format!("name: demo\nsettings:\nversion: 1\n{TRUNCATION_MARKER}"));
    }

    #[test]
    fn hopeless_content_becomes_marker() {
        let c = compressor();
        let out = c.compress("just a long line of plain code here", 2, ContentKind::Code);
        assert_eq!(out, OMITTED_MARKER);
        // Nothing costs zero tokens.
        assert_eq!(c.compress("", 0, ContentKind::Text), OMITTED_MARKER);
    }

    #[test]
    fn compression_is_idempotent() {
        let c = compressor();
        for max in [0, 1, 3, 8, 20, 200] {
            for kind in [
                ContentKind::Code,
                ContentKind::Documentation,
                ContentKind::Structured,
                ContentKind::Text,
            ] {
                let once = c.compress(CODE, max, kind);
                assert_eq!(c.compress(&once, max, kind), once, "max={max} kind={kind}");
            }
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn compress_twice_equals_once(
                text in "[a-z .\n#]{0,200}",
                max in 0usize..40,
                kind_tag in 0u8..4,
            ) {
                let kind = match kind_tag {
                    0 => ContentKind::Code,
                    1 => ContentKind::Documentation,
                    2 => ContentKind::Structured,
                    _ => ContentKind::Text,
                };
                let c = ContentCompressor::new(Arc::new(TokenCounter::new()));
                let once = c.compress(&text, max, kind);
                prop_assert_eq!(c.compress(&once, max, kind), once.clone());
                prop_assert!(is_omitted(&once) || c.count(&once, kind) <= max);
            }
        }
    }
}
