//! The docpack engine: fit a project's extracted facts into a token budget.
//!
//! A run flows through five stages:
//!
//! 1. **Count** every rendered item ([`TokenCounter`])
//! 2. **Score** it by kind and modifiers ([`PriorityScorer`])
//! 3. **Allocate** the total budget across categories ([`allocate`])
//! 4. **Select** greedily by efficiency, compressing near-misses
//!    ([`ContentSelector`], [`ContentCompressor`])
//! 5. **Serialize** the outcome ([`serialize`])
//!
//! [`Pipeline`] wires the stages together from an [`docpack_config::AppConfig`].

pub mod allocator;
pub mod compressor;
pub mod item;
pub mod pipeline;
pub mod scorer;
pub mod selector;
pub mod serializer;
pub mod token;

pub use allocator::{PERCENTAGE_TOLERANCE, TokenBudget, allocate, allocate_from_map};
pub use compressor::{ContentCompressor, ELLIPSIS, OMITTED_MARKER, TRUNCATION_MARKER, is_omitted};
pub use item::{COMPRESSED_REASON, DropReason, DroppedItem, ScoredItem, SelectionResult};
pub use pipeline::Pipeline;
pub use scorer::{Candidate, CandidateSet, PriorityScorer, Source};
pub use selector::ContentSelector;
pub use serializer::{BudgetSummary, DroppedEntry, SelectedEntry, SelectionDocument, serialize};
pub use token::{ExactTokenizer, TokenCounter, estimate_tokens};

#[cfg(feature = "hf-tokenizer")]
pub use token::HfTokenizer;
