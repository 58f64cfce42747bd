//! Scored items and selection outcomes.

use crate::allocator::TokenBudget;
use docpack_core::{Category, ItemType};
use std::collections::BTreeMap;

/// Reason attached to an item whose content was shortened to fit.
pub const COMPRESSED_REASON: &str = "compressed";

/// One candidate piece of content, measured and prioritized.
///
/// `token_count` always describes `content`; the only way to change the
/// content is [`ScoredItem::compressed`], which takes the new count with it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredItem {
    item_id: String,
    item_type: ItemType,
    group: String,
    content: String,
    token_count: usize,
    priority_score: f64,
    reasons: Vec<String>,
}

impl ScoredItem {
    /// Token counts below 1 are raised to 1; negative or non-finite scores
    /// become 0.
    pub fn new(
        item_id: impl Into<String>,
        item_type: ItemType,
        content: impl Into<String>,
        token_count: usize,
        priority_score: f64,
        reasons: Vec<String>,
    ) -> Self {
        let item_id = item_id.into();
        let priority_score = if priority_score.is_finite() {
            priority_score.max(0.0)
        } else {
            0.0
        };
        Self {
            group: item_id.clone(),
            item_id,
            item_type,
            content: content.into(),
            token_count: token_count.max(1),
            priority_score,
            reasons,
        }
    }

    /// Set the grouping key used by whole-module selection.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// A copy carrying shortened content and its recounted size.
    pub fn compressed(&self, content: String, token_count: usize) -> Self {
        let mut reasons = self.reasons.clone();
        reasons.push(COMPRESSED_REASON.to_string());
        Self {
            item_id: self.item_id.clone(),
            item_type: self.item_type,
            group: self.group.clone(),
            content,
            token_count: token_count.max(1),
            priority_score: self.priority_score,
            reasons,
        }
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    pub fn category(&self) -> Category {
        self.item_type.category()
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }

    pub fn priority_score(&self) -> f64 {
        self.priority_score
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    pub fn is_compressed(&self) -> bool {
        self.reasons.iter().any(|r| r == COMPRESSED_REASON)
    }

    /// Priority per token.
    pub fn efficiency(&self) -> f64 {
        self.priority_score / self.token_count as f64
    }

    /// Selection order: efficiency descending, item id ascending on ties.
    pub fn rank_cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .efficiency()
            .total_cmp(&self.efficiency())
            .then_with(|| self.item_id.cmp(&other.item_id))
    }
}

/// Why an item was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// The category ran out of room before reaching this item.
    BudgetExhausted,
    /// The item alone exceeds its category's whole sub-budget.
    ItemTooLarge,
}

impl DropReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BudgetExhausted => "budget_exhausted",
            Self::ItemTooLarge => "item_too_large",
        }
    }
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DroppedItem {
    pub item: ScoredItem,
    pub reason: DropReason,
}

/// Outcome of one selection run.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    /// Kept items, grouped by category in processing order.
    pub selected: Vec<ScoredItem>,
    pub dropped: Vec<DroppedItem>,
    /// Tokens spent per category. Every category is present.
    pub usage: BTreeMap<Category, usize>,
    pub warnings: Vec<String>,
    pub budget: TokenBudget,
}

impl SelectionResult {
    pub fn total_used(&self) -> usize {
        self.usage.values().sum()
    }

    pub fn selected_in(&self, category: Category) -> impl Iterator<Item = &ScoredItem> {
        self.selected.iter().filter(move |i| i.category() == category)
    }

    pub fn dropped_in(&self, category: Category) -> impl Iterator<Item = &DroppedItem> {
        self.dropped.iter().filter(move |d| d.item.category() == category)
    }
}
