//! Greedy content selection against per-category sub-budgets.
//!
//! # Determinism
//!
//! Items are ranked by efficiency with `item_id` as the tie-break, and
//! categories are processed in [`Category::ALL`] order. Neither the order the
//! items arrive in nor the thread that scored them affects the outcome.
//!
//! The fill is single-pass: a later, smaller item that would fit is never
//! preferred over an earlier, more efficient one that does not.

use crate::allocator::TokenBudget;
use crate::compressor::{ContentCompressor, is_omitted};
use crate::item::{DropReason, DroppedItem, ScoredItem, SelectionResult};
use docpack_config::SelectionStrategy;
use docpack_core::Category;
use std::collections::BTreeMap;

pub struct ContentSelector<'c> {
    strategy: SelectionStrategy,
    compressor: Option<&'c ContentCompressor>,
}

/// What happened inside one category.
#[derive(Default)]
struct CategoryFill {
    selected: Vec<ScoredItem>,
    dropped: Vec<DroppedItem>,
    used: usize,
}

impl CategoryFill {
    fn take(&mut self, item: ScoredItem) {
        self.used += item.token_count();
        self.selected.push(item);
    }

    fn reject(&mut self, item: ScoredItem, reason: DropReason) {
        tracing::debug!(item = item.item_id(), %reason, tokens = item.token_count(), "Dropped");
        self.dropped.push(DroppedItem { item, reason });
    }
}

impl<'c> ContentSelector<'c> {
    /// A selector that never compresses.
    pub fn new(strategy: SelectionStrategy) -> Self {
        Self {
            strategy,
            compressor: None,
        }
    }

    /// Try compression before dropping an item that does not fit.
    pub fn with_compressor(mut self, compressor: &'c ContentCompressor) -> Self {
        self.compressor = Some(compressor);
        self
    }

    pub fn strategy(&self) -> SelectionStrategy {
        self.strategy
    }

    /// Fill every category's sub-budget from `items`.
    pub fn select(&self, items: Vec<ScoredItem>, budget: &TokenBudget) -> SelectionResult {
        let mut by_category: BTreeMap<Category, Vec<ScoredItem>> = BTreeMap::new();
        for item in items {
            by_category.entry(item.category()).or_default().push(item);
        }

        let mut selected = Vec::new();
        let mut dropped = Vec::new();
        let mut usage = BTreeMap::new();
        let mut warnings = Vec::new();

        for category in Category::ALL {
            let items = by_category.remove(&category).unwrap_or_default();
            let sub_budget = budget.sub_budget(category);
            let total = items.len();

            let fill = match self.strategy {
                SelectionStrategy::EfficiencyRanked => self.fill_ranked(items, sub_budget),
                SelectionStrategy::WholeModule => fill_whole_groups(items, sub_budget),
            };
            debug_assert!(fill.used <= sub_budget);

            if let Some(warning) = drop_warning(category, &fill, sub_budget) {
                tracing::warn!("{warning}");
                warnings.push(warning);
            }
            tracing::debug!(
                %category,
                selected = fill.selected.len(),
                total,
                used = fill.used,
                sub_budget,
                "Category filled"
            );

            usage.insert(category, fill.used);
            selected.extend(fill.selected);
            dropped.extend(fill.dropped);
        }

        SelectionResult {
            selected,
            dropped,
            usage,
            warnings,
            budget: budget.clone(),
        }
    }

    fn fill_ranked(&self, mut items: Vec<ScoredItem>, sub_budget: usize) -> CategoryFill {
        items.sort_by(ScoredItem::rank_cmp);

        let mut fill = CategoryFill::default();
        let mut exhausted = false;

        for item in items {
            if exhausted {
                fill.reject(item, DropReason::BudgetExhausted);
                continue;
            }

            let headroom = sub_budget - fill.used;
            if item.token_count() <= headroom {
                fill.take(item);
                continue;
            }

            if headroom > 0 {
                if let Some(smaller) = self.compress_to(&item, headroom) {
                    fill.take(smaller);
                    continue;
                }
                if item.token_count() > sub_budget {
                    fill.reject(item, DropReason::ItemTooLarge);
                    continue;
                }
            }

            exhausted = true;
            fill.reject(item, DropReason::BudgetExhausted);
        }
        fill
    }

    /// A compressed copy of `item` that fits in `headroom`, if there is one.
    fn compress_to(&self, item: &ScoredItem, headroom: usize) -> Option<ScoredItem> {
        let compressor = self.compressor?;
        let kind = item.item_type().content_kind();
        let content = compressor.compress(item.content(), headroom, kind);
        if content == item.content() || is_omitted(&content) {
            return None;
        }
        let tokens = compressor.count(&content, kind);
        if tokens > headroom {
            return None;
        }
        tracing::debug!(
            item = item.item_id(),
            from = item.token_count(),
            to = tokens,
            "Compressed to fit"
        );
        Some(item.compressed(content, tokens))
    }
}

/// Coarse fill: whole groups by summed score, the first group that does not
/// fit is filled item by item, then the category stops.
fn fill_whole_groups(items: Vec<ScoredItem>, sub_budget: usize) -> CategoryFill {
    let mut groups: BTreeMap<String, Vec<ScoredItem>> = BTreeMap::new();
    for item in items {
        groups.entry(item.group().to_string()).or_default().push(item);
    }

    let mut ranked: Vec<(String, f64, Vec<ScoredItem>)> = groups
        .into_iter()
        .map(|(key, mut members)| {
            members.sort_by(ScoredItem::rank_cmp);
            let score = members.iter().map(ScoredItem::priority_score).sum();
            (key, score, members)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut fill = CategoryFill::default();
    let mut stopped = false;

    for (_, _, members) in ranked {
        if stopped {
            for item in members {
                let reason = overflow_reason(&item, sub_budget);
                fill.reject(item, reason);
            }
            continue;
        }

        let cost: usize = members.iter().map(ScoredItem::token_count).sum();
        if fill.used + cost <= sub_budget {
            for item in members {
                fill.take(item);
            }
            continue;
        }

        stopped = true;
        for item in members {
            if fill.used + item.token_count() <= sub_budget {
                fill.take(item);
            } else {
                let reason = overflow_reason(&item, sub_budget);
                fill.reject(item, reason);
            }
        }
    }
    fill
}

fn overflow_reason(item: &ScoredItem, sub_budget: usize) -> DropReason {
    if sub_budget > 0 && item.token_count() > sub_budget {
        DropReason::ItemTooLarge
    } else {
        DropReason::BudgetExhausted
    }
}

fn drop_warning(category: Category, fill: &CategoryFill, sub_budget: usize) -> Option<String> {
    if fill.dropped.is_empty() {
        return None;
    }
    let too_large = fill
        .dropped
        .iter()
        .filter(|d| d.reason == DropReason::ItemTooLarge)
        .count();
    let exhausted = fill.dropped.len() - too_large;
    Some(format!(
        "{category}: dropped {} item(s) ({exhausted} budget_exhausted, {too_large} item_too_large), used {}/{sub_budget} tokens",
        fill.dropped.len(),
        fill.used
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compressor::OMITTED_MARKER;
    use crate::token::{ExactTokenizer, TokenCounter};
    use docpack_core::{ItemType, TokenCountError};
    use std::sync::Arc;

    struct Words;

    impl ExactTokenizer for Words {
        fn name(&self) -> &str {
            "words"
        }

        fn count(&self, text: &str) -> Result<usize, TokenCountError> {
            Ok(text.split_whitespace().count())
        }
    }

    fn budget_with(category: Category, amount: usize) -> TokenBudget {
        let subs: BTreeMap<Category, usize> = Category::ALL
            .iter()
            .map(|&c| (c, if c == category { amount } else { 0 }))
            .collect();
        TokenBudget::new(amount, subs, 0).unwrap()
    }

    fn class(id: &str, tokens: usize, score: f64) -> ScoredItem {
        ScoredItem::new(id, ItemType::Class, "x", tokens, score, vec![])
    }

    fn ids(items: &[ScoredItem]) -> Vec<&str> {
        items.iter().map(ScoredItem::item_id).collect()
    }

    #[test]
    fn greedy_fill_stops_at_first_overflow() {
        let items: Vec<ScoredItem> = (1..=10)
            .map(|s| class(&format!("class:m:C{s:02}"), 100, s as f64))
            .collect();
        let selector = ContentSelector::new(SelectionStrategy::EfficiencyRanked);
        let result = selector.select(items, &budget_with(Category::ApiDocumentation, 550));

        assert_eq!(
            ids(&result.selected),
            ["class:m:C10", "class:m:C09", "class:m:C08", "class:m:C07", "class:m:C06"]
        );
        assert_eq!(result.usage[&Category::ApiDocumentation], 500);
        assert_eq!(result.dropped.len(), 5);
        assert_eq!(result.dropped[0].item.item_id(), "class:m:C05");
        assert!(result.dropped.iter().all(|d| d.reason == DropReason::BudgetExhausted));
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].starts_with("api_documentation: dropped 5 item(s)"));
    }

    #[test]
    fn oversized_item_is_skipped_not_fatal() {
        let items = vec![
            class("big", 1_000, 100.0),
            class("small", 10, 1.0),
            class("medium", 50, 2.0),
        ];
        let selector = ContentSelector::new(SelectionStrategy::EfficiencyRanked);
        let result = selector.select(items, &budget_with(Category::ApiDocumentation, 100));

        assert_eq!(ids(&result.selected), ["small", "medium"]);
        assert_eq!(result.dropped.len(), 1);
        assert_eq!(result.dropped[0].reason, DropReason::ItemTooLarge);
        assert_eq!(result.usage[&Category::ApiDocumentation], 60);
    }

    #[test]
    fn zero_budget_drops_everything_as_exhausted() {
        let items = vec![class("a", 1, 5.0), class("b", 500, 1.0)];
        let selector = ContentSelector::new(SelectionStrategy::EfficiencyRanked);
        let zero = TokenBudget::new(
            0,
            Category::ALL.iter().map(|&c| (c, 0)).collect(),
            0,
        )
        .unwrap();
        let result = selector.select(items, &zero);
        assert!(result.selected.is_empty());
        assert_eq!(result.dropped.len(), 2);
        assert!(result.dropped.iter().all(|d| d.reason == DropReason::BudgetExhausted));
    }

    #[test]
    fn every_category_reports_usage() {
        let selector = ContentSelector::new(SelectionStrategy::EfficiencyRanked);
        let result = selector.select(vec![], &budget_with(Category::Examples, 10));
        assert_eq!(result.usage.len(), Category::ALL.len());
        assert!(result.usage.values().all(|&u| u == 0));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn selected_items_are_grouped_by_category_order() {
        let items = vec![
            ScoredItem::new("example:0000", ItemType::Example, "x", 1, 1.0, vec![]),
            ScoredItem::new("metadata", ItemType::Metadata, "x", 1, 1.0, vec![]),
            class("class:m:A", 1, 1.0),
        ];
        let subs: BTreeMap<Category, usize> = Category::ALL.iter().map(|&c| (c, 10)).collect();
        let budget = TokenBudget::new(60, subs, 0).unwrap();
        let result = ContentSelector::new(SelectionStrategy::EfficiencyRanked).select(items, &budget);
        assert_eq!(ids(&result.selected), ["metadata", "class:m:A", "example:0000"]);
    }

    #[test]
    fn compression_rescues_an_item_that_almost_fits() {
        let counter = Arc::new(TokenCounter::with_tokenizer(Box::new(Words)));
        let compressor = ContentCompressor::new(counter.clone());
        let content = "class Big:\n    \"\"\"Short doc.\"\"\"\n    a = 1\n    b = 2\n    c = 3\n    d = 4";
        let tokens = counter.count(content, ItemType::Class.content_kind());
        let items = vec![
            class("first", 5, 100.0),
            ScoredItem::new("big", ItemType::Class, content, tokens, 50.0, vec!["well_documented".into()]),
        ];

        let selector =
            ContentSelector::new(SelectionStrategy::EfficiencyRanked).with_compressor(&compressor);
        let result = selector.select(items, &budget_with(Category::ApiDocumentation, 15));

        assert_eq!(ids(&result.selected), ["first", "big"]);
        let big = &result.selected[1];
        assert!(big.is_compressed());
        assert_eq!(big.reasons(), ["well_documented", "compressed"]);
        assert!(big.token_count() < tokens);
        assert!(result.usage[&Category::ApiDocumentation] <= 15);
        assert!(result.dropped.is_empty());
    }

    #[test]
    fn marker_only_compression_counts_as_not_fitting() {
        let counter = Arc::new(TokenCounter::with_tokenizer(Box::new(Words)));
        let compressor = ContentCompressor::new(counter);
        let items = vec![
            class("a", 4, 10.0),
            ScoredItem::new("b", ItemType::Class, "one two three four five six", 6, 5.0, vec![]),
            class("c", 1, 0.1),
        ];
        let selector =
            ContentSelector::new(SelectionStrategy::EfficiencyRanked).with_compressor(&compressor);
        let result = selector.select(items, &budget_with(Category::ApiDocumentation, 6));

        assert_eq!(ids(&result.selected), ["a"]);
        assert_eq!(result.dropped[0].item.content(), "one two three four five six");
        assert_ne!(result.dropped[0].item.content(), OMITTED_MARKER);
        assert_eq!(result.dropped[0].reason, DropReason::BudgetExhausted);
        assert_eq!(result.dropped[1].reason, DropReason::BudgetExhausted);
    }

    #[test]
    fn whole_module_keeps_groups_together() {
        let item = |id: &str, group: &str, tokens: usize, score: f64| {
            ScoredItem::new(id, ItemType::Function, "x", tokens, score, vec![]).with_group(group)
        };
        let items = vec![
            item("function:a:f", "a", 40, 9.0),
            item("function:a:g", "a", 40, 9.0),
            item("function:b:f", "b", 30, 5.0),
            item("function:b:g", "b", 30, 4.0),
            item("function:c:f", "c", 10, 1.0),
        ];
        let selector = ContentSelector::new(SelectionStrategy::WholeModule);
        let result = selector.select(items, &budget_with(Category::ApiDocumentation, 115));

        // a (18.0) fits whole; b (9.0) only partly; c is never reached.
        assert_eq!(ids(&result.selected), ["function:a:f", "function:a:g", "function:b:f"]);
        assert_eq!(result.usage[&Category::ApiDocumentation], 110);
        let dropped: Vec<&str> = result.dropped.iter().map(|d| d.item.item_id()).collect();
        assert_eq!(dropped, ["function:b:g", "function:c:f"]);
    }

    #[test]
    fn selection_ignores_input_order() {
        let items: Vec<ScoredItem> = (0..20)
            .map(|i| class(&format!("class:m:C{i:02}"), 10 + i % 7, (i % 5) as f64))
            .collect();
        let mut reversed = items.clone();
        reversed.reverse();

        let selector = ContentSelector::new(SelectionStrategy::EfficiencyRanked);
        let budget = budget_with(Category::ApiDocumentation, 90);
        let a = selector.select(items, &budget);
        let b = selector.select(reversed, &budget);
        assert_eq!(a.selected, b.selected);
        assert_eq!(a.dropped, b.dropped);
    }
}
