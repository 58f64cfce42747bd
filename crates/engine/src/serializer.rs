//! The canonical output document.
//!
//! Field order is fixed by the struct definitions and every map is a
//! `BTreeMap`, so the same [`SelectionResult`] always renders to the same
//! bytes. A timestamp appears only when one is attached explicitly.

use crate::item::{DroppedItem, ScoredItem, SelectionResult};
use chrono::{DateTime, Utc};
use docpack_core::{Category, ItemType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedEntry {
    pub item_id: String,
    pub item_type: ItemType,
    pub content: String,
    pub token_count: usize,
    pub priority_score: f64,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedEntry {
    pub item_id: String,
    pub item_type: ItemType,
    pub token_count: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub total_budget: usize,
    pub sub_budgets: BTreeMap<Category, usize>,
    pub buffer: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionDocument {
    pub selected: Vec<SelectedEntry>,
    pub dropped: Vec<DroppedEntry>,
    pub usage: BTreeMap<Category, usize>,
    pub warnings: Vec<String>,
    pub budget: BudgetSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

impl SelectionDocument {
    /// Attach the run timestamp.
    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = Some(at);
        self
    }

    pub fn to_json(&self) -> docpack_core::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> docpack_core::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn total_used(&self) -> usize {
        self.usage.values().sum()
    }
}

/// Convert a selection result into its output document.
pub fn serialize(result: &SelectionResult) -> SelectionDocument {
    SelectionDocument {
        selected: result.selected.iter().map(selected_entry).collect(),
        dropped: result.dropped.iter().map(dropped_entry).collect(),
        usage: result.usage.clone(),
        warnings: result.warnings.clone(),
        budget: BudgetSummary {
            total_budget: result.budget.total_budget(),
            sub_budgets: result.budget.sub_budgets().clone(),
            buffer: result.budget.buffer(),
        },
        generated_at: None,
    }
}

fn selected_entry(item: &ScoredItem) -> SelectedEntry {
    SelectedEntry {
        item_id: item.item_id().to_string(),
        item_type: item.item_type(),
        content: item.content().to_string(),
        token_count: item.token_count(),
        priority_score: round_score(item.priority_score()),
        reasons: item.reasons().to_vec(),
    }
}

fn dropped_entry(dropped: &DroppedItem) -> DroppedEntry {
    DroppedEntry {
        item_id: dropped.item.item_id().to_string(),
        item_type: dropped.item.item_type(),
        token_count: dropped.item.token_count(),
        reason: dropped.reason.to_string(),
    }
}

/// Four decimal places keeps text output stable across platforms.
fn round_score(score: f64) -> f64 {
    (score * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::TokenBudget;
    use crate::item::DropReason;
    use chrono::TimeZone;

    fn result() -> SelectionResult {
        let subs: BTreeMap<Category, usize> = Category::ALL
            .iter()
            .map(|&c| (c, if c == Category::ApiDocumentation { 10 } else { 0 }))
            .collect();
        SelectionResult {
            selected: vec![ScoredItem::new(
                "class:m:A",
                ItemType::Class,
                "class A:",
                3,
                15.600000000000001,
                vec!["well_documented".into()],
            )],
            dropped: vec![DroppedItem {
                item: ScoredItem::new("class:m:B", ItemType::Class, "class B:", 30, 1.0, vec![]),
                reason: DropReason::ItemTooLarge,
            }],
            usage: Category::ALL
                .iter()
                .map(|&c| (c, if c == Category::ApiDocumentation { 3 } else { 0 }))
                .collect(),
            warnings: vec!["api_documentation: dropped 1 item(s)".into()],
            budget: TokenBudget::new(10, subs, 0).unwrap(),
        }
    }

    #[test]
    fn document_has_contract_fields() {
        let json = serialize(&result()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let selected = &value["selected"][0];
        assert_eq!(selected["item_id"], "class:m:A");
        assert_eq!(selected["item_type"], "class");
        assert_eq!(selected["token_count"], 3);
        assert_eq!(selected["priority_score"], 15.6);
        assert_eq!(selected["reasons"][0], "well_documented");

        let dropped = &value["dropped"][0];
        assert_eq!(dropped["reason"], "item_too_large");
        assert!(dropped.get("content").is_none());

        assert_eq!(value["usage"]["api_documentation"], 3);
        assert_eq!(value["budget"]["total_budget"], 10);
        assert!(value.get("generated_at").is_none());
    }

    #[test]
    fn usage_keys_follow_category_order() {
        let json = serialize(&result()).to_json().unwrap();
        let positions: Vec<usize> = Category::ALL
            .iter()
            .map(|c| json.find(&format!("\"{c}\": ")).unwrap())
            .collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn rendering_is_byte_stable() {
        let a = serialize(&result()).to_json().unwrap();
        let b = serialize(&result()).to_json().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn timestamp_is_explicit() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let doc = serialize(&result()).with_timestamp(at);
        let json = doc.to_json().unwrap();
        assert!(json.contains("\"generated_at\": \"2024-05-01T12:00:00Z\""));

        let back = SelectionDocument::from_json(&json).unwrap();
        assert_eq!(back.generated_at, Some(at));
        assert_eq!(back.total_used(), 3);
    }

    #[test]
    fn scores_are_rounded() {
        assert_eq!(round_score(1.234_567), 1.2346);
        assert_eq!(round_score(13.0), 13.0);
    }
}
