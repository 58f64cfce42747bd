//! Budget allocation: split one total token budget into per-category
//! sub-budgets plus a reserve buffer.

use docpack_config::BudgetAllocation;
use docpack_core::{Category, ConfigurationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Allowed drift of the percentages' sum away from 1.0, and of the
/// allocated amounts away from the total (as a fraction of it).
pub const PERCENTAGE_TOLERANCE: f64 = 0.001;

/// Absorbs binary representation error, e.g. `0.6 * 1000.0` landing just
/// below 600.
const FLOOR_EPSILON: f64 = 1e-9;

/// The allocated budget for one run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBudget {
    total_budget: usize,
    sub_budgets: BTreeMap<Category, usize>,
    buffer: usize,
}

impl TokenBudget {
    /// Build a budget from explicit amounts.
    ///
    /// Every category must be present, and `sum(sub_budgets) + buffer` must
    /// be within 0.1% of `total_budget`.
    pub fn new(
        total_budget: usize,
        sub_budgets: BTreeMap<Category, usize>,
        buffer: usize,
    ) -> Result<Self, ConfigurationError> {
        if let Some(missing) = Category::ALL
            .iter()
            .find(|c| !sub_budgets.contains_key(c))
        {
            return Err(ConfigurationError::MissingCategory(missing.to_string()));
        }

        let allocated = sub_budgets
            .values()
            .try_fold(buffer, |acc, &n| acc.checked_add(n))
            .ok_or(ConfigurationError::BudgetInvariant {
                total: total_budget,
                allocated: usize::MAX,
            })?;
        let drift = allocated.abs_diff(total_budget) as f64;
        if drift > total_budget as f64 * PERCENTAGE_TOLERANCE {
            return Err(ConfigurationError::BudgetInvariant {
                total: total_budget,
                allocated,
            });
        }

        Ok(Self {
            total_budget,
            sub_budgets,
            buffer,
        })
    }

    pub fn total_budget(&self) -> usize {
        self.total_budget
    }

    /// Tokens reserved for one category. Unknown categories get nothing.
    pub fn sub_budget(&self, category: Category) -> usize {
        self.sub_budgets.get(&category).copied().unwrap_or(0)
    }

    pub fn sub_budgets(&self) -> &BTreeMap<Category, usize> {
        &self.sub_budgets
    }

    /// Reserve that no category may spend.
    pub fn buffer(&self) -> usize {
        self.buffer
    }

    /// Sum of all category sub-budgets (buffer excluded).
    pub fn allocated(&self) -> usize {
        self.sub_budgets
            .values()
            .fold(0, |acc: usize, &n| acc.saturating_add(n))
    }
}

/// Split `total_budget` by the configured fractions.
///
/// Each category gets `floor(total × fraction)`, capped at what earlier
/// categories left over, so the sub-budgets never add up past the total.
/// Whatever remains lands in the buffer.
pub fn allocate(
    total_budget: usize,
    allocation: &BudgetAllocation,
) -> Result<TokenBudget, ConfigurationError> {
    let mut sum = 0.0;
    for (name, value) in allocation.entries() {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(ConfigurationError::PercentageOutOfRange {
                category: name.to_string(),
                value,
            });
        }
        sum += value;
    }
    if (sum - 1.0).abs() > PERCENTAGE_TOLERANCE {
        return Err(ConfigurationError::PercentagesDoNotSum { sum });
    }

    let mut remaining = total_budget;
    let sub_budgets: BTreeMap<Category, usize> = Category::ALL
        .iter()
        .map(|&category| {
            let share = total_budget as f64 * allocation.fraction(category);
            let amount = ((share + FLOOR_EPSILON).floor() as usize).min(remaining);
            remaining -= amount;
            (category, amount)
        })
        .collect();

    let buffer = remaining;

    let budget = TokenBudget::new(total_budget, sub_budgets, buffer)?;
    tracing::debug!(
        total = budget.total_budget(),
        allocated = budget.allocated(),
        buffer = budget.buffer(),
        "Budget allocated"
    );
    Ok(budget)
}

/// Like [`allocate`], for fractions keyed by category name (`"buffer"` for
/// the reserve), as read from a request rather than a config file.
pub fn allocate_from_map(
    total_budget: usize,
    fractions: &BTreeMap<String, f64>,
) -> Result<TokenBudget, ConfigurationError> {
    let allocation =
        BudgetAllocation::from_map(fractions).map_err(ConfigurationError::MissingCategory)?;
    allocate(total_budget, &allocation)
}
