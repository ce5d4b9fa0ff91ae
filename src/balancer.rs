use crate::error::{EventPlanError, Result};
use crate::recovery::{recover_json, ExpectedShape};
use crate::schema::{BudgetAllocation, BudgetCategory};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Fallback split used when the model's allocation cannot be recovered, in percent.
pub const DEFAULT_FOOD_PERCENT: i64 = 45;
pub const DEFAULT_ENTERTAINMENT_PERCENT: i64 = 25;
pub const DEFAULT_DECORATIONS_PERCENT: i64 = 30;

pub const DEFAULT_ALLOCATION_REASONING: &str = "Default allocation due to response parsing error";

/// A correction applied to make the split add up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub category: BudgetCategory,
    pub amount: i64,
}

impl Adjustment {
    pub fn note(&self) -> String {
        format!(
            "(Adjusted {} by {} to ensure total matches budget.)",
            self.category, self.amount
        )
    }
}

/// Forces a proposed three-way split to sum exactly to the required total.
pub struct BudgetBalancer {
    required_total: i64,
}

impl BudgetBalancer {
    pub fn new(required_total: i64) -> Self {
        Self { required_total }
    }

    /// Returns the balanced allocation and the adjustment made, if any.
    ///
    /// The difference goes to the largest category (first one wins on ties,
    /// in food, entertainment, decorations order). The result is not clamped:
    /// a large negative difference can push that category below zero.
    pub fn enforce(&self, proposed: BudgetAllocation) -> (BudgetAllocation, Option<Adjustment>) {
        let mut allocation = proposed;
        let actual_total = allocation.category_sum();

        if actual_total == self.required_total {
            allocation.total = self.required_total;
            return (allocation, None);
        }

        let diff = self.required_total - actual_total;
        let target = self.largest_category(&allocation);
        *allocation.amount_mut(target) += diff;
        allocation.total = self.required_total;

        let adjustment = Adjustment {
            category: target,
            amount: diff,
        };
        debug!(
            "Allocation summed to {} instead of {}: {}",
            actual_total,
            self.required_total,
            adjustment.note()
        );

        if allocation.reasoning.is_empty() {
            allocation.reasoning = adjustment.note();
        } else {
            allocation.reasoning = format!("{} {}", allocation.reasoning, adjustment.note());
        }

        (allocation, Some(adjustment))
    }

    pub fn verify(&self, allocation: &BudgetAllocation) -> Result<()> {
        if allocation.category_sum() != self.required_total || allocation.total != self.required_total {
            return Err(EventPlanError::AllocationMismatch {
                food: allocation.food,
                entertainment: allocation.entertainment,
                decorations: allocation.decorations,
                total: self.required_total,
            });
        }
        Ok(())
    }

    fn largest_category(&self, allocation: &BudgetAllocation) -> BudgetCategory {
        let mut best = BudgetCategory::Food;
        for category in BudgetCategory::ALL {
            if allocation.amount(category) > allocation.amount(best) {
                best = category;
            }
        }
        best
    }
}

pub fn reconcile_allocation(
    proposed: BudgetAllocation,
    required_total: i64,
) -> (BudgetAllocation, Option<Adjustment>) {
    BudgetBalancer::new(required_total).enforce(proposed)
}

/// Checks that the categories sum to the allocation's own total.
pub fn verify_allocation(allocation: &BudgetAllocation) -> Result<()> {
    BudgetBalancer::new(allocation.total).verify(allocation)
}

/// The 45/25/30 fallback split, balanced so that rounding never loses a unit.
pub fn default_allocation(total: i64) -> BudgetAllocation {
    let proposed = BudgetAllocation::new(
        total * DEFAULT_FOOD_PERCENT / 100,
        total * DEFAULT_ENTERTAINMENT_PERCENT / 100,
        total * DEFAULT_DECORATIONS_PERCENT / 100,
        total,
    )
    .with_reasoning(DEFAULT_ALLOCATION_REASONING);

    reconcile_allocation(proposed, total).0
}

/// Turns a model reply into a balanced allocation for `total`.
///
/// An unrecoverable reply, or one that names none of the three categories,
/// yields [`default_allocation`] with the reason recorded in `error`.
pub fn allocation_from_response(text: &str, total: i64) -> BudgetAllocation {
    match parse_allocation(text) {
        Ok(proposed) => {
            let (mut allocation, _) = reconcile_allocation(proposed, total);
            allocation.error = None;
            allocation
        }
        Err(e) => {
            warn!("Falling back to default allocation: {}", e);
            let mut allocation = default_allocation(total);
            allocation.error = Some(e.to_string());
            allocation
        }
    }
}

fn parse_allocation(text: &str) -> Result<BudgetAllocation> {
    let value = recover_json(text, ExpectedShape::Object).into_result()?;

    let names_a_category = value
        .as_object()
        .map(|map| BudgetCategory::ALL.iter().any(|c| map.contains_key(c.as_str())))
        .unwrap_or(false);
    if !names_a_category {
        return Err(EventPlanError::Recovery(
            "Model output has no food, entertainment or decorations amounts".to_string(),
        ));
    }

    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MAX_AMOUNT;
    use proptest::prelude::*;

    #[test]
    fn test_allocation_from_fenced_reply() {
        let reply = "Here you go:\n```json\n{\"food\": 50000, \"entertainment\": 20000, \"decorations\": 20000, \"total\": 90000, \"reasoning\": \"Food heavy.\"}\n```";
        let allocation = allocation_from_response(reply, 100_000);

        assert_eq!(allocation.food, 60_000);
        assert_eq!(allocation.total, 100_000);
        assert!(allocation.error.is_none());
        assert!(allocation.reasoning.ends_with("(Adjusted food by 10000 to ensure total matches budget.)"));
    }

    #[test]
    fn test_unparseable_reply_uses_default() {
        let allocation = allocation_from_response("I cannot help with budgets today.", 100_000);
        assert_eq!(allocation.food, 45_000);
        assert_eq!(allocation.reasoning, DEFAULT_ALLOCATION_REASONING);
        assert!(allocation.error.is_some());
        assert!(verify_allocation(&allocation).is_ok());
    }

    #[test]
    fn test_object_without_categories_uses_default() {
        let allocation = allocation_from_response(r#"{"venue": 10000}"#, 1_000);
        assert_eq!(allocation.category_sum(), 1_000);
        assert!(allocation.error.unwrap().contains("no food"));
    }

    #[test]
    fn test_garbage_amount_uses_default() {
        let allocation = allocation_from_response(r#"{"food": "lots", "entertainment": 1, "decorations": 1}"#, 300);
        assert_eq!(allocation.reasoning, DEFAULT_ALLOCATION_REASONING);
        assert_eq!(allocation.category_sum(), 300);
    }

    #[test]
    fn test_unreadable_total_keeps_model_split() {
        let reply = r#"{"food": 50000, "entertainment": 25000, "decorations": 25000, "total": "total_budget", "reasoning": ["Food first", "then music"]}"#;
        let allocation = allocation_from_response(reply, 100_000);

        assert!(allocation.error.is_none());
        assert_eq!(allocation.food, 50_000);
        assert_eq!(allocation.decorations, 25_000);
        assert_eq!(allocation.total, 100_000);
        assert!(allocation.reasoning.contains("Food first"));
    }

    fn expected_target(allocation: &BudgetAllocation) -> BudgetCategory {
        let max = BudgetCategory::ALL
            .iter()
            .map(|c| allocation.amount(*c))
            .max()
            .unwrap();
        BudgetCategory::ALL
            .into_iter()
            .find(|c| allocation.amount(*c) == max)
            .unwrap()
    }

    proptest! {
        #[test]
        fn prop_reconciled_categories_sum_to_total(
            food in -MAX_AMOUNT..=MAX_AMOUNT,
            entertainment in -MAX_AMOUNT..=MAX_AMOUNT,
            decorations in -MAX_AMOUNT..=MAX_AMOUNT,
            total in 0..=MAX_AMOUNT,
        ) {
            let proposed = BudgetAllocation::new(food, entertainment, decorations, 0);
            let (balanced, adjustment) = reconcile_allocation(proposed.clone(), total);

            prop_assert_eq!(balanced.category_sum(), total);
            prop_assert_eq!(balanced.total, total);
            prop_assert!(verify_allocation(&balanced).is_ok());

            let diff = total - proposed.category_sum();
            if diff == 0 {
                prop_assert!(adjustment.is_none());
                prop_assert_eq!(&balanced.reasoning, &proposed.reasoning);
            } else {
                let target = expected_target(&proposed);
                prop_assert_eq!(adjustment, Some(Adjustment { category: target, amount: diff }));
                for category in BudgetCategory::ALL {
                    let expected = if category == target {
                        proposed.amount(category) + diff
                    } else {
                        proposed.amount(category)
                    };
                    prop_assert_eq!(balanced.amount(category), expected);
                }
            }
        }

        #[test]
        fn prop_reconciliation_is_idempotent(
            food in -MAX_AMOUNT..=MAX_AMOUNT,
            entertainment in -MAX_AMOUNT..=MAX_AMOUNT,
            decorations in -MAX_AMOUNT..=MAX_AMOUNT,
            total in 0..=MAX_AMOUNT,
        ) {
            let proposed = BudgetAllocation::new(food, entertainment, decorations, 0).with_reasoning("split");
            let (once, _) = reconcile_allocation(proposed, total);
            let (twice, adjustment) = reconcile_allocation(once.clone(), total);

            prop_assert!(adjustment.is_none());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_default_allocation_balances(total in 0..=MAX_AMOUNT) {
            let allocation = default_allocation(total);
            prop_assert_eq!(allocation.category_sum(), total);
            prop_assert!(allocation.food >= allocation.decorations);
        }
    }

    #[test]
    fn test_shortfall_goes_to_largest_category() {
        let proposed = BudgetAllocation::new(50_000, 20_000, 20_000, 90_000).with_reasoning("Food heavy.");
        let (balanced, adjustment) = reconcile_allocation(proposed, 100_000);

        assert_eq!(balanced.food, 60_000);
        assert_eq!(balanced.entertainment, 20_000);
        assert_eq!(balanced.decorations, 20_000);
        assert_eq!(balanced.total, 100_000);
        assert_eq!(
            adjustment,
            Some(Adjustment {
                category: BudgetCategory::Food,
                amount: 10_000
            })
        );
        assert_eq!(
            balanced.reasoning,
            "Food heavy. (Adjusted food by 10000 to ensure total matches budget.)"
        );
        assert!(verify_allocation(&balanced).is_ok());
    }

    #[test]
    fn test_overshoot_is_subtracted() {
        let proposed = BudgetAllocation::new(30_000, 45_000, 35_000, 110_000);
        let (balanced, adjustment) = reconcile_allocation(proposed, 100_000);

        assert_eq!(balanced.entertainment, 35_000);
        assert_eq!(adjustment.unwrap().amount, -10_000);
        assert_eq!(balanced.category_sum(), 100_000);
    }

    #[test]
    fn test_ties_prefer_fixed_order() {
        let proposed = BudgetAllocation::new(10, 40, 40, 90);
        let (balanced, adjustment) = reconcile_allocation(proposed, 100);
        assert_eq!(adjustment.unwrap().category, BudgetCategory::Entertainment);
        assert_eq!(balanced.entertainment, 50);

        let all_equal = BudgetAllocation::new(0, 0, 0, 0);
        let (balanced, adjustment) = reconcile_allocation(all_equal, 300);
        assert_eq!(adjustment.unwrap().category, BudgetCategory::Food);
        assert_eq!(balanced.food, 300);
    }

    #[test]
    fn test_category_may_go_negative() {
        let proposed = BudgetAllocation::new(1_000, 900, 800, 2_700);
        let (balanced, _) = reconcile_allocation(proposed, 0);
        assert_eq!(balanced.food, -1_700);
        assert_eq!(balanced.category_sum(), 0);
    }

    #[test]
    fn test_reconciliation_is_idempotent() {
        let proposed = BudgetAllocation::new(12_345, 6_789, 1_011, 0).with_reasoning("x");
        let (once, _) = reconcile_allocation(proposed, 50_000);
        let (twice, adjustment) = reconcile_allocation(once.clone(), 50_000);

        assert_eq!(once, twice);
        assert!(adjustment.is_none());
    }

    #[test]
    fn test_matching_sum_only_normalises_total() {
        let proposed = BudgetAllocation::new(50, 25, 25, 120).with_reasoning("ok");
        let (balanced, adjustment) = reconcile_allocation(proposed, 100);
        assert!(adjustment.is_none());
        assert_eq!(balanced.total, 100);
        assert_eq!(balanced.reasoning, "ok");
    }

    #[test]
    fn test_verify_detects_mismatch() {
        let allocation = BudgetAllocation::new(10, 10, 10, 40);
        assert!(matches!(
            verify_allocation(&allocation),
            Err(EventPlanError::AllocationMismatch { total: 40, .. })
        ));
    }

    #[test]
    fn test_default_allocation_ratios() {
        let allocation = default_allocation(100_000);
        assert_eq!(allocation.food, 45_000);
        assert_eq!(allocation.entertainment, 25_000);
        assert_eq!(allocation.decorations, 30_000);
        assert_eq!(allocation.reasoning, DEFAULT_ALLOCATION_REASONING);

        let odd = default_allocation(101);
        assert_eq!(odd.category_sum(), 101);
        assert_eq!(odd.food, 46);
    }
}
