use crate::schema::{BudgetAllocation, BudgetCategory, EventKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive percentage range, e.g. 45-55%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PercentRange {
    pub low: u8,
    pub high: u8,
}

impl PercentRange {
    pub const fn new(low: u8, high: u8) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, percent: f64) -> bool {
        percent >= f64::from(self.low) && percent <= f64::from(self.high)
    }
}

impl fmt::Display for PercentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}%", self.low, self.high)
    }
}

/// Typical split ranges handed to the model alongside the allocation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationGuidelines {
    pub food: PercentRange,
    pub entertainment: PercentRange,
    pub decorations: PercentRange,
}

const WEDDING: AllocationGuidelines = AllocationGuidelines {
    food: PercentRange::new(45, 55),
    entertainment: PercentRange::new(20, 30),
    decorations: PercentRange::new(20, 30),
};

const BIRTHDAY: AllocationGuidelines = AllocationGuidelines {
    food: PercentRange::new(35, 45),
    entertainment: PercentRange::new(35, 45),
    decorations: PercentRange::new(15, 25),
};

const CORPORATE: AllocationGuidelines = AllocationGuidelines {
    food: PercentRange::new(30, 40),
    entertainment: PercentRange::new(30, 40),
    decorations: PercentRange::new(25, 35),
};

impl AllocationGuidelines {
    /// Unknown kinds borrow the wedding ranges.
    pub fn for_kind(kind: EventKind) -> Self {
        match kind {
            EventKind::Wedding | EventKind::Other => WEDDING,
            EventKind::Birthday => BIRTHDAY,
            EventKind::Corporate => CORPORATE,
        }
    }

    pub fn range(&self, category: BudgetCategory) -> PercentRange {
        match category {
            BudgetCategory::Food => self.food,
            BudgetCategory::Entertainment => self.entertainment,
            BudgetCategory::Decorations => self.decorations,
        }
    }

    /// Categories whose share of the allocation falls outside the guideline range.
    pub fn deviations(&self, allocation: &BudgetAllocation) -> Vec<BudgetCategory> {
        BudgetCategory::ALL
            .into_iter()
            .filter(|category| {
                allocation
                    .share_of_total(*category)
                    .map(|share| !self.range(*category).contains(share))
                    .unwrap_or(false)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_kind_uses_wedding_ranges() {
        assert_eq!(AllocationGuidelines::for_kind(EventKind::Other), WEDDING);
        assert_eq!(
            AllocationGuidelines::for_kind(EventKind::Birthday).decorations.to_string(),
            "15-25%"
        );
    }

    #[test]
    fn test_deviations() {
        let guidelines = AllocationGuidelines::for_kind(EventKind::Wedding);
        let within = BudgetAllocation::new(50_000, 25_000, 25_000, 100_000);
        assert!(guidelines.deviations(&within).is_empty());

        let skewed = BudgetAllocation::new(80_000, 10_000, 10_000, 100_000);
        assert_eq!(
            guidelines.deviations(&skewed),
            vec![
                BudgetCategory::Food,
                BudgetCategory::Entertainment,
                BudgetCategory::Decorations
            ]
        );
    }
}
