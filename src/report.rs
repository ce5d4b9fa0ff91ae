use crate::guidelines::{AllocationGuidelines, PercentRange};
use crate::schema::{BudgetCategory, DecorationRecommendations, EventPlan, ProductItem, Theme};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Colour words picked out of a theme's visual style, in this order.
pub const PALETTE_COLOURS: [&str; 16] = [
    "blue", "green", "purple", "red", "yellow", "orange", "pink", "teal", "white", "black",
    "grey", "gray", "brown", "gold", "silver", "neon",
];

const MAX_TITLE_CHARS: usize = 60;
const MAX_STARS: f64 = 5.0;

/// Colours mentioned as whole words in `text`.
pub fn extract_palette(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .collect();

    PALETTE_COLOURS
        .iter()
        .filter(|colour| words.contains(*colour))
        .map(|colour| colour.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetLine {
    pub category: BudgetCategory,
    pub amount: i64,
    pub percentage: Option<f64>,
    pub guideline: PercentRange,
    pub within_guideline: bool,
}

/// A presentation-ready view of an [`EventPlan`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanReport {
    pub event_type: String,
    pub currency: String,
    pub total_budget: i64,
    pub guest_count: u32,
    pub veg_count: u32,
    pub nonveg_count: u32,
    pub theme: Theme,
    pub palette: Vec<String>,
    pub budget: Vec<BudgetLine>,
    pub reasoning: String,
    pub decorations: DecorationRecommendations,
    pub issues: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl PlanReport {
    pub fn from_plan(plan: &EventPlan) -> Self {
        let request = &plan.event_details.request;
        let allocation = &plan.budget_allocation;
        let guidelines = AllocationGuidelines::for_kind(request.kind());
        let deviations = guidelines.deviations(allocation);

        let budget = BudgetCategory::ALL
            .into_iter()
            .map(|category| BudgetLine {
                category,
                amount: allocation.amount(category),
                percentage: allocation.share_of_total(category),
                guideline: guidelines.range(category),
                within_guideline: !deviations.contains(&category),
            })
            .collect();

        Self {
            event_type: request.event_type.clone(),
            currency: request.currency.clone(),
            total_budget: allocation.total,
            guest_count: request.guest_count,
            veg_count: request.veg_count,
            nonveg_count: request.nonveg_count,
            theme: plan.event_details.theme.clone(),
            palette: extract_palette(&plan.event_details.theme.aesthetic),
            budget,
            reasoning: allocation.reasoning.clone(),
            decorations: plan.decoration_recommendations.clone(),
            issues: plan.errors(),
            generated_at: plan.generated_at,
        }
    }

    /// Categories outside the typical range for this kind of event.
    pub fn deviations(&self) -> Vec<BudgetCategory> {
        self.budget
            .iter()
            .filter(|line| !line.within_guideline)
            .map(|line| line.category)
            .collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str("Category,Amount,Percentage,Guideline,Within Guideline\n");

        for line in &self.budget {
            output.push_str(&format!(
                "{},{},{},{},{}\n",
                title_case(line.category.as_str()),
                line.amount,
                format_percentage(line.percentage),
                line.guideline,
                line.within_guideline
            ));
        }
        output.push_str(&format!("Total,{},,,\n", self.total_budget));

        output
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("# Event Plan - {}\n\n", self.event_type));
        output.push_str(&format!(
            "**Budget:** {} {} | **Guests:** {} (Veg {} / Non-veg {})\n\n",
            self.total_budget, self.currency, self.guest_count, self.veg_count, self.nonveg_count
        ));
        output.push_str(&format!(
            "_Generated {}_\n\n",
            self.generated_at.format("%Y-%m-%d %H:%M UTC")
        ));

        output.push_str("## Theme\n\n");
        if self.theme.is_placeholder() {
            output.push_str("_No theme information available_\n\n");
        } else {
            output.push_str(&format!("### {}\n\n", self.theme.name));
            if !self.theme.description.is_empty() {
                output.push_str(&format!("{}\n\n", self.theme.description));
            }
            if !self.theme.aesthetic.is_empty() {
                output.push_str(&format!(
                    "**Aesthetic & Visual Style:** {}\n\n",
                    self.theme.aesthetic
                ));
            }
            if !self.palette.is_empty() {
                let swatches: Vec<String> = self.palette.iter().map(|c| title_case(c)).collect();
                output.push_str(&format!("**Colour Palette:** {}\n\n", swatches.join(", ")));
            }
        }

        output.push_str("## Budget Allocation\n\n");
        output.push_str("| Category | Amount | Percentage | Typical Range |\n");
        output.push_str("|---|---:|---:|---|\n");
        for line in &self.budget {
            let marker = if line.within_guideline { "" } else { " ⚠️" };
            output.push_str(&format!(
                "| {} | {} | {} | {}{} |\n",
                title_case(line.category.as_str()),
                line.amount,
                format_percentage(line.percentage),
                line.guideline,
                marker
            ));
        }
        output.push_str(&format!("| **Total** | {} | | |\n\n", self.total_budget));

        if !self.reasoning.trim().is_empty() {
            output.push_str("### Budget Reasoning\n\n");
            for paragraph in self.reasoning.split("\n\n") {
                output.push_str(paragraph.trim());
                output.push_str("\n\n");
            }
        }

        output.push_str(&self.decorations_markdown());

        if !self.issues.is_empty() {
            output.push_str("## Issues\n\n");
            for issue in &self.issues {
                output.push_str(&format!("- {}\n", issue));
            }
            output.push('\n');
        }

        output
    }

    fn decorations_markdown(&self) -> String {
        let mut output = String::new();
        let decorations = &self.decorations;

        output.push_str("## Decoration Recommendations\n\n");
        output.push_str(&format!(
            "Total Decoration Budget: {} {} (up to {} {} per product)\n\n",
            decorations.total_amount, self.currency, decorations.amount_per_product, self.currency
        ));

        if decorations.products.is_empty() {
            output.push_str("_No specific products found in recommendations_\n\n");
            return output;
        }

        for category in &decorations.products {
            output.push_str(&format!("### {}\n\n", category.keyword));

            if let Some(error) = &category.error {
                output.push_str(&format!("_Error retrieving products: {}_\n\n", error));
                continue;
            }
            if category.items.is_empty() {
                output.push_str("_No products found for this category_\n\n");
                continue;
            }

            for item in &category.items {
                output.push_str(&format!("- {}\n", product_line(item)));
            }
            output.push('\n');
        }

        output
    }
}

fn product_line(item: &ProductItem) -> String {
    let title = truncate_title(item.title.as_deref().unwrap_or("No title"));
    let link = match &item.url {
        Some(url) => format!("**[{}]({})**", title, url),
        None => format!("**{}**", title),
    };
    let price = item.price.as_deref().unwrap_or("Price not available");

    format!("{} | {} | {}", link, price, rating_display(item.rating.as_deref()))
}

fn rating_display(rating: Option<&str>) -> String {
    match rating.and_then(|r| r.trim().parse::<f64>().ok().map(|v| (r, v))) {
        Some((raw, value)) if value >= 0.0 => {
            let stars = value.min(MAX_STARS).trunc() as usize;
            format!("{} ({})", "⭐".repeat(stars), raw.trim())
        }
        _ => "Rating not available".to_string(),
    }
}

fn truncate_title(title: &str) -> String {
    if title.chars().count() > MAX_TITLE_CHARS {
        let cut: String = title.chars().take(MAX_TITLE_CHARS - 3).collect();
        format!("{}...", cut)
    } else {
        title.to_string()
    }
}

fn format_percentage(percentage: Option<f64>) -> String {
    percentage
        .map(|p| format!("{:.1}%", p))
        .unwrap_or_else(|| "n/a".to_string())
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
