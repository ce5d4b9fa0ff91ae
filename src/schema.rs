use chrono::{DateTime, Utc};
use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Largest amount accepted from model output. Anything bigger is treated as garbage.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum EventKind {
    Wedding,
    Birthday,
    Corporate,
    Other,
}

impl EventKind {
    /// Maps a free-form event type ("Birthday Party", "corporate offsite") to a kind.
    pub fn classify(event_type: &str) -> Self {
        let lower = event_type.to_lowercase();
        if lower.contains("wedding") || lower.contains("marriage") {
            Self::Wedding
        } else if lower.contains("birthday") {
            Self::Birthday
        } else if lower.contains("corporate") || lower.contains("office") || lower.contains("conference") {
            Self::Corporate
        } else {
            Self::Other
        }
    }
}

fn default_currency() -> String {
    "INR".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EventRequest {
    #[schemars(description = "Free-form event type, e.g. 'Wedding', 'Birthday Party', 'Corporate'")]
    pub event_type: String,

    #[schemars(description = "Total budget for the event in whole currency units")]
    pub total_budget: u64,

    #[serde(default = "default_currency")]
    #[schemars(description = "ISO currency code, defaults to INR")]
    pub currency: String,

    pub guest_count: u32,

    #[serde(default)]
    pub veg_count: u32,

    #[serde(default)]
    pub nonveg_count: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Optional food spend per guest the host has in mind")]
    pub food_budget_per_guest: Option<u64>,
}

impl EventRequest {
    pub fn new(event_type: impl Into<String>, total_budget: u64, guest_count: u32) -> Self {
        Self {
            event_type: event_type.into(),
            total_budget,
            currency: default_currency(),
            guest_count,
            veg_count: 0,
            nonveg_count: 0,
            food_budget_per_guest: None,
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_diet_split(mut self, veg_count: u32, nonveg_count: u32) -> Self {
        self.veg_count = veg_count;
        self.nonveg_count = nonveg_count;
        self
    }

    pub fn with_food_budget_per_guest(mut self, amount: u64) -> Self {
        self.food_budget_per_guest = Some(amount);
        self
    }

    pub fn kind(&self) -> EventKind {
        EventKind::classify(&self.event_type)
    }

    /// The budget as a signed amount, capped at [`MAX_AMOUNT`].
    pub fn budget_total(&self) -> i64 {
        i64::try_from(self.total_budget)
            .unwrap_or(MAX_AMOUNT)
            .min(MAX_AMOUNT)
    }

    /// Difference between the diet sub-counts and the guest count, if any.
    ///
    /// The counts are never forced to agree; this is informational only.
    pub fn guest_split_mismatch(&self) -> Option<i64> {
        let diff = i64::from(self.veg_count) + i64::from(self.nonveg_count) - i64::from(self.guest_count);
        (diff != 0).then_some(diff)
    }
}

const PLACEHOLDER_THEME_NAME: &str = "Theme data is missing";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Theme {
    #[serde(default, alias = "Name", alias = "theme_name")]
    #[schemars(description = "Short, memorable theme name")]
    pub name: String,

    #[serde(default, alias = "Description")]
    #[schemars(description = "One or two sentences describing the concept")]
    pub description: String,

    #[serde(
        default,
        alias = "Aesthetic/Visual Style",
        alias = "aesthetic_visual_style",
        alias = "visual_style"
    )]
    #[schemars(description = "Colours, materials and overall visual style")]
    pub aesthetic: String,
}

impl Theme {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        aesthetic: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            aesthetic: aesthetic.into(),
        }
    }

    /// Stand-in used when no theme could be selected.
    pub fn placeholder() -> Self {
        Self {
            name: PLACEHOLDER_THEME_NAME.to_string(),
            description: "No theme could be selected from the suggestions".to_string(),
            aesthetic: String::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.name == PLACEHOLDER_THEME_NAME
    }

    /// Reads a theme out of a recovered JSON value. Non-objects and nameless objects are rejected.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        let theme: Theme = serde_json::from_value(value.clone()).ok()?;
        (!theme.name.trim().is_empty()).then_some(theme)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetCategory {
    Food,
    Entertainment,
    Decorations,
}

impl BudgetCategory {
    /// Fixed order; also the tie-break order for reconciliation.
    pub const ALL: [BudgetCategory; 3] = [Self::Food, Self::Entertainment, Self::Decorations];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Entertainment => "entertainment",
            Self::Decorations => "decorations",
        }
    }
}

impl fmt::Display for BudgetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BudgetAllocation {
    #[serde(default, deserialize_with = "lenient_amount")]
    #[schemars(description = "Amount allocated to food, whole currency units")]
    pub food: i64,

    #[serde(default, deserialize_with = "lenient_amount")]
    #[schemars(description = "Amount allocated to entertainment, whole currency units")]
    pub entertainment: i64,

    #[serde(default, deserialize_with = "lenient_amount")]
    #[schemars(description = "Amount allocated to decorations, whole currency units")]
    pub decorations: i64,

    #[serde(default, deserialize_with = "overridden_amount")]
    #[schemars(description = "Must equal the total budget exactly")]
    pub total: i64,

    #[serde(default, deserialize_with = "lenient_reasoning")]
    #[schemars(description = "Explanation of the allocation decisions, including theme considerations")]
    pub reasoning: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub error: Option<String>,
}

impl BudgetAllocation {
    pub fn new(food: i64, entertainment: i64, decorations: i64, total: i64) -> Self {
        Self {
            food,
            entertainment,
            decorations,
            total,
            reasoning: String::new(),
            error: None,
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    pub fn amount(&self, category: BudgetCategory) -> i64 {
        match category {
            BudgetCategory::Food => self.food,
            BudgetCategory::Entertainment => self.entertainment,
            BudgetCategory::Decorations => self.decorations,
        }
    }

    pub fn amount_mut(&mut self, category: BudgetCategory) -> &mut i64 {
        match category {
            BudgetCategory::Food => &mut self.food,
            BudgetCategory::Entertainment => &mut self.entertainment,
            BudgetCategory::Decorations => &mut self.decorations,
        }
    }

    pub fn category_sum(&self) -> i64 {
        BudgetCategory::ALL.iter().map(|c| self.amount(*c)).sum()
    }

    pub fn share_of_total(&self, category: BudgetCategory) -> Option<f64> {
        (self.total != 0).then(|| self.amount(category) as f64 / self.total as f64 * 100.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProductItem {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub rating: Option<String>,
    #[serde(default, alias = "imageUrl", deserialize_with = "lenient_text")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KeywordProducts {
    pub keyword: String,
    #[serde(default)]
    pub items: Vec<ProductItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DecorationRecommendations {
    pub keywords: Vec<String>,
    pub amount_per_product: i64,
    pub total_amount: i64,
    pub products: Vec<KeywordProducts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetails {
    #[serde(flatten)]
    pub request: EventRequest,
    pub theme: Theme,
}

/// The combined result of one planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPlan {
    pub event_details: EventDetails,
    pub budget_allocation: BudgetAllocation,
    pub decoration_recommendations: DecorationRecommendations,
    pub generated_at: DateTime<Utc>,
}

impl EventPlan {
    /// Every soft error embedded anywhere in the plan, prefixed with where it came from.
    pub fn errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.event_details.theme.is_placeholder() {
            errors.push(format!("theme: {}", self.event_details.theme.name));
        }
        if let Some(e) = &self.budget_allocation.error {
            errors.push(format!("budget: {}", e));
        }
        if let Some(e) = &self.decoration_recommendations.error {
            errors.push(format!("decorations: {}", e));
        }
        for entry in &self.decoration_recommendations.products {
            if let Some(e) = &entry.error {
                errors.push(format!("products '{}': {}", entry.keyword, e));
            }
        }

        errors
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Parses an amount the way models tend to write them: integers, floats,
/// or strings such as "₹45,000" or "12000.50". Missing or null is zero.
pub fn parse_amount(value: &Value) -> Result<i64, String> {
    let amount = match value {
        Value::Null => return Ok(0),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i as f64
            } else {
                n.as_f64().ok_or_else(|| format!("unsupported number {}", n))?
            }
        }
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned
                .parse::<f64>()
                .map_err(|_| format!("'{}' is not an amount", s))?
        }
        other => return Err(format!("expected an amount, found {}", other)),
    };

    if !amount.is_finite() || amount.abs() > MAX_AMOUNT as f64 {
        return Err(format!("amount {} is out of range", amount));
    }

    Ok(amount.round() as i64)
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    parse_amount(&value).map_err(de::Error::custom)
}

/// For fields the balancer overwrites anyway: an unreadable value is zero.
fn overridden_amount<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(parse_amount(&value).unwrap_or(0))
}

fn reasoning_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Array(parts) => parts
            .into_iter()
            .map(reasoning_text)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    }
}

fn lenient_reasoning<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(reasoning_text)
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// Generates a Gemini-compatible response schema: inlined, no `$schema`,
/// nullable types expressed with `nullable` instead of type arrays.
pub fn response_schema<T: JsonSchema>() -> serde_json::Result<Value> {
    let settings = SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
        s.meta_schema = None;
    });
    let root = settings.into_generator().into_root_schema_for::<T>();
    let mut value = serde_json::to_value(root)?;
    clean_schema(&mut value);
    Ok(value)
}

fn clean_schema(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in ["$schema", "definitions", "title", "format", "default", "minimum"] {
                map.remove(key);
            }

            if let Some(Value::Array(types)) = map.get("type").cloned() {
                let non_null: Vec<Value> = types.into_iter().filter(|t| t != "null").collect();
                if let Some(first) = non_null.first() {
                    map.insert("type".to_string(), first.clone());
                    map.insert("nullable".to_string(), Value::Bool(true));
                }
            }

            for child in map.values_mut() {
                clean_schema(child);
            }
        }
        Value::Array(items) => {
            for item in items {
                clean_schema(item);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_kind_classification() {
        assert_eq!(EventKind::classify("Wedding"), EventKind::Wedding);
        assert_eq!(EventKind::classify("Birthday Party"), EventKind::Birthday);
        assert_eq!(EventKind::classify("Corporate Offsite"), EventKind::Corporate);
        assert_eq!(EventKind::classify("Baby Shower"), EventKind::Other);
    }

    #[test]
    fn test_guest_split_is_not_enforced() {
        let request = EventRequest::new("Birthday", 50_000, 100).with_diet_split(60, 30);
        assert_eq!(request.guest_split_mismatch(), Some(-10));

        let balanced = EventRequest::new("Birthday", 50_000, 100).with_diet_split(60, 40);
        assert_eq!(balanced.guest_split_mismatch(), None);
    }

    #[test]
    fn test_budget_total_is_capped() {
        assert_eq!(EventRequest::new("Wedding", 500_000, 200).budget_total(), 500_000);
        assert_eq!(EventRequest::new("Wedding", u64::MAX, 200).budget_total(), MAX_AMOUNT);
    }

    #[test]
    fn test_allocation_tolerates_odd_total_and_reasoning() {
        let allocation: BudgetAllocation = serde_json::from_value(json!({
            "food": "45,000",
            "entertainment": 25000,
            "decorations": 30000.4,
            "total": "total_budget",
            "reasoning": ["Food first.", null, "Music second."]
        }))
        .unwrap();

        assert_eq!(allocation.food, 45_000);
        assert_eq!(allocation.decorations, 30_000);
        assert_eq!(allocation.total, 0);
        assert_eq!(allocation.reasoning, "Food first. Music second.");

        let allocation: BudgetAllocation =
            serde_json::from_value(json!({"food": 1, "reasoning": {"why": "guests"}})).unwrap();
        assert_eq!(allocation.reasoning, r#"{"why":"guests"}"#);

        let allocation: BudgetAllocation =
            serde_json::from_value(json!({"food": 1, "reasoning": null})).unwrap();
        assert!(allocation.reasoning.is_empty());
    }

    #[test]
    fn test_theme_aliases() {
        let theme: Theme = serde_json::from_value(json!({
            "Name": "Enchanted Garden",
            "Description": "Fairy-tale forest",
            "Aesthetic/Visual Style": "Greens and gold"
        }))
        .unwrap();
        assert_eq!(theme.name, "Enchanted Garden");
        assert_eq!(theme.aesthetic, "Greens and gold");

        let json = serde_json::to_value(&theme).unwrap();
        assert_eq!(json["name"], "Enchanted Garden");
    }

    #[test]
    fn test_theme_from_value_rejects_non_objects() {
        assert!(Theme::from_value(&json!("only one element")).is_none());
        assert!(Theme::from_value(&json!({})).is_none());
        assert!(Theme::from_value(&json!({"name": "Retro"})).is_some());
    }

    #[test]
    fn test_lenient_allocation_amounts() {
        let allocation: BudgetAllocation = serde_json::from_value(json!({
            "food": "₹45,000",
            "entertainment": 25000.4,
            "decorations": 30000,
            "total": "100000",
            "reasoning": "Balanced"
        }))
        .unwrap();

        assert_eq!(allocation.food, 45_000);
        assert_eq!(allocation.entertainment, 25_000);
        assert_eq!(allocation.category_sum(), 100_000);
        assert_eq!(allocation.total, 100_000);
    }

    #[test]
    fn test_missing_amounts_default_to_zero() {
        let allocation: BudgetAllocation =
            serde_json::from_value(json!({"food": 10})).unwrap();
        assert_eq!(allocation.entertainment, 0);
        assert_eq!(allocation.reasoning, "");
    }

    #[test]
    fn test_implausible_amount_is_rejected() {
        assert!(parse_amount(&json!(1e18)).is_err());
        assert!(parse_amount(&json!("lots")).is_err());
        assert!(parse_amount(&json!(true)).is_err());
    }

    #[test]
    fn test_product_item_accepts_numbers() {
        let item: ProductItem = serde_json::from_value(json!({
            "title": "LED Fairy Lights",
            "rating": 4.3,
            "price": null,
            "imageUrl": "https://example.com/a.jpg"
        }))
        .unwrap();
        assert_eq!(item.rating.as_deref(), Some("4.3"));
        assert_eq!(item.price, None);
        assert_eq!(item.image_url.as_deref(), Some("https://example.com/a.jpg"));
    }

    #[test]
    fn test_response_schema_is_inlined() {
        let schema = response_schema::<Vec<Theme>>().unwrap();
        let text = schema.to_string();
        assert!(!text.contains("$ref"));
        assert!(!text.contains("$schema"));
        assert!(text.contains("aesthetic"));
        assert_eq!(schema["type"], "array");
    }

    #[test]
    fn test_response_schema_skips_error_field() {
        let schema = response_schema::<BudgetAllocation>().unwrap();
        assert!(schema["properties"].get("error").is_none());
        assert!(schema["properties"].get("food").is_some());
    }
}
