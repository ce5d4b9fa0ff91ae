use crate::literal::parse_literal;
use crate::recovery::{recover_json, ExpectedShape};
use crate::schema::{parse_amount, DecorationRecommendations, KeywordProducts};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const KEYWORDS_PER_PLAN: usize = 3;

/// Object form of the keyword reply, used as the response schema in JSON mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct KeywordSuggestion {
    #[schemars(description = "Exactly three short product search keywords")]
    pub keywords: Vec<String>,
    #[schemars(description = "Maximum price for each product")]
    pub amount_per_product: i64,
    #[schemars(description = "Total decorations budget")]
    pub total_amount: i64,
}

/// Search keywords and price cap derived from the decorations budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordPlan {
    pub keywords: Vec<String>,
    pub amount_per_product: i64,
    pub total_amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl KeywordPlan {
    pub fn failed(decorations_budget: i64, error: impl Into<String>) -> Self {
        Self {
            keywords: Vec::new(),
            amount_per_product: decorations_budget / KEYWORDS_PER_PLAN as i64,
            total_amount: decorations_budget,
            error: Some(error.into()),
        }
    }

    pub fn into_recommendations(self, products: Vec<KeywordProducts>) -> DecorationRecommendations {
        DecorationRecommendations {
            keywords: self.keywords,
            amount_per_product: self.amount_per_product,
            total_amount: self.total_amount,
            products,
            error: self.error,
        }
    }
}

/// Reads `["kw1", "kw2", "kw3", amount_per_product, total_amount]` (or the
/// [`KeywordSuggestion`] object form) out of a model reply.
///
/// Missing amounts fall back to an even split of `decorations_budget`.
pub fn parse_keyword_plan(text: &str, decorations_budget: i64) -> KeywordPlan {
    let recovery = recover_json(text, ExpectedShape::Array);
    let value = match recovery.error {
        None => recovery.value,
        Some(error) => match embedded_literal_list(text) {
            Some(value) => value,
            None => return KeywordPlan::failed(decorations_budget, error),
        },
    };

    let (mut keywords, amounts) = match &value {
        Value::Array(items) => split_list(items),
        Value::Object(map) => {
            let keywords = map
                .get("keywords")
                .and_then(Value::as_array)
                .map(|items| split_list(items).0)
                .unwrap_or_default();
            let amounts = ["amount_per_product", "total_amount"]
                .iter()
                .filter_map(|key| map.get(*key))
                .filter_map(|v| parse_amount(v).ok())
                .collect();
            (keywords, amounts)
        }
        _ => (Vec::new(), Vec::new()),
    };

    keywords.truncate(KEYWORDS_PER_PLAN);
    debug!("Decoration keywords: {:?}, amounts: {:?}", keywords, amounts);

    if keywords.is_empty() {
        return KeywordPlan::failed(decorations_budget, "No decoration keywords in model output");
    }

    let even_split = decorations_budget / keywords.len() as i64;
    KeywordPlan {
        amount_per_product: amounts.first().copied().unwrap_or(even_split),
        total_amount: amounts.get(1).copied().unwrap_or(decorations_budget),
        keywords,
        error: None,
    }
}

/// A Python-style list somewhere inside prose or a non-JSON fence, such as
/// ```` ```python\n['a', 'b', 1000]\n``` ````.
fn embedded_literal_list(text: &str) -> Option<Value> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end <= start {
        return None;
    }
    match parse_literal(&text[start..=end]) {
        Ok(value @ Value::Array(_)) => {
            debug!("Read keyword list as a Python literal");
            Some(value)
        }
        _ => None,
    }
}

fn split_list(items: &[Value]) -> (Vec<String>, Vec<i64>) {
    let mut keywords = Vec::new();
    let mut amounts = Vec::new();

    for item in items {
        match item {
            Value::String(s) if !s.trim().is_empty() => keywords.push(s.trim().to_string()),
            Value::Number(_) => {
                if let Ok(amount) = parse_amount(item) {
                    amounts.push(amount);
                }
            }
            _ => {}
        }
    }

    (keywords, amounts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_fenced_list() {
        let text = "```python\n[\"fairy lights\", \"flower garland\", \"photo backdrop\", 10000, 30000]\n```";
        let plan = parse_keyword_plan(text, 30_000);
        assert_eq!(plan.keywords, vec!["fairy lights", "flower garland", "photo backdrop"]);
        assert_eq!(plan.amount_per_product, 10_000);
        assert_eq!(plan.total_amount, 30_000);
        assert!(plan.error.is_none());
    }

    #[test]
    fn test_single_quoted_list_in_python_fence() {
        let text = "Here are my picks:\n```python\n['fairy lights', 'balloons', 'banner', 1000, 3000]\n```";
        let plan = parse_keyword_plan(text, 3_000);
        assert!(plan.error.is_none());
        assert_eq!(plan.keywords, vec!["fairy lights", "balloons", "banner"]);
        assert_eq!(plan.amount_per_product, 1_000);
        assert_eq!(plan.total_amount, 3_000);

        let untagged = parse_keyword_plan("```\n['drapes', 'candles']\n```", 2_000);
        assert_eq!(untagged.keywords, vec!["drapes", "candles"]);
        assert_eq!(untagged.amount_per_product, 1_000);
    }

    #[test]
    fn test_single_quoted_list() {
        let plan = parse_keyword_plan("['balloons', 'banner', 'table confetti', 500.0, 1500]", 1_500);
        assert_eq!(plan.keywords.len(), 3);
        assert_eq!(plan.amount_per_product, 500);
    }

    #[test]
    fn test_object_form() {
        let text = r#"{"keywords": ["lanterns", "drapes"], "amount_per_product": "₹2,000", "total_amount": 6000}"#;
        let plan = parse_keyword_plan(text, 6_000);
        assert_eq!(plan.keywords, vec!["lanterns", "drapes"]);
        assert_eq!(plan.amount_per_product, 2_000);
        assert_eq!(plan.total_amount, 6_000);
    }

    #[test]
    fn test_missing_amounts_split_evenly() {
        let plan = parse_keyword_plan(r#"["a", "b", "c", "d"]"#, 9_000);
        assert_eq!(plan.keywords, vec!["a", "b", "c"]);
        assert_eq!(plan.amount_per_product, 3_000);
        assert_eq!(plan.total_amount, 9_000);
    }

    #[test]
    fn test_unparseable_reply() {
        let plan = parse_keyword_plan("I suggest fairy lights.", 9_000);
        assert!(plan.keywords.is_empty());
        assert!(plan.error.is_some());
        assert_eq!(plan.total_amount, 9_000);

        let no_keywords = parse_keyword_plan("[100, 200]", 9_000);
        assert_eq!(
            no_keywords.error.as_deref(),
            Some("No decoration keywords in model output")
        );
    }
}
