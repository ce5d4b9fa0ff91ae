//! Marketplace product search for decoration keywords.

use crate::config::PlannerConfig;
use crate::error::{EventPlanError, Result};
use crate::schema::{KeywordProducts, ProductItem};
use futures::future::{BoxFuture, FutureExt};
use log::{debug, info, warn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

/// One keyword search with its price cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub keyword: String,
    pub max_price: Option<i64>,
    pub country: String,
    pub page: u32,
}

impl ProductQuery {
    /// A non-positive per-item budget means no price filter is sent.
    pub fn new(keyword: impl Into<String>, amount_per_product: i64, country: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            max_price: (amount_per_product > 0).then_some(amount_per_product),
            country: country.into(),
            page: 1,
        }
    }

    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("query", self.keyword.clone()),
            ("page", self.page.to_string()),
            ("country", self.country.clone()),
            ("sort_by", "RELEVANCE".to_string()),
        ];
        if let Some(max_price) = self.max_price {
            params.push(("max_price", max_price.to_string()));
        }
        params.extend([
            ("product_condition", "ALL".to_string()),
            ("is_prime", "false".to_string()),
            ("deals_and_discounts", "NONE".to_string()),
        ]);
        params
    }
}

/// Anything that can answer a product query.
pub trait ProductCatalog: Send + Sync {
    fn search<'a>(&'a self, query: &'a ProductQuery) -> BoxFuture<'a, Result<Vec<ProductItem>>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    data: Option<SearchData>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchData {
    #[serde(default)]
    products: Vec<RawProduct>,
}

#[derive(Debug, Deserialize)]
struct RawProduct {
    #[serde(default)]
    product_title: Option<Value>,
    #[serde(default)]
    product_price: Option<Value>,
    #[serde(default)]
    product_url: Option<Value>,
    #[serde(default)]
    product_star_rating: Option<Value>,
    #[serde(default)]
    product_photo: Option<Value>,
}

impl From<RawProduct> for ProductItem {
    fn from(raw: RawProduct) -> Self {
        ProductItem {
            title: text_field(raw.product_title),
            price: text_field(raw.product_price),
            url: text_field(raw.product_url),
            rating: text_field(raw.product_star_rating),
            image_url: text_field(raw.product_photo),
        }
    }
}

fn text_field(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

impl SearchResponse {
    fn error_message(&self) -> String {
        match &self.error {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Object(map)) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
            Some(other) if !other.is_null() => other.to_string(),
            _ => self
                .message
                .clone()
                .unwrap_or_else(|| "Unknown error".to_string()),
        }
    }
}

/// Client for the RapidAPI real-time marketplace search endpoint.
#[derive(Clone)]
pub struct RapidApiProductSearch {
    client: Client,
    api_key: String,
    base_url: String,
    host: String,
}

impl RapidApiProductSearch {
    pub fn from_config(config: &PlannerConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.product_search_api_key.clone(),
            base_url: config.product_search_base_url.trim_end_matches('/').to_string(),
            host: config.product_search_host.clone(),
        }
    }

    pub async fn search_products(&self, query: &ProductQuery) -> Result<Vec<ProductItem>> {
        let url = format!("{}/search", self.base_url);

        let res = self
            .client
            .get(&url)
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", &self.host)
            .query(&query.query_params())
            .send()
            .await?;

        let status = res.status();
        let body_text = res.text().await?;

        let body: SearchResponse = serde_json::from_str(&body_text).map_err(|e| {
            EventPlanError::ProductSearch(format!(
                "Invalid response body (status {}): {}",
                status, e
            ))
        })?;

        if body.status.as_deref() != Some("OK") {
            let message = body.error_message();
            return Err(EventPlanError::ProductSearch(if status.is_success() {
                message
            } else {
                format!("status {}: {}", status, message)
            }));
        }

        let products = body.data.unwrap_or_default().products;
        debug!("'{}' returned {} products", query.keyword, products.len());

        Ok(products.into_iter().map(ProductItem::from).collect())
    }
}

impl ProductCatalog for RapidApiProductSearch {
    fn search<'a>(&'a self, query: &'a ProductQuery) -> BoxFuture<'a, Result<Vec<ProductItem>>> {
        self.search_products(query).boxed()
    }
}

/// Searches each keyword in turn, keeping at most `max_items` per keyword.
///
/// A failed keyword is recorded with an empty item list and its error; the
/// remaining keywords are still searched.
pub async fn lookup_keywords<C>(
    catalog: &C,
    keywords: &[String],
    amount_per_product: i64,
    country: &str,
    max_items: usize,
) -> Vec<KeywordProducts>
where
    C: ProductCatalog + ?Sized,
{
    let mut results = Vec::with_capacity(keywords.len());

    for keyword in keywords {
        let query = ProductQuery::new(keyword.clone(), amount_per_product, country);

        match catalog.search(&query).await {
            Ok(mut items) => {
                items.truncate(max_items);
                info!("Found {} products for '{}'", items.len(), keyword);
                results.push(KeywordProducts {
                    keyword: keyword.clone(),
                    items,
                    error: None,
                });
            }
            Err(e) => {
                warn!("Error fetching keyword '{}': {}", keyword, e);
                results.push(KeywordProducts {
                    keyword: keyword.clone(),
                    items: Vec::new(),
                    error: Some(e.to_string()),
                });
            }
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_params() {
        let query = ProductQuery::new("fairy lights", 1_000, "IN");
        let params = query.query_params();
        assert!(params.contains(&("query", "fairy lights".to_string())));
        assert!(params.contains(&("max_price", "1000".to_string())));
        assert!(params.contains(&("sort_by", "RELEVANCE".to_string())));
        assert!(params.contains(&("deals_and_discounts", "NONE".to_string())));
    }

    #[test]
    fn test_non_positive_budget_drops_price_filter() {
        let query = ProductQuery::new("balloons", -50, "IN");
        assert_eq!(query.max_price, None);
        assert!(query.query_params().iter().all(|(k, _)| *k != "max_price"));
    }

    #[test]
    fn test_error_message_shapes() {
        let as_string: SearchResponse =
            serde_json::from_str(r#"{"status": "ERROR", "error": "quota exceeded"}"#).unwrap();
        assert_eq!(as_string.error_message(), "quota exceeded");

        let as_object: SearchResponse = serde_json::from_str(
            r#"{"status": "ERROR", "error": {"message": "bad country", "code": 400}}"#,
        )
        .unwrap();
        assert_eq!(as_object.error_message(), "bad country");

        let bare: SearchResponse = serde_json::from_str(r#"{"message": "Invalid API key"}"#).unwrap();
        assert_eq!(bare.error_message(), "Invalid API key");

        let empty: SearchResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.error_message(), "Unknown error");
    }

    #[test]
    fn test_raw_product_projection() {
        let raw: RawProduct = serde_json::from_str(
            r#"{"product_title": "Warm White LED String", "product_price": "₹399", "product_star_rating": 4.2, "product_photo": ""}"#,
        )
        .unwrap();
        let item = ProductItem::from(raw);
        assert_eq!(item.title.as_deref(), Some("Warm White LED String"));
        assert_eq!(item.rating.as_deref(), Some("4.2"));
        assert_eq!(item.url, None);
        assert_eq!(item.image_url, None);
    }
}
