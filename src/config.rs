use crate::error::{EventPlanError, Result};
use serde::{Deserialize, Serialize};
use std::env;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const PRODUCT_SEARCH_HOST: &str = "real-time-amazon-data.p.rapidapi.com";

/// Everything the planning stages need from the outside world.
///
/// Built once and handed to each client at construction; nothing reads the
/// environment after [`PlannerConfig::from_env`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub llm_api_key: String,
    pub product_search_api_key: String,
    pub model: String,
    pub temperature: f32,
    pub llm_base_url: String,
    pub product_search_base_url: String,
    pub product_search_host: String,
    /// Marketplace country code sent with every product query.
    pub country: String,
    pub max_items_per_keyword: usize,
    /// Ask the model for JSON output constrained by a response schema.
    pub structured_output: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            product_search_api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.2,
            llm_base_url: GEMINI_BASE_URL.to_string(),
            product_search_base_url: format!("https://{}", PRODUCT_SEARCH_HOST),
            product_search_host: PRODUCT_SEARCH_HOST.to_string(),
            country: "IN".to_string(),
            max_items_per_keyword: 5,
            structured_output: false,
        }
    }
}

impl PlannerConfig {
    pub fn new(llm_api_key: impl Into<String>, product_search_api_key: impl Into<String>) -> Self {
        Self {
            llm_api_key: llm_api_key.into(),
            product_search_api_key: product_search_api_key.into(),
            ..Self::default()
        }
    }

    /// Reads `GOOGLE_API_KEY` and `RAPIDAPI_KEY`, plus the optional
    /// `EVENT_PLANNER_MODEL` and `EVENT_PLANNER_COUNTRY` overrides.
    ///
    /// Missing keys are left empty and only surface when the first request is rejected.
    pub fn from_env() -> Self {
        let mut config = Self::new(
            env::var("GOOGLE_API_KEY").unwrap_or_default(),
            env::var("RAPIDAPI_KEY").unwrap_or_default(),
        );
        if let Ok(model) = env::var("EVENT_PLANNER_MODEL") {
            config.model = model;
        }
        if let Ok(country) = env::var("EVENT_PLANNER_COUNTRY") {
            config.country = country;
        }
        config
    }

    /// Like [`PlannerConfig::from_env`] but fails when either API key is unset or blank.
    pub fn from_env_required() -> Result<Self> {
        let config = Self::from_env();
        config.require_keys()?;
        Ok(config)
    }

    pub fn require_keys(&self) -> Result<()> {
        for (name, value) in [
            ("GOOGLE_API_KEY", &self.llm_api_key),
            ("RAPIDAPI_KEY", &self.product_search_api_key),
        ] {
            if value.trim().is_empty() {
                return Err(EventPlanError::Config(format!("{} is not set", name)));
            }
        }
        Ok(())
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_llm_base_url(mut self, url: impl Into<String>) -> Self {
        self.llm_base_url = url.into();
        self
    }

    pub fn with_product_search_base_url(mut self, url: impl Into<String>) -> Self {
        self.product_search_base_url = url.into();
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    pub fn with_max_items_per_keyword(mut self, max_items: usize) -> Self {
        self.max_items_per_keyword = max_items;
        self
    }

    pub fn with_structured_output(mut self, enabled: bool) -> Self {
        self.structured_output = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlannerConfig::new("llm", "search");
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.country, "IN");
        assert_eq!(config.max_items_per_keyword, 5);
        assert_eq!(
            config.product_search_base_url,
            "https://real-time-amazon-data.p.rapidapi.com"
        );
        assert!(!config.structured_output);
    }

    #[test]
    fn test_builder_overrides() {
        let config = PlannerConfig::new("a", "b")
            .with_model("gemini-2.5-flash")
            .with_country("US")
            .with_max_items_per_keyword(3)
            .with_structured_output(true);
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.country, "US");
        assert_eq!(config.max_items_per_keyword, 3);
        assert!(config.structured_output);
    }

    #[test]
    fn test_require_keys() {
        assert!(PlannerConfig::new("llm", "search").require_keys().is_ok());

        let err = PlannerConfig::new("llm", "  ").require_keys().unwrap_err();
        assert!(err.to_string().contains("RAPIDAPI_KEY"));
    }
}
