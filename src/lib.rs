//! # Event Plan Builder
//!
//! A library for turning LLM suggestions into a complete event plan: a theme,
//! a budget split that always adds up, and a decoration shopping list.
//!
//! ## Core Concepts
//!
//! - **Theme Proposal**: the model suggests three themes; one is picked by 1-based index
//! - **Budget Allocation**: the total is split across food, entertainment and decorations
//! - **Reconciliation**: any rounding or arithmetic slip is absorbed by the largest category,
//!   so `food + entertainment + decorations == total` holds for every plan
//! - **Recovery**: model replies are read leniently (fenced JSON, Python-style lists,
//!   JSON buried in prose) without ever evaluating them
//! - **Soft Errors**: a failing stage records an `error` field instead of aborting the run
//!
//! ## Example
//!
//! ```rust,ignore
//! use event_plan_builder::*;
//!
//! let config = PlannerConfig::from_env().with_country("IN");
//! let planner = EventPlanner::from_config(config);
//!
//! let request = EventRequest::new("Birthday Party", 100_000, 100).with_diet_split(60, 40);
//! let proposal = planner.propose_themes(&request).await;
//! for (i, theme) in proposal.themes.iter().enumerate() {
//!     println!("{}. {}", i + 1, theme.name);
//! }
//!
//! let plan = planner.plan(request, &proposal, 1).await;
//! assert_eq!(
//!     plan.budget_allocation.category_sum(),
//!     plan.budget_allocation.total
//! );
//! println!("{}", PlanReport::from_plan(&plan).to_markdown());
//! ```

pub mod balancer;
pub mod config;
pub mod decorations;
pub mod error;
pub mod guidelines;
pub mod literal;
pub mod recovery;
pub mod report;
pub mod schema;
pub mod themes;

#[cfg(feature = "remote")]
pub mod llm;
#[cfg(feature = "remote")]
pub mod pipeline;
#[cfg(feature = "remote")]
pub mod products;

pub use balancer::{
    allocation_from_response, default_allocation, reconcile_allocation, verify_allocation,
    Adjustment, BudgetBalancer,
};
pub use config::PlannerConfig;
pub use decorations::{parse_keyword_plan, KeywordPlan, KeywordSuggestion};
pub use error::{EventPlanError, Result};
pub use guidelines::{AllocationGuidelines, PercentRange};
pub use literal::{parse_literal, LiteralError};
pub use recovery::{recover_json, ExpectedShape, Recovery, RecoveryStrategy};
pub use report::{extract_palette, BudgetLine, PlanReport};
pub use schema::*;
pub use themes::{parse_themes, select_theme, select_theme_or_placeholder, ThemeProposal};

#[cfg(feature = "remote")]
pub use llm::{GeminiClient, LlmRequest, TextGenerator};
#[cfg(feature = "remote")]
pub use pipeline::{EventPlanner, PlanningEvent};
#[cfg(feature = "remote")]
pub use products::{lookup_keywords, ProductCatalog, ProductQuery, RapidApiProductSearch};
