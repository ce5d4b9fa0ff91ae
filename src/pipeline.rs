//! The three planning stages and the orchestrator that threads them together.
//!
//! Every stage absorbs its own failures: a failed LLM call or an unreadable
//! reply becomes an `error` field on that stage's output and the run goes on.

use crate::balancer::{allocation_from_response, default_allocation, verify_allocation};
use crate::config::PlannerConfig;
use crate::decorations::{parse_keyword_plan, KeywordPlan, KeywordSuggestion};
use crate::error::Result;
use crate::guidelines::AllocationGuidelines;
use crate::llm::prompts::{budget_prompt, decoration_prompt, theme_prompt};
use crate::llm::{GeminiClient, LlmRequest, TextGenerator};
use crate::products::{lookup_keywords, ProductCatalog, RapidApiProductSearch};
use crate::schema::{
    response_schema, BudgetAllocation, DecorationRecommendations, EventDetails, EventPlan,
    EventRequest, Theme,
};
use crate::themes::ThemeProposal;
use chrono::Utc;
use log::{debug, info, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc::Sender;

/// Progress notifications emitted while a plan is being built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlanningEvent {
    ThemesProposed { count: usize },
    ThemeSelected { name: String, placeholder: bool },
    BudgetAllocated { food: i64, entertainment: i64, decorations: i64, total: i64 },
    KeywordsChosen { keywords: Vec<String>, amount_per_product: i64 },
    ProductsFetched { keyword: String, items: usize, error: Option<String> },
    Completed { errors: usize },
}

async fn notify(progress: Option<&Sender<PlanningEvent>>, event: PlanningEvent) {
    if let Some(tx) = progress {
        // A dropped receiver only means nobody is listening.
        if tx.send(event).await.is_err() {
            debug!("Progress receiver dropped");
        }
    }
}

pub struct EventPlanner<G, C> {
    generator: G,
    catalog: C,
    config: PlannerConfig,
}

impl EventPlanner<GeminiClient, RapidApiProductSearch> {
    /// Planner backed by Gemini and the RapidAPI marketplace search.
    pub fn from_config(config: PlannerConfig) -> Self {
        let generator = GeminiClient::from_config(&config);
        let catalog = RapidApiProductSearch::from_config(&config);
        Self::new(generator, catalog, config)
    }
}

impl<G, C> EventPlanner<G, C>
where
    G: TextGenerator,
    C: ProductCatalog,
{
    pub fn new(generator: G, catalog: C, config: PlannerConfig) -> Self {
        Self {
            generator,
            catalog,
            config,
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    fn schema_for<T: JsonSchema>(&self) -> Option<Value> {
        if !self.config.structured_output {
            return None;
        }
        match response_schema::<T>() {
            Ok(schema) => Some(schema),
            Err(e) => {
                warn!("Could not build response schema, sending free-form prompt: {}", e);
                None
            }
        }
    }

    async fn ask(&self, prompt: String, schema: Option<Value>) -> Result<String> {
        let request = LlmRequest::new(prompt).with_response_schema(schema);
        self.generator.generate(&request).await
    }

    /// Stage 1: asks for three candidate themes.
    pub async fn propose_themes(&self, request: &EventRequest) -> ThemeProposal {
        info!(
            "Proposing themes for {} ({} {})",
            request.event_type, request.total_budget, request.currency
        );

        match self
            .ask(theme_prompt(request), self.schema_for::<Vec<Theme>>())
            .await
        {
            Ok(text) => {
                let proposal = ThemeProposal::from_response(text);
                info!("Model proposed {} themes", proposal.themes.len());
                proposal
            }
            Err(e) => {
                warn!("Theme generation failed: {}", e);
                ThemeProposal::failed(e.to_string())
            }
        }
    }

    /// Stage 2: splits the total budget. The result always balances.
    pub async fn allocate_budget(&self, details: &EventDetails) -> BudgetAllocation {
        let total = details.request.budget_total();
        let guidelines = AllocationGuidelines::for_kind(details.request.kind());

        let allocation = match self
            .ask(
                budget_prompt(details, &guidelines),
                self.schema_for::<BudgetAllocation>(),
            )
            .await
        {
            Ok(text) => allocation_from_response(&text, total),
            Err(e) => {
                warn!("Budget allocation request failed: {}", e);
                let mut fallback = default_allocation(total);
                fallback.error = Some(e.to_string());
                fallback
            }
        };

        if let Err(e) = verify_allocation(&allocation) {
            warn!("{}", e);
        }

        info!(
            "Budget allocated: food {}, entertainment {}, decorations {} (total {})",
            allocation.food, allocation.entertainment, allocation.decorations, allocation.total
        );

        allocation
    }

    /// Stage 3: keywords from the model, then one product search per keyword.
    pub async fn recommend_decorations(
        &self,
        details: &EventDetails,
        allocation: &BudgetAllocation,
    ) -> DecorationRecommendations {
        self.recommend_decorations_with_progress(details, allocation, None)
            .await
    }

    async fn recommend_decorations_with_progress(
        &self,
        details: &EventDetails,
        allocation: &BudgetAllocation,
        progress: Option<&Sender<PlanningEvent>>,
    ) -> DecorationRecommendations {
        let budget = allocation.decorations;

        let keyword_plan = match self
            .ask(
                decoration_prompt(details, budget),
                self.schema_for::<KeywordSuggestion>(),
            )
            .await
        {
            Ok(text) => parse_keyword_plan(&text, budget),
            Err(e) => {
                warn!("Decoration keyword request failed: {}", e);
                KeywordPlan::failed(budget, e.to_string())
            }
        };

        if keyword_plan.error.is_some() {
            return keyword_plan.into_recommendations(Vec::new());
        }

        notify(
            progress,
            PlanningEvent::KeywordsChosen {
                keywords: keyword_plan.keywords.clone(),
                amount_per_product: keyword_plan.amount_per_product,
            },
        )
        .await;

        let products = lookup_keywords(
            &self.catalog,
            &keyword_plan.keywords,
            keyword_plan.amount_per_product,
            &self.config.country,
            self.config.max_items_per_keyword,
        )
        .await;

        for entry in &products {
            notify(
                progress,
                PlanningEvent::ProductsFetched {
                    keyword: entry.keyword.clone(),
                    items: entry.items.len(),
                    error: entry.error.clone(),
                },
            )
            .await;
        }

        keyword_plan.into_recommendations(products)
    }

    /// Builds a plan around the theme at the 1-based `theme_index` of
    /// `proposal.themes`, the same numbering shown to the user.
    ///
    /// An index outside that list is replaced by [`Theme::placeholder`].
    pub async fn plan(
        &self,
        request: EventRequest,
        proposal: &ThemeProposal,
        theme_index: usize,
    ) -> EventPlan {
        self.plan_with_progress(request, proposal, theme_index, None)
            .await
    }

    pub async fn plan_with_progress(
        &self,
        request: EventRequest,
        proposal: &ThemeProposal,
        theme_index: usize,
        progress: Option<&Sender<PlanningEvent>>,
    ) -> EventPlan {
        let theme = proposal.select(theme_index).unwrap_or_else(|| {
            warn!(
                "Theme #{} is not one of the {} proposed themes",
                theme_index,
                proposal.themes.len()
            );
            Theme::placeholder()
        });
        notify(
            progress,
            PlanningEvent::ThemeSelected {
                name: theme.name.clone(),
                placeholder: theme.is_placeholder(),
            },
        )
        .await;

        let event_details = EventDetails { request, theme };

        let budget_allocation = self.allocate_budget(&event_details).await;
        notify(
            progress,
            PlanningEvent::BudgetAllocated {
                food: budget_allocation.food,
                entertainment: budget_allocation.entertainment,
                decorations: budget_allocation.decorations,
                total: budget_allocation.total,
            },
        )
        .await;

        let decoration_recommendations = self
            .recommend_decorations_with_progress(&event_details, &budget_allocation, progress)
            .await;

        let plan = EventPlan {
            event_details,
            budget_allocation,
            decoration_recommendations,
            generated_at: Utc::now(),
        };

        let errors = plan.errors();
        if !errors.is_empty() {
            for error in &errors {
                debug!("Plan issue: {}", error);
            }
        }
        notify(progress, PlanningEvent::Completed { errors: errors.len() }).await;

        plan
    }

    /// Proposes themes and plans around the one at `theme_index` in a single call.
    pub async fn run(&self, request: EventRequest, theme_index: usize) -> EventPlan {
        self.run_with_progress(request, theme_index, None).await
    }

    pub async fn run_with_progress(
        &self,
        request: EventRequest,
        theme_index: usize,
        progress: Option<&Sender<PlanningEvent>>,
    ) -> EventPlan {
        let proposal = self.propose_themes(&request).await;
        notify(
            progress,
            PlanningEvent::ThemesProposed {
                count: proposal.themes.len(),
            },
        )
        .await;

        self.plan_with_progress(request, &proposal, theme_index, progress)
            .await
    }
}
