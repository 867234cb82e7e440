//! The homepage: one resilient composite read over the content backend.

use std::sync::Arc;

use kinder_core::{AggregationConfig, CompositeResult, ConfigError, FetchOutcome, HomepageView, Record};

use crate::aggregator::Aggregator;
use crate::resilience::RetryPolicy;
use crate::sink::FailureSink;
use crate::source::DataSource;
use crate::task::{FetchPlan, FetchTask, PlanError};

/// Builds homepage views from a [`DataSource`].
///
/// Stateless between requests: every [`load`](Self::load) builds a fresh
/// plan and nothing is cached.
pub struct HomepageService<S: DataSource + ?Sized> {
    source: Arc<S>,
    config: AggregationConfig,
    aggregator: Aggregator,
}

impl<S: DataSource + ?Sized + 'static> HomepageService<S> {
    /// Service with the default homepage sections.
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            config: AggregationConfig::homepage(),
            aggregator: Aggregator::new(),
        }
    }

    /// Service with custom sections. The config's deadline applies to every
    /// section.
    pub fn with_config(source: Arc<S>, config: AggregationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let aggregator = Aggregator::builder()
            .deadline(config.defaults.deadline)
            .build();

        Ok(Self {
            source,
            config,
            aggregator,
        })
    }

    /// Send failure reports to `sink` instead of the log.
    pub fn with_sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
        self.aggregator = Aggregator::builder()
            .sink(sink)
            .deadline(self.config.defaults.deadline)
            .build();
        self
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// One task per configured section.
    pub fn plan(&self) -> Result<FetchPlan<Record>, PlanError> {
        self.config
            .sections
            .iter()
            .fold(FetchPlan::builder(), |builder, section| {
                builder.task(FetchTask::from_source(
                    section.name.clone(),
                    Arc::clone(&self.source),
                    section.collection,
                    section.limit,
                    RetryPolicy::for_section(section, &self.config.defaults),
                ))
            })
            .build()
    }

    /// Fetch every section and return the raw composite.
    pub async fn composite(&self) -> Result<CompositeResult<Record>, PlanError> {
        let plan = self.plan()?;
        tracing::debug!(
            source = self.source.name(),
            sections = plan.len(),
            "Loading composite view"
        );
        Ok(self.aggregator.aggregate(plan).await)
    }

    /// Fetch every section and build the typed homepage view.
    pub async fn load(&self) -> Result<HomepageView, PlanError> {
        Ok(HomepageView::from_composite(self.composite().await?))
    }

    /// Fetch a single configured section. `None` if no section has that name.
    pub async fn fetch_section(&self, name: &str) -> Option<FetchOutcome<Record>> {
        let section = self.config.section(name)?;
        let task = FetchTask::from_source(
            section.name.clone(),
            Arc::clone(&self.source),
            section.collection,
            section.limit,
            RetryPolicy::for_section(section, &self.config.defaults),
        );
        Some(self.aggregator.fetch_one(task).await)
    }
}
