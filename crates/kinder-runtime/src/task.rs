//! Fetch tasks and plans.
//!
//! A [`FetchTask`] is one named, retryable read. A [`FetchPlan`] is the set
//! of tasks behind one composite view. Both are built per request and
//! discarded after the aggregation.

use futures::future::{BoxFuture, FutureExt};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

use kinder_core::{is_valid_section_name, Collection, Record};

use crate::resilience::RetryPolicy;
use crate::source::{DataSource, SourceError};

/// Future returned by one fetch attempt.
pub type FetchFuture<R> = BoxFuture<'static, Result<Vec<R>, SourceError>>;

/// Malformed plans. These are programming errors, not runtime conditions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Duplicate section name: {0}")]
    DuplicateSection(String),

    #[error("Invalid section name: '{0}'")]
    InvalidSectionName(String),

    #[error("Section '{0}' has a zero attempt budget")]
    ZeroAttempts(String),
}

/// One named, retryable read producing a sequence of records.
pub struct FetchTask<R> {
    name: String,
    operation: Box<dyn Fn() -> FetchFuture<R> + Send + Sync>,
    policy: RetryPolicy,
}

impl<R: Send + 'static> FetchTask<R> {
    /// Create a task from any idempotent async read.
    pub fn new<F, Fut>(name: impl Into<String>, policy: RetryPolicy, operation: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<R>, SourceError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            operation: Box::new(move || operation().boxed()),
            policy,
        }
    }

    /// Section name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Start one attempt.
    pub(crate) fn call(&self) -> FetchFuture<R> {
        (self.operation)()
    }
}

impl FetchTask<Record> {
    /// Task reading `limit` records of `collection` from `source`.
    pub fn from_source<S>(
        name: impl Into<String>,
        source: Arc<S>,
        collection: Collection,
        limit: usize,
        policy: RetryPolicy,
    ) -> Self
    where
        S: DataSource + ?Sized + 'static,
    {
        Self::new(name, policy, move || {
            let source = Arc::clone(&source);
            async move { source.fetch(collection, limit).await }
        })
    }
}

impl<R> fmt::Debug for FetchTask<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchTask")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// The validated task set behind one composite view.
#[derive(Debug)]
pub struct FetchPlan<R> {
    tasks: Vec<FetchTask<R>>,
}

impl<R> FetchPlan<R> {
    pub fn builder() -> FetchPlanBuilder<R> {
        FetchPlanBuilder::new()
    }

    /// Number of sections.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Section names in plan order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.name.as_str())
    }

    pub(crate) fn into_tasks(self) -> Vec<FetchTask<R>> {
        self.tasks
    }
}

/// Builder for [`FetchPlan`].
pub struct FetchPlanBuilder<R> {
    tasks: Vec<FetchTask<R>>,
}

impl<R> FetchPlanBuilder<R> {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Add a section.
    pub fn task(mut self, task: FetchTask<R>) -> Self {
        self.tasks.push(task);
        self
    }

    /// Validate section names and build the plan.
    pub fn build(self) -> Result<FetchPlan<R>, PlanError> {
        let mut seen = HashSet::new();
        for task in &self.tasks {
            if !is_valid_section_name(&task.name) {
                return Err(PlanError::InvalidSectionName(task.name.clone()));
            }
            if !seen.insert(task.name.as_str()) {
                return Err(PlanError::DuplicateSection(task.name.clone()));
            }
            if task.policy.max_attempts == 0 {
                return Err(PlanError::ZeroAttempts(task.name.clone()));
            }
        }

        Ok(FetchPlan { tasks: self.tasks })
    }
}

impl<R> Default for FetchPlanBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}
