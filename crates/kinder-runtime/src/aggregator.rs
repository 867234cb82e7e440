//! Concurrent fan-out over a fetch plan.
//!
//! Every task in a plan runs concurrently, each under its own retry budget.
//! The aggregator waits for all of them to settle and assembles a
//! [`CompositeResult`]. It never fails: a section that exhausts its retries
//! becomes an empty list plus a [`FailureReport`] handed to the
//! [`FailureSink`].
//!
//! Total latency is bounded by the slowest section's retry envelope, not
//! the sum over sections.

use futures::future::join_all;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use kinder_core::{CompositeResult, FailureReport, FetchOutcome};

use crate::resilience::run_with_retries;
use crate::sink::{FailureSink, TracingSink};
use crate::source::SourceError;
use crate::task::{FetchPlan, FetchTask};

/// Runs fetch plans.
///
/// Holds no per-request state; one instance can serve any number of
/// concurrent aggregations.
#[derive(Clone)]
pub struct Aggregator {
    sink: Arc<dyn FailureSink>,

    /// Cap on one section's whole retry envelope
    deadline: Option<Duration>,
}

impl Aggregator {
    /// Aggregator logging failures via `tracing`, with no deadline.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> AggregatorBuilder {
        AggregatorBuilder::default()
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Run every task in `plan` concurrently and collect the outcomes.
    ///
    /// The result has exactly one entry per task.
    pub async fn aggregate<R: Send + 'static>(&self, plan: FetchPlan<R>) -> CompositeResult<R> {
        let started = Instant::now();
        let tasks = plan.into_tasks();
        let requested = tasks.len();

        // Fan-out: all sections settle concurrently on this task
        let settled = join_all(tasks.into_iter().map(|task| self.settle(task))).await;

        // Fan-in
        let mut composite = CompositeResult::new();
        for (name, outcome) in settled {
            composite.insert(name, outcome);
        }
        debug_assert_eq!(composite.len(), requested);

        tracing::info!(
            sections = composite.len(),
            degraded = composite.failures().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Composite view assembled"
        );

        composite
    }

    /// Run a single task under its retry policy.
    pub async fn fetch_one<R: Send + 'static>(&self, task: FetchTask<R>) -> FetchOutcome<R> {
        self.settle(task).await.1
    }

    async fn settle<R: Send + 'static>(&self, task: FetchTask<R>) -> (String, FetchOutcome<R>) {
        let name = task.name().to_string();

        // Counted outside the retry loop so a deadline still reports attempts
        let attempts = AtomicU32::new(0);
        let run = run_with_retries(&name, task.policy(), || {
            attempts.fetch_add(1, Ordering::Relaxed);
            task.call()
        });

        let result = match self.deadline {
            Some(deadline) => match tokio::time::timeout(deadline, run).await {
                Ok(report) => report.result,
                Err(_) => Err(SourceError::DeadlineElapsed(deadline)),
            },
            None => run.await.result,
        };
        let attempts = attempts.load(Ordering::Relaxed);

        let outcome = match result {
            Ok(records) => FetchOutcome::Succeeded { records, attempts },
            Err(error) => {
                let report = FailureReport::new(name.clone(), &error, attempts);
                self.sink.record(&report);
                FetchOutcome::Exhausted(report)
            }
        };

        (name, outcome)
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Aggregator`].
#[derive(Default)]
pub struct AggregatorBuilder {
    sink: Option<Arc<dyn FailureSink>>,
    deadline: Option<Duration>,
}

impl AggregatorBuilder {
    /// Where failure reports go (default: [`TracingSink`]).
    pub fn sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Give up on a section once its retries have run this long.
    pub fn deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn build(self) -> Aggregator {
        Aggregator {
            sink: self.sink.unwrap_or_else(|| Arc::new(TracingSink)),
            deadline: self.deadline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::RetryPolicy;
    use crate::sink::MemorySink;
    use crate::source::{DataSource, FlakySource, InMemorySource};
    use chrono::Utc;
    use kinder_core::{Collection, Record};
    use proptest::prelude::*;

    const FIXTURES: &str = r#"{
        "news": [
            { "id": "n1", "title": "Autumn newsletter", "published_at": "2026-09-28T08:00:00Z" }
        ],
        "events": [
            { "id": "e1", "title": "Lantern walk", "starts_at": "2099-11-11T17:00:00Z" }
        ],
        "notices": [
            { "id": "x1", "title": "Flu season", "body": "Keep sick children home.", "published_at": "2026-09-30T08:00:00Z" }
        ]
    }"#;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(500))
    }

    fn assert_near(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(10),
            "expected ~{:?}, got {:?}",
            expected,
            actual
        );
    }

    fn always_failing(name: &str, counter: Arc<AtomicU32>) -> FetchTask<u32> {
        FetchTask::new(name, policy(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(SourceError::Unavailable("backend down".into())) }
        })
    }

    fn instant(name: &str, records: Vec<u32>) -> FetchTask<u32> {
        FetchTask::new(name, policy(), move || {
            let records = records.clone();
            async move { Ok(records) }
        })
    }

    fn section_task<S: DataSource + 'static>(
        source: &Arc<S>,
        name: &str,
        collection: Collection,
    ) -> FetchTask<Record> {
        FetchTask::from_source(name, Arc::clone(source), collection, 5, policy())
    }

    #[tokio::test(start_paused = true)]
    async fn test_degrades_one_section_and_keeps_the_rest() {
        let sink = Arc::new(MemorySink::new());
        let aggregator = Aggregator::builder().sink(sink.clone()).build();
        let source = Arc::new(
            FlakySource::new(InMemorySource::from_json(FIXTURES).unwrap())
                .fail_always(Collection::News)
                .fail_first(Collection::Events, 1),
        );

        let plan = FetchPlan::builder()
            .task(section_task(&source, "news", Collection::News))
            .task(section_task(&source, "events", Collection::Events))
            .task(section_task(&source, "notices", Collection::Notices))
            .build()
            .unwrap();

        let before = Utc::now();
        let result = aggregator.aggregate(plan).await;
        let after = Utc::now();

        assert_eq!(result.len(), 3);
        assert!(result.contains("news"));
        assert!(result.section("news").is_empty());
        assert_eq!(result.section("events")[0].id(), "e1");
        assert_eq!(result.section("notices")[0].id(), "x1");

        assert_eq!(source.calls(Collection::News), 3);
        assert_eq!(source.calls(Collection::Events), 2);
        assert_eq!(source.calls(Collection::Notices), 1);

        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].section, "news");
        assert_eq!(reports[0].attempts, 3);
        assert!(reports[0].error.contains("simulated outage"));
        assert!(before <= reports[0].at && reports[0].at <= after);
        assert_eq!(result.failures(), reports.as_slice());
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_bounded_by_slowest_section() {
        let aggregator = Aggregator::builder()
            .sink(Arc::new(MemorySink::new()))
            .build();
        let counter = Arc::new(AtomicU32::new(0));

        let plan = FetchPlan::builder()
            .task(always_failing("news", counter.clone()))
            .task(instant("teachers", vec![1, 2]))
            .task(instant("events", vec![3]))
            .build()
            .unwrap();

        let start = Instant::now();
        let result = aggregator.aggregate(plan).await;

        // 500ms + 1000ms of backoff for the failing section, run alongside the rest
        assert_near(start.elapsed(), Duration::from_millis(1500));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(result.section("teachers"), &[1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_failing_sections_wait_concurrently() {
        let aggregator = Aggregator::builder()
            .sink(Arc::new(MemorySink::new()))
            .build();
        let counter = Arc::new(AtomicU32::new(0));

        let mut builder = FetchPlan::builder();
        for name in ["news", "events", "notices", "teachers"] {
            builder = builder.task(always_failing(name, counter.clone()));
        }

        let start = Instant::now();
        let result = aggregator.aggregate(builder.build().unwrap()).await;

        assert_near(start.elapsed(), Duration::from_millis(1500));
        assert_eq!(counter.load(Ordering::SeqCst), 12);
        assert_eq!(result.len(), 4);
        assert_eq!(result.failures().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_plan_yields_empty_result() {
        let result = Aggregator::new()
            .aggregate(FetchPlan::<u32>::builder().build().unwrap())
            .await;
        assert!(result.is_empty());
        assert!(!result.is_degraded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cuts_retry_envelope_short() {
        let sink = Arc::new(MemorySink::new());
        let aggregator = Aggregator::builder()
            .sink(sink.clone())
            .deadline(Some(Duration::from_millis(700)))
            .build();
        let counter = Arc::new(AtomicU32::new(0));

        let start = Instant::now();
        let outcome = aggregator
            .fetch_one(always_failing("gallery", counter.clone()))
            .await;

        assert_near(start.elapsed(), Duration::from_millis(700));
        assert!(outcome.is_exhausted());
        // Attempt 1 at 0ms, attempt 2 at 500ms, attempt 3 would start at 1500ms
        assert_eq!(outcome.attempts(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].error.contains("Deadline"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_one_reports_recovery_attempts() {
        let source = Arc::new(
            FlakySource::new(InMemorySource::from_json(FIXTURES).unwrap())
                .fail_first(Collection::Notices, 2),
        );
        let sink = Arc::new(MemorySink::new());
        let aggregator = Aggregator::builder().sink(sink.clone()).build();

        let outcome = aggregator
            .fetch_one(section_task(&source, "notices", Collection::Notices))
            .await;

        assert!(!outcome.is_exhausted());
        assert_eq!(outcome.attempts(), 3);
        assert_eq!(outcome.into_records().len(), 1);
        assert!(sink.is_empty());
    }

    fn paused_runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap()
    }

    /// `None` fails every attempt; `Some(k)` succeeds on attempt `k`.
    fn scripted(name: String, succeed_on: Option<u32>, value: u32) -> FetchTask<u32> {
        let calls = Arc::new(AtomicU32::new(0));
        FetchTask::new(name, policy(), move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                match succeed_on {
                    Some(k) if n >= k => Ok(vec![value]),
                    _ => Err(SourceError::Unavailable(format!("attempt {}", n))),
                }
            }
        })
    }

    proptest! {
        #[test]
        fn prop_result_is_fully_keyed(script in prop::collection::vec(prop::option::of(1u32..=3), 0..7)) {
            let runtime = paused_runtime();
            let sink = Arc::new(MemorySink::new());
            let aggregator = Aggregator::builder().sink(sink.clone()).build();

            let mut builder = FetchPlan::builder();
            for (i, succeed_on) in script.iter().enumerate() {
                builder = builder.task(scripted(format!("s{}", i), *succeed_on, i as u32));
            }
            let result = runtime.block_on(aggregator.aggregate(builder.build().unwrap()));

            prop_assert_eq!(result.len(), script.len());
            for (i, succeed_on) in script.iter().enumerate() {
                let name = format!("s{}", i);
                prop_assert!(result.contains(&name));
                match succeed_on {
                    Some(_) => prop_assert_eq!(result.section(&name), &[i as u32]),
                    None => prop_assert!(result.section(&name).is_empty()),
                }
            }

            let expected_failures = script.iter().filter(|s| s.is_none()).count();
            prop_assert_eq!(result.failures().len(), expected_failures);
            prop_assert_eq!(sink.len(), expected_failures);
            for report in result.failures() {
                prop_assert_eq!(report.attempts, 3);
                prop_assert_eq!(report.error.as_str(), "Collection unavailable: attempt 3");
            }
        }
    }
}
