use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use reldigest_core::error::{DigestError, Result};
use reldigest_core::types::{InvocationId, StepId};

use crate::context::RunContext;
use crate::graph::CommittedGraph;
use crate::step::{StepContext, StepDefinition};

/// Final output of one workflow run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub invocation_id: InvocationId,
    /// The terminal step's result.
    pub output: String,
    /// Every step's result, keyed by step id.
    pub results: BTreeMap<StepId, String>,
    pub total_elapsed_ms: u64,
}

/// Executes a committed graph level by level.
///
/// All steps of a level start concurrently; the level barrier waits for
/// every one of them to settle (success or failure) before the next level
/// is scheduled. Any step failure fails the run: downstream steps,
/// including aggregation, never execute over a partial result set.
pub struct WorkflowRunner {
    graph: Arc<CommittedGraph>,
    step_timeout: Duration,
    cancel: CancellationToken,
}

impl WorkflowRunner {
    pub fn new(graph: Arc<CommittedGraph>) -> Self {
        Self {
            graph,
            step_timeout: Duration::from_secs(120),
            cancel: CancellationToken::new(),
        }
    }

    /// Bound each step's external call so an unresponsive capability cannot
    /// block the level barrier indefinitely.
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the workflow once. `invocation` defaults to an id derived from
    /// today's calendar date.
    pub async fn run(&self, invocation: Option<InvocationId>) -> Result<RunReport> {
        let invocation_id = invocation.unwrap_or_else(InvocationId::for_today);
        let start = Instant::now();

        info!(
            workflow = %self.graph.name(),
            invocation = %invocation_id,
            steps = self.graph.len(),
            levels = self.graph.levels().len(),
            "Workflow run started"
        );

        let mut ctx = RunContext::new(invocation_id.clone());

        for (level_idx, level) in self.graph.levels().iter().enumerate() {
            debug!(level = level_idx, steps = level.len(), "Scheduling level");

            let mut futs = Vec::with_capacity(level.len());
            for step_id in level {
                let def = self.graph.step(step_id).ok_or_else(|| {
                    DigestError::Config(format!("Step '{}' missing from committed graph", step_id))
                })?;
                // Level partition guarantees this; the barrier check is a
                // plain membership test.
                debug_assert!(ctx.has_all(&def.depends_on));
                let step_ctx = StepContext::new(
                    def.step_id.clone(),
                    invocation_id.clone(),
                    ctx.run_date(),
                    ctx.snapshot(&def.depends_on)?,
                );
                futs.push(self.run_step(def, step_ctx));
            }

            let settled = tokio::select! {
                results = future::join_all(futs) => results,
                _ = self.cancel.cancelled() => {
                    warn!(
                        invocation = %invocation_id,
                        level = level_idx,
                        "Run cancelled, abandoning in-flight steps"
                    );
                    return Err(DigestError::Cancelled);
                }
            };

            let mut failed_steps: Vec<String> = Vec::new();
            let mut cause: Option<String> = None;
            for (step_id, result) in settled {
                match result {
                    Ok(output) => ctx.record(&step_id, output)?,
                    Err(e) => {
                        error!(step = %step_id, error = %e, "Step failed");
                        if cause.is_none() {
                            cause = Some(e.to_string());
                        }
                        failed_steps.push(step_id.to_string());
                    }
                }
            }

            if !failed_steps.is_empty() {
                return Err(DigestError::RunFailed {
                    invocation: invocation_id.to_string(),
                    failed_steps,
                    cause: cause.unwrap_or_default(),
                });
            }
        }

        let output = self
            .graph
            .terminal_step()
            .and_then(|id| ctx.get(id))
            .map(str::to_string)
            .ok_or_else(|| {
                DigestError::Config("Workflow has no single terminal step".to_string())
            })?;

        let total_elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            invocation = %invocation_id,
            elapsed_ms = total_elapsed_ms,
            "Workflow run completed"
        );

        Ok(RunReport {
            invocation_id,
            output,
            results: ctx.into_results(),
            total_elapsed_ms,
        })
    }

    async fn run_step(&self, def: &StepDefinition, ctx: StepContext) -> (StepId, Result<String>) {
        let step_id = def.step_id.clone();
        debug!(step = %step_id, "Step started");
        let start = Instant::now();

        let result = match tokio::time::timeout(self.step_timeout, def.exec.execute(ctx)).await {
            Ok(result) => result,
            Err(_) => Err(DigestError::StepTimeout {
                step: step_id.to_string(),
                timeout_secs: self.step_timeout.as_secs(),
            }),
        };

        debug!(
            step = %step_id,
            succeeded = result.is_ok(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Step settled"
        );
        (step_id, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::WorkflowBuilder;
    use crate::step::StepExec;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted step for exercising the scheduler: optional delay, optional
    /// failure, records how often it ran and what prior results it saw.
    struct StubStep {
        output: String,
        delay: Duration,
        fail: bool,
        calls: Arc<AtomicUsize>,
        seen_prior: Arc<Mutex<Option<BTreeMap<StepId, String>>>>,
    }

    impl StubStep {
        fn ok(output: &str) -> (Arc<Self>, Arc<AtomicUsize>) {
            Self::build(output, Duration::ZERO, false)
        }

        fn slow(output: &str, delay: Duration) -> (Arc<Self>, Arc<AtomicUsize>) {
            Self::build(output, delay, false)
        }

        fn failing() -> (Arc<Self>, Arc<AtomicUsize>) {
            Self::build("", Duration::ZERO, true)
        }

        fn build(output: &str, delay: Duration, fail: bool) -> (Arc<Self>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let step = Arc::new(Self {
                output: output.to_string(),
                delay,
                fail,
                calls: calls.clone(),
                seen_prior: Arc::new(Mutex::new(None)),
            });
            (step, calls)
        }
    }

    impl StepExec for StubStep {
        fn execute(&self, ctx: StepContext) -> BoxFuture<'_, Result<String>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                *self.seen_prior.lock().unwrap() = Some(ctx.prior_results().clone());
                if self.fail {
                    Err(DigestError::StepExecution {
                        step: ctx.step_id.to_string(),
                        message: "stub failure".to_string(),
                    })
                } else {
                    Ok(self.output.clone())
                }
            })
        }
    }

    fn fan_in_graph(
        fetches: Vec<(&str, Arc<StubStep>)>,
        merge: Arc<StubStep>,
    ) -> Arc<CommittedGraph> {
        let mut builder = WorkflowBuilder::new("test-digest");
        let fetch_ids: Vec<StepId> = fetches.iter().map(|(id, _)| StepId::from(*id)).collect();
        let defs = fetches
            .into_iter()
            .map(|(id, step)| StepDefinition::new(id, step as Arc<dyn StepExec>))
            .collect();
        builder.add_parallel(defs).unwrap();
        builder
            .then(
                StepDefinition::new("merge", merge as Arc<dyn StepExec>),
                fetch_ids,
            )
            .unwrap();
        Arc::new(builder.commit().unwrap())
    }

    #[tokio::test]
    async fn test_aggregation_runs_once_with_all_entries() {
        let (cline, cline_calls) = StubStep::ok("Cline v1.2 released May 10");
        let (roo, roo_calls) = StubStep::ok("Roo v3.0 released May 9");
        let (merge, merge_calls) = StubStep::ok("digest");
        let seen = merge.seen_prior.clone();

        let graph = fan_in_graph(vec![("cline", cline), ("roo", roo)], merge);
        let runner = WorkflowRunner::new(graph);
        let report = runner
            .run(Some(InvocationId::from_string("test")))
            .await
            .unwrap();

        assert_eq!(cline_calls.load(Ordering::SeqCst), 1);
        assert_eq!(roo_calls.load(Ordering::SeqCst), 1);
        assert_eq!(merge_calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.output, "digest");
        assert_eq!(report.results.len(), 3);

        let prior = seen.lock().unwrap().clone().unwrap();
        assert_eq!(prior.len(), 2);
        assert_eq!(prior[&StepId::from("cline")], "Cline v1.2 released May 10");
        assert_eq!(prior[&StepId::from("roo")], "Roo v3.0 released May 9");
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_aggregation() {
        let (cline, _) = StubStep::ok("Cline v1.2 released May 10");
        let (roo, _) = StubStep::failing();
        let (merge, merge_calls) = StubStep::ok("digest");

        let graph = fan_in_graph(vec![("cline", cline), ("roo", roo)], merge);
        let runner = WorkflowRunner::new(graph);
        let err = runner
            .run(Some(InvocationId::from_string("test")))
            .await
            .unwrap_err();

        match err {
            DigestError::RunFailed {
                failed_steps, cause, ..
            } => {
                assert_eq!(failed_steps, vec!["roo".to_string()]);
                assert!(cause.contains("stub failure"));
            }
            other => panic!("expected RunFailed, got {other}"),
        }
        assert_eq!(merge_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_barrier_waits_for_slow_sibling() {
        // "roo" settles well after "cline"; the merge step must still see
        // both results, and only run once.
        let (cline, _) = StubStep::ok("fast");
        let (roo, _) = StubStep::slow("slow", Duration::from_millis(50));
        let (merge, merge_calls) = StubStep::ok("digest");
        let seen = merge.seen_prior.clone();

        let graph = fan_in_graph(vec![("cline", cline), ("roo", roo)], merge);
        let runner = WorkflowRunner::new(graph);
        runner
            .run(Some(InvocationId::from_string("test")))
            .await
            .unwrap();

        assert_eq!(merge_calls.load(Ordering::SeqCst), 1);
        let prior = seen.lock().unwrap().clone().unwrap();
        assert_eq!(prior.len(), 2);
        assert_eq!(prior[&StepId::from("roo")], "slow");
    }

    #[tokio::test]
    async fn test_prior_results_identical_under_reordered_completion() {
        let run_with_delays = |cline_delay: u64, roo_delay: u64| async move {
            let (cline, _) = StubStep::slow("Cline v1.2", Duration::from_millis(cline_delay));
            let (roo, _) = StubStep::slow("Roo v3.0", Duration::from_millis(roo_delay));
            let (merge, _) = StubStep::ok("digest");
            let seen = merge.seen_prior.clone();

            let graph = fan_in_graph(vec![("cline", cline), ("roo", roo)], merge);
            WorkflowRunner::new(graph)
                .run(Some(InvocationId::from_string("test")))
                .await
                .unwrap();
            let prior = seen.lock().unwrap().clone().unwrap();
            prior
        };

        let cline_first = run_with_delays(1, 40).await;
        let roo_first = run_with_delays(40, 1).await;
        assert_eq!(cline_first, roo_first);
    }

    #[tokio::test]
    async fn test_unresponsive_step_times_out() {
        let (cline, _) = StubStep::slow("never", Duration::from_secs(60));
        let (merge, merge_calls) = StubStep::ok("digest");

        let graph = fan_in_graph(vec![("cline", cline)], merge);
        let runner =
            WorkflowRunner::new(graph).with_step_timeout(Duration::from_millis(20));
        let err = runner
            .run(Some(InvocationId::from_string("test")))
            .await
            .unwrap_err();

        match err {
            DigestError::RunFailed {
                failed_steps, cause, ..
            } => {
                assert_eq!(failed_steps, vec!["cline".to_string()]);
                assert!(cause.contains("timed out"));
            }
            other => panic!("expected RunFailed, got {other}"),
        }
        assert_eq!(merge_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancellation_fails_run_without_partial_output() {
        let (cline, _) = StubStep::slow("never", Duration::from_secs(60));
        let (merge, merge_calls) = StubStep::ok("digest");

        let cancel = CancellationToken::new();
        cancel.cancel();

        let graph = fan_in_graph(vec![("cline", cline)], merge);
        let runner = WorkflowRunner::new(graph).with_cancellation(cancel);
        let err = runner
            .run(Some(InvocationId::from_string("test")))
            .await
            .unwrap_err();

        assert!(matches!(err, DigestError::Cancelled));
        assert_eq!(merge_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_default_invocation_id_derives_from_today() {
        let (only, _) = StubStep::ok("out");
        let mut builder = WorkflowBuilder::new("t");
        builder
            .add_step(StepDefinition::new("only", only as Arc<dyn StepExec>))
            .unwrap();
        let graph = Arc::new(builder.commit().unwrap());

        let report = WorkflowRunner::new(graph).run(None).await.unwrap();
        assert_eq!(report.invocation_id, InvocationId::for_today());
    }
}
