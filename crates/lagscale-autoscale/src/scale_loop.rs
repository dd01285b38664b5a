//! Scale loop — the per-object tick driver.
//!
//! A tick snapshots the current configuration, evaluates all triggers
//! concurrently, aggregates, runs the cooldown controller and applies
//! the decision. Ticks run back to back on one task, so tick N+1 never
//! starts before tick N applied its decision.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use lagscale_core::{epoch_secs, ObjectId, ResolvedObject, ScaleDecision, ScaleError};
use lagscale_trigger::TriggerEvaluator;

use crate::aggregate::{aggregate, Aggregate};
use crate::cooldown::{CooldownController, CooldownState};
use crate::executor::ScalingExecutor;
use crate::report::TickReport;

pub struct ScaleLoop {
    config: watch::Receiver<Arc<ResolvedObject>>,
    evaluator: TriggerEvaluator,
    executor: Arc<dyn ScalingExecutor>,
    controller: CooldownController,
    /// Optional cap on the per-call trigger timeout.
    timeout_cap: Option<Duration>,
    reports: broadcast::Sender<TickReport>,
    cancel: CancellationToken,
    ticks: u64,
}

impl ScaleLoop {
    pub fn new(
        config: watch::Receiver<Arc<ResolvedObject>>,
        evaluator: TriggerEvaluator,
        executor: Arc<dyn ScalingExecutor>,
        reports: broadcast::Sender<TickReport>,
        cancel: CancellationToken,
    ) -> Self {
        let limits = config.borrow().limits;
        Self {
            config,
            evaluator,
            executor,
            controller: CooldownController::new(limits),
            timeout_cap: None,
            reports,
            cancel,
            ticks: 0,
        }
    }

    /// Cap every trigger call at `cap`, on top of the 90% rule.
    pub fn with_timeout_cap(mut self, cap: Option<Duration>) -> Self {
        self.timeout_cap = cap;
        self
    }

    /// The cooldown controller driving this object.
    pub fn controller(&self) -> &CooldownController {
        &self.controller
    }

    /// Run ticks until cancelled.
    pub async fn run(mut self) {
        let id = self.object_id();
        info!(object = %id, "scale loop started");

        loop {
            let started = Instant::now();
            if self.tick().await.is_none() {
                break;
            }

            // Ticks are paced from their start, so slow triggers do not
            // stretch the period.
            let interval = self.config.borrow().polling_interval;
            let remaining = interval.saturating_sub(started.elapsed());
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(remaining) => {}
            }
        }

        info!(object = %id, ticks = self.ticks, "scale loop stopped");
    }

    /// Run a single tick. Returns `None` if cancellation was observed
    /// before the decision was applied.
    pub async fn tick(&mut self) -> Option<TickReport> {
        // One snapshot per tick; reconfiguration lands on the next tick.
        let object = Arc::clone(&*self.config.borrow_and_update());
        let timeout = object.trigger_timeout(self.timeout_cap);

        let results = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(object = %object.id, "tick cancelled during trigger evaluation");
                return None;
            }
            results = self.evaluator.evaluate_all(&object, timeout) => results,
        };

        self.ticks += 1;
        let aggregate = aggregate(&results);

        let previous = self.controller.state();
        let target = self.controller.observe(
            &aggregate,
            object.limits,
            object.cooldown_period,
            Instant::now(),
        );
        let state = self.controller.state();
        if state != previous {
            info!(
                object = %object.id,
                from = ?previous,
                to = ?state,
                replicas = target,
                "cooldown state changed"
            );
        }

        let mut errors: Vec<String> = results
            .iter()
            .filter_map(|r| r.error())
            .map(|e| e.to_string())
            .collect();

        let applied = match &aggregate {
            Aggregate::NoDecision { unavailable } => {
                let err = ScaleError::AllTriggersUnavailable(*unavailable);
                warn!(object = %object.id, replicas = target, "{err}");
                errors.push(err.to_string());
                None
            }
            Aggregate::Decision { .. } => match self.apply(&object.id, target).await? {
                Ok(()) => Some(target),
                Err(err) => {
                    warn!(
                        object = %object.id,
                        replicas = target,
                        error = %err,
                        "scaling executor failed"
                    );
                    errors.push(err.to_string());
                    None
                }
            },
        };

        let report = TickReport {
            object: object.id.clone(),
            tick: self.ticks,
            triggers: results,
            aggregate,
            state,
            decision: ScaleDecision {
                desired_replicas: target,
                is_active: state == CooldownState::Active,
                decided_at: epoch_secs(),
            },
            applied_replicas: applied,
            errors,
        };

        report.emit();
        // No subscribers is fine.
        let _ = self.reports.send(report.clone());
        Some(report)
    }

    /// Hand `replicas` to the executor unless the loop was cancelled.
    ///
    /// Outer `None` means cancelled; the inner result is the executor's.
    async fn apply(&self, id: &ObjectId, replicas: u32) -> Option<Result<(), ScaleError>> {
        if self.cancel.is_cancelled() {
            debug!(object = %id, "tick cancelled before apply");
            return None;
        }

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(object = %id, "tick cancelled during apply");
                return None;
            }
            result = self.executor.set_replicas(id, replicas) => result,
        };

        Some(result.map_err(|e| ScaleError::ExecutorFailure {
            object: id.to_string(),
            reason: format!("{e:#}"),
        }))
    }

    fn object_id(&self) -> ObjectId {
        self.config.borrow().id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use lagscale_core::{ScalableObject, TriggerSpec};
    use lagscale_trigger::{InMemorySource, SourceRegistry};

    #[derive(Default)]
    struct RecordingExecutor {
        calls: Mutex<Vec<u32>>,
        failing: Mutex<bool>,
        delay: Option<Duration>,
        started: Mutex<Vec<u32>>,
    }

    impl RecordingExecutor {
        fn calls(&self) -> Vec<u32> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ScalingExecutor for RecordingExecutor {
        async fn set_replicas(&self, _object: &ObjectId, replicas: u32) -> anyhow::Result<()> {
            self.started.lock().unwrap().push(replicas);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if *self.failing.lock().unwrap() {
                anyhow::bail!("scale subresource conflict");
            }
            self.calls.lock().unwrap().push(replicas);
            Ok(())
        }
    }

    fn stan_object() -> ScalableObject {
        ScalableObject::new("stan-test-ns", "stan-test-so")
            .with_replicas(0, 5)
            .with_polling_interval(3)
            .with_cooldown_period(10)
            .with_trigger(
                TriggerSpec::new("stan")
                    .with_metadata("subject", "Test")
                    .with_metadata("queueGroup", "grp1")
                    .with_metadata("lagThreshold", "10")
                    .with_metadata("activationLagThreshold", "15"),
            )
    }

    struct Harness {
        scale_loop: ScaleLoop,
        source: Arc<InMemorySource>,
        executor: Arc<RecordingExecutor>,
        config_tx: watch::Sender<Arc<ResolvedObject>>,
        cancel: CancellationToken,
    }

    fn harness(object: ScalableObject) -> Harness {
        harness_with(object, InMemorySource::new("subject"), RecordingExecutor::default())
    }

    fn harness_with(
        object: ScalableObject,
        source: InMemorySource,
        executor: RecordingExecutor,
    ) -> Harness {
        let source = Arc::new(source);
        let registry = SourceRegistry::new().with_source("stan", source.clone());
        let executor = Arc::new(executor);
        let (config_tx, config_rx) = watch::channel(Arc::new(object.resolve().unwrap()));
        let (reports, _) = broadcast::channel(16);
        let cancel = CancellationToken::new();

        let scale_loop = ScaleLoop::new(
            config_rx,
            TriggerEvaluator::new(registry),
            executor.clone(),
            reports,
            cancel.clone(),
        );

        Harness {
            scale_loop,
            source,
            executor,
            config_tx,
            cancel,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn scale_from_zero_and_back() {
        let mut h = harness(stan_object());
        let mut applied = Vec::new();

        for lag in [0.0, 20.0, 55.0, 0.0, 0.0] {
            h.source.set("Test", lag);
            let report = h.scale_loop.tick().await.unwrap();
            applied.push(report.applied_replicas.unwrap());
            tokio::time::advance(Duration::from_secs(3)).await;
        }
        // Last active tick was at t=6; t=12 is still inside the cooldown.
        assert_eq!(applied, vec![0, 2, 5, 5, 5]);

        tokio::time::advance(Duration::from_secs(1)).await;
        let report = h.scale_loop.tick().await.unwrap();
        assert_eq!(report.applied_replicas, Some(0));
        assert_eq!(report.state, CooldownState::Idle);
        assert_eq!(h.executor.calls(), vec![0, 2, 5, 5, 5, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn total_outage_holds_previous_decision() {
        let mut h = harness(stan_object());

        h.source.set("Test", 40.0);
        let report = h.scale_loop.tick().await.unwrap();
        assert_eq!(report.applied_replicas, Some(4));

        h.source.fail("Test", "connection refused");
        tokio::time::advance(Duration::from_secs(30)).await;
        let report = h.scale_loop.tick().await.unwrap();

        assert!(report.is_degraded());
        assert_eq!(report.applied_replicas, None);
        assert_eq!(report.decision.desired_replicas, 4);
        assert_eq!(report.state, CooldownState::Active);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(h.executor.calls(), vec![4]);
    }

    #[tokio::test(start_paused = true)]
    async fn executor_failure_is_reported_and_retried() {
        let mut h = harness(stan_object());
        h.source.set("Test", 30.0);

        *h.executor.failing.lock().unwrap() = true;
        let report = h.scale_loop.tick().await.unwrap();
        assert_eq!(report.applied_replicas, None);
        assert_eq!(report.decision.desired_replicas, 3);
        assert!(report.errors[0].contains("scale subresource conflict"));

        *h.executor.failing.lock().unwrap() = false;
        tokio::time::advance(Duration::from_secs(3)).await;
        let report = h.scale_loop.tick().await.unwrap();
        assert_eq!(report.applied_replicas, Some(3));
        assert!(report.errors.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reconfiguration_applies_on_next_tick() {
        let mut h = harness(stan_object());
        h.source.set("Test", 100.0);

        let report = h.scale_loop.tick().await.unwrap();
        assert_eq!(report.applied_replicas, Some(5));

        h.config_tx
            .send(Arc::new(stan_object().with_replicas(1, 8).resolve().unwrap()))
            .unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;
        let report = h.scale_loop.tick().await.unwrap();
        assert_eq!(report.applied_replicas, Some(8));
    }

    #[tokio::test(start_paused = true)]
    async fn identical_metrics_give_identical_decisions() {
        let mut h = harness(stan_object());
        h.source.set("Test", 27.0);

        let first = h.scale_loop.tick().await.unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;
        let second = h.scale_loop.tick().await.unwrap();

        assert_eq!(first.decision.desired_replicas, second.decision.desired_replicas);
        assert_eq!(first.state, second.state);
        assert_eq!(second.tick, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_apply_abandons_the_call() {
        let executor = RecordingExecutor {
            delay: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        let mut h = harness_with(stan_object(), InMemorySource::new("subject"), executor);
        h.source.set("Test", 30.0);

        let cancel = h.cancel.clone();
        let (report, ()) = tokio::join!(h.scale_loop.tick(), async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            cancel.cancel();
        });

        assert!(report.is_none());
        assert_eq!(*h.executor.started.lock().unwrap(), vec![3]);
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(h.executor.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn run_paces_ticks_from_their_start() {
        let source = InMemorySource::new("subject").with_latency(Duration::from_secs(2));
        let h = harness_with(stan_object(), source, RecordingExecutor::default());
        h.source.set("Test", 30.0);
        let mut rx = h.scale_loop.reports.subscribe();

        let origin = Instant::now();
        let handle = tokio::spawn(h.scale_loop.run());

        let mut seen = Vec::new();
        for _ in 0..4 {
            rx.recv().await.unwrap();
            seen.push(origin.elapsed().as_secs());
        }
        assert_eq!(seen, vec![2, 5, 8, 11]);

        h.cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_tick_never_applies() {
        let mut h = harness(stan_object());
        h.source.set("Test", 30.0);
        h.cancel.cancel();

        assert!(h.scale_loop.tick().await.is_none());
        assert!(h.executor.calls().is_empty());
    }
}
