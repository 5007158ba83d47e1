//! Fans transfer records out to the executor, either through a bounded pool
//! of concurrent tasks or one at a time with a fixed pacing delay.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::warn;

use crate::error::ConfigError;
use crate::executor::TransferExecutor;
use crate::reporter::Reporter;
use crate::types::{DistributionPlan, Tally, TransferOutcome};

/// Hard cap on in-flight transfers, sized for upstream RPC rate limits.
pub const MAX_IN_FLIGHT: usize = 10;

#[derive(Debug, Clone, Copy)]
pub enum DispatchMode {
    /// Up to `limit` transfers in flight at once; completion order is
    /// arbitrary.
    Bounded { limit: usize },
    /// Strict input order, sleeping `delay` between consecutive attempts.
    Paced { delay: Duration },
}

impl DispatchMode {
    /// Rejects out-of-range bounds before any transfer can be attempted.
    pub fn bounded(limit: usize) -> Result<Self, ConfigError> {
        if limit == 0 || limit > MAX_IN_FLIGHT {
            return Err(ConfigError::ConcurrencyOutOfRange(limit));
        }
        Ok(Self::Bounded { limit })
    }

    pub fn paced(delay: Duration) -> Self {
        Self::Paced { delay }
    }
}

pub struct Dispatcher {
    executor: Arc<dyn TransferExecutor>,
    reporter: Arc<Reporter>,
    mode: DispatchMode,
}

impl Dispatcher {
    pub fn new(
        executor: Arc<dyn TransferExecutor>,
        reporter: Arc<Reporter>,
        mode: DispatchMode,
    ) -> Self {
        Self {
            executor,
            reporter,
            mode,
        }
    }

    /// Runs the whole plan to completion. Every record is dispatched exactly
    /// once and yields exactly one outcome; a failure (or panic) inside one
    /// transfer never aborts the rest of the batch. The tally is final only
    /// after all in-flight transfers have finished.
    pub async fn run(&self, plan: &DistributionPlan) -> (Vec<TransferOutcome>, Tally) {
        match self.mode {
            DispatchMode::Bounded { limit } => self.run_bounded(plan, limit).await,
            DispatchMode::Paced { delay } => self.run_paced(plan, delay).await,
        }
    }

    async fn run_bounded(
        &self,
        plan: &DistributionPlan,
        limit: usize,
    ) -> (Vec<TransferOutcome>, Tally) {
        let semaphore = Arc::new(Semaphore::new(limit));

        let mut handles = Vec::with_capacity(plan.len());
        for &record in &plan.records {
            let executor = Arc::clone(&self.executor);
            let reporter = Arc::clone(&self.reporter);
            let semaphore = Arc::clone(&semaphore);

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire().await.unwrap();
                let outcome = match executor.execute(record).await {
                    Ok(signature) => TransferOutcome::succeeded(record, signature),
                    Err(e) => TransferOutcome::failed(record, e.to_string()),
                };
                reporter.record(&outcome);
                outcome
            });
            handles.push((record, handle));
        }

        // Tally aggregation stays single-threaded on this side; workers only
        // hand their outcomes back through the join handles.
        let mut outcomes = Vec::with_capacity(plan.len());
        let mut tally = Tally::default();
        for (record, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    // A crashed worker still owes its record an outcome.
                    warn!("Transfer task for {} crashed: {e}", record.recipient);
                    let outcome = TransferOutcome::failed(record, format!("transfer task crashed: {e}"));
                    self.reporter.record(&outcome);
                    outcome
                }
            };
            tally.observe(&outcome);
            outcomes.push(outcome);
        }
        (outcomes, tally)
    }

    async fn run_paced(
        &self,
        plan: &DistributionPlan,
        delay: Duration,
    ) -> (Vec<TransferOutcome>, Tally) {
        let mut outcomes = Vec::with_capacity(plan.len());
        let mut tally = Tally::default();

        for (i, &record) in plan.records.iter().enumerate() {
            let outcome = match self.executor.execute(record).await {
                Ok(signature) => TransferOutcome::succeeded(record, signature),
                Err(e) => TransferOutcome::failed(record, e.to_string()),
            };
            self.reporter.record(&outcome);
            tally.observe(&outcome);
            outcomes.push(outcome);

            if i + 1 < plan.len() && !delay.is_zero() {
                sleep(delay).await;
            }
        }
        (outcomes, tally)
    }
}
