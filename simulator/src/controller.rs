//! Simulation controller.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use tracing::{debug, info};

use atm_common::{AccountNumber, Result as LedgerResult};
use atm_ledger::{Ledger, LockGranularity, TransactionReceipt};

use crate::metrics::SimulationMetrics;
use crate::scenario::{Operation, OperationKind, Scenario};

/// Outcome of one scenario run.
#[derive(Debug, Default)]
pub struct SimulationReport {
    pub metrics: SimulationMetrics,
    /// Committed credits minus committed debits, per account.
    pub net_effect: HashMap<AccountNumber, Decimal>,
    pub elapsed: Duration,
}

impl SimulationReport {
    fn absorb(&mut self, worker: WorkerOutcome) {
        self.metrics.merge(worker.metrics);
        for (account, delta) in worker.net_effect {
            *self.net_effect.entry(account).or_default() += delta;
        }
    }
}

#[derive(Debug, Default)]
struct WorkerOutcome {
    metrics: SimulationMetrics,
    net_effect: HashMap<AccountNumber, Decimal>,
}

/// Controls the simulation.
pub struct SimulationController {
    /// Ledger under load.
    ledger: Arc<Ledger>,
    /// Concurrent workers.
    workers: usize,
    /// Operations issued by each worker.
    operations: usize,
    /// Random number generator.
    rng: StdRng,
}

impl SimulationController {
    /// Create a new simulation controller over a fresh seed ledger.
    pub fn new(
        granularity: LockGranularity,
        workers: usize,
        operations: usize,
        seed: Option<u64>,
    ) -> anyhow::Result<Self> {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            ledger: Arc::new(Ledger::with_seed_accounts(granularity)?),
            workers,
            operations,
            rng,
        })
    }

    /// Run a scenario to completion and verify its invariants.
    pub async fn run_scenario(&mut self, scenario: Scenario) -> anyhow::Result<SimulationReport> {
        info!(
            scenario = scenario.name(),
            workers = self.workers,
            operations = self.operations,
            granularity = %self.ledger.granularity(),
            "Running scenario: {}",
            scenario.description()
        );

        let accounts = self.ledger.accounts();
        let plans = (0..self.workers)
            .map(|_| scenario.plan(self.operations, &accounts, &mut self.rng))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let initial = self.balances();
        let started = Instant::now();

        let handles: Vec<_> = plans
            .into_iter()
            .enumerate()
            .map(|(worker, plan)| tokio::spawn(run_worker(worker, Arc::clone(&self.ledger), plan)))
            .collect();

        let mut report = SimulationReport::default();
        for outcome in futures::future::try_join_all(handles).await? {
            report.absorb(outcome?);
        }
        report.elapsed = started.elapsed();

        scenario.verify(&initial, &self.balances(), &report)?;
        info!(scenario = scenario.name(), "Invariants hold");

        Ok(report)
    }

    /// Current balances keyed by account.
    pub fn balances(&self) -> HashMap<AccountNumber, Decimal> {
        self.ledger
            .snapshot()
            .into_iter()
            .map(|b| (b.account_number, b.balance))
            .collect()
    }
}

/// Issue one worker's operations in order, each on the blocking pool.
async fn run_worker(
    worker: usize,
    ledger: Arc<Ledger>,
    plan: Vec<Operation>,
) -> anyhow::Result<WorkerOutcome> {
    let mut outcome = WorkerOutcome::default();

    for op in plan {
        let ledger = Arc::clone(&ledger);
        let started = Instant::now();
        let result = tokio::task::spawn_blocking(move || apply(&ledger, &op)).await?;
        let latency = started.elapsed();

        match result {
            Ok(receipt) => {
                *outcome
                    .net_effect
                    .entry(receipt.account_number.clone())
                    .or_default() += receipt.signed_amount();
                outcome.metrics.record_success(latency);
            }
            Err(e) => outcome.metrics.record_rejection(e.error_code(), latency),
        }
    }

    debug!(
        worker,
        committed = outcome.metrics.successful_operations,
        rejected = outcome.metrics.rejected_operations,
        "Worker finished"
    );
    Ok(outcome)
}

fn apply(ledger: &Ledger, op: &Operation) -> LedgerResult<TransactionReceipt> {
    match op.kind {
        OperationKind::Deposit => ledger.credit(&op.account, op.amount),
        OperationKind::Withdraw => ledger.debit(&op.account, op.amount),
    }
}
