//! Simulation scenarios.
//!
//! A scenario decides which operations each worker issues and which
//! invariants must hold once every worker has finished.

use std::collections::HashMap;

use anyhow::{ensure, Context};
use rand::rngs::StdRng;
use rand::Rng;
use rust_decimal::Decimal;

use atm_common::{quantize, AccountNumber, Amount};

use crate::controller::SimulationReport;

/// Account hammered by `deposit-storm`.
const STORM_ACCOUNT: &str = "1002";
/// Cents deposited per `deposit-storm` operation.
const STORM_AMOUNT_CENTS: i64 = 101;
/// Account emptied by `drain`.
const DRAIN_ACCOUNT: &str = "1003";
/// Cents withdrawn per `drain` operation.
const DRAIN_AMOUNT_CENTS: i64 = 700;
/// Upper bound for random `mixed` amounts, in cents.
const MIXED_MAX_CENTS: i64 = 10_000;

/// A named load pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Identical concurrent deposits onto one account.
    DepositStorm,
    /// Random deposits and withdrawals across every account.
    Mixed,
    /// Concurrent withdrawals racing to empty one account.
    Drain,
}

/// Direction of a single ledger call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Deposit,
    Withdraw,
}

/// One planned ledger call.
#[derive(Debug, Clone)]
pub struct Operation {
    pub account: AccountNumber,
    pub kind: OperationKind,
    pub amount: Amount,
}

impl Scenario {
    /// Load a scenario by name.
    pub fn load(name: &str) -> anyhow::Result<Self> {
        match name {
            "deposit-storm" => Ok(Self::DepositStorm),
            "mixed" => Ok(Self::Mixed),
            "drain" => Ok(Self::Drain),
            _ => Err(anyhow::anyhow!("Unknown scenario: {}", name)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DepositStorm => "deposit-storm",
            Self::Mixed => "mixed",
            Self::Drain => "drain",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::DepositStorm => "Concurrent identical deposits onto one account",
            Self::Mixed => "Random deposits and withdrawals across all accounts",
            Self::Drain => "Concurrent withdrawals racing to empty one account",
        }
    }

    /// Build the operations for one worker.
    pub fn plan(
        &self,
        operations: usize,
        accounts: &[AccountNumber],
        rng: &mut StdRng,
    ) -> anyhow::Result<Vec<Operation>> {
        match self {
            Self::DepositStorm => {
                let op = Operation {
                    account: AccountNumber::parse(STORM_ACCOUNT)?,
                    kind: OperationKind::Deposit,
                    amount: Amount::new(Decimal::new(STORM_AMOUNT_CENTS, 2))?,
                };
                Ok(vec![op; operations])
            }
            Self::Drain => {
                let op = Operation {
                    account: AccountNumber::parse(DRAIN_ACCOUNT)?,
                    kind: OperationKind::Withdraw,
                    amount: Amount::new(Decimal::new(DRAIN_AMOUNT_CENTS, 2))?,
                };
                Ok(vec![op; operations])
            }
            Self::Mixed => {
                ensure!(!accounts.is_empty(), "mixed scenario needs at least one account");
                (0..operations)
                    .map(|_| {
                        let account = accounts[rng.gen_range(0..accounts.len())].clone();
                        let kind = if rng.gen_bool(0.5) {
                            OperationKind::Deposit
                        } else {
                            OperationKind::Withdraw
                        };
                        let cents = rng.gen_range(1..=MIXED_MAX_CENTS);
                        Ok(Operation {
                            account,
                            kind,
                            amount: Amount::new(Decimal::new(cents, 2))?,
                        })
                    })
                    .collect()
            }
        }
    }

    /// Check the end state against what a serial history would produce.
    pub fn verify(
        &self,
        initial: &HashMap<AccountNumber, Decimal>,
        last: &HashMap<AccountNumber, Decimal>,
        report: &SimulationReport,
    ) -> anyhow::Result<()> {
        // Conservation holds for every scenario.
        for (account, opening) in initial {
            let closing = balance_of(last, account)?;
            let net = report.net_effect.get(account).copied().unwrap_or_default();

            ensure!(
                closing >= Decimal::ZERO,
                "account {account} went negative: {closing}"
            );
            ensure!(
                closing.scale() == 2,
                "account {account} lost its two-place scale: {closing}"
            );
            ensure!(
                closing == quantize(*opening + net),
                "account {account} does not conserve: {opening} + {net} != {closing}"
            );
        }

        match self {
            Self::DepositStorm => {
                let account = AccountNumber::parse(STORM_ACCOUNT)?;
                let amount = Decimal::new(STORM_AMOUNT_CENTS, 2);
                let attempts = Decimal::from(report.metrics.total_operations);

                ensure!(
                    report.metrics.rejected_operations == 0,
                    "{} deposits were rejected",
                    report.metrics.rejected_operations
                );
                let expected = quantize(balance_of(initial, &account)? + attempts * amount);
                let closing = balance_of(last, &account)?;
                ensure!(
                    closing == expected,
                    "lost update on {account}: expected {expected}, found {closing}"
                );
            }
            Self::Drain => {
                let account = AccountNumber::parse(DRAIN_ACCOUNT)?;
                let amount = Decimal::new(DRAIN_AMOUNT_CENTS, 2);
                let opening = balance_of(initial, &account)?;
                let closing = balance_of(last, &account)?;
                let affordable = (opening / amount).floor();
                let attempts = Decimal::from(report.metrics.total_operations);
                let successes = Decimal::from(report.metrics.successful_operations);

                ensure!(
                    successes == affordable.min(attempts),
                    "expected {} successful withdrawals, saw {successes}",
                    affordable.min(attempts)
                );
                if attempts > affordable {
                    ensure!(
                        closing < amount,
                        "residual {closing} on {account} still covers {amount}"
                    );
                }
            }
            Self::Mixed => {}
        }

        Ok(())
    }
}

fn balance_of(balances: &HashMap<AccountNumber, Decimal>, account: &AccountNumber) -> anyhow::Result<Decimal> {
    balances
        .get(account)
        .copied()
        .with_context(|| format!("account {account} is not in the ledger"))
}
