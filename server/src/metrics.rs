//! Metrics collection for server monitoring.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use atm_ledger::AccountBalance;

/// Server metrics.
pub struct Metrics {
    /// Total HTTP requests received.
    pub requests_total: AtomicU64,
    /// Committed deposits.
    pub deposits_total: AtomicU64,
    /// Committed withdrawals.
    pub withdrawals_total: AtomicU64,
    /// Rejected requests keyed by error code.
    rejections: DashMap<&'static str, AtomicU64>,
}

impl Metrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            deposits_total: AtomicU64::new(0),
            withdrawals_total: AtomicU64::new(0),
            rejections: DashMap::new(),
        }
    }

    /// Increment requests received.
    pub fn request_received(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a committed deposit.
    pub fn deposit_committed(&self) {
        self.deposits_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a committed withdrawal.
    pub fn withdrawal_committed(&self) {
        self.withdrawals_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected request.
    pub fn request_rejected(&self, code: &'static str) {
        self.rejections
            .entry(code)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut rejections: Vec<_> = self
            .rejections
            .iter()
            .map(|entry| (*entry.key(), entry.value().load(Ordering::Relaxed)))
            .collect();
        rejections.sort_unstable();

        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            deposits_total: self.deposits_total.load(Ordering::Relaxed),
            withdrawals_total: self.withdrawals_total.load(Ordering::Relaxed),
            rejections,
        }
    }

    /// Export metrics in Prometheus format, with one balance gauge per
    /// account.
    pub fn to_prometheus(&self, balances: &[AccountBalance]) -> String {
        let snapshot = self.snapshot();
        let mut out = format!(
            r#"# HELP atm_requests_total Total HTTP requests received
# TYPE atm_requests_total counter
atm_requests_total {}

# HELP atm_deposits_total Committed deposits
# TYPE atm_deposits_total counter
atm_deposits_total {}

# HELP atm_withdrawals_total Committed withdrawals
# TYPE atm_withdrawals_total counter
atm_withdrawals_total {}

# HELP atm_rejections_total Rejected requests by reason
# TYPE atm_rejections_total counter
"#,
            snapshot.requests_total, snapshot.deposits_total, snapshot.withdrawals_total,
        );

        for (code, count) in &snapshot.rejections {
            let _ = writeln!(out, "atm_rejections_total{{reason=\"{code}\"}} {count}");
        }

        out.push_str(
            "\n# HELP atm_account_balance Current account balance\n# TYPE atm_account_balance gauge\n",
        );
        for balance in balances {
            let _ = writeln!(
                out,
                "atm_account_balance{{account=\"{}\"}} {}",
                balance.account_number, balance.balance
            );
        }

        out
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub deposits_total: u64,
    pub withdrawals_total: u64,
    pub rejections: Vec<(&'static str, u64)>,
}

impl MetricsSnapshot {
    /// Rejections recorded for one error code.
    pub fn rejections_for(&self, code: &str) -> u64 {
        self.rejections
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<Metrics>;
