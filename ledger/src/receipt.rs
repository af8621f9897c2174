//! Records returned by ledger mutations.

use atm_common::{AccountNumber, Amount};
use rust_decimal::Decimal;
use serde::Serialize;

/// Type of ledger mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryType {
    /// Credit (deposit, increases balance).
    Credit,
    /// Debit (withdrawal, decreases balance).
    Debit,
}

/// Outcome of a committed credit or debit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionReceipt {
    /// Account affected.
    pub account_number: AccountNumber,
    /// Entry type (credit or debit).
    pub entry_type: EntryType,
    /// Quantized amount applied.
    pub amount: Amount,
    /// Balance after this entry.
    #[serde(with = "rust_decimal::serde::float")]
    pub balance_after: Decimal,
}

impl TransactionReceipt {
    /// Get signed amount (positive for credit, negative for debit).
    pub fn signed_amount(&self) -> Decimal {
        match self.entry_type {
            EntryType::Credit => self.amount.value(),
            EntryType::Debit => -self.amount.value(),
        }
    }
}
