//! Account balance snapshots.

use atm_common::AccountNumber;
use rust_decimal::Decimal;
use serde::Serialize;

/// Balance of one account at the moment it was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountBalance {
    /// Account identifier.
    pub account_number: AccountNumber,
    /// Quantized balance.
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
}
