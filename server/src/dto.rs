//! Request/response DTOs and mapping to/from ledger types.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Number, Value};

use atm_common::{AccountNumber, Amount, LedgerError, Result};
use atm_ledger::TransactionReceipt;

// -------------------------
// Request DTOs
// -------------------------

/// The `amount` value as sent by the client.
#[derive(Debug)]
pub enum AmountField {
    Number(Number),
    Text(String),
    Other(Value),
}

impl From<Value> for AmountField {
    fn from(value: Value) -> Self {
        match value {
            Value::Number(n) => AmountField::Number(n),
            Value::String(s) => AmountField::Text(s),
            other => AmountField::Other(other),
        }
    }
}

impl AmountField {
    /// Decode into a validated amount.
    ///
    /// Numbers go through the literal the client sent, never through `f64`
    /// arithmetic, so `10.004` arrives as exactly `10.004` before rounding.
    pub fn to_amount(&self) -> Result<Amount> {
        match self {
            AmountField::Number(n) => Amount::parse(&n.to_string()),
            AmountField::Text(s) => Amount::parse(s),
            AmountField::Other(v) => Err(LedgerError::NonNumericAmount(v.to_string())),
        }
    }
}

/// Validate a raw request body into an amount.
///
/// `body` is `None` when the request had no decodable JSON body. Only a JSON
/// object counts as a body; an absent `amount` key differs from `null`.
pub fn parse_amount(body: Option<Value>) -> Result<Amount> {
    let Some(Value::Object(mut fields)) = body else {
        return Err(LedgerError::MissingBody);
    };

    fields
        .remove("amount")
        .map(AmountField::from)
        .ok_or(LedgerError::MissingAmountField)?
        .to_amount()
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Result of a committed deposit or withdrawal.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub message: &'static str,
    pub account_number: AccountNumber,
    pub amount: Amount,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
}

impl TransactionResponse {
    pub fn from_receipt(message: &'static str, receipt: TransactionReceipt) -> Self {
        Self {
            message,
            account_number: receipt.account_number,
            amount: receipt.amount,
            balance: receipt.balance_after,
        }
    }
}
