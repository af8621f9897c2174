//! Error types for the ATM ledger.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::AccountNumber;

/// Main error type for ledger operations.
///
/// The `Display` text of each variant is the human-readable detail returned to
/// API clients; [`LedgerError::error_code`] is the machine-readable reason.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Account number contains something other than ASCII digits.
    #[error("Invalid account number format")]
    InvalidAccountNumber(String),

    /// Request carried no JSON object body.
    #[error("Missing JSON body")]
    MissingBody,

    /// Body is an object without an `amount` key.
    #[error("Missing 'amount' field")]
    MissingAmountField,

    /// `amount` does not decode to a finite decimal.
    #[error("'amount' must be a number")]
    NonNumericAmount(String),

    /// `amount` is numeric but does not fit the decimal range.
    #[error("'amount' is out of range")]
    AmountOutOfRange(String),

    /// `amount` is zero or negative after quantization.
    #[error("'amount' must be > 0")]
    NonPositiveAmount(Decimal),

    /// Well-formed account number that is not in the ledger.
    #[error("Account not found")]
    AccountNotFound(AccountNumber),

    /// Debit larger than the balance held at the time of the debit.
    #[error("Insufficient funds")]
    InsufficientFunds {
        account: AccountNumber,
        requested: Decimal,
        available: Decimal,
    },

    /// Credit would push the balance past the decimal range.
    #[error("Resulting balance is out of range")]
    BalanceOverflow(AccountNumber),

    /// Invalid startup configuration.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl LedgerError {
    /// Get error code for API responses and logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            LedgerError::InvalidAccountNumber(_) => "INVALID_ACCOUNT_NUMBER",
            LedgerError::MissingBody => "MISSING_BODY",
            LedgerError::MissingAmountField => "MISSING_AMOUNT",
            LedgerError::NonNumericAmount(_) => "NON_NUMERIC_AMOUNT",
            LedgerError::AmountOutOfRange(_) => "AMOUNT_OUT_OF_RANGE",
            LedgerError::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
            LedgerError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            LedgerError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            LedgerError::BalanceOverflow(_) => "BALANCE_OVERFLOW",
            LedgerError::ConfigurationError(_) => "CONFIGURATION_ERROR",
        }
    }

    /// Check if the error was caused by a malformed request rather than by
    /// ledger state.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidAccountNumber(_)
                | LedgerError::MissingBody
                | LedgerError::MissingAmountField
                | LedgerError::NonNumericAmount(_)
                | LedgerError::AmountOutOfRange(_)
                | LedgerError::NonPositiveAmount(_)
        )
    }
}

/// Result type alias for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
