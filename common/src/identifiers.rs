//! Identifier types for ledger accounts.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::LedgerError;

/// Account number: a non-empty string of ASCII decimal digits.
///
/// Leading zeros are significant; `"01001"` and `"1001"` are different
/// accounts.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Parse and validate an account number.
    pub fn parse(s: &str) -> Result<Self, LedgerError> {
        if Self::is_valid(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(LedgerError::InvalidAccountNumber(s.to_string()))
        }
    }

    /// Check the account number format without allocating.
    pub fn is_valid(s: &str) -> bool {
        !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
    }

    /// Get the account number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = LedgerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if Self::is_valid(&s) {
            Ok(Self(s))
        } else {
            Err(LedgerError::InvalidAccountNumber(s))
        }
    }
}

impl From<AccountNumber> for String {
    fn from(id: AccountNumber) -> Self {
        id.0
    }
}

impl AsRef<str> for AccountNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
