//! Account definitions for ledger.

use atm_common::{quantize, AccountNumber, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An account as loaded into the ledger at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account number.
    pub number: AccountNumber,
    /// Balance the account opens with.
    pub opening_balance: Decimal,
}

impl Account {
    /// Create a new account. The opening balance is quantized to two places.
    pub fn new(number: AccountNumber, opening_balance: Decimal) -> Self {
        Self {
            number,
            opening_balance: quantize(opening_balance),
        }
    }
}

/// Seed account numbers and opening balances in cents.
const SEEDS: [(&str, i64); 3] = [("1001", 25_000), ("1002", 0), ("1003", 99_999)];

/// The fixed accounts every fresh ledger starts with.
pub fn seed_accounts() -> Result<Vec<Account>> {
    SEEDS
        .into_iter()
        .map(|(number, cents)| {
            let number = AccountNumber::parse(number)?;
            Ok(Account::new(number, Decimal::new(cents, 2)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_seed_accounts() {
        let seeds = seed_accounts().unwrap();
        assert_eq!(seeds.len(), SEEDS.len());

        let find = |n: &str| {
            seeds
                .iter()
                .find(|a| a.number.as_str() == n)
                .map(|a| a.opening_balance)
        };
        assert_eq!(find("1001"), Some(dec!(250.00)));
        assert_eq!(find("1002"), Some(dec!(0.00)));
        assert_eq!(find("1003"), Some(dec!(999.99)));
    }

    #[test]
    fn test_opening_balance_is_quantized() {
        let account = Account::new(AccountNumber::parse("42").unwrap(), dec!(10.125));
        assert_eq!(account.opening_balance.to_string(), "10.13");
    }
}
