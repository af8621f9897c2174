//! Lock-guarded balance storage.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use parking_lot::Mutex;
use rust_decimal::Decimal;

use atm_common::{AccountNumber, LedgerError, Result};

/// How the ledger serializes access to balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockGranularity {
    /// One lock for the whole ledger. Every read and mutation takes it.
    #[default]
    Global,
    /// One lock per account. Mutations on distinct accounts run in parallel.
    PerAccount,
}

impl LockGranularity {
    /// Name used in configuration and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            LockGranularity::Global => "global",
            LockGranularity::PerAccount => "per-account",
        }
    }
}

impl fmt::Display for LockGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LockGranularity {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(LockGranularity::Global),
            "per-account" | "per_account" | "account" => Ok(LockGranularity::PerAccount),
            other => Err(LedgerError::ConfigurationError(format!(
                "unknown lock granularity '{other}', expected 'global' or 'per-account'"
            ))),
        }
    }
}

/// Storage for account balances.
///
/// `update` is the only way to change a balance. The closure receives the
/// current balance and returns the next one; it runs while the account is
/// exclusively held, and its error leaves the balance untouched. Locks are
/// synchronous and must never be held across an `.await`.
pub trait BalanceStore: Send + Sync {
    /// Read the current balance.
    fn read(&self, account: &AccountNumber) -> Option<Decimal>;

    /// Atomically replace the balance with the result of `apply`.
    fn update(
        &self,
        account: &AccountNumber,
        apply: &mut dyn FnMut(Decimal) -> Result<Decimal>,
    ) -> Result<Decimal>;

    /// Check if the account exists.
    fn contains(&self, account: &AccountNumber) -> bool;

    /// All account numbers, sorted.
    fn accounts(&self) -> Vec<AccountNumber>;

    /// All balances, sorted by account number.
    fn snapshot(&self) -> Vec<(AccountNumber, Decimal)>;

    /// Locking strategy of this store.
    fn granularity(&self) -> LockGranularity;
}

/// Build the store matching `granularity`.
pub fn new_store(
    granularity: LockGranularity,
    balances: HashMap<AccountNumber, Decimal>,
) -> Box<dyn BalanceStore> {
    match granularity {
        LockGranularity::Global => Box::new(GlobalLockStore::new(balances)),
        LockGranularity::PerAccount => Box::new(PerAccountStore::new(balances)),
    }
}

/// All balances behind a single mutex.
pub struct GlobalLockStore {
    balances: Mutex<HashMap<AccountNumber, Decimal>>,
}

impl GlobalLockStore {
    /// Create a new store.
    pub fn new(balances: HashMap<AccountNumber, Decimal>) -> Self {
        Self {
            balances: Mutex::new(balances),
        }
    }
}

impl BalanceStore for GlobalLockStore {
    fn read(&self, account: &AccountNumber) -> Option<Decimal> {
        self.balances.lock().get(account).copied()
    }

    fn update(
        &self,
        account: &AccountNumber,
        apply: &mut dyn FnMut(Decimal) -> Result<Decimal>,
    ) -> Result<Decimal> {
        let mut balances = self.balances.lock();
        let balance = balances
            .get_mut(account)
            .ok_or_else(|| LedgerError::AccountNotFound(account.clone()))?;

        let next = apply(*balance)?;
        *balance = next;
        Ok(next)
    }

    fn contains(&self, account: &AccountNumber) -> bool {
        self.balances.lock().contains_key(account)
    }

    fn accounts(&self) -> Vec<AccountNumber> {
        let mut accounts: Vec<_> = self.balances.lock().keys().cloned().collect();
        accounts.sort();
        accounts
    }

    fn snapshot(&self) -> Vec<(AccountNumber, Decimal)> {
        let mut balances: Vec<_> = self
            .balances
            .lock()
            .iter()
            .map(|(account, balance)| (account.clone(), *balance))
            .collect();
        balances.sort_by(|a, b| a.0.cmp(&b.0));
        balances
    }

    fn granularity(&self) -> LockGranularity {
        LockGranularity::Global
    }
}

/// One mutex per account.
///
/// The key set is fixed at construction, so the outer map is never written
/// after that and needs no lock of its own.
pub struct PerAccountStore {
    balances: HashMap<AccountNumber, Mutex<Decimal>>,
}

impl PerAccountStore {
    /// Create a new store.
    pub fn new(balances: HashMap<AccountNumber, Decimal>) -> Self {
        Self {
            balances: balances
                .into_iter()
                .map(|(account, balance)| (account, Mutex::new(balance)))
                .collect(),
        }
    }
}

impl BalanceStore for PerAccountStore {
    fn read(&self, account: &AccountNumber) -> Option<Decimal> {
        self.balances.get(account).map(|slot| *slot.lock())
    }

    fn update(
        &self,
        account: &AccountNumber,
        apply: &mut dyn FnMut(Decimal) -> Result<Decimal>,
    ) -> Result<Decimal> {
        let slot = self
            .balances
            .get(account)
            .ok_or_else(|| LedgerError::AccountNotFound(account.clone()))?;

        let mut balance = slot.lock();
        let next = apply(*balance)?;
        *balance = next;
        Ok(next)
    }

    fn contains(&self, account: &AccountNumber) -> bool {
        self.balances.contains_key(account)
    }

    fn accounts(&self) -> Vec<AccountNumber> {
        let mut accounts: Vec<_> = self.balances.keys().cloned().collect();
        accounts.sort();
        accounts
    }

    fn snapshot(&self) -> Vec<(AccountNumber, Decimal)> {
        let mut balances: Vec<_> = self
            .balances
            .iter()
            .map(|(account, slot)| (account.clone(), *slot.lock()))
            .collect();
        balances.sort_by(|a, b| a.0.cmp(&b.0));
        balances
    }

    fn granularity(&self) -> LockGranularity {
        LockGranularity::PerAccount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn balances() -> HashMap<AccountNumber, Decimal> {
        HashMap::from([
            (AccountNumber::parse("2").unwrap(), dec!(5.00)),
            (AccountNumber::parse("1").unwrap(), dec!(1.00)),
        ])
    }

    fn stores() -> Vec<Box<dyn BalanceStore>> {
        vec![
            new_store(LockGranularity::Global, balances()),
            new_store(LockGranularity::PerAccount, balances()),
        ]
    }

    #[test]
    fn test_granularity_parse() {
        assert_eq!("global".parse::<LockGranularity>().unwrap(), LockGranularity::Global);
        assert_eq!(
            "Per-Account".parse::<LockGranularity>().unwrap(),
            LockGranularity::PerAccount
        );
        assert!("sharded".parse::<LockGranularity>().is_err());
        assert_eq!(LockGranularity::default(), LockGranularity::Global);
    }

    #[test]
    fn test_update_commits_on_ok() {
        for store in stores() {
            let one = AccountNumber::parse("1").unwrap();
            let next = store.update(&one, &mut |b| Ok(b + dec!(2.50))).unwrap();
            assert_eq!(next, dec!(3.50));
            assert_eq!(store.read(&one), Some(dec!(3.50)));
        }
    }

    #[test]
    fn test_update_rolls_back_on_err() {
        for store in stores() {
            let two = AccountNumber::parse("2").unwrap();
            let result = store.update(&two, &mut |_| Err(LedgerError::MissingBody));
            assert_eq!(result, Err(LedgerError::MissingBody));
            assert_eq!(store.read(&two), Some(dec!(5.00)));
        }
    }

    #[test]
    fn test_unknown_account() {
        for store in stores() {
            let missing = AccountNumber::parse("9").unwrap();
            assert!(!store.contains(&missing));
            assert_eq!(store.read(&missing), None);
            assert_eq!(
                store.update(&missing, &mut |b| Ok(b)),
                Err(LedgerError::AccountNotFound(missing.clone()))
            );
        }
    }

    #[test]
    fn test_sorted_listing() {
        for store in stores() {
            let accounts: Vec<_> = store.accounts().iter().map(|a| a.to_string()).collect();
            assert_eq!(accounts, vec!["1", "2"]);

            let snapshot = store.snapshot();
            assert_eq!(snapshot[0].1, dec!(1.00));
            assert_eq!(snapshot[1].1, dec!(5.00));
        }
    }
}
