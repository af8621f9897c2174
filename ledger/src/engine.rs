//! Core ledger engine implementation.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use atm_common::{quantize, AccountNumber, Amount, LedgerError, Result};

use crate::account::{seed_accounts, Account};
use crate::balance::AccountBalance;
use crate::receipt::{EntryType, TransactionReceipt};
use crate::store::{new_store, BalanceStore, LockGranularity};

/// The account ledger: fixed accounts with balances that change only through
/// [`Ledger::credit`] and [`Ledger::debit`].
///
/// Each mutation is a single critical section on the backing
/// [`BalanceStore`], so the balance check of a debit and its write can never
/// be separated by another mutation. The ledger owns no global state; share it
/// behind an `Arc`.
pub struct Ledger {
    store: Box<dyn BalanceStore>,
}

impl Ledger {
    /// Create a ledger from explicit accounts.
    ///
    /// Fails if an account appears twice or opens with a negative balance.
    pub fn new(
        granularity: LockGranularity,
        accounts: impl IntoIterator<Item = Account>,
    ) -> Result<Self> {
        let mut balances = HashMap::new();

        for account in accounts {
            if account.opening_balance < Decimal::ZERO {
                return Err(LedgerError::ConfigurationError(format!(
                    "account {} opens with negative balance {}",
                    account.number, account.opening_balance
                )));
            }
            let number = account.number.clone();
            if balances
                .insert(account.number, quantize(account.opening_balance))
                .is_some()
            {
                return Err(LedgerError::ConfigurationError(format!(
                    "duplicate account {number}"
                )));
            }
        }

        info!(
            accounts = balances.len(),
            granularity = %granularity,
            "Ledger initialized"
        );

        Ok(Self {
            store: new_store(granularity, balances),
        })
    }

    /// Create a ledger holding the standard seed accounts.
    pub fn with_seed_accounts(granularity: LockGranularity) -> Result<Self> {
        Self::new(granularity, seed_accounts()?)
    }

    /// Get account balance.
    pub fn get_balance(&self, account: &AccountNumber) -> Result<AccountBalance> {
        let balance = self
            .store
            .read(account)
            .ok_or_else(|| LedgerError::AccountNotFound(account.clone()))?;

        Ok(AccountBalance {
            account_number: account.clone(),
            balance: quantize(balance),
        })
    }

    /// Credit an account (increase balance).
    #[instrument(skip(self, amount), fields(amount = %amount))]
    pub fn credit(&self, account: &AccountNumber, amount: Amount) -> Result<TransactionReceipt> {
        let balance_after = self.store.update(account, &mut |current| {
            current
                .checked_add(amount.value())
                .map(quantize)
                .ok_or_else(|| LedgerError::BalanceOverflow(account.clone()))
        })?;

        info!(
            account = %account,
            amount = %amount,
            balance = %balance_after,
            "Account credited"
        );

        Ok(TransactionReceipt {
            account_number: account.clone(),
            entry_type: EntryType::Credit,
            amount,
            balance_after,
        })
    }

    /// Debit an account (reduce balance).
    ///
    /// The funds check runs inside the critical section against the balance
    /// held at that moment.
    #[instrument(skip(self, amount), fields(amount = %amount))]
    pub fn debit(&self, account: &AccountNumber, amount: Amount) -> Result<TransactionReceipt> {
        let result = self.store.update(account, &mut |current| {
            if current < amount.value() {
                return Err(LedgerError::InsufficientFunds {
                    account: account.clone(),
                    requested: amount.value(),
                    available: current,
                });
            }
            Ok(quantize(current - amount.value()))
        });

        let balance_after = match result {
            Ok(balance) => balance,
            Err(e @ LedgerError::InsufficientFunds { .. }) => {
                warn!(account = %account, amount = %amount, "Debit rejected: insufficient funds");
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        info!(
            account = %account,
            amount = %amount,
            balance = %balance_after,
            "Account debited"
        );

        Ok(TransactionReceipt {
            account_number: account.clone(),
            entry_type: EntryType::Debit,
            amount,
            balance_after,
        })
    }

    /// Check if the account exists. Accounts are never removed.
    pub fn contains(&self, account: &AccountNumber) -> bool {
        self.store.contains(account)
    }

    /// All account numbers, sorted.
    pub fn accounts(&self) -> Vec<AccountNumber> {
        self.store.accounts()
    }

    /// All balances, sorted by account number.
    pub fn snapshot(&self) -> Vec<AccountBalance> {
        self.store
            .snapshot()
            .into_iter()
            .map(|(account_number, balance)| AccountBalance {
                account_number,
                balance: quantize(balance),
            })
            .collect()
    }

    /// Locking strategy in use.
    pub fn granularity(&self) -> LockGranularity {
        self.store.granularity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    const GRANULARITIES: [LockGranularity; 2] =
        [LockGranularity::Global, LockGranularity::PerAccount];

    fn seeded() -> Ledger {
        Ledger::with_seed_accounts(LockGranularity::default()).unwrap()
    }

    fn account(n: &str) -> AccountNumber {
        AccountNumber::parse(n).unwrap()
    }

    fn amount(s: &str) -> Amount {
        Amount::parse(s).unwrap()
    }

    #[test]
    fn test_seed_balances() {
        for granularity in GRANULARITIES {
            let ledger = Ledger::with_seed_accounts(granularity).unwrap();

            assert_eq!(ledger.granularity(), granularity);
            assert_eq!(ledger.accounts().len(), 3);
            assert_eq!(ledger.get_balance(&account("1001")).unwrap().balance, dec!(250.00));
            assert_eq!(ledger.get_balance(&account("1002")).unwrap().balance, dec!(0.00));
            assert_eq!(ledger.get_balance(&account("1003")).unwrap().balance, dec!(999.99));
        }
    }

    #[test]
    fn test_deposit_withdraw_scenario() {
        for granularity in GRANULARITIES {
            let ledger = Ledger::with_seed_accounts(granularity).unwrap();
            let id = account("1002");

            let receipt = ledger.credit(&id, amount("50.00")).unwrap();
            assert_eq!(receipt.entry_type, EntryType::Credit);
            assert_eq!(receipt.balance_after, dec!(50.00));

            let receipt = ledger.debit(&id, amount("20.00")).unwrap();
            assert_eq!(receipt.entry_type, EntryType::Debit);
            assert_eq!(receipt.amount.value(), dec!(20.00));
            assert_eq!(receipt.balance_after, dec!(30.00));

            let err = ledger.debit(&id, amount("31.00")).unwrap_err();
            assert_eq!(
                err,
                LedgerError::InsufficientFunds {
                    account: id.clone(),
                    requested: dec!(31.00),
                    available: dec!(30.00),
                }
            );
            assert_eq!(ledger.get_balance(&id).unwrap().balance, dec!(30.00));
        }
    }

    #[test]
    fn test_withdraw_entire_balance() {
        let ledger = seeded();
        let id = account("1003");

        let receipt = ledger.debit(&id, amount("999.99")).unwrap();
        assert_eq!(receipt.balance_after, dec!(0.00));
        assert_eq!(receipt.balance_after.to_string(), "0.00");
    }

    #[test]
    fn test_rounding_on_credit() {
        let ledger = seeded();
        let id = account("1002");

        ledger.credit(&id, amount("0.005")).unwrap();
        assert_eq!(ledger.get_balance(&id).unwrap().balance, dec!(0.01));

        let before = ledger.get_balance(&account("1001")).unwrap().balance;
        let receipt = ledger.credit(&account("1001"), amount("10.004")).unwrap();
        assert_eq!(receipt.amount.value(), dec!(10.00));
        assert_eq!(receipt.balance_after - before, dec!(10.00));
    }

    #[test]
    fn test_unknown_account() {
        let ledger = seeded();
        let missing = account("9999");

        assert!(!ledger.contains(&missing));
        assert_eq!(
            ledger.get_balance(&missing),
            Err(LedgerError::AccountNotFound(missing.clone()))
        );
        assert_eq!(
            ledger.credit(&missing, amount("1")),
            Err(LedgerError::AccountNotFound(missing.clone()))
        );
        assert_eq!(
            ledger.debit(&missing, amount("1")),
            Err(LedgerError::AccountNotFound(missing))
        );
    }

    #[test]
    fn test_reads_are_idempotent() {
        let ledger = seeded();
        let id = account("1003");

        let first = ledger.get_balance(&id).unwrap();
        let second = ledger.get_balance(&id).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_credit_overflow_leaves_balance() {
        let id = account("7");
        let ledger = Ledger::new(
            LockGranularity::Global,
            [Account::new(id.clone(), Decimal::MAX - dec!(1))],
        )
        .unwrap();
        let before = ledger.get_balance(&id).unwrap().balance;

        let huge = Amount::new(Decimal::MAX - dec!(1)).unwrap();
        assert_eq!(
            ledger.credit(&id, huge),
            Err(LedgerError::BalanceOverflow(id.clone()))
        );
        assert_eq!(ledger.get_balance(&id).unwrap().balance, before);
    }

    #[test]
    fn test_new_rejects_bad_accounts() {
        let negative = Ledger::new(
            LockGranularity::Global,
            [Account::new(account("1"), dec!(-1))],
        );
        assert!(matches!(negative, Err(LedgerError::ConfigurationError(_))));

        let duplicate = Ledger::new(
            LockGranularity::Global,
            [
                Account::new(account("1"), dec!(1)),
                Account::new(account("1"), dec!(2)),
            ],
        );
        assert!(matches!(duplicate, Err(LedgerError::ConfigurationError(_))));
    }

    #[test]
    fn test_snapshot_sorted() {
        let ledger = seeded();
        let snapshot = ledger.snapshot();

        let numbers: Vec<_> = snapshot.iter().map(|b| b.account_number.to_string()).collect();
        assert_eq!(numbers, vec!["1001", "1002", "1003"]);
        assert_eq!(ledger.accounts().len(), 3);
    }

    #[test]
    fn test_concurrent_deposits_no_lost_updates() {
        for granularity in GRANULARITIES {
            let ledger = Arc::new(Ledger::with_seed_accounts(granularity).unwrap());
            let id = account("1001");
            let threads = 8;
            let per_thread = 250;

            std::thread::scope(|scope| {
                for _ in 0..threads {
                    let ledger = ledger.clone();
                    let id = id.clone();
                    scope.spawn(move || {
                        for _ in 0..per_thread {
                            ledger.credit(&id, amount("0.01")).unwrap();
                        }
                    });
                }
            });

            // 250.00 + 8 * 250 * 0.01
            assert_eq!(ledger.get_balance(&id).unwrap().balance, dec!(270.00));
        }
    }

    #[test]
    fn test_concurrent_withdrawals_never_overdraw() {
        for granularity in GRANULARITIES {
            let ledger = Arc::new(Ledger::with_seed_accounts(granularity).unwrap());
            let id = account("1001");

            let successes: usize = std::thread::scope(|scope| {
                let handles: Vec<_> = (0..16)
                    .map(|_| {
                        let ledger = ledger.clone();
                        let id = id.clone();
                        scope.spawn(move || {
                            (0..10)
                                .filter(|_| ledger.debit(&id, amount("3.00")).is_ok())
                                .count()
                        })
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).sum()
            });

            // 250.00 / 3.00 = 83 whole withdrawals, 1.00 left over.
            assert_eq!(successes, 83);
            assert_eq!(ledger.get_balance(&id).unwrap().balance, dec!(1.00));
        }
    }
}
