//! ATM Ledger Engine
//!
//! Volatile account ledger. Balances are exact two-place decimals and every
//! credit or debit is applied as one critical section, so concurrent callers
//! always observe a serializable history.

pub mod engine;
pub mod account;
pub mod store;
pub mod receipt;
pub mod balance;

pub use engine::Ledger;
pub use account::{seed_accounts, Account};
pub use store::{BalanceStore, LockGranularity};
pub use receipt::{EntryType, TransactionReceipt};
pub use balance::AccountBalance;
