//! Balance ledger trait.

use crate::StoreError;
use tcr_types::{Address, Amount};

/// `RegistryCoin` balances per account.
///
/// The registry escrows bonds and vote power through `debit` and pays
/// every reward or refund through `credit`.
pub trait BalanceStore {
    /// Current balance; unknown accounts hold zero.
    fn balance(&self, address: &Address) -> Result<Amount, StoreError>;

    /// Add `amount` to an account.
    fn credit(&self, address: &Address, amount: Amount) -> Result<(), StoreError>;

    /// Remove `amount` from an account.
    ///
    /// Fails with [`StoreError::InsufficientFunds`] without writing anything
    /// when the balance is too small.
    fn debit(&self, address: &Address, amount: Amount) -> Result<(), StoreError>;

    /// All non-zero balances in address order (used for state export).
    fn iter_balances(&self) -> Result<Vec<(Address, Amount)>, StoreError>;
}
