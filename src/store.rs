// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Ledger store: account rows, unique indices and the transaction log.
//!
//! Each account row lives behind its own [`RwLock`]. A mutating operation
//! takes the row's *upgradable* read lock, which is exclusive among writers
//! but still lets plain readers through, and holds it for the whole
//! [`UnitOfWork`]. On commit every held lock is upgraded to a write lock,
//! staged changes are applied, and all locks are released together. Readers
//! therefore only ever observe committed row state.
//!
//! # Lock discipline
//!
//! - A [`DashMap`] shard guard is never held while waiting on a row lock.
//!   Rows are cloned out of the index first, then locked.
//! - Callers locking more than one row in a unit of work must lock them in
//!   ascending IBAN order.
//!
//! Rows removed by a delete are tombstoned before they leave the index, so a
//! caller that was queued on a row's lock sees the account as gone.

use crate::account::Account;
use crate::base::{AccountId, TransactionId};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, StorageError};
use crate::transaction::{AccountTransaction, TransactionKind};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::{ArcRwLockUpgradableReadGuard, ArcRwLockWriteGuard, RawRwLock, RwLock};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

type Row = Arc<RwLock<RowState>>;
type RowGuard = ArcRwLockUpgradableReadGuard<RawRwLock, RowState>;
type RowWriteGuard = ArcRwLockWriteGuard<RawRwLock, RowState>;

#[derive(Debug)]
struct RowState {
    account: Account,
    /// Oldest first; appended under the row's write lock only.
    history: Vec<AccountTransaction>,
    deleted: bool,
}

impl RowState {
    fn new(account: Account) -> Self {
        Self {
            account,
            history: Vec::new(),
            deleted: false,
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.account.balance >= Decimal::ZERO,
            "Invariant violated: balance of {} went negative: {}",
            self.account.iban,
            self.account.balance
        );
        debug_assert!(
            self.history
                .last()
                .is_none_or(|tx| tx.balance_after == self.account.balance),
            "Invariant violated: last entry of {} disagrees with balance",
            self.account.iban
        );
    }
}

/// In-memory ledger storage with per-row exclusive locks.
#[derive(Debug)]
pub struct LedgerStore {
    config: LedgerConfig,
    /// Unique index on IBAN.
    accounts: DashMap<String, Row>,
    /// Unique index on account number, mapping to the owning IBAN.
    account_numbers: DashMap<String, String>,
    next_account_id: AtomicU64,
    next_transaction_id: AtomicU64,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    pub fn with_config(config: LedgerConfig) -> Self {
        Self {
            config,
            accounts: DashMap::new(),
            account_numbers: DashMap::new(),
            next_account_id: AtomicU64::new(1),
            next_transaction_id: AtomicU64::new(1),
        }
    }

    /// Inserts a new account row, checking both unique indices atomically
    /// with the insert.
    ///
    /// The IBAN index is checked first, so an input clashing on both keys
    /// reports [`LedgerError::DuplicateIban`].
    pub fn insert_account(
        &self,
        iban: &str,
        account_number: &str,
        balance: Decimal,
    ) -> Result<Account, LedgerError> {
        // Both index entries stay locked until the row is in place. The IBAN
        // index is always entered before the account-number index.
        let Entry::Vacant(iban_slot) = self.accounts.entry(iban.to_string()) else {
            return Err(LedgerError::DuplicateIban(iban.to_string()));
        };
        let Entry::Vacant(number_slot) = self.account_numbers.entry(account_number.to_string())
        else {
            return Err(LedgerError::DuplicateAccountNumber(
                account_number.to_string(),
            ));
        };

        let account = Account {
            id: AccountId(self.next_account_id.fetch_add(1, Ordering::Relaxed)),
            iban: iban.to_string(),
            account_number: account_number.to_string(),
            balance,
        };
        number_slot.insert(iban.to_string());
        iban_slot.insert(Arc::new(RwLock::new(RowState::new(account.clone()))));
        Ok(account)
    }

    /// Returns the committed state of an account without taking its
    /// exclusive lock.
    pub fn account(&self, iban: &str) -> Result<Account, LedgerError> {
        let row = self.row(iban)?;
        let state = row.read();
        if state.deleted {
            return Err(LedgerError::AccountNotFound(iban.to_string()));
        }
        Ok(state.account.clone())
    }

    /// Returns an account's transactions, newest first.
    pub fn history(&self, iban: &str) -> Result<Vec<AccountTransaction>, LedgerError> {
        let row = self.row(iban)?;
        let state = row.read();
        if state.deleted {
            return Err(LedgerError::AccountNotFound(iban.to_string()));
        }
        Ok(state.history.iter().rev().cloned().collect())
    }

    /// Returns a snapshot of every live account, in index order.
    pub fn accounts(&self) -> Vec<Account> {
        let rows: Vec<Row> = self
            .accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        rows.iter()
            .filter_map(|row| {
                let state = row.read();
                (!state.deleted).then(|| state.account.clone())
            })
            .collect()
    }

    /// Starts a unit of work. Nothing it stages becomes visible until
    /// [`UnitOfWork::commit`]; dropping it discards everything.
    pub fn begin(&self) -> UnitOfWork<'_> {
        UnitOfWork {
            store: self,
            rows: Vec::new(),
            postings: Vec::new(),
        }
    }

    fn row(&self, iban: &str) -> Result<Row, LedgerError> {
        self.accounts
            .get(iban)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LedgerError::AccountNotFound(iban.to_string()))
    }

    fn lock_row(
        &self,
        row: &Row,
        iban: &str,
    ) -> Result<RowGuard, LedgerError> {
        match self.config.lock_timeout {
            None => Ok(row.upgradable_read_arc()),
            Some(timeout) => row.try_upgradable_read_arc_for(timeout).ok_or_else(|| {
                StorageError::LockTimeout {
                    iban: iban.to_string(),
                    waited: timeout,
                }
                .into()
            }),
        }
    }

    fn next_transaction_id(&self) -> TransactionId {
        TransactionId(self.next_transaction_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Drops a tombstoned row from both indices.
    fn unlink(&self, row: &Row, iban: &str, account_number: &str) {
        self.account_numbers
            .remove_if(account_number, |_, owner| owner == iban);
        self.accounts
            .remove_if(iban, |_, indexed| Arc::ptr_eq(indexed, row));
    }
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A balance change staged against a locked account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub counterparty_iban: Option<String>,
    /// New balance of the account; also recorded on the log entry.
    pub balance_after: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Handle to an account locked by a [`UnitOfWork`].
///
/// Carries the account as it was when the lock was granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedAccount {
    slot: usize,
    account: Account,
}

impl LockedAccount {
    pub fn iban(&self) -> &str {
        &self.account.iban
    }

    pub fn balance(&self) -> Decimal {
        self.account.balance
    }
}

struct LockedRow {
    row: Row,
    guard: RowGuard,
    delete: bool,
}

/// An all-or-nothing group of row locks and staged writes.
pub struct UnitOfWork<'s> {
    store: &'s LedgerStore,
    /// In lock acquisition order.
    rows: Vec<LockedRow>,
    /// Staged postings in call order, keyed by slot in `rows`.
    postings: Vec<(usize, Posting)>,
}

impl UnitOfWork<'_> {
    /// Acquires the exclusive lock on an account row, blocking until it is
    /// free or the configured timeout elapses.
    ///
    /// Locking an account this unit of work already holds returns the
    /// existing handle, with any staged balance applied.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AccountNotFound`] if no live account has this IBAN.
    /// - [`LedgerError::Storage`] if the lock timed out.
    pub fn lock(&mut self, iban: &str) -> Result<LockedAccount, LedgerError> {
        if let Some(slot) = self
            .rows
            .iter()
            .position(|locked| locked.guard.account.iban == iban)
        {
            let mut account = self.rows[slot].guard.account.clone();
            if let Some((_, posting)) = self.postings.iter().rev().find(|(s, _)| *s == slot) {
                account.balance = posting.balance_after;
            }
            return Ok(LockedAccount { slot, account });
        }

        let row = self.store.row(iban)?;
        let guard = self.store.lock_row(&row, iban)?;
        if guard.deleted {
            return Err(LedgerError::AccountNotFound(iban.to_string()));
        }

        let account = guard.account.clone();
        self.rows.push(LockedRow {
            row,
            guard,
            delete: false,
        });
        Ok(LockedAccount {
            slot: self.rows.len() - 1,
            account,
        })
    }

    /// Stages a balance change and its log entry.
    pub fn post(&mut self, locked: &LockedAccount, posting: Posting) {
        debug_assert!(posting.amount > Decimal::ZERO);
        debug_assert!(posting.balance_after >= Decimal::ZERO);
        self.postings.push((locked.slot, posting));
    }

    /// Stages removal of the account together with its whole history.
    pub fn delete(&mut self, locked: &LockedAccount) {
        self.rows[locked.slot].delete = true;
    }

    /// Applies every staged change and releases all locks.
    ///
    /// Returns the log entries written, in posting order.
    pub fn commit(self) -> Vec<AccountTransaction> {
        let store = self.store;
        let postings = self.postings;

        // Upgrade every dirty row, in lock order, before touching any, so
        // readers see either none or all of this unit of work. Clean rows
        // are released right away.
        let mut upgraded: Vec<Option<(RowWriteGuard, Row, bool)>> = self
            .rows
            .into_iter()
            .enumerate()
            .map(|(slot, locked)| {
                let dirty = locked.delete || postings.iter().any(|(s, _)| *s == slot);
                dirty.then(|| {
                    (
                        ArcRwLockUpgradableReadGuard::upgrade(locked.guard),
                        locked.row,
                        locked.delete,
                    )
                })
            })
            .collect();

        let mut written = Vec::with_capacity(postings.len());
        for (slot, posting) in postings {
            let Some((state, _, _)) = upgraded[slot].as_mut() else {
                continue;
            };
            let transaction = AccountTransaction {
                id: store.next_transaction_id(),
                account_id: state.account.id,
                iban: state.account.iban.clone(),
                kind: posting.kind,
                amount: posting.amount,
                counterparty_iban: posting.counterparty_iban,
                balance_after: posting.balance_after,
                created_at: posting.created_at,
            };
            state.account.balance = posting.balance_after;
            state.history.push(transaction.clone());
            written.push(transaction);
        }

        let mut unlinked = Vec::new();
        for (state, row, delete) in upgraded.iter_mut().flatten() {
            if *delete {
                // History goes first, then the account itself.
                state.history.clear();
                state.deleted = true;
                unlinked.push((
                    Arc::clone(row),
                    state.account.iban.clone(),
                    state.account.account_number.clone(),
                ));
            } else {
                state.assert_invariants();
            }
        }
        drop(upgraded);

        for (row, iban, account_number) in unlinked {
            store.unlink(&row, &iban, &account_number);
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::thread;
    use std::time::Duration;

    fn posting(kind: TransactionKind, amount: Decimal, balance_after: Decimal) -> Posting {
        Posting {
            kind,
            amount,
            counterparty_iban: None,
            balance_after,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn insert_assigns_increasing_ids() {
        let store = LedgerStore::new();
        let a = store.insert_account("GR0001", "AN0001", dec!(0.00)).unwrap();
        let b = store.insert_account("GR0002", "AN0002", dec!(0.00)).unwrap();
        assert!(a.id < b.id);
    }

    #[test]
    fn insert_rejects_duplicate_keys() {
        let store = LedgerStore::new();
        store.insert_account("GR0001", "AN0001", dec!(0.00)).unwrap();

        assert_eq!(
            store.insert_account("GR0001", "AN0002", dec!(0.00)),
            Err(LedgerError::DuplicateIban("GR0001".into()))
        );
        assert_eq!(
            store.insert_account("GR0002", "AN0001", dec!(0.00)),
            Err(LedgerError::DuplicateAccountNumber("AN0001".into()))
        );
        // The failed inserts leave no trace in either index.
        assert_eq!(store.accounts().len(), 1);
        assert!(store.insert_account("GR0002", "AN0002", dec!(0.00)).is_ok());
    }

    #[test]
    fn iban_clash_is_reported_before_account_number_clash() {
        let store = LedgerStore::new();
        store.insert_account("GR0001", "AN0001", dec!(0.00)).unwrap();
        assert_eq!(
            store.insert_account("GR0001", "AN0001", dec!(0.00)),
            Err(LedgerError::DuplicateIban("GR0001".into()))
        );
    }

    #[test]
    fn uncommitted_work_is_discarded() {
        let store = LedgerStore::new();
        store.insert_account("GR0001", "AN0001", dec!(10.00)).unwrap();

        {
            let mut uow = store.begin();
            let locked = uow.lock("GR0001").unwrap();
            uow.post(
                &locked,
                posting(TransactionKind::Deposit, dec!(5.00), dec!(15.00)),
            );
        }

        assert_eq!(store.account("GR0001").unwrap().balance, dec!(10.00));
        assert!(store.history("GR0001").unwrap().is_empty());
    }

    #[test]
    fn commit_applies_balance_and_log_entry() {
        let store = LedgerStore::new();
        store.insert_account("GR0001", "AN0001", dec!(10.00)).unwrap();

        let mut uow = store.begin();
        let locked = uow.lock("GR0001").unwrap();
        uow.post(
            &locked,
            posting(TransactionKind::Deposit, dec!(5.00), dec!(15.00)),
        );
        let written = uow.commit();

        assert_eq!(written.len(), 1);
        assert_eq!(store.account("GR0001").unwrap().balance, dec!(15.00));
        assert_eq!(store.history("GR0001").unwrap(), written);
    }

    #[test]
    fn history_is_newest_first() {
        let store = LedgerStore::new();
        store.insert_account("GR0001", "AN0001", dec!(0.00)).unwrap();

        for (amount, after) in [(dec!(1.00), dec!(1.00)), (dec!(2.00), dec!(3.00))] {
            let mut uow = store.begin();
            let locked = uow.lock("GR0001").unwrap();
            uow.post(&locked, posting(TransactionKind::Deposit, amount, after));
            uow.commit();
        }

        let history = store.history("GR0001").unwrap();
        assert_eq!(history[0].balance_after, dec!(3.00));
        assert_eq!(history[1].balance_after, dec!(1.00));
        assert!(history[0].id > history[1].id);
    }

    #[test]
    fn relocking_returns_staged_balance() {
        let store = LedgerStore::new();
        store.insert_account("GR0001", "AN0001", dec!(10.00)).unwrap();

        let mut uow = store.begin();
        let first = uow.lock("GR0001").unwrap();
        uow.post(
            &first,
            posting(TransactionKind::Withdraw, dec!(4.00), dec!(6.00)),
        );
        let again = uow.lock("GR0001").unwrap();
        assert_eq!(again.balance(), dec!(6.00));
    }

    #[test]
    fn delete_removes_row_history_and_indices() {
        let store = LedgerStore::new();
        store.insert_account("GR0001", "AN0001", dec!(10.00)).unwrap();

        let mut uow = store.begin();
        let locked = uow.lock("GR0001").unwrap();
        uow.post(
            &locked,
            posting(TransactionKind::Deposit, dec!(5.00), dec!(15.00)),
        );
        uow.commit();

        let mut uow = store.begin();
        let locked = uow.lock("GR0001").unwrap();
        uow.delete(&locked);
        uow.commit();

        assert_eq!(
            store.account("GR0001"),
            Err(LedgerError::AccountNotFound("GR0001".into()))
        );
        assert_eq!(
            store.history("GR0001"),
            Err(LedgerError::AccountNotFound("GR0001".into()))
        );
        assert!(store.accounts().is_empty());
        // Both keys are free again.
        assert!(store.insert_account("GR0001", "AN0001", dec!(0.00)).is_ok());
    }

    #[test]
    fn readers_are_not_blocked_by_exclusive_lock() {
        let store = LedgerStore::new();
        store.insert_account("GR0001", "AN0001", dec!(10.00)).unwrap();

        let mut uow = store.begin();
        let locked = uow.lock("GR0001").unwrap();
        uow.post(
            &locked,
            posting(TransactionKind::Deposit, dec!(5.00), dec!(15.00)),
        );

        // Lock held: reads succeed and see the committed balance.
        assert_eq!(store.account("GR0001").unwrap().balance, dec!(10.00));
        uow.commit();
        assert_eq!(store.account("GR0001").unwrap().balance, dec!(15.00));
    }

    #[test]
    fn lock_timeout_is_a_storage_error() {
        let store = Arc::new(LedgerStore::with_config(
            LedgerConfig::default().with_lock_timeout(Duration::from_millis(20)),
        ));
        store.insert_account("GR0001", "AN0001", dec!(10.00)).unwrap();

        let mut holder = store.begin();
        holder.lock("GR0001").unwrap();

        let contender = Arc::clone(&store);
        let result = thread::spawn(move || {
            let mut uow = contender.begin();
            uow.lock("GR0001").map(|_| ())
        })
        .join()
        .unwrap();

        assert_eq!(
            result,
            Err(LedgerError::Storage(StorageError::LockTimeout {
                iban: "GR0001".into(),
                waited: Duration::from_millis(20),
            }))
        );
    }

    #[test]
    fn waiter_on_deleted_row_sees_not_found() {
        let store = Arc::new(LedgerStore::new());
        store.insert_account("GR0001", "AN0001", dec!(10.00)).unwrap();

        let mut deleter = store.begin();
        let locked = deleter.lock("GR0001").unwrap();
        deleter.delete(&locked);

        let waiter_store = Arc::clone(&store);
        let waiter = thread::spawn(move || {
            let mut uow = waiter_store.begin();
            uow.lock("GR0001").map(|_| ())
        });

        thread::sleep(Duration::from_millis(50));
        deleter.commit();

        assert_eq!(
            waiter.join().unwrap(),
            Err(LedgerError::AccountNotFound("GR0001".into()))
        );
    }
}
