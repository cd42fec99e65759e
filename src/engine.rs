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

//! Money-movement engine.
//!
//! The [`Engine`] moves money into, out of, and between accounts. Every
//! operation runs as one [`UnitOfWork`](crate::store::UnitOfWork): the
//! touched rows are locked, the new balances are computed from the locked
//! state, and balances plus log entries are committed together. Any failure
//! after a lock is taken drops the unit of work, leaving storage as it was.
//!
//! # Lock ordering
//!
//! A transfer locks the lexicographically smaller IBAN first. Every
//! transfer agrees on this order, so two transfers over the same pair of
//! accounts cannot each hold the lock the other is waiting for.

use crate::base::{add_money, positive_amount, sub_money};
use crate::error::LedgerError;
use crate::store::{LedgerStore, LockedAccount, Posting, UnitOfWork};
use crate::transaction::{AccountTransaction, TransactionKind};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Deposit, withdraw and transfer over a shared [`LedgerStore`].
///
/// Each method returns the log entries it wrote: one for a deposit or
/// withdrawal, two (source leg first) for a transfer.
///
/// # Invariants
///
/// - No balance is ever negative at a commit point.
/// - Every balance change is committed with a log entry whose
///   `balance_after` equals the new balance.
#[derive(Debug, Clone)]
pub struct Engine {
    store: Arc<LedgerStore>,
}

impl Engine {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Engine { store }
    }

    /// Credits `amount` to the account.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - Amount is not positive.
    /// - [`LedgerError::AccountNotFound`] - No account with this IBAN.
    /// - [`LedgerError::BalanceOverflow`] - The new balance cannot be held exactly.
    pub fn deposit(
        &self,
        iban: &str,
        amount: Decimal,
    ) -> Result<Vec<AccountTransaction>, LedgerError> {
        let amount = positive_amount(amount)?;

        let mut uow = self.store.begin();
        let account = uow.lock(iban)?;
        let balance_after = credit(&account, amount)?;
        uow.post(
            &account,
            Posting {
                kind: TransactionKind::Deposit,
                amount,
                counterparty_iban: None,
                balance_after,
                created_at: Utc::now(),
            },
        );
        Ok(uow.commit())
    }

    /// Debits `amount` from the account.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - Amount is not positive.
    /// - [`LedgerError::AccountNotFound`] - No account with this IBAN.
    /// - [`LedgerError::InsufficientBalance`] - Amount exceeds the balance.
    pub fn withdraw(
        &self,
        iban: &str,
        amount: Decimal,
    ) -> Result<Vec<AccountTransaction>, LedgerError> {
        let amount = positive_amount(amount)?;

        let mut uow = self.store.begin();
        let account = uow.lock(iban)?;
        let balance_after = debit(&account, amount)?;
        uow.post(
            &account,
            Posting {
                kind: TransactionKind::Withdraw,
                amount,
                counterparty_iban: None,
                balance_after,
                created_at: Utc::now(),
            },
        );
        Ok(uow.commit())
    }

    /// Moves `amount` from one account to another.
    ///
    /// Both legs share one timestamp and commit together.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - Amount is not positive.
    /// - [`LedgerError::InvalidTransfer`] - Source and destination are the same IBAN.
    /// - [`LedgerError::AccountNotFound`] - Either IBAN is unknown (the error names which).
    /// - [`LedgerError::InsufficientBalance`] - Amount exceeds the source balance.
    /// - [`LedgerError::BalanceOverflow`] - The destination balance cannot be held exactly.
    pub fn transfer(
        &self,
        from_iban: &str,
        to_iban: &str,
        amount: Decimal,
    ) -> Result<Vec<AccountTransaction>, LedgerError> {
        let amount = positive_amount(amount)?;
        if from_iban == to_iban {
            return Err(LedgerError::InvalidTransfer(from_iban.to_string()));
        }

        let mut uow = self.store.begin();
        let (source, destination) = lock_pair(&mut uow, from_iban, to_iban)?;

        let source_after = debit(&source, amount)?;
        let destination_after = credit(&destination, amount)?;
        let created_at = Utc::now();

        uow.post(
            &source,
            Posting {
                kind: TransactionKind::TransferOut,
                amount,
                counterparty_iban: Some(to_iban.to_string()),
                balance_after: source_after,
                created_at,
            },
        );
        uow.post(
            &destination,
            Posting {
                kind: TransactionKind::TransferIn,
                amount,
                counterparty_iban: Some(from_iban.to_string()),
                balance_after: destination_after,
                created_at,
            },
        );
        Ok(uow.commit())
    }
}

/// Locks both transfer participants, smaller IBAN first, and returns them as
/// `(source, destination)`.
fn lock_pair(
    uow: &mut UnitOfWork<'_>,
    from_iban: &str,
    to_iban: &str,
) -> Result<(LockedAccount, LockedAccount), LedgerError> {
    if from_iban < to_iban {
        let source = uow.lock(from_iban)?;
        let destination = uow.lock(to_iban)?;
        Ok((source, destination))
    } else {
        let destination = uow.lock(to_iban)?;
        let source = uow.lock(from_iban)?;
        Ok((source, destination))
    }
}

fn debit(account: &LockedAccount, amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount > account.balance() {
        return Err(LedgerError::InsufficientBalance {
            available: account.balance(),
        });
    }
    sub_money(account.balance(), amount)
        .ok_or_else(|| LedgerError::BalanceOverflow(account.iban().to_string()))
}

fn credit(account: &LockedAccount, amount: Decimal) -> Result<Decimal, LedgerError> {
    add_money(account.balance(), amount)
        .ok_or_else(|| LedgerError::BalanceOverflow(account.iban().to_string()))
}
