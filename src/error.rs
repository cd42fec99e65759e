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

//! Error types for ledger operations.
//!
//! Business-rule violations are deterministic: repeating the same call with
//! the same inputs reproduces the same failure, so none of them is retried.
//! Infrastructure faults are kept apart in [`StorageError`].

use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

/// Ledger operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// An account with this IBAN already exists
    #[error("account with IBAN {0} already exists")]
    DuplicateIban(String),

    /// An account with this account number already exists
    #[error("account with account number {0} already exists")]
    DuplicateAccountNumber(String),

    /// No account exists for the IBAN
    #[error("account with IBAN {0} not found")]
    AccountNotFound(String),

    /// Amount is zero, negative, or finer than one cent
    #[error("invalid amount {0:.2} (must be positive, in whole cents)")]
    InvalidAmount(Decimal),

    /// Withdrawal or transfer exceeds the available balance
    #[error("insufficient balance, available: {available:.2}")]
    InsufficientBalance { available: Decimal },

    /// Crediting the account would push its balance past what can be held
    /// exactly in whole cents
    #[error("balance of account {0} would exceed the supported range")]
    BalanceOverflow(String),

    /// Transfer source and destination are the same account
    #[error("cannot transfer from account {0} to itself")]
    InvalidTransfer(String),

    /// Input rejected by boundary validation
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// The store failed to complete the unit of work
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl LedgerError {
    /// Returns `true` for infrastructure faults, which a boundary may treat
    /// as fatal or retry at its discretion.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

/// Infrastructure faults raised by the ledger store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Exclusive row lock was not granted within the configured timeout
    #[error("timed out after {waited:?} waiting for lock on account {iban}")]
    LockTimeout { iban: String, waited: Duration },
}
