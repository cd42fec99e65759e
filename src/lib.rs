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

//! # IBAN Ledger
//!
//! This library provides a single-entity banking ledger: accounts keyed by
//! IBAN, with deposits, withdrawals and transfers that keep balances
//! consistent under concurrent callers.
//!
//! ## Core Components
//!
//! - [`LedgerStore`]: Account rows, unique indices, per-row exclusive locks and units of work
//! - [`AccountRegistry`]: Account creation, lookup and deletion
//! - [`Engine`]: Deposit, withdraw and transfer
//! - [`LedgerQuery`]: Balances, account listing and transaction history
//! - [`LedgerError`]: Error types for ledger operations
//! - [`Bank`]: The service boundary tying the above together
//!
//! ## Example
//!
//! ```
//! use iban_ledger::{Bank, NewAccount, TransactionKind};
//! use rust_decimal_macros::dec;
//!
//! let bank = Bank::new();
//! bank.create_account(&NewAccount::new("GR0001", "AN0001", dec!(100.00))).unwrap();
//! bank.create_account(&NewAccount::new("GR0002", "AN0002", dec!(0.00))).unwrap();
//!
//! bank.transfer("GR0001", "GR0002", dec!(30.00)).unwrap();
//!
//! assert_eq!(bank.get_balance("GR0001").unwrap(), dec!(70.00));
//! let history = bank.get_transaction_history("GR0002").unwrap();
//! assert_eq!(history[0].kind, TransactionKind::TransferIn);
//! ```
//!
//! ## Thread Safety
//!
//! Every mutation holds exclusive locks on the rows it touches for the
//! duration of its unit of work. Operations on disjoint accounts run in
//! parallel; transfers lock their two accounts in IBAN order and cannot
//! deadlock one another.

pub mod account;
mod base;
mod config;
mod engine;
pub mod error;
mod query;
mod registry;
mod service;
pub mod store;
mod transaction;

pub use account::{Account, NewAccount};
pub use base::{AccountId, MONEY_SCALE, TransactionId, to_money};
pub use config::LedgerConfig;
pub use engine::Engine;
pub use error::{LedgerError, StorageError};
pub use query::LedgerQuery;
pub use registry::AccountRegistry;
pub use service::Bank;
pub use store::LedgerStore;
pub use transaction::{AccountTransaction, TransactionKind};
