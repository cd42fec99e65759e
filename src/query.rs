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

//! Read-only queries. None of these take an exclusive row lock.

use crate::account::Account;
use crate::error::LedgerError;
use crate::store::LedgerStore;
use crate::transaction::AccountTransaction;
use rust_decimal::Decimal;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct LedgerQuery {
    store: Arc<LedgerStore>,
}

impl LedgerQuery {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// Last committed balance of the account.
    pub fn balance(&self, iban: &str) -> Result<Decimal, LedgerError> {
        self.store.account(iban).map(|account| account.balance)
    }

    /// Every account, in creation order.
    pub fn list_accounts(&self) -> Vec<Account> {
        let mut accounts = self.store.accounts();
        accounts.sort_by_key(|account| account.id);
        accounts
    }

    /// The account's transactions, newest first.
    pub fn transaction_history(
        &self,
        iban: &str,
    ) -> Result<Vec<AccountTransaction>, LedgerError> {
        self.store.history(iban)
    }
}
