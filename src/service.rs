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

//! Service boundary.
//!
//! [`Bank`] is the single entry point a presentation layer (CLI, HTTP, ...)
//! talks to. It validates boundary input, delegates to the registry, engine
//! and query components over one shared store, and logs outcomes.
//! Business-rule failures are returned unchanged; storage faults are logged
//! as warnings before being returned.

use crate::account::{Account, NewAccount};
use crate::config::LedgerConfig;
use crate::engine::Engine;
use crate::error::LedgerError;
use crate::query::LedgerQuery;
use crate::registry::AccountRegistry;
use crate::store::LedgerStore;
use crate::transaction::AccountTransaction;
use log::{debug, warn};
use rust_decimal::Decimal;
use std::sync::Arc;

/// The ledger's public operations.
///
/// Cheap to clone; clones share the same store.
#[derive(Debug, Clone)]
pub struct Bank {
    registry: AccountRegistry,
    engine: Engine,
    query: LedgerQuery,
}

impl Bank {
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    pub fn with_config(config: LedgerConfig) -> Self {
        Self::with_store(Arc::new(LedgerStore::with_config(config)))
    }

    pub fn with_store(store: Arc<LedgerStore>) -> Self {
        Self {
            registry: AccountRegistry::new(Arc::clone(&store)),
            engine: Engine::new(Arc::clone(&store)),
            query: LedgerQuery::new(store),
        }
    }

    /// Validates `new` and creates the account.
    pub fn create_account(&self, new: &NewAccount) -> Result<Account, LedgerError> {
        new.validate()?;
        let account = observe(
            "create",
            self.registry
                .create(&new.iban, &new.account_number, new.initial_balance),
        )?;
        debug!(
            "Created account {} ({}) with balance {:.2}",
            account.iban, account.account_number, account.balance
        );
        Ok(account)
    }

    pub fn deposit(
        &self,
        iban: &str,
        amount: Decimal,
    ) -> Result<Vec<AccountTransaction>, LedgerError> {
        let written = observe("deposit", self.engine.deposit(iban, amount))?;
        debug!("Deposited {amount:.2} to {iban}");
        Ok(written)
    }

    pub fn withdraw(
        &self,
        iban: &str,
        amount: Decimal,
    ) -> Result<Vec<AccountTransaction>, LedgerError> {
        let written = observe("withdraw", self.engine.withdraw(iban, amount))?;
        debug!("Withdrew {amount:.2} from {iban}");
        Ok(written)
    }

    pub fn transfer(
        &self,
        from_iban: &str,
        to_iban: &str,
        amount: Decimal,
    ) -> Result<Vec<AccountTransaction>, LedgerError> {
        let written = observe(
            "transfer",
            self.engine.transfer(from_iban, to_iban, amount),
        )?;
        debug!("Transferred {amount:.2} from {from_iban} to {to_iban}");
        Ok(written)
    }

    pub fn get_balance(&self, iban: &str) -> Result<Decimal, LedgerError> {
        self.query.balance(iban)
    }

    pub fn list_accounts(&self) -> Vec<Account> {
        self.query.list_accounts()
    }

    pub fn get_account_by_iban(&self, iban: &str) -> Result<Account, LedgerError> {
        self.registry.find_by_iban(iban)
    }

    /// Transactions of the account, newest first.
    pub fn get_transaction_history(
        &self,
        iban: &str,
    ) -> Result<Vec<AccountTransaction>, LedgerError> {
        self.query.transaction_history(iban)
    }

    /// Deletes the account and, irreversibly, its transaction history.
    pub fn delete_account(&self, iban: &str) -> Result<(), LedgerError> {
        observe("delete", self.registry.delete(iban))?;
        debug!("Deleted account {iban}");
        Ok(())
    }
}

impl Default for Bank {
    fn default() -> Self {
        Self::new()
    }
}

fn observe<T>(operation: &str, result: Result<T, LedgerError>) -> Result<T, LedgerError> {
    if let Err(e) = &result {
        if e.is_infrastructure() {
            warn!("{operation} failed: {e}");
        }
    }
    result
}
