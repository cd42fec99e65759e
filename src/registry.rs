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

//! Account registry: creation, lookup and deletion of accounts.

use crate::account::Account;
use crate::base::to_money;
use crate::error::LedgerError;
use crate::store::LedgerStore;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Owns the account lifecycle and the IBAN/account-number uniqueness rules.
#[derive(Debug, Clone)]
pub struct AccountRegistry {
    store: Arc<LedgerStore>,
}

impl AccountRegistry {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// Creates an account with the given opening balance.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::DuplicateIban`] - IBAN already in use.
    /// - [`LedgerError::DuplicateAccountNumber`] - Account number already in use.
    /// - [`LedgerError::InvalidAmount`] - Opening balance is negative or finer than a cent.
    pub fn create(
        &self,
        iban: &str,
        account_number: &str,
        initial_balance: Decimal,
    ) -> Result<Account, LedgerError> {
        if initial_balance < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(initial_balance));
        }
        let balance =
            to_money(initial_balance).ok_or(LedgerError::InvalidAmount(initial_balance))?;
        self.store.insert_account(iban, account_number, balance)
    }

    pub fn find_by_iban(&self, iban: &str) -> Result<Account, LedgerError> {
        self.store.account(iban)
    }

    /// Deletes an account and its whole transaction history.
    ///
    /// Waits for any in-flight operation on the account to finish first.
    pub fn delete(&self, iban: &str) -> Result<(), LedgerError> {
        let mut uow = self.store.begin();
        let locked = uow.lock(iban)?;
        uow.delete(&locked);
        uow.commit();
        Ok(())
    }

    /// All live accounts, in storage order.
    pub fn list_all(&self) -> Vec<Account> {
        self.store.accounts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn registry() -> AccountRegistry {
        AccountRegistry::new(Arc::new(LedgerStore::new()))
    }

    #[test]
    fn create_then_find() {
        let registry = registry();
        let created = registry.create("GR0001", "AN0001", dec!(100)).unwrap();
        assert_eq!(created.balance.to_string(), "100.00");
        assert_eq!(registry.find_by_iban("GR0001").unwrap(), created);
    }

    #[test]
    fn create_rejects_negative_opening_balance() {
        assert_eq!(
            registry().create("GR0001", "AN0001", dec!(-1)),
            Err(LedgerError::InvalidAmount(dec!(-1)))
        );
    }

    #[test]
    fn create_accepts_zero_opening_balance() {
        let account = registry().create("GR0001", "AN0001", dec!(0)).unwrap();
        assert_eq!(account.balance, Decimal::ZERO);
    }

    #[test]
    fn find_missing_account() {
        assert_eq!(
            registry().find_by_iban("GR9999"),
            Err(LedgerError::AccountNotFound("GR9999".into()))
        );
    }

    #[test]
    fn delete_missing_account() {
        assert_eq!(
            registry().delete("GR9999"),
            Err(LedgerError::AccountNotFound("GR9999".into()))
        );
    }

    #[test]
    fn delete_twice_fails_second_time() {
        let registry = registry();
        registry.create("GR0001", "AN0001", dec!(1)).unwrap();
        registry.delete("GR0001").unwrap();
        assert_eq!(
            registry.delete("GR0001"),
            Err(LedgerError::AccountNotFound("GR0001".into()))
        );
        assert!(registry.list_all().is_empty());
    }
}
