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

//! Account records.
//!
//! [`Account`] is a committed snapshot of an account row; it is what every
//! read returns. [`NewAccount`] is the insert input accepted by the
//! registry, with the boundary validation rules attached.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use iban_ledger::NewAccount;
//!
//! let new = NewAccount::new("GR0001", "AN0001", dec!(100));
//! assert!(new.validate().is_ok());
//! ```

use crate::base::{AccountId, MONEY_SCALE, to_money};
use crate::error::LedgerError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account summary: identity, unique keys and current balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub iban: String,
    pub account_number: String,
    /// Always scale 2, never negative.
    pub balance: Decimal,
}

/// Input for creating an account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewAccount {
    pub iban: String,
    pub account_number: String,
    pub initial_balance: Decimal,
}

impl NewAccount {
    /// Shortest IBAN or account number accepted.
    pub const MIN_KEY_LENGTH: usize = 5;

    pub fn new(
        iban: impl Into<String>,
        account_number: impl Into<String>,
        initial_balance: Decimal,
    ) -> Self {
        Self {
            iban: iban.into(),
            account_number: account_number.into(),
            initial_balance,
        }
    }

    /// Checks the input rules a boundary enforces before creation.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<(), LedgerError> {
        validate_key("iban", &self.iban)?;
        validate_key("account_number", &self.account_number)?;

        if self.initial_balance < Decimal::ZERO {
            return Err(LedgerError::Validation {
                field: "initial_balance",
                reason: "must not be negative".to_string(),
            });
        }
        if to_money(self.initial_balance).is_none() {
            return Err(LedgerError::Validation {
                field: "initial_balance",
                reason: format!("must have at most {MONEY_SCALE} decimal places and fit in range"),
            });
        }
        Ok(())
    }
}

fn validate_key(field: &'static str, value: &str) -> Result<(), LedgerError> {
    if value.trim().is_empty() {
        return Err(LedgerError::Validation {
            field,
            reason: "must not be blank".to_string(),
        });
    }
    if value.chars().count() < NewAccount::MIN_KEY_LENGTH {
        return Err(LedgerError::Validation {
            field,
            reason: format!(
                "must be at least {} characters",
                NewAccount::MIN_KEY_LENGTH
            ),
        });
    }
    Ok(())
}
