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

//! Core identifier types and money helpers.

use crate::error::LedgerError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of fractional digits carried by every amount and balance.
pub const MONEY_SCALE: u32 = 2;

/// Unique identifier for an account, assigned by the store at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a ledger transaction.
///
/// Assigned at commit time from a store-wide counter, so ids grow in the
/// order units of work were committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct TransactionId(pub u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returns `value` rescaled to exactly [`MONEY_SCALE`] fractional digits.
///
/// Returns `None` when `value` carries non-zero digits past the second
/// fractional digit, since rescaling would have to round them away, or when
/// it is too large to carry two fractional digits at all.
pub fn to_money(value: Decimal) -> Option<Decimal> {
    let normalized = value.normalize();
    if normalized.scale() > MONEY_SCALE {
        return None;
    }
    let mut money = normalized;
    money.rescale(MONEY_SCALE);
    (money.scale() == MONEY_SCALE).then_some(money)
}

/// Adds two money values exactly.
///
/// Returns `None` if the sum overflows or could only be represented by
/// rounding away cents.
pub fn add_money(balance: Decimal, amount: Decimal) -> Option<Decimal> {
    balance
        .checked_add(amount)
        .filter(|sum| sum.scale() == MONEY_SCALE)
}

/// Subtracts `amount` from `balance` exactly, with the same guarantees as
/// [`add_money`].
pub fn sub_money(balance: Decimal, amount: Decimal) -> Option<Decimal> {
    balance
        .checked_sub(amount)
        .filter(|difference| difference.scale() == MONEY_SCALE)
}

/// Validates a deposit/withdraw/transfer amount.
///
/// # Errors
///
/// [`LedgerError::InvalidAmount`] if `amount <= 0` or has more than two
/// significant fractional digits.
pub fn positive_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(amount));
    }
    to_money(amount).ok_or(LedgerError::InvalidAmount(amount))
}
