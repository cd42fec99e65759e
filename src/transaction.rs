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

//! Append-only transaction records.
//!
//! Every successful balance mutation writes exactly one record per touched
//! account. Records are never updated; they disappear only together with
//! their owning account.

use crate::base::{AccountId, TransactionId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
    TransferOut,
    TransferIn,
}

impl TransactionKind {
    /// Returns `true` for the two legs of a transfer, which carry a
    /// counterparty IBAN.
    pub fn is_transfer(&self) -> bool {
        matches!(self, Self::TransferOut | Self::TransferIn)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Deposit => "DEPOSIT",
            Self::Withdraw => "WITHDRAW",
            Self::TransferOut => "TRANSFER_OUT",
            Self::TransferIn => "TRANSFER_IN",
        };
        f.write_str(name)
    }
}

/// A committed ledger entry for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountTransaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub iban: String,
    pub kind: TransactionKind,
    /// Positive, scale 2.
    pub amount: Decimal,
    /// The other side of a transfer; `None` for deposits and withdrawals.
    pub counterparty_iban: Option<String>,
    /// Owning account's balance right after this entry was applied.
    pub balance_after: Decimal,
    pub created_at: DateTime<Utc>,
}
