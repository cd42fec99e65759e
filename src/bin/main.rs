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

use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use iban_ledger::{Bank, LedgerConfig, LedgerError, NewAccount};
use log::warn;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

/// IBAN Ledger - Apply a CSV batch of account operations
///
/// Reads operations from a CSV file, applies them in order and writes the
/// resulting accounts (or one account's history) to stdout.
/// Set `RUST_LOG=warn` to see rejected operations.
#[derive(Parser, Debug)]
#[command(name = "iban-ledger")]
#[command(about = "Applies a CSV batch of ledger operations", long_about = None)]
struct Args {
    /// Path to CSV file with operations
    ///
    /// Expected format: op,iban,account_number,to_iban,amount
    /// Example: cargo run -- operations.csv > accounts.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Give up on a contended account lock after this many milliseconds
    #[arg(long, value_name = "MS")]
    lock_timeout_ms: Option<u64>,

    /// Print the transaction history of this IBAN instead of the accounts
    #[arg(long, value_name = "IBAN")]
    history: Option<String>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let mut config = LedgerConfig::default();
    if let Some(ms) = args.lock_timeout_ms {
        config = config.with_lock_timeout(Duration::from_millis(ms));
    }
    let bank = Bank::with_config(config);

    if let Err(e) = apply_operations(&bank, BufReader::new(file)) {
        eprintln!("Error processing operations: {}", e);
        process::exit(1);
    }

    let written = match &args.history {
        Some(iban) => write_history(&bank, iban, std::io::stdout()),
        None => write_accounts(&bank, std::io::stdout()),
    };
    if let Err(e) = written {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `op, iban, account_number, to_iban, amount`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    op: String,
    iban: String,
    #[serde(default)]
    account_number: Option<String>,
    #[serde(default)]
    to_iban: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    amount: Option<Decimal>,
}

/// One parsed ledger operation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Operation {
    Create(NewAccount),
    Deposit { iban: String, amount: Decimal },
    Withdraw { iban: String, amount: Decimal },
    Transfer { from: String, to: String, amount: Decimal },
    Delete { iban: String },
}

impl CsvRecord {
    /// Returns `None` for unknown operations or missing required fields.
    fn into_operation(self) -> Option<Operation> {
        let iban = self.iban;
        match self.op.to_lowercase().as_str() {
            "create" => Some(Operation::Create(NewAccount::new(
                iban,
                self.account_number.filter(|n| !n.is_empty())?,
                self.amount.unwrap_or(Decimal::ZERO),
            ))),
            "deposit" => Some(Operation::Deposit {
                iban,
                amount: self.amount?,
            }),
            "withdraw" => Some(Operation::Withdraw {
                iban,
                amount: self.amount?,
            }),
            "transfer" => Some(Operation::Transfer {
                from: iban,
                to: self.to_iban.filter(|t| !t.is_empty())?,
                amount: self.amount?,
            }),
            "delete" => Some(Operation::Delete { iban }),
            _ => None,
        }
    }
}

fn apply(bank: &Bank, operation: &Operation) -> Result<(), LedgerError> {
    match operation {
        Operation::Create(new) => bank.create_account(new).map(|_| ()),
        Operation::Deposit { iban, amount } => bank.deposit(iban, *amount).map(|_| ()),
        Operation::Withdraw { iban, amount } => bank.withdraw(iban, *amount).map(|_| ()),
        Operation::Transfer { from, to, amount } => {
            bank.transfer(from, to, *amount).map(|_| ())
        }
        Operation::Delete { iban } => bank.delete_account(iban),
    }
}

/// Applies operations from a CSV reader, in file order.
///
/// Malformed rows and rejected operations are logged and skipped; the batch
/// keeps going.
///
/// # CSV Format
///
/// ```csv
/// op,iban,account_number,to_iban,amount
/// create,GR0001,AN0001,,100.00
/// deposit,GR0001,,,50.00
/// transfer,GR0001,,GR0002,30.00
/// ```
///
/// # Errors
///
/// Returns a CSV error only if the reader itself fails.
pub fn apply_operations<R: Read>(bank: &Bank, reader: R) -> Result<(), csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    for (index, result) in rdr.deserialize::<CsvRecord>().enumerate() {
        let row = index + 1;
        match result {
            Ok(record) => {
                let Some(operation) = record.into_operation() else {
                    warn!("Row {row}: skipping invalid operation record");
                    continue;
                };
                if let Err(e) = apply(bank, &operation) {
                    warn!("Row {row}: {e}");
                }
            }
            Err(e) if e.is_io_error() => return Err(e),
            Err(e) => {
                warn!("Row {row}: skipping malformed row: {e}");
            }
        }
    }

    Ok(())
}

/// Output row for the account listing.
#[derive(Debug, Serialize)]
struct AccountRow<'a> {
    id: u64,
    iban: &'a str,
    account_number: &'a str,
    balance: Decimal,
}

/// Writes every account as CSV: `id, iban, account_number, balance`.
pub fn write_accounts<W: Write>(bank: &Bank, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for account in bank.list_accounts() {
        wtr.serialize(AccountRow {
            id: account.id.0,
            iban: &account.iban,
            account_number: &account.account_number,
            balance: account.balance,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Output row for a transaction history.
#[derive(Debug, Serialize)]
struct HistoryRow {
    id: u64,
    kind: String,
    amount: Decimal,
    counterparty_iban: Option<String>,
    balance_after: Decimal,
    created_at: String,
}

/// Writes the account's history as CSV, newest first. An unknown IBAN is
/// reported as a warning and produces an empty listing.
pub fn write_history<W: Write>(bank: &Bank, iban: &str, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    match bank.get_transaction_history(iban) {
        Ok(history) => {
            for tx in history {
                wtr.serialize(HistoryRow {
                    id: tx.id.0,
                    kind: tx.kind.to_string(),
                    amount: tx.amount,
                    counterparty_iban: tx.counterparty_iban,
                    balance_after: tx.balance_after,
                    created_at: tx.created_at.to_rfc3339(),
                })?;
            }
        }
        Err(e) => warn!("{e}"),
    }
    wtr.flush()?;
    Ok(())
}
