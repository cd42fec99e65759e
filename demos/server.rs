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

//! Simple REST API server example for the ledger.
//!
//! Run with: `RUST_LOG=debug cargo run --example server`
//!
//! ## Endpoints
//!
//! - `POST   /accounts` - Create an account
//! - `GET    /accounts` - List all accounts
//! - `GET    /accounts/{iban}` - Get an account
//! - `DELETE /accounts/{iban}` - Delete an account and its history
//! - `GET    /accounts/{iban}/balance` - Get the balance
//! - `GET    /accounts/{iban}/transactions` - Transaction history, newest first
//! - `POST   /accounts/{iban}/deposit` - Deposit
//! - `POST   /accounts/{iban}/withdraw` - Withdraw
//! - `POST   /accounts/{iban}/transfer` - Transfer to another account
//!
//! ## Example Usage
//!
//! ```bash
//! curl -X POST http://localhost:3000/accounts \
//!   -H "Content-Type: application/json" \
//!   -d '{"iban": "GR0001", "account_number": "AN0001", "initial_balance": "100.00"}'
//!
//! curl -X POST http://localhost:3000/accounts/GR0001/transfer \
//!   -H "Content-Type: application/json" \
//!   -d '{"to_iban": "GR0002", "amount": "30.00"}'
//! ```

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use iban_ledger::{Account, AccountTransaction, Bank, LedgerError, NewAccount};
use log::{info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

// === Request/Response DTOs ===

/// Request body for deposits and withdrawals.
#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: Decimal,
}

/// Request body for transfers out of the path account.
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub to_iban: String,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub iban: String,
    pub balance: Decimal,
}

/// Response body for errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Error Handling ===

/// Wrapper for converting `LedgerError` into HTTP responses.
pub struct AppError(LedgerError);

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        warn!("Request rejected: {}", self.0);
        let (status, code) = match &self.0 {
            LedgerError::DuplicateIban(_) => (StatusCode::CONFLICT, "DUPLICATE_IBAN"),
            LedgerError::DuplicateAccountNumber(_) => {
                (StatusCode::CONFLICT, "DUPLICATE_ACCOUNT_NUMBER")
            }
            LedgerError::AccountNotFound(_) => (StatusCode::NOT_FOUND, "ACCOUNT_NOT_FOUND"),
            LedgerError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "INVALID_AMOUNT"),
            LedgerError::InsufficientBalance { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_BALANCE")
            }
            LedgerError::BalanceOverflow(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "BALANCE_OVERFLOW")
            }
            LedgerError::InvalidTransfer(_) => (StatusCode::BAD_REQUEST, "INVALID_TRANSFER"),
            LedgerError::Validation { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
            LedgerError::Storage(_) => (StatusCode::SERVICE_UNAVAILABLE, "STORAGE_UNAVAILABLE"),
        };

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

/// POST /accounts
async fn create_account(
    State(bank): State<Bank>,
    Json(request): Json<NewAccount>,
) -> Result<(StatusCode, Json<Account>), AppError> {
    let account = bank.create_account(&request)?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// GET /accounts
async fn list_accounts(State(bank): State<Bank>) -> Json<Vec<Account>> {
    Json(bank.list_accounts())
}

/// GET /accounts/{iban}
async fn get_account(
    State(bank): State<Bank>,
    Path(iban): Path<String>,
) -> Result<Json<Account>, AppError> {
    Ok(Json(bank.get_account_by_iban(&iban)?))
}

/// DELETE /accounts/{iban}
async fn delete_account(
    State(bank): State<Bank>,
    Path(iban): Path<String>,
) -> Result<StatusCode, AppError> {
    bank.delete_account(&iban)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /accounts/{iban}/balance
async fn get_balance(
    State(bank): State<Bank>,
    Path(iban): Path<String>,
) -> Result<Json<BalanceResponse>, AppError> {
    let balance = bank.get_balance(&iban)?;
    Ok(Json(BalanceResponse { iban, balance }))
}

/// GET /accounts/{iban}/transactions
async fn get_history(
    State(bank): State<Bank>,
    Path(iban): Path<String>,
) -> Result<Json<Vec<AccountTransaction>>, AppError> {
    Ok(Json(bank.get_transaction_history(&iban)?))
}

/// POST /accounts/{iban}/deposit
async fn deposit(
    State(bank): State<Bank>,
    Path(iban): Path<String>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<Vec<AccountTransaction>>, AppError> {
    Ok(Json(bank.deposit(&iban, request.amount)?))
}

/// POST /accounts/{iban}/withdraw
async fn withdraw(
    State(bank): State<Bank>,
    Path(iban): Path<String>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<Vec<AccountTransaction>>, AppError> {
    Ok(Json(bank.withdraw(&iban, request.amount)?))
}

/// POST /accounts/{iban}/transfer
async fn transfer(
    State(bank): State<Bank>,
    Path(iban): Path<String>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<Vec<AccountTransaction>>, AppError> {
    Ok(Json(bank.transfer(
        &iban,
        &request.to_iban,
        request.amount,
    )?))
}

// === Router ===

fn create_router(bank: Bank) -> Router {
    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route("/accounts/{iban}", get(get_account).delete(delete_account))
        .route("/accounts/{iban}/balance", get(get_balance))
        .route("/accounts/{iban}/transactions", get(get_history))
        .route("/accounts/{iban}/deposit", post(deposit))
        .route("/accounts/{iban}/withdraw", post(withdraw))
        .route("/accounts/{iban}/transfer", post(transfer))
        .with_state(bank)
}

// === Main ===

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let app = create_router(Bank::new());

    let listener = TcpListener::bind("127.0.0.1:3000").await?;
    info!("Ledger API server running on http://127.0.0.1:3000");

    axum::serve(listener, app).await
}
