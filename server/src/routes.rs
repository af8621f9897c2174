//! HTTP handlers.
//!
//! Validation order for every account route: account number format, then
//! account existence, then the request body. Nothing touches the ledger until
//! all three pass.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use atm_common::{AccountNumber, LedgerError, Result};
use atm_ledger::AccountBalance;

use crate::app::AppState;
use crate::dto::{self, MessageResponse, TransactionResponse};
use crate::errors::ApiError;

/// Simple endpoint to verify that the server is alive.
pub async fn health() -> Json<MessageResponse> {
    Json(MessageResponse { message: "ok" })
}

/// Prometheus exposition.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = state.metrics.to_prometheus(&state.ledger.snapshot());
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

#[instrument(skip(state))]
pub async fn get_balance(
    State(state): State<AppState>,
    Path(account_number): Path<String>,
) -> std::result::Result<Json<AccountBalance>, ApiError> {
    let result = AccountNumber::parse(&account_number)
        .and_then(|account| state.ledger.get_balance(&account));

    reject_on_error(&state, result).map(Json)
}

#[instrument(skip(state, body))]
pub async fn deposit(
    State(state): State<AppState>,
    Path(account_number): Path<String>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> std::result::Result<Json<TransactionResponse>, ApiError> {
    let result = existing_account(&state, &account_number).and_then(|account| {
        let amount = dto::parse_amount(request_json(body))?;
        state.ledger.credit(&account, amount)
    });

    let receipt = reject_on_error(&state, result)?;
    state.metrics.deposit_committed();
    Ok(Json(TransactionResponse::from_receipt(
        "Deposit successful",
        receipt,
    )))
}

#[instrument(skip(state, body))]
pub async fn withdraw(
    State(state): State<AppState>,
    Path(account_number): Path<String>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> std::result::Result<Json<TransactionResponse>, ApiError> {
    let result = existing_account(&state, &account_number).and_then(|account| {
        let amount = dto::parse_amount(request_json(body))?;
        state.ledger.debit(&account, amount)
    });

    let receipt = reject_on_error(&state, result)?;
    state.metrics.withdrawal_committed();
    Ok(Json(TransactionResponse::from_receipt(
        "Withdrawal successful",
        receipt,
    )))
}

/// Any body the JSON extractor refused counts as missing.
fn request_json(body: std::result::Result<Json<Value>, JsonRejection>) -> Option<Value> {
    match body {
        Ok(Json(value)) => Some(value),
        Err(rejection) => {
            debug!(reason = %rejection.body_text(), "Request body is not JSON");
            None
        }
    }
}

fn existing_account(state: &AppState, raw: &str) -> Result<AccountNumber> {
    let account = AccountNumber::parse(raw)?;
    if state.ledger.contains(&account) {
        Ok(account)
    } else {
        Err(LedgerError::AccountNotFound(account))
    }
}

/// Count and log a rejection before it becomes a response.
///
/// Malformed requests are the client's problem and log at `info`; refusals
/// driven by ledger state log at `warn`.
fn reject_on_error<T>(state: &AppState, result: Result<T>) -> std::result::Result<T, ApiError> {
    result.map_err(|e| {
        state.metrics.request_rejected(e.error_code());
        if e.is_validation() {
            info!(code = e.error_code(), error = %e, "Request rejected");
        } else {
            warn!(code = e.error_code(), error = %e, "Request rejected");
        }
        ApiError(e)
    })
}
