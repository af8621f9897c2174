//! Mapping from ledger errors to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use atm_common::LedgerError;

/// JSON error body: machine-readable code plus human-readable detail.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub detail: String,
}

/// A ledger error on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub LedgerError);

impl ApiError {
    /// HTTP status for the wrapped error.
    pub fn status(&self) -> StatusCode {
        status_for(&self.0)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.0.error_code(),
            detail: self.0.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// HTTP status for each error kind.
pub fn status_for(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::InvalidAccountNumber(_)
        | LedgerError::MissingBody
        | LedgerError::MissingAmountField
        | LedgerError::NonNumericAmount(_)
        | LedgerError::AmountOutOfRange(_)
        | LedgerError::NonPositiveAmount(_)
        | LedgerError::InsufficientFunds { .. } => StatusCode::BAD_REQUEST,
        LedgerError::AccountNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::BalanceOverflow(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atm_common::AccountNumber;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_mapping() {
        let id = AccountNumber::parse("1002").unwrap();

        assert_eq!(
            status_for(&LedgerError::InvalidAccountNumber("12a3".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&LedgerError::AccountNotFound(id.clone())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&LedgerError::InsufficientFunds {
                account: id.clone(),
                requested: dec!(31.00),
                available: dec!(30.00),
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&LedgerError::BalanceOverflow(id)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_error_response() {
        let response = ApiError(LedgerError::MissingAmountField).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
