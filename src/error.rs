use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

const INTERNAL: &str = "Internal server error";

/// Failure kinds of the auth flows.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("User already exists")]
    DuplicateUser,

    /// Shared by "no such email" and "wrong password".
    #[error("User/Password not valid")]
    InvalidCredentials,

    #[error("credential store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("password hashing failed: {0}")]
    HashingFailure(String),

    #[error("token signing failed: {0}")]
    SigningFailure(String),
}

impl AuthError {
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            AuthError::StoreUnavailable(_)
                | AuthError::HashingFailure(_)
                | AuthError::SigningFailure(_)
        )
    }
}

/// Error body sent back to RPC callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: u16,
    pub message: String,
}

impl RpcError {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }
}

impl From<AuthError> for RpcError {
    fn from(err: AuthError) -> Self {
        if err.is_infrastructure() {
            error!(error = %err, "infrastructure failure");
            return RpcError::new(500, INTERNAL);
        }
        RpcError::bad_request(err.to_string())
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        RpcError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_errors_are_client_errors() {
        let dup = RpcError::from(AuthError::DuplicateUser);
        assert_eq!(dup, RpcError::bad_request("User already exists"));

        let creds = RpcError::from(AuthError::InvalidCredentials);
        assert_eq!(creds, RpcError::bad_request("User/Password not valid"));

        let invalid = RpcError::from(AuthError::Validation("email must be an email".into()));
        assert_eq!(invalid.code, 400);
        assert_eq!(invalid.message, "email must be an email");
    }

    #[test]
    fn infrastructure_errors_hide_details() {
        for err in [
            AuthError::StoreUnavailable("connection refused".into()),
            AuthError::HashingFailure("bad params".into()),
            AuthError::SigningFailure("bad key".into()),
        ] {
            assert!(err.is_infrastructure());
            let rpc = RpcError::from(err);
            assert_eq!(rpc.code, 500);
            assert_eq!(rpc.message, "Internal server error");
        }
    }

    #[test]
    fn into_response_uses_code_as_status() {
        let res = AuthError::DuplicateUser.into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = AuthError::StoreUnavailable("down".into()).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn rpc_error_wire_shape() {
        let json = serde_json::to_value(RpcError::bad_request("nope")).unwrap();
        assert_eq!(json, serde_json::json!({ "code": 400, "message": "nope" }));
    }
}
