use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::de::DeserializeOwned;
use tracing::{instrument, warn};

use crate::{
    auth::dto::{LoginUserRequest, RegisterUserRequest},
    error::{AuthError, RpcError},
    state::AppState,
};

pub const REGISTER_USER: &str = "auth.register.user";
pub const LOGIN_USER: &str = "auth.login.user";
pub const VERIFY_TOKEN: &str = "auth.verify.user";

const VERIFY_TOKEN_PLACEHOLDER: &str = "verificar token";

/// Every message pattern is delivered as `POST /rpc/<pattern>` with a JSON payload.
pub fn rpc_routes() -> Router<AppState> {
    Router::new().route("/rpc/:pattern", post(dispatch))
}

#[instrument(skip(state, body))]
pub async fn dispatch(
    State(state): State<AppState>,
    Path(pattern): Path<String>,
    body: Bytes,
) -> Result<Response, RpcError> {
    match pattern.as_str() {
        REGISTER_USER => register_user(&state, decode(&body)?).await,
        LOGIN_USER => login_user(&state, decode(&body)?).await,
        VERIFY_TOKEN => Ok(verify_token().into_response()),
        _ => {
            warn!("no handler for pattern");
            Err(RpcError::new(
                404,
                format!("No handler for pattern {pattern}"),
            ))
        }
    }
}

/// Shape check; field rules run in each request's `validate`.
fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, RpcError> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "malformed payload");
        RpcError::from(AuthError::Validation(e.to_string()))
    })
}

async fn register_user(state: &AppState, req: RegisterUserRequest) -> Result<Response, RpcError> {
    let req = req.validate()?;
    let res = state.auth.register(req).await?;
    Ok((StatusCode::CREATED, Json(res)).into_response())
}

async fn login_user(state: &AppState, req: LoginUserRequest) -> Result<Response, RpcError> {
    let req = req.validate()?;
    let res = state.auth.login(req).await?;
    Ok(Json(res).into_response())
}

// Token verification is not implemented; callers get a fixed placeholder.
fn verify_token() -> Json<&'static str> {
    Json(VERIFY_TOKEN_PLACEHOLDER)
}
