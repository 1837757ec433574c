//! `POST /identify`.
//!
//! Resolution runs on the blocking pool; the SQLite connection is never
//! locked from an async worker.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use log::{info, warn};
use reconcile_core::{resolve_in_transaction, ConsolidatedIdentity};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use super::ApiError;
use crate::AppState;

/// Request body. Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<PhoneInput>,
}

/// Phone numbers arrive as strings or as bare JSON numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PhoneInput {
    Text(String),
    Number(u64),
}

impl PhoneInput {
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IdentifyResponse {
    pub contact: ConsolidatedIdentity,
}

pub async fn identify(
    State(state): State<AppState>,
    payload: Result<Json<IdentifyRequest>, JsonRejection>,
) -> Result<Json<IdentifyResponse>, ApiError> {
    let started_at = Instant::now();
    let result = handle_identify(&state, payload).await;

    match &result {
        Ok(response) => info!(
            "event=http_request module=http route=/identify status=200 primary_id={} duration_ms={}",
            response.contact.primary_contact_id,
            started_at.elapsed().as_millis()
        ),
        Err(err) => warn!(
            "event=http_request module=http route=/identify status={} duration_ms={}",
            err.status().as_u16(),
            started_at.elapsed().as_millis()
        ),
    }
    result.map(Json)
}

async fn handle_identify(
    state: &AppState,
    payload: Result<Json<IdentifyRequest>, JsonRejection>,
) -> Result<IdentifyResponse, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let email = request.email;
    let phone_number = request.phone_number.map(PhoneInput::into_text);

    let environment = state.environment;
    let db = Arc::clone(&state.db);
    let contact = tokio::task::spawn_blocking(move || {
        let mut conn = db
            .lock()
            .map_err(|_| ApiError::internal("database mutex poisoned", environment))?;
        resolve_in_transaction(&mut conn, email.as_deref(), phone_number.as_deref())
            .map_err(|err| ApiError::from_identity(err, environment))
    })
    .await
    .map_err(|err| ApiError::internal(err, environment))??;

    Ok(IdentifyResponse { contact })
}
