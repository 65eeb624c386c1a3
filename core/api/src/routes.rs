//! Secret vault routes.
//!
//! Thin handlers: parse, delegate to `VaultService`, shape the response.
//! All policy (validation, auditing, conflict handling) lives in the
//! service layer.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use credvault_common::{SecretType, SourceType};
use credvault_store::{SecretId, SecretMetadata};
use credvault_vault::{AuditContext, CreateSecretRequest, RotateSecretRequest, VaultService};

use crate::auth::OwnerIdentity;
use crate::error::ApiError;

/// Shared state for the secret routes.
#[derive(Clone)]
pub struct AppState {
    pub vault: Arc<VaultService>,
}

/// Build the `/secrets` router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/secrets", get(list_secrets).post(create_secret))
        .route(
            "/secrets/{type}",
            get(get_secret).patch(rotate_secret).delete(delete_secret),
        )
        .with_state(state)
}

#[derive(Serialize)]
struct ListResponse {
    secrets: Vec<SecretMetadata>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatedResponse {
    id: SecretId,
    secret_type: SecretType,
    source_type: SourceType,
    created_at: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RotatedResponse {
    id: SecretId,
    secret_type: SecretType,
    last_rotated_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct DeletedResponse {
    success: bool,
}

fn parse_type(raw: &str) -> Result<SecretType, ApiError> {
    SecretType::from_str(raw).map_err(ApiError)
}

async fn list_secrets(
    State(state): State<AppState>,
    OwnerIdentity(owner): OwnerIdentity,
) -> Result<impl IntoResponse, ApiError> {
    let secrets = state
        .vault
        .list(&owner, &AuditContext::api("secrets.list"))
        .await?;
    Ok(Json(ListResponse { secrets }))
}

async fn create_secret(
    State(state): State<AppState>,
    OwnerIdentity(owner): OwnerIdentity,
    Json(request): Json<CreateSecretRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let meta = state
        .vault
        .create(&owner, request, &AuditContext::api("secrets.create"))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: meta.id,
            secret_type: meta.secret_type,
            source_type: meta.source_type,
            created_at: meta.created_at,
        }),
    ))
}

async fn get_secret(
    State(state): State<AppState>,
    OwnerIdentity(owner): OwnerIdentity,
    Path(raw_type): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let secret_type = parse_type(&raw_type)?;
    let meta = state
        .vault
        .get_metadata(&owner, secret_type, &AuditContext::api("secrets.read"))
        .await?;
    Ok(Json(meta))
}

async fn rotate_secret(
    State(state): State<AppState>,
    OwnerIdentity(owner): OwnerIdentity,
    Path(raw_type): Path<String>,
    Json(request): Json<RotateSecretRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let secret_type = parse_type(&raw_type)?;
    let meta = state
        .vault
        .rotate(
            &owner,
            secret_type,
            request,
            &AuditContext::api("secrets.rotate"),
        )
        .await?;
    Ok(Json(RotatedResponse {
        id: meta.id,
        secret_type: meta.secret_type,
        last_rotated_at: meta.last_rotated_at,
    }))
}

async fn delete_secret(
    State(state): State<AppState>,
    OwnerIdentity(owner): OwnerIdentity,
    Path(raw_type): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let secret_type = parse_type(&raw_type)?;
    state
        .vault
        .delete(&owner, secret_type, &AuditContext::api("secrets.delete"))
        .await?;
    Ok(Json(DeletedResponse { success: true }))
}
