//! Lead CRUD, conversation history, and bulk import.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::state::AppState;
use crate::store::{self, NewLead};
use crate::utils::canonicalize_phone;

/// GET /leads
pub async fn list_leads(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    let leads = state.store.list().await?;
    Ok(Json(leads).into_response())
}

/// POST /leads
pub async fn add_lead(
    State(state): State<Arc<AppState>>,
    Json(mut lead): Json<NewLead>,
) -> AppResult<Response> {
    let phone = canonicalize_phone(&lead.phone)
        .ok_or_else(|| AppError::BadRequest(format!("no canonical form for '{}'", lead.phone)))?;

    if state.store.get(&phone).await?.is_some() {
        return Err(AppError::BadRequest(format!("lead {phone} already exists")));
    }

    lead.phone = phone;
    let created = state.store.add(lead).await?;
    info!(phone = %created.phone, "Lead added");
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// GET /leads/{phone}
pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    Path(phone): Path<String>,
) -> AppResult<Response> {
    let phone = canonical_or_raw(&phone);
    let lead = state
        .store
        .get(&phone)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no lead for {phone}")))?;
    Ok(Json(lead).into_response())
}

/// GET /leads/{phone}/conversations
pub async fn lead_conversations(
    State(state): State<Arc<AppState>>,
    Path(phone): Path<String>,
) -> AppResult<Response> {
    let phone = canonical_or_raw(&phone);
    if state.store.get(&phone).await?.is_none() {
        return Err(AppError::NotFound(format!("no lead for {phone}")));
    }
    let entries = state.store.conversations(&phone).await?;
    Ok(Json(entries).into_response())
}

/// POST /leads/import - CSV body, header row required.
pub async fn import_leads(State(state): State<Arc<AppState>>, body: String) -> AppResult<Response> {
    let summary = store::import_csv(&state.store, &body).await?;
    Ok(Json(summary).into_response())
}

/// Lookups accept either canonical or loosely formatted numbers.
fn canonical_or_raw(phone: &str) -> String {
    canonicalize_phone(phone).unwrap_or_else(|| phone.to_string())
}
