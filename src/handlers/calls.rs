//! Call origination and the TwiML webhook.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::core::telephony::twiml;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;
use crate::store::{LeadStatus, NewLead};
use crate::utils::canonicalize_phone;

#[derive(Debug, Deserialize)]
pub struct DialRequest {
    pub to: String,
}

/// POST /calls - dial one number.
///
/// Ensures a lead row exists for the destination and marks it `called` once
/// the provider accepts the call.
pub async fn dial(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DialRequest>,
) -> AppResult<Response> {
    let phone = canonicalize_phone(&request.to)
        .ok_or_else(|| AppError::BadRequest(format!("no canonical form for '{}'", request.to)))?;

    if state.store.get(&phone).await?.is_none() {
        state
            .store
            .add(NewLead {
                phone: phone.clone(),
                ..Default::default()
            })
            .await?;
    }

    let call_sid = state.dialer.place_call(&phone).await?;
    state.store.update_status(&phone, LeadStatus::Called).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({"call_sid": call_sid, "to": phone})),
    )
        .into_response())
}

/// POST /calls/campaign - dial every pending lead in the background.
///
/// Thin loop over the store and the dialer: one call per pending lead with a
/// fixed delay between calls. Failures mark the lead and move on.
pub async fn dial_campaign(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    let pending = state.store.pending().await?;
    let count = pending.len();
    info!(count, "Starting campaign dial loop");

    let task_state = state.clone();
    tokio::spawn(async move {
        for lead in pending {
            match task_state.dialer.place_call(&lead.phone).await {
                Ok(call_sid) => {
                    info!(phone = %lead.phone, call_sid, "Campaign call placed");
                    if let Err(e) = task_state
                        .store
                        .update_status(&lead.phone, LeadStatus::Called)
                        .await
                    {
                        warn!("Failed to mark lead called: {}", e);
                    }
                }
                Err(e) => {
                    error!(phone = %lead.phone, "Campaign call failed: {}", e);
                    if let Err(e) = task_state
                        .store
                        .update_status(&lead.phone, LeadStatus::Failed)
                        .await
                    {
                        warn!("Failed to mark lead failed: {}", e);
                    }
                }
            }
            tokio::time::sleep(task_state.config.campaign_call_delay).await;
        }
        info!("Campaign dial loop finished");
    });

    Ok((StatusCode::ACCEPTED, Json(json!({"queued": count}))).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct TwimlQuery {
    /// Customer number, set on the callback URL by the dialer.
    pub customer: Option<String>,
}

/// Form fields the provider posts to the voice webhook.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TwimlRequest {
    pub from: Option<String>,
    pub to: Option<String>,
    pub call_sid: Option<String>,
}

/// POST /calls/twiml - the voice webhook.
///
/// Answers every call (inbound, or outbound once picked up) with TwiML that
/// connects the provider's media stream to our `/media` WebSocket. For
/// inbound calls the caller's own number is the customer identifier.
pub async fn twiml_webhook(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TwimlQuery>,
    Form(form): Form<TwimlRequest>,
) -> Response {
    let customer = query
        .customer
        .as_deref()
        .or(form.from.as_deref())
        .and_then(canonicalize_phone);

    info!(
        call_sid = ?form.call_sid,
        customer = ?customer,
        "Answering call with media-stream TwiML"
    );

    let document = twiml::connect_stream(&state.config.media_ws_url(), customer.as_deref());

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml")],
        document,
    )
        .into_response()
}
