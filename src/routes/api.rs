use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, calls, leads, recording};
use crate::state::AppState;
use std::sync::Arc;

/// Create the REST API router.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        // Call origination and the provider voice webhook
        .route("/calls", post(calls::dial))
        .route("/calls/campaign", post(calls::dial_campaign))
        .route("/calls/twiml", post(calls::twiml_webhook))
        // Lead CRUD and import
        .route("/leads", get(leads::list_leads).post(leads::add_lead))
        .route("/leads/import", post(leads::import_leads))
        .route("/leads/{phone}", get(leads::get_lead))
        .route(
            "/leads/{phone}/conversations",
            get(leads::lead_conversations),
        )
        // Finalized call recordings
        .route(
            "/recordings/{stream_sid}/{track}",
            get(recording::download_recording),
        )
        .layer(TraceLayer::new_for_http())
}
