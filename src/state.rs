//! Shared application state.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::audio::Recorder;
use crate::core::telephony::Dialer;
use crate::core::transcribe::Transcriber;
use crate::errors::AppError;
use crate::store::LeadStore;

/// Application state shared across all handlers and bridge sessions.
///
/// Built exactly once at startup and passed explicitly; collaborators hold
/// no global state, so their lifecycle follows the process.
pub struct AppState {
    pub config: ServerConfig,
    pub store: LeadStore,
    pub dialer: Dialer,
    pub recorder: Recorder,
    pub transcriber: Transcriber,
}

impl AppState {
    /// Open the database and construct all collaborators.
    pub async fn new(config: ServerConfig) -> Result<Arc<Self>, AppError> {
        let store = LeadStore::connect(&config.database_url).await?;

        let dialer = Dialer::new(
            config.twilio_account_sid.clone(),
            config.twilio_auth_token.clone(),
            config.twilio_from_number.clone(),
            config.public_url.clone(),
        )?;

        let recorder = Recorder::new(config.recordings_dir.clone());
        let transcriber = Transcriber::new(config.openai_api_key.clone())?;

        Ok(Arc::new(Self {
            config,
            store,
            dialer,
            recorder,
            transcriber,
        }))
    }
}
