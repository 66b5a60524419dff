//! Outbound call origination.
//!
//! Thin client over the telephony provider's REST Calls endpoint: form-encoded
//! POST with basic auth, pointing the provider at our TwiML webhook for call
//! flow. The provider rings the destination and, once answered, fetches the
//! TwiML and opens the media stream.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

/// Default REST API base of the telephony provider.
const DEFAULT_API_BASE: &str = "https://api.twilio.com";

/// Errors from dial-out requests.
#[derive(Debug, Error)]
pub enum TelephonyError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider rejected the call: {0}")]
    Rejected(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Subset of the provider's call resource we care about.
#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default)]
    message: Option<String>,
}

/// REST dial-out client.
#[derive(Debug, Clone)]
pub struct Dialer {
    http: Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
    /// Public base URL of this server; the TwiML webhook hangs off it.
    public_url: String,
}

impl Dialer {
    pub fn new(
        account_sid: String,
        auth_token: String,
        from_number: String,
        public_url: String,
    ) -> Result<Self, TelephonyError> {
        if account_sid.is_empty() || auth_token.is_empty() {
            return Err(TelephonyError::InvalidConfiguration(
                "telephony credentials are required".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| TelephonyError::InvalidConfiguration(e.to_string()))?;

        Ok(Self {
            http,
            api_base: DEFAULT_API_BASE.to_string(),
            account_sid,
            auth_token,
            from_number,
            public_url,
        })
    }

    /// Override the provider API base (tests point this at a mock server).
    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    /// The TwiML webhook the provider fetches when the call is answered.
    fn callback_url(&self, customer: &str) -> String {
        format!(
            "{}/calls/twiml?customer={}",
            self.public_url.trim_end_matches('/'),
            customer
        )
    }

    /// Originate a call to `to` (canonical form) and return the call SID.
    pub async fn place_call(&self, to: &str) -> Result<String, TelephonyError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.api_base, self.account_sid
        );
        let callback = self.callback_url(to);

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("To", to),
                ("From", self.from_number.as_str()),
                ("Url", callback.as_str()),
                ("Method", "POST"),
            ])
            .send()
            .await
            .map_err(|e| TelephonyError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TelephonyError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ProviderError>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(body);
            error!(to, %status, "Dial-out rejected: {}", message);
            return Err(TelephonyError::Rejected(message));
        }

        let call: CallResource =
            serde_json::from_str(&body).map_err(|e| TelephonyError::Network(e.to_string()))?;

        info!(
            to,
            call_sid = %call.sid,
            status = call.status.as_deref().unwrap_or("queued"),
            "Outbound call initiated"
        );
        Ok(call.sid)
    }
}
