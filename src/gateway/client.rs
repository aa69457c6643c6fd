use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    config::GetnetConfig,
    error::{AppError, Result},
    gateway::auth::{generate_auth, GetnetAuth},
};

/// HTTP client for the Getnet web-checkout API. Credentials and base URL
/// are injected at construction; a fresh auth object is generated per
/// request.
pub struct GetnetClient {
    http: reqwest::Client,
    base_url: String,
    login: String,
    secret_key: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub auth: GetnetAuth,
    pub locale: String,
    pub buyer: SessionBuyer,
    pub payment: SessionPayment,
    pub expiration: String,
    pub return_url: String,
    pub notification_url: String,
    pub ip_address: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionBuyer {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub mobile: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(rename = "documentType", skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionPayment {
    pub reference: String,
    pub description: String,
    pub amount: SessionAmount,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionAmount {
    pub currency: String,
    pub total: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub status: Option<SessionStatus>,
    pub request_id: Option<i64>,
    pub process_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInformation {
    pub request_id: Option<i64>,
    pub status: Option<SessionStatus>,
}

/// The provider's status block. Only `status` and `date` are consumed by
/// the reconciliation core.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionStatus {
    pub status: String,
    pub reason: Option<String>,
    pub message: Option<String>,
    pub date: Option<String>,
}

impl GetnetClient {
    pub fn new(config: &GetnetConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            login: config.login.clone(),
            secret_key: config.secret_key.clone(),
        })
    }

    pub fn auth(&self) -> GetnetAuth {
        generate_auth(&self.login, &self.secret_key)
    }

    /// Creates a hosted checkout session via POST /api/session.
    pub async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionResponse> {
        let url = format!("{}/api/session", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Session creation failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "Session creation returned HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("Invalid session response: {e}")))
    }

    /// Queries the current session status via POST /api/session/{requestId}.
    pub async fn query_status(&self, request_id: &str) -> Result<SessionInformation> {
        let url = format!("{}/api/session/{}", self.base_url, request_id);

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "auth": self.auth() }))
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Status query failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "Status query returned HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("Invalid status response: {e}")))
    }
}
