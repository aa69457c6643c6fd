use axum::{extract::State, Json};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{
    api::state::AppState,
    domain::{EventKind, EventRecord, PaymentStatus},
    error::{AppError, Result},
    gateway::signature,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    /// Getnet sends the requestId as a JSON number; normalize to string.
    #[serde(deserialize_with = "string_or_number")]
    pub request_id: String,
    pub status: NotificationStatus,
    pub signature: String,
}

#[derive(Debug, Deserialize)]
pub struct NotificationStatus {
    pub status: String,
    pub date: Option<String>,
    pub reason: Option<String>,
    pub message: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "requestId must be a string or number, got {other}"
        ))),
    }
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub status: &'static str,
}

/// Inbound status-change webhook from Getnet. Signature-checked, then the
/// change is persisted and handed to the callback orchestrator.
pub async fn receive(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<NotificationResponse>> {
    let notification: NotificationRequest = serde_json::from_value(body.clone())
        .map_err(|e| AppError::BadRequest(format!("Invalid notification: {e}")))?;

    let request_id = notification.request_id.as_str();
    let date = notification.status.date.clone().unwrap_or_default();

    let valid = signature::verify_notification(
        request_id,
        &notification.status.status,
        &date,
        &notification.signature,
        &state.settings.getnet.secret_key,
    );

    if !valid {
        tracing::warn!(request_id, "Notification rejected: invalid signature");
        state
            .services
            .event_log
            .record(
                EventRecord::new(EventKind::NotificationInvalidSignature)
                    .request_id(request_id)
                    .detail(body),
            )
            .await;
        return Err(AppError::Unauthorized);
    }

    let payment = state
        .services
        .payment_repo
        .find_by_request_id(request_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payment {request_id} not found")))?;

    state
        .services
        .payment_repo
        .record_notification(request_id, &body)
        .await?;

    state
        .services
        .event_log
        .record(
            EventRecord::new(EventKind::NotificationReceived)
                .request_id(request_id)
                .message(format!("Status reported: {}", notification.status.status))
                .detail(body.clone()),
        )
        .await;

    let Some(new_status) = PaymentStatus::parse(&notification.status.status) else {
        tracing::warn!(
            request_id,
            "Notification carries unknown status: {}",
            notification.status.status
        );
        return Ok(Json(NotificationResponse { status: "ignored" }));
    };

    if new_status != payment.status {
        let status_date = notification
            .status
            .date
            .as_deref()
            .and_then(|d| chrono::DateTime::parse_from_rfc3339(d).ok())
            .map(|dt| dt.with_timezone(&chrono::Utc));

        state
            .services
            .payment_repo
            .update_status(request_id, new_status, status_date)
            .await?;

        state
            .services
            .orchestrator
            .notify_status_change(request_id, payment.status, new_status)
            .await?;
    } else {
        tracing::debug!(request_id, "Notification is a no-op, status unchanged");
    }

    Ok(Json(NotificationResponse { status: "ok" }))
}
