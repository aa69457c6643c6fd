use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::state::AppState,
    domain::{Buyer, EventKind, EventRecord, Payment, PaymentStatus},
    error::{AppError, Result},
    gateway::{CreateSessionRequest, SessionAmount, SessionBuyer, SessionPayment},
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    #[validate(range(min = 1, message = "amount must be greater than zero"))]
    pub amount: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub description: Option<String>,
    /// Getnet rejects references longer than 32 characters.
    #[validate(length(min = 1, max = 32, message = "reference must be at most 32 characters"))]
    pub reference: Option<String>,
    #[validate(nested)]
    pub buyer: BuyerRequest,
    #[validate(url(message = "returnUrl must be a valid URL"))]
    pub return_url: String,
    #[validate(url(message = "externalURLCallback must be a valid URL"))]
    #[serde(rename = "externalURLCallback")]
    pub external_url_callback: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BuyerRequest {
    pub name: Option<String>,
    pub surname: Option<String>,
    #[validate(email(message = "buyer.email must be a valid email"))]
    pub email: String,
    pub mobile: Option<String>,
    pub document: Option<String>,
    pub document_type: Option<String>,
}

fn default_currency() -> String {
    "CLP".to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentResponse {
    pub request_id: String,
    pub process_url: String,
    pub reference: String,
    pub status: PaymentStatus,
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<CreatePaymentResponse>)> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let reference = payload
        .reference
        .clone()
        .unwrap_or_else(|| format!("ORDER-{}", Utc::now().timestamp_millis()));

    let buyer_name = payload.buyer.name.clone().unwrap_or_else(|| "Cliente".to_string());
    let expiration = Utc::now()
        + chrono::Duration::minutes(state.settings.getnet.session_expiration_minutes);

    let session_request = CreateSessionRequest {
        auth: state.services.gateway.auth(),
        locale: "es_CL".to_string(),
        buyer: SessionBuyer {
            name: buyer_name.clone(),
            surname: payload.buyer.surname.clone().unwrap_or_default(),
            email: payload.buyer.email.clone(),
            mobile: payload.buyer.mobile.clone().unwrap_or_default(),
            document: payload.buyer.document.clone(),
            document_type: payload.buyer.document_type.clone(),
        },
        payment: SessionPayment {
            reference: reference.clone(),
            description: payload
                .description
                .clone()
                .unwrap_or_else(|| format!("Pago de {} ${}", payload.currency, payload.amount)),
            amount: SessionAmount {
                currency: payload.currency.clone(),
                total: payload.amount,
            },
        },
        expiration: expiration.to_rfc3339_opts(SecondsFormat::Millis, true),
        return_url: payload.return_url.clone(),
        notification_url: format!("{}/api/notification", state.settings.server.base_url),
        ip_address: payload.ip_address.clone().unwrap_or_else(|| "127.0.0.1".to_string()),
        user_agent: payload.user_agent.clone().unwrap_or_else(|| "Unknown".to_string()),
    };

    let session = state.services.gateway.create_session(&session_request).await?;

    let (Some(request_id), Some(process_url)) = (session.request_id, session.process_url) else {
        return Err(AppError::Gateway(
            "Session response missing requestId or processUrl".to_string(),
        ));
    };
    let request_id = request_id.to_string();

    let payment = Payment {
        id: Uuid::new_v4(),
        request_id: request_id.clone(),
        reference: reference.clone(),
        amount: payload.amount,
        currency: payload.currency.clone(),
        status: PaymentStatus::Created,
        buyer: Buyer {
            name: buyer_name,
            email: payload.buyer.email.clone(),
            document: payload.buyer.document.clone(),
        },
        external_url_callback: payload.external_url_callback.clone(),
        callback_executed: false,
        process_url: Some(process_url.clone()),
        last_status_update: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    state.services.payment_repo.create(payment).await?;

    state
        .services
        .event_log
        .record(
            EventRecord::new(EventKind::PaymentCreated)
                .request_id(&request_id)
                .detail(json!({
                    "reference": reference,
                    "amount": payload.amount,
                    "currency": payload.currency,
                    "hasCallback": payload.external_url_callback.is_some(),
                })),
        )
        .await;

    tracing::info!(request_id, reference, "Checkout session created");

    Ok((
        StatusCode::CREATED,
        Json(CreatePaymentResponse {
            request_id,
            process_url,
            reference,
            status: PaymentStatus::Created,
        }),
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDto {
    pub request_id: String,
    pub reference: String,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub buyer: Buyer,
    #[serde(rename = "externalURLCallback")]
    pub external_url_callback: Option<String>,
    pub callback_executed: bool,
    pub process_url: Option<String>,
    pub last_status_update: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Payment> for PaymentDto {
    fn from(payment: Payment) -> Self {
        Self {
            request_id: payment.request_id,
            reference: payment.reference,
            amount: payment.amount,
            currency: payment.currency,
            status: payment.status,
            buyer: payment.buyer,
            external_url_callback: payment.external_url_callback,
            callback_executed: payment.callback_executed,
            process_url: payment.process_url,
            last_status_update: payment.last_status_update,
            created_at: payment.created_at,
        }
    }
}

pub async fn get(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<PaymentDto>> {
    let payment = state
        .services
        .payment_repo
        .find_by_request_id(&request_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payment {request_id} not found")))?;

    Ok(Json(payment.into()))
}
