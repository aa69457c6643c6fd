use serde_json::Value;

/// Durable operational event, mirrored into the `event_log` table.
/// Writes are best-effort: a failed write must never abort the
/// operation that produced the event.
#[derive(Debug, Clone, Default)]
pub struct EventRecord {
    pub kind: EventKind,
    pub request_id: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
    pub status_code: Option<i64>,
    pub detail: Option<Value>,
}

impl EventRecord {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn status_code(mut self, code: i64) -> Self {
        self.status_code = Some(code);
        self
    }

    pub fn detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventKind {
    PaymentCreated,
    NotificationReceived,
    NotificationInvalidSignature,
    CallbackSuccess,
    CallbackFailed,
    CronStarted,
    CronPaymentUpdated,
    CronCallbackSuccess,
    CronCallbackFailed,
    CronCompleted,
    CronError,
    HealthCheck,
    #[default]
    Info,
    Error,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PaymentCreated => "PAYMENT_CREATED",
            EventKind::NotificationReceived => "NOTIFICATION_RECEIVED",
            EventKind::NotificationInvalidSignature => "NOTIFICATION_INVALID_SIGNATURE",
            EventKind::CallbackSuccess => "CALLBACK_SUCCESS",
            EventKind::CallbackFailed => "CALLBACK_FAILED",
            EventKind::CronStarted => "CRON_STARTED",
            EventKind::CronPaymentUpdated => "CRON_PAYMENT_UPDATED",
            EventKind::CronCallbackSuccess => "CRON_CALLBACK_SUCCESS",
            EventKind::CronCallbackFailed => "CRON_CALLBACK_FAILED",
            EventKind::CronCompleted => "CRON_COMPLETED",
            EventKind::CronError => "CRON_ERROR",
            EventKind::HealthCheck => "HEALTH_CHECK",
            EventKind::Info => "INFO",
            EventKind::Error => "ERROR",
        }
    }
}
