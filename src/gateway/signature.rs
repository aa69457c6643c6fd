use sha1::{Digest, Sha1};

/// Expected signature of an inbound Getnet notification:
/// SHA-1 hex of requestId + status + date + secretKey. Getnet signs
/// notifications with SHA-1, not SHA-256.
pub fn notification_signature(
    request_id: &str,
    status: &str,
    date: &str,
    secret_key: &str,
) -> String {
    let mut hasher = Sha1::new();
    hasher.update(request_id.as_bytes());
    hasher.update(status.as_bytes());
    hasher.update(date.as_bytes());
    hasher.update(secret_key.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn verify_notification(
    request_id: &str,
    status: &str,
    date: &str,
    signature: &str,
    secret_key: &str,
) -> bool {
    notification_signature(request_id, status, date, secret_key) == signature
}
