use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{SecondsFormat, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Per-request PlaceToPay/Getnet authentication object, regenerated for
/// every upstream call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetnetAuth {
    pub login: String,
    pub tran_key: String,
    pub nonce: String,
    pub seed: String,
}

/// tranKey = Base64(SHA-256(raw_nonce + seed + secret_key)). The nonce
/// field itself is sent Base64-encoded; the hash uses the raw string.
pub fn generate_auth(login: &str, secret_key: &str) -> GetnetAuth {
    let raw_nonce: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();
    let seed = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    GetnetAuth {
        login: login.to_string(),
        tran_key: tran_key(&raw_nonce, &seed, secret_key),
        nonce: BASE64.encode(raw_nonce.as_bytes()),
        seed,
    }
}

pub fn tran_key(raw_nonce: &str, seed: &str, secret_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_nonce.as_bytes());
    hasher.update(seed.as_bytes());
    hasher.update(secret_key.as_bytes());
    BASE64.encode(hasher.finalize())
}
