use getnet_gateway::gateway::{auth, signature};

const SECRET_KEY: &str = "SnZP3D63n3I9dH9O";

#[test]
fn notification_signature_matches_known_vector() {
    // SHA-1(requestId + status + date + secretKey), hex-encoded.
    let sig = signature::notification_signature(
        "88860455",
        "APPROVED",
        "2024-06-01T12:00:00-04:00",
        SECRET_KEY,
    );
    assert_eq!(sig, "c616a5c165dad7d409eeb4a3ef494ddec795e99a");

    assert!(signature::verify_notification(
        "88860455",
        "APPROVED",
        "2024-06-01T12:00:00-04:00",
        "c616a5c165dad7d409eeb4a3ef494ddec795e99a",
        SECRET_KEY,
    ));
}

#[test]
fn tampered_fields_fail_verification() {
    let sig = signature::notification_signature(
        "88860455",
        "APPROVED",
        "2024-06-01T12:00:00-04:00",
        SECRET_KEY,
    );

    // Flipping the status must invalidate the signature.
    assert!(!signature::verify_notification(
        "88860455",
        "REJECTED",
        "2024-06-01T12:00:00-04:00",
        &sig,
        SECRET_KEY,
    ));
    // So must a different signing key.
    assert!(!signature::verify_notification(
        "88860455",
        "APPROVED",
        "2024-06-01T12:00:00-04:00",
        &sig,
        "other-key",
    ));
    // Sanity: the REJECTED signature is a different known value.
    assert_eq!(
        signature::notification_signature(
            "88860455",
            "REJECTED",
            "2024-06-01T12:00:00-04:00",
            SECRET_KEY,
        ),
        "5b7312d0d8c047aa8244cc4aaa34b86eb342e1be"
    );
}

#[test]
fn tran_key_is_base64_sha256_of_nonce_seed_secret() {
    let tran_key = auth::tran_key("abc123", "2024-06-01T12:00:00.000Z", SECRET_KEY);
    assert_eq!(tran_key, "nhVLNQW4fwB4vecER/qTwx7xFHyaWkDyipLjV8DpBQ0=");
}

#[test]
fn generated_auth_is_internally_consistent() {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

    let auth = auth::generate_auth("login", SECRET_KEY);
    assert_eq!(auth.login, "login");

    // The nonce travels Base64-encoded; the tranKey hashes the raw nonce.
    let raw_nonce = BASE64.decode(&auth.nonce).expect("nonce is base64");
    let raw_nonce = String::from_utf8(raw_nonce).expect("nonce is utf8");
    assert_eq!(
        auth.tran_key,
        auth::tran_key(&raw_nonce, &auth.seed, SECRET_KEY)
    );

    // Fresh auth per request: nonces must differ.
    let other = auth::generate_auth("login", SECRET_KEY);
    assert_ne!(auth.nonce, other.nonce);
}
