// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canonical request signing for partner API calls.
//!
//! A signed request proves possession of the application's Ed25519 private
//! key without any backend session. The signature covers a canonical string:
//!
//! ```text
//! METHOD|/url/path|NONCE|form_encoded_params|json_body
//! ```
//!
//! Empty params or an absent body contribute an empty segment, so the string
//! always has exactly five `|`-separated fields. The canonical string is
//! hashed twice with SHA-256 and the 32-byte digest is signed.
//!
//! The signer performs no freshness check: callers must use a fresh
//! [`Nonce`] per request.

use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey, SECRET_KEY_LENGTH};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::models::QueryParams;

/// Header carrying the application's public key identifier.
pub const API_KEY_HEADER: &str = "BIZ-API-KEY";
/// Header carrying the nonce that was signed.
pub const NONCE_HEADER: &str = "BIZ-API-NONCE";
/// Header carrying the hex signature.
pub const SIGNATURE_HEADER: &str = "BIZ-API-SIGNATURE";

const DELIMITER: &str = "|";

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("signing key is not configured")]
    MissingKey,

    #[error("signing key is malformed: {0}")]
    MalformedKey(String),

    #[error("failed to serialize signing input: {0}")]
    Serialization(String),

    #[error("signature is malformed: {0}")]
    MalformedSignature(String),
}

/// Per-request freshness value: Unix time in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonce(String);

impl Nonce {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Nonce {
    fn from(value: &str) -> Self {
        Nonce(value.to_string())
    }
}

impl From<String> for Nonce {
    fn from(value: String) -> Self {
        Nonce(value)
    }
}

/// The inputs of one signed call, consumed by [`RequestSigner::sign`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    method: String,
    path: String,
    nonce: Nonce,
    params: QueryParams,
    body: Option<String>,
}

impl CanonicalRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>, nonce: impl Into<Nonce>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            nonce: nonce.into(),
            params: QueryParams::new(),
            body: None,
        }
    }

    pub fn params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    /// Attach a body, serialized as compact JSON in field order.
    pub fn json_body<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, SigningError> {
        let encoded =
            serde_json::to_string(body).map_err(|e| SigningError::Serialization(e.to_string()))?;
        self.body = Some(encoded);
        Ok(self)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    pub fn query(&self) -> &QueryParams {
        &self.params
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn canonical_string(&self) -> String {
        let params = self.params.encode();
        [
            self.method.as_str(),
            self.path.as_str(),
            self.nonce.as_str(),
            params.as_str(),
            self.body.as_deref().unwrap_or(""),
        ]
        .join(DELIMITER)
    }

    /// `sha256(sha256(canonical_string))`.
    pub fn digest(&self) -> [u8; 32] {
        let inner = Sha256::digest(self.canonical_string().as_bytes());
        Sha256::digest(inner).into()
    }

    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest())
    }
}

/// Ed25519 signer holding the application's private key.
#[derive(Clone)]
pub struct RequestSigner {
    key: SigningKey,
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    /// Load a signer from a hex-encoded 32-byte Ed25519 seed.
    pub fn from_hex(secret: &str) -> Result<Self, SigningError> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(SigningError::MissingKey);
        }
        let bytes = hex::decode(secret).map_err(|e| SigningError::MalformedKey(e.to_string()))?;
        let seed: [u8; SECRET_KEY_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
            SigningError::MalformedKey(format!(
                "expected {SECRET_KEY_LENGTH} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self {
            key: SigningKey::from_bytes(&seed),
        })
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.key.verifying_key().to_bytes())
    }

    /// Sign a request, returning the lowercase hex signature.
    pub fn sign(&self, request: &CanonicalRequest) -> String {
        hex::encode(self.key.sign(&request.digest()).to_bytes())
    }
}

/// One-shot signing from raw inputs and a hex private key.
pub fn sign_request(
    method: &str,
    path: &str,
    nonce: &str,
    params: &QueryParams,
    body: Option<&serde_json::Value>,
    private_key_hex: &str,
) -> Result<String, SigningError> {
    let signer = RequestSigner::from_hex(private_key_hex)?;
    let mut request = CanonicalRequest::new(method, path, nonce).params(params.clone());
    if let Some(body) = body {
        request = request.json_body(body)?;
    }
    Ok(signer.sign(&request))
}

/// Check a hex signature against a request and a hex public key.
///
/// Returns `Ok(false)` for a well-formed signature that does not verify.
pub fn verify(
    public_key_hex: &str,
    request: &CanonicalRequest,
    signature_hex: &str,
) -> Result<bool, SigningError> {
    let key_bytes =
        hex::decode(public_key_hex.trim()).map_err(|e| SigningError::MalformedKey(e.to_string()))?;
    let key_bytes: [u8; 32] = key_bytes
        .as_slice()
        .try_into()
        .map_err(|_| SigningError::MalformedKey("public key must be 32 bytes".to_string()))?;
    let public_key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| SigningError::MalformedKey(e.to_string()))?;

    let sig_bytes = hex::decode(signature_hex.trim())
        .map_err(|e| SigningError::MalformedSignature(e.to_string()))?;
    let sig_bytes: [u8; 64] = sig_bytes
        .as_slice()
        .try_into()
        .map_err(|_| SigningError::MalformedSignature("signature must be 64 bytes".to_string()))?;
    let signature = Signature::from_bytes(&sig_bytes);

    Ok(public_key.verify(&request.digest(), &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    // RFC 8032 test vector 1 seed.
    const TEST_SECRET: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";
    const TEST_PUBLIC: &str = "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";

    fn token_params() -> QueryParams {
        QueryParams::new()
            .with("client_id", "x")
            .with("org_id", "o1")
            .with("grant_type", "org_implicit")
    }

    fn token_request() -> CanonicalRequest {
        CanonicalRequest::new("GET", "/web/v2/oauth/token", "169900000").params(token_params())
    }

    #[test]
    fn canonical_string_has_five_fields() {
        assert_eq!(
            token_request().canonical_string(),
            "GET|/web/v2/oauth/token|169900000|client_id=x&org_id=o1&grant_type=org_implicit|"
        );
        assert_eq!(
            CanonicalRequest::new("GET", "/app/v2/ping", "1").canonical_string(),
            "GET|/app/v2/ping|1||"
        );
    }

    #[test]
    fn digest_is_double_sha256() {
        assert_eq!(
            token_request().digest_hex(),
            "ed85747fe49d79cf260c2a1348754df2cfc74bf169399ff8d3296ceb41c47e59"
        );
    }

    #[test]
    fn token_request_signature_matches_golden_value() {
        let signer = RequestSigner::from_hex(TEST_SECRET).unwrap();
        let expected = "69fcdd7a00ed73c08f274f2a1fd9258fd2697c017f8559d1fafb406458a7f6fd\
                        ec438148973db9a289bcba3f9ffe02b793247e2928b4e138c52d97f826a8920a";
        assert_eq!(signer.sign(&token_request()), expected);
        assert_eq!(signer.sign(&token_request()), expected);

        let one_shot = sign_request(
            "GET",
            "/web/v2/oauth/token",
            "169900000",
            &token_params(),
            None,
            TEST_SECRET,
        )
        .unwrap();
        assert_eq!(one_shot, expected);
    }

    #[test]
    fn body_is_signed_as_compact_json_in_field_order() {
        #[derive(Serialize)]
        struct Payload<'a> {
            amount: &'a str,
            memo: &'a str,
        }

        let request = CanonicalRequest::new("POST", "/app/v2/echo", "1700000000000")
            .json_body(&Payload {
                amount: "1.5",
                memo: "hi there",
            })
            .unwrap();
        assert_eq!(
            request.canonical_string(),
            r#"POST|/app/v2/echo|1700000000000||{"amount":"1.5","memo":"hi there"}"#
        );

        let signer = RequestSigner::from_hex(TEST_SECRET).unwrap();
        assert_eq!(
            signer.sign(&request),
            "000006e064e64c4eab875e4e1ea5d05ba1955e61e45ff7dbe7cc46b998654cd9\
             9645075b1cfbcf4dacce06bcb055920e4b480b3de5327e67950a23c518eea00a"
        );
    }

    #[test]
    fn changing_any_field_changes_the_signature() {
        let signer = RequestSigner::from_hex(TEST_SECRET).unwrap();
        let baseline = signer.sign(&token_request());

        let variants = vec![
            CanonicalRequest::new("POST", "/web/v2/oauth/token", "169900000")
                .params(token_params()),
            CanonicalRequest::new("GET", "/web/v2/oauth/tokens", "169900000")
                .params(token_params()),
            CanonicalRequest::new("GET", "/web/v2/oauth/token", "169900001")
                .params(token_params()),
            CanonicalRequest::new("GET", "/web/v2/oauth/token", "169900000").params(
                QueryParams::new()
                    .with("client_id", "x")
                    .with("org_id", "o2")
                    .with("grant_type", "org_implicit"),
            ),
            token_request()
                .json_body(&serde_json::json!({ "k": "v" }))
                .unwrap(),
        ];

        for variant in variants {
            assert_ne!(variant.canonical_string(), token_request().canonical_string());
            assert_ne!(signer.sign(&variant), baseline);
        }
    }

    #[test]
    fn param_order_is_significant() {
        let reordered = CanonicalRequest::new("GET", "/web/v2/oauth/token", "169900000").params(
            QueryParams::new()
                .with("org_id", "o1")
                .with("client_id", "x")
                .with("grant_type", "org_implicit"),
        );
        assert_ne!(reordered.digest(), token_request().digest());
    }

    #[test]
    fn signature_verifies_only_against_its_own_request() {
        let signer = RequestSigner::from_hex(TEST_SECRET).unwrap();
        assert_eq!(signer.public_key_hex(), TEST_PUBLIC);

        let signature = signer.sign(&token_request());
        assert!(verify(TEST_PUBLIC, &token_request(), &signature).unwrap());

        let tampered = CanonicalRequest::new("GET", "/web/v2/oauth/token", "169900001")
            .params(token_params());
        assert!(!verify(TEST_PUBLIC, &tampered, &signature).unwrap());
    }

    #[test]
    fn missing_or_malformed_keys_are_rejected() {
        assert!(matches!(
            RequestSigner::from_hex("  "),
            Err(SigningError::MissingKey)
        ));
        assert!(matches!(
            RequestSigner::from_hex("not-hex"),
            Err(SigningError::MalformedKey(_))
        ));
        assert!(matches!(
            RequestSigner::from_hex("abcd"),
            Err(SigningError::MalformedKey(_))
        ));
        assert!(matches!(
            verify(TEST_PUBLIC, &token_request(), "zz"),
            Err(SigningError::MalformedSignature(_))
        ));
    }

    #[test]
    fn nonce_is_millisecond_timestamp() {
        let nonce = Nonce::now();
        assert!(nonce.as_str().len() >= 13);
        assert!(nonce.as_str().chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn debug_output_does_not_leak_the_secret() {
        let signer = RequestSigner::from_hex(TEST_SECRET).unwrap();
        let rendered = format!("{signer:?}");
        assert!(!rendered.contains(TEST_SECRET));
        assert!(rendered.contains(TEST_PUBLIC));
    }
}
