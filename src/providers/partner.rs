// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Partner API client: JWKS discovery, org access tokens and MFA methods.
//!
//! Signed calls carry three headers derived from one [`CanonicalRequest`]:
//! `BIZ-API-KEY`, `BIZ-API-NONCE` and `BIZ-API-SIGNATURE`.

use std::time::Duration;

use jsonwebtoken::jwk::JwkSet;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::{Config, APP_PUBLIC_KEY_ENV, APP_SECRET_ENV};
use crate::models::QueryParams;
use crate::signing::{
    CanonicalRequest, Nonce, RequestSigner, SigningError, API_KEY_HEADER, NONCE_HEADER,
    SIGNATURE_HEADER,
};

pub const JWKS_PATH: &str = "/web/v2/oauth/authorize/jwks.json";
pub const ORG_TOKEN_PATH: &str = "/web/v2/oauth/token";
pub const MFA_LIST_PATH: &str = "/app/v2/mfa/mfa_list";

const ORG_IMPLICIT_GRANT: &str = "org_implicit";

#[derive(Debug, thiserror::Error)]
pub enum PartnerError {
    #[error("partner configuration missing: {0}")]
    MissingConfig(String),

    #[error("partner signing failed: {0}")]
    Signing(#[from] SigningError),

    #[error("partner request failed: {0}")]
    Request(String),

    #[error("partner response was invalid: {0}")]
    InvalidResponse(String),
}

/// Org-scoped access token issued by the partner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerAccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MfaMethod {
    pub mfa_method: String,
    pub mfa_status: String,
}

#[derive(Debug, Deserialize)]
struct MfaListResponse {
    #[serde(default)]
    result: Vec<MfaMethod>,
}

#[derive(Debug, Clone)]
pub struct PartnerClient {
    api_base_url: String,
    client_id: String,
    api_key: Option<String>,
    signer: Option<RequestSigner>,
    http: Client,
}

impl PartnerClient {
    pub fn new(
        api_base_url: impl Into<String>,
        client_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PartnerError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PartnerError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_base_url: api_base_url.into(),
            client_id: client_id.into(),
            api_key: None,
            signer: None,
            http,
        })
    }

    /// Attach the application key pair used for signed calls.
    pub fn with_credentials(mut self, api_key: impl Into<String>, signer: RequestSigner) -> Self {
        self.api_key = Some(api_key.into());
        self.signer = Some(signer);
        self
    }

    /// Build from runtime config. Credentials are optional; signed calls
    /// fail with [`PartnerError::MissingConfig`] when they are absent.
    pub fn from_config(config: &Config) -> Result<Self, PartnerError> {
        let client = Self::new(
            &config.partner_api_base_url,
            &config.client_id,
            config.http_timeout,
        )?;

        match (&config.api_key, &config.app_secret) {
            (Some(api_key), Some(secret)) => {
                let signer = RequestSigner::from_hex(secret)?;
                Ok(client.with_credentials(api_key, signer))
            }
            _ => Ok(client),
        }
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn is_signing_configured(&self) -> bool {
        self.api_key.is_some() && self.signer.is_some()
    }

    /// Fetch the partner's JSON Web Key Set. Unsigned.
    pub async fn verify_info(&self) -> Result<JwkSet, PartnerError> {
        self.get_json(JWKS_PATH, &QueryParams::new(), &[]).await
    }

    /// Exchange the application credentials for an org-scoped access token.
    pub async fn access_token(&self, org_id: &str) -> Result<PartnerAccessToken, PartnerError> {
        let params = QueryParams::new()
            .with("client_id", self.client_id.as_str())
            .with("org_id", org_id)
            .with("grant_type", ORG_IMPLICIT_GRANT);

        let token: PartnerAccessToken = self.signed_get_json(ORG_TOKEN_PATH, params, None).await?;
        if token.access_token.trim().is_empty() {
            return Err(PartnerError::InvalidResponse(
                "token response did not include access_token".to_string(),
            ));
        }

        info!(org_id, "partner org access token issued");
        Ok(token)
    }

    /// List the MFA methods configured for a user.
    pub async fn mfa_methods(
        &self,
        user_id: &str,
        access_token: &str,
    ) -> Result<Vec<MfaMethod>, PartnerError> {
        let params = QueryParams::new().with("user_id", user_id);
        let response: MfaListResponse = self
            .signed_get_json(MFA_LIST_PATH, params, Some(access_token))
            .await?;
        Ok(response.result)
    }

    /// Signature headers for one request, in send order.
    pub fn signature_headers(
        &self,
        request: &CanonicalRequest,
    ) -> Result<Vec<(&'static str, String)>, PartnerError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| PartnerError::MissingConfig(APP_PUBLIC_KEY_ENV.to_string()))?;
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| PartnerError::MissingConfig(APP_SECRET_ENV.to_string()))?;

        Ok(vec![
            (API_KEY_HEADER, api_key.clone()),
            (NONCE_HEADER, request.nonce().to_string()),
            (SIGNATURE_HEADER, signer.sign(request)),
        ])
    }

    async fn signed_get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: QueryParams,
        bearer: Option<&str>,
    ) -> Result<T, PartnerError> {
        let request = CanonicalRequest::new("GET", path, Nonce::now()).params(params);
        let mut headers = self.signature_headers(&request)?;
        if let Some(token) = bearer {
            headers.push(("Authorization", format!("Bearer {token}")));
        }
        self.get_json(path, request.query(), &headers).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &QueryParams,
        headers: &[(&'static str, String)],
    ) -> Result<T, PartnerError> {
        let mut builder = self.http.get(format!(
            "{}{}",
            self.api_base_url.trim_end_matches('/'),
            path
        ));
        if !params.is_empty() {
            builder = builder.query(params.pairs());
        }
        for (name, value) in headers {
            builder = builder.header(*name, value);
        }

        debug!(path, "partner request");
        let response = builder.send().await.map_err(|e| {
            error!(path, error = %e, "partner request error");
            PartnerError::Request(format!("GET {path} failed: {e}"))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PartnerError::Request(format!(
                "GET {path} returned {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PartnerError::InvalidResponse(format!("GET {path} invalid JSON: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::verify;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    const SEED: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";
    const PUBLIC_KEY: &str = "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";

    fn client(base_url: &str) -> PartnerClient {
        PartnerClient::new(base_url, "app-1", Duration::from_secs(5))
            .unwrap()
            .with_credentials("pub-key-1", RequestSigner::from_hex(SEED).unwrap())
    }

    fn header_value(request: &Request, name: &str) -> String {
        request
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    /// Rebuild the canonical request from what the server received and check
    /// the signature against it.
    fn assert_signed(request: &Request, expected_path: &str) {
        assert_eq!(header_value(request, "biz-api-key"), "pub-key-1");
        let nonce = header_value(request, "biz-api-nonce");
        let signature = header_value(request, "biz-api-signature");

        let params: QueryParams = request
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let canonical = CanonicalRequest::new("GET", expected_path, nonce.as_str()).params(params);
        assert!(verify(PUBLIC_KEY, &canonical, &signature).unwrap());
    }

    #[tokio::test]
    async fn verify_info_is_unsigned() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "keys": [{
                    "kty": "OKP",
                    "crv": "Ed25519",
                    "kid": "portal-key-1",
                    "x": "PUAXw-hDiVqStwqnTRt-vJyYLM8uxJaMwM1V8Sr0Zgw"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let jwks = client(&server.uri()).verify_info().await.unwrap();
        assert_eq!(jwks.keys.len(), 1);
        assert_eq!(jwks.keys[0].common.key_id.as_deref(), Some("portal-key-1"));

        let received = server.received_requests().await.unwrap();
        assert!(received[0].headers.get("biz-api-signature").is_none());
    }

    #[tokio::test]
    async fn access_token_sends_signed_org_implicit_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ORG_TOKEN_PATH))
            .and(query_param("client_id", "app-1"))
            .and(query_param("org_id", "o1"))
            .and(query_param("grant_type", "org_implicit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "AT",
                "token_type": "Bearer",
                "expires_in": 43200
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = client(&server.uri()).access_token("o1").await.unwrap();
        assert_eq!(token.access_token, "AT");
        assert_eq!(token.expires_in, Some(43200));

        let received = server.received_requests().await.unwrap();
        assert_eq!(
            received[0].url.query(),
            Some("client_id=app-1&org_id=o1&grant_type=org_implicit")
        );
        assert_signed(&received[0], ORG_TOKEN_PATH);
    }

    #[tokio::test]
    async fn mfa_methods_carry_bearer_and_signature() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(MFA_LIST_PATH))
            .and(query_param("user_id", "u1"))
            .and(header("authorization", "Bearer AT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "result": [
                    { "mfa_method": "totp", "mfa_status": "active" },
                    { "mfa_method": "email", "mfa_status": "inactive" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let methods = client(&server.uri()).mfa_methods("u1", "AT").await.unwrap();
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].mfa_method, "totp");
        assert_eq!(methods[1].mfa_status, "inactive");

        let received = server.received_requests().await.unwrap();
        assert_signed(&received[0], MFA_LIST_PATH);
    }

    #[tokio::test]
    async fn signed_calls_require_credentials() {
        let unsigned = PartnerClient::new("http://localhost:1", "app-1", Duration::from_secs(1)).unwrap();
        assert!(!unsigned.is_signing_configured());
        assert!(matches!(
            unsigned.access_token("o1").await,
            Err(PartnerError::MissingConfig(name)) if name == APP_PUBLIC_KEY_ENV
        ));
    }

    #[tokio::test]
    async fn empty_access_token_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ORG_TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": " " })))
            .mount(&server)
            .await;

        assert!(matches!(
            client(&server.uri()).access_token("o1").await,
            Err(PartnerError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn non_success_status_is_a_request_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        match client(&server.uri()).verify_info().await {
            Err(PartnerError::Request(message)) => assert!(message.contains("503")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn from_config_rejects_malformed_secret() {
        let config = Config::from_lookup(|name| match name {
            APP_PUBLIC_KEY_ENV => Some("pub".to_string()),
            APP_SECRET_ENV => Some("not-hex".to_string()),
            _ => None,
        })
        .unwrap();
        assert!(matches!(
            PartnerClient::from_config(&config),
            Err(PartnerError::Signing(SigningError::MalformedKey(_)))
        ));
    }
}
