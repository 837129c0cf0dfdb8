// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response shapes shared by the backend client and the partner
//! client. Backend responses arrive wrapped in an [`ApiEnvelope`] whose
//! `status` field is `"success"` on success; list endpoints additionally
//! carry cursor [`Pagination`].
//!
//! ## Model Categories
//!
//! - **Query parameters**: ordered key/value pairs ([`QueryParams`])
//! - **Envelope**: `{status, data, pagination?}` ([`ApiEnvelope`])
//! - **Auth exchange**: login/refresh bodies and responses
//! - **Wallets**: wallet summaries, addresses and withdraw requests

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::ClientError;

/// Status value the backend uses to mark a successful envelope.
pub const SUCCESS_STATUS: &str = "success";

// =============================================================================
// Query Parameters
// =============================================================================

/// Ordered query parameters.
///
/// Order is preserved exactly as constructed: the partner API signs the
/// encoded query string, so reordering would change the signature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter, keeping insertion order.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Builder form of [`QueryParams::push`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Encode as `application/x-www-form-urlencoded` (space becomes `+`).
    ///
    /// Returns an empty string when there are no parameters.
    pub fn encode(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.0 {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// =============================================================================
// Response Envelope
// =============================================================================

/// Cursor pagination returned by list endpoints.
///
/// An empty cursor means there is no page in that direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub before: String,
    #[serde(default)]
    pub after: String,
    #[serde(default)]
    pub total_count: u64,
}

impl Pagination {
    pub fn has_previous(&self) -> bool {
        !self.before.is_empty()
    }

    pub fn has_next(&self) -> bool {
        !self.after.is_empty()
    }
}

/// Backend response wrapper: `{status, data, pagination?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub status: String,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_success(&self) -> bool {
        self.status == SUCCESS_STATUS
    }

    /// Unwrap the payload of a successful envelope.
    pub fn into_data(self) -> Result<T, ClientError> {
        if !self.is_success() {
            return Err(ClientError::UnsuccessfulStatus(self.status));
        }
        self.data.ok_or_else(|| {
            ClientError::InvalidResponse("successful envelope without data".to_string())
        })
    }
}

// =============================================================================
// Auth Exchange
// =============================================================================

/// `POST /auth` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub token: String,
}

/// `POST /auth` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub refresh_token: String,
}

/// `POST /auth/refresh` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// `POST /auth/refresh` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshResponse {
    #[serde(default)]
    pub token: String,
}

// =============================================================================
// Wallet Models
// =============================================================================

/// Which neighbouring page a cursor points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDirection {
    Before,
    After,
}

impl PageDirection {
    pub fn as_param(self) -> &'static str {
        match self {
            PageDirection::Before => "before",
            PageDirection::After => "after",
        }
    }
}

/// Filters for `GET /api/wallets`.
#[derive(Debug, Clone, Default)]
pub struct ListWalletsParams {
    /// Wallet type tab; `None` lists every type.
    pub wallet_type: Option<String>,
    /// Cursor and the direction it should be followed in.
    pub cursor: Option<(String, PageDirection)>,
}

impl ListWalletsParams {
    pub fn to_query(&self) -> QueryParams {
        let mut params = QueryParams::new();
        if let Some(wallet_type) = self.wallet_type.as_deref().filter(|t| !t.is_empty()) {
            params.push("wallet_type", wallet_type);
        }
        if let Some((cursor, direction)) = &self.cursor {
            if !cursor.is_empty() {
                params.push(direction.as_param(), cursor.as_str());
            }
        }
        params
    }
}

/// A wallet row as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletSummary {
    pub wallet_id: String,
    pub name: String,
    pub wallet_type: String,
    pub wallet_subtype: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl WalletSummary {
    /// Keep only well-formed wallet rows, dropping nulls and partial objects.
    pub fn from_rows(rows: Vec<Value>) -> Vec<WalletSummary> {
        rows.into_iter()
            .filter(Value::is_object)
            .filter_map(|row| serde_json::from_value(row).ok())
            .collect()
    }
}

/// A deposit address on a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub address: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// `POST /api/wallets/{id}/withdraw` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub token: String,
    pub amount: String,
    pub address: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_params_keep_insertion_order() {
        let params = QueryParams::new()
            .with("client_id", "x")
            .with("org_id", "o1")
            .with("grant_type", "org_implicit");
        assert_eq!(params.encode(), "client_id=x&org_id=o1&grant_type=org_implicit");
        assert_eq!(params.get("org_id"), Some("o1"));
    }

    #[test]
    fn query_params_use_form_encoding() {
        let params = QueryParams::new().with("memo", "a b&c=d");
        assert_eq!(params.encode(), "memo=a+b%26c%3Dd");
        assert_eq!(QueryParams::new().encode(), "");
    }

    #[test]
    fn envelope_into_data_requires_success() {
        let ok: ApiEnvelope<u32> = serde_json::from_value(json!({
            "status": "success",
            "data": 7
        }))
        .unwrap();
        assert_eq!(ok.into_data().unwrap(), 7);

        let failed: ApiEnvelope<u32> =
            serde_json::from_value(json!({ "status": "error" })).unwrap();
        assert!(matches!(
            failed.into_data(),
            Err(ClientError::UnsuccessfulStatus(status)) if status == "error"
        ));
    }

    #[test]
    fn envelope_decodes_payloads_without_default() {
        let created: ApiEnvelope<Address> = serde_json::from_value(json!({
            "status": "success",
            "data": { "address": "0xabc", "chain_id": "ETH" }
        }))
        .unwrap();
        let address = created.into_data().unwrap();
        assert_eq!(address.address, "0xabc");
        assert_eq!(address.extra.get("chain_id"), Some(&json!("ETH")));

        let empty: ApiEnvelope<Address> =
            serde_json::from_value(json!({ "status": "success" })).unwrap();
        assert_eq!(empty.data, None);
    }

    #[test]
    fn list_wallets_params_skip_all_tab_and_empty_cursor() {
        let params = ListWalletsParams {
            wallet_type: None,
            cursor: Some((String::new(), PageDirection::After)),
        };
        assert!(params.to_query().is_empty());

        let params = ListWalletsParams {
            wallet_type: Some("Custodial".to_string()),
            cursor: Some(("c-9".to_string(), PageDirection::Before)),
        };
        assert_eq!(params.to_query().encode(), "wallet_type=Custodial&before=c-9");
    }

    #[test]
    fn wallet_rows_drop_nulls_and_partial_objects() {
        let rows = vec![
            json!(null),
            json!({ "wallet_id": "w1", "name": "Main" }),
            json!({
                "wallet_id": "w2",
                "name": "Ops",
                "wallet_type": "Custodial",
                "wallet_subtype": "Asset",
                "org_id": "o1"
            }),
        ];
        let wallets = WalletSummary::from_rows(rows);
        assert_eq!(wallets.len(), 1);
        assert_eq!(wallets[0].wallet_id, "w2");
        assert_eq!(wallets[0].extra.get("org_id"), Some(&json!("o1")));
    }

    #[test]
    fn pagination_cursors_signal_neighbouring_pages() {
        let page = Pagination {
            before: String::new(),
            after: "next".to_string(),
            total_count: 12,
        };
        assert!(!page.has_previous());
        assert!(page.has_next());
    }
}
