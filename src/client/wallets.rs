// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet endpoints under `/api/wallets`.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{ClientError, LatestSlot, WalletApi};
use crate::models::{
    Address, ApiEnvelope, ListWalletsParams, PageDirection, Pagination, QueryParams,
    WalletSummary, WithdrawRequest,
};

/// One page of the wallet list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletPage {
    pub wallets: Vec<WalletSummary>,
    pub pagination: Pagination,
}

impl WalletApi<'_> {
    pub async fn list_wallets(
        &self,
        params: &QueryParams,
    ) -> Result<ApiEnvelope<Vec<Value>>, ClientError> {
        self.get("/api/wallets", Some(params)).await
    }

    /// Fetch one page of wallets, dropping malformed rows.
    pub async fn wallet_page(&self, params: &ListWalletsParams) -> Result<WalletPage, ClientError> {
        let envelope = self.list_wallets(&params.to_query()).await?;
        let pagination = envelope.pagination.clone().unwrap_or_default();
        let rows = envelope.into_data()?;
        Ok(WalletPage {
            wallets: WalletSummary::from_rows(rows),
            pagination,
        })
    }

    pub async fn get_wallet(&self, wallet_id: &str) -> Result<ApiEnvelope<Value>, ClientError> {
        self.get(&format!("/api/wallets/{wallet_id}"), None).await
    }

    pub async fn wallet_balance(
        &self,
        wallet_id: &str,
        params: &QueryParams,
    ) -> Result<ApiEnvelope<Value>, ClientError> {
        self.get(&format!("/api/wallets/{wallet_id}/balance"), Some(params))
            .await
    }

    pub async fn wallet_transactions(
        &self,
        wallet_id: &str,
        params: &QueryParams,
    ) -> Result<ApiEnvelope<Value>, ClientError> {
        self.get(&format!("/api/wallets/{wallet_id}/transactions"), Some(params))
            .await
    }

    pub async fn create_address(
        &self,
        wallet_id: &str,
        body: &Value,
    ) -> Result<ApiEnvelope<Value>, ClientError> {
        self.post(&format!("/api/wallets/{wallet_id}/addresses"), body)
            .await
    }

    pub async fn list_wallet_addresses(
        &self,
        wallet_id: &str,
        params: &QueryParams,
    ) -> Result<ApiEnvelope<Value>, ClientError> {
        self.get(&format!("/api/wallets/{wallet_id}/addresses"), Some(params))
            .await
    }

    pub async fn withdraw(
        &self,
        wallet_id: &str,
        request: &WithdrawRequest,
    ) -> Result<ApiEnvelope<Value>, ClientError> {
        self.post(&format!("/api/wallets/{wallet_id}/withdraw"), request)
            .await
    }

    pub async fn supported_chains(
        &self,
        params: &QueryParams,
    ) -> Result<ApiEnvelope<Value>, ClientError> {
        self.get("/api/wallets/chains", Some(params)).await
    }

    pub async fn supported_tokens(
        &self,
        params: &QueryParams,
    ) -> Result<ApiEnvelope<Value>, ClientError> {
        self.get("/api/wallets/tokens", Some(params)).await
    }

    pub async fn check_address_validity(
        &self,
        params: &QueryParams,
    ) -> Result<ApiEnvelope<Value>, ClientError> {
        self.get("/api/wallets/check_address_validity", Some(params))
            .await
    }

    /// Addresses of `wallet_id` for one token.
    pub async fn list_addresses(
        &self,
        wallet_id: &str,
        token_id: &str,
    ) -> Result<ApiEnvelope<Vec<Address>>, ClientError> {
        let params = QueryParams::new().with("coin", token_id);
        self.get(&format!("/api/wallets/{wallet_id}/addresses"), Some(&params))
            .await
    }

    pub async fn new_address(
        &self,
        wallet_id: &str,
        token_id: &str,
    ) -> Result<ApiEnvelope<Address>, ClientError> {
        let body = serde_json::json!({ "coin": token_id });
        self.post(&format!("/api/wallets/{wallet_id}/addresses"), &body)
            .await
    }

    /// Address to deposit `token_id` into `wallet_id`.
    ///
    /// Uses the first existing address; when the lookup fails, is
    /// unsuccessful or comes back empty, a new address is created instead.
    /// An expired session is never papered over by the fallback.
    pub async fn deposit_address(
        &self,
        wallet_id: &str,
        token_id: &str,
    ) -> Result<String, ClientError> {
        match self.list_addresses(wallet_id, token_id).await {
            Ok(envelope) if envelope.is_success() => {
                if let Some(first) = envelope.data.into_iter().flatten().next() {
                    return Ok(first.address);
                }
                debug!(wallet_id, token_id, "no deposit address yet, creating one");
            }
            Ok(envelope) => {
                warn!(wallet_id, token_id, status = %envelope.status, "address lookup unsuccessful, creating one");
            }
            Err(ClientError::AuthorizationExpired) => return Err(ClientError::AuthorizationExpired),
            Err(e) => {
                warn!(wallet_id, token_id, error = %e, "address lookup failed, creating one");
            }
        }

        let created = self.new_address(wallet_id, token_id).await?;
        Ok(created.into_data()?.address)
    }
}

/// Paged wallet list for one wallet-type tab.
///
/// Overlapping page loads are resolved in favour of the most recently
/// issued one.
#[derive(Debug, Default)]
pub struct WalletPager {
    wallet_type: Option<String>,
    page: LatestSlot<WalletPage>,
}

impl WalletPager {
    pub fn new(wallet_type: Option<String>) -> Self {
        Self {
            wallet_type,
            page: LatestSlot::new(),
        }
    }

    pub fn current(&self) -> Option<WalletPage> {
        self.page.current()
    }

    /// Load the page at `cursor` (first page when `None`).
    ///
    /// Returns whether this load's result was applied.
    pub async fn load(
        &self,
        api: &WalletApi<'_>,
        cursor: Option<(String, PageDirection)>,
    ) -> Result<bool, ClientError> {
        let params = ListWalletsParams {
            wallet_type: self.wallet_type.clone(),
            cursor,
        };
        self.page.load(api.wallet_page(&params)).await
    }

    /// Follow the `after` cursor. No-op when there is no next page.
    pub async fn next_page(&self, api: &WalletApi<'_>) -> Result<bool, ClientError> {
        let Some(cursor) = self
            .current()
            .map(|page| page.pagination.after)
            .filter(|c| !c.is_empty())
        else {
            return Ok(false);
        };
        self.load(api, Some((cursor, PageDirection::After))).await
    }

    /// Follow the `before` cursor. No-op when there is no previous page.
    pub async fn previous_page(&self, api: &WalletApi<'_>) -> Result<bool, ClientError> {
        let Some(cursor) = self
            .current()
            .map(|page| page.pagination.before)
            .filter(|c| !c.is_empty())
        else {
            return Ok(false);
        };
        self.load(api, Some((cursor, PageDirection::Before))).await
    }
}
