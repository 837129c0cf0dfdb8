// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction endpoints under `/api/transactions`.

use serde_json::Value;

use super::{ClientError, WalletApi};
use crate::models::{ApiEnvelope, QueryParams};

impl WalletApi<'_> {
    pub async fn list_transactions(
        &self,
        params: &QueryParams,
    ) -> Result<ApiEnvelope<Value>, ClientError> {
        self.get("/api/transactions", Some(params)).await
    }

    pub async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<ApiEnvelope<Value>, ClientError> {
        self.get(&format!("/api/transactions/{transaction_id}"), None)
            .await
    }

    pub async fn transfer(&self, body: &Value) -> Result<ApiEnvelope<Value>, ClientError> {
        self.post("/api/transactions/transfer", body).await
    }

    pub async fn contract_call(&self, body: &Value) -> Result<ApiEnvelope<Value>, ClientError> {
        self.post("/api/transactions/contract_call", body).await
    }

    pub async fn message_sign(&self, body: &Value) -> Result<ApiEnvelope<Value>, ClientError> {
        self.post("/api/transactions/message_sign", body).await
    }
}
