// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Token Storage
//!
//! Persists the backend session token pair per portal identity so a reload
//! inside the same host session does not require a fresh login.
//!
//! ## Key Layout
//!
//! ```text
//! app_access_token_{org_id}_{user_id}   -> access token
//! app_refresh_token_{org_id}_{user_id}  -> refresh token
//! ```
//!
//! The file-backed store keeps all keys in `{DATA_DIR}/session_tokens.json`.

pub mod keys;
pub mod token_store;

pub use keys::{StoragePaths, TokenKeys};
pub use token_store::{
    FileTokenStore, MemoryTokenStore, StorageError, StorageResult, TokenStore,
};
