// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Storage key naming and on-disk layout for persisted session tokens.

use std::path::{Path, PathBuf};

/// Default directory for the file-backed token store.
pub const DATA_ROOT: &str = "./data";

/// File holding the persisted key/value map.
pub const TOKENS_FILE: &str = "session_tokens.json";

const ACCESS_TOKEN_PREFIX: &str = "app_access_token";
const REFRESH_TOKEN_PREFIX: &str = "app_refresh_token";

/// Storage keys for one `(org_id, user_id)` identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenKeys {
    org_id: String,
    user_id: String,
}

impl TokenKeys {
    pub fn new(org_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            org_id: org_id.into(),
            user_id: user_id.into(),
        }
    }

    /// `app_access_token_{org_id}_{user_id}`
    pub fn access_token(&self) -> String {
        format!("{ACCESS_TOKEN_PREFIX}_{}_{}", self.org_id, self.user_id)
    }

    /// `app_refresh_token_{org_id}_{user_id}`
    pub fn refresh_token(&self) -> String {
        format!("{REFRESH_TOKEN_PREFIX}_{}_{}", self.org_id, self.user_id)
    }
}

/// Location of the file-backed store.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tokens_file(&self) -> PathBuf {
        self.root.join(TOKENS_FILE)
    }
}
