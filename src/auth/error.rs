// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use crate::storage::StorageError;

/// Session and portal-token error type.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The host portal could not supply a complete identity
    #[error("portal identity unavailable: {0}")]
    IdentityUnavailable(String),
    /// Exchanging the portal token for a session failed
    #[error("login failed: {0}")]
    LoginFailed(String),
    /// Refreshing the access token failed
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),
    /// The backend rejected the session credentials
    #[error("Auth failed. Please login and try again")]
    AuthorizationExpired,
    /// Token persistence failed
    #[error("token storage failed: {0}")]
    Storage(#[from] StorageError),
    /// Token is malformed
    #[error("Token is malformed")]
    MalformedToken,
    /// Token signature is invalid
    #[error("Token signature is invalid")]
    InvalidSignature,
    /// Token has expired
    #[error("Token has expired")]
    TokenExpired,
    /// Token is not yet valid
    #[error("Token is not yet valid")]
    TokenNotYetValid,
    /// No matching key in JWKS
    #[error("No matching key found in JWKS")]
    NoMatchingKey,
    /// JWKS fetch failed
    #[error("Failed to fetch JWKS: {0}")]
    JwksFetchError(String),
    #[error("Internal authentication error: {0}")]
    InternalError(String),
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::IdentityUnavailable(_) => "identity_unavailable",
            AuthError::LoginFailed(_) => "login_failed",
            AuthError::RefreshFailed(_) => "refresh_failed",
            AuthError::AuthorizationExpired => "authorization_expired",
            AuthError::Storage(_) => "storage_error",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::NoMatchingKey => "no_matching_key",
            AuthError::JwksFetchError(_) => "jwks_fetch_error",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    /// Whether the caller should send the user back through login.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            AuthError::IdentityUnavailable(_)
                | AuthError::AuthorizationExpired
                | AuthError::TokenExpired
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(
            AuthError::IdentityUnavailable("no token".into()).error_code(),
            "identity_unavailable"
        );
        assert_eq!(AuthError::AuthorizationExpired.error_code(), "authorization_expired");
        assert_eq!(AuthError::NoMatchingKey.error_code(), "no_matching_key");
    }

    #[test]
    fn authorization_expired_uses_dashboard_message() {
        let err = AuthError::AuthorizationExpired;
        assert_eq!(err.to_string(), "Auth failed. Please login and try again");
        assert!(err.requires_login());
        assert!(!AuthError::RefreshFailed("x".into()).requires_login());
    }
}
