// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Errors surfaced by the backend and partner HTTP clients.

use crate::signing::SigningError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered 401. The session has already been cleared.
    #[error("authorization expired, please log in again")]
    AuthorizationExpired,

    #[error("request failed: {0}")]
    Request(String),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response was invalid: {0}")]
    InvalidResponse(String),

    #[error("server reported unsuccessful status {0:?}")]
    UnsuccessfulStatus(String),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error("client configuration invalid: {0}")]
    Config(String),
}

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::AuthorizationExpired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_status_and_body() {
        let err = ClientError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "server returned 502: bad gateway");
        assert!(!err.is_unauthorized());
        assert!(ClientError::AuthorizationExpired.is_unauthorized());
    }

    #[test]
    fn signing_errors_convert() {
        let err: ClientError = SigningError::MissingKey.into();
        assert!(matches!(err, ClientError::Signing(SigningError::MissingKey)));
    }
}
