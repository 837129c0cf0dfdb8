// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Portal-embedded session handling for the wallet dashboard.
//!
//! ## Auth Flow
//!
//! 1. The host portal hands over `{token, userID}` through a [`PortalBridge`]
//! 2. `org_id` is decoded from the portal token claims
//! 3. The portal token is exchanged at `POST /auth` for a backend
//!    `{token, refresh_token}` pair
//! 4. The pair is persisted under `(org_id, user_id)` and attached to every
//!    backend call as `Authorization: Bearer <token>`
//! 5. Any 401 clears the pair; the next restore lands on the login path
//!
//! ## Verification
//!
//! The session path trusts the host and decodes claims without verifying
//! them. [`JwksCache::verify_portal_token`] verifies the signature against
//! the partner JWKS when the caller needs authenticated user info.

pub mod bridge;
pub mod claims;
pub mod error;
pub mod jwks;
pub mod session;

pub use bridge::{HostAuthInfo, LocaleSubscription, PortalBridge, StaticPortalBridge};
pub use claims::{PortalClaims, PortalUserInfo};
pub use error::AuthError;
pub use jwks::JwksCache;
pub use session::{
    PortalIdentity, Session, SessionState, SessionTokenManager, SessionTokenPair,
};
