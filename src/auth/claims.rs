// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Portal JWT claims and the user info derived from them.

use serde::{Deserialize, Serialize};

use super::error::AuthError;

/// Claims carried by the host portal token.
///
/// Only `org_id` is needed to key the session; the rest feeds
/// [`PortalUserInfo`] once the token is verified.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortalClaims {
    #[serde(default)]
    pub sub: String,

    /// Organization the portal user is acting for
    #[serde(default)]
    pub org_id: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub roles: Vec<String>,

    /// Display names for `roles`
    #[serde(default)]
    pub role_names: Vec<String>,

    #[serde(default)]
    pub iat: Option<i64>,

    #[serde(default)]
    pub exp: Option<i64>,
}

impl PortalClaims {
    /// Decode the payload without checking the signature.
    ///
    /// The host portal is the trust anchor for this path; use
    /// [`super::jwks::JwksCache::verify_portal_token`] when the claims must
    /// be authenticated.
    pub fn decode_unverified(token: &str) -> Result<Self, AuthError> {
        let token_data = jsonwebtoken::dangerous::insecure_decode::<PortalClaims>(token)
            .map_err(|_e| AuthError::MalformedToken)?;
        Ok(token_data.claims)
    }
}

/// Portal user as presented to the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalUserInfo {
    pub email: String,
    pub roles: Vec<String>,
    pub role_names: Vec<String>,
    /// Host-supplied user id; not part of the token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub org_id: String,
    pub sub: String,
}

impl PortalUserInfo {
    pub fn from_claims(claims: PortalClaims, user_id: Option<String>) -> Self {
        Self {
            email: claims.email,
            roles: claims.roles,
            role_names: claims.role_names,
            user_id,
            org_id: claims.org_id,
            sub: claims.sub,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}


#[cfg(test)]
mod tests {
    use super::test_tokens::*;
    use super::*;

    #[test]
    fn decode_unverified_reads_org_id() {
        let claims = PortalClaims::decode_unverified(&portal_token("o1")).unwrap();
        assert_eq!(claims.org_id, "o1");
        assert_eq!(claims.sub, "sub-1");
        assert!(claims.roles.is_empty());
    }

    #[test]
    fn missing_org_id_decodes_as_empty() {
        let claims = PortalClaims::decode_unverified(&unsigned_jwt(r#"{"sub":"s"}"#)).unwrap();
        assert!(claims.org_id.is_empty());
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            PortalClaims::decode_unverified("not-a-jwt"),
            Err(AuthError::MalformedToken)
        ));
    }

    #[test]
    fn user_info_takes_user_id_from_host() {
        let claims = PortalClaims {
            sub: "sub-1".into(),
            org_id: "o1".into(),
            email: "ops@example.com".into(),
            roles: vec!["admin".into()],
            role_names: vec!["Admin".into()],
            ..Default::default()
        };
        let info = PortalUserInfo::from_claims(claims, Some("u1".into()));
        assert_eq!(info.user_id.as_deref(), Some("u1"));
        assert_eq!(info.org_id, "o1");
        assert!(info.has_role("admin"));
        assert!(!info.has_role("viewer"));
    }
}
