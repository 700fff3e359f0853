use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use mentorhub_core::{ChapterId, UserId};

use crate::Role;

/// Identity token claims (transport-agnostic).
///
/// This is the minimal set of claims MentorHub expects once a token has been
/// decoded/verified by whatever transport/security layer is in use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Directory object id of the signed-in user.
    pub oid: UserId,

    /// Display name.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,

    /// Raw app-role values. May contain roles this system does not know.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Chapter the user is assigned to (directory extension attribute).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter_id: Option<ChapterId>,

    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,

    /// Expiration, seconds since the Unix epoch.
    pub exp: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token is malformed or its signature is invalid: {0}")]
    Malformed(String),

    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate identity claims.
///
/// Note: this validates the *claims* only. Signature verification / decoding
/// happens in [`crate::token`].
pub fn validate_claims(
    claims: &IdentityClaims,
    now: DateTime<Utc>,
) -> Result<(), TokenValidationError> {
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    let now = now.timestamp();
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

/// Normalize the raw role claims into the known roles, deduplicated and sorted.
///
/// Unknown claims are ignored.
pub fn extract_roles(claims: &IdentityClaims) -> Vec<Role> {
    let mut roles = BTreeSet::new();
    for claim in &claims.roles {
        match Role::from_claim(claim) {
            Some(role) => {
                roles.insert(role);
            }
            None => tracing::debug!(claim = %claim, user_id = %claims.oid, "ignoring unknown role claim"),
        }
    }
    roles.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims(roles: &[&str], iat: DateTime<Utc>, exp: DateTime<Utc>) -> IdentityClaims {
        IdentityClaims {
            oid: UserId::new(),
            name: "Jo Mentor".to_string(),
            preferred_username: Some("jo@example.org".to_string()),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            chapter_id: None,
            iat: iat.timestamp(),
            exp: exp.timestamp(),
        }
    }

    #[test]
    fn extract_roles_dedups_sorts_and_ignores_unknown() {
        let now = Utc::now();
        let c = claims(
            &["Mentor", "Director", "Admin", "Mentor", ""],
            now,
            now + Duration::minutes(5),
        );

        assert_eq!(extract_roles(&c), vec![Role::Admin, Role::Mentor]);
    }

    #[test]
    fn extract_roles_of_no_claims_is_empty() {
        let now = Utc::now();
        let c = claims(&[], now, now + Duration::minutes(5));
        assert!(extract_roles(&c).is_empty());
    }

    #[test]
    fn validate_claims_checks_time_window() {
        let now = Utc::now();

        let ok = claims(&[], now - Duration::minutes(1), now + Duration::minutes(5));
        assert_eq!(validate_claims(&ok, now), Ok(()));

        let expired = claims(&[], now - Duration::minutes(10), now - Duration::minutes(1));
        assert_eq!(validate_claims(&expired, now), Err(TokenValidationError::Expired));

        let future = claims(&[], now + Duration::minutes(1), now + Duration::minutes(10));
        assert_eq!(validate_claims(&future, now), Err(TokenValidationError::NotYetValid));

        let inverted = claims(&[], now, now - Duration::minutes(1));
        assert_eq!(
            validate_claims(&inverted, now),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }

    #[test]
    fn missing_optional_claims_deserialize_with_defaults() {
        let oid = UserId::new();
        let json = serde_json::json!({
            "oid": oid.to_string(),
            "name": "Sam",
            "iat": 1,
            "exp": 2,
        });

        let c: IdentityClaims = serde_json::from_value(json).unwrap();
        assert_eq!(c.oid, oid);
        assert!(c.roles.is_empty());
        assert!(c.chapter_id.is_none());
    }
}
