//! Bearer token verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use crate::claims::{IdentityClaims, TokenValidationError, validate_claims};

/// Turns a raw bearer token into verified identity claims.
pub trait TokenValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>)
    -> Result<IdentityClaims, TokenValidationError>;
}

/// HS256 shared-secret validator.
///
/// The signature is checked by `jsonwebtoken`; the time window is checked
/// against the caller's clock through [`validate_claims`].
pub struct Hs256TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256TokenValidator {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Require the `aud` claim to equal `audience`.
    pub fn with_audience(mut self, audience: &str) -> Self {
        self.validation.set_audience(&[audience]);
        self.validation.set_required_spec_claims(&["exp", "aud"]);
        self.validation.validate_aud = true;
        self
    }
}

impl TokenValidator for Hs256TokenValidator {
    fn validate(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<IdentityClaims, TokenValidationError> {
        let data = decode::<IdentityClaims>(token, &self.key, &self.validation)
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use mentorhub_core::UserId;

    const SECRET: &[u8] = b"test-secret";

    fn claims(iat: DateTime<Utc>, exp: DateTime<Utc>) -> IdentityClaims {
        IdentityClaims {
            oid: UserId::new(),
            name: "Robin".to_string(),
            preferred_username: None,
            roles: vec!["Mentor".to_string()],
            chapter_id: None,
            iat: iat.timestamp(),
            exp: exp.timestamp(),
        }
    }

    fn mint(secret: &[u8], iat: DateTime<Utc>, exp: DateTime<Utc>) -> String {
        let claims = claims(iat, exp);
        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    fn mint_for(audience: Option<&str>, now: DateTime<Utc>) -> String {
        let mut claims = serde_json::to_value(claims(now, now + Duration::minutes(10))).unwrap();
        if let Some(audience) = audience {
            claims["aud"] = serde_json::json!(audience);
        }
        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    #[test]
    fn accepts_a_valid_token() {
        let now = Utc::now();
        let token = mint(SECRET, now - Duration::minutes(1), now + Duration::minutes(10));

        let claims = Hs256TokenValidator::new(SECRET).validate(&token, now).unwrap();
        assert_eq!(claims.name, "Robin");
        assert_eq!(claims.roles, vec!["Mentor".to_string()]);
    }

    #[test]
    fn rejects_a_foreign_signature() {
        let now = Utc::now();
        let token = mint(b"other-secret", now, now + Duration::minutes(10));

        assert!(matches!(
            Hs256TokenValidator::new(SECRET).validate(&token, now),
            Err(TokenValidationError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_an_expired_token() {
        let now = Utc::now();
        let token = mint(SECRET, now - Duration::hours(2), now - Duration::hours(1));

        assert_eq!(
            Hs256TokenValidator::new(SECRET).validate(&token, now),
            Err(TokenValidationError::Expired)
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            Hs256TokenValidator::new(SECRET).validate("not-a-jwt", Utc::now()),
            Err(TokenValidationError::Malformed(_))
        ));
    }

    #[test]
    fn audience_is_enforced_when_configured() {
        let now = Utc::now();
        let validator = Hs256TokenValidator::new(SECRET).with_audience("mentorhub-api");

        assert!(validator.validate(&mint_for(Some("mentorhub-api"), now), now).is_ok());
        assert!(matches!(
            validator.validate(&mint_for(Some("someone-else"), now), now),
            Err(TokenValidationError::Malformed(_))
        ));
        assert!(matches!(
            validator.validate(&mint_for(None, now), now),
            Err(TokenValidationError::Malformed(_))
        ));
    }

    #[test]
    fn audience_is_ignored_by_default() {
        let now = Utc::now();
        let validator = Hs256TokenValidator::new(SECRET);

        assert!(validator.validate(&mint_for(Some("anything"), now), now).is_ok());
        assert!(validator.validate(&mint_for(None, now), now).is_ok());
    }
}
