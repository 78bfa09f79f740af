//! HS256 bearer-token session resolution.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};
use crate::Session;

/// Resolves a bearer token into a session.
///
/// This is the seam to the external session provider; the API only depends on
/// this trait.
pub trait SessionResolver: Send + Sync {
    fn resolve(&self, token: &str, now: DateTime<Utc>) -> Result<Session, TokenValidationError>;
}

/// Session resolver for HS256-signed tokens carrying [`JwtClaims`].
pub struct Hs256SessionResolver {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256SessionResolver {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time checks are done by `validate_claims` on our own claim names.
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl SessionResolver for Hs256SessionResolver {
    fn resolve(&self, token: &str, now: DateTime<Utc>) -> Result<Session, TokenValidationError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation)
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims.into_session())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use pipeboard_core::{OrganizationId, UserId};

    use crate::{AuthzError, OrgRole, authorize, permissions};

    fn mint(secret: &str, claims: &JwtClaims) -> String {
        encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn claims_for(org: Option<OrganizationId>, role: Option<OrgRole>) -> JwtClaims {
        let now = Utc::now();
        JwtClaims {
            sub: UserId::new(),
            organization_id: org,
            org_role: role,
            issued_at: now - Duration::seconds(5),
            expires_at: now + Duration::minutes(10),
        }
    }

    #[test]
    fn resolves_valid_token() {
        let org = OrganizationId::new();
        let claims = claims_for(Some(org), Some(OrgRole::Admin));
        let token = mint("s3cret", &claims);

        let session = Hs256SessionResolver::new("s3cret").resolve(&token, Utc::now()).unwrap();

        assert_eq!(session.user_id, claims.sub);
        assert_eq!(session.organization_id, Some(org));
        assert_eq!(session.role, Some(OrgRole::Admin));
    }

    #[test]
    fn unrecognised_role_keeps_membership_without_manage() {
        let org = OrganizationId::new();
        let now = Utc::now();
        let claims = serde_json::json!({
            "sub": UserId::new(),
            "organization_id": org,
            "org_role": "viewer",
            "issued_at": now - Duration::seconds(5),
            "expires_at": now + Duration::minutes(10),
        });
        let token = encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(b"s3cret")).unwrap();

        let session = Hs256SessionResolver::new("s3cret").resolve(&token, now).unwrap();

        assert_eq!(session.organization_id, Some(org));
        assert_eq!(session.role, Some(OrgRole::Member));
        assert_eq!(authorize(&session, &permissions::PIPELINE_READ), Ok(org));
        assert_eq!(authorize(&session, &permissions::CARDS_WRITE), Ok(org));
        assert!(matches!(
            authorize(&session, &permissions::PIPELINE_MANAGE),
            Err(AuthzError::Forbidden(_))
        ));
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = mint("s3cret", &claims_for(Some(OrganizationId::new()), None));
        let err = Hs256SessionResolver::new("other").resolve(&token, Utc::now()).unwrap_err();
        assert!(matches!(err, TokenValidationError::Malformed(_)));
    }

    #[test]
    fn rejects_expired_token() {
        let claims = claims_for(None, None);
        let token = mint("s3cret", &claims);
        let later = claims.expires_at + Duration::seconds(1);

        let err = Hs256SessionResolver::new("s3cret").resolve(&token, later).unwrap_err();
        assert_eq!(err, TokenValidationError::Expired);
    }
}
