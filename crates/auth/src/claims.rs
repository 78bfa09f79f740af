use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use pipeboard_core::{OrganizationId, UserId};

use crate::{OrgRole, Session};

/// Session token claims (transport-agnostic).
///
/// This is the minimal set of claims the board expects once a token has been
/// decoded and its signature verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject / user identifier.
    pub sub: UserId,

    /// Organization the session is bound to, if any.
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,

    /// Role within that organization. Roles this service does not know are
    /// read as [`OrgRole::Member`]: the session keeps its membership but gets
    /// no structural permissions.
    #[serde(default, deserialize_with = "lenient_role")]
    pub org_role: Option<OrgRole>,

    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl JwtClaims {
    pub fn into_session(self) -> Session {
        Session::new(self.sub, self.organization_id, self.org_role)
    }
}

fn lenient_role<'de, D>(deserializer: D) -> Result<Option<OrgRole>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(|role| {
        role.parse().unwrap_or_else(|e: String| {
            tracing::debug!(error = %e, "treating unrecognised role as member");
            OrgRole::Member
        })
    }))
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Deterministically validate the claim time window.
///
/// Signature verification happens in [`crate::jwt`]; this only checks times.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims(issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> JwtClaims {
        JwtClaims {
            sub: UserId::new(),
            organization_id: Some(OrganizationId::new()),
            org_role: Some(OrgRole::Member),
            issued_at,
            expires_at,
        }
    }

    #[test]
    fn accepts_current_window() {
        let now = Utc::now();
        let c = claims(now - Duration::minutes(1), now + Duration::minutes(1));
        assert_eq!(validate_claims(&c, now), Ok(()));
    }

    #[test]
    fn rejects_expired_and_future_tokens() {
        let now = Utc::now();
        let expired = claims(now - Duration::minutes(10), now - Duration::minutes(1));
        let future = claims(now + Duration::minutes(1), now + Duration::minutes(10));
        let inverted = claims(now, now - Duration::seconds(1));

        assert_eq!(validate_claims(&expired, now), Err(TokenValidationError::Expired));
        assert_eq!(validate_claims(&future, now), Err(TokenValidationError::NotYetValid));
        assert_eq!(validate_claims(&inverted, now), Err(TokenValidationError::InvalidTimeWindow));
    }

    #[test]
    fn missing_organization_fields_default_to_none() {
        let now = Utc::now();
        let json = serde_json::json!({
            "sub": UserId::new(),
            "issued_at": now,
            "expires_at": now + Duration::minutes(5),
        });
        let c: JwtClaims = serde_json::from_value(json).unwrap();
        let session = c.into_session();
        assert!(session.organization_id.is_none());
        assert!(session.effective_role().is_none());
    }

    #[test]
    fn unrecognised_role_reads_as_member() {
        let now = Utc::now();
        let json = serde_json::json!({
            "sub": UserId::new(),
            "organization_id": OrganizationId::new(),
            "org_role": "viewer",
            "issued_at": now,
            "expires_at": now + Duration::minutes(5),
        });
        let c: JwtClaims = serde_json::from_value(json).unwrap();
        assert_eq!(c.org_role, Some(OrgRole::Member));

        let known: JwtClaims = serde_json::from_value(serde_json::json!({
            "sub": UserId::new(),
            "org_role": "pipeline",
            "issued_at": now,
            "expires_at": now + Duration::minutes(5),
        }))
        .unwrap();
        assert_eq!(known.org_role, Some(OrgRole::Pipeline));
    }
}
