//! Signed access credential issuance.
//!
//! Invoked only once an account has reached its terminal
//! active/approved state; the machines never mint tokens mid-pipeline.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ServiceError;
use crate::config::JwtConfig;

/// HS256 token service.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    token_expiry_minutes: i64,
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (account ID)
    pub sub: String,
    /// Display name
    pub name: String,
    /// "owner" or "staff"
    pub role: String,
    /// Workshop the subject belongs to
    pub workshop: String,
    /// Account status at issuance time
    pub status: String,
    pub iss: String,
    pub aud: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// JWT ID
    pub jti: String,
}

/// Transient credential handed back to the caller; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct AccessCredential {
    pub subject_id: Uuid,
    pub role: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            token_expiry_minutes: config.token_expiry_minutes,
        }
    }

    /// Issue a signed credential for a verified account.
    pub fn issue(
        &self,
        subject_id: Uuid,
        name: &str,
        role: &str,
        workshop: &str,
        status: &str,
    ) -> Result<AccessCredential, ServiceError> {
        let now = Utc::now();
        let expires_at = now + Duration::minutes(self.token_expiry_minutes);

        let claims = AccessClaims {
            sub: subject_id.to_string(),
            name: name.to_string(),
            role: role.to_string(),
            workshop: workshop.to_string(),
            status: status.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::Dependency(anyhow::anyhow!("token encoding: {}", e)))?;

        tracing::info!(subject = %subject_id, role = %role, "access credential issued");

        Ok(AccessCredential {
            subject_id,
            role: role.to_string(),
            token,
            expires_at,
        })
    }

    /// Validate and decode an access token.
    pub fn decode(&self, token: &str) -> Result<AccessClaims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let data = decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map_err(|_| ServiceError::Unauthorized("invalid access token"))?;

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key-that-is-long-enough".to_string(),
            issuer: "onboarding-service".to_string(),
            audience: "workshop-clients".to_string(),
            token_expiry_minutes: 30,
        }
    }

    #[test]
    fn issue_and_decode_round_trip() {
        let service = JwtService::new(&test_config());
        let subject = Uuid::new_v4();

        let credential = service
            .issue(subject, "A Owner", "owner", "A Workshop", "active")
            .unwrap();
        assert!(!credential.token.is_empty());
        assert!(credential.expires_at > Utc::now());

        let claims = service.decode(&credential.token).unwrap();
        assert_eq!(claims.sub, subject.to_string());
        assert_eq!(claims.role, "owner");
        assert_eq!(claims.workshop, "A Workshop");
        assert_eq!(claims.status, "active");
    }

    #[test]
    fn decode_rejects_wrong_secret() {
        let service = JwtService::new(&test_config());
        let other = JwtService::new(&JwtConfig {
            secret: "a-completely-different-secret-value".to_string(),
            ..test_config()
        });

        let credential = other
            .issue(Uuid::new_v4(), "A Owner", "owner", "A Workshop", "active")
            .unwrap();
        assert!(matches!(
            service.decode(&credential.token),
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[test]
    fn decode_rejects_wrong_audience() {
        let service = JwtService::new(&test_config());
        let other = JwtService::new(&JwtConfig {
            audience: "someone-else".to_string(),
            ..test_config()
        });

        let credential = other
            .issue(Uuid::new_v4(), "A Owner", "owner", "A Workshop", "active")
            .unwrap();
        assert!(service.decode(&credential.token).is_err());
    }
}
