//! One-time-passcode engine.
//!
//! Generates, validates, and invalidates short-lived numeric codes keyed
//! by (subject, purpose). Engines are constructed explicitly and
//! injected so tests get isolated instances; the backing map serializes
//! access per key, so generate/validate/invalidate on one key form a
//! linearizable sequence while distinct keys stay independent.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use serde::Deserialize;

use super::error::ServiceError;

/// OTP policy knobs, injected from configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OtpPolicy {
    pub length: usize,
    pub expiry_seconds: i64,
    pub max_attempts: u32,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            length: 6,
            expiry_seconds: 600,
            max_attempts: 5,
        }
    }
}

/// What a code is scoped to. A subject may hold one live code per
/// purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPurpose {
    ContactVerification,
    FieldVerification,
    Login,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::ContactVerification => "contact_verification",
            OtpPurpose::FieldVerification => "field_verification",
            OtpPurpose::Login => "login",
        }
    }
}

#[derive(Debug, Clone)]
struct OtpRecord {
    code: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    attempts: u32,
}

/// In-memory OTP store with per-key locking.
pub struct OtpEngine {
    policy: OtpPolicy,
    store: DashMap<String, OtpRecord>,
}

impl OtpEngine {
    pub fn new(policy: OtpPolicy) -> Self {
        Self {
            policy,
            store: DashMap::new(),
        }
    }

    pub fn policy(&self) -> &OtpPolicy {
        &self.policy
    }

    /// Generate a fresh code for (subject, purpose), overwriting any
    /// previous one. The superseded code is no longer valid.
    pub fn generate(&self, subject: &str, purpose: OtpPurpose) -> String {
        let code = self.random_code();
        let now = Utc::now();
        let record = OtpRecord {
            code: code.clone(),
            created_at: now,
            expires_at: now + Duration::seconds(self.policy.expiry_seconds),
            attempts: 0,
        };

        self.store.insert(Self::key(subject, purpose), record);
        tracing::info!(
            subject = %normalize(subject),
            purpose = purpose.as_str(),
            "OTP generated"
        );
        code
    }

    /// Check a candidate code. Fails closed: a missing record is
    /// `NotFound`; an expired or exhausted record is evicted so it
    /// cannot be retried. A successful match does not evict - callers
    /// consume the code with [`invalidate`](Self::invalidate) once the
    /// transition it guards has committed.
    pub fn validate(
        &self,
        subject: &str,
        purpose: OtpPurpose,
        candidate: &str,
    ) -> Result<(), ServiceError> {
        let key = Self::key(subject, purpose);

        let Some(mut record) = self.store.get_mut(&key) else {
            tracing::warn!(
                subject = %normalize(subject),
                purpose = purpose.as_str(),
                "OTP not found"
            );
            return Err(ServiceError::NotFound("verification code"));
        };

        if Utc::now() >= record.expires_at {
            let issued_at = record.created_at;
            drop(record);
            self.store.remove(&key);
            tracing::warn!(
                subject = %normalize(subject),
                purpose = purpose.as_str(),
                issued_at = %issued_at,
                "OTP expired"
            );
            return Err(ServiceError::Expired);
        }

        if record.attempts >= self.policy.max_attempts {
            drop(record);
            self.store.remove(&key);
            tracing::warn!(
                subject = %normalize(subject),
                purpose = purpose.as_str(),
                "max OTP attempts exceeded"
            );
            return Err(ServiceError::AttemptsExhausted);
        }

        record.attempts += 1;

        if record.code != candidate {
            tracing::warn!(
                subject = %normalize(subject),
                purpose = purpose.as_str(),
                attempt = record.attempts,
                "invalid OTP attempt"
            );
            return Err(ServiceError::InvalidCode);
        }

        Ok(())
    }

    /// Unconditional removal. Called after a code has been consumed for
    /// a state transition so a captured copy cannot be replayed.
    pub fn invalidate(&self, subject: &str, purpose: OtpPurpose) {
        self.store.remove(&Self::key(subject, purpose));
        tracing::info!(
            subject = %normalize(subject),
            purpose = purpose.as_str(),
            "OTP invalidated"
        );
    }

    fn key(subject: &str, purpose: OtpPurpose) -> String {
        format!("{}:{}", normalize(subject), purpose.as_str())
    }

    fn random_code(&self) -> String {
        // thread_rng is a CSPRNG; one uniform draw per digit keeps the
        // distribution uniform over the whole code space.
        let mut rng = rand::thread_rng();
        (0..self.policy.length)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }
}

fn normalize(subject: &str) -> String {
    subject.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> OtpEngine {
        OtpEngine::new(OtpPolicy::default())
    }

    #[test]
    fn generated_code_has_policy_length_and_is_numeric() {
        let engine = engine();
        let code = engine.generate("a@x.com", OtpPurpose::ContactVerification);
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn generate_then_validate_succeeds_until_invalidated() {
        let engine = engine();
        let code = engine.generate("a@x.com", OtpPurpose::ContactVerification);

        assert!(engine
            .validate("a@x.com", OtpPurpose::ContactVerification, &code)
            .is_ok());
        // No eviction on success: the same code still validates within
        // the window until the caller consumes it.
        assert!(engine
            .validate("a@x.com", OtpPurpose::ContactVerification, &code)
            .is_ok());

        engine.invalidate("a@x.com", OtpPurpose::ContactVerification);
        assert!(matches!(
            engine.validate("a@x.com", OtpPurpose::ContactVerification, &code),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn subject_key_is_normalized() {
        let engine = engine();
        let code = engine.generate("  A@X.com ", OtpPurpose::Login);
        assert!(engine.validate("a@x.com", OtpPurpose::Login, &code).is_ok());
    }

    #[test]
    fn purposes_are_independent() {
        let engine = engine();
        let code = engine.generate("a@x.com", OtpPurpose::ContactVerification);
        assert!(matches!(
            engine.validate("a@x.com", OtpPurpose::Login, &code),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn wrong_code_increments_attempts_until_exhausted() {
        let engine = engine();
        let code = engine.generate("a@x.com", OtpPurpose::ContactVerification);

        for _ in 0..5 {
            assert!(matches!(
                engine.validate("a@x.com", OtpPurpose::ContactVerification, "000000"),
                Err(ServiceError::InvalidCode)
            ));
        }

        // Record is evicted at the ceiling; even the correct code fails.
        assert!(matches!(
            engine.validate("a@x.com", OtpPurpose::ContactVerification, &code),
            Err(ServiceError::AttemptsExhausted)
        ));
        assert!(matches!(
            engine.validate("a@x.com", OtpPurpose::ContactVerification, &code),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn expired_record_is_evicted_regardless_of_code() {
        let engine = OtpEngine::new(OtpPolicy {
            expiry_seconds: 0,
            ..OtpPolicy::default()
        });
        let code = engine.generate("a@x.com", OtpPurpose::ContactVerification);

        assert!(matches!(
            engine.validate("a@x.com", OtpPurpose::ContactVerification, &code),
            Err(ServiceError::Expired)
        ));
        assert!(matches!(
            engine.validate("a@x.com", OtpPurpose::ContactVerification, &code),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn regeneration_supersedes_previous_code() {
        let engine = engine();
        let first = engine.generate("a@x.com", OtpPurpose::ContactVerification);
        let second = engine.generate("a@x.com", OtpPurpose::ContactVerification);

        if first != second {
            assert!(matches!(
                engine.validate("a@x.com", OtpPurpose::ContactVerification, &first),
                Err(ServiceError::InvalidCode)
            ));
        }
        assert!(engine
            .validate("a@x.com", OtpPurpose::ContactVerification, &second)
            .is_ok());
    }
}
