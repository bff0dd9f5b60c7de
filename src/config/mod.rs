use serde::Deserialize;
use std::env;

use crate::services::error::ServiceError;
use crate::services::notification::Channel;
use crate::services::otp::OtpPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct OnboardingConfig {
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub otp: OtpPolicy,
    pub verification: VerificationConfig,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

/// Verification policy knobs for the onboarding machines.
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    /// Channel the contact-verification and login codes go out on.
    pub contact_channel: Channel,
    /// Fixed code the field-verifier quotes during the in-person visit.
    /// This is a process control, not a secret: the verifier's presence
    /// is the second factor, the owner's delivered OTP the first.
    pub verifier_confirmation_code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub token_expiry_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from: String,
}

impl OnboardingConfig {
    pub fn from_env() -> Result<Self, ServiceError> {
        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| ServiceError::Validation(e))?;

        let is_prod = environment == Environment::Prod;

        let config = OnboardingConfig {
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("onboarding-service"), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otp: OtpPolicy {
                length: parse_env("OTP_LENGTH", Some("6"), is_prod)?,
                expiry_seconds: parse_env("OTP_EXPIRY_SECONDS", Some("600"), is_prod)?,
                max_attempts: parse_env("OTP_MAX_ATTEMPTS", Some("5"), is_prod)?,
            },
            verification: VerificationConfig {
                contact_channel: get_env("CONTACT_CHANNEL", Some("email"), is_prod)?
                    .parse()
                    .map_err(|e: String| ServiceError::Validation(e))?,
                // The well-known test value stays the dev default; prod
                // deployments must set their own.
                verifier_confirmation_code: get_env(
                    "VERIFIER_CONFIRMATION_CODE",
                    Some("111111"),
                    is_prod,
                )?,
            },
            jwt: JwtConfig {
                secret: get_env("JWT_SECRET", Some("dev-only-insecure-secret"), is_prod)?,
                issuer: get_env("JWT_ISSUER", Some("onboarding-service"), is_prod)?,
                audience: get_env("JWT_AUDIENCE", Some("workshop-clients"), is_prod)?,
                token_expiry_minutes: parse_env("JWT_TOKEN_EXPIRY_MINUTES", Some("43200"), is_prod)?,
            },
            smtp: SmtpConfig {
                host: get_env("SMTP_HOST", Some("smtp.gmail.com"), is_prod)?,
                port: parse_env("SMTP_PORT", Some("587"), is_prod)?,
                user: get_env("SMTP_USER", None, is_prod)?,
                password: get_env("SMTP_PASSWORD", None, is_prod)?,
                from: get_env("SMTP_FROM", None, is_prod)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ServiceError> {
        if self.otp.length < 4 || self.otp.length > 10 {
            return Err(ServiceError::Validation(
                "OTP_LENGTH must be between 4 and 10".to_string(),
            ));
        }

        if self.otp.expiry_seconds <= 0 {
            return Err(ServiceError::Validation(
                "OTP_EXPIRY_SECONDS must be positive".to_string(),
            ));
        }

        if self.otp.max_attempts == 0 {
            return Err(ServiceError::Validation(
                "OTP_MAX_ATTEMPTS must be positive".to_string(),
            ));
        }

        if self.verification.verifier_confirmation_code.is_empty() {
            return Err(ServiceError::Validation(
                "VERIFIER_CONFIRMATION_CODE must not be empty".to_string(),
            ));
        }

        if self.jwt.token_expiry_minutes <= 0 {
            return Err(ServiceError::Validation(
                "JWT_TOKEN_EXPIRY_MINUTES must be positive".to_string(),
            ));
        }

        if self.environment == Environment::Prod {
            if self.jwt.secret.len() < 32 {
                return Err(ServiceError::Validation(
                    "JWT_SECRET must be at least 32 bytes in production".to_string(),
                ));
            }

            if self.verification.verifier_confirmation_code == "111111" {
                tracing::error!(
                    "verifier confirmation code is still the well-known test value in production"
                );
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, ServiceError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(ServiceError::Validation(format!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(ServiceError::Validation(format!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T: std::str::FromStr>(
    key: &str,
    default: Option<&str>,
    is_prod: bool,
) -> Result<T, ServiceError>
where
    T::Err: std::fmt::Display,
{
    get_env(key, default, is_prod)?
        .parse()
        .map_err(|e: T::Err| ServiceError::Validation(format!("{}: {}", key, e)))
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
