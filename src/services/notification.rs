//! Outbound notification seam.
//!
//! Delivery is best-effort: a gateway failure after a state transition
//! has committed is logged by the caller, never rolled back.

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;

use super::error::ServiceError;
use crate::config::SmtpConfig;

/// Delivery channel for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "email" => Ok(Channel::Email),
            "sms" => Ok(Channel::Sms),
            _ => Err(format!("Invalid notification channel: {}", s)),
        }
    }
}

#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Deliver a payload to the target on the given channel.
    async fn send(
        &self,
        channel: Channel,
        target: &str,
        subject: &str,
        payload: &str,
    ) -> Result<(), ServiceError>;
}

/// SMTP-backed gateway. SMS delivery is not wired to a provider yet and
/// only logs the request.
#[derive(Clone)]
pub struct SmtpGateway {
    mailer: SmtpTransport,
    from_email: String,
}

impl SmtpGateway {
    pub fn new(config: &SmtpConfig) -> Result<Self, ServiceError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| ServiceError::Dependency(anyhow::anyhow!(e.to_string())))?
            .credentials(creds)
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, "SMTP notification gateway initialized");

        Ok(Self {
            mailer,
            from_email: config.from.clone(),
        })
    }
}

#[async_trait]
impl NotificationGateway for SmtpGateway {
    async fn send(
        &self,
        channel: Channel,
        target: &str,
        subject: &str,
        payload: &str,
    ) -> Result<(), ServiceError> {
        match channel {
            Channel::Email => {
                let email = Message::builder()
                    .from(self.from_email.parse().map_err(
                        |e: lettre::address::AddressError| ServiceError::Dependency(e.into()),
                    )?)
                    .to(target.parse().map_err(|e: lettre::address::AddressError| {
                        ServiceError::Dependency(e.into())
                    })?)
                    .subject(subject)
                    .header(ContentType::TEXT_PLAIN)
                    .body(payload.to_string())
                    .map_err(|e| ServiceError::Dependency(e.into()))?;

                // Send on the blocking pool to keep the async runtime free.
                let mailer = self.mailer.clone();
                let result = tokio::task::spawn_blocking(move || mailer.send(&email))
                    .await
                    .map_err(|e| ServiceError::Dependency(e.into()))?;

                result.map_err(|e| ServiceError::Dependency(anyhow::anyhow!(e.to_string())))?;
                tracing::info!(to = %target, subject = %subject, "email sent");
                Ok(())
            }
            Channel::Sms => {
                // No SMS provider configured; the message is dropped.
                tracing::warn!(to = %target, "SMS delivery not configured, message not sent");
                Ok(())
            }
        }
    }
}

/// A notification captured by [`MockGateway`].
#[derive(Debug, Clone)]
pub struct SentNotification {
    pub channel: Channel,
    pub target: String,
    pub subject: String,
    pub payload: String,
}

/// Recording gateway for tests. Can be flipped into a failing mode to
/// exercise best-effort delivery paths.
#[derive(Default)]
pub struct MockGateway {
    sent: Mutex<Vec<SentNotification>>,
    fail: std::sync::atomic::AtomicBool,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().expect("mock gateway lock poisoned").clone()
    }

    pub fn last_to(&self, target: &str) -> Option<SentNotification> {
        self.sent()
            .into_iter()
            .rev()
            .find(|n| n.target.eq_ignore_ascii_case(target))
    }
}

#[async_trait]
impl NotificationGateway for MockGateway {
    async fn send(
        &self,
        channel: Channel,
        target: &str,
        subject: &str,
        payload: &str,
    ) -> Result<(), ServiceError> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(ServiceError::Dependency(anyhow::anyhow!(
                "mock gateway configured to fail"
            )));
        }
        self.sent
            .lock()
            .expect("mock gateway lock poisoned")
            .push(SentNotification {
                channel,
                target: target.to_string(),
                subject: subject.to_string(),
                payload: payload.to_string(),
            });
        Ok(())
    }
}
