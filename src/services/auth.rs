//! OTP login and access credential issuance.
//!
//! Tokens are only ever minted for accounts that have finished their
//! pipeline: active owners and approved staff. Everyone else gets a
//! typed state error and no credential.

use std::sync::Arc;

use crate::config::VerificationConfig;
use crate::models::{OwnerAccount, OwnerStatus, StaffAccount, StaffStatus};
use crate::services::error::ServiceError;
use crate::services::jwt::{AccessCredential, JwtService};
use crate::services::notification::{Channel, NotificationGateway};
use crate::services::otp::{OtpEngine, OtpPurpose};
use crate::services::store::{OwnerStore, StaffStore};

pub struct AuthService {
    owner_store: Arc<dyn OwnerStore>,
    staff_store: Arc<dyn StaffStore>,
    otp: Arc<OtpEngine>,
    gateway: Arc<dyn NotificationGateway>,
    jwt: JwtService,
    verification: VerificationConfig,
}

enum Subject {
    Owner(OwnerAccount),
    Staff(StaffAccount),
}

impl AuthService {
    pub fn new(
        owner_store: Arc<dyn OwnerStore>,
        staff_store: Arc<dyn StaffStore>,
        otp: Arc<OtpEngine>,
        gateway: Arc<dyn NotificationGateway>,
        jwt: JwtService,
        verification: VerificationConfig,
    ) -> Self {
        Self {
            owner_store,
            staff_store,
            otp,
            gateway,
            jwt,
            verification,
        }
    }

    /// Send a single-use login code to a registered contact. Owners are
    /// looked up before staff.
    #[tracing::instrument(skip(self))]
    pub async fn request_login_code(&self, contact: &str) -> Result<(), ServiceError> {
        let target = match self.lookup(contact).await? {
            Subject::Owner(owner) => self.owner_target(&owner).to_string(),
            Subject::Staff(staff) => self.staff_target(&staff).to_string(),
        };

        let code = self.otp.generate(&target, OtpPurpose::Login);
        let payload = format!(
            "Your login code is {}. It expires in {} minutes.",
            code,
            self.otp.policy().expiry_seconds / 60
        );
        if let Err(e) = self
            .gateway
            .send(
                self.verification.contact_channel,
                &target,
                "Your login code",
                &payload,
            )
            .await
        {
            tracing::warn!(target = %target, error = %e, "login code delivery failed");
        }

        Ok(())
    }

    /// Exchange a login code for a signed access credential.
    #[tracing::instrument(skip(self, code))]
    pub async fn login(&self, contact: &str, code: &str) -> Result<AccessCredential, ServiceError> {
        let subject = self.lookup(contact).await?;

        let target = match &subject {
            Subject::Owner(owner) => self.owner_target(owner).to_string(),
            Subject::Staff(staff) => self.staff_target(staff).to_string(),
        };
        self.otp.validate(&target, OtpPurpose::Login, code)?;
        self.otp.invalidate(&target, OtpPurpose::Login);

        match subject {
            Subject::Owner(owner) => {
                if owner.status != OwnerStatus::Active {
                    return Err(ServiceError::InvalidState {
                        operation: "login",
                        status: owner.status.as_str().to_string(),
                    });
                }
                self.jwt.issue(
                    owner.id,
                    &owner.owner_name,
                    "owner",
                    &owner.workshop_name,
                    owner.status.as_str(),
                )
            }
            Subject::Staff(staff) => {
                if staff.status != StaffStatus::Approved {
                    return Err(ServiceError::InvalidState {
                        operation: "login",
                        status: staff.status.as_str().to_string(),
                    });
                }
                let workshop = self
                    .owner_store
                    .find_by_id(staff.workshop_owner_id)
                    .await?
                    .map(|o| o.workshop_name)
                    .unwrap_or_default();
                self.jwt
                    .issue(staff.id, &staff.name, "staff", &workshop, staff.status.as_str())
            }
        }
    }

    async fn lookup(&self, contact: &str) -> Result<Subject, ServiceError> {
        if let Some(owner) = self.owner_store.find_by_contact(contact).await? {
            return Ok(Subject::Owner(owner));
        }
        if let Some(staff) = self.staff_store.find_by_contact(contact).await? {
            return Ok(Subject::Staff(staff));
        }
        Err(ServiceError::NotFound("account"))
    }

    fn owner_target<'a>(&self, owner: &'a OwnerAccount) -> &'a str {
        match self.verification.contact_channel {
            Channel::Email => &owner.email,
            Channel::Sms => &owner.phone,
        }
    }

    fn staff_target<'a>(&self, staff: &'a StaffAccount) -> &'a str {
        match self.verification.contact_channel {
            Channel::Email => &staff.email,
            Channel::Sms => &staff.phone,
        }
    }
}
