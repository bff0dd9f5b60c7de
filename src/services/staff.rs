//! Staff registration and owner approval machine.
//!
//! Staff register under an active workshop, verify their contact, and
//! then wait for the workshop owner's decision. Only the owning
//! workshop's owner may decide; the decision activates or rejects the
//! account and notifies the staff member over email and SMS.

use std::sync::Arc;
use uuid::Uuid;

use crate::config::VerificationConfig;
use crate::models::{RegisterStaffRequest, StaffAccount, StaffDecision, StaffStatus};
use crate::services::error::ServiceError;
use crate::services::notification::{Channel, NotificationGateway};
use crate::services::otp::{OtpEngine, OtpPurpose};
use crate::services::store::{OwnerStore, StaffStore};
use validator::Validate;

pub struct StaffApprovalService {
    staff_store: Arc<dyn StaffStore>,
    owner_store: Arc<dyn OwnerStore>,
    otp: Arc<OtpEngine>,
    gateway: Arc<dyn NotificationGateway>,
    verification: VerificationConfig,
}

impl StaffApprovalService {
    pub fn new(
        staff_store: Arc<dyn StaffStore>,
        owner_store: Arc<dyn OwnerStore>,
        otp: Arc<OtpEngine>,
        gateway: Arc<dyn NotificationGateway>,
        verification: VerificationConfig,
    ) -> Self {
        Self {
            staff_store,
            owner_store,
            otp,
            gateway,
            verification,
        }
    }

    /// Register a staff member under a workshop. The workshop owner must
    /// exist and be active.
    #[tracing::instrument(skip(self, req), fields(email = %req.email, owner_id = %req.workshop_owner_id))]
    pub async fn submit_registration(
        &self,
        req: RegisterStaffRequest,
    ) -> Result<StaffAccount, ServiceError> {
        req.validate()?;

        let owner = self
            .owner_store
            .find_by_id(req.workshop_owner_id)
            .await?
            .ok_or(ServiceError::NotFound("workshop owner"))?;

        if !owner.is_active() {
            return Err(ServiceError::InvalidState {
                operation: "register_staff",
                status: owner.status.as_str().to_string(),
            });
        }

        for contact in [req.email.as_str(), req.phone.as_str()] {
            if let Some(existing) = self.staff_store.find_by_contact(contact).await? {
                if existing.status != StaffStatus::Rejected {
                    return Err(ServiceError::AlreadyProcessed(
                        "contact already bound to a registration",
                    ));
                }
            }
        }

        let account = StaffAccount::new(&req);
        self.staff_store.insert(&account).await?;

        tracing::info!(staff_id = %account.id, workshop = %owner.workshop_name, "staff registered");

        self.send_contact_code(&account).await;

        Ok(account)
    }

    /// Confirm the registration code; the request then moves to the
    /// workshop owner's queue and the owner is notified.
    #[tracing::instrument(skip(self, code))]
    pub async fn verify_contact(
        &self,
        contact: &str,
        code: &str,
    ) -> Result<StaffAccount, ServiceError> {
        let mut account = self.load(contact).await?;

        match account.status {
            StaffStatus::PendingContactVerification => {}
            StaffStatus::Rejected | StaffStatus::Suspended => {
                return Err(invalid_state("verify_contact", account.status));
            }
            _ => {
                return Err(ServiceError::AlreadyProcessed("contact already verified"));
            }
        }

        let target = self.contact_target(&account).to_string();
        self.otp
            .validate(&target, OtpPurpose::ContactVerification, code)?;
        self.otp.invalidate(&target, OtpPurpose::ContactVerification);

        account.contact_verified = true;
        account.status = StaffStatus::PendingOwnerApproval;
        account.updated_at = Some(chrono::Utc::now());

        self.commit(
            &account,
            StaffStatus::PendingContactVerification,
            "verify_contact",
        )
        .await?;

        tracing::info!(staff_id = %account.id, "staff contact verified");

        // Out-of-band side effect, not a state input.
        if let Ok(Some(owner)) = self.owner_store.find_by_id(account.workshop_owner_id).await {
            let payload = format!(
                "{} has requested to join your workshop {}. Review the request on your dashboard.",
                account.name, owner.workshop_name
            );
            self.send_best_effort(
                Channel::Email,
                &owner.email,
                "New staff registration request",
                &payload,
            )
            .await;
        }

        Ok(account)
    }

    /// Re-send the contact verification code for a still-unverified
    /// registration.
    #[tracing::instrument(skip(self))]
    pub async fn resend_code(&self, contact: &str) -> Result<(), ServiceError> {
        let account = self.load(contact).await?;

        if account.status != StaffStatus::PendingContactVerification {
            return Err(invalid_state("resend_code", account.status));
        }

        self.send_contact_code(&account).await;
        Ok(())
    }

    /// Approve or reject a pending staff request. Only the staff's own
    /// workshop owner may decide; a repeated decision fails.
    #[tracing::instrument(skip(self, decision), fields(staff_id = %decision.staff_id, approve = decision.approve))]
    pub async fn decide(
        &self,
        decision: StaffDecision,
        approver_owner_id: Uuid,
    ) -> Result<StaffAccount, ServiceError> {
        let mut account = self
            .staff_store
            .find_by_id(decision.staff_id)
            .await?
            .ok_or(ServiceError::NotFound("staff member"))?;

        match account.status {
            StaffStatus::PendingOwnerApproval => {}
            StaffStatus::Approved | StaffStatus::Rejected | StaffStatus::Suspended => {
                return Err(ServiceError::AlreadyProcessed("request already decided"));
            }
            StaffStatus::PendingContactVerification => {
                return Err(invalid_state("decide", account.status));
            }
        }

        if account.workshop_owner_id != approver_owner_id {
            return Err(ServiceError::Unauthorized(
                "only the staff's workshop owner may decide this request",
            ));
        }

        let now = chrono::Utc::now();
        account.approved_by_owner_id = Some(approver_owner_id);
        account.updated_at = Some(now);
        if decision.approve {
            account.status = StaffStatus::Approved;
            account.active = true;
            account.approved_at = Some(now);
        } else {
            account.status = StaffStatus::Rejected;
            account.active = false;
            account.rejection_reason = decision.reason.clone();
        }

        self.commit(&account, StaffStatus::PendingOwnerApproval, "decide")
            .await?;

        tracing::info!(
            staff_id = %account.id,
            approved = decision.approve,
            owner_id = %approver_owner_id,
            "staff request decided"
        );

        self.notify_decision(&account, decision.approve).await;

        Ok(account)
    }

    /// Owner-authorized suspension of an approved staff account.
    #[tracing::instrument(skip(self))]
    pub async fn suspend(&self, staff_id: Uuid, owner_id: Uuid) -> Result<(), ServiceError> {
        let mut account = self
            .staff_store
            .find_by_id(staff_id)
            .await?
            .ok_or(ServiceError::NotFound("staff member"))?;

        if account.status != StaffStatus::Approved {
            return Err(invalid_state("suspend", account.status));
        }

        if account.workshop_owner_id != owner_id {
            return Err(ServiceError::Unauthorized(
                "only the staff's workshop owner may suspend the account",
            ));
        }

        account.status = StaffStatus::Suspended;
        account.active = false;
        account.updated_at = Some(chrono::Utc::now());

        self.commit(&account, StaffStatus::Approved, "suspend").await?;

        tracing::info!(staff_id = %account.id, "staff account suspended");
        Ok(())
    }

    /// Requests awaiting the given owner's decision.
    pub async fn pending_requests(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<StaffAccount>, ServiceError> {
        self.staff_store.list_pending_for_owner(owner_id).await
    }

    /// Current registration state for a staff contact.
    pub async fn get(&self, contact: &str) -> Result<StaffAccount, ServiceError> {
        self.load(contact).await
    }

    async fn load(&self, contact: &str) -> Result<StaffAccount, ServiceError> {
        self.staff_store
            .find_by_contact(contact)
            .await?
            .ok_or(ServiceError::NotFound("staff member"))
    }

    fn contact_target<'a>(&self, account: &'a StaffAccount) -> &'a str {
        match self.verification.contact_channel {
            Channel::Email => &account.email,
            Channel::Sms => &account.phone,
        }
    }

    async fn send_contact_code(&self, account: &StaffAccount) {
        let target = self.contact_target(account).to_string();
        let code = self.otp.generate(&target, OtpPurpose::ContactVerification);
        let payload = format!(
            "Your staff registration verification code is {}. It expires in {} minutes.",
            code,
            self.otp.policy().expiry_seconds / 60
        );
        self.send_best_effort(
            self.verification.contact_channel,
            &target,
            "Verify your staff registration",
            &payload,
        )
        .await;
    }

    async fn notify_decision(&self, account: &StaffAccount, approved: bool) {
        let workshop_name = self
            .owner_store
            .find_by_id(account.workshop_owner_id)
            .await
            .ok()
            .flatten()
            .map(|o| o.workshop_name)
            .unwrap_or_else(|| "the workshop".to_string());

        let (subject, body) = if approved {
            (
                "Registration approved",
                format!(
                    "Congratulations! Your request to join {} has been approved. \
                     You can now log in.",
                    workshop_name
                ),
            )
        } else {
            let reason = account
                .rejection_reason
                .as_deref()
                .map(|r| format!(" Reason: {}", r))
                .unwrap_or_default();
            (
                "Registration update",
                format!(
                    "Your request to join {} has been declined.{}",
                    workshop_name, reason
                ),
            )
        };

        // Email and SMS, both best-effort.
        self.send_best_effort(Channel::Email, &account.email, subject, &body)
            .await;
        self.send_best_effort(Channel::Sms, &account.phone, subject, &body)
            .await;
    }

    async fn send_best_effort(&self, channel: Channel, target: &str, subject: &str, payload: &str) {
        if let Err(e) = self.gateway.send(channel, target, subject, payload).await {
            tracing::warn!(target = %target, error = %e, "notification delivery failed");
        }
    }

    async fn commit(
        &self,
        account: &StaffAccount,
        expected: StaffStatus,
        operation: &'static str,
    ) -> Result<(), ServiceError> {
        if self.staff_store.update_if_status(account, expected).await? {
            return Ok(());
        }

        let status = self
            .staff_store
            .find_by_id(account.id)
            .await?
            .map(|a| a.status.as_str().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Err(ServiceError::InvalidState { operation, status })
    }
}

fn invalid_state(operation: &'static str, status: StaffStatus) -> ServiceError {
    ServiceError::InvalidState {
        operation,
        status: status.as_str().to_string(),
    }
}
