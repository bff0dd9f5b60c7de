//! Workshop owner onboarding machine.
//!
//! Drives an owner account from registration through contact
//! verification, the in-person field verification visit, and document
//! collection, to active status. Every operation validates its
//! precondition against the persisted status and commits through a
//! conditional store update, so a precondition violation or a lost race
//! returns a typed failure and leaves state unchanged.

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::Arc;

use crate::config::VerificationConfig;
use crate::models::{DocumentKind, OwnerAccount, OwnerStatus, RegisterOwnerRequest};
use crate::services::error::ServiceError;
use crate::services::notification::{Channel, NotificationGateway};
use crate::services::otp::{OtpEngine, OtpPurpose};
use crate::services::store::OwnerStore;
use validator::Validate;

pub struct OwnerOnboardingService {
    store: Arc<dyn OwnerStore>,
    otp: Arc<OtpEngine>,
    gateway: Arc<dyn NotificationGateway>,
    verification: VerificationConfig,
}

impl OwnerOnboardingService {
    pub fn new(
        store: Arc<dyn OwnerStore>,
        otp: Arc<OtpEngine>,
        gateway: Arc<dyn NotificationGateway>,
        verification: VerificationConfig,
    ) -> Self {
        Self {
            store,
            otp,
            gateway,
            verification,
        }
    }

    /// Register a workshop owner and send the first verification code.
    ///
    /// A contact already bound to an account that has not been rejected
    /// cannot register again.
    #[tracing::instrument(skip(self, req), fields(email = %req.email))]
    pub async fn submit_registration(
        &self,
        req: RegisterOwnerRequest,
    ) -> Result<OwnerAccount, ServiceError> {
        req.validate()?;

        for contact in [req.email.as_str(), req.phone.as_str()] {
            if let Some(existing) = self.store.find_by_contact(contact).await? {
                if existing.status != OwnerStatus::Rejected {
                    return Err(ServiceError::AlreadyProcessed(
                        "contact already bound to a registration",
                    ));
                }
            }
        }

        let account = OwnerAccount::new(&req);
        self.store.insert(&account).await?;

        tracing::info!(owner_id = %account.id, workshop = %account.workshop_name, "owner registered");

        self.send_contact_code(&account).await;

        Ok(account)
    }

    /// Confirm the registration code and advance to field verification.
    #[tracing::instrument(skip(self, code))]
    pub async fn verify_contact(
        &self,
        contact: &str,
        code: &str,
    ) -> Result<OwnerAccount, ServiceError> {
        let mut account = self.load(contact).await?;

        match account.status {
            OwnerStatus::PendingContactVerification => {}
            OwnerStatus::Rejected | OwnerStatus::Suspended => {
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
        account.status = OwnerStatus::PendingFieldVerification;
        account.updated_at = Some(chrono::Utc::now());

        self.commit(
            &account,
            OwnerStatus::PendingContactVerification,
            "verify_contact",
        )
        .await?;

        tracing::info!(owner_id = %account.id, "owner contact verified");
        Ok(account)
    }

    /// Re-send the contact verification code for a still-unverified
    /// registration.
    #[tracing::instrument(skip(self))]
    pub async fn resend_contact_code(&self, contact: &str) -> Result<(), ServiceError> {
        let account = self.load(contact).await?;

        if account.status != OwnerStatus::PendingContactVerification {
            return Err(invalid_state("resend_contact_code", account.status));
        }

        self.send_contact_code(&account).await;
        Ok(())
    }

    /// Start the in-person verification visit: a code is delivered to
    /// the owner's own contact. The verifier does not receive a code -
    /// their fixed confirmation value models physical presence and is
    /// checked in [`complete_field_verification`](Self::complete_field_verification).
    #[tracing::instrument(skip(self))]
    pub async fn initiate_field_verification(
        &self,
        contact: &str,
        verifier_name: &str,
    ) -> Result<(), ServiceError> {
        let account = self.load(contact).await?;

        if account.status != OwnerStatus::PendingFieldVerification {
            return Err(invalid_state("initiate_field_verification", account.status));
        }

        let target = self.contact_target(&account).to_string();
        let code = self.otp.generate(&target, OtpPurpose::FieldVerification);
        let payload = format!(
            "Your field verification code is {}. Share it with {} during the workshop visit. \
             It expires in {} minutes.",
            code,
            verifier_name,
            self.otp.policy().expiry_seconds / 60
        );
        self.send_best_effort(&target, "Workshop field verification", &payload)
            .await;

        tracing::info!(
            owner_id = %account.id,
            verifier = %verifier_name,
            "field verification initiated"
        );
        Ok(())
    }

    /// Complete the two-sided field verification: the verifier quotes
    /// the fixed confirmation code, the owner quotes the code delivered
    /// to their own contact.
    #[tracing::instrument(skip(self, verifier_code, owner_code))]
    pub async fn complete_field_verification(
        &self,
        contact: &str,
        verifier_code: &str,
        owner_code: &str,
        verifier_name: &str,
        verifier_phone: &str,
    ) -> Result<OwnerAccount, ServiceError> {
        let mut account = self.load(contact).await?;

        if account.status != OwnerStatus::PendingFieldVerification {
            return Err(invalid_state("complete_field_verification", account.status));
        }

        if verifier_code != self.verification.verifier_confirmation_code {
            tracing::warn!(owner_id = %account.id, "invalid verifier confirmation code");
            return Err(ServiceError::InvalidCode);
        }

        let target = self.contact_target(&account).to_string();
        self.otp
            .validate(&target, OtpPurpose::FieldVerification, owner_code)?;
        self.otp.invalidate(&target, OtpPurpose::FieldVerification);

        let now = chrono::Utc::now();
        account.field_verified = true;
        account.verifier_name = Some(verifier_name.trim().to_string());
        account.verifier_phone = Some(verifier_phone.trim().to_string());
        account.field_verified_at = Some(now);
        account.updated_at = Some(now);
        account.status = OwnerStatus::PendingDocumentUpload;

        self.commit(
            &account,
            OwnerStatus::PendingFieldVerification,
            "complete_field_verification",
        )
        .await?;

        tracing::info!(owner_id = %account.id, verifier = %verifier_name, "field verification completed");
        Ok(account)
    }

    /// Store a document reference. Documents may arrive in any order;
    /// the status does not move until onboarding completes.
    #[tracing::instrument(skip(self, file_ref))]
    pub async fn upload_document(
        &self,
        contact: &str,
        kind: DocumentKind,
        file_ref: String,
    ) -> Result<OwnerAccount, ServiceError> {
        let mut account = self.load(contact).await?;

        if account.status != OwnerStatus::PendingDocumentUpload {
            return Err(invalid_state("upload_document", account.status));
        }

        account.set_document(kind, file_ref);
        account.updated_at = Some(chrono::Utc::now());

        self.commit(&account, OwnerStatus::PendingDocumentUpload, "upload_document")
            .await?;

        tracing::info!(owner_id = %account.id, kind = kind.as_str(), "document uploaded");
        Ok(account)
    }

    /// Activate the account once both mandatory photos are on file.
    ///
    /// When `send_welcome_secret` is set, an initial login secret is
    /// generated and its delivery requested; delivery is best-effort and
    /// never rolls back the activation.
    #[tracing::instrument(skip(self))]
    pub async fn complete_onboarding(
        &self,
        contact: &str,
        send_welcome_secret: bool,
    ) -> Result<OwnerAccount, ServiceError> {
        let mut account = self.load(contact).await?;

        if account.status != OwnerStatus::PendingDocumentUpload {
            return Err(invalid_state("complete_onboarding", account.status));
        }

        if let Some(kind) = account.first_missing_document() {
            return Err(ServiceError::Validation(format!(
                "missing required document: {}",
                kind.as_str()
            )));
        }

        let now = chrono::Utc::now();
        account.status = OwnerStatus::Active;
        account.activated_at = Some(now);
        account.updated_at = Some(now);

        self.commit(
            &account,
            OwnerStatus::PendingDocumentUpload,
            "complete_onboarding",
        )
        .await?;

        tracing::info!(owner_id = %account.id, workshop = %account.workshop_name, "owner activated");

        if send_welcome_secret {
            let secret = generate_secret(12);
            let payload = format!(
                "Welcome, {}! Your workshop {} is now active. Your temporary login secret is {}. \
                 Please change it after your first login.",
                account.owner_name, account.workshop_name, secret
            );
            self.send_best_effort(&account.email, "Your workshop account is active", &payload)
                .await;
        }

        Ok(account)
    }

    /// Administrative rejection. Allowed from any non-terminal status.
    #[tracing::instrument(skip(self, reason))]
    pub async fn reject(&self, contact: &str, reason: String) -> Result<(), ServiceError> {
        let mut account = self.load(contact).await?;

        if account.status.is_terminal() {
            return Err(invalid_state("reject", account.status));
        }

        let expected = account.status;
        account.status = OwnerStatus::Rejected;
        account.rejection_reason = Some(reason);
        account.updated_at = Some(chrono::Utc::now());

        self.commit(&account, expected, "reject").await?;

        tracing::info!(owner_id = %account.id, "owner registration rejected");
        Ok(())
    }

    /// Administrative suspension. Allowed from any non-terminal status.
    #[tracing::instrument(skip(self))]
    pub async fn suspend(&self, contact: &str) -> Result<(), ServiceError> {
        let mut account = self.load(contact).await?;

        if account.status.is_terminal() {
            return Err(invalid_state("suspend", account.status));
        }

        let expected = account.status;
        account.status = OwnerStatus::Suspended;
        account.updated_at = Some(chrono::Utc::now());

        self.commit(&account, expected, "suspend").await?;

        tracing::info!(owner_id = %account.id, "owner account suspended");
        Ok(())
    }

    /// Current pipeline state for a registration.
    pub async fn get(&self, contact: &str) -> Result<OwnerAccount, ServiceError> {
        self.load(contact).await
    }

    async fn load(&self, contact: &str) -> Result<OwnerAccount, ServiceError> {
        self.store
            .find_by_contact(contact)
            .await?
            .ok_or(ServiceError::NotFound("workshop owner"))
    }

    fn contact_target<'a>(&self, account: &'a OwnerAccount) -> &'a str {
        match self.verification.contact_channel {
            Channel::Email => &account.email,
            Channel::Sms => &account.phone,
        }
    }

    async fn send_contact_code(&self, account: &OwnerAccount) {
        let target = self.contact_target(account).to_string();
        let code = self.otp.generate(&target, OtpPurpose::ContactVerification);
        let payload = format!(
            "Your workshop registration verification code is {}. It expires in {} minutes.",
            code,
            self.otp.policy().expiry_seconds / 60
        );
        self.send_best_effort(&target, "Verify your workshop registration", &payload)
            .await;
    }

    async fn send_best_effort(&self, target: &str, subject: &str, payload: &str) {
        if let Err(e) = self
            .gateway
            .send(self.verification.contact_channel, target, subject, payload)
            .await
        {
            tracing::warn!(target = %target, error = %e, "notification delivery failed");
        }
    }

    async fn commit(
        &self,
        account: &OwnerAccount,
        expected: OwnerStatus,
        operation: &'static str,
    ) -> Result<(), ServiceError> {
        if self.store.update_if_status(account, expected).await? {
            return Ok(());
        }

        // Someone else moved the record between our read and write.
        let status = self
            .store
            .find_by_id(account.id)
            .await?
            .map(|a| a.status.as_str().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Err(ServiceError::InvalidState { operation, status })
    }
}

fn invalid_state(operation: &'static str, status: OwnerStatus) -> ServiceError {
    ServiceError::InvalidState {
        operation,
        status: status.as_str().to_string(),
    }
}

fn generate_secret(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
