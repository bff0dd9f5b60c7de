#![allow(dead_code)]

use std::sync::Arc;

use onboarding_service::config::{JwtConfig, VerificationConfig};
use onboarding_service::models::{
    DocumentKind, OwnerAccount, RegisterOwnerRequest, RegisterStaffRequest, StaffAccount,
};
use onboarding_service::services::{
    AuthService, Channel, InMemoryOwnerStore, InMemoryStaffStore, JwtService, MockGateway,
    OtpEngine, OtpPolicy, OwnerOnboardingService, StaffApprovalService,
};
use uuid::Uuid;

pub const VERIFIER_CODE: &str = "111111";

/// Fully wired service graph over in-memory stores and a recording
/// notification gateway.
pub struct TestApp {
    pub owner_store: Arc<InMemoryOwnerStore>,
    pub staff_store: Arc<InMemoryStaffStore>,
    pub otp: Arc<OtpEngine>,
    pub gateway: Arc<MockGateway>,
    pub jwt: JwtService,
    pub onboarding: OwnerOnboardingService,
    pub staff: StaffApprovalService,
    pub auth: AuthService,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_policy(OtpPolicy::default())
    }

    pub fn with_policy(policy: OtpPolicy) -> Self {
        let owner_store = Arc::new(InMemoryOwnerStore::new());
        let staff_store = Arc::new(InMemoryStaffStore::new());
        let otp = Arc::new(OtpEngine::new(policy));
        let gateway = Arc::new(MockGateway::new());
        let verification = VerificationConfig {
            contact_channel: Channel::Email,
            verifier_confirmation_code: VERIFIER_CODE.to_string(),
        };
        let jwt = JwtService::new(&JwtConfig {
            secret: "integration-test-secret-with-length".to_string(),
            issuer: "onboarding-service".to_string(),
            audience: "workshop-clients".to_string(),
            token_expiry_minutes: 60,
        });

        let onboarding = OwnerOnboardingService::new(
            owner_store.clone(),
            otp.clone(),
            gateway.clone(),
            verification.clone(),
        );
        let staff = StaffApprovalService::new(
            staff_store.clone(),
            owner_store.clone(),
            otp.clone(),
            gateway.clone(),
            verification.clone(),
        );
        let auth = AuthService::new(
            owner_store.clone(),
            staff_store.clone(),
            otp.clone(),
            gateway.clone(),
            jwt.clone(),
            verification,
        );

        Self {
            owner_store,
            staff_store,
            otp,
            gateway,
            jwt,
            onboarding,
            staff,
            auth,
        }
    }

    /// Pull the verification code out of the most recent notification
    /// captured for `target`.
    pub fn code_sent_to(&self, target: &str) -> String {
        let notification = self
            .gateway
            .last_to(target)
            .unwrap_or_else(|| panic!("no notification captured for {}", target));
        extract_code(&notification.payload)
    }
}

/// First run of four or more consecutive digits in a payload.
pub fn extract_code(payload: &str) -> String {
    let mut current = String::new();
    for ch in payload.chars() {
        if ch.is_ascii_digit() {
            current.push(ch);
        } else {
            if current.len() >= 4 {
                return current;
            }
            current.clear();
        }
    }
    if current.len() >= 4 {
        return current;
    }
    panic!("no verification code found in payload: {}", payload);
}

pub fn owner_request(email: &str, phone: &str) -> RegisterOwnerRequest {
    RegisterOwnerRequest {
        owner_name: "Amina Rahman".to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
        workshop_name: "Rahman Auto Works".to_string(),
        address: "12 Industrial Road".to_string(),
        city: "Springfield".to_string(),
    }
}

pub fn staff_request(owner_id: Uuid, email: &str, phone: &str) -> RegisterStaffRequest {
    RegisterStaffRequest {
        name: "Jordan Mechanic".to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
        city: "Springfield".to_string(),
        workshop_owner_id: owner_id,
    }
}

/// Drive an owner registration through the full pipeline to active.
pub async fn activate_owner(app: &TestApp, email: &str, phone: &str) -> OwnerAccount {
    app.onboarding
        .submit_registration(owner_request(email, phone))
        .await
        .expect("registration");

    let code = app.code_sent_to(email);
    app.onboarding
        .verify_contact(email, &code)
        .await
        .expect("contact verification");

    app.onboarding
        .initiate_field_verification(email, "Field Agent")
        .await
        .expect("field verification start");
    let code = app.code_sent_to(email);
    app.onboarding
        .complete_field_verification(email, VERIFIER_CODE, &code, "Field Agent", "+15550009999")
        .await
        .expect("field verification");

    app.onboarding
        .upload_document(email, DocumentKind::OwnerPhoto, "/files/owner.jpg".to_string())
        .await
        .expect("owner photo");
    app.onboarding
        .upload_document(
            email,
            DocumentKind::WorkshopPhoto,
            "/files/workshop.jpg".to_string(),
        )
        .await
        .expect("workshop photo");

    app.onboarding
        .complete_onboarding(email, false)
        .await
        .expect("activation")
}

/// Register a staff member and verify their contact, leaving them in the
/// owner's approval queue.
pub async fn register_verified_staff(
    app: &TestApp,
    owner_id: Uuid,
    email: &str,
    phone: &str,
) -> StaffAccount {
    app.staff
        .submit_registration(staff_request(owner_id, email, phone))
        .await
        .expect("staff registration");

    let code = app.code_sent_to(email);
    app.staff
        .verify_contact(email, &code)
        .await
        .expect("staff contact verification")
}
