//! Workshop staff model - registration and owner approval state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Staff registration status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffStatus {
    PendingContactVerification,
    PendingOwnerApproval,
    Approved,
    Rejected,
    Suspended,
}

impl StaffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffStatus::PendingContactVerification => "pending_contact_verification",
            StaffStatus::PendingOwnerApproval => "pending_owner_approval",
            StaffStatus::Approved => "approved",
            StaffStatus::Rejected => "rejected",
            StaffStatus::Suspended => "suspended",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StaffStatus::Approved | StaffStatus::Rejected | StaffStatus::Suspended
        )
    }
}

/// Staff member entity. Staff belong to exactly one workshop and must be
/// approved by its owner before the account activates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffAccount {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub city: String,
    pub workshop_owner_id: Uuid,
    pub contact_verified: bool,
    pub active: bool,
    pub status: StaffStatus,
    pub approved_by_owner_id: Option<Uuid>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl StaffAccount {
    pub fn new(req: &RegisterStaffRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: req.name.trim().to_string(),
            email: req.email.trim().to_lowercase(),
            phone: req.phone.trim().to_string(),
            city: req.city.trim().to_string(),
            workshop_owner_id: req.workshop_owner_id,
            contact_verified: false,
            active: false,
            status: StaffStatus::PendingContactVerification,
            approved_by_owner_id: None,
            rejection_reason: None,
            created_at: Utc::now(),
            updated_at: None,
            approved_at: None,
        }
    }
}

/// Request to register a staff member under a workshop.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterStaffRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 20))]
    pub phone: String,
    #[validate(length(min = 1, max = 80))]
    pub city: String,
    pub workshop_owner_id: Uuid,
}

/// Owner decision over a pending staff request.
#[derive(Debug, Clone, Deserialize)]
pub struct StaffDecision {
    pub staff_id: Uuid,
    pub approve: bool,
    pub reason: Option<String>,
}
