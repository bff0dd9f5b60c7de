//! Workshop owner model - onboarding pipeline state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Owner onboarding status.
///
/// The pipeline advances strictly in declaration order up to `Active`;
/// `Rejected` and `Suspended` are administrative exits reachable from
/// any non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerStatus {
    PendingContactVerification,
    PendingFieldVerification,
    PendingDocumentUpload,
    Active,
    Rejected,
    Suspended,
}

impl OwnerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerStatus::PendingContactVerification => "pending_contact_verification",
            OwnerStatus::PendingFieldVerification => "pending_field_verification",
            OwnerStatus::PendingDocumentUpload => "pending_document_upload",
            OwnerStatus::Active => "active",
            OwnerStatus::Rejected => "rejected",
            OwnerStatus::Suspended => "suspended",
        }
    }

    /// No business-driven transition leaves these without an
    /// administrative override.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OwnerStatus::Active | OwnerStatus::Rejected | OwnerStatus::Suspended
        )
    }
}

/// Documents collected during the upload step. Owner and workshop photos
/// are mandatory before activation; the trade license is optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    OwnerPhoto,
    WorkshopPhoto,
    TradeLicense,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::OwnerPhoto => "owner_photo",
            DocumentKind::WorkshopPhoto => "workshop_photo",
            DocumentKind::TradeLicense => "trade_license",
        }
    }
}

/// Workshop owner entity. One owner owns exactly one workshop; they are
/// registered together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerAccount {
    pub id: Uuid,
    pub owner_name: String,
    pub email: String,
    pub phone: String,
    pub workshop_name: String,
    pub address: String,
    pub city: String,
    pub contact_verified: bool,
    pub field_verified: bool,
    pub verifier_name: Option<String>,
    pub verifier_phone: Option<String>,
    pub owner_photo_url: Option<String>,
    pub workshop_photo_url: Option<String>,
    pub trade_license_url: Option<String>,
    pub status: OwnerStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub field_verified_at: Option<DateTime<Utc>>,
    pub activated_at: Option<DateTime<Utc>>,
}

impl OwnerAccount {
    /// Create a new account in the initial pipeline state.
    pub fn new(req: &RegisterOwnerRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_name: req.owner_name.trim().to_string(),
            email: req.email.trim().to_lowercase(),
            phone: req.phone.trim().to_string(),
            workshop_name: req.workshop_name.trim().to_string(),
            address: req.address.trim().to_string(),
            city: req.city.trim().to_string(),
            contact_verified: false,
            field_verified: false,
            verifier_name: None,
            verifier_phone: None,
            owner_photo_url: None,
            workshop_photo_url: None,
            trade_license_url: None,
            status: OwnerStatus::PendingContactVerification,
            rejection_reason: None,
            created_at: Utc::now(),
            updated_at: None,
            field_verified_at: None,
            activated_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == OwnerStatus::Active
    }

    /// Store a document reference in its slot.
    pub fn set_document(&mut self, kind: DocumentKind, file_ref: String) {
        match kind {
            DocumentKind::OwnerPhoto => self.owner_photo_url = Some(file_ref),
            DocumentKind::WorkshopPhoto => self.workshop_photo_url = Some(file_ref),
            DocumentKind::TradeLicense => self.trade_license_url = Some(file_ref),
        }
    }

    /// First mandatory document still missing, if any. Both photos must
    /// be on file before activation; the trade license stays optional.
    pub fn first_missing_document(&self) -> Option<DocumentKind> {
        if self.owner_photo_url.is_none() {
            Some(DocumentKind::OwnerPhoto)
        } else if self.workshop_photo_url.is_none() {
            Some(DocumentKind::WorkshopPhoto)
        } else {
            None
        }
    }
}

/// Request to register a workshop owner.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterOwnerRequest {
    #[validate(length(min = 1, max = 120))]
    pub owner_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 20))]
    pub phone: String,
    #[validate(length(min = 1, max = 160))]
    pub workshop_name: String,
    #[validate(length(min = 1, max = 300))]
    pub address: String,
    #[validate(length(min = 1, max = 80))]
    pub city: String,
}
