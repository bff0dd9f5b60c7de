//! Domain models for the onboarding pipeline.

mod owner;
mod staff;

pub use owner::{DocumentKind, OwnerAccount, OwnerStatus, RegisterOwnerRequest};
pub use staff::{RegisterStaffRequest, StaffAccount, StaffDecision, StaffStatus};
