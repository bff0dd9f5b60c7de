pub mod auth;
pub mod error;
pub mod jwt;
pub mod notification;
pub mod onboarding;
pub mod otp;
pub mod staff;
pub mod store;

pub use auth::AuthService;
pub use error::ServiceError;
pub use jwt::{AccessClaims, AccessCredential, JwtService};
pub use notification::{Channel, MockGateway, NotificationGateway, SmtpGateway};
pub use onboarding::OwnerOnboardingService;
pub use otp::{OtpEngine, OtpPolicy, OtpPurpose};
pub use staff::StaffApprovalService;
pub use store::{InMemoryOwnerStore, InMemoryStaffStore, OwnerStore, StaffStore};
