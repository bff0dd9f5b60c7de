//! Workshop onboarding and verification core.
//!
//! Implements the account-activation pipeline for a vehicle-workshop
//! backend: a one-time-passcode engine, the workshop-owner onboarding
//! state machine (contact verification, in-person field verification,
//! document collection), the staff approval state machine, and the
//! OTP-based login flow that issues signed access credentials once an
//! account reaches its terminal active/approved state.
//!
//! Storage, notification delivery, and token signing sit behind
//! injectable seams (`OwnerStore`/`StaffStore`, `NotificationGateway`,
//! `JwtService`); the HTTP layer that drives these operations lives
//! elsewhere.

pub mod config;
pub mod models;
pub mod services;
