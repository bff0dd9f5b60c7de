//! Durable actor storage seams.
//!
//! The onboarding machines read and write account status only through
//! these traits. `update_if_status` is the optimistic-concurrency
//! primitive: the caller passes the status it validated its precondition
//! against, and the write commits only if the stored status still
//! matches, so a lost race never produces a partial transition.
//!
//! The in-memory implementations back the test harness and local
//! wiring; a relational repository satisfies the same contracts in
//! deployment.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::error::ServiceError;
use crate::models::{OwnerAccount, OwnerStatus, StaffAccount, StaffStatus};

#[async_trait]
pub trait OwnerStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<OwnerAccount>, ServiceError>;

    /// Look up by contact identifier: email (case-insensitive) or phone.
    async fn find_by_contact(&self, contact: &str) -> Result<Option<OwnerAccount>, ServiceError>;

    /// The services pre-check contact uniqueness with `find_by_contact`,
    /// which is not atomic with the insert. Deployment stores must back
    /// this with a unique constraint on email and phone (rejected
    /// accounts excluded, so a rejected actor can register again).
    async fn insert(&self, account: &OwnerAccount) -> Result<(), ServiceError>;

    /// Conditional write: commits only if the stored status still equals
    /// `expected`. Returns `false` when the record has moved on.
    async fn update_if_status(
        &self,
        account: &OwnerAccount,
        expected: OwnerStatus,
    ) -> Result<bool, ServiceError>;
}

#[async_trait]
pub trait StaffStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<StaffAccount>, ServiceError>;

    async fn find_by_contact(&self, contact: &str) -> Result<Option<StaffAccount>, ServiceError>;

    /// Same uniqueness contract as [`OwnerStore::insert`].
    async fn insert(&self, account: &StaffAccount) -> Result<(), ServiceError>;

    async fn update_if_status(
        &self,
        account: &StaffAccount,
        expected: StaffStatus,
    ) -> Result<bool, ServiceError>;

    /// Staff awaiting the given owner's decision.
    async fn list_pending_for_owner(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<StaffAccount>, ServiceError>;
}

fn contact_matches(email: &str, phone: &str, contact: &str) -> bool {
    let contact = contact.trim();
    email.eq_ignore_ascii_case(contact) || phone == contact
}

/// In-memory owner repository.
#[derive(Default)]
pub struct InMemoryOwnerStore {
    inner: RwLock<HashMap<Uuid, OwnerAccount>>,
}

impl InMemoryOwnerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OwnerStore for InMemoryOwnerStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<OwnerAccount>, ServiceError> {
        Ok(self.inner.read().await.get(&id).cloned())
    }

    async fn find_by_contact(&self, contact: &str) -> Result<Option<OwnerAccount>, ServiceError> {
        Ok(self
            .inner
            .read()
            .await
            .values()
            .find(|a| contact_matches(&a.email, &a.phone, contact))
            .cloned())
    }

    async fn insert(&self, account: &OwnerAccount) -> Result<(), ServiceError> {
        self.inner
            .write()
            .await
            .insert(account.id, account.clone());
        Ok(())
    }

    async fn update_if_status(
        &self,
        account: &OwnerAccount,
        expected: OwnerStatus,
    ) -> Result<bool, ServiceError> {
        let mut guard = self.inner.write().await;
        match guard.get(&account.id) {
            Some(current) if current.status == expected => {
                guard.insert(account.id, account.clone());
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(ServiceError::NotFound("workshop owner")),
        }
    }
}

/// In-memory staff repository.
#[derive(Default)]
pub struct InMemoryStaffStore {
    inner: RwLock<HashMap<Uuid, StaffAccount>>,
}

impl InMemoryStaffStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StaffStore for InMemoryStaffStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<StaffAccount>, ServiceError> {
        Ok(self.inner.read().await.get(&id).cloned())
    }

    async fn find_by_contact(&self, contact: &str) -> Result<Option<StaffAccount>, ServiceError> {
        Ok(self
            .inner
            .read()
            .await
            .values()
            .find(|a| contact_matches(&a.email, &a.phone, contact))
            .cloned())
    }

    async fn insert(&self, account: &StaffAccount) -> Result<(), ServiceError> {
        self.inner
            .write()
            .await
            .insert(account.id, account.clone());
        Ok(())
    }

    async fn update_if_status(
        &self,
        account: &StaffAccount,
        expected: StaffStatus,
    ) -> Result<bool, ServiceError> {
        let mut guard = self.inner.write().await;
        match guard.get(&account.id) {
            Some(current) if current.status == expected => {
                guard.insert(account.id, account.clone());
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(ServiceError::NotFound("staff member")),
        }
    }

    async fn list_pending_for_owner(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<StaffAccount>, ServiceError> {
        let mut pending: Vec<StaffAccount> = self
            .inner
            .read()
            .await
            .values()
            .filter(|a| {
                a.workshop_owner_id == owner_id && a.status == StaffStatus::PendingOwnerApproval
            })
            .cloned()
            .collect();
        pending.sort_by_key(|a| a.created_at);
        Ok(pending)
    }
}
