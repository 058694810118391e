//! Authorization predicates.
//!
//! The numerical components never decide who may call them; they ask an
//! injected [`Authorizer`]. [`AccessRegistry`] is the default
//! implementation: one owner plus a set of index updaters.

use crate::core::account::AccountId;
use crate::core::ErrorKind;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Answers the two role questions the engine needs.
pub trait Authorizer {
    fn is_owner(&self, account: &AccountId) -> bool;
    fn is_updater(&self, account: &AccountId) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("{0} is not authorized for this operation")]
    NotAuthorized(AccountId),
}

impl AccessError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Authorization
    }
}

/// Owner plus updater set.
///
/// # Examples
///
/// ```
/// use rate_engine::auth::{AccessRegistry, Authorizer};
/// use rate_engine::core::account::AccountId;
///
/// let owner = AccountId::new("owner");
/// let keeper = AccountId::new("keeper");
/// let mut access = AccessRegistry::new(owner.clone());
/// access.add_updater(&owner, keeper.clone()).unwrap();
/// assert!(access.is_updater(&keeper));
/// assert!(access.add_updater(&keeper, AccountId::new("x")).is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRegistry {
    owner: AccountId,
    updaters: BTreeSet<AccountId>,
}

impl AccessRegistry {
    pub fn new(owner: AccountId) -> Self {
        Self {
            owner,
            updaters: BTreeSet::new(),
        }
    }

    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    pub fn updaters(&self) -> impl Iterator<Item = &AccountId> {
        self.updaters.iter()
    }

    /// Grants the updater role. Owner only; granting twice is a no-op.
    pub fn add_updater(&mut self, caller: &AccountId, updater: AccountId) -> Result<(), AccessError> {
        ensure_owner(&*self, caller)?;
        info!("granting index updater role to {}", updater);
        self.updaters.insert(updater);
        Ok(())
    }

    /// Revokes the updater role. Owner only.
    pub fn remove_updater(&mut self, caller: &AccountId, updater: &AccountId) -> Result<(), AccessError> {
        ensure_owner(&*self, caller)?;
        if self.updaters.remove(updater) {
            info!("revoked index updater role from {}", updater);
        }
        Ok(())
    }
}

impl Authorizer for AccessRegistry {
    fn is_owner(&self, account: &AccountId) -> bool {
        &self.owner == account
    }

    fn is_updater(&self, account: &AccountId) -> bool {
        self.updaters.contains(account)
    }
}

/// Fails with [`AccessError::NotAuthorized`] unless `caller` is the owner.
pub fn ensure_owner<A: Authorizer + ?Sized>(access: &A, caller: &AccountId) -> Result<(), AccessError> {
    if access.is_owner(caller) {
        Ok(())
    } else {
        Err(AccessError::NotAuthorized(caller.clone()))
    }
}

/// Fails with [`AccessError::NotAuthorized`] unless `caller` may publish index values.
pub fn ensure_updater<A: Authorizer + ?Sized>(access: &A, caller: &AccountId) -> Result<(), AccessError> {
    if access.is_updater(caller) {
        Ok(())
    } else {
        Err(AccessError::NotAuthorized(caller.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_is_not_implicitly_updater() {
        let access = AccessRegistry::new(AccountId::new("owner"));
        assert!(access.is_owner(&AccountId::new("owner")));
        assert!(!access.is_updater(&AccountId::new("owner")));
    }

    #[test]
    fn test_remove_updater() {
        let owner = AccountId::new("owner");
        let keeper = AccountId::new("keeper");
        let mut access = AccessRegistry::new(owner.clone());
        access.add_updater(&owner, keeper.clone()).unwrap();
        access.remove_updater(&owner, &keeper).unwrap();
        assert!(!access.is_updater(&keeper));
        assert!(ensure_updater(&access, &keeper).is_err());
    }

    #[test]
    fn test_non_owner_cannot_manage_roles() {
        let mut access = AccessRegistry::new(AccountId::new("owner"));
        let err = access
            .add_updater(&AccountId::new("mallory"), AccountId::new("mallory"))
            .unwrap_err();
        assert_eq!(err, AccessError::NotAuthorized(AccountId::new("mallory")));
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }
}
