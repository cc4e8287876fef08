//! Role-based authorization gate.
//!
//! One static table answers "may this role do this action on this kind of
//! resource". Whether the caller owns a particular record is a separate
//! question answered by [`ensure_owner`].

use uuid::Uuid;

use crate::error::ServiceError;
use crate::models::UserRole;

/// Identity of the caller, as established by the auth extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Catalog,
    Category,
    Booking,
    Payment,
    User,
    AdminAccount,
    PartnerApplication,
    Review,
    Dispute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    Approve,
    /// Owner-side work on someone else's booking (handover, return)
    Fulfil,
    /// Act on any record regardless of ownership
    Manage,
}

/// Least privileged role allowed to perform `action` on `resource`.
pub fn minimum_role(resource: Resource, action: Action) -> UserRole {
    use Action::*;
    use Resource::*;

    match (resource, action) {
        (Catalog, Read) => UserRole::Customer,
        (Catalog, Create | Update) => UserRole::Partner,
        (Catalog, _) => UserRole::Admin,

        (Category, Read) => UserRole::Customer,
        (Category, _) => UserRole::Admin,

        (Booking, Read | Create | Update) => UserRole::Customer,
        (Booking, Fulfil) => UserRole::Partner,
        (Booking, _) => UserRole::Admin,

        (Payment, Read | Create) => UserRole::Customer,
        (Payment, _) => UserRole::Admin,

        (User, Delete) => UserRole::SuperAdmin,
        (User, _) => UserRole::Admin,

        (AdminAccount, _) => UserRole::SuperAdmin,

        (PartnerApplication | Review | Dispute, Read | Create) => UserRole::Customer,
        (PartnerApplication | Review | Dispute, _) => UserRole::Admin,
    }
}

pub fn can(role: UserRole, resource: Resource, action: Action) -> bool {
    role.at_least(minimum_role(resource, action))
}

/// Gate check; logs and fails with `InsufficientPermission`.
pub fn authorize(actor: &Actor, resource: Resource, action: Action) -> Result<(), ServiceError> {
    if can(actor.role, resource, action) {
        return Ok(());
    }
    tracing::warn!(
        user_id = %actor.user_id,
        role = %actor.role,
        ?resource,
        ?action,
        reason = "insufficient_permission",
        "Access denied"
    );
    Err(ServiceError::InsufficientPermission)
}

/// Ownership check; logs and fails with `NotOwned`.
pub fn ensure_owner(actor: &Actor, owner_id: Uuid, entity: &'static str) -> Result<(), ServiceError> {
    if actor.user_id == owner_id {
        return Ok(());
    }
    tracing::warn!(
        user_id = %actor.user_id,
        owner_id = %owner_id,
        entity,
        reason = "not_owned",
        "Access denied"
    );
    Err(ServiceError::NotOwned(entity))
}
