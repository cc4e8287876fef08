//! User service - profiles and account administration

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{authorize, Action, Actor, Resource};
use crate::error::ServiceError;
use crate::models::{
    PageRequest, PaginatedResponse, UpdateProfileRequest, User, UserResponse, UserRole,
};
use crate::store::{SharedStore, UserStore};

#[derive(Clone)]
pub struct UserService {
    store: SharedStore,
}

impl UserService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn profile(&self, actor: &Actor) -> Result<UserResponse, ServiceError> {
        Ok(self.find(actor.user_id).await?.into())
    }

    /// Absent fields are kept; `null` clears phone or address.
    pub async fn update_profile(
        &self,
        actor: &Actor,
        request: UpdateProfileRequest,
    ) -> Result<UserResponse, ServiceError> {
        request.validate()?;

        let mut user = self.find(actor.user_id).await?;
        if let Some(full_name) = request.full_name {
            user.full_name = full_name.trim().to_string();
        }
        user.phone = request.phone.apply(user.phone);
        user.address = request.address.apply(user.address);
        user.updated_at = Utc::now();

        self.store.update_user(&user).await?;
        tracing::info!(user_id = %user.id, "Profile updated");
        Ok(user.into())
    }

    pub async fn list(
        &self,
        actor: &Actor,
        page: PageRequest,
    ) -> Result<PaginatedResponse<UserResponse>, ServiceError> {
        authorize(actor, Resource::User, Action::Read)?;
        let (users, total) = self.store.list_users(page).await?;
        let data = users.into_iter().map(UserResponse::from).collect();
        Ok(PaginatedResponse::new(data, total, page))
    }

    pub async fn get(&self, actor: &Actor, user_id: Uuid) -> Result<UserResponse, ServiceError> {
        authorize(actor, Resource::User, Action::Read)?;
        Ok(self.find(user_id).await?.into())
    }

    /// Admin-level roles are granted and revoked by super admins only.
    pub async fn update_role(
        &self,
        actor: &Actor,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<UserResponse, ServiceError> {
        authorize(actor, Resource::User, Action::Update)?;

        let mut user = self.find(user_id).await?;
        Self::guard_privileged(actor, &user)?;
        if role.at_least(UserRole::Admin) {
            authorize(actor, Resource::AdminAccount, Action::Manage)?;
        }

        let previous = user.role;
        user.role = role;
        user.updated_at = Utc::now();
        self.store.update_user(&user).await?;

        tracing::info!(
            user_id = %user_id,
            admin_id = %actor.user_id,
            from = %previous,
            to = %role,
            "User role updated"
        );
        Ok(user.into())
    }

    pub async fn set_status(
        &self,
        actor: &Actor,
        user_id: Uuid,
        is_active: bool,
    ) -> Result<UserResponse, ServiceError> {
        authorize(actor, Resource::User, Action::Update)?;
        if actor.user_id == user_id && !is_active {
            return Err(ServiceError::Conflict(
                "cannot deactivate your own account".to_string(),
            ));
        }

        let mut user = self.find(user_id).await?;
        Self::guard_privileged(actor, &user)?;

        user.is_active = is_active;
        user.updated_at = Utc::now();
        self.store.update_user(&user).await?;

        tracing::info!(
            user_id = %user_id,
            admin_id = %actor.user_id,
            is_active,
            "User status updated"
        );
        Ok(user.into())
    }

    pub async fn delete(&self, actor: &Actor, user_id: Uuid) -> Result<(), ServiceError> {
        authorize(actor, Resource::User, Action::Delete)?;
        if actor.user_id == user_id {
            return Err(ServiceError::Conflict("cannot delete yourself".to_string()));
        }

        let user = self.find(user_id).await?;
        Self::guard_privileged(actor, &user)?;

        if !self.store.delete_user(user_id).await? {
            return Err(ServiceError::NotFound("user"));
        }
        tracing::warn!(user_id = %user_id, admin_id = %actor.user_id, "User deleted");
        Ok(())
    }

    /// Admin accounts are only touched by super admins.
    fn guard_privileged(actor: &Actor, target: &User) -> Result<(), ServiceError> {
        if target.role.at_least(UserRole::Admin) {
            authorize(actor, Resource::AdminAccount, Action::Manage)?;
        }
        Ok(())
    }

    async fn find(&self, user_id: Uuid) -> Result<User, ServiceError> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or(ServiceError::NotFound("user"))
    }
}
