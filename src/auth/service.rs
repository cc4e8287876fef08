//! Authentication service
//!
//! Email/password accounts and access token issuance.

use uuid::Uuid;
use validator::Validate;

use crate::error::ServiceError;
use crate::models::{LoginRequest, LoginResponse, RegisterRequest, User, UserResponse, UserRole};
use crate::notify::{templates, Notifier};
use crate::store::{SharedStore, UserStore};

use super::jwt::{generate_access_token, verify_token, Claims, JwtError};
use super::password::{hash_password, verify_password};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: SharedStore,
    notifier: Notifier,
    jwt_secret: String,
    access_token_ttl_seconds: i64,
}

impl AuthService {
    pub fn new(
        store: SharedStore,
        notifier: Notifier,
        jwt_secret: String,
        access_token_ttl_seconds: i64,
    ) -> Self {
        Self {
            store,
            notifier,
            jwt_secret,
            access_token_ttl_seconds,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    /// Create a customer account
    pub async fn register(&self, request: RegisterRequest) -> Result<UserResponse, ServiceError> {
        request.validate()?;

        let email = request.email.trim().to_lowercase();
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(ServiceError::Conflict("email is already registered".to_string()));
        }

        let password_hash = hash_password(&request.password)?;
        let mut user = User::new(
            email,
            password_hash,
            request.full_name.trim().to_string(),
            UserRole::Customer,
        );
        user.phone = request.phone;

        self.store.insert_user(&user).await?;
        tracing::info!(user_id = %user.id, "User registered");
        self.notifier.enqueue(templates::welcome(&user));

        Ok(user.into())
    }

    /// Check credentials and issue an access token
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ServiceError> {
        request.validate()?;

        let user = self
            .store
            .find_user_by_email(&request.email.trim().to_lowercase())
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        if !verify_password(&request.password, &user.password_hash) {
            tracing::debug!(user_id = %user.id, "Password mismatch");
            return Err(ServiceError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(ServiceError::AccountInactive);
        }

        let access_token = self.issue_token(&user)?;
        tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

        Ok(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_ttl_seconds,
            user: user.into(),
        })
    }

    pub fn issue_token(&self, user: &User) -> Result<String, ServiceError> {
        generate_access_token(user, &self.jwt_secret, self.access_token_ttl_seconds)
            .map_err(|e| ServiceError::Internal(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        verify_token(token, &self.jwt_secret)
    }

    /// Re-read the token subject so role changes and deactivation apply
    /// to tokens that are already issued.
    pub async fn load_active_user(&self, user_id: Uuid) -> Result<User, ServiceError> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(ServiceError::NotFound("user"))?;
        if !user.is_active {
            return Err(ServiceError::AccountInactive);
        }
        Ok(user)
    }
}
