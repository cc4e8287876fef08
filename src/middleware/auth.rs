//! Authentication extractors
//!
//! Verify the bearer JWT and resolve the caller for handlers.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{Actor, AuthService, JwtError};
use crate::error::ServiceError;
use crate::models::UserRole;

/// Authenticated user extracted from JWT token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }
}

/// Error response for authentication failures
#[derive(Debug, Serialize)]
struct AuthError {
    #[serde(skip)]
    status: StatusCode,
    error: AuthErrorDetails,
}

#[derive(Debug, Serialize)]
struct AuthErrorDetails {
    code: String,
    message: String,
}

impl AuthError {
    fn new(code: &str, message: &str) -> Self {
        Self::with_status(StatusCode::UNAUTHORIZED, code, message)
    }

    fn with_status(status: StatusCode, code: &str, message: &str) -> Self {
        Self {
            status,
            error: AuthErrorDetails {
                code: code.to_string(),
                message: message.to_string(),
            },
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Extractor for authenticated users
///
/// Verifies the JWT from the Authorization header, then reloads the account
/// so the role used downstream is the current one.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(user: AuthenticatedUser) -> impl IntoResponse {
///     format!("Hello, user {}", user.user_id)
/// }
/// ```
#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    AuthError::new(
                        "MISSING_TOKEN",
                        "Authorization header with Bearer token required",
                    )
                    .into_response()
                })?;

        let auth_service = Arc::<AuthService>::from_ref(state);

        let claims = auth_service.verify(bearer.token()).map_err(|e| {
            let (code, message) = match e {
                JwtError::TokenExpired => ("TOKEN_EXPIRED", "Token has expired"),
                _ => ("INVALID_TOKEN", "Invalid token"),
            };
            AuthError::new(code, message).into_response()
        })?;

        let user_id = claims.user_id().map_err(|_| {
            AuthError::new("INVALID_TOKEN", "Invalid user ID in token").into_response()
        })?;

        let user = auth_service
            .load_active_user(user_id)
            .await
            .map_err(|e| match e {
                ServiceError::AccountInactive => {
                    AuthError::new("ACCOUNT_INACTIVE", "Account is deactivated").into_response()
                }
                ServiceError::NotFound(_) => {
                    AuthError::new("INVALID_TOKEN", "Account no longer exists").into_response()
                }
                other => crate::error::ApiError::from(other).into_response(),
            })?;

        Ok(AuthenticatedUser {
            user_id: user.id,
            email: user.email,
            role: user.role,
        })
    }
}

/// Requires partner role or above
pub struct PartnerUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for PartnerUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !user.role.at_least(UserRole::Partner) {
            return Err(AuthError::with_status(
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Partner access required",
            )
            .into_response());
        }

        Ok(PartnerUser(user))
    }
}

/// Requires admin role or above
pub struct AdminUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !user.role.at_least(UserRole::Admin) {
            return Err(AuthError::with_status(
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Admin access required",
            )
            .into_response());
        }

        Ok(AdminUser(user))
    }
}
