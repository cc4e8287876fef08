use thiserror::Error;

use crate::booking::BookingStatus;

/// Errors raised by the domain services.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} does not belong to the caller")]
    NotOwned(&'static str),

    #[error("insufficient permission for this action")]
    InsufficientPermission,

    #[error("invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("item is out of stock")]
    StockInsufficient,

    #[error("item is not available for rent")]
    ItemUnavailable,

    #[error("booking cannot be cancelled while {0}")]
    CannotCancelInCurrentState(BookingStatus),

    #[error("booking is not awaiting payment (currently {0})")]
    NotInPendingPaymentState(BookingStatus),

    #[error("booking cannot move from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("no payment for provider transaction {0}")]
    PaymentNotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("account is deactivated")]
    AccountInactive,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("payment gateway error: {0}")]
    Gateway(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Business-rule failures, as opposed to infrastructure failures.
    pub fn is_business(&self) -> bool {
        !matches!(
            self,
            ServiceError::Database(_) | ServiceError::Gateway(_) | ServiceError::Internal(_)
        )
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_classification() {
        assert!(ServiceError::StockInsufficient.is_business());
        assert!(ServiceError::PaymentNotFound("tx".into()).is_business());
        assert!(!ServiceError::Database(sqlx::Error::PoolTimedOut).is_business());
        assert!(!ServiceError::Gateway("down".into()).is_business());
    }
}
