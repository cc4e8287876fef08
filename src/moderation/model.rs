//! Partner applications, reviews and disputes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::inventory::ApprovalStatus;

/// A customer's request to become a partner
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct PartnerApplication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_name: String,
    pub business_address: String,
    pub phone: Option<String>,
    pub description: Option<String>,
    pub status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PartnerApplicationRequest {
    #[validate(length(min = 1, max = 200))]
    pub business_name: String,
    #[validate(length(min = 1, max = 500))]
    pub business_address: String,
    pub phone: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApplicationListQuery {
    pub status: Option<ApprovalStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Renter feedback on a completed booking
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Review {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub item_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: i16,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "dispute_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DisputeKind {
    Payment,
    ItemCondition,
    LateReturn,
    NoShow,
    Other,
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "dispute_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Open,
    Investigating,
    Resolved,
    Closed,
}

impl DisputeStatus {
    pub fn can_move_to(self, next: DisputeStatus) -> bool {
        use DisputeStatus::*;
        matches!(
            (self, next),
            (Open, Investigating) | (Open, Resolved) | (Investigating, Resolved)
        ) || (self != Closed && next == Closed)
    }
}

/// Dispute raised against a booking; never alters booking status
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Dispute {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub reporter_id: Uuid,
    pub kind: DisputeKind,
    pub title: String,
    pub description: String,
    pub status: DisputeStatus,
    pub resolution: Option<String>,
    pub resolved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDisputeRequest {
    pub kind: DisputeKind,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDisputeRequest {
    pub status: DisputeStatus,
    #[validate(length(max = 5000))]
    pub resolution: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DisputeFilter {
    pub reporter_id: Option<Uuid>,
    pub status: Option<DisputeStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DisputeListQuery {
    pub status: Option<DisputeStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}
