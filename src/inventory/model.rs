//! Catalog items and categories

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::Patch;

/// Physical condition of a listed game or console
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "item_condition", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ItemCondition {
    Excellent,
    Good,
    Fair,
}

/// Moderation state shared by listings and partner applications
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "approval_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// Rentable item
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Item {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub platform: Option<String>,
    pub condition: ItemCondition,
    pub stock: i32,
    pub available_stock: i32,
    pub price_per_day: i64,
    pub deposit: i64,
    pub approval_status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Listed items can be booked once approved and switched on.
    pub fn is_bookable(&self) -> bool {
        self.approval_status == ApprovalStatus::Approved && self.is_active
    }
}

/// Item category
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 80))]
    pub name: String,
    pub description: Option<String>,
}

/// Partial category edit; `null` clears the description
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 80))]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Patch<String>,
    pub is_active: Option<bool>,
}

/// New partner listing
#[derive(Debug, Deserialize, Validate)]
pub struct CreateItemRequest {
    pub category_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    pub platform: Option<String>,
    pub condition: Option<ItemCondition>,
    #[validate(range(min = 0, max = 10000))]
    pub stock: i32,
    #[validate(range(min = 0))]
    pub price_per_day: i64,
    #[validate(range(min = 0))]
    pub deposit: Option<i64>,
}

/// Partial listing edit
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateItemRequest {
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub platform: Patch<String>,
    pub condition: Option<ItemCondition>,
    #[validate(range(min = 0))]
    pub price_per_day: Option<i64>,
    #[validate(range(min = 0))]
    pub deposit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStockRequest {
    #[validate(range(min = 0, max = 10000))]
    pub stock: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RejectRequest {
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

/// Item list filter
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub owner_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub approval_status: Option<ApprovalStatus>,
    pub bookable_only: bool,
    pub in_stock_only: bool,
    pub search: Option<String>,
}

impl ItemFilter {
    pub fn matches(&self, item: &Item) -> bool {
        self.owner_id.map_or(true, |id| item.owner_id == id)
            && self.category_id.map_or(true, |id| item.category_id == id)
            && self.approval_status.map_or(true, |s| item.approval_status == s)
            && (!self.bookable_only || item.is_bookable())
            && (!self.in_stock_only || item.available_stock > 0)
            && self.search.as_deref().map_or(true, |q| {
                item.name.to_lowercase().contains(&q.to_lowercase())
            })
    }
}

/// Public catalog query string
#[derive(Debug, Default, Deserialize)]
pub struct ItemQuery {
    pub category_id: Option<Uuid>,
    pub q: Option<String>,
    pub available: Option<bool>,
    pub approval_status: Option<ApprovalStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}
