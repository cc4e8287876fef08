//! Repository traits and their implementations.
//!
//! Services hold an `Arc<dyn Store>`; production wires [`PgStore`], tests and
//! local runs use [`MemoryStore`]. Every state-changing method that guards an
//! invariant (stock bounds, booking lifecycle, payment settlement) is a single
//! conditional write in both implementations.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::booking::{Booking, BookingFilter, BookingStatus};
use crate::error::ServiceError;
use crate::inventory::{ApprovalStatus, Category, InventoryLedger, Item, ItemFilter};
use crate::models::{PageRequest, User};
use crate::moderation::{Dispute, DisputeFilter, PartnerApplication, Review};
use crate::payment::{Payment, PaymentStatus, Settlement};

pub type StoreResult<T> = Result<T, ServiceError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn list_users(&self, page: PageRequest) -> StoreResult<(Vec<User>, i64)>;
    /// Writes profile fields, role and active flag.
    async fn update_user(&self, user: &User) -> StoreResult<()>;
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn insert_category(&self, category: &Category) -> StoreResult<()>;
    async fn find_category(&self, id: Uuid) -> StoreResult<Option<Category>>;
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
    /// Writes name, description and active flag. `false` when missing.
    async fn update_category(&self, category: &Category) -> StoreResult<bool>;
    async fn count_items_in_category(&self, id: Uuid) -> StoreResult<i64>;
    async fn delete_category(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn insert_item(&self, item: &Item) -> StoreResult<()>;
    async fn find_item(&self, id: Uuid) -> StoreResult<Option<Item>>;
    /// Writes listing fields and moderation state; never touches stock.
    async fn update_item(&self, item: &Item) -> StoreResult<()>;
    /// Conditional on the item still being `pending`.
    async fn decide_item(
        &self,
        id: Uuid,
        status: ApprovalStatus,
        reason: Option<String>,
    ) -> StoreResult<Option<Item>>;
    async fn set_stock(&self, id: Uuid, stock: i32) -> StoreResult<Option<Item>>;
    async fn list_items(&self, filter: &ItemFilter, page: PageRequest)
        -> StoreResult<(Vec<Item>, i64)>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<()>;
    async fn find_booking(&self, id: Uuid) -> StoreResult<Option<Booking>>;
    async fn list_bookings(
        &self,
        filter: &BookingFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<Booking>, i64)>;
    /// Compare-and-set the status. Returns `None` when the booking is not in
    /// one of `from`. With `release_stock` the item gets its unit back in the
    /// same atomic step.
    async fn transition_booking(
        &self,
        id: Uuid,
        from: &[BookingStatus],
        to: BookingStatus,
        release_stock: bool,
    ) -> StoreResult<Option<Booking>>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Fails with `Conflict` when the booking already has a non-failed payment.
    async fn insert_payment(&self, payment: &Payment) -> StoreResult<()>;
    async fn find_payment(&self, id: Uuid) -> StoreResult<Option<Payment>>;
    /// Most recent payment for the booking.
    async fn find_payment_for_booking(&self, booking_id: Uuid) -> StoreResult<Option<Payment>>;
    async fn find_payment_by_txn(&self, provider_txn_id: &str) -> StoreResult<Option<Payment>>;
    async fn set_provider_txn(&self, id: Uuid, provider_txn_id: &str) -> StoreResult<()>;
    /// Applies `settlement` only while the payment is in `expected`.
    async fn settle_payment(
        &self,
        id: Uuid,
        expected: PaymentStatus,
        settlement: Settlement,
    ) -> StoreResult<Option<Payment>>;
    async fn list_payments(
        &self,
        status: Option<PaymentStatus>,
        page: PageRequest,
    ) -> StoreResult<(Vec<Payment>, i64)>;
}

#[async_trait]
pub trait ModerationStore: Send + Sync {
    async fn insert_application(&self, application: &PartnerApplication) -> StoreResult<()>;
    async fn find_application(&self, id: Uuid) -> StoreResult<Option<PartnerApplication>>;
    async fn latest_application_for_user(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Option<PartnerApplication>>;
    async fn list_applications(
        &self,
        status: Option<ApprovalStatus>,
        page: PageRequest,
    ) -> StoreResult<(Vec<PartnerApplication>, i64)>;
    /// Conditional on the application still being `pending`.
    async fn decide_application(
        &self,
        application: &PartnerApplication,
    ) -> StoreResult<bool>;

    /// Fails with `Conflict` when the booking already has a review.
    async fn insert_review(&self, review: &Review) -> StoreResult<()>;
    async fn find_review_for_booking(&self, booking_id: Uuid) -> StoreResult<Option<Review>>;
    async fn list_reviews_for_item(
        &self,
        item_id: Uuid,
        page: PageRequest,
    ) -> StoreResult<(Vec<Review>, i64)>;

    async fn insert_dispute(&self, dispute: &Dispute) -> StoreResult<()>;
    async fn find_dispute(&self, id: Uuid) -> StoreResult<Option<Dispute>>;
    async fn list_disputes(
        &self,
        filter: &DisputeFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<Dispute>, i64)>;
    async fn update_dispute(&self, dispute: &Dispute) -> StoreResult<()>;
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;
}

/// Everything the services need from persistence.
pub trait Store:
    UserStore
    + CategoryStore
    + ItemStore
    + InventoryLedger
    + BookingStore
    + PaymentStore
    + ModerationStore
    + HealthCheck
{
}

impl<T> Store for T where
    T: UserStore
        + CategoryStore
        + ItemStore
        + InventoryLedger
        + BookingStore
        + PaymentStore
        + ModerationStore
        + HealthCheck
{
}

pub type SharedStore = Arc<dyn Store>;
