//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use game_rental_server::auth::{generate_access_token, Actor};
use game_rental_server::booking::{
    Booking, BookingFilter, BookingService, BookingStatus, CreateBookingRequest,
};
use game_rental_server::error::ServiceError;
use game_rental_server::inventory::{
    ApprovalStatus, Category, InventoryLedger, Item, ItemCondition, ItemFilter,
};
use game_rental_server::models::{PageRequest, User, UserRole};
use game_rental_server::moderation::{Dispute, DisputeFilter, PartnerApplication, Review};
use game_rental_server::notify::Notifier;
use game_rental_server::payment::{
    MockGateway, Payment, PaymentGateway, PaymentService, PaymentStatus, Settlement,
};
use game_rental_server::state::AppState;
use game_rental_server::store::{
    BookingStore, CategoryStore, HealthCheck, ItemStore, MemoryStore, ModerationStore,
    PaymentStore, SharedStore, StoreResult, UserStore,
};

pub const JWT_SECRET: &str = "integration-test-secret";

pub fn fixed_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 1).unwrap()
}

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, day).unwrap()
}

/// A store seeded with a renter, a partner, an admin and one approved item.
pub struct World {
    pub store: SharedStore,
    pub gateway: Arc<MockGateway>,
    pub bookings: Arc<BookingService>,
    pub payments: PaymentService,
    pub renter: User,
    pub owner: User,
    pub admin: User,
    pub item: Item,
}

impl World {
    pub async fn new(stock: i32) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), stock).await
    }

    pub async fn with_store(store: SharedStore, stock: i32) -> Self {

        let renter = seed_user(&store, "renter@example.com", UserRole::Customer).await;
        let owner = seed_user(&store, "owner@example.com", UserRole::Partner).await;
        let admin = seed_user(&store, "admin@example.com", UserRole::Admin).await;
        let item = seed_item(&store, owner.id, stock).await;

        let gateway = Arc::new(MockGateway::new());
        let bookings = Arc::new(
            BookingService::new(store.clone(), Notifier::disabled()).with_clock(fixed_today),
        );
        let payments = PaymentService::new(
            store.clone(),
            gateway.clone() as Arc<dyn PaymentGateway>,
            bookings.clone(),
            Notifier::disabled(),
        );

        Self {
            store,
            gateway,
            bookings,
            payments,
            renter,
            owner,
            admin,
            item,
        }
    }

    pub fn renter_actor(&self) -> Actor {
        Actor::new(self.renter.id, self.renter.role)
    }

    pub fn owner_actor(&self) -> Actor {
        Actor::new(self.owner.id, self.owner.role)
    }

    pub fn admin_actor(&self) -> Actor {
        Actor::new(self.admin.id, self.admin.role)
    }

    pub fn booking_request(&self) -> CreateBookingRequest {
        CreateBookingRequest {
            item_id: self.item.id,
            start_date: date(10),
            end_date: date(12),
            notes: None,
        }
    }

    pub async fn available_stock(&self) -> i32 {
        self.store
            .find_item(self.item.id)
            .await
            .unwrap()
            .unwrap()
            .available_stock
    }

    /// Router state sharing this world's store and clock.
    pub fn app_state(&self) -> AppState {
        AppState::with_bookings(
            self.store.clone(),
            self.gateway.clone() as Arc<dyn PaymentGateway>,
            Notifier::disabled(),
            JWT_SECRET.to_string(),
            3600,
            self.bookings.clone(),
        )
    }

    pub fn token_for(&self, user: &User) -> String {
        generate_access_token(user, JWT_SECRET, 3600).unwrap()
    }
}

pub async fn seed_user(store: &SharedStore, email: &str, role: UserRole) -> User {
    let user = User::new(email.to_string(), "x".to_string(), "Test User".to_string(), role);
    store.insert_user(&user).await.unwrap();
    user
}

pub async fn seed_item(store: &SharedStore, owner_id: Uuid, stock: i32) -> Item {
    let now = Utc::now();
    let item = Item {
        id: Uuid::new_v4(),
        owner_id,
        category_id: Uuid::new_v4(),
        name: "Zelda: Tears of the Kingdom".to_string(),
        description: Some("Switch cartridge".to_string()),
        platform: Some("Switch".to_string()),
        condition: ItemCondition::Excellent,
        stock,
        available_stock: stock,
        price_per_day: 10_000,
        deposit: 5_000,
        approval_status: ApprovalStatus::Approved,
        rejection_reason: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    store.insert_item(&item).await.unwrap();
    item
}

/// `MemoryStore` whose next booking transition can be made to fail once,
/// the way a dropped database connection would.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_next_transition: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_transition(&self) {
        self.fail_next_transition.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserStore for FlakyStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        self.inner.insert_user(user).await
    }
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.inner.find_user(id).await
    }
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.inner.find_user_by_email(email).await
    }
    async fn list_users(&self, page: PageRequest) -> StoreResult<(Vec<User>, i64)> {
        self.inner.list_users(page).await
    }
    async fn update_user(&self, user: &User) -> StoreResult<()> {
        self.inner.update_user(user).await
    }
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        self.inner.delete_user(id).await
    }
}

#[async_trait]
impl CategoryStore for FlakyStore {
    async fn insert_category(&self, category: &Category) -> StoreResult<()> {
        self.inner.insert_category(category).await
    }
    async fn find_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        self.inner.find_category(id).await
    }
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        self.inner.list_categories().await
    }
    async fn update_category(&self, category: &Category) -> StoreResult<bool> {
        self.inner.update_category(category).await
    }
    async fn count_items_in_category(&self, id: Uuid) -> StoreResult<i64> {
        self.inner.count_items_in_category(id).await
    }
    async fn delete_category(&self, id: Uuid) -> StoreResult<bool> {
        self.inner.delete_category(id).await
    }
}

#[async_trait]
impl ItemStore for FlakyStore {
    async fn insert_item(&self, item: &Item) -> StoreResult<()> {
        self.inner.insert_item(item).await
    }
    async fn find_item(&self, id: Uuid) -> StoreResult<Option<Item>> {
        self.inner.find_item(id).await
    }
    async fn update_item(&self, item: &Item) -> StoreResult<()> {
        self.inner.update_item(item).await
    }
    async fn decide_item(
        &self,
        id: Uuid,
        status: ApprovalStatus,
        reason: Option<String>,
    ) -> StoreResult<Option<Item>> {
        self.inner.decide_item(id, status, reason).await
    }
    async fn set_stock(&self, id: Uuid, stock: i32) -> StoreResult<Option<Item>> {
        self.inner.set_stock(id, stock).await
    }
    async fn list_items(
        &self,
        filter: &ItemFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<Item>, i64)> {
        self.inner.list_items(filter, page).await
    }
}

#[async_trait]
impl InventoryLedger for FlakyStore {
    async fn reserve(&self, item_id: Uuid) -> Result<(), ServiceError> {
        self.inner.reserve(item_id).await
    }
    async fn release(&self, item_id: Uuid) -> Result<(), ServiceError> {
        self.inner.release(item_id).await
    }
    async fn check_availability(&self, item_id: Uuid) -> Result<bool, ServiceError> {
        self.inner.check_availability(item_id).await
    }
}

#[async_trait]
impl BookingStore for FlakyStore {
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<()> {
        self.inner.insert_booking(booking).await
    }
    async fn find_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        self.inner.find_booking(id).await
    }
    async fn list_bookings(
        &self,
        filter: &BookingFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<Booking>, i64)> {
        self.inner.list_bookings(filter, page).await
    }
    async fn transition_booking(
        &self,
        id: Uuid,
        from: &[BookingStatus],
        to: BookingStatus,
        release_stock: bool,
    ) -> StoreResult<Option<Booking>> {
        if self.fail_next_transition.swap(false, Ordering::SeqCst) {
            return Err(ServiceError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner
            .transition_booking(id, from, to, release_stock)
            .await
    }
}

#[async_trait]
impl PaymentStore for FlakyStore {
    async fn insert_payment(&self, payment: &Payment) -> StoreResult<()> {
        self.inner.insert_payment(payment).await
    }
    async fn find_payment(&self, id: Uuid) -> StoreResult<Option<Payment>> {
        self.inner.find_payment(id).await
    }
    async fn find_payment_for_booking(&self, booking_id: Uuid) -> StoreResult<Option<Payment>> {
        self.inner.find_payment_for_booking(booking_id).await
    }
    async fn find_payment_by_txn(&self, provider_txn_id: &str) -> StoreResult<Option<Payment>> {
        self.inner.find_payment_by_txn(provider_txn_id).await
    }
    async fn set_provider_txn(&self, id: Uuid, provider_txn_id: &str) -> StoreResult<()> {
        self.inner.set_provider_txn(id, provider_txn_id).await
    }
    async fn settle_payment(
        &self,
        id: Uuid,
        expected: PaymentStatus,
        settlement: Settlement,
    ) -> StoreResult<Option<Payment>> {
        self.inner.settle_payment(id, expected, settlement).await
    }
    async fn list_payments(
        &self,
        status: Option<PaymentStatus>,
        page: PageRequest,
    ) -> StoreResult<(Vec<Payment>, i64)> {
        self.inner.list_payments(status, page).await
    }
}

#[async_trait]
impl ModerationStore for FlakyStore {
    async fn insert_application(&self, application: &PartnerApplication) -> StoreResult<()> {
        self.inner.insert_application(application).await
    }
    async fn find_application(&self, id: Uuid) -> StoreResult<Option<PartnerApplication>> {
        self.inner.find_application(id).await
    }
    async fn latest_application_for_user(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Option<PartnerApplication>> {
        self.inner.latest_application_for_user(user_id).await
    }
    async fn list_applications(
        &self,
        status: Option<ApprovalStatus>,
        page: PageRequest,
    ) -> StoreResult<(Vec<PartnerApplication>, i64)> {
        self.inner.list_applications(status, page).await
    }
    async fn decide_application(&self, application: &PartnerApplication) -> StoreResult<bool> {
        self.inner.decide_application(application).await
    }
    async fn insert_review(&self, review: &Review) -> StoreResult<()> {
        self.inner.insert_review(review).await
    }
    async fn find_review_for_booking(&self, booking_id: Uuid) -> StoreResult<Option<Review>> {
        self.inner.find_review_for_booking(booking_id).await
    }
    async fn list_reviews_for_item(
        &self,
        item_id: Uuid,
        page: PageRequest,
    ) -> StoreResult<(Vec<Review>, i64)> {
        self.inner.list_reviews_for_item(item_id, page).await
    }
    async fn insert_dispute(&self, dispute: &Dispute) -> StoreResult<()> {
        self.inner.insert_dispute(dispute).await
    }
    async fn find_dispute(&self, id: Uuid) -> StoreResult<Option<Dispute>> {
        self.inner.find_dispute(id).await
    }
    async fn list_disputes(
        &self,
        filter: &DisputeFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<Dispute>, i64)> {
        self.inner.list_disputes(filter, page).await
    }
    async fn update_dispute(&self, dispute: &Dispute) -> StoreResult<()> {
        self.inner.update_dispute(dispute).await
    }
}

#[async_trait]
impl HealthCheck for FlakyStore {
    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }
}
