//! In-memory store used by tests and database-less local runs.
//!
//! All tables sit behind one tokio mutex, so each trait method is atomic
//! with respect to every other call.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    BookingStore, CategoryStore, HealthCheck, ItemStore, ModerationStore, PaymentStore,
    StoreResult, UserStore,
};
use crate::booking::{Booking, BookingFilter, BookingStatus};
use crate::error::ServiceError;
use crate::inventory::{
    ApprovalStatus, Category, InventoryLedger, Item, ItemFilter, StockLevel,
};
use crate::models::{PageRequest, User};
use crate::moderation::{Dispute, DisputeFilter, PartnerApplication, Review};
use crate::payment::{Payment, PaymentStatus, Settlement};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    categories: HashMap<Uuid, Category>,
    items: HashMap<Uuid, Item>,
    bookings: HashMap<Uuid, Booking>,
    payments: HashMap<Uuid, Payment>,
    applications: HashMap<Uuid, PartnerApplication>,
    reviews: HashMap<Uuid, Review>,
    disputes: HashMap<Uuid, Dispute>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate<T: Clone>(rows: Vec<T>, page: PageRequest) -> (Vec<T>, i64) {
    let total = rows.len() as i64;
    (page.slice(&rows), total)
}

fn adjust_stock<R>(item: &mut Item, f: impl FnOnce(&mut StockLevel) -> R) -> R {
    let mut level = StockLevel::new(item.stock, item.available_stock);
    let result = f(&mut level);
    item.stock = level.stock;
    item.available_stock = level.available;
    item.updated_at = Utc::now();
    result
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        let email = user.email.to_lowercase();
        if tables.users.values().any(|u| u.email.to_lowercase() == email) {
            return Err(ServiceError::Conflict("email is already registered".to_string()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = email.to_lowercase();
        Ok(self
            .tables
            .lock()
            .await
            .users
            .values()
            .find(|u| u.email.to_lowercase() == email)
            .cloned())
    }

    async fn list_users(&self, page: PageRequest) -> StoreResult<(Vec<User>, i64)> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<User> = tables.users.values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(rows, page))
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        let existing = tables
            .users
            .get_mut(&user.id)
            .ok_or(ServiceError::NotFound("user"))?;
        existing.full_name = user.full_name.clone();
        existing.phone = user.phone.clone();
        existing.address = user.address.clone();
        existing.role = user.role;
        existing.is_active = user.is_active;
        existing.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let referenced = tables
            .bookings
            .values()
            .any(|b| b.renter_id == id || b.owner_id == id)
            || tables.items.values().any(|i| i.owner_id == id);
        if referenced && tables.users.contains_key(&id) {
            return Err(ServiceError::Conflict(
                "user has bookings or listings and cannot be deleted".to_string(),
            ));
        }
        tables.applications.retain(|_, a| a.user_id != id);
        Ok(tables.users.remove(&id).is_some())
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn insert_category(&self, category: &Category) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        let name = category.name.to_lowercase();
        if tables.categories.values().any(|c| c.name.to_lowercase() == name) {
            return Err(ServiceError::Conflict("category already exists".to_string()));
        }
        tables.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn find_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        Ok(self.tables.lock().await.categories.get(&id).cloned())
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<Category> = tables
            .categories
            .values()
            .filter(|c| c.is_active)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn update_category(&self, category: &Category) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let name = category.name.to_lowercase();
        if tables
            .categories
            .values()
            .any(|c| c.id != category.id && c.name.to_lowercase() == name)
        {
            return Err(ServiceError::Conflict("category already exists".to_string()));
        }
        match tables.categories.get_mut(&category.id) {
            Some(existing) => {
                existing.name = category.name.clone();
                existing.description = category.description.clone();
                existing.is_active = category.is_active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_items_in_category(&self, id: Uuid) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        Ok(tables.items.values().filter(|i| i.category_id == id).count() as i64)
    }

    async fn delete_category(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.lock().await.categories.remove(&id).is_some())
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn insert_item(&self, item: &Item) -> StoreResult<()> {
        self.tables.lock().await.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn find_item(&self, id: Uuid) -> StoreResult<Option<Item>> {
        Ok(self.tables.lock().await.items.get(&id).cloned())
    }

    async fn update_item(&self, item: &Item) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        let existing = tables
            .items
            .get_mut(&item.id)
            .ok_or(ServiceError::NotFound("item"))?;
        existing.category_id = item.category_id;
        existing.name = item.name.clone();
        existing.description = item.description.clone();
        existing.platform = item.platform.clone();
        existing.condition = item.condition;
        existing.price_per_day = item.price_per_day;
        existing.deposit = item.deposit;
        existing.approval_status = item.approval_status;
        existing.rejection_reason = item.rejection_reason.clone();
        existing.is_active = item.is_active;
        existing.updated_at = Utc::now();
        Ok(())
    }

    async fn decide_item(
        &self,
        id: Uuid,
        status: ApprovalStatus,
        reason: Option<String>,
    ) -> StoreResult<Option<Item>> {
        let mut tables = self.tables.lock().await;
        match tables.items.get_mut(&id) {
            Some(item) if item.approval_status == ApprovalStatus::Pending => {
                item.approval_status = status;
                item.is_active = status == ApprovalStatus::Approved;
                item.rejection_reason = reason;
                item.updated_at = Utc::now();
                Ok(Some(item.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn set_stock(&self, id: Uuid, stock: i32) -> StoreResult<Option<Item>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.items.get_mut(&id).map(|item| {
            adjust_stock(item, |level| level.restock(stock));
            item.clone()
        }))
    }

    async fn list_items(
        &self,
        filter: &ItemFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<Item>, i64)> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<Item> = tables
            .items
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(rows, page))
    }
}

#[async_trait]
impl InventoryLedger for MemoryStore {
    async fn reserve(&self, item_id: Uuid) -> Result<(), ServiceError> {
        let mut tables = self.tables.lock().await;
        let item = tables
            .items
            .get_mut(&item_id)
            .ok_or(ServiceError::NotFound("item"))?;
        if adjust_stock(item, |level| level.try_reserve()) {
            Ok(())
        } else {
            Err(ServiceError::StockInsufficient)
        }
    }

    async fn release(&self, item_id: Uuid) -> Result<(), ServiceError> {
        let mut tables = self.tables.lock().await;
        let item = tables
            .items
            .get_mut(&item_id)
            .ok_or(ServiceError::NotFound("item"))?;
        adjust_stock(item, |level| level.release());
        Ok(())
    }

    async fn check_availability(&self, item_id: Uuid) -> Result<bool, ServiceError> {
        let tables = self.tables.lock().await;
        let item = tables
            .items
            .get(&item_id)
            .ok_or(ServiceError::NotFound("item"))?;
        Ok(item.available_stock > 0)
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<()> {
        self.tables
            .lock()
            .await
            .bookings
            .insert(booking.id, booking.clone());
        Ok(())
    }

    async fn find_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.tables.lock().await.bookings.get(&id).cloned())
    }

    async fn list_bookings(
        &self,
        filter: &BookingFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<Booking>, i64)> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| filter.renter_id.map_or(true, |id| b.renter_id == id))
            .filter(|b| filter.owner_id.map_or(true, |id| b.owner_id == id))
            .filter(|b| filter.status.map_or(true, |s| b.status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(rows, page))
    }

    async fn transition_booking(
        &self,
        id: Uuid,
        from: &[BookingStatus],
        to: BookingStatus,
        release_stock: bool,
    ) -> StoreResult<Option<Booking>> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();

        let booking = match tables.bookings.get_mut(&id) {
            Some(booking) if from.contains(&booking.status) => booking,
            _ => return Ok(None),
        };
        booking.status = to;
        booking.updated_at = now;
        match to {
            BookingStatus::Active => booking.handover_at = Some(now),
            BookingStatus::Completed => booking.return_at = Some(now),
            _ => {}
        }
        let updated = booking.clone();

        if release_stock {
            if let Some(item) = tables.items.get_mut(&updated.item_id) {
                adjust_stock(item, |level| level.release());
            }
        }
        Ok(Some(updated))
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn insert_payment(&self, payment: &Payment) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        let live = tables
            .payments
            .values()
            .any(|p| p.booking_id == payment.booking_id && p.status != PaymentStatus::Failed);
        if live {
            return Err(ServiceError::Conflict(
                "booking already has an active payment".to_string(),
            ));
        }
        tables.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn find_payment(&self, id: Uuid) -> StoreResult<Option<Payment>> {
        Ok(self.tables.lock().await.payments.get(&id).cloned())
    }

    async fn find_payment_for_booking(&self, booking_id: Uuid) -> StoreResult<Option<Payment>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .payments
            .values()
            .filter(|p| p.booking_id == booking_id)
            .max_by_key(|p| p.created_at)
            .cloned())
    }

    async fn find_payment_by_txn(&self, provider_txn_id: &str) -> StoreResult<Option<Payment>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .payments
            .values()
            .find(|p| p.provider_txn_id.as_deref() == Some(provider_txn_id))
            .cloned())
    }

    async fn set_provider_txn(&self, id: Uuid, provider_txn_id: &str) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        let payment = tables
            .payments
            .get_mut(&id)
            .ok_or(ServiceError::NotFound("payment"))?;
        payment.provider_txn_id = Some(provider_txn_id.to_string());
        Ok(())
    }

    async fn settle_payment(
        &self,
        id: Uuid,
        expected: PaymentStatus,
        settlement: Settlement,
    ) -> StoreResult<Option<Payment>> {
        let mut tables = self.tables.lock().await;
        match tables.payments.get_mut(&id) {
            Some(payment) if payment.status == expected => {
                settlement.apply(payment, Utc::now());
                Ok(Some(payment.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn list_payments(
        &self,
        status: Option<PaymentStatus>,
        page: PageRequest,
    ) -> StoreResult<(Vec<Payment>, i64)> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<Payment> = tables
            .payments
            .values()
            .filter(|p| status.map_or(true, |s| p.status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(rows, page))
    }
}

#[async_trait]
impl ModerationStore for MemoryStore {
    async fn insert_application(&self, application: &PartnerApplication) -> StoreResult<()> {
        self.tables
            .lock()
            .await
            .applications
            .insert(application.id, application.clone());
        Ok(())
    }

    async fn find_application(&self, id: Uuid) -> StoreResult<Option<PartnerApplication>> {
        Ok(self.tables.lock().await.applications.get(&id).cloned())
    }

    async fn latest_application_for_user(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Option<PartnerApplication>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .applications
            .values()
            .filter(|a| a.user_id == user_id)
            .max_by_key(|a| a.submitted_at)
            .cloned())
    }

    async fn list_applications(
        &self,
        status: Option<ApprovalStatus>,
        page: PageRequest,
    ) -> StoreResult<(Vec<PartnerApplication>, i64)> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<PartnerApplication> = tables
            .applications
            .values()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(paginate(rows, page))
    }

    async fn decide_application(&self, application: &PartnerApplication) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        match tables.applications.get_mut(&application.id) {
            Some(existing) if existing.status == ApprovalStatus::Pending => {
                *existing = application.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_review(&self, review: &Review) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        if tables
            .reviews
            .values()
            .any(|r| r.booking_id == review.booking_id)
        {
            return Err(ServiceError::Conflict(
                "booking has already been reviewed".to_string(),
            ));
        }
        tables.reviews.insert(review.id, review.clone());
        Ok(())
    }

    async fn find_review_for_booking(&self, booking_id: Uuid) -> StoreResult<Option<Review>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .reviews
            .values()
            .find(|r| r.booking_id == booking_id)
            .cloned())
    }

    async fn list_reviews_for_item(
        &self,
        item_id: Uuid,
        page: PageRequest,
    ) -> StoreResult<(Vec<Review>, i64)> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<Review> = tables
            .reviews
            .values()
            .filter(|r| r.item_id == item_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(rows, page))
    }

    async fn insert_dispute(&self, dispute: &Dispute) -> StoreResult<()> {
        self.tables
            .lock()
            .await
            .disputes
            .insert(dispute.id, dispute.clone());
        Ok(())
    }

    async fn find_dispute(&self, id: Uuid) -> StoreResult<Option<Dispute>> {
        Ok(self.tables.lock().await.disputes.get(&id).cloned())
    }

    async fn list_disputes(
        &self,
        filter: &DisputeFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<Dispute>, i64)> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<Dispute> = tables
            .disputes
            .values()
            .filter(|d| filter.reporter_id.map_or(true, |id| d.reporter_id == id))
            .filter(|d| filter.status.map_or(true, |s| d.status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(rows, page))
    }

    async fn update_dispute(&self, dispute: &Dispute) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        match tables.disputes.get_mut(&dispute.id) {
            Some(existing) => {
                *existing = dispute.clone();
                Ok(())
            }
            None => Err(ServiceError::NotFound("dispute")),
        }
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
