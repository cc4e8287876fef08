//! PostgreSQL store backed by sqlx.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    BookingStore, CategoryStore, HealthCheck, ItemStore, ModerationStore, PaymentStore,
    StoreResult, UserStore,
};
use crate::booking::{Booking, BookingFilter, BookingStatus};
use crate::db;
use crate::error::ServiceError;
use crate::inventory::{ApprovalStatus, Category, InventoryLedger, Item, ItemFilter};
use crate::models::{PageRequest, User};
use crate::moderation::{Dispute, DisputeFilter, PartnerApplication, Review};
use crate::payment::{Payment, PaymentStatus, Settlement};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Turn a constraint violation into a domain conflict.
fn conflict_on(err: sqlx::Error, code: &str, message: &str) -> ServiceError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(code) => {
            ServiceError::Conflict(message.to_string())
        }
        _ => ServiceError::Database(err),
    }
}

fn push_item_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &ItemFilter) {
    if let Some(owner_id) = filter.owner_id {
        builder.push(" AND owner_id = ");
        builder.push_bind(owner_id);
    }
    if let Some(category_id) = filter.category_id {
        builder.push(" AND category_id = ");
        builder.push_bind(category_id);
    }
    if let Some(status) = filter.approval_status {
        builder.push(" AND approval_status = ");
        builder.push_bind(status);
    }
    if filter.bookable_only {
        builder.push(" AND approval_status = 'approved' AND is_active = TRUE");
    }
    if filter.in_stock_only {
        builder.push(" AND available_stock > 0");
    }
    if let Some(search) = &filter.search {
        builder.push(" AND name ILIKE ");
        builder.push_bind(format!("%{}%", search));
    }
}

fn push_booking_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &BookingFilter) {
    if let Some(renter_id) = filter.renter_id {
        builder.push(" AND renter_id = ");
        builder.push_bind(renter_id);
    }
    if let Some(owner_id) = filter.owner_id {
        builder.push(" AND owner_id = ");
        builder.push_bind(owner_id);
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }
}

fn push_dispute_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &DisputeFilter) {
    if let Some(reporter_id) = filter.reporter_id {
        builder.push(" AND reporter_id = ");
        builder.push_bind(reporter_id);
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }
}

fn push_page(builder: &mut QueryBuilder<'_, Postgres>, order_by: &str, page: PageRequest) {
    builder.push(" ORDER BY ");
    builder.push(order_by);
    builder.push(" LIMIT ");
    builder.push_bind(page.limit);
    builder.push(" OFFSET ");
    builder.push_bind(page.offset());
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, full_name, phone, address, role, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(user.role)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on(e, UNIQUE_VIOLATION, "email is already registered"))?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_users(&self, page: PageRequest) -> StoreResult<(Vec<User>, i64)> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok((users, total))
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET full_name = $2, phone = $3, address = $4, role = $5, is_active = $6, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(user.role)
        .bind(user.is_active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("user"));
        }
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                conflict_on(
                    e,
                    FOREIGN_KEY_VIOLATION,
                    "user has bookings or listings and cannot be deleted",
                )
            })?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CategoryStore for PgStore {
    async fn insert_category(&self, category: &Category) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO categories (id, name, description, is_active, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.is_active)
        .bind(category.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on(e, UNIQUE_VIOLATION, "category already exists"))?;
        Ok(())
    }

    async fn find_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE is_active = TRUE ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn update_category(&self, category: &Category) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE categories SET name = $2, description = $3, is_active = $4 WHERE id = $1",
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on(e, UNIQUE_VIOLATION, "category already exists"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_items_in_category(&self, id: Uuid) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE category_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn delete_category(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on(e, FOREIGN_KEY_VIOLATION, "category still has items"))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ItemStore for PgStore {
    async fn insert_item(&self, item: &Item) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO items (
                id, owner_id, category_id, name, description, platform, condition,
                stock, available_stock, price_per_day, deposit, approval_status,
                rejection_reason, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(item.id)
        .bind(item.owner_id)
        .bind(item.category_id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(&item.platform)
        .bind(item.condition)
        .bind(item.stock)
        .bind(item.available_stock)
        .bind(item.price_per_day)
        .bind(item.deposit)
        .bind(item.approval_status)
        .bind(&item.rejection_reason)
        .bind(item.is_active)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_item(&self, id: Uuid) -> StoreResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    async fn update_item(&self, item: &Item) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE items
            SET category_id = $2, name = $3, description = $4, platform = $5, condition = $6,
                price_per_day = $7, deposit = $8, approval_status = $9, rejection_reason = $10,
                is_active = $11, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(item.id)
        .bind(item.category_id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(&item.platform)
        .bind(item.condition)
        .bind(item.price_per_day)
        .bind(item.deposit)
        .bind(item.approval_status)
        .bind(&item.rejection_reason)
        .bind(item.is_active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("item"));
        }
        Ok(())
    }

    async fn decide_item(
        &self,
        id: Uuid,
        status: ApprovalStatus,
        reason: Option<String>,
    ) -> StoreResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            UPDATE items
            SET approval_status = $2,
                is_active = ($2 = 'approved'::approval_status),
                rejection_reason = $3,
                updated_at = NOW()
            WHERE id = $1 AND approval_status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn set_stock(&self, id: Uuid, stock: i32) -> StoreResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            UPDATE items
            SET available_stock = GREATEST(LEAST(available_stock + ($2 - stock), $2), 0),
                stock = $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(stock.max(0))
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn list_items(
        &self,
        filter: &ItemFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<Item>, i64)> {
        let mut query_builder = QueryBuilder::<Postgres>::new("SELECT * FROM items WHERE 1=1");
        let mut count_builder =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM items WHERE 1=1");

        push_item_filters(&mut query_builder, filter);
        push_item_filters(&mut count_builder, filter);
        push_page(&mut query_builder, "created_at DESC", page);

        let items = query_builder
            .build_query_as::<Item>()
            .fetch_all(&self.pool)
            .await?;
        let total = count_builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok((items, total))
    }
}

#[async_trait]
impl InventoryLedger for PgStore {
    async fn reserve(&self, item_id: Uuid) -> Result<(), ServiceError> {
        let result = sqlx::query(
            r#"
            UPDATE items
            SET available_stock = available_stock - 1, updated_at = NOW()
            WHERE id = $1 AND available_stock > 0
            "#,
        )
        .bind(item_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM items WHERE id = $1")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;
        match exists {
            Some(_) => Err(ServiceError::StockInsufficient),
            None => Err(ServiceError::NotFound("item")),
        }
    }

    async fn release(&self, item_id: Uuid) -> Result<(), ServiceError> {
        let result = sqlx::query(
            r#"
            UPDATE items
            SET available_stock = LEAST(available_stock + 1, stock), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(item_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("item"));
        }
        Ok(())
    }

    async fn check_availability(&self, item_id: Uuid) -> Result<bool, ServiceError> {
        let available: Option<i32> =
            sqlx::query_scalar("SELECT available_stock FROM items WHERE id = $1")
                .bind(item_id)
                .fetch_optional(&self.pool)
                .await?;
        available
            .map(|n| n > 0)
            .ok_or(ServiceError::NotFound("item"))
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, renter_id, item_id, owner_id, start_date, end_date, rental_days,
                daily_price, total_rent, deposit, total_amount, status, notes,
                handover_at, return_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(booking.id)
        .bind(booking.renter_id)
        .bind(booking.item_id)
        .bind(booking.owner_id)
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(booking.rental_days)
        .bind(booking.daily_price)
        .bind(booking.total_rent)
        .bind(booking.deposit)
        .bind(booking.total_amount)
        .bind(booking.status)
        .bind(&booking.notes)
        .bind(booking.handover_at)
        .bind(booking.return_at)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(booking)
    }

    async fn list_bookings(
        &self,
        filter: &BookingFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<Booking>, i64)> {
        let mut query_builder = QueryBuilder::<Postgres>::new("SELECT * FROM bookings WHERE 1=1");
        let mut count_builder =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM bookings WHERE 1=1");

        push_booking_filters(&mut query_builder, filter);
        push_booking_filters(&mut count_builder, filter);
        push_page(&mut query_builder, "created_at DESC", page);

        let bookings = query_builder
            .build_query_as::<Booking>()
            .fetch_all(&self.pool)
            .await?;
        let total = count_builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok((bookings, total))
    }

    async fn transition_booking(
        &self,
        id: Uuid,
        from: &[BookingStatus],
        to: BookingStatus,
        release_stock: bool,
    ) -> StoreResult<Option<Booking>> {
        let from: Vec<String> = from.iter().map(|s| s.as_str().to_string()).collect();
        let mut tx = self.pool.begin().await?;

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = $2,
                handover_at = CASE WHEN $2 = 'active'::booking_status THEN NOW() ELSE handover_at END,
                return_at = CASE WHEN $2 = 'completed'::booking_status THEN NOW() ELSE return_at END,
                updated_at = NOW()
            WHERE id = $1 AND status::text = ANY($3)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(to)
        .bind(&from)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(booking) = booking else {
            tx.rollback().await?;
            return Ok(None);
        };

        if release_stock {
            sqlx::query(
                r#"
                UPDATE items
                SET available_stock = LEAST(available_stock + 1, stock), updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(booking.item_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(booking))
    }
}

#[async_trait]
impl PaymentStore for PgStore {
    async fn insert_payment(&self, payment: &Payment) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, booking_id, provider, provider_txn_id, amount, status, method,
                paid_at, failed_at, failure_reason, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(payment.id)
        .bind(payment.booking_id)
        .bind(payment.provider)
        .bind(&payment.provider_txn_id)
        .bind(payment.amount)
        .bind(payment.status)
        .bind(&payment.method)
        .bind(payment.paid_at)
        .bind(payment.failed_at)
        .bind(&payment.failure_reason)
        .bind(payment.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on(e, UNIQUE_VIOLATION, "booking already has an active payment"))?;
        Ok(())
    }

    async fn find_payment(&self, id: Uuid) -> StoreResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(payment)
    }

    async fn find_payment_for_booking(&self, booking_id: Uuid) -> StoreResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE booking_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(payment)
    }

    async fn find_payment_by_txn(&self, provider_txn_id: &str) -> StoreResult<Option<Payment>> {
        let payment =
            sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE provider_txn_id = $1")
                .bind(provider_txn_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(payment)
    }

    async fn set_provider_txn(&self, id: Uuid, provider_txn_id: &str) -> StoreResult<()> {
        sqlx::query("UPDATE payments SET provider_txn_id = $2 WHERE id = $1")
            .bind(id)
            .bind(provider_txn_id)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on(e, UNIQUE_VIOLATION, "duplicate provider transaction id"))?;
        Ok(())
    }

    async fn settle_payment(
        &self,
        id: Uuid,
        expected: PaymentStatus,
        settlement: Settlement,
    ) -> StoreResult<Option<Payment>> {
        let status = settlement.status();
        let (method, reason) = match settlement {
            Settlement::Paid { method } => (method, None),
            Settlement::Failed { reason } => (None, Some(reason)),
            Settlement::Refunded => (None, None),
        };

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = $3,
                method = COALESCE($4, method),
                paid_at = CASE WHEN $3 = 'paid'::payment_status THEN NOW() ELSE paid_at END,
                failed_at = CASE WHEN $3 = 'failed'::payment_status THEN NOW() ELSE failed_at END,
                failure_reason = COALESCE($5, failure_reason)
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(status)
        .bind(method)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?;
        Ok(payment)
    }

    async fn list_payments(
        &self,
        status: Option<PaymentStatus>,
        page: PageRequest,
    ) -> StoreResult<(Vec<Payment>, i64)> {
        let mut query_builder = QueryBuilder::<Postgres>::new("SELECT * FROM payments WHERE 1=1");
        let mut count_builder =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM payments WHERE 1=1");

        if let Some(status) = status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
            count_builder.push(" AND status = ");
            count_builder.push_bind(status);
        }
        push_page(&mut query_builder, "created_at DESC", page);

        let payments = query_builder
            .build_query_as::<Payment>()
            .fetch_all(&self.pool)
            .await?;
        let total = count_builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok((payments, total))
    }
}

#[async_trait]
impl ModerationStore for PgStore {
    async fn insert_application(&self, application: &PartnerApplication) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO partner_applications (
                id, user_id, business_name, business_address, phone, description,
                status, rejection_reason, submitted_at, decided_at, decided_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(application.id)
        .bind(application.user_id)
        .bind(&application.business_name)
        .bind(&application.business_address)
        .bind(&application.phone)
        .bind(&application.description)
        .bind(application.status)
        .bind(&application.rejection_reason)
        .bind(application.submitted_at)
        .bind(application.decided_at)
        .bind(application.decided_by)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_application(&self, id: Uuid) -> StoreResult<Option<PartnerApplication>> {
        let application = sqlx::query_as::<_, PartnerApplication>(
            "SELECT * FROM partner_applications WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(application)
    }

    async fn latest_application_for_user(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Option<PartnerApplication>> {
        let application = sqlx::query_as::<_, PartnerApplication>(
            "SELECT * FROM partner_applications WHERE user_id = $1 ORDER BY submitted_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(application)
    }

    async fn list_applications(
        &self,
        status: Option<ApprovalStatus>,
        page: PageRequest,
    ) -> StoreResult<(Vec<PartnerApplication>, i64)> {
        let mut query_builder =
            QueryBuilder::<Postgres>::new("SELECT * FROM partner_applications WHERE 1=1");
        let mut count_builder =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM partner_applications WHERE 1=1");

        if let Some(status) = status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
            count_builder.push(" AND status = ");
            count_builder.push_bind(status);
        }
        push_page(&mut query_builder, "submitted_at DESC", page);

        let applications = query_builder
            .build_query_as::<PartnerApplication>()
            .fetch_all(&self.pool)
            .await?;
        let total = count_builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok((applications, total))
    }

    async fn decide_application(&self, application: &PartnerApplication) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE partner_applications
            SET status = $2, rejection_reason = $3, decided_at = $4, decided_by = $5
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(application.id)
        .bind(application.status)
        .bind(&application.rejection_reason)
        .bind(application.decided_at)
        .bind(application.decided_by)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_review(&self, review: &Review) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, booking_id, user_id, item_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(review.id)
        .bind(review.booking_id)
        .bind(review.user_id)
        .bind(review.item_id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on(e, UNIQUE_VIOLATION, "booking has already been reviewed"))?;
        Ok(())
    }

    async fn find_review_for_booking(&self, booking_id: Uuid) -> StoreResult<Option<Review>> {
        let review = sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE booking_id = $1")
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(review)
    }

    async fn list_reviews_for_item(
        &self,
        item_id: Uuid,
        page: PageRequest,
    ) -> StoreResult<(Vec<Review>, i64)> {
        let reviews = sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE item_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(item_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE item_id = $1")
            .bind(item_id)
            .fetch_one(&self.pool)
            .await?;

        Ok((reviews, total))
    }

    async fn insert_dispute(&self, dispute: &Dispute) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO disputes (
                id, booking_id, reporter_id, kind, title, description, status,
                resolution, resolved_by, created_at, resolved_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(dispute.id)
        .bind(dispute.booking_id)
        .bind(dispute.reporter_id)
        .bind(dispute.kind)
        .bind(&dispute.title)
        .bind(&dispute.description)
        .bind(dispute.status)
        .bind(&dispute.resolution)
        .bind(dispute.resolved_by)
        .bind(dispute.created_at)
        .bind(dispute.resolved_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_dispute(&self, id: Uuid) -> StoreResult<Option<Dispute>> {
        let dispute = sqlx::query_as::<_, Dispute>("SELECT * FROM disputes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(dispute)
    }

    async fn list_disputes(
        &self,
        filter: &DisputeFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<Dispute>, i64)> {
        let mut query_builder = QueryBuilder::<Postgres>::new("SELECT * FROM disputes WHERE 1=1");
        let mut count_builder =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM disputes WHERE 1=1");

        push_dispute_filters(&mut query_builder, filter);
        push_dispute_filters(&mut count_builder, filter);
        push_page(&mut query_builder, "created_at DESC", page);

        let disputes = query_builder
            .build_query_as::<Dispute>()
            .fetch_all(&self.pool)
            .await?;
        let total = count_builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok((disputes, total))
    }

    async fn update_dispute(&self, dispute: &Dispute) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE disputes
            SET status = $2, resolution = $3, resolved_by = $4, resolved_at = $5
            WHERE id = $1
            "#,
        )
        .bind(dispute.id)
        .bind(dispute.status)
        .bind(&dispute.resolution)
        .bind(dispute.resolved_by)
        .bind(dispute.resolved_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("dispute"));
        }
        Ok(())
    }
}

#[async_trait]
impl HealthCheck for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        db::ping(&self.pool).await.map_err(ServiceError::Database)
    }
}
