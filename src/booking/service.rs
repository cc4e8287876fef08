//! Booking service - rental lifecycle on top of the inventory ledger

use chrono::{NaiveDate, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{authorize, can, ensure_owner, Action, Actor, Resource};
use crate::error::ServiceError;
use crate::inventory::{InventoryLedger, Item};
use crate::models::{PageRequest, PaginatedResponse, User};
use crate::notify::{templates, EmailMessage, Notifier};
use crate::store::{BookingStore, ItemStore, SharedStore, UserStore};

use super::model::{
    validate_dates, Booking, BookingFilter, BookingStatus, CreateBookingRequest, Pricing,
};

fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Renter, item owner, or anyone allowed to manage bookings.
pub fn ensure_participant(actor: &Actor, booking: &Booking) -> Result<(), ServiceError> {
    if actor.user_id == booking.renter_id
        || actor.user_id == booking.owner_id
        || can(actor.role, Resource::Booking, Action::Manage)
    {
        return Ok(());
    }
    ensure_owner(actor, booking.renter_id, "booking")
}

/// Booking service
#[derive(Clone)]
pub struct BookingService {
    store: SharedStore,
    notifier: Notifier,
    today: fn() -> NaiveDate,
}

impl BookingService {
    pub fn new(store: SharedStore, notifier: Notifier) -> Self {
        Self {
            store,
            notifier,
            today: utc_today,
        }
    }

    /// Replace the source of "today" used for date validation.
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Reserve a unit and open a booking awaiting payment
    pub async fn create(
        &self,
        actor: &Actor,
        request: CreateBookingRequest,
    ) -> Result<Booking, ServiceError> {
        authorize(actor, Resource::Booking, Action::Create)?;
        validate_dates(request.start_date, request.end_date, (self.today)())?;
        request.validate()?;

        let item = self
            .store
            .find_item(request.item_id)
            .await?
            .ok_or(ServiceError::NotFound("item"))?;
        if !item.is_bookable() {
            return Err(ServiceError::ItemUnavailable);
        }

        let pricing = Pricing::compute(
            request.start_date,
            request.end_date,
            item.price_per_day,
            item.deposit,
        )?;

        self.store.reserve(item.id).await?;

        let booking = Booking::new(
            actor.user_id,
            item.id,
            item.owner_id,
            request.start_date,
            request.end_date,
            pricing,
            request.notes,
        );

        if let Err(e) = self.store.insert_booking(&booking).await {
            tracing::error!(
                error = %e,
                item_id = %item.id,
                "Booking insert failed, releasing reserved unit"
            );
            if let Err(release_err) = self.store.release(item.id).await {
                tracing::error!(
                    error = %release_err,
                    item_id = %item.id,
                    "Failed to release unit after booking insert failure"
                );
            }
            return Err(e);
        }

        tracing::info!(
            booking_id = %booking.id,
            item_id = %item.id,
            renter_id = %actor.user_id,
            total_amount = booking.total_amount,
            "Booking created"
        );

        self.notify_renter(&booking, |user, item| {
            templates::booking_created(user, item, &booking)
        })
        .await;

        Ok(booking)
    }

    /// Renter cancels before handover
    pub async fn cancel(&self, actor: &Actor, booking_id: Uuid) -> Result<Booking, ServiceError> {
        authorize(actor, Resource::Booking, Action::Update)?;
        let booking = self.find(booking_id).await?;
        ensure_owner(actor, booking.renter_id, "booking")?;

        if !booking.status.is_cancellable() {
            return Err(ServiceError::CannotCancelInCurrentState(booking.status));
        }

        let cancelled = self
            .transition(
                booking_id,
                &[BookingStatus::PendingPayment, BookingStatus::Confirmed],
                BookingStatus::Cancelled,
                ServiceError::CannotCancelInCurrentState,
            )
            .await?;

        tracing::info!(booking_id = %booking_id, "Booking cancelled by renter");
        self.notify_status(&cancelled).await;
        Ok(cancelled)
    }

    /// Item owner hands the unit to the renter
    pub async fn confirm_handover(
        &self,
        actor: &Actor,
        booking_id: Uuid,
    ) -> Result<Booking, ServiceError> {
        self.owner_step(actor, booking_id, BookingStatus::Confirmed, BookingStatus::Active)
            .await
    }

    /// Item owner takes the unit back
    pub async fn confirm_return(
        &self,
        actor: &Actor,
        booking_id: Uuid,
    ) -> Result<Booking, ServiceError> {
        self.owner_step(actor, booking_id, BookingStatus::Active, BookingStatus::Completed)
            .await
    }

    /// Payment captured; called by the payment adapter.
    pub async fn confirm_payment(&self, booking_id: Uuid) -> Result<Booking, ServiceError> {
        let booking = self.find(booking_id).await?;
        if booking.status != BookingStatus::PendingPayment {
            return Err(ServiceError::NotInPendingPaymentState(booking.status));
        }

        let confirmed = self
            .transition(
                booking_id,
                &[BookingStatus::PendingPayment],
                BookingStatus::Confirmed,
                ServiceError::NotInPendingPaymentState,
            )
            .await?;

        tracing::info!(booking_id = %booking_id, "Booking confirmed after payment");
        self.notify_renter(&confirmed, |user, item| {
            templates::payment_confirmed(user, item, &confirmed)
        })
        .await;
        Ok(confirmed)
    }

    /// Payment failed; cancels from any live state and returns the unit.
    pub async fn fail_payment(&self, booking_id: Uuid) -> Result<Booking, ServiceError> {
        let to = BookingStatus::Cancelled;
        let booking = self.find(booking_id).await?;
        if booking.status.is_terminal() {
            return Err(ServiceError::InvalidTransition {
                from: booking.status,
                to,
            });
        }

        let cancelled = self
            .transition(
                booking_id,
                // Wider than `can_transition_to`: a reversed charge ends even
                // an active rental, which no user-driven edge allows.
                &[
                    BookingStatus::PendingPayment,
                    BookingStatus::Confirmed,
                    BookingStatus::Active,
                ],
                to,
                |from| ServiceError::InvalidTransition { from, to },
            )
            .await?;

        tracing::info!(booking_id = %booking_id, "Booking cancelled after failed payment");
        self.notify_status(&cancelled).await;
        Ok(cancelled)
    }

    /// Admin moves a booking along any legal edge
    pub async fn admin_update_status(
        &self,
        actor: &Actor,
        booking_id: Uuid,
        to: BookingStatus,
    ) -> Result<Booking, ServiceError> {
        authorize(actor, Resource::Booking, Action::Manage)?;

        let booking = self.find(booking_id).await?;
        if !booking.status.can_transition_to(to) {
            return Err(ServiceError::InvalidTransition {
                from: booking.status,
                to,
            });
        }

        let updated = self
            .transition(booking_id, &[booking.status], to, |from| {
                ServiceError::InvalidTransition { from, to }
            })
            .await?;

        tracing::info!(
            booking_id = %booking_id,
            admin_id = %actor.user_id,
            from = %booking.status,
            to = %to,
            "Booking status updated by admin"
        );
        self.notify_status(&updated).await;
        Ok(updated)
    }

    pub async fn get(&self, actor: &Actor, booking_id: Uuid) -> Result<Booking, ServiceError> {
        let booking = self.find(booking_id).await?;
        ensure_participant(actor, &booking)?;
        Ok(booking)
    }

    pub async fn list_mine(
        &self,
        actor: &Actor,
        page: PageRequest,
    ) -> Result<PaginatedResponse<Booking>, ServiceError> {
        let filter = BookingFilter {
            renter_id: Some(actor.user_id),
            ..Default::default()
        };
        self.list(&filter, page).await
    }

    /// Bookings on the caller's listings
    pub async fn list_owned(
        &self,
        actor: &Actor,
        page: PageRequest,
    ) -> Result<PaginatedResponse<Booking>, ServiceError> {
        authorize(actor, Resource::Booking, Action::Fulfil)?;
        let filter = BookingFilter {
            owner_id: Some(actor.user_id),
            ..Default::default()
        };
        self.list(&filter, page).await
    }

    pub async fn list_all(
        &self,
        actor: &Actor,
        status: Option<BookingStatus>,
        page: PageRequest,
    ) -> Result<PaginatedResponse<Booking>, ServiceError> {
        authorize(actor, Resource::Booking, Action::Manage)?;
        let filter = BookingFilter {
            status,
            ..Default::default()
        };
        self.list(&filter, page).await
    }

    async fn list(
        &self,
        filter: &BookingFilter,
        page: PageRequest,
    ) -> Result<PaginatedResponse<Booking>, ServiceError> {
        let (bookings, total) = self.store.list_bookings(filter, page).await?;
        Ok(PaginatedResponse::new(bookings, total, page))
    }

    async fn find(&self, booking_id: Uuid) -> Result<Booking, ServiceError> {
        self.store
            .find_booking(booking_id)
            .await?
            .ok_or(ServiceError::NotFound("booking"))
    }

    async fn owner_step(
        &self,
        actor: &Actor,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Booking, ServiceError> {
        authorize(actor, Resource::Booking, Action::Fulfil)?;

        let booking = self.find(booking_id).await?;
        ensure_owner(actor, booking.owner_id, "booking")?;
        if booking.status != from {
            return Err(ServiceError::InvalidTransition {
                from: booking.status,
                to,
            });
        }

        let updated = self
            .transition(booking_id, &[from], to, |current| {
                ServiceError::InvalidTransition { from: current, to }
            })
            .await?;

        tracing::info!(
            booking_id = %booking_id,
            owner_id = %actor.user_id,
            status = %to,
            "Booking advanced by owner"
        );
        self.notify_status(&updated).await;
        Ok(updated)
    }

    /// Compare-and-set; on a lost race the error is built from the status
    /// the booking actually holds now.
    async fn transition<F>(
        &self,
        booking_id: Uuid,
        from: &[BookingStatus],
        to: BookingStatus,
        on_conflict: F,
    ) -> Result<Booking, ServiceError>
    where
        F: FnOnce(BookingStatus) -> ServiceError,
    {
        match self
            .store
            .transition_booking(booking_id, from, to, to.releases_stock())
            .await?
        {
            Some(booking) => Ok(booking),
            None => {
                let current = self.find(booking_id).await?;
                tracing::debug!(
                    booking_id = %booking_id,
                    current = %current.status,
                    target = %to,
                    "Booking transition lost to a concurrent update"
                );
                Err(on_conflict(current.status))
            }
        }
    }

    async fn notify_status(&self, booking: &Booking) {
        let status = booking.status;
        self.notify_renter(booking, |user, item| {
            templates::booking_status_changed(user, item, status)
        })
        .await;
    }

    async fn notify_renter<F>(&self, booking: &Booking, build: F)
    where
        F: FnOnce(&User, &Item) -> EmailMessage,
    {
        let renter = self.store.find_user(booking.renter_id).await;
        let item = self.store.find_item(booking.item_id).await;
        match (renter, item) {
            (Ok(Some(renter)), Ok(Some(item))) => self.notifier.enqueue(build(&renter, &item)),
            _ => tracing::debug!(
                booking_id = %booking.id,
                "Skipping notification, renter or item could not be loaded"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{ApprovalStatus, ItemCondition};
    use crate::models::UserRole;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn fixed_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 1).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, d).unwrap()
    }

    async fn setup(stock: i32) -> (BookingService, SharedStore, Actor, Actor, Item) {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let owner = User::new("owner@example.com".into(), "x".into(), "Owner".into(), UserRole::Partner);
        let renter = User::new("renter@example.com".into(), "x".into(), "Renter".into(), UserRole::Customer);
        store.insert_user(&owner).await.unwrap();
        store.insert_user(&renter).await.unwrap();

        let now = Utc::now();
        let item = Item {
            id: Uuid::new_v4(),
            owner_id: owner.id,
            category_id: Uuid::new_v4(),
            name: "Elden Ring".into(),
            description: None,
            platform: Some("PS5".into()),
            condition: ItemCondition::Good,
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

        let service = BookingService::new(store.clone(), Notifier::disabled()).with_clock(fixed_today);
        (
            service,
            store,
            Actor::new(renter.id, renter.role),
            Actor::new(owner.id, owner.role),
            item,
        )
    }

    fn request(item_id: Uuid) -> CreateBookingRequest {
        CreateBookingRequest {
            item_id,
            start_date: date(10),
            end_date: date(12),
            notes: None,
        }
    }

    async fn available(store: &SharedStore, item_id: Uuid) -> i32 {
        store.find_item(item_id).await.unwrap().unwrap().available_stock
    }

    #[tokio::test]
    async fn test_create_prices_and_reserves() {
        let (service, store, renter, _, item) = setup(2).await;
        let booking = service.create(&renter, request(item.id)).await.unwrap();

        assert_eq!(booking.status, BookingStatus::PendingPayment);
        assert_eq!(booking.rental_days, 3);
        assert_eq!(booking.total_rent, 30_000);
        assert_eq!(booking.total_amount, 35_000);
        assert_eq!(available(&store, item.id).await, 1);
    }

    #[tokio::test]
    async fn test_invalid_dates_do_not_reserve() {
        let (service, store, renter, _, item) = setup(1).await;
        let mut req = request(item.id);
        req.end_date = date(9);

        let err = service.create(&renter, req).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidDateRange(_)));
        assert_eq!(available(&store, item.id).await, 1);
    }

    #[tokio::test]
    async fn test_unapproved_item_unavailable() {
        let (service, store, renter, _, mut item) = setup(1).await;
        item.approval_status = ApprovalStatus::Pending;
        item.is_active = false;
        store.update_item(&item).await.unwrap();

        let err = service.create(&renter, request(item.id)).await.unwrap_err();
        assert!(matches!(err, ServiceError::ItemUnavailable));
    }

    #[tokio::test]
    async fn test_cancel_releases_and_blocks_after_handover() {
        let (service, store, renter, owner, item) = setup(1).await;

        let first = service.create(&renter, request(item.id)).await.unwrap();
        service.cancel(&renter, first.id).await.unwrap();
        assert_eq!(available(&store, item.id).await, 1);

        let second = service.create(&renter, request(item.id)).await.unwrap();
        service.confirm_payment(second.id).await.unwrap();
        let active = service.confirm_handover(&owner, second.id).await.unwrap();
        assert!(active.handover_at.is_some());

        let err = service.cancel(&renter, second.id).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::CannotCancelInCurrentState(BookingStatus::Active)
        ));
    }

    #[tokio::test]
    async fn test_cancel_by_stranger_is_not_owned() {
        let (service, _, renter, owner, item) = setup(1).await;
        let booking = service.create(&renter, request(item.id)).await.unwrap();

        let err = service.cancel(&owner, booking.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotOwned(_)));
    }

    #[tokio::test]
    async fn test_return_completes_and_releases() {
        let (service, store, renter, owner, item) = setup(1).await;
        let booking = service.create(&renter, request(item.id)).await.unwrap();
        service.confirm_payment(booking.id).await.unwrap();
        service.confirm_handover(&owner, booking.id).await.unwrap();

        let done = service.confirm_return(&owner, booking.id).await.unwrap();
        assert_eq!(done.status, BookingStatus::Completed);
        assert!(done.return_at.is_some());
        assert_eq!(available(&store, item.id).await, 1);
    }

    #[tokio::test]
    async fn test_confirm_payment_twice() {
        let (service, _, renter, _, item) = setup(1).await;
        let booking = service.create(&renter, request(item.id)).await.unwrap();

        service.confirm_payment(booking.id).await.unwrap();
        let err = service.confirm_payment(booking.id).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::NotInPendingPaymentState(BookingStatus::Confirmed)
        ));
    }

    #[tokio::test]
    async fn test_fail_payment_restores_stock_once() {
        let (service, store, renter, _, item) = setup(1).await;
        let booking = service.create(&renter, request(item.id)).await.unwrap();
        assert_eq!(available(&store, item.id).await, 0);

        service.fail_payment(booking.id).await.unwrap();
        assert_eq!(available(&store, item.id).await, 1);

        let err = service.fail_payment(booking.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTransition { .. }));
        assert_eq!(available(&store, item.id).await, 1);
    }

    #[tokio::test]
    async fn test_admin_update_rejects_illegal_edge() {
        let (service, _, renter, _, item) = setup(1).await;
        let admin = Actor::new(Uuid::new_v4(), UserRole::Admin);
        let booking = service.create(&renter, request(item.id)).await.unwrap();

        let err = service
            .admin_update_status(&admin, booking.id, BookingStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTransition { .. }));

        let err = service
            .admin_update_status(&renter, booking.id, BookingStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientPermission));
    }

    #[tokio::test]
    async fn test_participants_can_read() {
        let (service, _, renter, owner, item) = setup(1).await;
        let booking = service.create(&renter, request(item.id)).await.unwrap();
        let stranger = Actor::new(Uuid::new_v4(), UserRole::Customer);

        assert!(service.get(&renter, booking.id).await.is_ok());
        assert!(service.get(&owner, booking.id).await.is_ok());
        assert!(matches!(
            service.get(&stranger, booking.id).await,
            Err(ServiceError::NotOwned(_))
        ));
    }

    #[tokio::test]
    async fn test_reversed_range_wins_over_field_errors() {
        let (service, store, renter, _, item) = setup(1).await;
        let mut req = request(item.id);
        req.end_date = date(9);
        req.notes = Some("x".repeat(1001));

        let err = service.create(&renter, req).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidDateRange(_)));
        assert_eq!(available(&store, item.id).await, 1);
    }

    #[tokio::test]
    async fn test_other_partner_cannot_fulfil() {
        let (service, store, renter, owner, item) = setup(1).await;
        let other_partner = Actor::new(Uuid::new_v4(), UserRole::Partner);
        let booking = service.create(&renter, request(item.id)).await.unwrap();
        service.confirm_payment(booking.id).await.unwrap();

        let err = service
            .confirm_handover(&other_partner, booking.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotOwned(_)));
        assert_eq!(available(&store, item.id).await, 0);

        service.confirm_handover(&owner, booking.id).await.unwrap();
        let err = service
            .confirm_return(&other_partner, booking.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotOwned(_)));
        assert_eq!(available(&store, item.id).await, 0);

        let stored = store.find_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Active);
    }

    #[tokio::test]
    async fn test_fail_payment_ends_active_rental() {
        let (service, store, renter, owner, item) = setup(1).await;
        let booking = service.create(&renter, request(item.id)).await.unwrap();
        service.confirm_payment(booking.id).await.unwrap();
        service.confirm_handover(&owner, booking.id).await.unwrap();
        assert!(!BookingStatus::Active.can_transition_to(BookingStatus::Cancelled));

        let cancelled = service.fail_payment(booking.id).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(available(&store, item.id).await, 1);
    }
}
