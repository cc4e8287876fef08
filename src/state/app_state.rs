//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::AuthService;
use crate::booking::BookingService;
use crate::inventory::CatalogService;
use crate::moderation::ModerationService;
use crate::notify::Notifier;
use crate::payment::{PaymentGateway, PaymentService};
use crate::store::SharedStore;
use crate::users::UserService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub catalog_service: Arc<CatalogService>,
    pub booking_service: Arc<BookingService>,
    pub payment_service: Arc<PaymentService>,
    pub moderation_service: Arc<ModerationService>,
}

impl AppState {
    /// Wire every service over one store, gateway and notifier.
    pub fn new(
        store: SharedStore,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Notifier,
        jwt_secret: String,
        access_token_ttl_seconds: i64,
    ) -> Self {
        let booking_service = Arc::new(BookingService::new(store.clone(), notifier.clone()));
        Self::with_bookings(
            store,
            gateway,
            notifier,
            jwt_secret,
            access_token_ttl_seconds,
            booking_service,
        )
    }

    /// Same as [`AppState::new`] with a preconfigured booking service.
    pub fn with_bookings(
        store: SharedStore,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Notifier,
        jwt_secret: String,
        access_token_ttl_seconds: i64,
        booking_service: Arc<BookingService>,
    ) -> Self {
        let auth_service = Arc::new(AuthService::new(
            store.clone(),
            notifier.clone(),
            jwt_secret,
            access_token_ttl_seconds,
        ));
        let payment_service = Arc::new(PaymentService::new(
            store.clone(),
            gateway,
            booking_service.clone(),
            notifier,
        ));

        Self {
            auth_service,
            user_service: Arc::new(UserService::new(store.clone())),
            catalog_service: Arc::new(CatalogService::new(store.clone())),
            booking_service,
            payment_service,
            moderation_service: Arc::new(ModerationService::new(store.clone())),
            store,
        }
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<BookingService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.booking_service.clone()
    }
}

impl FromRef<AppState> for Arc<PaymentService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.payment_service.clone()
    }
}
