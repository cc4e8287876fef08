//! Booking lifecycle and stock accounting across services

mod common;

use std::sync::Arc;

use common::World;
use game_rental_server::booking::BookingStatus;
use game_rental_server::error::ServiceError;
use game_rental_server::payment::{
    CreatePaymentRequest, MockGateway, OutcomeDisposition, PaymentOutcome, PaymentStatus,
};

fn paid(txn: &str) -> PaymentOutcome {
    PaymentOutcome {
        provider_txn_id: txn.to_string(),
        status: PaymentStatus::Paid,
        method: Some("bank_transfer".to_string()),
        failure_reason: None,
    }
}

#[tokio::test]
async fn test_concurrent_bookings_for_last_unit() {
    let world = Arc::new(World::new(1).await);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let world = world.clone();
        handles.push(tokio::spawn(async move {
            world
                .bookings
                .create(&world.renter_actor(), world.booking_request())
                .await
        }));
    }

    let mut created = 0;
    let mut out_of_stock = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(ServiceError::StockInsufficient) => out_of_stock += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(out_of_stock, 7);
    assert_eq!(world.available_stock().await, 0);
}

#[tokio::test]
async fn test_full_rental_returns_stock() {
    let world = World::new(2).await;
    let renter = world.renter_actor();
    let owner = world.owner_actor();

    let booking = world
        .bookings
        .create(&renter, world.booking_request())
        .await
        .unwrap();
    assert_eq!(world.available_stock().await, 1);

    let checkout = world
        .payments
        .create_payment(&renter, booking.id, CreatePaymentRequest::default())
        .await
        .unwrap();
    assert_eq!(checkout.payment.amount, booking.total_amount);
    assert_eq!(world.gateway.charges().len(), 1);

    let txn = MockGateway::transaction_id_for(&booking.order_id());
    let disposition = world.payments.process_outcome(paid(&txn)).await.unwrap();
    assert_eq!(disposition, OutcomeDisposition::Applied);

    let active = world
        .bookings
        .confirm_handover(&owner, booking.id)
        .await
        .unwrap();
    assert_eq!(active.status, BookingStatus::Active);
    assert!(active.handover_at.is_some());
    assert_eq!(world.available_stock().await, 1);

    let done = world
        .bookings
        .confirm_return(&owner, booking.id)
        .await
        .unwrap();
    assert_eq!(done.status, BookingStatus::Completed);
    assert_eq!(world.available_stock().await, 2);

    // Terminal: nothing moves it again.
    assert!(world.bookings.cancel(&renter, booking.id).await.is_err());
    assert_eq!(world.available_stock().await, 2);
}

#[tokio::test]
async fn test_cancel_confirmed_booking_releases_once() {
    let world = World::new(1).await;
    let renter = world.renter_actor();

    let booking = world
        .bookings
        .create(&renter, world.booking_request())
        .await
        .unwrap();
    world.bookings.confirm_payment(booking.id).await.unwrap();
    assert_eq!(world.available_stock().await, 0);

    let cancelled = world.bookings.cancel(&renter, booking.id).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(world.available_stock().await, 1);

    let err = world.bookings.cancel(&renter, booking.id).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::CannotCancelInCurrentState(BookingStatus::Cancelled)
    ));
    assert_eq!(world.available_stock().await, 1);
}

#[tokio::test]
async fn test_handover_requires_confirmed_booking() {
    let world = World::new(1).await;
    let booking = world
        .bookings
        .create(&world.renter_actor(), world.booking_request())
        .await
        .unwrap();

    let err = world
        .bookings
        .confirm_handover(&world.owner_actor(), booking.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition { .. }));

    // Renters cannot confirm fulfilment steps.
    world.bookings.confirm_payment(booking.id).await.unwrap();
    assert!(world
        .bookings
        .confirm_handover(&world.renter_actor(), booking.id)
        .await
        .is_err());
}

#[tokio::test]
async fn test_admin_override_releases_stock() {
    let world = World::new(1).await;
    let booking = world
        .bookings
        .create(&world.renter_actor(), world.booking_request())
        .await
        .unwrap();

    let updated = world
        .bookings
        .admin_update_status(&world.admin_actor(), booking.id, BookingStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(updated.status, BookingStatus::Cancelled);
    assert_eq!(world.available_stock().await, 1);
}
