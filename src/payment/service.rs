//! Payment service
//!
//! Opens gateway charges for bookings and applies gateway outcomes. Outcome
//! processing is idempotent: the payment row moves out of `pending` with a
//! conditional write, and only the caller that wins that write drives the
//! booking transition. A redelivered outcome for a payment that already
//! settled re-drives the booking transition, so a booking write that failed
//! is finished by the gateway's retry.

use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{authorize, ensure_owner, Action, Actor, Resource};
use crate::booking::{ensure_participant, BookingService, BookingStatus};
use crate::error::ServiceError;
use crate::models::{PageRequest, PaginatedResponse};
use crate::notify::{templates, Notifier};
use crate::store::{BookingStore, ItemStore, PaymentStore, SharedStore, UserStore};

use super::gateway::{validate_payment_type, ChargeRequest, PaymentGateway, DEFAULT_PAYMENT_TYPE};
use super::model::{
    CreatePaymentRequest, GatewayNotification, OutcomeDisposition, Payment, PaymentCheckout,
    PaymentOutcome, PaymentStatus, Settlement,
};

/// Payment service
#[derive(Clone)]
pub struct PaymentService {
    store: SharedStore,
    gateway: Arc<dyn PaymentGateway>,
    bookings: Arc<BookingService>,
    notifier: Notifier,
}

impl PaymentService {
    pub fn new(
        store: SharedStore,
        gateway: Arc<dyn PaymentGateway>,
        bookings: Arc<BookingService>,
        notifier: Notifier,
    ) -> Self {
        Self {
            store,
            gateway,
            bookings,
            notifier,
        }
    }

    /// Start paying for a booking
    pub async fn create_payment(
        &self,
        actor: &Actor,
        booking_id: Uuid,
        request: CreatePaymentRequest,
    ) -> Result<PaymentCheckout, ServiceError> {
        authorize(actor, Resource::Payment, Action::Create)?;

        let booking = self
            .store
            .find_booking(booking_id)
            .await?
            .ok_or(ServiceError::NotFound("booking"))?;
        ensure_owner(actor, booking.renter_id, "booking")?;
        if booking.status != BookingStatus::PendingPayment {
            return Err(ServiceError::NotInPendingPaymentState(booking.status));
        }

        let payment_type = request
            .payment_type
            .unwrap_or_else(|| DEFAULT_PAYMENT_TYPE.to_string());
        validate_payment_type(&payment_type)?;

        let mut payment = Payment::new(booking.id, self.gateway.provider(), booking.total_amount);
        self.store.insert_payment(&payment).await?;

        let charge_request = ChargeRequest {
            order_id: booking.order_id(),
            gross_amount: booking.total_amount,
            payment_type,
        };
        let charge = match self.gateway.create_charge(&charge_request).await {
            Ok(charge) => charge,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    booking_id = %booking.id,
                    payment_id = %payment.id,
                    "Gateway charge failed"
                );
                // Free the booking for another attempt.
                let reason = Settlement::Failed {
                    reason: e.to_string(),
                };
                if let Err(mark_err) = self
                    .store
                    .settle_payment(payment.id, PaymentStatus::Pending, reason)
                    .await
                {
                    tracing::error!(
                        error = %mark_err,
                        payment_id = %payment.id,
                        "Failed to mark payment failed"
                    );
                }
                return Err(e.into());
            }
        };

        self.store
            .set_provider_txn(payment.id, &charge.transaction_id)
            .await?;
        payment.provider_txn_id = Some(charge.transaction_id);

        tracing::info!(
            payment_id = %payment.id,
            booking_id = %booking.id,
            provider_txn_id = ?payment.provider_txn_id,
            amount = payment.amount,
            "Payment created"
        );

        let renter = self.store.find_user(booking.renter_id).await;
        let item = self.store.find_item(booking.item_id).await;
        if let (Ok(Some(renter)), Ok(Some(item))) = (renter, item) {
            self.notifier.enqueue(templates::payment_instruction(
                &renter,
                &item,
                &payment,
                charge.redirect_url.as_deref(),
            ));
        }

        Ok(PaymentCheckout {
            payment,
            redirect_url: charge.redirect_url,
        })
    }

    /// Latest payment for a booking; renter, owner or admin
    pub async fn get_for_booking(
        &self,
        actor: &Actor,
        booking_id: Uuid,
    ) -> Result<Payment, ServiceError> {
        authorize(actor, Resource::Payment, Action::Read)?;

        let booking = self
            .store
            .find_booking(booking_id)
            .await?
            .ok_or(ServiceError::NotFound("booking"))?;
        ensure_participant(actor, &booking)?;

        self.store
            .find_payment_for_booking(booking_id)
            .await?
            .ok_or(ServiceError::NotFound("payment"))
    }

    pub async fn get(&self, actor: &Actor, payment_id: Uuid) -> Result<Payment, ServiceError> {
        authorize(actor, Resource::Payment, Action::Manage)?;
        self.store
            .find_payment(payment_id)
            .await?
            .ok_or(ServiceError::NotFound("payment"))
    }

    pub async fn list(
        &self,
        actor: &Actor,
        status: Option<PaymentStatus>,
        page: PageRequest,
    ) -> Result<PaginatedResponse<Payment>, ServiceError> {
        authorize(actor, Resource::Payment, Action::Manage)?;
        let (payments, total) = self.store.list_payments(status, page).await?;
        Ok(PaginatedResponse::new(payments, total, page))
    }

    /// Signature check for an inbound notification.
    pub fn verify_notification(&self, notification: &GatewayNotification) -> bool {
        match notification.signature_key.as_deref() {
            Some(signature) => self.gateway.verify_notification(
                &notification.order_id,
                &notification.status_code,
                &notification.gross_amount,
                signature,
            ),
            None => false,
        }
    }

    /// Apply a normalized gateway outcome.
    pub async fn process_outcome(
        &self,
        outcome: PaymentOutcome,
    ) -> Result<OutcomeDisposition, ServiceError> {
        let payment = self
            .store
            .find_payment_by_txn(&outcome.provider_txn_id)
            .await?
            .ok_or_else(|| ServiceError::PaymentNotFound(outcome.provider_txn_id.clone()))?;

        tracing::info!(
            payment_id = %payment.id,
            booking_id = %payment.booking_id,
            current = payment.status.as_str(),
            outcome = outcome.status.as_str(),
            "Processing payment outcome"
        );

        match outcome.status {
            PaymentStatus::Pending => Ok(OutcomeDisposition::Unchanged),
            PaymentStatus::Paid => match payment.status {
                PaymentStatus::Pending => {
                    let settlement = Settlement::Paid {
                        method: outcome.method,
                    };
                    match self
                        .store
                        .settle_payment(payment.id, PaymentStatus::Pending, settlement)
                        .await?
                    {
                        Some(settled) => self.confirm_booking(&settled, true).await,
                        None => Ok(OutcomeDisposition::AlreadyProcessed),
                    }
                }
                // Settled earlier; the booking write may not have landed.
                PaymentStatus::Paid => self.confirm_booking(&payment, false).await,
                _ => Ok(OutcomeDisposition::AlreadyProcessed),
            },
            PaymentStatus::Failed => match payment.status {
                PaymentStatus::Pending => {
                    let settlement = Settlement::Failed {
                        reason: outcome
                            .failure_reason
                            .unwrap_or_else(|| "payment failed".to_string()),
                    };
                    match self
                        .store
                        .settle_payment(payment.id, PaymentStatus::Pending, settlement)
                        .await?
                    {
                        Some(settled) => self.cancel_booking(&settled, true).await,
                        None => Ok(OutcomeDisposition::AlreadyProcessed),
                    }
                }
                PaymentStatus::Failed => self.cancel_booking(&payment, false).await,
                _ => Ok(OutcomeDisposition::AlreadyProcessed),
            },
            PaymentStatus::Refunded => match payment.status {
                PaymentStatus::Refunded => Ok(OutcomeDisposition::AlreadyProcessed),
                PaymentStatus::Paid => {
                    let refunded = self
                        .store
                        .settle_payment(payment.id, PaymentStatus::Paid, Settlement::Refunded)
                        .await?;
                    Ok(match refunded {
                        Some(_) => {
                            tracing::info!(payment_id = %payment.id, "Payment refunded");
                            OutcomeDisposition::Applied
                        }
                        None => OutcomeDisposition::AlreadyProcessed,
                    })
                }
                _ => {
                    tracing::warn!(
                        payment_id = %payment.id,
                        current = payment.status.as_str(),
                        "Refund reported for a payment that was never paid"
                    );
                    Ok(OutcomeDisposition::Unchanged)
                }
            },
        }
    }

    /// Moves the booking of a paid payment to `confirmed`. `fresh` is set
    /// when this call settled the payment; otherwise it is a re-drive of an
    /// earlier delivery and reports `Applied` only if it moved the booking.
    async fn confirm_booking(
        &self,
        payment: &Payment,
        fresh: bool,
    ) -> Result<OutcomeDisposition, ServiceError> {
        match self.bookings.confirm_payment(payment.booking_id).await {
            Ok(_) => {
                if !fresh {
                    tracing::warn!(
                        payment_id = %payment.id,
                        booking_id = %payment.booking_id,
                        "Booking confirmation completed on redelivery"
                    );
                }
                Ok(OutcomeDisposition::Applied)
            }
            Err(ServiceError::NotInPendingPaymentState(BookingStatus::Confirmed)) => {
                Ok(OutcomeDisposition::AlreadyProcessed)
            }
            Err(ServiceError::NotInPendingPaymentState(status)) if fresh => {
                tracing::warn!(
                    payment_id = %payment.id,
                    booking_id = %payment.booking_id,
                    booking_status = %status,
                    "Payment captured for a booking no longer awaiting payment; refund required"
                );
                Ok(OutcomeDisposition::Applied)
            }
            Err(ServiceError::NotInPendingPaymentState(_)) => {
                Ok(OutcomeDisposition::AlreadyProcessed)
            }
            Err(e) => Err(e),
        }
    }

    /// Cancels the booking of a failed payment and returns its unit.
    async fn cancel_booking(
        &self,
        payment: &Payment,
        fresh: bool,
    ) -> Result<OutcomeDisposition, ServiceError> {
        if !fresh {
            // A newer attempt owns the booking now.
            let latest = self.store.find_payment_for_booking(payment.booking_id).await?;
            if latest.map(|p| p.id) != Some(payment.id) {
                return Ok(OutcomeDisposition::AlreadyProcessed);
            }
        }

        match self.bookings.fail_payment(payment.booking_id).await {
            Ok(_) => {
                if !fresh {
                    tracing::warn!(
                        payment_id = %payment.id,
                        booking_id = %payment.booking_id,
                        "Booking cancellation completed on redelivery"
                    );
                }
                Ok(OutcomeDisposition::Applied)
            }
            Err(ServiceError::InvalidTransition { from, .. }) if fresh => {
                tracing::warn!(
                    payment_id = %payment.id,
                    booking_id = %payment.booking_id,
                    booking_status = %from,
                    "Payment failed for a booking that already finished"
                );
                Ok(OutcomeDisposition::Applied)
            }
            Err(ServiceError::InvalidTransition { .. }) => Ok(OutcomeDisposition::AlreadyProcessed),
            Err(e) => Err(e),
        }
    }
}
