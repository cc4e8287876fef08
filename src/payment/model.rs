//! Payment records and normalized gateway outcomes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ServiceError;

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "payment_provider", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentProvider {
    Midtrans,
    Mock,
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    /// Map a gateway transaction status onto ours.
    pub fn from_provider(status: &str) -> Option<Self> {
        match status.to_ascii_lowercase().as_str() {
            "capture" | "settlement" => Some(PaymentStatus::Paid),
            "pending" | "authorize" => Some(PaymentStatus::Pending),
            "deny" | "expire" | "cancel" | "failure" => Some(PaymentStatus::Failed),
            "refund" | "partial_refund" | "chargeback" | "partial_chargeback" => {
                Some(PaymentStatus::Refunded)
            }
            _ => None,
        }
    }
}

/// Payment model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub provider: PaymentProvider,
    pub provider_txn_id: Option<String>,
    pub amount: i64,
    pub status: PaymentStatus,
    pub method: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(booking_id: Uuid, provider: PaymentProvider, amount: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            provider,
            provider_txn_id: None,
            amount,
            status: PaymentStatus::Pending,
            method: None,
            paid_at: None,
            failed_at: None,
            failure_reason: None,
            created_at: Utc::now(),
        }
    }
}

/// Terminal update applied to a payment row
#[derive(Debug, Clone)]
pub enum Settlement {
    Paid { method: Option<String> },
    Failed { reason: String },
    Refunded,
}

impl Settlement {
    pub fn status(&self) -> PaymentStatus {
        match self {
            Settlement::Paid { .. } => PaymentStatus::Paid,
            Settlement::Failed { .. } => PaymentStatus::Failed,
            Settlement::Refunded => PaymentStatus::Refunded,
        }
    }

    /// Stamp this settlement onto an in-memory payment.
    pub fn apply(&self, payment: &mut Payment, at: DateTime<Utc>) {
        payment.status = self.status();
        match self {
            Settlement::Paid { method } => {
                payment.method = method.clone().or(payment.method.take());
                payment.paid_at = Some(at);
            }
            Settlement::Failed { reason } => {
                payment.failure_reason = Some(reason.clone());
                payment.failed_at = Some(at);
            }
            Settlement::Refunded => {}
        }
    }
}

/// Gateway-independent view of a webhook notification
#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    pub provider_txn_id: String,
    pub status: PaymentStatus,
    pub method: Option<String>,
    pub failure_reason: Option<String>,
}

/// Midtrans-style HTTP notification body
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayNotification {
    pub order_id: String,
    pub transaction_id: String,
    pub transaction_status: String,
    pub status_code: String,
    pub gross_amount: String,
    pub signature_key: Option<String>,
    pub payment_type: Option<String>,
    pub status_message: Option<String>,
    pub fraud_status: Option<String>,
}

impl GatewayNotification {
    pub fn into_outcome(self) -> Result<PaymentOutcome, ServiceError> {
        let mut status = PaymentStatus::from_provider(&self.transaction_status).ok_or_else(|| {
            ServiceError::Validation(format!(
                "unknown transaction status '{}'",
                self.transaction_status
            ))
        })?;

        // A captured card charge is only final once fraud screening accepts it.
        if self.transaction_status.eq_ignore_ascii_case("capture") {
            match self.fraud_status.as_deref() {
                Some("challenge") => status = PaymentStatus::Pending,
                Some("deny") => status = PaymentStatus::Failed,
                _ => {}
            }
        }

        let failure_reason = (status == PaymentStatus::Failed).then(|| {
            self.status_message
                .clone()
                .unwrap_or_else(|| format!("transaction {}", self.transaction_status))
        });

        Ok(PaymentOutcome {
            provider_txn_id: self.transaction_id,
            status,
            method: self.payment_type,
            failure_reason,
        })
    }
}

/// What the adapter did with an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeDisposition {
    Applied,
    Unchanged,
    AlreadyProcessed,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreatePaymentRequest {
    pub payment_type: Option<String>,
}

/// Payment plus where to send the renter to pay
#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentCheckout {
    pub payment: Payment,
    pub redirect_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentListQuery {
    pub status: Option<PaymentStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}
