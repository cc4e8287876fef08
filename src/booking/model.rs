//! Booking records, lifecycle states and pricing arithmetic

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::ServiceError;

/// Booking lifecycle status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    PendingPayment,
    Confirmed,
    Active,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::PendingPayment => "pending_payment",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Active => "active",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Edges of the lifecycle graph.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (PendingPayment, Confirmed)
                | (PendingPayment, Cancelled)
                | (Confirmed, Active)
                | (Confirmed, Cancelled)
                | (Active, Completed)
        )
    }

    pub fn is_cancellable(self) -> bool {
        self.can_transition_to(BookingStatus::Cancelled)
    }

    /// Entering this state hands the reserved unit back to the item.
    pub fn releases_stock(self) -> bool {
        self.is_terminal()
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Booking model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Booking {
    pub id: Uuid,
    pub renter_id: Uuid,
    pub item_id: Uuid,
    pub owner_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rental_days: i32,
    pub daily_price: i64,
    pub total_rent: i64,
    pub deposit: i64,
    pub total_amount: i64,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub handover_at: Option<DateTime<Utc>>,
    pub return_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        renter_id: Uuid,
        item_id: Uuid,
        owner_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        pricing: Pricing,
        notes: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            renter_id,
            item_id,
            owner_id,
            start_date,
            end_date,
            rental_days: pricing.rental_days,
            daily_price: pricing.daily_price,
            total_rent: pricing.total_rent,
            deposit: pricing.deposit,
            total_amount: pricing.total_amount,
            status: BookingStatus::PendingPayment,
            notes,
            handover_at: None,
            return_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Gateway order reference for this booking
    pub fn order_id(&self) -> String {
        format!("booking-{}", self.id)
    }
}

/// Check the requested rental window against `today`.
pub fn validate_dates(
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> Result<(), ServiceError> {
    if end < start {
        return Err(ServiceError::InvalidDateRange(format!(
            "end date {} is before start date {}",
            end, start
        )));
    }
    if start < today {
        return Err(ServiceError::InvalidDateRange(format!(
            "start date {} is in the past",
            start
        )));
    }
    Ok(())
}

/// Prices frozen onto a booking when it is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pricing {
    pub rental_days: i32,
    pub daily_price: i64,
    pub total_rent: i64,
    pub deposit: i64,
    pub total_amount: i64,
}

impl Pricing {
    /// Inclusive day count times the daily price, plus the deposit.
    pub fn compute(
        start: NaiveDate,
        end: NaiveDate,
        price_per_day: i64,
        deposit: i64,
    ) -> Result<Self, ServiceError> {
        let days = (end - start).num_days() + 1;
        if days < 1 {
            return Err(ServiceError::InvalidDateRange(
                "rental must cover at least one day".to_string(),
            ));
        }
        let rental_days = i32::try_from(days)
            .map_err(|_| ServiceError::InvalidDateRange("rental period too long".to_string()))?;

        let overflow = || ServiceError::Validation("booking amount out of range".to_string());
        let total_rent = price_per_day.checked_mul(days).ok_or_else(overflow)?;
        let total_amount = total_rent.checked_add(deposit).ok_or_else(overflow)?;

        Ok(Self {
            rental_days,
            daily_price: price_per_day,
            total_rent,
            deposit,
            total_amount,
        })
    }
}

/// Booking creation request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub item_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Admin override of a booking's status
#[derive(Debug, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

/// Booking list filter
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub renter_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
}

/// Query string for admin booking listings
#[derive(Debug, Default, Deserialize)]
pub struct BookingListQuery {
    pub status: Option<BookingStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_lifecycle_edges() {
        use BookingStatus::*;
        assert!(PendingPayment.can_transition_to(Confirmed));
        assert!(PendingPayment.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Active));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(Active.can_transition_to(Completed));

        assert!(!Active.can_transition_to(Cancelled));
        assert!(!PendingPayment.can_transition_to(Active));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(PendingPayment));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        use BookingStatus::*;
        for terminal in [Completed, Cancelled] {
            assert!(terminal.is_terminal());
            for next in [PendingPayment, Confirmed, Active, Completed, Cancelled] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_pricing_three_day_rental() {
        let pricing = Pricing::compute(date(2025, 11, 10), date(2025, 11, 12), 10_000, 5_000).unwrap();
        assert_eq!(pricing.rental_days, 3);
        assert_eq!(pricing.total_rent, 30_000);
        assert_eq!(pricing.total_amount, 35_000);
    }

    #[test]
    fn test_single_day_rental() {
        let pricing = Pricing::compute(date(2025, 11, 10), date(2025, 11, 10), 7_500, 0).unwrap();
        assert_eq!(pricing.rental_days, 1);
        assert_eq!(pricing.total_amount, 7_500);
    }

    #[test]
    fn test_pricing_overflow_is_rejected() {
        let result = Pricing::compute(date(2025, 1, 1), date(2025, 1, 3), i64::MAX, 0);
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn test_end_before_start_rejected() {
        let today = date(2025, 11, 1);
        let result = validate_dates(date(2025, 11, 12), date(2025, 11, 10), today);
        assert!(matches!(result, Err(ServiceError::InvalidDateRange(_))));
    }

    #[test]
    fn test_start_in_past_rejected() {
        let today = date(2025, 11, 11);
        let result = validate_dates(date(2025, 11, 10), date(2025, 11, 12), today);
        assert!(matches!(result, Err(ServiceError::InvalidDateRange(_))));
        assert!(validate_dates(today, today, today).is_ok());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&BookingStatus::PendingPayment).unwrap();
        assert_eq!(json, "\"pending_payment\"");
    }
}
