//! Bookings: the rental lifecycle from reservation to return.

mod model;
mod service;

pub use model::{
    validate_dates, Booking, BookingFilter, BookingListQuery, BookingStatus,
    CreateBookingRequest, Pricing, UpdateBookingStatusRequest,
};
pub use service::{ensure_participant, BookingService};
