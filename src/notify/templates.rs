//! Transactional email bodies

use crate::booking::{Booking, BookingStatus};
use crate::inventory::Item;
use crate::models::User;
use crate::payment::Payment;

use super::EmailMessage;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Whole-unit rupiah with thousands separators
pub fn format_amount(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("Rp {}{}", sign, grouped)
}

pub fn welcome(user: &User) -> EmailMessage {
    let name = escape(&user.full_name);
    EmailMessage {
        to: user.email.clone(),
        subject: "Welcome to Game Rental".to_string(),
        text: format!("Welcome {}! Your account is now active.", user.full_name),
        html: format!(
            "<h1>Welcome {name}!</h1>\
             <p>Your account is active. Browse the catalog and make your first rental.</p>"
        ),
    }
}

pub fn booking_created(user: &User, item: &Item, booking: &Booking) -> EmailMessage {
    let platform = item.platform.as_deref().unwrap_or("Unknown");
    let total = format_amount(booking.total_amount);
    EmailMessage {
        to: user.email.clone(),
        subject: "Booking Confirmation - Game Rental".to_string(),
        text: format!(
            "Booking created for {} from {} to {} ({} days). Total: {}. Please complete the payment.",
            item.name, booking.start_date, booking.end_date, booking.rental_days, total
        ),
        html: format!(
            "<h1>Booking Confirmation</h1>\
             <p>Hi {},</p>\
             <p>Your booking has been created.</p>\
             <ul>\
             <li><strong>Game:</strong> {}</li>\
             <li><strong>Platform:</strong> {}</li>\
             <li><strong>Period:</strong> {} to {} ({} days)</li>\
             <li><strong>Rent:</strong> {}</li>\
             <li><strong>Deposit:</strong> {}</li>\
             <li><strong>Total:</strong> {}</li>\
             </ul>\
             <p><strong>Next:</strong> please complete the payment.</p>",
            escape(&user.full_name),
            escape(&item.name),
            escape(platform),
            booking.start_date,
            booking.end_date,
            booking.rental_days,
            format_amount(booking.total_rent),
            format_amount(booking.deposit),
            total,
        ),
    }
}

pub fn booking_status_changed(user: &User, item: &Item, status: BookingStatus) -> EmailMessage {
    let note = match status {
        BookingStatus::Active => "Your game has been handed over. Enjoy!",
        BookingStatus::Completed => "The rental is complete. Thank you!",
        BookingStatus::Cancelled => "The booking was cancelled and the unit released.",
        _ => "",
    };
    EmailMessage {
        to: user.email.clone(),
        subject: "Booking Status Updated - Game Rental".to_string(),
        text: format!("Booking status for {}: {}. {}", item.name, status, note),
        html: format!(
            "<h1>Status Updated</h1>\
             <p>Hi {},</p>\
             <p>Booking status: <strong>{}</strong></p>\
             <p>Game: {}</p>\
             <p>{}</p>",
            escape(&user.full_name),
            status,
            escape(&item.name),
            note
        ),
    }
}

pub fn payment_confirmed(user: &User, item: &Item, booking: &Booking) -> EmailMessage {
    let total = format_amount(booking.total_amount);
    EmailMessage {
        to: user.email.clone(),
        subject: "Payment Confirmed - Game Rental".to_string(),
        text: format!(
            "Payment of {} received. Your booking for {} is confirmed.",
            total, item.name
        ),
        html: format!(
            "<h1>Payment Confirmed</h1>\
             <p>Hi {},</p>\
             <p>We received your payment of <strong>{}</strong>.</p>\
             <p>Your booking for {} ({} to {}) is confirmed.</p>",
            escape(&user.full_name),
            total,
            escape(&item.name),
            booking.start_date,
            booking.end_date
        ),
    }
}

pub fn payment_instruction(
    user: &User,
    item: &Item,
    payment: &Payment,
    redirect_url: Option<&str>,
) -> EmailMessage {
    let reference = payment.provider_txn_id.as_deref().unwrap_or("N/A");
    let amount = format_amount(payment.amount);
    let link = redirect_url
        .map(|url| format!("<p><a href=\"{}\">Pay now</a></p>", escape(url)))
        .unwrap_or_default();
    EmailMessage {
        to: user.email.clone(),
        subject: "Payment Instruction - Game Rental".to_string(),
        text: format!(
            "Please complete payment of {} for {}. Reference: {}",
            amount, item.name, reference
        ),
        html: format!(
            "<h1>Complete Your Payment</h1>\
             <p>Hi {},</p>\
             <ul>\
             <li><strong>Reference:</strong> {}</li>\
             <li><strong>Amount:</strong> {}</li>\
             <li><strong>Game:</strong> {}</li>\
             </ul>\
             {}\
             <p>Complete within 24 hours.</p>",
            escape(&user.full_name),
            escape(reference),
            amount,
            escape(&item.name),
            link
        ),
    }
}
