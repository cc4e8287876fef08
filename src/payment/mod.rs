//! Payments: gateway charges and webhook outcome processing.

mod gateway;
mod model;
mod service;

pub use gateway::{
    notification_signature, validate_payment_type, Charge, ChargeRequest, GatewayError,
    MidtransGateway, MockGateway, PaymentGateway, DEFAULT_PAYMENT_TYPE, VALID_PAYMENT_TYPES,
};
pub use model::{
    CreatePaymentRequest, GatewayNotification, OutcomeDisposition, Payment, PaymentCheckout,
    PaymentListQuery, PaymentOutcome, PaymentProvider, PaymentStatus, Settlement,
};
pub use service::PaymentService;
