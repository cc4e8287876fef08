//! Payment gateway clients

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha512};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

use super::model::PaymentProvider;
use crate::error::ServiceError;

pub const VALID_PAYMENT_TYPES: [&str; 6] = [
    "credit_card",
    "bank_transfer",
    "echannel",
    "gopay",
    "shopeepay",
    "qris",
];

pub const DEFAULT_PAYMENT_TYPE: &str = "bank_transfer";

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("payment gateway is not configured")]
    NotConfigured,

    #[error("invalid payment type: {0}")]
    InvalidPaymentType(String),

    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gateway rejected charge ({status_code}): {message}")]
    Rejected { status_code: String, message: String },
}

impl From<GatewayError> for ServiceError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidPaymentType(_) => ServiceError::Validation(err.to_string()),
            other => ServiceError::Gateway(other.to_string()),
        }
    }
}

/// Charge to open at the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    pub order_id: String,
    pub gross_amount: i64,
    pub payment_type: String,
}

/// Gateway's answer to a charge
#[derive(Debug, Clone)]
pub struct Charge {
    pub transaction_id: String,
    pub redirect_url: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn provider(&self) -> PaymentProvider;

    async fn create_charge(&self, request: &ChargeRequest) -> Result<Charge, GatewayError>;

    /// Check a notification signature before trusting its contents.
    fn verify_notification(
        &self,
        order_id: &str,
        status_code: &str,
        gross_amount: &str,
        signature_key: &str,
    ) -> bool;
}

pub fn validate_payment_type(payment_type: &str) -> Result<(), GatewayError> {
    if VALID_PAYMENT_TYPES.contains(&payment_type) {
        Ok(())
    } else {
        Err(GatewayError::InvalidPaymentType(payment_type.to_string()))
    }
}

/// Hex SHA-512 over `order_id + status_code + gross_amount + server_key`.
pub fn notification_signature(
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    server_key: &str,
) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Deserialize)]
struct MidtransAction {
    name: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MidtransChargeResponse {
    status_code: Option<String>,
    status_message: Option<String>,
    transaction_id: Option<String>,
    transaction_status: Option<String>,
    redirect_url: Option<String>,
    #[serde(default)]
    actions: Vec<MidtransAction>,
}

/// Midtrans Core API client
pub struct MidtransGateway {
    client: reqwest::Client,
    base_url: String,
    server_key: String,
}

impl MidtransGateway {
    pub fn new(base_url: String, server_key: String) -> Result<Self, GatewayError> {
        if server_key.is_empty() {
            return Err(GatewayError::NotConfigured);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            server_key,
        })
    }

    fn auth_header(&self) -> String {
        format!("Basic {}", STANDARD.encode(format!("{}:", self.server_key)))
    }
}

#[async_trait]
impl PaymentGateway for MidtransGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Midtrans
    }

    async fn create_charge(&self, request: &ChargeRequest) -> Result<Charge, GatewayError> {
        validate_payment_type(&request.payment_type)?;

        let body = json!({
            "payment_type": request.payment_type,
            "transaction_details": {
                "order_id": request.order_id,
                "gross_amount": request.gross_amount,
            },
        });

        let response: MidtransChargeResponse = self
            .client
            .post(format!("{}/v2/charge", self.base_url))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        let status_code = response.status_code.unwrap_or_default();
        let transaction_id = match response.transaction_id {
            Some(id) if status_code.starts_with('2') => id,
            _ => {
                tracing::error!(
                    order_id = %request.order_id,
                    status_code = %status_code,
                    "Midtrans charge failed"
                );
                return Err(GatewayError::Rejected {
                    status_code,
                    message: response.status_message.unwrap_or_default(),
                });
            }
        };

        tracing::info!(
            order_id = %request.order_id,
            transaction_id = %transaction_id,
            transaction_status = ?response.transaction_status,
            "Midtrans charge created"
        );

        let redirect_url = response.redirect_url.or_else(|| {
            response
                .actions
                .into_iter()
                .find(|a| {
                    matches!(
                        a.name.as_deref(),
                        Some("deeplink-redirect") | Some("generate-qr-code")
                    )
                })
                .and_then(|a| a.url)
        });

        Ok(Charge {
            transaction_id,
            redirect_url,
        })
    }

    fn verify_notification(
        &self,
        order_id: &str,
        status_code: &str,
        gross_amount: &str,
        signature_key: &str,
    ) -> bool {
        let expected = notification_signature(order_id, status_code, gross_amount, &self.server_key);
        expected.eq_ignore_ascii_case(signature_key)
    }
}

/// Gateway for local runs and tests; records charges, trusts every signature
#[derive(Default)]
pub struct MockGateway {
    charges: Mutex<Vec<ChargeRequest>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn charges(&self) -> Vec<ChargeRequest> {
        self.charges
            .lock()
            .map(|charges| charges.clone())
            .unwrap_or_default()
    }

    pub fn transaction_id_for(order_id: &str) -> String {
        format!("mock-tx-{}", order_id)
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Mock
    }

    async fn create_charge(&self, request: &ChargeRequest) -> Result<Charge, GatewayError> {
        validate_payment_type(&request.payment_type)?;
        if let Ok(mut charges) = self.charges.lock() {
            charges.push(request.clone());
        }
        Ok(Charge {
            transaction_id: Self::transaction_id_for(&request.order_id),
            redirect_url: Some(format!("https://pay.mock.local/{}", request.order_id)),
        })
    }

    fn verify_notification(&self, _: &str, _: &str, _: &str, _: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_matches_known_construction() {
        let sig = notification_signature("booking-1", "200", "35000.00", "server-key");
        assert_eq!(sig.len(), 128);

        let mut hasher = Sha512::new();
        hasher.update(b"booking-120035000.00server-key");
        assert_eq!(sig, hex::encode(hasher.finalize()));
    }

    #[test]
    fn test_midtrans_verifies_case_insensitively() {
        let gateway =
            MidtransGateway::new("https://api.sandbox.midtrans.com".into(), "server-key".into())
                .unwrap();
        let sig = notification_signature("booking-1", "200", "35000.00", "server-key");

        assert!(gateway.verify_notification("booking-1", "200", "35000.00", &sig));
        assert!(gateway.verify_notification(
            "booking-1",
            "200",
            "35000.00",
            &sig.to_uppercase()
        ));
        assert!(!gateway.verify_notification("booking-1", "200", "99999.00", &sig));
    }

    #[test]
    fn test_midtrans_requires_server_key() {
        assert!(matches!(
            MidtransGateway::new("https://x".into(), String::new()),
            Err(GatewayError::NotConfigured)
        ));
    }

    #[test]
    fn test_payment_type_whitelist() {
        assert!(validate_payment_type("qris").is_ok());
        assert!(validate_payment_type("bitcoin").is_err());
    }

    #[tokio::test]
    async fn test_mock_records_charges() {
        let gateway = MockGateway::new();
        let charge = gateway
            .create_charge(&ChargeRequest {
                order_id: "booking-42".into(),
                gross_amount: 35_000,
                payment_type: DEFAULT_PAYMENT_TYPE.into(),
            })
            .await
            .unwrap();

        assert_eq!(charge.transaction_id, "mock-tx-booking-42");
        assert_eq!(gateway.charges().len(), 1);
    }
}
