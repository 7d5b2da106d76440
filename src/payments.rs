use async_trait::async_trait;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Every intent is charged in US dollars.
pub const PAYMENT_CURRENCY: &str = "usd";

/// Largest amount the processor accepts in one charge, in cents (`$999,999.99`).
pub const MAX_AMOUNT_MINOR_UNITS: i64 = 99_999_999;

/// Converts a major-unit price (dollars) into the processor's minor units (cents).
///
/// Rounds to the nearest cent: `19.99 * 100.0` is `1998.999...` in binary floating point.
/// Returns `None` unless the result lies in `1..=MAX_AMOUNT_MINOR_UNITS`, which also
/// rules out NaN and infinities.
pub fn amount_in_minor_units(price: f64) -> Option<i64> {
    let cents = (price * 100.0).round();
    if cents >= 1.0 && cents <= MAX_AMOUNT_MINOR_UNITS as f64 {
        Some(cents as i64)
    } else {
        None
    }
}

/// PaymentError
///
/// Failures of the outbound payment-processor call.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment processor unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("payment processor rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("payment intent carried no client secret")]
    MissingClientSecret,
}

/// PaymentIntent
///
/// The subset of the processor's payment-intent object this service reads.
/// Holds a live client secret, so it is never logged.
#[derive(Clone)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub client_secret: String,
}

// 1. PaymentGateway Contract
/// PaymentGateway
///
/// The contract for creating payment intents. Handlers only see this trait, so the
/// real processor client can be swapped for `MockPaymentGateway` in tests.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Requests a new card payment intent for `amount` minor units of `currency`.
    async fn create_payment_intent(
        &self,
        amount: i64,
        currency: &str,
    ) -> Result<PaymentIntent, PaymentError>;
}

/// PaymentState
///
/// The shared handle to the payment processor held by `AppState`.
pub type PaymentState = Arc<dyn PaymentGateway>;

// 2. The Real Implementation (Stripe)
/// StripeGateway
///
/// Talks to the Stripe REST API (`POST /v1/payment_intents`, form-encoded, bearer
/// authenticated with the secret key).
#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

#[derive(Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct StripeIntentBody {
    id: String,
    amount: i64,
    currency: String,
    client_secret: Option<String>,
}

impl StripeGateway {
    pub fn new(api_base: &str, secret_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_payment_intent(
        &self,
        amount: i64,
        currency: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        let url = format!("{}/v1/payment_intents", self.api_base);
        let amount_field = amount.to_string();

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.secret_key)
            .form(&[
                ("amount", amount_field.as_str()),
                ("currency", currency),
                ("payment_method_types[]", "card"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<StripeErrorEnvelope>()
                .await
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| "unreadable error body".to_string());
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: StripeIntentBody = response.json().await?;
        let client_secret = body
            .client_secret
            .filter(|secret| !secret.is_empty())
            .ok_or(PaymentError::MissingClientSecret)?;

        tracing::info!(intent_id = %body.id, amount = body.amount, "payment intent created");

        Ok(PaymentIntent {
            id: body.id,
            amount: body.amount,
            currency: body.currency,
            client_secret,
        })
    }
}

// 3. The Mock Implementation (For Tests)
/// MockPaymentGateway
///
/// In-process stand-in for the processor. Records every requested `(amount, currency)`
/// so tests can assert on the outbound call without a network.
#[derive(Default)]
pub struct MockPaymentGateway {
    /// When true, every call returns a simulated rejection.
    pub should_fail: bool,
    requests: Mutex<Vec<(i64, String)>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Every `(amount, currency)` pair requested so far, in call order.
    pub fn requests(&self) -> Vec<(i64, String)> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_payment_intent(
        &self,
        amount: i64,
        currency: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((amount, currency.to_string()));
        }

        if self.should_fail {
            return Err(PaymentError::Rejected {
                status: 402,
                message: "Mock Payment Error: Simulation requested".to_string(),
            });
        }

        let id = format!("pi_mock_{}", amount);
        Ok(PaymentIntent {
            client_secret: format!("{}_secret_mock", id),
            id,
            amount,
            currency: currency.to_string(),
        })
    }
}
