use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;

/// Everything needed to open a hosted checkout session for one
/// fixed-quantity line item.
#[derive(Debug, Clone)]
pub struct CheckoutSessionParams {
    pub price_id: String,
    pub quantity: u32,
    pub success_url: String,
    pub cancel_url: String,
    pub locale: String,
    /// Opaque key/value pairs attached for external reporting; never read
    /// back by this codebase.
    pub metadata: Vec<(String, String)>,
}

/// Hosted payment gateway. Final payment confirmation is delegated entirely
/// to the gateway and its webhook.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted session and return the redirect URL.
    async fn create_checkout_session(&self, params: &CheckoutSessionParams) -> Result<String>;
}

/// Stripe-compatible gateway client.
pub struct StripeGateway {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(base_url: String, secret_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            secret_key,
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(&self, params: &CheckoutSessionParams) -> Result<String> {
        let url = format!("{}/v1/checkout/sessions", self.base_url);

        let mut form: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("line_items[0][price]".to_string(), params.price_id.clone()),
            (
                "line_items[0][quantity]".to_string(),
                params.quantity.to_string(),
            ),
            ("success_url".to_string(), params.success_url.clone()),
            ("cancel_url".to_string(), params.cancel_url.clone()),
            ("locale".to_string(), params.locale.clone()),
            // Always materialize a gateway-side customer record.
            ("customer_creation".to_string(), "always".to_string()),
        ];

        for (name, value) in &params.metadata {
            form.push((format!("metadata[{}]", name), value.clone()));
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .context("payment gateway unreachable")?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .context("payment gateway returned an unreadable body")?;

        if !status.is_success() {
            return Err(anyhow!("checkout session creation failed ({}): {}", status, body));
        }

        body.get("url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("checkout session response missing url"))
    }
}

/// Verifies a gateway webhook signature header of the form
/// `t=<timestamp>,v1=<hex hmac>` against the raw payload. Fails closed:
/// anything malformed or mismatched is an error, and only a verified
/// payload is parsed into an event.
pub fn verify_webhook_signature(payload: &[u8], header: &str, secret: &str) -> Result<Value> {
    let mut timestamp: Option<&str> = None;
    let mut candidates: Vec<&str> = vec![];

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| anyhow!("signature header missing timestamp"))?;

    if candidates.is_empty() {
        bail!("signature header missing v1 signature");
    }

    let mut signed = Vec::with_capacity(timestamp.len() + 1 + payload.len());
    signed.extend_from_slice(timestamp.as_bytes());
    signed.push(b'.');
    signed.extend_from_slice(payload);

    let expected = hmac_sha256::HMAC::mac(&signed, secret.as_bytes());

    let verified = candidates.iter().any(|candidate| {
        hex_decode(candidate)
            .map(|bytes| constant_time_eq::constant_time_eq(&bytes, &expected))
            .unwrap_or(false)
    });

    if !verified {
        bail!("webhook signature mismatch");
    }

    serde_json::from_slice(payload).context("verified payload is not valid JSON")
}

fn hex_decode(input: &str) -> Result<Vec<u8>> {
    if !input.is_ascii() || input.len() % 2 != 0 {
        bail!("malformed hex string");
    }

    (0..input.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&input[i..i + 2], 16).context("invalid hex digit"))
        .collect()
}
