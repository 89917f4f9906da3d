use axum::{
    extract::State,
    http::HeaderMap,
    Json,
};
use bytes::Bytes;
use serde_json::{json, Value};

use super::AppState;
use crate::error::ApiError;
use crate::payments::{verify_webhook_signature, CheckoutSessionParams};

const SIGNATURE_HEADER: &str = "stripe-signature";

/// Creates a hosted checkout session for the fixed-price e-book. Both the
/// gateway client and the price identifier must be configured; either
/// missing fails fast without touching the gateway.
pub async fn create_ebook_session(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let Some(payments) = &state.payments else {
        return Err(ApiError::config(&state.config, "PAYMENT_SECRET_KEY"));
    };

    let Some(price_id) = &state.config.payment_price_id else {
        return Err(ApiError::config(&state.config, "PAYMENT_PRICE_ID"));
    };

    let base = &state.config.public_base_url;
    let params = CheckoutSessionParams {
        price_id: price_id.clone(),
        quantity: 1,
        // {CHECKOUT_SESSION_ID} is substituted by the gateway itself.
        success_url: format!("{}/merci?session_id={{CHECKOUT_SESSION_ID}}", base),
        cancel_url: format!("{}/ebook", base),
        locale: "fr".to_string(),
        metadata: vec![
            ("product_type".to_string(), "ebook".to_string()),
            ("product_name".to_string(), "guide".to_string()),
        ],
    };

    let url = payments
        .create_checkout_session(&params)
        .await
        .map_err(|err| ApiError::upstream(&state.config, err))?;

    Ok(Json(json!({ "url": url })))
}

/// Gateway webhook entry point. Verifies the signature over the raw payload
/// and fails closed; a verified completed checkout triggers the fulfillment
/// email (best effort).
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let Some(secret) = &state.config.payment_webhook_secret else {
        return Err(ApiError::config(&state.config, "PAYMENT_WEBHOOK_SECRET"));
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Validation("missing signature header".to_string()))?;

    let event = verify_webhook_signature(&body, signature, secret)
        .map_err(|err| {
            log::warn!("webhook rejected: {:#}", err);
            ApiError::Validation("invalid webhook signature".to_string())
        })?;

    if event.get("type").and_then(Value::as_str) == Some("checkout.session.completed") {
        fulfill(&state, &event).await;
    }

    Ok(Json(json!({ "received": true })))
}

/// Mails the download link to the buyer. Failures are logged, never
/// surfaced to the gateway: the webhook has already been acknowledged as
/// verified.
async fn fulfill(state: &AppState, event: &Value) {
    let Some(email) = &state.email else {
        log::warn!("checkout completed but EMAIL_API_KEY is not configured");
        return;
    };

    let Some(download_url) = &state.config.ebook_download_url else {
        log::warn!("checkout completed but EBOOK_DOWNLOAD_URL is not configured");
        return;
    };

    let Some(recipient) = event
        .pointer("/data/object/customer_details/email")
        .and_then(Value::as_str)
    else {
        log::warn!("completed checkout event carried no customer email");
        return;
    };

    let html = format!(
        "<p>Merci pour votre achat !</p><p><a href=\"{}\">T\u{e9}l\u{e9}charger votre e-book</a></p>",
        download_url,
    );

    if let Err(err) = email.send(recipient, "Votre e-book est pr\u{ea}t", &html).await {
        log::error!("fulfillment email to {} failed: {:#}", recipient, err);
    }
}
