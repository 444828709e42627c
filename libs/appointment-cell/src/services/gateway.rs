use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, error, info, warn};

use shared_config::AppConfig;
use shared_models::clock::format_clock;
use shared_models::error::AppError;

use crate::models::{
    AppointmentError, CheckoutMetadata, CheckoutRequest, CheckoutSession, GatewayEvent, GatewayEventKind,
};

type HmacSha256 = Hmac<Sha256>;

/// Hosted checkout and signed webhooks.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession, AppError>;

    /// Verifies `signature_header` over the raw payload, then decodes the event.
    fn construct_event(&self, payload: &[u8], signature_header: &str) -> Result<GatewayEvent, AppError>;
}

// ==============================================================================
// SIGNATURES
// ==============================================================================

fn signer(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal("Invalid webhook secret".to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

fn decode_hex(raw: &str) -> Option<Vec<u8>> {
    if raw.len() % 2 != 0 {
        return None;
    }
    (0..raw.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(raw.get(i..i + 2)?, 16).ok())
        .collect()
}

/// `t=<unix>,v1=<hex>` header for `payload`, as the processor sends it.
pub fn signature_header(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, AppError> {
    let digest = signer(secret, timestamp, payload)?.finalize().into_bytes();
    let hex: String = digest.iter().map(|byte| format!("{:02x}", byte)).collect();
    Ok(format!("t={},v1={}", timestamp, hex))
}

/// Checks a `t=...,v1=...` header. Any matching `v1` is accepted; the
/// timestamp must be within `tolerance_secs` of `now`.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), AppError> {
    if secret.is_empty() {
        error!("Webhook secret is not configured");
        return Err(AppError::Internal("Webhook secret not configured".to_string()));
    }

    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| AppointmentError::InvalidSignature("missing timestamp".to_string()))?;
    if signatures.is_empty() {
        return Err(AppointmentError::InvalidSignature("no v1 signature".to_string()).into());
    }
    if (now - timestamp).abs() > tolerance_secs {
        return Err(AppointmentError::InvalidSignature("timestamp outside tolerance".to_string()).into());
    }

    for signature in signatures {
        let Some(expected) = decode_hex(signature) else {
            continue;
        };
        if signer(secret, timestamp, payload)?.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }

    Err(AppointmentError::InvalidSignature("no matching signature".to_string()).into())
}

// ==============================================================================
// EVENT DECODING
// ==============================================================================

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: RawSession,
}

#[derive(Debug, Deserialize)]
struct RawSession {
    #[serde(default)]
    id: String,
    #[serde(default)]
    payment_intent: Option<String>,
    #[serde(default)]
    metadata: Option<CheckoutMetadata>,
}

pub fn parse_event(payload: &[u8]) -> Result<GatewayEvent, AppError> {
    let raw: RawEvent = serde_json::from_slice(payload)
        .map_err(|e| AppointmentError::MalformedEvent(e.to_string()))?;

    Ok(GatewayEvent {
        id: raw.id,
        kind: GatewayEventKind::from_type(&raw.event_type),
        session_id: raw.data.object.id,
        payment_intent: raw.data.object.payment_intent,
        metadata: raw.data.object.metadata.unwrap_or_default(),
    })
}

// ==============================================================================
// STRIPE
// ==============================================================================

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

pub struct StripeGateway {
    client: Client,
    secret_key: String,
    webhook_secret: String,
    base_url: String,
    currency: String,
    app_base_url: String,
    tolerance_secs: i64,
}

impl StripeGateway {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(config.http_timeout())
                .build()
                .unwrap_or_default(),
            secret_key: config.stripe_secret_key.clone(),
            webhook_secret: config.stripe_webhook_secret.clone(),
            base_url: config.stripe_api_base_url.trim_end_matches('/').to_string(),
            currency: config.payment_currency.clone(),
            app_base_url: config.app_base_url.trim_end_matches('/').to_string(),
            tolerance_secs: config.webhook_tolerance_secs,
        }
    }

    fn checkout_form(&self, request: &CheckoutRequest) -> Vec<(&'static str, String)> {
        let unit_amount = (request.amount * 100.0).round() as i64;
        vec![
            ("mode", "payment".to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", self.currency.clone()),
            ("line_items[0][price_data][unit_amount]", unit_amount.to_string()),
            (
                "line_items[0][price_data][product_data][name]",
                format!("IT Consultation with {}", request.specialist_name),
            ),
            (
                "line_items[0][price_data][product_data][description]",
                format!(
                    "{} - {} {}-{}",
                    request.description,
                    request.date.format("%-m/%-d/%Y"),
                    format_clock(&request.start_time),
                    format_clock(&request.end_time)
                ),
            ),
            (
                "success_url",
                format!(
                    "{}/dashboard/client?payment=success&appointment_id={}",
                    self.app_base_url, request.appointment_id
                ),
            ),
            (
                "cancel_url",
                format!("{}/book-appointment?payment=cancelled", self.app_base_url),
            ),
            ("metadata[appointment_id]", request.appointment_id.to_string()),
            ("metadata[payment_id]", request.payment_id.to_string()),
            ("metadata[client_id]", request.client_id.to_string()),
            ("metadata[specialist_id]", request.specialist_id.to_string()),
            ("customer_email", request.customer_email.clone()),
        ]
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession, AppError> {
        if self.secret_key.is_empty() {
            error!("Stripe secret key is not configured");
            return Err(AppError::Internal("Stripe not configured".to_string()));
        }

        debug!("Creating checkout session for appointment {}", request.appointment_id);

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&self.checkout_form(request))
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("Payment gateway unreachable: {}", e), true))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Checkout session rejected ({}): {}", status, body);
            let retryable = status.is_server_error() || status.as_u16() == 429;
            return Err(AppError::upstream(
                format!("Payment gateway returned {}", status.as_u16()),
                retryable,
            ));
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| AppError::upstream(format!("Unreadable checkout session: {}", e), false))?;
        let url = session
            .url
            .ok_or_else(|| AppError::upstream("Checkout session has no URL", false))?;

        info!("Checkout session {} created for appointment {}", session.id, request.appointment_id);
        Ok(CheckoutSession { id: session.id, url })
    }

    fn construct_event(&self, payload: &[u8], signature_header: &str) -> Result<GatewayEvent, AppError> {
        verify_signature(
            payload,
            signature_header,
            &self.webhook_secret,
            self.tolerance_secs,
            Utc::now().timestamp(),
        )?;
        parse_event(payload)
    }
}
