use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use serde_json::{Value, json};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{error, info, warn};

use super::SharedState;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";
pub const EVENT_HEADER: &str = "X-GitHub-Event";

/// Verify a `sha256=<hex>` signature header against the raw body.
///
/// With no secret configured every payload is accepted.
#[must_use]
pub fn verify_signature(body: &[u8], header: Option<&str>, secret: Option<&str>) -> bool {
    let Some(secret) = secret else {
        warn!("Signature verification skipped (no secret configured)");
        return true;
    };
    let Some(header) = header else {
        error!("No signature header provided");
        return false;
    };
    let Some(("sha256", digest)) = header.split_once('=') else {
        error!("Invalid or unsupported signature format");
        return false;
    };
    let Ok(expected) = hex::decode(digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let computed = mac.finalize().into_bytes();

    computed.as_slice().ct_eq(&expected).into()
}

/// Hex signature header value for `body`, as GitHub sends it.
pub fn sign(body: &[u8], secret: &str) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn ignored(reason: String) -> Response {
    info!(reason = %reason, "Ignoring webhook");
    (
        StatusCode::OK,
        Json(json!({ "status": "ignored", "reason": reason })),
    )
        .into_response()
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "null".to_string(),
    }
}

pub async fn handle_webhook(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    if !verify_signature(&body, signature, state.secret.as_deref()) {
        error!("Webhook signature verification failed");
        return error_response(StatusCode::UNAUTHORIZED, "Invalid signature");
    }

    if body.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Empty payload");
    }
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "Malformed webhook payload");
            return error_response(StatusCode::BAD_REQUEST, "Invalid JSON payload");
        }
    };
    if payload.as_object().is_none_or(|o| o.is_empty()) {
        return error_response(StatusCode::BAD_REQUEST, "Empty payload");
    }

    let event = headers
        .get(EVENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("null");
    info!(event, "Received webhook");

    if event != "issues" {
        return ignored(format!("Event type \"{}\" is not processed", event));
    }

    let action = payload.get("action");
    let number = payload
        .get("issue")
        .and_then(|i| i.get("number"))
        .and_then(Value::as_u64);
    match (action.and_then(Value::as_str), number) {
        (Some("opened"), Some(number)) => {
            let title = payload["issue"]["title"].as_str().unwrap_or_default();
            info!(issue = number, title, "New issue, dispatching");
            state.dispatcher.dispatch(number);
            (
                StatusCode::ACCEPTED,
                Json(json!({
                    "status": "processing",
                    "issue": number,
                    "message": format!("Issue #{} queued for processing", number),
                })),
            )
                .into_response()
        }
        _ => ignored(format!(
            "Action \"{}\" is not processed",
            display_value(action)
        )),
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
