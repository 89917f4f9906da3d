use axum::{
    extract::{FromRequestParts, State},
    http::{header, request::Parts},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::error::ApiError;

pub const SESSION_COOKIE: &str = "admin_session";

/// Builds a signed session token for the single administrative identity.
/// Format: `<millis>.<base64 hmac of "admin.<millis>">`.
pub fn create_session(session_key: &str) -> String {
    let issued_at = chrono::Utc::now().timestamp_millis();
    let mac = hmac_sha256::HMAC::mac(
        format!("admin.{}", issued_at).as_bytes(),
        session_key.as_bytes(),
    );

    format!("{}.{}", issued_at, base64::encode(mac))
}

/// Checks a raw `Cookie` header for a valid admin session. Never errors on
/// missing or malformed input; those are simply invalid.
pub fn validate_session(cookie_header: &str, session_key: &str) -> bool {
    let Some(token) = cookie_header
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(&format!("{}=", SESSION_COOKIE)))
    else {
        return false;
    };

    let Some((issued_at, mac_b64)) = token.split_once('.') else {
        return false;
    };

    if issued_at.parse::<i64>().is_err() {
        return false;
    }

    let Ok(mac) = base64::decode(mac_b64) else {
        return false;
    };

    let expected = hmac_sha256::HMAC::mac(
        format!("admin.{}", issued_at).as_bytes(),
        session_key.as_bytes(),
    );

    constant_time_eq::constant_time_eq(&mac, &expected)
}

/// Extractor guarding the admin area. There is exactly one administrative
/// identity and no roles, so a valid session is all it carries.
pub struct AdminSession;

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookie_header = parts
            .headers
            .get(header::COOKIE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");

        if validate_session(cookie_header, &state.config.session_key) {
            Ok(AdminSession)
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

/// Issues the admin session cookie when the pre-provisioned password
/// matches.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(admin_password) = &state.config.admin_password else {
        return Err(ApiError::config(&state.config, "ADMIN_PASSWORD"));
    };

    if !constant_time_eq::constant_time_eq(
        request.password.as_bytes(),
        admin_password.as_bytes(),
    ) {
        log::warn!("admin login rejected");
        return Err(ApiError::Unauthorized);
    }

    let token = create_session(&state.config.session_key);
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, token,
    );

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(json!({ "success": true })),
    ))
}

/// Destroys the session by expiring the cookie. Idempotent: succeeds even
/// when no session cookie is present.
pub async fn logout() -> impl IntoResponse {
    let cookie = format!("{}=; Path=/; HttpOnly; Max-Age=0", SESSION_COOKIE);

    (
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(json!({ "success": true })),
    )
}
