use std::collections::BTreeMap;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;

/// Bucket for gateway messages that name no known field.
pub const SERVER_BUCKET: &str = "server";

/// Known field names matched as substrings of gateway 422/401 messages,
/// paired with the bucket they route to. First match wins.
const FIELD_PATTERNS: &[(&str, &str)] = &[
    ("username", "username"),
    ("password", "password"),
    ("response type", "response_type"),
    ("state", "state"),
    ("nonce", "nonce"),
    ("redirect", "redirect_url"),
    ("client id", "client_id"),
];

/// Field-scoped error buckets rendered beside the matching form input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Route one gateway message into the first field bucket whose name it
    /// mentions, falling back to the `server` bucket.
    fn route(&mut self, message: &str) {
        let lowered = message.to_lowercase();
        let bucket = FIELD_PATTERNS
            .iter()
            .find(|(needle, _)| lowered.contains(needle))
            .map_or(SERVER_BUCKET, |(_, bucket)| *bucket);
        self.push(bucket, message);
    }
}

/// Deterministic gateway-code-to-bucket mapping.
///
/// 400/403/404/405 pass the message through to the `server` bucket. 401
/// splits a `;`-delimited multi-message payload and routes each segment
/// like a 422. 422 routes by field-name substring. Anything else is fatal:
/// this subsystem has no silent-failure path.
pub(crate) fn map_gateway_error(code: u16, message: &str) -> Result<FieldErrors, AuthError> {
    let mut errors = FieldErrors::default();
    match code {
        400 | 403 | 404 | 405 => errors.push(SERVER_BUCKET, message),
        401 => {
            for segment in message.split(';') {
                let segment = segment.trim();
                if !segment.is_empty() {
                    errors.route(segment);
                }
            }
            if errors.is_empty() {
                errors.push(SERVER_BUCKET, message);
            }
        }
        422 => errors.route(message),
        code => {
            return Err(AuthError::Gateway {
                code,
                message: message.to_string(),
            });
        }
    }
    Ok(errors)
}

/// Broker error taxonomy.
///
/// `Fields` is user-correctable and shown inline; everything else is fatal
/// to the current attempt and never silently retried. Callers re-establish
/// the missing prerequisite by redirecting to a fresh page load.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// User-correctable per-field problems, collected rather than fail-fast.
    #[error("field validation failed")]
    Fields(FieldErrors),

    /// Missing or malformed session, CSRF, or exchange data. Indicates
    /// tampering or a stale flow, not a typo, so never shown per-field.
    #[error("auth precondition failed: {0}")]
    Auth(String),

    /// No authenticated identity where one is required.
    #[error("not authenticated")]
    Unauthenticated,

    /// Identity present but the required `ux_render` flag is off.
    #[error("missing permission: {0}")]
    Forbidden(&'static str),

    /// Structured gateway rejection with an unmapped code.
    #[error("gateway error {code}: {message}")]
    Gateway { code: u16, message: String },

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network or timeout failure talking to the gateway.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl From<crate::error::Error> for AuthError {
    fn from(e: crate::error::Error) -> Self {
        match e {
            crate::error::Error::Gateway { code, message } => Self::Gateway { code, message },
            crate::error::Error::Http(e) => Self::Transport(e),
            other => Self::Auth(other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Fields(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "errors": errors })),
            )
                .into_response(),
            Self::Auth(ref msg) => {
                tracing::warn!(reason = %msg, "auth precondition failed");
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            Self::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
            }
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()).into_response(),
            Self::Gateway { code, message } => {
                let status =
                    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY);
                (status, Json(json!({ "code": code, "message": message }))).into_response()
            }
            Self::Config(_) | Self::Transport(_) => {
                tracing::error!(error = %self, "broker internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unprocessable_message_routes_to_named_field() {
        let errors = map_gateway_error(422, "invalid username format").unwrap();
        assert_eq!(errors.get("username"), ["invalid username format"]);
        assert!(errors.get(SERVER_BUCKET).is_empty());
    }

    #[test]
    fn unprocessable_state_message_routes_to_state() {
        let errors = map_gateway_error(422, "state mismatch").unwrap();
        assert_eq!(errors.get("state"), ["state mismatch"]);
    }

    #[test]
    fn unprocessable_unknown_message_falls_back_to_server() {
        let errors = map_gateway_error(422, "quota exceeded").unwrap();
        assert_eq!(errors.get(SERVER_BUCKET), ["quota exceeded"]);
    }

    #[test]
    fn generic_codes_pass_message_through() {
        for code in [400, 403, 404, 405] {
            let errors = map_gateway_error(code, "username locked").unwrap();
            assert_eq!(errors.get(SERVER_BUCKET), ["username locked"], "code {code}");
            assert!(errors.get("username").is_empty(), "code {code}");
        }
    }

    #[test]
    fn unauthorized_splits_and_routes_segments() {
        let errors =
            map_gateway_error(401, "bad nonce; redirect not registered; session expired")
                .unwrap();
        assert_eq!(errors.get("nonce"), ["bad nonce"]);
        assert_eq!(errors.get("redirect_url"), ["redirect not registered"]);
        assert_eq!(errors.get(SERVER_BUCKET), ["session expired"]);
    }

    #[test]
    fn unauthorized_single_message_routes_like_unprocessable() {
        let errors = map_gateway_error(401, "username locked").unwrap();
        assert_eq!(errors.get("username"), ["username locked"]);
        assert!(errors.get(SERVER_BUCKET).is_empty());

        let errors = map_gateway_error(401, "session expired").unwrap();
        assert_eq!(errors.get(SERVER_BUCKET), ["session expired"]);
    }

    #[test]
    fn unknown_code_is_fatal() {
        let err = map_gateway_error(500, "boom").unwrap_err();
        match err {
            AuthError::Gateway { code, message } => {
                assert_eq!(code, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("expected gateway error, got {other:?}"),
        }
    }

    #[test]
    fn routing_is_case_insensitive_and_first_match_wins() {
        let errors = map_gateway_error(422, "Response Type unsupported").unwrap();
        assert_eq!(errors.get("response_type"), ["Response Type unsupported"]);

        // "username" appears before "state" in the pattern table
        let errors = map_gateway_error(422, "username rejected for this state").unwrap();
        assert_eq!(errors.get("username").len(), 1);
        assert!(errors.get("state").is_empty());
    }

    #[test]
    fn field_errors_serialize_as_flat_map() {
        let mut errors = FieldErrors::default();
        errors.push("username", "too short");
        errors.push("username", "reserved");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["username"], serde_json::json!(["too short", "reserved"]));
    }
}
