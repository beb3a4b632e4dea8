use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use serde_json::json;

use super::cookies;
use super::state::BrokerState;
use crate::error::Error;

/// Session Bootstrap Middleware. Runs before route handling on every
/// request and guarantees a session cookie exists for everything
/// downstream, except when the anonymous-session call itself fails.
///
/// An existing non-empty cookie is a no-op regardless of validity; stale
/// tokens are discovered lazily by whichever endpoint uses them next.
/// Revalidating on every request would cost a gateway round trip per page.
pub async fn bootstrap_session(
    State(state): State<BrokerState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let has_session = jar
        .get(&state.settings.session_cookie_name)
        .is_some_and(|c| !c.value().is_empty());
    if has_session {
        return next.run(request).await;
    }

    match state.gateway.anonymous_session().await {
        Ok(anon) => {
            let session = cookies::session_cookie(
                &state.settings.session_cookie_name,
                &anon.session_token,
                state.settings.secure_cookies,
            );
            let hint = cookies::authenticated_cookie(
                &state.settings.authenticated_cookie_name,
                anon.authenticated,
                state.settings.secure_cookies,
            );
            let jar = jar.add(session).add(hint);
            (jar, next.run(request).await).into_response()
        }
        // Structured 4xx rejection: short-circuit with the same shape, no
        // cookies. A 5xx is an outage, not a rejection, and falls through.
        Err(Error::Gateway { code, message }) if (400..500).contains(&code) => {
            tracing::warn!(code, %message, "gateway rejected anonymous session bootstrap");
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY);
            (status, Json(json!({ "code": code, "message": message }))).into_response()
        }
        Err(e) => {
            // Non-fatal: pass through cookieless, downstream guards fail closed.
            tracing::warn!(error = %e, "anonymous session bootstrap failed; continuing without a session");
            next.run(request).await
        }
    }
}
