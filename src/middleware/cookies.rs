use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use super::config::BrokerSettings;
use crate::claims::{AuthState, IdentityClaims};
use crate::token::SessionToken;

/// Session cookie lifetime; the gateway may expire the token sooner.
pub(super) const SESSION_TTL: Duration = Duration::hours(1);

/// Create the secret session cookie. The one trust anchor: script
/// inaccessible, strict same-site, never sent over plain HTTP in
/// production.
pub(super) fn session_cookie(name: &str, token: &SessionToken, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), token.as_str().to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(SESSION_TTL)
        .build()
}

/// Create the script-readable `authenticated` hint cookie. UI branching
/// only; attacker-writable, so never an access-control input.
pub(super) fn authenticated_cookie(name: &str, authenticated: bool, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), authenticated.to_string()))
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(SESSION_TTL)
        .build()
}

/// Create the script-readable identity cookie carrying JSON-encoded claims.
///
/// # Errors
///
/// Returns a serialization error if the claims cannot be JSON-encoded.
pub fn identity_cookie(
    name: &str,
    claims: &IdentityClaims,
    secure: bool,
) -> Result<Cookie<'static>, serde_json::Error> {
    let encoded = serde_json::to_string(claims)?;
    Ok(Cookie::build((name.to_string(), encoded))
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(SESSION_TTL)
        .build())
}

pub(super) fn clear_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

/// Session token from the jar, `None` when absent or shape-invalid.
pub(super) fn get_session(jar: &CookieJar, name: &str) -> Option<SessionToken> {
    jar.get(name).and_then(|c| c.value().parse().ok())
}

/// Identity claims from the jar, `None` when absent or undecodable.
pub(super) fn get_identity(jar: &CookieJar, name: &str) -> Option<IdentityClaims> {
    jar.get(name).and_then(|c| serde_json::from_str(c.value()).ok())
}

/// The single decode boundary from cookie presence to auth state.
pub(super) fn auth_state(jar: &CookieJar, settings: &BrokerSettings) -> AuthState {
    let Some(session) = get_session(jar, &settings.session_cookie_name) else {
        return AuthState::Anonymous;
    };
    match get_identity(jar, &settings.identity_cookie_name) {
        Some(claims) => AuthState::Authenticated { session, claims },
        None => AuthState::SessionOnly(session),
    }
}
