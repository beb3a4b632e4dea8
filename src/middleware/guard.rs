use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::Redirect;
use axum_extra::extract::CookieJar;

use super::cookies;
use super::error::AuthError;
use super::state::BrokerState;
use crate::claims::{AuthState, IdentityClaims};
use crate::token::SessionToken;

/// Authenticated identity for UI rendering, extracted from the cookie
/// bundle.
///
/// The claims only decide what to render. A forged identity cookie can
/// change what the browser shows, never what the gateway authorizes: every
/// mutating call is re-checked server-side with the session as the sole
/// credential.
#[derive(Debug, Clone)]
pub struct Identity {
    pub session: SessionToken,
    pub claims: IdentityClaims,
}

/// Require a shape-valid session cookie before a page body executes.
///
/// A UX convenience and latency optimization, not the security boundary;
/// the gateway re-enforces authorization on every mutating call.
pub fn require_session(state: &BrokerState, jar: &CookieJar) -> Result<SessionToken, Redirect> {
    cookies::get_session(jar, &state.settings.session_cookie_name)
        .ok_or_else(|| Redirect::to(&state.settings.login_path))
}

/// Require an authenticated identity before a protected page renders.
///
/// An anonymous visitor with a live session is redirected into the login
/// flow with a fresh exchange targeting `target`, so login can send them
/// back. Without any usable session the redirect is bare: the login page
/// mints its own exchange once the bootstrap middleware re-establishes a
/// session.
pub async fn require_authenticated(
    state: &BrokerState,
    jar: &CookieJar,
    target: &str,
) -> Result<Identity, Redirect> {
    match cookies::auth_state(jar, &state.settings) {
        AuthState::Authenticated { session, claims } => Ok(Identity { session, claims }),
        AuthState::SessionOnly(session) => {
            match state.gateway.oauth_state(&session, target).await {
                Ok(exchange) => Err(Redirect::to(&format!(
                    "{}?{}",
                    state.settings.login_path,
                    exchange.login_query()
                ))),
                Err(e) => {
                    tracing::warn!(error = %e, target, "could not mint exchange for login redirect");
                    Err(Redirect::to(&state.settings.login_path))
                }
            }
        }
        AuthState::Anonymous => Err(Redirect::to(&state.settings.login_path)),
    }
}

/// Permission gate for pages that additionally require a `ux_render` flag.
///
/// Runs after identity is confirmed; a missing permission is a handled
/// forbidden outcome, not a redirect.
pub fn require_permission(claims: &IdentityClaims, feature: &'static str) -> Result<(), AuthError> {
    if claims.ux_render.allows(feature) {
        Ok(())
    } else {
        Err(AuthError::Forbidden(feature))
    }
}

impl FromRequestParts<BrokerState> for Identity {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &BrokerState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthError::Unauthenticated)?;

        match cookies::auth_state(&jar, &state.settings) {
            AuthState::Authenticated { session, claims } => Ok(Identity { session, claims }),
            _ => Err(AuthError::Unauthenticated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode, header};
    use axum::routing::get;
    use axum_extra::extract::cookie::Cookie;
    use serde_json::json;
    use tower::ServiceExt;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::claims::UxRender;
    use crate::gateway::{GatewayClient, GatewayConfig};
    use crate::middleware::{BrokerConfig, LoginContext, LoginView};

    const SESSION: &str = "0123456789abcdef0123456789abcdef";

    struct NullView;

    impl LoginView for NullView {
        fn render(&self, _ctx: &LoginContext) -> axum::response::Html<String> {
            axum::response::Html(String::new())
        }
    }

    fn broker_state(base: &str) -> BrokerState {
        let base: Url = base.parse().unwrap();
        let gateway = GatewayClient::new(GatewayConfig::new(&base, "portal")).unwrap();
        BrokerState::new(BrokerConfig::new(gateway), NullView)
    }

    fn claims(albums: bool) -> IdentityClaims {
        let mut ux_render = UxRender::default();
        ux_render.set("albums", albums);
        IdentityClaims {
            username: "astrid".into(),
            given_name: "Astrid".into(),
            family_name: "Berg".into(),
            birthdate: None,
            ux_render,
        }
    }

    fn jar_with(session: Option<&str>, identity: Option<&IdentityClaims>) -> CookieJar {
        let mut jar = CookieJar::new();
        if let Some(session) = session {
            jar = jar.add(Cookie::new("session_id", session.to_string()));
        }
        if let Some(claims) = identity {
            jar = jar.add(Cookie::new(
                "identity",
                serde_json::to_string(claims).unwrap(),
            ));
        }
        jar
    }

    #[test]
    fn require_session_accepts_valid_cookie() {
        let state = broker_state("http://127.0.0.1:9");
        let session = require_session(&state, &jar_with(Some(SESSION), None)).unwrap();
        assert_eq!(session.as_str(), SESSION);
    }

    #[test]
    fn require_session_fails_closed_on_malformed_cookie() {
        let state = broker_state("http://127.0.0.1:9");
        assert!(require_session(&state, &jar_with(Some("short"), None)).is_err());
        assert!(require_session(&state, &jar_with(None, None)).is_err());
    }

    #[tokio::test]
    async fn anonymous_visitor_gets_exchange_populated_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/state"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response_type": "code",
                "state": "s1",
                "nonce": "n1",
                "client_id": "c1",
                "redirect_url": "https://x/y",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let state = broker_state(&server.uri());
        let jar = jar_with(Some(SESSION), None);
        let err = require_authenticated(&state, &jar, "/albums")
            .await
            .unwrap_err();

        let response = axum::response::IntoResponse::into_response(err);
        let location = response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(location.starts_with("/login?"));
        assert!(location.contains("state=s1"));
        assert!(location.contains("nonce=n1"));
        assert!(location.contains("redirect_url=https%3A%2F%2Fx%2Fy"));
    }

    #[tokio::test]
    async fn sessionless_visitor_gets_bare_login_redirect() {
        let state = broker_state("http://127.0.0.1:9");
        let err = require_authenticated(&state, &jar_with(None, None), "/albums")
            .await
            .unwrap_err();

        let response = axum::response::IntoResponse::into_response(err);
        let location = response.headers().get(header::LOCATION).unwrap();
        assert_eq!(location, "/login");
    }

    #[tokio::test]
    async fn authenticated_visitor_passes_with_claims() {
        let state = broker_state("http://127.0.0.1:9");
        let claims = claims(true);
        let jar = jar_with(Some(SESSION), Some(&claims));
        let identity = require_authenticated(&state, &jar, "/albums").await.unwrap();
        assert_eq!(identity.claims.username, "astrid");
        assert_eq!(identity.session.as_str(), SESSION);
    }

    #[test]
    fn permission_gate_is_forbidden_not_redirect() {
        assert!(require_permission(&claims(true), "albums").is_ok());
        let err = require_permission(&claims(false), "albums").unwrap_err();
        assert!(matches!(err, AuthError::Forbidden("albums")));
    }

    async fn whoami(identity: Identity) -> String {
        identity.claims.username
    }

    #[tokio::test]
    async fn identity_extractor_requires_both_cookies() {
        let state = broker_state("http://127.0.0.1:9");
        let app = Router::new()
            .route("/whoami", get(whoami))
            .with_state(state);

        let claims = claims(true);
        let cookie_header = format!(
            "session_id={SESSION}; identity={}",
            serde_json::to_string(&claims).unwrap()
        );
        let response = app
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .uri("/whoami")
                    .header(header::COOKIE, cookie_header)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"astrid");

        // session alone is not an identity
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/whoami")
                    .header(header::COOKIE, format!("session_id={SESSION}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
