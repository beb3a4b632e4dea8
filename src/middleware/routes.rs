use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::cookies;
use super::error::{AuthError, FieldErrors};
use super::login::{self, LoginForm};
use super::state::BrokerState;
use super::traits::LoginContext;
use crate::exchange::ExchangeQuery;
use crate::gateway::TokenCallbackCommand;
use crate::token::SessionToken;

/// Create the broker's router: login page, submission, OAuth callback, and
/// logout. Mount it alongside the app's own routes and put
/// [`bootstrap_session`](super::bootstrap_session) in front of everything.
pub fn auth_routes(state: BrokerState) -> Router {
    let login_path = state.settings.login_path.clone();
    Router::new()
        .route(&login_path, get(login_page).post(submit_login))
        .route("/callback", get(callback))
        .route("/logout", get(logout).post(logout))
        .with_state(state)
}

fn session_or_abort(state: &BrokerState, jar: &CookieJar) -> Result<SessionToken, AuthError> {
    cookies::get_session(jar, &state.settings.session_cookie_name)
        .ok_or_else(|| AuthError::Auth("session missing or malformed".into()))
}

// ── Login page ─────────────────────────────────────────────────────

async fn login_page(
    State(state): State<BrokerState>,
    jar: CookieJar,
    Query(query): Query<ExchangeQuery>,
) -> Result<Response, AuthError> {
    let session = session_or_abort(&state, &jar)?;

    // A complete query is a continuation of an in-flight exchange and is
    // reused verbatim; anything less mints a fresh one and lands back here
    // with the full query, so mid-flow re-renders keep their state/nonce.
    let exchange = match query.complete() {
        Some(exchange) => exchange,
        None => {
            let nav_endpoint = query.redirect_url.as_deref().unwrap_or("/");
            let exchange = state.gateway.oauth_state(&session, nav_endpoint).await?;
            let target = format!("{}?{}", state.settings.login_path, exchange.login_query());
            return Ok(Redirect::to(&target).into_response());
        }
    };

    let csrf = state.gateway.csrf_token(&session).await?;
    let ctx = LoginContext {
        exchange,
        csrf,
        errors: FieldErrors::default(),
    };
    Ok(state.view.render(&ctx).into_response())
}

// ── Login submission ───────────────────────────────────────────────

async fn submit_login(
    State(state): State<BrokerState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AuthError> {
    let raw_session = jar
        .get(&state.settings.session_cookie_name)
        .map(|c| c.value().to_string());

    let command = match login::build_login_command(&form, raw_session.as_deref()) {
        Ok(command) => command,
        Err(AuthError::Fields(errors)) => {
            return render_with_errors(&state, &jar, &form, errors).await;
        }
        Err(fatal) => return Err(fatal),
    };

    match state.gateway.login(&command).await {
        Ok(accepted) => {
            tracing::info!(client_id = %accepted.client_id, "login accepted, redirecting to callback");
            Ok(Redirect::to(&accepted.callback_url()).into_response())
        }
        Err(crate::error::Error::Gateway { code, message }) => {
            match login::login_failure(code, &message) {
                AuthError::Fields(errors) => {
                    render_with_errors(&state, &jar, &form, errors).await
                }
                fatal => Err(fatal),
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// Re-render the login page with field errors, keeping the submitted
/// exchange and fetching a fresh CSRF token for the retry.
async fn render_with_errors(
    state: &BrokerState,
    jar: &CookieJar,
    form: &LoginForm,
    errors: FieldErrors,
) -> Result<Response, AuthError> {
    let session = session_or_abort(state, jar)?;
    let exchange = login::exchange_from_form(form)
        .complete()
        .ok_or_else(|| AuthError::Auth("oauth exchange incomplete or malformed".into()))?;
    let csrf = state.gateway.csrf_token(&session).await?;
    let ctx = LoginContext {
        exchange,
        csrf,
        errors,
    };
    Ok(state.view.render(&ctx).into_response())
}

// ── OAuth callback ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CallbackParams {
    auth_code: Option<String>,
    client_id: Option<String>,
    response_type: Option<String>,
    state: Option<String>,
    nonce: Option<String>,
    redirect_url: Option<String>,
}

async fn callback(
    State(state): State<BrokerState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<Response, AuthError> {
    let session = session_or_abort(&state, &jar)?;

    let auth_code = params
        .auth_code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AuthError::Auth("authorization code missing".into()))?;

    let exchange = ExchangeQuery {
        client_id: params.client_id,
        response_type: params.response_type,
        state: params.state,
        nonce: params.nonce,
        redirect_url: params.redirect_url,
    }
    .complete()
    .ok_or_else(|| AuthError::Auth("oauth exchange incomplete or malformed".into()))?;

    let command = TokenCallbackCommand {
        auth_code,
        response_type: exchange.response_type.clone(),
        state: exchange.state.clone(),
        nonce: exchange.nonce.clone(),
        client_id: exchange.client_id.clone(),
        redirect_url: exchange.redirect_url.clone(),
    };
    state.gateway.token_callback(&session, &command).await?;

    let hint = cookies::authenticated_cookie(
        &state.settings.authenticated_cookie_name,
        true,
        state.settings.secure_cookies,
    );
    Ok((jar.add(hint), Redirect::to(&exchange.redirect_url)).into_response())
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout(State(state): State<BrokerState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let jar = jar
        .add(cookies::clear_cookie(&state.settings.session_cookie_name))
        .add(cookies::clear_cookie(&state.settings.authenticated_cookie_name))
        .add(cookies::clear_cookie(&state.settings.identity_cookie_name));
    (jar, Redirect::to(&state.settings.logout_redirect))
}
