use serde::Deserialize;

use super::error::{AuthError, FieldErrors, map_gateway_error};
use crate::exchange::ExchangeQuery;
use crate::gateway::LoginCommand;
use crate::token::{CsrfToken, SessionToken};

const USERNAME_MIN: usize = 3;
const PASSWORD_MIN: usize = 8;
const CREDENTIAL_MAX: usize = 254;

/// Raw login form submission. The exchange fields ride along as hidden
/// inputs so the submission continues the exchange the page was rendered
/// with.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub csrf_token: String,
    pub client_id: Option<String>,
    pub response_type: Option<String>,
    pub state: Option<String>,
    pub nonce: Option<String>,
    pub redirect_url: Option<String>,
}

pub(super) fn exchange_from_form(form: &LoginForm) -> ExchangeQuery {
    ExchangeQuery {
        client_id: form.client_id.clone(),
        response_type: form.response_type.clone(),
        state: form.state.clone(),
        nonce: form.nonce.clone(),
        redirect_url: form.redirect_url.clone(),
    }
}

/// Stage 1: credential shape. Display-oriented, so every problem is
/// collected instead of failing at the first.
fn validate_fields(form: &LoginForm) -> FieldErrors {
    let mut errors = FieldErrors::default();
    let username_len = form.username.chars().count();
    if !(USERNAME_MIN..=CREDENTIAL_MAX).contains(&username_len) {
        errors.push(
            "username",
            format!("username must be {USERNAME_MIN} to {CREDENTIAL_MAX} characters"),
        );
    }
    let password_len = form.password.chars().count();
    if !(PASSWORD_MIN..=CREDENTIAL_MAX).contains(&password_len) {
        errors.push(
            "password",
            format!("password must be {PASSWORD_MIN} to {CREDENTIAL_MAX} characters"),
        );
    }
    errors
}

/// Stages 1 through 5 of the login pipeline: every gate that must pass
/// before the gateway sees the submission.
///
/// The ordering is deliberate. Field validation runs first so users see
/// their own typos before being told about a stale session; the exchange,
/// CSRF, and session gates run before any network call so a tampered or
/// expired flow never reaches the gateway with credentials attached.
///
/// # Errors
///
/// [`AuthError::Fields`] from stage 1, [`AuthError::Auth`] from the fatal
/// gates. A malformed exchange is tampering or a broken flow, never a
/// user-correctable mistake.
pub(super) fn build_login_command(
    form: &LoginForm,
    raw_session: Option<&str>,
) -> Result<LoginCommand, AuthError> {
    let field_errors = validate_fields(form);
    if !field_errors.is_empty() {
        return Err(AuthError::Fields(field_errors));
    }

    let exchange = exchange_from_form(form)
        .complete()
        .ok_or_else(|| AuthError::Auth("oauth exchange incomplete or malformed".into()))?;

    let csrf: CsrfToken = form
        .csrf_token
        .parse()
        .map_err(|_| AuthError::Auth("csrf token missing or malformed".into()))?;

    let session: SessionToken = raw_session
        .unwrap_or_default()
        .parse()
        .map_err(|_| AuthError::Auth("session missing or malformed".into()))?;

    Ok(LoginCommand {
        username: form.username.clone(),
        password: form.password.clone(),
        client_id: exchange.client_id,
        response_type: exchange.response_type,
        state: exchange.state,
        nonce: exchange.nonce,
        redirect: exchange.redirect_url,
        session: session.into(),
        csrf: csrf.into(),
    })
}

/// Stage 7: fold a gateway rejection into field buckets where the code
/// allows it, or surface it as fatal.
pub(super) fn login_failure(code: u16, message: &str) -> AuthError {
    match map_gateway_error(code, message) {
        Ok(errors) => AuthError::Fields(errors),
        Err(fatal) => fatal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSION: &str = "0123456789abcdef0123456789abcdef";
    const CSRF: &str = "fedcba9876543210fedcba9876543210";

    fn full_form() -> LoginForm {
        LoginForm {
            username: "astrid".into(),
            password: "hunter2hunter2".into(),
            csrf_token: CSRF.into(),
            client_id: Some("c1".into()),
            response_type: Some("code".into()),
            state: Some("s1".into()),
            nonce: Some("n1".into()),
            redirect_url: Some("https://x/y".into()),
        }
    }

    #[test]
    fn command_reuses_exchange_values_verbatim() {
        let command = build_login_command(&full_form(), Some(SESSION)).unwrap();
        assert_eq!(command.client_id, "c1");
        assert_eq!(command.response_type, "code");
        assert_eq!(command.state, "s1");
        assert_eq!(command.nonce, "n1");
        assert_eq!(command.redirect, "https://x/y");
        assert_eq!(command.session, SESSION);
        assert_eq!(command.csrf, CSRF);
    }

    #[test]
    fn field_stage_collects_every_error() {
        let mut form = full_form();
        form.username = "ab".into();
        form.password = "short".into();
        match build_login_command(&form, Some(SESSION)).unwrap_err() {
            AuthError::Fields(errors) => {
                assert_eq!(errors.get("username").len(), 1);
                assert_eq!(errors.get("password").len(), 1);
            }
            other => panic!("expected field errors, got {other:?}"),
        }
    }

    #[test]
    fn incomplete_exchange_is_fatal_not_a_field_error() {
        for strip in 0..5 {
            let mut form = full_form();
            match strip {
                0 => form.client_id = None,
                1 => form.response_type = None,
                2 => form.state = None,
                3 => form.nonce = None,
                _ => form.redirect_url = None,
            }
            match build_login_command(&form, Some(SESSION)).unwrap_err() {
                AuthError::Auth(_) => {}
                other => panic!("field {strip}: expected fatal auth error, got {other:?}"),
            }
        }
    }

    #[test]
    fn empty_csrf_fails_before_any_command_is_built() {
        let mut form = full_form();
        form.csrf_token = String::new();
        match build_login_command(&form, Some(SESSION)).unwrap_err() {
            AuthError::Auth(msg) => assert!(msg.contains("csrf")),
            other => panic!("expected fatal auth error, got {other:?}"),
        }
    }

    #[test]
    fn out_of_range_csrf_is_fatal() {
        let mut form = full_form();
        form.csrf_token = "a".repeat(65);
        assert!(matches!(
            build_login_command(&form, Some(SESSION)).unwrap_err(),
            AuthError::Auth(_)
        ));
    }

    #[test]
    fn missing_or_malformed_session_is_fatal() {
        assert!(matches!(
            build_login_command(&full_form(), None).unwrap_err(),
            AuthError::Auth(_)
        ));
        assert!(matches!(
            build_login_command(&full_form(), Some("short")).unwrap_err(),
            AuthError::Auth(_)
        ));
    }

    #[test]
    fn typos_surface_before_staleness() {
        // Bad fields and a missing csrf: the user sees the typo first.
        let mut form = full_form();
        form.username = "ab".into();
        form.csrf_token = String::new();
        assert!(matches!(
            build_login_command(&form, Some(SESSION)).unwrap_err(),
            AuthError::Fields(_)
        ));
    }

    #[test]
    fn gateway_rejection_folds_into_buckets() {
        match login_failure(422, "invalid username format") {
            AuthError::Fields(errors) => {
                assert_eq!(errors.get("username"), ["invalid username format"]);
            }
            other => panic!("expected field errors, got {other:?}"),
        }
        assert!(matches!(
            login_failure(500, "boom"),
            AuthError::Gateway { code: 500, .. }
        ));
    }
}
