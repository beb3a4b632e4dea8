use axum::response::Html;

use super::error::FieldErrors;
use crate::exchange::OauthExchange;
use crate::token::CsrfToken;

/// Everything the login template needs for one render.
///
/// The exchange fields go into hidden inputs so a submission continues the
/// in-flight attempt; the CSRF token gates the mutating POST; `errors` is
/// empty on a first render.
#[derive(Debug, Clone)]
pub struct LoginContext {
    pub exchange: OauthExchange,
    pub csrf: CsrfToken,
    pub errors: FieldErrors,
}

/// Consumer-provided login page renderer.
///
/// The broker owns the flow, not the markup. Implement this for your app's
/// template layer and pass it to
/// [`BrokerState::new`](super::BrokerState::new).
///
/// # Example
///
/// ```rust,ignore
/// struct MyLoginPage;
///
/// impl LoginView for MyLoginPage {
///     fn render(&self, ctx: &LoginContext) -> Html<String> {
///         Html(my_templates::login(ctx))
///     }
/// }
/// ```
pub trait LoginView: Send + Sync + 'static {
    fn render(&self, ctx: &LoginContext) -> Html<String>;
}
