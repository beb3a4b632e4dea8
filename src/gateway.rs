use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::exchange::OauthExchange;
use crate::token::{CsrfToken, SessionToken};

/// Identity gateway endpoint configuration.
///
/// Required fields are constructor parameters; every endpoint derives from
/// the base URL and can be overridden individually for split deployments.
///
/// TLS verification is part of this config, scoped to the one client built
/// from it, never a process-wide side effect.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct GatewayConfig {
    pub(crate) client_id: String,
    pub(crate) anonymous_session_url: Url,
    pub(crate) oauth_state_url: Url,
    pub(crate) csrf_url: Url,
    pub(crate) login_url: Url,
    pub(crate) token_callback_url: Url,
    pub(crate) accept_invalid_certs: bool,
}

fn endpoint(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    url.set_path(&format!("{}/{}", base.path().trim_end_matches('/'), path));
    url.set_query(None);
    url
}

impl GatewayConfig {
    #[must_use]
    pub fn new(base_url: &Url, client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            anonymous_session_url: endpoint(base_url, "session/anonymous"),
            oauth_state_url: endpoint(base_url, "oauth/state"),
            csrf_url: endpoint(base_url, "csrf/token"),
            login_url: endpoint(base_url, "login"),
            token_callback_url: endpoint(base_url, "oauth/token/callback"),
            accept_invalid_certs: false,
        }
    }

    #[must_use]
    pub fn with_anonymous_session_url(mut self, url: Url) -> Self {
        self.anonymous_session_url = url;
        self
    }

    #[must_use]
    pub fn with_oauth_state_url(mut self, url: Url) -> Self {
        self.oauth_state_url = url;
        self
    }

    #[must_use]
    pub fn with_csrf_url(mut self, url: Url) -> Self {
        self.csrf_url = url;
        self
    }

    #[must_use]
    pub fn with_login_url(mut self, url: Url) -> Self {
        self.login_url = url;
        self
    }

    #[must_use]
    pub fn with_token_callback_url(mut self, url: Url) -> Self {
        self.token_callback_url = url;
        self
    }

    /// Skip TLS certificate verification. Development environments only.
    #[must_use]
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

/// Anonymous session minted by the gateway for an unauthenticated visitor.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct AnonymousSession {
    pub session_token: SessionToken,
    pub authenticated: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct CsrfIssued {
    csrf_token: CsrfToken,
}

/// Login submission body. Assembled only after every pipeline gate passed.
#[derive(Debug, Clone, Serialize)]
pub struct LoginCommand {
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub response_type: String,
    pub state: String,
    pub nonce: String,
    pub redirect: String,
    pub session: String,
    pub csrf: String,
}

/// Gateway login success payload: a fresh authorization code plus the
/// echoed OAuth fields.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct LoginCallback {
    /// Sometimes echoed by the gateway. Parsed so unknown-field handling
    /// stays strict-friendly, but never trusted from this channel.
    #[serde(default)]
    pub session: Option<String>,
    pub auth_code: String,
    pub response_type: String,
    pub state: String,
    pub nonce: String,
    pub client_id: String,
    pub redirect: String,
}

impl LoginCallback {
    /// Browser-facing redirect completing the login round trip.
    ///
    /// Any echoed `session` is dropped here: the session cookie is the only
    /// channel a session token may travel through.
    #[must_use]
    pub fn callback_url(&self) -> String {
        format!(
            "/callback?client_id={}&response_type={}&auth_code={}&state={}&nonce={}&redirect_url={}",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.response_type),
            urlencoding::encode(&self.auth_code),
            urlencoding::encode(&self.state),
            urlencoding::encode(&self.nonce),
            urlencoding::encode(&self.redirect),
        )
    }
}

/// Body for forwarding an authorization code back to the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct TokenCallbackCommand {
    pub auth_code: String,
    pub response_type: String,
    pub state: String,
    pub nonce: String,
    pub client_id: String,
    pub redirect_url: String,
}

#[derive(Debug, Default, Deserialize)]
struct GatewayErrorBody {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the identity gateway.
///
/// Every call is a single attempt; failures surface immediately and the
/// caller re-runs the whole flow by re-rendering. No state is kept between
/// requests beyond the connection pool.
pub struct GatewayClient {
    config: GatewayConfig,
    http: reqwest::Client,
}

impl GatewayClient {
    /// Build a client for the configured gateway.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the underlying TLS backend cannot be
    /// initialized.
    pub fn new(config: GatewayConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;
        Ok(Self { config, http })
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Mint an anonymous session for a visitor without one. No credentials.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on transport failure or [`Error::Gateway`]
    /// on a structured rejection.
    pub async fn anonymous_session(&self) -> Result<AnonymousSession, Error> {
        debug!(url = %self.config.anonymous_session_url, "minting anonymous session");
        let response = self
            .http
            .post(self.config.anonymous_session_url.clone())
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        response.json::<AnonymousSession>().await.map_err(Into::into)
    }

    /// Mint a fresh OAuth exchange for a login attempt targeting
    /// `nav_endpoint`.
    ///
    /// The session is shape-valid by construction, so a degenerate token can
    /// never reach the network from here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on transport failure or [`Error::Gateway`]
    /// on a structured rejection. Any failure is fatal to rendering the
    /// login page; no partial exchange is ever returned.
    pub async fn oauth_state(
        &self,
        session: &SessionToken,
        nav_endpoint: &str,
    ) -> Result<OauthExchange, Error> {
        debug!(nav_endpoint, "requesting oauth exchange");
        let response = self
            .http
            .post(self.config.oauth_state_url.clone())
            .json(&json!({
                "session_token": session.as_str(),
                "nav_endpoint": nav_endpoint,
            }))
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        response.json::<OauthExchange>().await.map_err(Into::into)
    }

    /// Fetch a single-submission CSRF token for this session.
    ///
    /// Not cached: a fresh token is fetched for every render that needs one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on transport failure or [`Error::Gateway`]
    /// on a structured rejection.
    pub async fn csrf_token(&self, session: &SessionToken) -> Result<CsrfToken, Error> {
        debug!(url = %self.config.csrf_url, "requesting csrf token");
        let response = self
            .http
            .get(self.config.csrf_url.clone())
            .bearer_auth(session.as_str())
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        let issued = response.json::<CsrfIssued>().await?;
        Ok(issued.csrf_token)
    }

    /// Submit a login command.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Gateway`] with the gateway's `{code, message}` on
    /// rejection; the caller maps codes onto form fields.
    pub async fn login(&self, command: &LoginCommand) -> Result<LoginCallback, Error> {
        debug!(username = %command.username, client_id = %command.client_id, "submitting login");
        let response = self
            .http
            .post(self.config.login_url.clone())
            .json(command)
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        response.json::<LoginCallback>().await.map_err(Into::into)
    }

    /// Forward an authorization code back to the gateway. Success or
    /// failure only; the gateway returns no body worth keeping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on transport failure or [`Error::Gateway`]
    /// on a structured rejection.
    pub async fn token_callback(
        &self,
        session: &SessionToken,
        command: &TokenCallbackCommand,
    ) -> Result<(), Error> {
        debug!(client_id = %command.client_id, "forwarding authorization code");
        let response = self
            .http
            .post(self.config.token_callback_url.clone())
            .bearer_auth(session.as_str())
            .json(command)
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    /// Checks HTTP response status; decodes the gateway's structured error
    /// body on failure, falling back to the raw status and text.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<GatewayErrorBody>(&body) {
            Ok(parsed) => (parsed.code.unwrap_or(status), parsed.message.unwrap_or(body)),
            Err(_) => (status, body),
        };
        Err(Error::Gateway { code, message })
    }
}
