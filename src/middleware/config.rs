use url::Url;

use super::error::AuthError;
use crate::gateway::{GatewayClient, GatewayConfig};

/// Shared broker settings used by both config and runtime state.
#[derive(Clone)]
pub(crate) struct BrokerSettings {
    pub(crate) session_cookie_name: String,
    pub(crate) authenticated_cookie_name: String,
    pub(crate) identity_cookie_name: String,
    pub(crate) secure_cookies: bool,
    pub(crate) login_path: String,
    pub(crate) logout_redirect: String,
}

impl BrokerSettings {
    fn defaults() -> Self {
        Self {
            session_cookie_name: "session_id".into(),
            authenticated_cookie_name: "authenticated".into(),
            identity_cookie_name: "identity".into(),
            secure_cookies: true,
            login_path: "/login".into(),
            logout_redirect: "/".into(),
        }
    }
}

/// Broker configuration.
///
/// The required field (`gateway`) is a constructor parameter; everything
/// else has defaults overridable with `with_*` methods. Use
/// [`from_env()`](BrokerConfig::from_env) for convention-based setup.
pub struct BrokerConfig {
    pub(super) gateway: GatewayClient,
    pub(super) settings: BrokerSettings,
}

impl BrokerConfig {
    #[must_use]
    pub fn new(gateway: GatewayClient) -> Self {
        Self {
            gateway,
            settings: BrokerSettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `GATEWAY_URL`: base URL of the identity gateway
    /// - `GATEWAY_CLIENT_ID`: relying-application client id
    ///
    /// # Optional env vars
    /// - `GATEWAY_ACCEPT_INVALID_CERTS`: `"1"` or `"true"` to skip TLS
    ///   verification for the gateway client (development only)
    /// - `INSECURE_COOKIES`: `"1"` or `"true"` to drop the `Secure` cookie
    ///   flag for plain-HTTP development
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if required env vars are missing, the
    /// URL is invalid, or the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, AuthError> {
        let gateway_url = std::env::var("GATEWAY_URL")
            .map_err(|_| AuthError::Config("GATEWAY_URL is required".into()))?;
        let gateway_url: Url = gateway_url
            .parse()
            .map_err(|e| AuthError::Config(format!("GATEWAY_URL: {e}")))?;
        let client_id = std::env::var("GATEWAY_CLIENT_ID")
            .map_err(|_| AuthError::Config("GATEWAY_CLIENT_ID is required".into()))?;

        let accept_invalid_certs = matches!(
            std::env::var("GATEWAY_ACCEPT_INVALID_CERTS").as_deref(),
            Ok("1") | Ok("true")
        );
        let insecure_cookies = matches!(
            std::env::var("INSECURE_COOKIES").as_deref(),
            Ok("1") | Ok("true")
        );

        let config = GatewayConfig::new(&gateway_url, client_id)
            .with_accept_invalid_certs(accept_invalid_certs);
        let gateway =
            GatewayClient::new(config).map_err(|e| AuthError::Config(e.to_string()))?;

        Ok(Self::new(gateway).with_secure_cookies(!insecure_cookies))
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.session_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_authenticated_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.authenticated_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_identity_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.identity_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.settings.login_path = path.into();
        self
    }

    #[must_use]
    pub fn with_logout_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.logout_redirect = path.into();
        self
    }
}
