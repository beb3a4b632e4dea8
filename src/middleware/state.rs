use std::sync::Arc;

use axum_extra::extract::CookieJar;

use super::config::{BrokerConfig, BrokerSettings};
use super::cookies;
use super::traits::LoginView;
use crate::claims::AuthState;
use crate::gateway::GatewayClient;

/// Shared state for the broker's middleware and route handlers.
#[derive(Clone)]
pub struct BrokerState {
    pub(super) gateway: Arc<GatewayClient>,
    pub(super) view: Arc<dyn LoginView>,
    pub(super) settings: BrokerSettings,
}

impl BrokerState {
    #[must_use]
    pub fn new(config: BrokerConfig, view: impl LoginView) -> Self {
        Self {
            gateway: Arc::new(config.gateway),
            view: Arc::new(view),
            settings: config.settings,
        }
    }

    #[must_use]
    pub fn gateway(&self) -> &GatewayClient {
        &self.gateway
    }

    /// Decode the three-cookie bundle into a tagged auth state.
    ///
    /// The single place cookie presence turns into a state value; pages
    /// branch on the variant instead of poking at the jar.
    #[must_use]
    pub fn auth_state(&self, jar: &CookieJar) -> AuthState {
        cookies::auth_state(jar, &self.settings)
    }
}
