//! Plug-and-play session and OAuth exchange broker for axum front ends.
//!
//! This module eliminates the session/CSRF/OAuth boilerplate for portals
//! that delegate authentication to an external identity gateway.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use portal_auth::middleware::{BrokerConfig, BrokerState, auth_routes, bootstrap_session};
//!
//! // 1. Implement LoginView for your template layer
//! // 2. Configure from environment
//! let config = BrokerConfig::from_env()?;
//! let state = BrokerState::new(config, MyLoginPage);
//!
//! // 3. Mount the auth routes and the bootstrap middleware
//! let app = axum::Router::new()
//!     .merge(auth_routes(state.clone()))
//!     .layer(axum::middleware::from_fn_with_state(state, bootstrap_session));
//!
//! // 4. Guard protected pages
//! let identity = require_authenticated(&state, &jar, "/albums").await?;
//! require_permission(&identity.claims, "albums")?;
//!
//! // 5. After your app fetches the user's claims post-login, persist them
//! //    with [`identity_cookie`]; the broker reads that cookie but the
//! //    claims payload comes from your gateway integration, not from here.
//! let jar = jar.add(identity_cookie("identity", &claims, true)?);
//! ```

mod bootstrap;
mod config;
mod cookies;
mod error;
mod guard;
mod login;
mod routes;
mod state;
mod traits;

pub use bootstrap::bootstrap_session;
pub use config::BrokerConfig;
pub use cookies::identity_cookie;
pub use error::{AuthError, FieldErrors, SERVER_BUCKET};
pub use guard::{Identity, require_authenticated, require_permission, require_session};
pub use login::LoginForm;
pub use routes::auth_routes;
pub use state::BrokerState;
pub use traits::{LoginContext, LoginView};
