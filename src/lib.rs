#![doc = include_str!("../README.md")]

pub mod claims;
pub mod error;
pub mod exchange;
pub mod gateway;
pub mod middleware;
pub mod token;

// Re-exports for convenient access
pub use claims::{AuthState, IdentityClaims, UxRender};
pub use error::Error;
pub use exchange::{ExchangeQuery, OauthExchange};
pub use gateway::{
    AnonymousSession, GatewayClient, GatewayConfig, LoginCallback, LoginCommand,
    TokenCallbackCommand,
};
pub use token::{
    CsrfToken, OPAQUE_TOKEN_MAX, OPAQUE_TOKEN_MIN, SessionToken, is_valid_opaque_token,
};
