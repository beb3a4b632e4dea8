use serde::{Deserialize, Serialize};

/// Shortest `redirect_url` the broker accepts; true allow-list validation is
/// the gateway's responsibility.
const REDIRECT_URL_MIN: usize = 8;

/// One login attempt's correlation tuple, minted by the gateway's OAuth
/// state endpoint and carried across the login round trip.
///
/// All five login-relevant fields must be present and non-degenerate before
/// a submission is accepted; a partially populated exchange is invalid,
/// never "optional".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OauthExchange {
    pub response_type: String,
    pub state: String,
    pub nonce: String,
    pub client_id: String,
    pub redirect_url: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<time::OffsetDateTime>,
}

impl OauthExchange {
    /// Name of the first missing or degenerate field, if any.
    #[must_use]
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.response_type.is_empty() {
            return Some("response_type");
        }
        if self.state.is_empty() {
            return Some("state");
        }
        if self.nonce.is_empty() {
            return Some("nonce");
        }
        if self.client_id.is_empty() {
            return Some("client_id");
        }
        if self.redirect_url.len() < REDIRECT_URL_MIN {
            return Some("redirect_url");
        }
        None
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_field().is_none()
    }

    /// Query string that pre-populates the login page with this exchange,
    /// so re-renders continue the in-flight attempt instead of minting a
    /// fresh `state`/`nonce` pair.
    #[must_use]
    pub fn login_query(&self) -> String {
        format!(
            "client_id={}&response_type={}&state={}&nonce={}&redirect_url={}",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.response_type),
            urlencoding::encode(&self.state),
            urlencoding::encode(&self.nonce),
            urlencoding::encode(&self.redirect_url),
        )
    }
}

/// The all-optional query-string mirror of the five exchange fields.
///
/// Reuse-or-refresh policy: when a page already carries every field, callers
/// treat it as a continuation of an in-flight exchange and skip the broker;
/// only an incomplete query triggers a fresh mint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExchangeQuery {
    pub client_id: Option<String>,
    pub response_type: Option<String>,
    pub state: Option<String>,
    pub nonce: Option<String>,
    pub redirect_url: Option<String>,
}

impl ExchangeQuery {
    /// `Some` only when every field is present and sound, reusing the
    /// carried values verbatim.
    #[must_use]
    pub fn complete(&self) -> Option<OauthExchange> {
        let exchange = OauthExchange {
            response_type: self.response_type.clone()?,
            state: self.state.clone()?,
            nonce: self.nonce.clone()?,
            client_id: self.client_id.clone()?,
            redirect_url: self.redirect_url.clone()?,
            created_at: None,
        };
        exchange.is_complete().then_some(exchange)
    }
}
