#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Structured rejection from the gateway (decoded error body, or the
    /// HTTP status when the body is not parseable).
    #[error("gateway error {code}: {message}")]
    Gateway { code: u16, message: String },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// Opaque token failed the 16-64 character shape check.
    #[error("invalid {kind} token length {len}: expected 16 to 64 characters")]
    InvalidToken { kind: &'static str, len: usize },
}
