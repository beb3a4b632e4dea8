use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Minimum length of any opaque gateway token.
pub const OPAQUE_TOKEN_MIN: usize = 16;
/// Maximum length of any opaque gateway token.
pub const OPAQUE_TOKEN_MAX: usize = 64;

/// Shape check applied to every opaque token the gateway issues.
///
/// The broker never interprets token contents; length is the only
/// client-side validation, the gateway does the real one.
#[must_use]
pub fn is_valid_opaque_token(s: &str) -> bool {
    (OPAQUE_TOKEN_MIN..=OPAQUE_TOKEN_MAX).contains(&s.len())
}

/// Opaque bearer token identifying a browser to the gateway, independent of
/// authentication status.
///
/// Guaranteed 16-64 characters by construction: holding a `SessionToken`
/// proves the shape check already passed, so no call site repeats it.
/// Carried in the secret (`httpOnly`) session cookie; the only trust anchor
/// among the three auth cookies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(try_from = "String", into = "String")]
pub struct SessionToken(String);

impl SessionToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for SessionToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl TryFrom<String> for SessionToken {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if is_valid_opaque_token(&s) {
            Ok(Self(s))
        } else {
            Err(Error::InvalidToken {
                kind: "session",
                len: s.len(),
            })
        }
    }
}

impl From<SessionToken> for String {
    fn from(t: SessionToken) -> Self {
        t.0
    }
}

/// Single-submission token proving the request originated from a page the
/// gateway itself authorized.
///
/// Same 16-64 character by-construction guarantee as [`SessionToken`];
/// single-use enforcement is the gateway's job, not the broker's.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(try_from = "String", into = "String")]
pub struct CsrfToken(String);

impl CsrfToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for CsrfToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl TryFrom<String> for CsrfToken {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if is_valid_opaque_token(&s) {
            Ok(Self(s))
        } else {
            Err(Error::InvalidToken {
                kind: "csrf",
                len: s.len(),
            })
        }
    }
}

impl From<CsrfToken> for String {
    fn from(t: CsrfToken) -> Self {
        t.0
    }
}
