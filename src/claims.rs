use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::token::SessionToken;

/// Flat permission-rendering matrix: booleans keyed by feature area.
///
/// Purely decides what UI to show. The gateway re-checks permissions on
/// every mutating call regardless of what the UI renders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UxRender(BTreeMap<String, bool>);

impl UxRender {
    /// Whether the UI for `feature` should render. Unknown features are off.
    #[must_use]
    pub fn allows(&self, feature: &str) -> bool {
        self.0.get(feature).copied().unwrap_or(false)
    }

    pub fn set(&mut self, feature: impl Into<String>, allowed: bool) {
        self.0.insert(feature.into(), allowed);
    }
}

impl FromIterator<(String, bool)> for UxRender {
    fn from_iter<I: IntoIterator<Item = (String, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// UI-facing description of the logged-in user, stored JSON-encoded in the
/// script-readable `identity` cookie.
///
/// Not an authorization source of truth: the cookie is attacker-writable,
/// so these claims only drive rendering decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub username: String,
    pub given_name: String,
    pub family_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthdate: Option<String>,
    #[serde(default)]
    pub ux_render: UxRender,
}

/// Client-visible auth state, derived from cookie presence at a single
/// decode boundary instead of scattering `jar.get(...)` checks per page.
///
/// Only the session token inside is a trust anchor; the claims arm exists
/// for UI branching and the gateway independently authorizes every
/// protected operation.
#[derive(Debug, Clone)]
pub enum AuthState {
    /// No usable session cookie.
    Anonymous,
    /// Session established, visitor not logged in.
    SessionOnly(SessionToken),
    /// Session plus identity claims from a completed login.
    Authenticated {
        session: SessionToken,
        claims: IdentityClaims,
    },
}

impl AuthState {
    #[must_use]
    pub fn session(&self) -> Option<&SessionToken> {
        match self {
            Self::Anonymous => None,
            Self::SessionOnly(session) | Self::Authenticated { session, .. } => Some(session),
        }
    }

    #[must_use]
    pub fn claims(&self) -> Option<&IdentityClaims> {
        match self {
            Self::Authenticated { claims, .. } => Some(claims),
            _ => None,
        }
    }
}
