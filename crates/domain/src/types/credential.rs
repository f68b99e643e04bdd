use serde::{Deserialize, Serialize};

/// OAuth access/refresh token pair for the single polled account.
///
/// Serialises to the on-disk layout `{"access_token": .., "refresh_token": ..}`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into(), refresh_token: refresh_token.into() }
    }

    /// Credential seeded from an operator-supplied refresh token. The access
    /// token is empty until the first exchange.
    pub fn from_refresh_token(refresh_token: impl Into<String>) -> Self {
        Self { access_token: String::new(), refresh_token: refresh_token.into() }
    }
}

// Tokens never reach logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &format_args!("<{} chars>", self.access_token.len()))
            .field("refresh_token", &format_args!("<{} chars>", self.refresh_token.len()))
            .finish()
    }
}
