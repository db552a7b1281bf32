use tracing::warn;

use super::AccessToken;

/// Credentials presented by a database client.
///
/// Holds exactly one access token. There is no refresh: once the token has
/// expired it is still sent as-is, which the emulator accepts.
#[derive(Debug, Clone)]
pub struct Credentials {
    token: AccessToken,
}

impl Credentials {
    pub fn from_access_token(token: AccessToken) -> Self {
        Self { token }
    }

    /// Credentials carrying a freshly fabricated emulator token.
    pub fn for_emulator() -> Self {
        Self::from_access_token(AccessToken::for_emulator())
    }

    pub fn access_token(&self) -> &AccessToken {
        &self.token
    }

    /// Token value for the `Authorization: Bearer` header.
    pub fn bearer_token(&self) -> &str {
        if self.token.is_expired() {
            warn!(expired_at = %self.token.expires_at, "Sending expired access token");
        }
        &self.token.token
    }
}
