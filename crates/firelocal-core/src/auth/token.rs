use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Token string handed to the emulator. It is never checked.
pub const EMULATOR_TOKEN: &str = "emulator-does-not-support-authentication";

/// Lifetime of the fabricated token in hours.
const TOKEN_LIFETIME_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, created_at: DateTime<Utc>, lifetime: Duration) -> Self {
        Self {
            token: token.into(),
            created_at,
            expires_at: created_at + lifetime,
        }
    }

    /// Fabricate the emulator token, valid for one day from now.
    pub fn for_emulator() -> Self {
        Self::for_emulator_at(Utc::now())
    }

    pub fn for_emulator_at(created_at: DateTime<Utc>) -> Self {
        Self::new(
            EMULATOR_TOKEN,
            created_at,
            Duration::hours(TOKEN_LIFETIME_HOURS),
        )
    }

    pub fn lifetime(&self) -> Duration {
        self.expires_at - self.created_at
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at - Utc::now()
    }

    /// Get hours remaining until expiry (for display)
    pub fn hours_until_expiry(&self) -> i64 {
        self.time_until_expiry().num_hours().max(0)
    }
}
