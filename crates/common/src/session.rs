//! Session lifecycle types.
//!
//! A client moves through three stages: no credentials at all
//! ([`AuthState::Unauthenticated`]), an installation token after the key pair
//! has been registered ([`AuthState::Bootstrapped`]), and a user session
//! ([`AuthState::SessionActive`]). Installation-token calls never consult the
//! session, which is what lets session establishment run through the same
//! signed pipeline without recursing into itself.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use error_stack::Report;

use crate::constants::SESSION_GRACE_PERIOD;
use crate::error::BunqError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Bootstrapped,
    SessionActive,
}

/// Which token authenticates a signed request.
#[derive(Debug, Clone, Copy)]
pub enum Credential<'a> {
    /// Installation-level token, sent verbatim. Used for device registration
    /// and session establishment.
    Bootstrap(&'a str),
    /// The current user session, renewed first if stale.
    Session,
}

/// An authenticated user session.
///
/// Never mutated after construction; renewal swaps in a new value.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionState {
    owner_id: i64,
    token: String,
    expires_at: DateTime<Utc>,
}

impl SessionState {
    #[must_use]
    pub fn new(owner_id: i64, token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            owner_id,
            token: token.into(),
            expires_at,
        }
    }

    /// Session expiring `timeout_secs` from now, as reported by session-server.
    ///
    /// # Errors
    ///
    /// Returns [`BunqError::MalformedEnvelope`] if the expiry is not a
    /// representable timestamp.
    pub fn from_timeout(
        owner_id: i64,
        token: impl Into<String>,
        timeout_secs: i64,
    ) -> Result<Self, Report<BunqError>> {
        let expires_at = ChronoDuration::try_seconds(timeout_secs)
            .and_then(|timeout| Utc::now().checked_add_signed(timeout))
            .ok_or_else(|| {
                Report::new(BunqError::MalformedEnvelope {
                    message: format!("session_timeout {timeout_secs} is out of range"),
                })
            })?;
        Ok(Self::new(owner_id, token, expires_at))
    }

    #[must_use]
    pub fn owner_id(&self) -> i64 {
        self.owner_id
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True while the session outlives the grace window.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let grace = ChronoDuration::from_std(SESSION_GRACE_PERIOD).unwrap_or(ChronoDuration::zero());
        now + grace < self.expires_at
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("owner_id", &self.owner_id)
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
