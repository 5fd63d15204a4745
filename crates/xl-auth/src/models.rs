use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::patch_list::PatchListEntry;

/// How long a cached unique id is trusted
pub const IDENTITY_TTL: Duration = Duration::days(1);

/// Session facts scraped from a successful OAuth login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OauthResult {
    pub session_id: String,
    pub region: i32,
    pub terms_accepted: bool,
    pub playable: bool,
    pub max_expansion: u32,
}

/// Classified result of a login attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoginState {
    #[default]
    Unknown,
    Ok,
    NeedsPatchGame,
    NeedsPatchBoot,
    NoOAuth,
    NoService,
    NoTerms,
}

/// Terminal value of [`crate::Launcher::login`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub state: LoginState,
    /// Populated only for [`LoginState::NeedsPatchGame`]
    pub pending_patches: Option<Vec<PatchListEntry>>,
    pub oauth: OauthResult,
    pub unique_id: Option<String>,
}

/// Result of registering a session with the game version service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub unique_id: Option<String>,
    pub state: LoginState,
    pub pending_patches: Option<Vec<PatchListEntry>>,
}

/// A previously issued unique id, cached per user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub user_key: String,
    pub session_unique_id: String,
    pub region: i32,
    pub max_expansion: u32,
    pub issued_at: DateTime<Utc>,
}

impl Identity {
    pub fn new(
        user_key: impl Into<String>,
        session_unique_id: impl Into<String>,
        region: i32,
        max_expansion: u32,
    ) -> Self {
        Self {
            user_key: user_key.into(),
            session_unique_id: session_unique_id.into(),
            region,
            max_expansion,
            issued_at: Utc::now(),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.issued_at > IDENTITY_TTL
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.session_unique_id.is_empty() && !self.is_expired_at(now)
    }

    /// The OAuth facts implied by a cached identity. A cached registration is
    /// trusted to still be playable with accepted terms.
    pub fn to_oauth_result(&self) -> OauthResult {
        OauthResult {
            session_id: String::new(),
            region: self.region,
            terms_accepted: true,
            playable: true,
            max_expansion: self.max_expansion,
        }
    }
}
