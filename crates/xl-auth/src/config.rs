use std::time::Duration;

use url::Url;
use xl_game::ClientLanguage;

use crate::errors::Result;

/// Production endpoints
pub mod endpoints {
    pub const OAUTH: &str = "https://ffxiv-login.square-enix.com/oauth/ffxivarr/login/";
    pub const PATCH_GAMEVER: &str = "https://patch-gamever.ffxiv.com/";
    pub const PATCH_GAMEVER_TOKEN: &str = "http://patch-gamever.ffxiv.com/";
    pub const PATCH_BOOTVER: &str = "http://patch-bootver.ffxiv.com/";
    pub const FRONTIER: &str = "https://frontier.ffxiv.com/";
    pub const LAUNCHER_SITE: &str = "https://launcher.finalfantasyxiv.com/";
}

/// Patch server product identifiers
pub mod products {
    pub const BOOT: &str = "ffxivneo_release_boot";
    pub const GAME: &str = "ffxivneo_release_game";
}

/// Windows OAuth user agent up to the computer id; closed with `)`
pub const USER_AGENT_WINDOWS_PREFIX: &str = "SQEXAuthor/2.0.0(Windows 6.2; ja-jp; ";
pub const USER_AGENT_MAC: &str = "macSQEXAuthor/2.0.0(MacOSX; ja-jp)";
pub const PATCH_USER_AGENT_WINDOWS: &str = "FFXIV PATCH CLIENT";
pub const PATCH_USER_AGENT_MAC: &str = "FFXIV-MAC PATCH CLIENT";

/// Which official client the launcher presents itself as
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClientPlatform {
    #[default]
    Windows,
    /// Compatibility mode: impersonate the macOS client, no machine fingerprint
    Mac,
}

impl ClientPlatform {
    pub fn patch_user_agent(self) -> &'static str {
        match self {
            Self::Windows => PATCH_USER_AGENT_WINDOWS,
            Self::Mac => PATCH_USER_AGENT_MAC,
        }
    }
}

/// Base URLs of every service the launcher talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub oauth: Url,
    pub patch_gamever: Url,
    pub patch_gamever_token: Url,
    pub patch_bootver: Url,
    pub frontier: Url,
    pub launcher_site: Url,
}

impl Endpoints {
    pub fn retail() -> Result<Self> {
        Ok(Self {
            oauth: Url::parse(endpoints::OAUTH)?,
            patch_gamever: Url::parse(endpoints::PATCH_GAMEVER)?,
            patch_gamever_token: Url::parse(endpoints::PATCH_GAMEVER_TOKEN)?,
            patch_bootver: Url::parse(endpoints::PATCH_BOOTVER)?,
            frontier: Url::parse(endpoints::FRONTIER)?,
            launcher_site: Url::parse(endpoints::LAUNCHER_SITE)?,
        })
    }

    /// Every service rooted on a single host, keeping the retail paths
    pub fn with_base(base: &str) -> Result<Self> {
        let base = Url::parse(base)?;
        Ok(Self {
            oauth: base.join("oauth/ffxivarr/login/")?,
            patch_gamever: base.clone(),
            patch_gamever_token: base.clone(),
            patch_bootver: base.clone(),
            frontier: base.clone(),
            launcher_site: base,
        })
    }
}

/// Timeouts applied to every launcher HTTP client
#[derive(Debug, Clone)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(15),
            request: Duration::from_secs(30),
        }
    }
}

/// Configuration shared by the login components
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    pub endpoints: Endpoints,
    pub http_timeouts: HttpTimeouts,
    pub platform: ClientPlatform,
    /// Sent as `Accept-Language` on launcher pages
    pub accept_language: String,
    pub client_language: ClientLanguage,
    /// Region passed to the OAuth pages
    pub oauth_region: i32,
}

impl LauncherConfig {
    /// Config for the production services
    pub fn retail() -> Result<Self> {
        Ok(Self::new(Endpoints::retail()?))
    }

    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            endpoints,
            http_timeouts: HttpTimeouts::default(),
            platform: ClientPlatform::default(),
            accept_language: "en-us".to_string(),
            client_language: ClientLanguage::default(),
            oauth_region: 3,
        }
    }
}
