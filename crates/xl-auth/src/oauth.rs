//! Scripted login against the account web front-end.
//!
//! The login pages are HTML meant for the official launcher's embedded
//! browser, not an API. Everything that depends on their markup lives in
//! [`parse_stored`] and [`parse_login_reply`].

use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;
use zeroize::Zeroizing;

use crate::config::LauncherConfig;
use crate::errors::{Result, XlAuthError};
use crate::fingerprint::{MachineFingerprint, oauth_user_agent};
use crate::frontier::frontier_referer;
use crate::http::{LAUNCHER_ACCEPT, build_client};
use crate::models::OauthResult;

const STORED_MARKER: &str = "name=\"_STORED_\" value=\"";
const LOGIN_OK_MARKER: &str = "window.external.user(\"login=auth,ok,";
const EMPTY_RSID_COOKIE: &str = "_rsid=\"\"";

/// Account credentials for one login attempt
#[derive(Clone)]
pub struct Credentials {
    pub user_name: String,
    pub password: Zeroizing<String>,
    pub otp: String,
}

impl Credentials {
    pub fn new(
        user_name: impl Into<String>,
        password: impl Into<String>,
        otp: impl Into<String>,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            password: Zeroizing::new(password.into()),
            otp: otp.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user_name", &self.user_name)
            .field("password", &"[REDACTED]")
            .field("otp", &"[REDACTED]")
            .finish()
    }
}

/// Performs the OAuth login and yields the session facts
#[async_trait::async_trait]
pub trait OauthTransport: Send + Sync {
    async fn login(
        &self,
        credentials: &Credentials,
        is_steam: bool,
        region: i32,
    ) -> Result<OauthResult>;
}

/// Extracts the hidden `_STORED_` form token from the login top page
pub fn parse_stored(html: &str) -> Result<String> {
    html.lines()
        .find_map(|line| {
            let start = line.find(STORED_MARKER)? + STORED_MARKER.len();
            let rest = &line[start..];
            let end = rest.rfind("\">")?;
            Some(rest[..end].to_string())
        })
        .ok_or_else(|| XlAuthError::InvalidResponse("Could not get _STORED_".to_string()))
}

fn field<'a>(params: &[&'a str], index: usize, name: &str) -> Result<&'a str> {
    params.get(index).copied().ok_or_else(|| {
        XlAuthError::InvalidResponse(format!("Login reply is missing {} (field {})", name, index))
    })
}

fn numeric_field<T: std::str::FromStr>(params: &[&str], index: usize, name: &str) -> Result<T> {
    let raw = field(params, index, name)?;
    raw.parse().map_err(|_| {
        XlAuthError::InvalidResponse(format!("Login reply {} is not a number: {:?}", name, raw))
    })
}

/// Parses the `window.external.user("login=auth,ok,...")` callback.
///
/// The payload is a flat comma separated list read by position:
///
/// | index | meaning                          |
/// |-------|----------------------------------|
/// | 1     | session id                       |
/// | 3     | terms accepted (`0` = no)        |
/// | 5     | region                           |
/// | 9     | playable (`0` = no)              |
/// | 13    | max expansion level              |
///
/// A reply without the callback is an [`XlAuthError::OauthLoginFailure`]
/// carrying the full reply; a callback with missing or malformed fields is an
/// [`XlAuthError::InvalidResponse`].
pub fn parse_login_reply(reply: &str) -> Result<OauthResult> {
    let failure = || XlAuthError::OauthLoginFailure {
        reply: reply.to_string(),
    };

    let start = reply.find(LOGIN_OK_MARKER).ok_or_else(failure)? + LOGIN_OK_MARKER.len();
    let line = reply[start..].lines().next().unwrap_or_default();
    let end = line.rfind(");").ok_or_else(failure)?;

    let params: Vec<&str> = line[..end].split(',').collect();

    Ok(OauthResult {
        session_id: field(&params, 1, "session id")?.to_string(),
        terms_accepted: field(&params, 3, "terms flag")? != "0",
        region: numeric_field(&params, 5, "region")?,
        playable: field(&params, 9, "playable flag")? != "0",
        max_expansion: numeric_field(&params, 13, "max expansion")?,
    })
}

/// [`OauthTransport`] that scrapes the retail login pages
#[derive(Debug, Clone)]
pub struct WebOauthClient {
    config: LauncherConfig,
    http: Client,
}

impl WebOauthClient {
    /// Create a login client; the user agent is fixed for the client's lifetime
    pub fn new(config: LauncherConfig) -> Result<Self> {
        let user_agent = oauth_user_agent(config.platform, MachineFingerprint::from_system);
        let http = build_client(&config.http_timeouts, &user_agent)?;
        Ok(Self { config, http })
    }

    pub fn top_url(&self, region: i32, is_steam: bool) -> Result<Url> {
        let mut url = self.config.endpoints.oauth.join("top")?;
        url.query_pairs_mut()
            .append_pair("lng", "en")
            .append_pair("rgn", &region.to_string())
            .append_pair("isft", "0")
            .append_pair("cssmode", "1")
            .append_pair("isnew", "1")
            .append_pair("launchver", "3");

        if is_steam {
            url.query_pairs_mut().append_pair("issteam", "1");
        }

        Ok(url)
    }

    /// Fetch the login top page and scrape its `_STORED_` token
    #[instrument(skip(self))]
    pub async fn get_stored(&self, is_steam: bool, region: i32) -> Result<String> {
        let referer = frontier_referer(&self.config, self.config.client_language)?;

        debug!("Fetching OAuth top page");
        let response = self
            .http
            .get(self.top_url(region, is_steam)?)
            .header("Accept", LAUNCHER_ACCEPT)
            .header("Referer", referer.as_str())
            .header("Accept-Language", &self.config.accept_language)
            .header("Cookie", EMPTY_RSID_COOKIE)
            .send()
            .await?;
        let text = response.text().await?;

        parse_stored(&text)
    }
}

#[async_trait::async_trait]
impl OauthTransport for WebOauthClient {
    #[instrument(skip(self, credentials))]
    async fn login(
        &self,
        credentials: &Credentials,
        is_steam: bool,
        region: i32,
    ) -> Result<OauthResult> {
        let stored = self.get_stored(is_steam, region).await?;
        let url = self.config.endpoints.oauth.join("login.send")?;

        let form = [
            ("_STORED_", stored.as_str()),
            ("sqexid", credentials.user_name.as_str()),
            ("password", credentials.password.as_str()),
            ("otppw", credentials.otp.as_str()),
        ];

        debug!("Submitting OAuth credentials");
        let response = self
            .http
            .post(url)
            .header("Accept", LAUNCHER_ACCEPT)
            .header("Referer", self.top_url(region, is_steam)?.as_str())
            .header("Accept-Language", &self.config.accept_language)
            .header("Cache-Control", "no-cache")
            .header("Cookie", EMPTY_RSID_COOKIE)
            .form(&form)
            .send()
            .await?;
        let reply = response.text().await?;

        let result = parse_login_reply(&reply)?;
        debug!(
            "OAuth login accepted - playable:{} terms:{} region:{} expack:{}",
            result.playable, result.terms_accepted, result.region, result.max_expansion
        );
        Ok(result)
    }
}
