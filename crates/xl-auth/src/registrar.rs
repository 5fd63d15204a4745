use std::path::Path;

use chrono::Utc;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument};
use url::Url;
use xl_game::{BASE_GAME_VERSION, Repository, version_report};

use crate::config::{LauncherConfig, products};
use crate::errors::{Result, XlAuthError};
use crate::http::{build_client, ensure_success};
use crate::models::{LoginState, OauthResult, Registration};
use crate::patch_list::{self, PatchListEntry};

pub const UNIQUE_ID_HEADER: &str = "X-Patch-Unique-Id";

/// Registers an authenticated session with the game version service
#[async_trait::async_trait]
pub trait SessionRegistrar: Send + Sync {
    async fn register(
        &self,
        oauth: &OauthResult,
        game_path: &Path,
        force_base_version: bool,
    ) -> Result<Registration>;
}

fn unique_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(UNIQUE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Turns a game version response into a [`Registration`].
///
/// 409 means the boot component is outdated and nothing else is possible;
/// otherwise the unique id header is mandatory and a non-empty body is the
/// list of pending game patches.
pub fn classify_registration(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
) -> Result<Registration> {
    if status == StatusCode::CONFLICT {
        return Ok(Registration {
            unique_id: None,
            state: LoginState::NeedsPatchBoot,
            pending_patches: None,
        });
    }

    let uid = unique_id(headers).ok_or_else(|| {
        XlAuthError::InvalidResponse(format!(
            "Could not get {} (status {})",
            UNIQUE_ID_HEADER, status
        ))
    })?;

    if body.is_empty() {
        return Ok(Registration {
            unique_id: Some(uid),
            state: LoginState::Ok,
            pending_patches: None,
        });
    }

    Ok(Registration {
        unique_id: Some(uid),
        state: LoginState::NeedsPatchGame,
        pending_patches: Some(patch_list::parse(body)?),
    })
}

/// Client for the patch version services
#[derive(Debug, Clone)]
pub struct PatchServerClient {
    config: LauncherConfig,
    http: Client,
}

impl PatchServerClient {
    pub fn new(config: LauncherConfig) -> Result<Self> {
        let http = build_client(&config.http_timeouts, config.platform.patch_user_agent())?;
        Ok(Self { config, http })
    }

    fn gamever_url(&self, game_version: &str, session_id: &str) -> Result<Url> {
        let path = format!(
            "http/win32/{}/{}/{}",
            products::GAME,
            game_version,
            session_id
        );
        Ok(self.config.endpoints.patch_gamever.join(&path)?)
    }

    /// Asks the boot version service for pending boot patches.
    ///
    /// An empty reply means the boot component is current.
    #[instrument(skip(self))]
    pub async fn check_boot_version(&self, game_path: &Path) -> Result<Option<Vec<PatchListEntry>>> {
        let boot_ver = Repository::Boot.get_ver(game_path).await?;
        let endpoint = &self.config.endpoints.patch_bootver;
        let mut url = endpoint.join(&format!("http/win32/{}/{}/", products::BOOT, boot_ver))?;
        url.query_pairs_mut()
            .append_pair("time", &Utc::now().format("%Y-%m-%d-%H-%M").to_string());

        let mut request = self.http.get(url);
        if let Some(host) = endpoint.host_str() {
            let host = match endpoint.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host.to_string(),
            };
            request = request.header("Host", host);
        }

        debug!("Checking boot version {}", boot_ver);
        let response = ensure_success(request.send().await?).await?;
        let text = response.text().await?;

        if text.is_empty() {
            return Ok(None);
        }

        info!("Boot patching is needed");
        Ok(Some(patch_list::parse(&text)?))
    }

    /// Exchanges a patch URL for a download token bound to the unique id
    #[instrument(skip(self, unique_id))]
    pub async fn gen_patch_token(&self, patch_url: &str, unique_id: &str) -> Result<String> {
        let url = self.config.endpoints.patch_gamever_token.join("gen_token")?;

        let response = self
            .http
            .post(url)
            .header(UNIQUE_ID_HEADER, unique_id)
            .body(patch_url.to_string())
            .send()
            .await?;

        Ok(ensure_success(response).await?.text().await?)
    }
}

#[async_trait::async_trait]
impl SessionRegistrar for PatchServerClient {
    #[instrument(skip(self, oauth))]
    async fn register(
        &self,
        oauth: &OauthResult,
        game_path: &Path,
        force_base_version: bool,
    ) -> Result<Registration> {
        let game_version = if force_base_version {
            BASE_GAME_VERSION.to_string()
        } else {
            Repository::Ffxiv.get_ver(game_path).await?
        };
        let report = version_report(game_path, oauth.max_expansion, force_base_version).await?;

        debug!("Registering session for game version {}", game_version);
        let response = self
            .http
            .post(self.gamever_url(&game_version, &oauth.session_id)?)
            .header("X-Hash-Check", "enabled")
            .body(report)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        let registration = classify_registration(status, &headers, &body)?;
        info!("Session registration result: {:?}", registration.state);
        Ok(registration)
    }
}
