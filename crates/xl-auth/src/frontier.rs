use chrono::Utc;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;
use xl_game::ClientLanguage;

use crate::config::LauncherConfig;
use crate::errors::{Result, XlAuthError};
use crate::fingerprint::{MachineFingerprint, oauth_user_agent};
use crate::http::{build_client, ensure_success};

/// Offset of the status digit in `{"status":N}`
const GATE_STATUS_OFFSET: usize = 10;

/// Referer of the official launcher's embedded news page
pub fn frontier_referer(config: &LauncherConfig, language: ClientLanguage) -> Result<Url> {
    let mut url = config.endpoints.launcher_site.join("v600/index.html")?;
    url.query_pairs_mut()
        .append_pair("rc_lang", language.lang_code())
        .append_pair("time", &Utc::now().format("%Y-%m-%d-%H").to_string());
    Ok(url)
}

/// Reads `0`/`1` at the fixed status offset of a gate status body
pub fn parse_gate_status(body: &str) -> Result<bool> {
    match body.as_bytes().get(GATE_STATUS_OFFSET) {
        Some(b'0') => Ok(false),
        Some(b'1') => Ok(true),
        _ => Err(XlAuthError::InvalidResponse(format!(
            "Gate status flag missing at offset {}: {:?}",
            GATE_STATUS_OFFSET,
            body.chars().take(64).collect::<String>()
        ))),
    }
}

/// Client for the launcher's frontier pages
#[derive(Debug, Clone)]
pub struct FrontierClient {
    config: LauncherConfig,
    http: Client,
}

impl FrontierClient {
    pub fn new(config: LauncherConfig) -> Result<Self> {
        let user_agent = oauth_user_agent(config.platform, MachineFingerprint::from_system);
        let http = build_client(&config.http_timeouts, &user_agent)?;
        Ok(Self { config, http })
    }

    /// Whether the login gate is open
    #[instrument(skip(self))]
    pub async fn gate_status(&self) -> Result<bool> {
        let mut url = self
            .config
            .endpoints
            .frontier
            .join("worldStatus/gate_status.json")?;
        url.set_query(Some(&Utc::now().timestamp_millis().to_string()));

        let referer = frontier_referer(&self.config, ClientLanguage::English)?;
        let origin = self.config.endpoints.launcher_site.origin().ascii_serialization();

        debug!("Fetching gate status");
        let response = self
            .http
            .get(url)
            .header("Accept-Language", &self.config.accept_language)
            .header("Origin", origin)
            .header("Referer", referer.as_str())
            .send()
            .await?;
        let body = ensure_success(response).await?.text().await?;

        parse_gate_status(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Endpoints;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_gate_status() {
        assert!(parse_gate_status("{\"status\":1}").unwrap());
        assert!(!parse_gate_status("{\"status\":0}").unwrap());
        assert!(parse_gate_status("{\"status\":").is_err());
        assert!(parse_gate_status("{\"status\":x}").is_err());
    }

    #[test]
    fn test_frontier_referer() {
        let config = LauncherConfig::retail().unwrap();
        let referer = frontier_referer(&config, ClientLanguage::Japanese).unwrap();

        assert!(referer
            .as_str()
            .starts_with("https://launcher.finalfantasyxiv.com/v600/index.html?rc_lang=ja&time="));
    }

    #[tokio::test]
    async fn test_gate_status_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/worldStatus/gate_status.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"status\":1}"))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = LauncherConfig::new(Endpoints::with_base(&server.uri()).unwrap());
        config.platform = crate::config::ClientPlatform::Mac;
        let client = FrontierClient::new(config).unwrap();

        assert!(client.gate_status().await.unwrap());
    }
}
