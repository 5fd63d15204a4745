use reqwest::{Client, Response};

use crate::config::HttpTimeouts;
use crate::errors::{Result, XlAuthError};

/// Browser-like Accept header the official launcher sends to its web pages
pub(crate) const LAUNCHER_ACCEPT: &str = "image/gif, image/jpeg, image/pjpeg, application/x-ms-application, application/xaml+xml, application/x-ms-xbap, */*";

pub(crate) fn build_client(timeouts: &HttpTimeouts, user_agent: &str) -> Result<Client> {
    let http = Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.request)
        .user_agent(user_agent)
        .build()?;
    Ok(http)
}

/// Fails with [`XlAuthError::Http`] on a non-2xx status, keeping a body snippet
pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(XlAuthError::Http {
        status,
        body_snippet: body.chars().take(200).collect(),
    })
}
