use anyhow::Context;
use tracing::warn;

use crate::error::AppError;

const API_BASE: &str = "https://api.github.com";

/// Thin client for the public repository listing. The upstream is a black
/// box here: anything but a success status is reported as profile-not-found.
#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(token: Option<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("devconnect/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building github http client")?;
        Ok(Self { http, token })
    }

    /// Five most recently created public repos for `username`, forwarded as
    /// the upstream's own JSON.
    pub async fn repos(&self, username: &str) -> Result<Vec<serde_json::Value>, AppError> {
        let url = format!("{API_BASE}/users/{username}/repos");
        let mut req = self
            .http
            .get(url)
            .query(&[("per_page", "5"), ("sort", "created:asc")]);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|e| {
            warn!(error = %e, "github request failed");
            AppError::Upstream("No Github profile was found")
        })?;
        if !resp.status().is_success() {
            return Err(AppError::Upstream("No Github profile was found"));
        }
        resp.json().await.map_err(|e| AppError::Internal(e.into()))
    }
}
