use std::time::Duration;

use anyhow::{bail, Context};
use pf_core::config::SupabaseConfig;
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use url::Url;

/// Sent on every request so the backend can attribute traffic.
pub const CLIENT_INFO: &str = "printforge-ai@1.0.0";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Thin HTTP client carrying the project URL and anon key.
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: Url,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> anyhow::Result<Self> {
        if config.anon_key.trim().is_empty() {
            bail!("Supabase anon key is empty");
        }
        let base_url = Url::parse(&config.url)
            .with_context(|| format!("Invalid Supabase URL: {}", config.url))?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url,
            anon_key: config.anon_key.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path)
    }

    /// Request with the project headers. Without a user token the anon key
    /// doubles as the bearer token.
    pub(crate) fn request(
        &self,
        method: Method,
        url: Url,
        bearer: Option<&str>,
    ) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .header("X-Client-Info", CLIENT_INFO)
            .bearer_auth(bearer.unwrap_or(&self.anon_key))
    }
}

/// Error payloads differ between GoTrue versions and PostgREST; collect the
/// fields any of them use.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub(crate) async fn read(response: reqwest::Response) -> (u16, ErrorBody) {
        let status = response.status();
        let body = response.json::<ErrorBody>().await.unwrap_or_default();
        (status.as_u16(), body)
    }

    pub(crate) fn has_code(&self, expected: &str) -> bool {
        self.error.as_deref() == Some(expected)
            || self.error_code.as_deref() == Some(expected)
            || self
                .code
                .as_ref()
                .and_then(serde_json::Value::as_str)
                .is_some_and(|code| code == expected)
    }

    pub(crate) fn into_message(self, status: u16) -> String {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
            .unwrap_or_else(|| format!("request failed with status {status}"))
    }
}
