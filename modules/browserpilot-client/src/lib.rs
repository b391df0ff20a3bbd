pub mod error;

pub use error::{PilotError, Result};

use std::time::Duration;

use rand::prelude::IndexedRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Browser identities the sidecar can impersonate. One is chosen per session
/// so repeated runs don't present the same fingerprint.
const BROWSER_IDENTITIES: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:109.0) Gecko/20100101 Firefox/120.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1.2 Safari/605.1.15",
];

/// A post as reported by the sidecar's search endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PilotPost {
    pub id: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_true")]
    pub is_original: bool,
    #[serde(default)]
    pub like_count: u32,
}

fn default_true() -> bool {
    true
}

#[derive(Serialize)]
struct SessionRequest<'a> {
    username: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email_or_phone: Option<&'a str>,
    user_agent: &'a str,
}

#[derive(Serialize)]
struct ReplyRequest<'a> {
    target: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
struct ComposeRequest<'a> {
    text: &'a str,
}

/// Client for the browser-automation sidecar. The sidecar owns the actual
/// browser (navigation, typing, clicking, fingerprinting); this client only
/// speaks its HTTP API.
pub struct BrowserPilotClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    identity: String,
}

impl BrowserPilotClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        let identity = BROWSER_IDENTITIES
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(BROWSER_IDENTITIES[0])
            .to_string();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
            identity,
        }
    }

    /// The browser identity chosen for this client's lifetime.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    fn endpoint(&self, path: &str) -> String {
        let mut endpoint = format!("{}{}", self.base_url, path);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }
        endpoint
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(PilotError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }

    /// Log in and open a browser session on the sidecar.
    pub async fn open_session(
        &self,
        username: &str,
        password: &str,
        email_or_phone: Option<&str>,
    ) -> Result<()> {
        debug!(identity = self.identity.as_str(), "Opening sidecar session");
        let body = SessionRequest {
            username,
            password,
            email_or_phone,
            user_agent: &self.identity,
        };
        let resp = self
            .client
            .post(self.endpoint("/session"))
            .json(&body)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// Run a platform search and return the posts currently rendered.
    pub async fn search(&self, query: &str) -> Result<Vec<PilotPost>> {
        let resp = self
            .client
            .get(self.endpoint("/search"))
            .query(&[("q", query)])
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        Ok(resp.json().await?)
    }

    /// Reply to a post. `target` is the post id or permalink.
    pub async fn reply(&self, target: &str, text: &str) -> Result<()> {
        let resp = self
            .client
            .post(self.endpoint("/reply"))
            .json(&ReplyRequest { target, text })
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// Publish an original post from the account's own timeline.
    pub async fn compose(&self, text: &str) -> Result<()> {
        let resp = self
            .client
            .post(self.endpoint("/compose"))
            .json(&ComposeRequest { text })
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// Tear down the browser session. Errors are reported but the session is
    /// considered gone either way.
    pub async fn close_session(&self) -> Result<()> {
        let resp = self
            .client
            .delete(self.endpoint("/session"))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}
