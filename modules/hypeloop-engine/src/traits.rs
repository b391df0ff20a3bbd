// Trait abstractions for the engine's external collaborators.
//
// Actuator hides the browser-automation sidecar, Generator hides the text
// generation provider. Both enable deterministic testing with MockActuator
// and MockGenerator: no network, no browser, no API keys.

use async_trait::async_trait;
use tracing::debug;

use browserpilot_client::{BrowserPilotClient, PilotError, PilotPost};
use gemini_client::GeminiClient;
use hypeloop_common::{ActionError, AuthError, Candidate, GenerationError};

// ---------------------------------------------------------------------------
// Actuator — the browser-level collaborator
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Actuator: Send + Sync {
    /// Log in and open the platform session. Failure is fatal to the run.
    async fn establish_session(&self) -> Result<(), AuthError>;

    /// Run a platform search and return the candidates currently visible.
    async fn fetch_candidates(&self, query: &str) -> Result<Vec<Candidate>, ActionError>;

    /// Reply to a candidate with the given text.
    async fn reply(&self, target: &Candidate, text: &str) -> Result<(), ActionError>;

    /// Publish an original post.
    async fn publish(&self, text: &str) -> Result<(), ActionError>;

    /// Release the platform session. Teardown never fails the caller.
    async fn close_session(&self);

    /// Stable identity string for this actuator instance, recorded in the
    /// daily stats.
    fn identity(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Generator — the text-generation collaborator
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

// ---------------------------------------------------------------------------
// Sidecar-backed implementations
// ---------------------------------------------------------------------------

/// Actuator backed by the browser-automation sidecar.
pub struct PilotActuator {
    client: BrowserPilotClient,
    username: String,
    password: String,
    email_or_phone: Option<String>,
}

impl PilotActuator {
    pub fn new(
        client: BrowserPilotClient,
        username: &str,
        password: &str,
        email_or_phone: Option<&str>,
    ) -> Self {
        Self {
            client,
            username: username.to_string(),
            password: password.to_string(),
            email_or_phone: email_or_phone.map(String::from),
        }
    }
}

/// Map a sidecar failure onto the action taxonomy. The sidecar reports a
/// vanished target as 404/410; auth loss as 401/403.
fn action_error(err: PilotError) -> ActionError {
    match err.status() {
        Some(404) | Some(410) => ActionError::StaleTarget,
        Some(401) | Some(403) => ActionError::Fatal(err.to_string()),
        _ => ActionError::Transient(err.to_string()),
    }
}

fn candidate_from_post(post: PilotPost) -> Candidate {
    Candidate {
        id_hint: post.id,
        url: post.url,
        text: post.text,
        is_original: post.is_original,
        like_count: post.like_count,
    }
}

#[async_trait]
impl Actuator for PilotActuator {
    async fn establish_session(&self) -> Result<(), AuthError> {
        self.client
            .open_session(
                &self.username,
                &self.password,
                self.email_or_phone.as_deref(),
            )
            .await
            .map_err(|e| match e.status() {
                Some(401) => AuthError::Other("credentials rejected".to_string()),
                Some(409) => AuthError::Challenge,
                Some(428) => AuthError::TwoFactorRequired,
                Some(408) => AuthError::Timeout,
                _ => AuthError::Other(e.to_string()),
            })
    }

    async fn fetch_candidates(&self, query: &str) -> Result<Vec<Candidate>, ActionError> {
        let posts = self.client.search(query).await.map_err(action_error)?;
        debug!(count = posts.len(), "Sidecar returned candidates");
        Ok(posts.into_iter().map(candidate_from_post).collect())
    }

    async fn reply(&self, target: &Candidate, text: &str) -> Result<(), ActionError> {
        let locator = target
            .id_hint
            .as_deref()
            .or(target.url.as_deref())
            .ok_or(ActionError::StaleTarget)?;
        self.client.reply(locator, text).await.map_err(action_error)
    }

    async fn publish(&self, text: &str) -> Result<(), ActionError> {
        self.client.compose(text).await.map_err(action_error)
    }

    async fn close_session(&self) {
        if let Err(e) = self.client.close_session().await {
            debug!(error = %e, "Session close failed (ignored)");
        }
    }

    fn identity(&self) -> &str {
        self.client.identity()
    }
}

#[async_trait]
impl Generator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.generate(prompt).await.map_err(|e| match e {
            gemini_client::GeminiError::EmptyResponse => GenerationError::Empty,
            other => GenerationError::Failed(other.to_string()),
        })
    }
}
