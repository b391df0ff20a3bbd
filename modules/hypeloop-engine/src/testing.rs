//! Deterministic collaborator doubles for tests: no network, no browser,
//! no API keys.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use hypeloop_common::{ActionError, AuthError, Candidate, GenerationError};

use crate::content::ReplySelector;
use crate::traits::{Actuator, Generator};

pub fn candidate(id: &str, text: &str, is_original: bool) -> Candidate {
    Candidate {
        id_hint: Some(id.to_string()),
        url: Some(format!("https://x.com/u/status/{id}")),
        text: text.to_string(),
        is_original,
        like_count: 0,
    }
}

/// Scripted actuator. Fetches pop from a queue of candidate lists (empty
/// queue means no more candidates); reply/publish outcomes pop from scripts
/// and default to success when the script runs dry.
#[derive(Default)]
pub struct MockActuator {
    fetches: Mutex<VecDeque<Vec<Candidate>>>,
    reply_script: Mutex<VecDeque<Result<(), ActionError>>>,
    publish_script: Mutex<VecDeque<Result<(), ActionError>>>,
    pub replies: Mutex<Vec<(String, String)>>,
    pub published: Mutex<Vec<String>>,
    pub sessions_closed: Mutex<u32>,
}

impl MockActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fetches(self, fetches: Vec<Vec<Candidate>>) -> Self {
        *self.fetches.lock().unwrap() = fetches.into();
        self
    }

    pub fn with_reply_script(self, script: Vec<Result<(), ActionError>>) -> Self {
        *self.reply_script.lock().unwrap() = script.into();
        self
    }

    pub fn with_publish_script(self, script: Vec<Result<(), ActionError>>) -> Self {
        *self.publish_script.lock().unwrap() = script.into();
        self
    }

    pub fn reply_count(&self) -> usize {
        self.replies.lock().unwrap().len()
    }

    pub fn publish_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

#[async_trait]
impl Actuator for MockActuator {
    async fn establish_session(&self) -> Result<(), AuthError> {
        Ok(())
    }

    async fn fetch_candidates(&self, _query: &str) -> Result<Vec<Candidate>, ActionError> {
        Ok(self
            .fetches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }

    async fn reply(&self, target: &Candidate, text: &str) -> Result<(), ActionError> {
        let outcome = self
            .reply_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()));
        if outcome.is_ok() {
            let locator = target
                .id_hint
                .clone()
                .or_else(|| target.url.clone())
                .unwrap_or_default();
            self.replies.lock().unwrap().push((locator, text.to_string()));
        }
        outcome
    }

    async fn publish(&self, text: &str) -> Result<(), ActionError> {
        let outcome = self
            .publish_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()));
        if outcome.is_ok() {
            self.published.lock().unwrap().push(text.to_string());
        }
        outcome
    }

    async fn close_session(&self) {
        *self.sessions_closed.lock().unwrap() += 1;
    }

    fn identity(&self) -> &str {
        "mock-actuator"
    }
}

/// Scripted generator: outcomes pop in order, then the fallback text repeats.
pub struct MockGenerator {
    script: Mutex<VecDeque<Result<String, GenerationError>>>,
    fallback: String,
}

impl MockGenerator {
    pub fn always(text: &str) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: text.to_string(),
        }
    }

    pub fn scripted(script: Vec<Result<String, GenerationError>>, fallback: &str) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: fallback.to_string(),
        }
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

/// Always returns the same reply text.
pub struct FixedReply(pub String);

impl ReplySelector for FixedReply {
    fn select(&self) -> String {
        self.0.clone()
    }
}
