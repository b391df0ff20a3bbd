use std::env;
use std::path::PathBuf;

use tracing::info;

/// Application configuration loaded from environment variables.
///
/// Account credentials are opaque to the engine — they are passed through to
/// the browser-automation sidecar unmodified.
#[derive(Debug, Clone)]
pub struct Config {
    // Account
    pub username: String,
    pub password: String,
    pub email_or_phone: Option<String>,

    // Target
    pub target_account: String,
    pub search_query: String,

    // Rate limiting
    pub max_replies_per_day: u32,
    pub min_reply_delay_secs: u64,
    pub max_reply_delay_secs: u64,

    // Batching
    pub batch_size: usize,
    pub batch_wait_secs: u64,
    pub post_cycle_wait_secs: u64,
    pub max_replies_per_cycle: u32,

    // Publishing
    pub posts_per_cycle: u32,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,

    // Cycles (None = unbounded)
    pub max_cycles_per_run: Option<u32>,

    // Browser-automation sidecar
    pub pilot_url: String,
    pub pilot_token: Option<String>,

    // Storage
    pub data_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        let target_account = env::var("TARGET_ACCOUNT").unwrap_or_else(|_| "anoma".to_string());
        let search_query = env::var("SEARCH_QUERY")
            .unwrap_or_else(|_| format!("@{target_account} -from:{target_account}"));

        Self {
            username: required_env("X_USERNAME"),
            password: required_env("X_PASSWORD"),
            email_or_phone: optional_env("X_EMAIL_OR_PHONE"),
            target_account,
            search_query,
            max_replies_per_day: parsed_env("MAX_REPLIES_PER_DAY", 50),
            min_reply_delay_secs: parsed_env("MIN_REPLY_DELAY_SECS", 60),
            max_reply_delay_secs: parsed_env("MAX_REPLY_DELAY_SECS", 150),
            batch_size: parsed_env("BATCH_SIZE", 5),
            batch_wait_secs: parsed_env("BATCH_WAIT_SECS", 60),
            post_cycle_wait_secs: parsed_env("POST_CYCLE_WAIT_SECS", 300),
            max_replies_per_cycle: parsed_env("MAX_REPLIES_PER_CYCLE", 20),
            posts_per_cycle: parsed_env("POSTS_PER_CYCLE", 3),
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            max_cycles_per_run: match parsed_env("MAX_CYCLES_PER_RUN", 10u32) {
                0 => None,
                n => Some(n),
            },
            pilot_url: required_env("PILOT_URL"),
            pilot_token: optional_env("PILOT_TOKEN"),
            data_dir: PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string())),
        }
    }

    /// Log the effective configuration without credentials.
    pub fn log_redacted(&self) {
        info!(
            username = self.username.as_str(),
            target = self.target_account.as_str(),
            query = self.search_query.as_str(),
            daily_quota = self.max_replies_per_day,
            batch_size = self.batch_size,
            posts_per_cycle = self.posts_per_cycle,
            max_cycles = ?self.max_cycles_per_run,
            publishing_enabled = self.gemini_api_key.is_some(),
            data_dir = %self.data_dir.display(),
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T
where
    T::Err: std::fmt::Debug,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a number: {e:?}")),
        Err(_) => default,
    }
}
