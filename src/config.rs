use std::env;
use std::fmt;
use std::time::Duration;

use crate::error::{Result, SmartsheetError};
use crate::smartsheet::retry::DEFAULT_MAX_RETRY_TIMEOUT;

pub const DEFAULT_BASE_URI: &str = "https://api.smartsheet.com/2.0/";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const SDK_USER_AGENT: &str = concat!("smartsheet-rust-sdk/", env!("CARGO_PKG_VERSION"));

pub const ENV_ACCESS_TOKEN: &str = "SMARTSHEET_ACCESS_TOKEN";
pub const ENV_BASE_URI: &str = "SMARTSHEET_API_BASE";
pub const ENV_MAX_RETRY_TIMEOUT: &str = "SMARTSHEET_MAX_RETRY_TIMEOUT_MS";
pub const ENV_USER_AGENT: &str = "SMARTSHEET_USER_AGENT";

/// Connection settings shared by every request a client makes.
#[derive(Clone)]
pub struct ClientConfig {
    pub base_uri: String,
    pub access_token: String,
    pub user_agent: Option<String>,
    pub max_retry_timeout: Duration,
    pub request_timeout: Duration,
    /// Email of the user to impersonate (requires an admin token).
    pub assume_user: Option<String>,
    /// Sent as `Smartsheet-Change-Agent` so integrations can recognise their own edits.
    pub change_agent: Option<String>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_uri", &self.base_uri)
            .field("access_token", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("max_retry_timeout", &self.max_retry_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("assume_user", &self.assume_user)
            .field("change_agent", &self.change_agent)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            base_uri: DEFAULT_BASE_URI.to_string(),
            access_token: access_token.into(),
            user_agent: None,
            max_retry_timeout: DEFAULT_MAX_RETRY_TIMEOUT,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            assume_user: None,
            change_agent: None,
        }
    }

    /// Build a configuration from `SMARTSHEET_*` environment variables.
    ///
    /// A `.env` file in the working directory is loaded first when present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let token = env::var(ENV_ACCESS_TOKEN).map_err(|_| {
            SmartsheetError::InvalidInput(format!("missing {} environment variable", ENV_ACCESS_TOKEN))
        })?;

        let mut config = Self::new(token);

        if let Ok(base) = env::var(ENV_BASE_URI) {
            if !base.trim().is_empty() {
                config = config.with_base_uri(base);
            }
        }

        if let Ok(raw) = env::var(ENV_MAX_RETRY_TIMEOUT) {
            let millis = raw.trim().parse::<u64>().map_err(|_| {
                SmartsheetError::InvalidInput(format!(
                    "{} must be a number of milliseconds, got '{}'",
                    ENV_MAX_RETRY_TIMEOUT, raw
                ))
            })?;
            config = config.with_max_retry_timeout(Duration::from_millis(millis));
        }

        if let Ok(agent) = env::var(ENV_USER_AGENT) {
            if !agent.trim().is_empty() {
                config = config.with_user_agent(agent);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = normalize_base_uri(&base_uri.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_max_retry_timeout(mut self, timeout: Duration) -> Self {
        self.max_retry_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_assume_user(mut self, email: impl Into<String>) -> Self {
        self.assume_user = Some(email.into());
        self
    }

    pub fn with_change_agent(mut self, agent: impl Into<String>) -> Self {
        self.change_agent = Some(agent.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.access_token.trim().is_empty() {
            return Err(SmartsheetError::InvalidInput(
                "access token must not be empty".to_string(),
            ));
        }
        if !self.base_uri.starts_with("http://") && !self.base_uri.starts_with("https://") {
            return Err(SmartsheetError::InvalidInput(format!(
                "base URI must be http(s), got '{}'",
                self.base_uri
            )));
        }
        Ok(())
    }

    pub fn user_agent_header(&self) -> String {
        match self.user_agent.as_deref() {
            Some(custom) if !custom.trim().is_empty() => {
                format!("{}/{}", SDK_USER_AGENT, custom.trim())
            }
            _ => SDK_USER_AGENT.to_string(),
        }
    }

    /// Join an endpoint path onto the base URI.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.base_uri, path.trim_start_matches('/'))
    }
}

fn normalize_base_uri(uri: &str) -> String {
    format!("{}/", uri.trim().trim_end_matches('/'))
}
