//! Engine configuration
//!
//! Defaults match the behaviour the frontend expects. Values can be
//! overridden from `~/.gooeyrc` and then from the process environment:
//! - GOOEY_CHANNEL_PREFIX (namespace token for store keys)
//! - REDIS_URL (address handed to external store implementations)
//! - GOOEY_SUBSCRIBE_TIMEOUT=seconds
//! - GOOEY_STATE_TTL=seconds|never
//! - GOOEY_TASK_TTL=seconds|never
//! - GOOEY_PLACEHOLDER="text"
//! - GOOEY_EXTRA_CHANNELS (space-separated channel names)

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::GuiError;
use crate::pubsub::{DEFAULT_CHANNEL_PREFIX, DEFAULT_SUBSCRIBE_TIMEOUT};

/// Keys understood by [`GuiConfig::apply`]
pub const CONFIG_KEYS: &[&str] = &[
    "GOOEY_CHANNEL_PREFIX",
    "REDIS_URL",
    "GOOEY_SUBSCRIBE_TIMEOUT",
    "GOOEY_STATE_TTL",
    "GOOEY_TASK_TTL",
    "GOOEY_PLACEHOLDER",
    "GOOEY_EXTRA_CHANNELS",
];

/// What happens to a background task's published result if nobody collects it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallPolicy {
    /// The store drops the result after this long
    Expire(Duration),
    /// The result stays until something overwrites it
    Retain,
}

impl Default for StallPolicy {
    fn default() -> Self {
        StallPolicy::Expire(Duration::from_secs(60))
    }
}

impl StallPolicy {
    /// Expiry to pass to the store
    pub fn ttl(&self) -> Option<Duration> {
        match self {
            StallPolicy::Expire(ttl) => Some(*ttl),
            StallPolicy::Retain => None,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct GuiConfig {
    /// Prepended to every logical channel name before it reaches the store
    pub channel_prefix: String,
    /// Store address for external [`crate::pubsub::ChannelStore`] implementations
    pub store_url: String,
    /// Per-attempt wait of a blocking subscription
    pub subscribe_timeout: Duration,
    /// Expiry of values published by deferred-value cells
    pub state_ttl: Option<Duration>,
    /// Expiry of background-task results
    pub stall_policy: StallPolicy,
    /// Text shown while a background task is running
    pub placeholder: String,
    /// Channels reported with every render result
    pub extra_channels: Vec<String>,
}

impl Default for GuiConfig {
    fn default() -> Self {
        Self {
            channel_prefix: DEFAULT_CHANNEL_PREFIX.to_string(),
            store_url: "redis://localhost:6379".to_string(),
            subscribe_timeout: DEFAULT_SUBSCRIBE_TIMEOUT,
            state_ttl: Some(Duration::from_secs(60)),
            stall_policy: StallPolicy::default(),
            placeholder: "...".to_string(),
            extra_channels: Vec::new(),
        }
    }
}

impl GuiConfig {
    /// Defaults, then `~/.gooeyrc`, then the environment
    pub fn load() -> Self {
        let mut config = Self::from_file(&Self::gooeyrc_path()).unwrap_or_default();
        config.apply_env();
        config
    }

    /// Get the path to .gooeyrc
    pub fn gooeyrc_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".gooeyrc")
    }

    /// Parse a config file, skipping invalid values
    pub fn from_file(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        Some(Self::parse_lenient(&content))
    }

    /// Parse config content, failing on the first invalid value
    pub fn parse(content: &str) -> Result<Self, GuiError> {
        let mut config = Self::default();
        for (key, value) in assignments(content) {
            config.apply(&key, &value)?;
        }
        Ok(config)
    }

    /// Parse config content, logging and skipping invalid values
    pub fn parse_lenient(content: &str) -> Self {
        let mut config = Self::default();
        for (key, value) in assignments(content) {
            if let Err(e) = config.apply(&key, &value) {
                tracing::warn!(error = %e, "ignoring config value");
            }
        }
        config
    }

    /// Overlay every known key found in the process environment
    pub fn apply_env(&mut self) {
        for key in CONFIG_KEYS {
            if let Ok(value) = std::env::var(key) {
                if let Err(e) = self.apply(key, &value) {
                    tracing::warn!(error = %e, "ignoring environment value");
                }
            }
        }
    }

    /// Set one value; returns `Ok(false)` for keys this config does not know
    pub fn apply(&mut self, key: &str, value: &str) -> Result<bool, GuiError> {
        let invalid = || GuiError::Config {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            "GOOEY_CHANNEL_PREFIX" => self.channel_prefix = value.to_string(),
            "REDIS_URL" => self.store_url = value.to_string(),
            "GOOEY_SUBSCRIBE_TIMEOUT" => {
                self.subscribe_timeout = parse_seconds(value)
                    .filter(|d| !d.is_zero())
                    .ok_or_else(invalid)?;
            }
            "GOOEY_STATE_TTL" => {
                self.state_ttl = parse_ttl(value).ok_or_else(invalid)?;
            }
            "GOOEY_TASK_TTL" => {
                self.stall_policy = match parse_ttl(value).ok_or_else(invalid)? {
                    Some(ttl) => StallPolicy::Expire(ttl),
                    None => StallPolicy::Retain,
                };
            }
            "GOOEY_PLACEHOLDER" => self.placeholder = value.to_string(),
            "GOOEY_EXTRA_CHANNELS" => {
                self.extra_channels = value.split_whitespace().map(|s| s.to_string()).collect();
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// `KEY=value` pairs of an rc file, comments and `export` stripped
fn assignments(content: &str) -> impl Iterator<Item = (String, String)> + '_ {
    content.lines().filter_map(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        parse_assignment(line).map(|(key, value)| (key, unquote(&value)))
    })
}

/// Parse a shell-style assignment (KEY=value or KEY="value")
fn parse_assignment(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() || !key.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }
    Some((key.to_string(), value.trim().to_string()))
}

/// Remove surrounding quotes from a value
fn unquote(s: &str) -> String {
    let s = s.trim();
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return s[1..s.len() - 1].to_string();
        }
    }
    s.to_string()
}

fn parse_seconds(value: &str) -> Option<Duration> {
    let secs: f64 = value.trim().parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

/// `never` or `0` disables expiry
fn parse_ttl(value: &str) -> Option<Option<Duration>> {
    if value.trim().eq_ignore_ascii_case("never") {
        return Some(None);
    }
    let ttl = parse_seconds(value)?;
    Some(if ttl.is_zero() { None } else { Some(ttl) })
}
