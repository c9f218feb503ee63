//! Server configuration.
//!
//! Everything comes from the process environment (optionally seeded from a
//! `.env` file by `main`). Credentials are not validated here; a missing one
//! only produces a startup warning.

use anyhow::Context;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use vto_core::notify::DEFAULT_TWILIO_API_BASE;
use vto_core::synthesis::DEFAULT_SYNTHESIS_URL;
use vto_core::{ResultConfig, SessionConfig, SynthesisConfig, TwilioConfig};

/// How the synthesis call is executed once a sender completes a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExecutionMode {
    /// Call the synthesis service inside the webhook request
    Inline,
    /// Hand the call to the background job queue and acknowledge immediately
    Queued,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Inline => write!(f, "inline"),
            ExecutionMode::Queued => write!(f, "queued"),
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" | "sync" => Ok(ExecutionMode::Inline),
            "queued" | "queue" => Ok(ExecutionMode::Queued),
            other => {
                anyhow::bail!("unknown execution mode '{}' (expected inline or queued)", other)
            }
        }
    }
}

/// Background queue configuration
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Queue name used in logs and health output
    pub name: String,
    /// Maximum jobs waiting for a worker
    pub capacity: usize,
    /// Number of worker tasks
    pub workers: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: "tryon".to_string(),
            capacity: 64,
            workers: 2,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address
    pub bind: SocketAddr,
    /// Synthesis execution strategy
    pub mode: ExecutionMode,
    /// Outbound messaging account
    pub twilio: TwilioConfig,
    /// Synthesis endpoint and credential
    pub synthesis: SynthesisConfig,
    /// Session expiry and bounds
    pub sessions: SessionConfig,
    /// Result cache expiry and bounds
    pub results: ResultConfig,
    /// Background queue settings (queued mode only)
    pub queue: QueueConfig,
    /// Externally reachable base URL used to build result links
    pub public_base_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            mode: ExecutionMode::Inline,
            twilio: TwilioConfig::default(),
            synthesis: SynthesisConfig::default(),
            sessions: SessionConfig::default(),
            results: ResultConfig::default(),
            queue: QueueConfig::default(),
            public_base_url: None,
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let text = |key: &str| get(key).unwrap_or_default();

        let bind = match get("VTO_BIND") {
            Some(raw) => raw
                .parse::<SocketAddr>()
                .with_context(|| format!("VTO_BIND is not a socket address: {}", raw))?,
            None => defaults.bind,
        };

        let mode = match get("VTO_MODE") {
            Some(raw) => raw.parse::<ExecutionMode>().context("VTO_MODE")?,
            None => defaults.mode,
        };

        Ok(Self {
            bind,
            mode,
            twilio: TwilioConfig {
                account_sid: text("TWILIO_ACCOUNT_SID"),
                auth_token: text("TWILIO_AUTH_TOKEN"),
                from: text("TWILIO_WHATSAPP_NUMBER"),
                api_base: get("TWILIO_API_BASE")
                    .unwrap_or_else(|| DEFAULT_TWILIO_API_BASE.to_string()),
            },
            synthesis: SynthesisConfig {
                url: get("VTO_SYNTHESIS_URL").unwrap_or_else(|| DEFAULT_SYNTHESIS_URL.to_string()),
                token: text("HUGGINGFACE_TOKEN"),
                timeout: secs(&get, "VTO_SYNTHESIS_TIMEOUT_SECS", defaults.synthesis.timeout)?,
            },
            sessions: SessionConfig {
                ttl: secs(&get, "VTO_SESSION_TTL_SECS", defaults.sessions.ttl)?,
                max_entries: number(&get, "VTO_MAX_SESSIONS", defaults.sessions.max_entries)?,
                prune_interval: secs(
                    &get,
                    "VTO_PRUNE_INTERVAL_SECS",
                    defaults.sessions.prune_interval,
                )?,
            },
            results: ResultConfig {
                ttl: secs(&get, "VTO_RESULT_TTL_SECS", defaults.results.ttl)?,
                max_entries: number(&get, "VTO_MAX_RESULTS", defaults.results.max_entries)?,
            },
            queue: QueueConfig {
                name: get("VTO_QUEUE_NAME").unwrap_or(defaults.queue.name),
                capacity: number(&get, "VTO_QUEUE_CAPACITY", defaults.queue.capacity)?.max(1),
                workers: number(&get, "VTO_QUEUE_WORKERS", defaults.queue.workers)?.max(1),
            },
            public_base_url: get("VTO_PUBLIC_BASE_URL")
                .map(|url| url.trim().trim_end_matches('/').to_string()),
        })
    }

    /// Names of credential variables that are not set
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.twilio.account_sid.is_empty() {
            missing.push("TWILIO_ACCOUNT_SID");
        }
        if self.twilio.auth_token.is_empty() {
            missing.push("TWILIO_AUTH_TOKEN");
        }
        if self.twilio.from.is_empty() {
            missing.push("TWILIO_WHATSAPP_NUMBER");
        }
        if self.synthesis.token.is_empty() {
            missing.push("HUGGINGFACE_TOKEN");
        }
        missing
    }
}

fn number<G>(get: &G, key: &str, default: usize) -> anyhow::Result<usize>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .with_context(|| format!("{} is not a number: {}", key, raw)),
        None => Ok(default),
    }
}

fn secs<G>(get: &G, key: &str, default: Duration) -> anyhow::Result<Duration>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .with_context(|| format!("{} is not a number of seconds: {}", key, raw)),
        None => Ok(default),
    }
}
