use std::{path::PathBuf, time::Duration};

use clap::{ArgAction, Parser};
use thiserror::Error;

use hookrun_core::{BridgeConfig, ConsumeMode};
use hookrun_observe::{LoggerConfig, LoggerFormat};
use hookrun_queue::{BackendKind, ConnectOptions};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("queue topic must not be empty")]
    EmptyTopic,
    #[error("idle window must be greater than zero")]
    ZeroIdleWindow,
    #[error("invalid duration: {0} (expected e.g. 500ms, 30s, 5m, 1h)")]
    InvalidDuration(String),
    #[error("invalid boolean: {0} (expected true/false/yes/no/1/0)")]
    InvalidBool(String),
}

/// Runs the commands queued on a topic and reports their lifecycle to webhooks.
///
/// Every flag can also be set through the environment variable shown in `--help`.
#[derive(Parser, Debug, Clone)]
#[command(name = "hookrun", version)]
pub struct AgentConfig {
    /// Queue topic to consume
    #[arg(long, env = "QUEUE")]
    pub queue: String,

    /// Queue backend (memory, spool)
    #[arg(long, env = "QUEUE_BACKEND")]
    pub backend: BackendKind,

    /// Root directory of the spool backend
    #[arg(long, env = "SPOOL_DIR", default_value = "/var/spool/hookrun")]
    pub spool_dir: PathBuf,

    /// Requeue tasks whose command failed
    #[arg(long, env = "RETRY", default_value = "true", value_parser = parse_bool,
          action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    pub retry: bool,

    /// Handle one delivery, then exit
    #[arg(long, env = "SINGLE_SHOT", default_value = "false", value_parser = parse_bool,
          action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    pub single_shot: bool,

    /// Exit when no task was handled within --max-idle
    #[arg(long, env = "DIE_IF_IDLE", default_value = "false", value_parser = parse_bool,
          action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    pub die_if_idle: bool,

    /// Idle window of --die-if-idle
    #[arg(long, env = "MAX_IDLE", default_value = "60s", value_parser = parse_duration)]
    pub max_idle: Duration,

    /// Transport timeout of each webhook call
    #[arg(long, env = "WEBHOOK_TIMEOUT", default_value = "30s", value_parser = parse_duration)]
    pub webhook_timeout: Duration,

    /// Log filter directive
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format (text, json, journald)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: LoggerFormat,
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue.trim().is_empty() {
            return Err(ConfigError::EmptyTopic);
        }
        if self.max_idle.is_zero() {
            return Err(ConfigError::ZeroIdleWindow);
        }
        Ok(())
    }

    pub fn mode(&self) -> ConsumeMode {
        if self.single_shot {
            ConsumeMode::SingleShot
        } else {
            ConsumeMode::Continuous
        }
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig::new(self.queue.trim())
            .with_mode(self.mode())
            .with_retry(self.retry)
            .with_idle_window(self.die_if_idle.then_some(self.max_idle))
    }

    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            spool_dir: self.spool_dir.clone(),
            ..ConnectOptions::default()
        }
    }

    pub fn logger_config(&self) -> LoggerConfig {
        LoggerConfig::new(self.log_format, self.log_level.clone())
    }
}

pub fn parse_bool(s: &str) -> Result<bool, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool(s.to_string())),
    }
}

/// Parse `500ms`, `30s`, `5m`, `1h`, or a bare number of seconds.
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let trimmed = s.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| ConfigError::InvalidDuration(s.to_string()))?;

    match unit.trim() {
        "" | "s" => Ok(Duration::from_secs(value)),
        "ms" => Ok(Duration::from_millis(value)),
        "m" => Ok(Duration::from_secs(value.saturating_mul(60))),
        "h" => Ok(Duration::from_secs(value.saturating_mul(3600))),
        _ => Err(ConfigError::InvalidDuration(s.to_string())),
    }
}
