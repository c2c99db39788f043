//! Environment configuration.

use std::env;
use std::str::FromStr;

use tracing::warn;

use crate::render::StyleProfile;
use crate::stream::StreamOptions;

pub const DEFAULT_LOG_FILTER: &str = "md_tape=debug";
pub const DEFAULT_CHUNK_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub style: StyleProfile,
    pub width: Option<usize>,
    pub partial_preview: bool,
    pub log_path: Option<String>,
    pub log_filter: String,
    pub write_log: Option<String>,
    pub chunk_delay_ms: u64,
    pub chunk_size: usize,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            style: StyleProfile::default(),
            width: None,
            partial_preview: false,
            log_path: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            write_log: None,
            chunk_delay_ms: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl EnvConfig {
    /// Reads `MD_TAPE_*` variables. Unparseable values fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            style: env_parsed("MD_TAPE_STYLE").unwrap_or(defaults.style),
            width: env_parsed::<usize>("MD_TAPE_WIDTH").filter(|width| *width > 0),
            partial_preview: env_flag("MD_TAPE_PREVIEW"),
            log_path: env_string_opt("MD_TAPE_LOG"),
            log_filter: env_string_opt("MD_TAPE_LOG_FILTER").unwrap_or(defaults.log_filter),
            write_log: env_string_opt("MD_TAPE_WRITE_LOG"),
            chunk_delay_ms: env_parsed("MD_TAPE_CHUNK_DELAY_MS").unwrap_or(defaults.chunk_delay_ms),
            chunk_size: env_parsed::<usize>("MD_TAPE_CHUNK_SIZE")
                .filter(|size| *size > 0)
                .unwrap_or(defaults.chunk_size),
        }
    }
}

impl From<&EnvConfig> for StreamOptions {
    fn from(config: &EnvConfig) -> Self {
        StreamOptions {
            style: config.style,
            width: config.width,
            partial_preview: config.partial_preview,
        }
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| value == "1").unwrap_or(false)
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

fn env_parsed<T: FromStr>(key: &str) -> Option<T> {
    let value = env_string_opt(key)?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(key, value = %value, "ignoring unparseable environment value");
            None
        }
    }
}
