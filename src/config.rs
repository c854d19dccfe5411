//! Server configuration parsed from environment variables.
//!
//! Values go through a lookup closure so tests never touch the process
//! environment. Malformed numbers fall back to their defaults; layout values
//! that would break placement are rejected outright.

use std::path::PathBuf;

use crate::flowchart::{LayoutConfig, MergePlacement, Position};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_STATIC_DIR: &str = "./static";
pub const DEFAULT_SAVE_QUEUE_CAPACITY: usize = 64;
pub const DEFAULT_FLOWCHART_MAX_TOKENS: u32 = 1024;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a positive number, got {value}")]
    NonPositive { key: &'static str, value: String },
    #[error("{key} must be a finite number, got {value}")]
    NonFinite { key: &'static str, value: String },
    #[error("unknown LAYOUT_MERGE_PLACEMENT: {0} (expected 'midpoint' or 'beside_parents')")]
    MergePlacement(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub port: u16,
    /// `None` keeps the diagram in memory only.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub static_dir: PathBuf,
    pub layout: LayoutConfig,
    pub save_queue_capacity: usize,
    pub flowchart_max_tokens: u32,
}

impl AppConfig {
    /// # Errors
    ///
    /// See [`AppConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// # Errors
    ///
    /// Returns `NonFinite` for a NaN or infinite layout origin, `NonPositive`
    /// for a zero, negative, or non-finite layout step, and
    /// `MergePlacement` for an unknown merge mode.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = LayoutConfig::default();
        let layout = LayoutConfig {
            origin: Position::new(
                finite(&lookup, "LAYOUT_ORIGIN_X", defaults.origin.x)?,
                finite(&lookup, "LAYOUT_ORIGIN_Y", defaults.origin.y)?,
            ),
            x_step: positive(&lookup, "LAYOUT_X_STEP", defaults.x_step)?,
            y_step: positive(&lookup, "LAYOUT_Y_STEP", defaults.y_step)?,
            merge_placement: match lookup("LAYOUT_MERGE_PLACEMENT") {
                Some(raw) => MergePlacement::parse(raw.trim()).ok_or(ConfigError::MergePlacement(raw))?,
                None => defaults.merge_placement,
            },
        };

        Ok(Self {
            port: env_parse(&lookup, "PORT", DEFAULT_PORT),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            db_max_connections: env_parse(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            static_dir: lookup("STATIC_DIR").map_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR), PathBuf::from),
            layout,
            save_queue_capacity: env_parse(&lookup, "SAVE_QUEUE_CAPACITY", DEFAULT_SAVE_QUEUE_CAPACITY).max(1),
            flowchart_max_tokens: env_parse(&lookup, "FLOWCHART_MAX_TOKENS", DEFAULT_FLOWCHART_MAX_TOKENS),
        })
    }
}

pub(crate) fn env_parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn finite(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: f64) -> Result<f64, ConfigError> {
    let value = env_parse(lookup, key, default);
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::NonFinite { key, value: value.to_string() })
    }
}

fn positive(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: f64) -> Result<f64, ConfigError> {
    let value = env_parse(lookup, key, default);
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::NonPositive { key, value: value.to_string() })
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
