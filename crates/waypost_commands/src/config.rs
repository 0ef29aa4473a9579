//! # Configuration
//!
//! Loaded once at startup from a TOML file and read-only afterwards.
//!
//! ```toml
//! [session]
//! services_timeout_ms = 10000
//! range = 64.0
//!
//! [[groups]]
//! name = "Builders"
//! uuid = "7a1b2c3d-0000-4000-8000-000000000001"
//! permissions = ["inventory", "interact"]
//! notifications = ["local"]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Io {
        /// File that was read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but makes no sense.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Session-wide settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Budget for request/reply exchanges that change grid state
    pub services_timeout_ms: u64,
    /// Budget for lookups (names, directory, parcels)
    pub data_timeout_ms: u64,
    /// How long an inventory offer waits for an answer before it is declined
    pub offer_timeout_ms: u64,
    /// Default primitive search radius in metres
    pub range: f32,
    /// Quiet period before a scheduled rebake runs
    pub rebake_delay_ms: u64,
    /// Price of a charged upload
    pub upload_cost: i64,
    /// Apply the grid's altitude and scale limits
    pub enforce_building_constraints: bool,
    /// Command worker threads
    pub dispatch_workers: usize,
    /// Commands that may wait for a worker
    pub queue_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            services_timeout_ms: 10_000,
            data_timeout_ms: 2_500,
            offer_timeout_ms: 30_000,
            range: 64.0,
            rebake_delay_ms: 1_000,
            upload_cost: 10,
            enforce_building_constraints: true,
            dispatch_workers: 4,
            queue_capacity: 64,
        }
    }
}

impl SessionConfig {
    /// Services budget.
    #[inline]
    #[must_use]
    pub fn services_timeout(&self) -> Duration {
        Duration::from_millis(self.services_timeout_ms)
    }

    /// Data budget.
    #[inline]
    #[must_use]
    pub fn data_timeout(&self) -> Duration {
        Duration::from_millis(self.data_timeout_ms)
    }

    /// Offer budget.
    #[inline]
    #[must_use]
    pub fn offer_timeout(&self) -> Duration {
        Duration::from_millis(self.offer_timeout_ms)
    }

    /// Rebake quiet period.
    #[inline]
    #[must_use]
    pub fn rebake_delay(&self) -> Duration {
        Duration::from_millis(self.rebake_delay_ms)
    }
}

/// One group allowed to send commands.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Group name
    pub name: String,
    /// Group id
    pub uuid: Uuid,
    /// Shared secret callers must present
    #[serde(default)]
    pub password: Option<String>,
    /// Capability names
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Notification kinds to deliver
    #[serde(default)]
    pub notifications: Vec<String>,
}

/// Top-level configuration file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaypostConfig {
    /// Session settings
    pub session: SessionConfig,
    /// Configured groups
    pub groups: Vec<GroupConfig>,
}

impl WaypostConfig {
    /// Reads and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text)?;
        tracing::info!(
            path = %path.display(),
            groups = config.groups.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Parses and validates TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let session = &self.session;
        if session.services_timeout_ms == 0
            || session.data_timeout_ms == 0
            || session.offer_timeout_ms == 0
        {
            return Err(ConfigError::Invalid("timeouts must be positive".to_string()));
        }
        if !session.range.is_finite() || session.range <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "range must be a positive distance, got {}",
                session.range
            )));
        }
        if session.dispatch_workers == 0 || session.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "dispatch needs at least one worker and one queue slot".to_string(),
            ));
        }

        let mut names = HashSet::new();
        let mut ids = HashSet::new();
        for group in &self.groups {
            if group.name.trim().is_empty() {
                return Err(ConfigError::Invalid("group name is empty".to_string()));
            }
            if !names.insert(group.name.to_lowercase()) || !ids.insert(group.uuid) {
                return Err(ConfigError::Invalid(format!(
                    "group {} is configured twice",
                    group.name
                )));
            }
        }
        Ok(())
    }
}
