//! Per-operation time budgets
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default budget for create, update and delete
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Time budgets of the operations that wait on the cluster
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: DEFAULT_TIMEOUT,
            update: DEFAULT_TIMEOUT,
            delete: DEFAULT_TIMEOUT,
        }
    }
}

/// A `timeouts` block as written in configuration, e.g. `{ "create": "5m" }`
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TimeoutsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,
}

impl Timeouts {
    /// Apply configured overrides on top of these defaults
    pub fn with_overrides(self, cfg: &TimeoutsConfig) -> Result<Self> {
        let pick = |value: &Option<String>, default| value.as_deref().map_or(Ok(default), parse_duration);
        Ok(Self {
            create: pick(&cfg.create, self.create)?,
            update: pick(&cfg.update, self.update)?,
            delete: pick(&cfg.delete, self.delete)?,
        })
    }

    /// Render as a configuration block
    pub fn to_config(&self) -> TimeoutsConfig {
        TimeoutsConfig {
            create: Some(format_duration(self.create)),
            update: Some(format_duration(self.update)),
            delete: Some(format_duration(self.delete)),
        }
    }
}

/// Parse a duration such as `90s`, `10m` or `1h30m`
///
/// Values that do not fit a [`Duration`] are rejected rather than saturated.
pub fn parse_duration(value: &str) -> Result<Duration> {
    humantime::parse_duration(value).map_err(|source| Error::InvalidTimeout {
        value: value.to_string(),
        source,
    })
}

fn format_duration(d: Duration) -> String {
    humantime::format_duration(d).to_string()
}
