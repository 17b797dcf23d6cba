//! Configuration for the alert store

use crate::types::AlertPriority;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Alert store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// SLA durations per priority
    pub sla: SlaConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/alerts"),
            sla: SlaConfig::default(),
        }
    }
}

/// SLA durations (documented defaults, externally configurable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaConfig {
    /// Emergency alert SLA (hours)
    pub emergency_hours: i64,

    /// Urgent alert SLA (hours)
    pub urgent_hours: i64,

    /// High alert SLA (hours)
    pub high_hours: i64,

    /// Medium alert SLA (hours)
    pub medium_hours: i64,

    /// Low alert SLA (hours)
    pub low_hours: i64,
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            emergency_hours: 1,
            urgent_hours: 4,
            high_hours: 24,
            medium_hours: 48,
            low_hours: 72,
        }
    }
}

impl SlaConfig {
    /// SLA duration for a priority
    pub fn duration(&self, priority: AlertPriority) -> Duration {
        let hours = match priority {
            AlertPriority::Emergency => self.emergency_hours,
            AlertPriority::Urgent => self.urgent_hours,
            AlertPriority::High => self.high_hours,
            AlertPriority::Medium => self.medium_hours,
            AlertPriority::Low => self.low_hours,
        };
        Duration::hours(hours)
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sla_table() {
        let sla = SlaConfig::default();
        assert_eq!(sla.duration(AlertPriority::Emergency), Duration::hours(1));
        assert_eq!(sla.duration(AlertPriority::Urgent), Duration::hours(4));
        assert_eq!(sla.duration(AlertPriority::High), Duration::hours(24));
        assert_eq!(sla.duration(AlertPriority::Medium), Duration::hours(48));
        assert_eq!(sla.duration(AlertPriority::Low), Duration::hours(72));
    }
}
