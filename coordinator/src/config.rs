//! Configuration for the coordinator
//!
//! Score bands, SLA durations and fraud thresholds are business defaults
//! documented in the sub-configs; all of them stay externally tunable via
//! TOML file or environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Coordinator configuration (aggregates all member configs)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Points awarded for a completed risk assessment
    pub award_points: i64,

    /// Submission lease TTL (seconds); must exceed worst-case process time
    pub lock_ttl_secs: u64,

    /// Escalation sweep interval (seconds)
    pub sweep_interval_secs: u64,

    /// Per-notification delivery timeout (milliseconds)
    pub notify_timeout_ms: u64,

    /// Ledger configuration
    pub ledger: ledger_core::Config,

    /// Alert store configuration
    pub alerts: alert_store::Config,

    /// Risk score band thresholds
    pub thresholds: risk_engine::RiskThresholds,

    /// Fraud heuristic thresholds
    pub fraud: fraud_screening::FraudConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            award_points: 150,
            lock_ttl_secs: 30,
            sweep_interval_secs: 60,
            notify_timeout_ms: 2_000,
            ledger: ledger_core::Config::default(),
            alerts: alert_store::Config::default(),
            thresholds: risk_engine::RiskThresholds::default(),
            fraud: fraud_screening::FraudConfig::default(),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("TRIAGERAIL_DATA_DIR") {
            let base = PathBuf::from(data_dir);
            config.ledger.data_dir = base.join("ledger");
            config.alerts.data_dir = base.join("alerts");
        }

        if let Ok(points) = std::env::var("TRIAGERAIL_AWARD_POINTS") {
            config.award_points = points
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid award points: {}", e)))?;
        }

        if let Ok(interval) = std::env::var("TRIAGERAIL_SWEEP_INTERVAL_SECS") {
            config.sweep_interval_secs = interval
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid sweep interval: {}", e)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot work
    pub fn validate(&self) -> crate::Result<()> {
        if self.award_points <= 0 {
            return Err(crate::Error::Config(
                "award_points must be positive".to_string(),
            ));
        }
        if self.lock_ttl_secs == 0 {
            return Err(crate::Error::Config("lock_ttl_secs must be > 0".to_string()));
        }
        self.thresholds
            .validate()
            .map_err(|e| crate::Error::Config(e.to_string()))?;
        Ok(())
    }
}
