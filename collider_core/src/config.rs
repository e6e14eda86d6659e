use crate::collide::{SearchSettings, default_thread_count};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// 0 selects the hardware default: available parallelism minus the
    /// reserved margin.
    #[serde(default)]
    pub threads: usize,
    #[serde(default = "default_notifier_period")]
    pub notifier_period: u64,
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,
}

pub fn default_notifier_period() -> u64 {
    1_000_000
}

pub fn default_report_interval_secs() -> u64 {
    10
}

fn default_target_checksum() -> u64 {
    0
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            notifier_period: default_notifier_period(),
            report_interval_secs: default_report_interval_secs(),
        }
    }
}

impl SearchConfig {
    pub fn to_settings(&self) -> SearchSettings {
        SearchSettings {
            threads: if self.threads == 0 {
                default_thread_count()
            } else {
                self.threads
            },
            notifier_period: self.notifier_period,
            report_interval: Duration::from_secs(self.report_interval_secs),
            max_iterations: u64::MAX,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct ForgeConfig {
    /// Checksum value the flip set must drive the shifted view to. Zero
    /// matches the reserved trailing window of a composed frame.
    #[serde(default = "default_target_checksum")]
    pub target_checksum: u64,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            target_checksum: default_target_checksum(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct ColliderConfig {
    #[serde(default)]
    pub search: Option<SearchConfig>,
    #[serde(default)]
    pub forge: Option<ForgeConfig>,
}

impl ColliderConfig {
    pub fn load_from_file(path: &PathBuf) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file at {:?}: {}", path, e))?;

        let config: ColliderConfig = toml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse TOML from config file {:?}: {}", path, e)
        })?;

        Ok(config)
    }
}
