use contributions::azure_devops::AzureDevOpsConfig;
use contributions::github::GitHubConfig;
use contributions::gitlab::GitLabConfig;
use contributions::options::ContributionsOptions;
use hub::HubConfig;
use serde::Deserialize;
use shared::cache::CacheBackendConfig;
use std::fs::File;

#[derive(Deserialize, Debug, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    #[serde(default = "default_statsd_port")]
    pub statsd_port: u16,
    #[serde(default = "default_metrics_prefix")]
    pub prefix: String,
}

fn default_statsd_port() -> u16 {
    8125
}

fn default_metrics_prefix() -> String {
    "contrib".into()
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub sentry_dsn: Option<String>,
    /// Filter used when `RUST_LOG` is not set.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            sentry_dsn: None,
            level: "info".into(),
        }
    }
}

#[derive(Deserialize, Debug, Default, PartialEq)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Debug, Default, PartialEq)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(default)]
    pub cache: CacheBackendConfig,
    #[serde(default)]
    pub contributions: ContributionsOptions,
    #[serde(default)]
    pub hub: HubConfig,
    #[serde(default)]
    pub azure_devops: AzureDevOpsConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub gitlab: GitLabConfig,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data: Config = serde_yaml::from_reader(file)?;
        data.validate()?;

        Ok(data)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.contributions
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.hub
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let timeouts = [
            ("azure_devops", self.azure_devops.timeout_secs),
            ("github", self.github.timeout_secs),
            ("gitlab", self.gitlab.timeout_secs),
        ];
        if let Some((section, _)) = timeouts.iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigError::Invalid(format!(
                "{section}.timeout_secs must be greater than zero"
            )));
        }

        if let Some(metrics) = &self.common.metrics {
            if metrics.statsd_host.trim().is_empty() {
                return Err(ConfigError::Invalid("metrics.statsd_host is empty".into()));
            }
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
