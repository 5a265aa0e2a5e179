use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Upper bound for one provider call. The provider's work is cancelled when it elapses.
    pub provider_timeout_secs: u64,
    /// Directory holding `<user id>.yaml` profiles.
    pub profiles_dir: PathBuf,
}

impl Default for HubConfig {
    fn default() -> Self {
        HubConfig {
            provider_timeout_secs: 120,
            profiles_dir: PathBuf::from("profiles"),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("provider_timeout_secs must be greater than zero")]
    ZeroProviderTimeout,
}

impl HubConfig {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.provider_timeout_secs == 0 {
            return Err(ValidationError::ZeroProviderTimeout);
        }
        Ok(())
    }
}
