use std::path::Path;

use pod_batch::CompactorConfig;
use pod_store::StoreConfig;
use pod_types::PublicKey;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Client configuration.
///
/// ```toml
/// program_id = "<64 hex chars>"
///
/// [store]
/// base_url = "http://127.0.0.1:5001"
/// max_retries = 3
///
/// [batch]
/// max_batch_size = 50
/// batch_timeout_ms = 2000
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodConfig {
    /// Program id scoping every derived address.
    pub program_id: PublicKey,
    pub store: StoreConfig,
    pub batch: CompactorConfig,
}

impl Default for PodConfig {
    fn default() -> Self {
        Self {
            program_id: PublicKey::from_raw([0; 32]),
            store: StoreConfig::default(),
            batch: CompactorConfig::default(),
        }
    }
}

impl PodConfig {
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| SdkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> SdkResult<()> {
        self.batch.validate()?;
        if self.store.base_url.is_empty() && !self.store.disabled {
            return Err(SdkError::Config("store.base_url must be set".into()));
        }
        Ok(())
    }
}
