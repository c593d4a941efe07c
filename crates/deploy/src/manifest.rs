use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{DeployedContract, DeploymentConfig, MigrationOutcome, Scalar};

/// Parameters that, when changed, require the contracts to be deployed again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFingerprint {
    pub chain_id: u64,
    pub input_dimension: Scalar,
    pub output_dimension: Scalar,
    pub learning_rate: Scalar,
    pub precision: Scalar,
    pub batch_size: Scalar,
    pub interval_time: Scalar,
    pub gas: u64,
}

impl ConfigFingerprint {
    pub fn new(config: &DeploymentConfig, chain_id: u64) -> Self {
        Self {
            chain_id,
            input_dimension: config.input_dimension,
            output_dimension: config.output_dimension,
            learning_rate: config.learning_rate,
            precision: config.precision,
            batch_size: config.batch_size,
            interval_time: config.interval_time,
            gas: config.gas,
        }
    }

    /// SHA-256 of the JSON serialization, hex encoded.
    pub fn compute_hash(&self) -> Result<String> {
        let json = serde_json::to_string(self).context("Failed to serialize config fingerprint")?;

        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());

        Ok(hex::encode(hasher.finalize()))
    }
}

/// Record of a completed migration on one chain.
///
/// Saved to `<outdata>/<chain id>.json` after the contracts are deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentManifest {
    pub config_hash: String,
    pub chain_id: u64,
    /// RFC 3339 timestamp of the deployment.
    pub deployed_at: String,
    pub tool_version: String,
    pub contracts: Vec<DeployedContract>,
}

impl DeploymentManifest {
    pub fn new(config_hash: String, chain_id: u64, outcome: &MigrationOutcome) -> Self {
        Self {
            config_hash,
            chain_id,
            deployed_at: chrono::Utc::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            contracts: outcome.contracts().into_iter().cloned().collect(),
        }
    }

    /// The manifest location for a chain.
    pub fn path_for(outdata: &Path, chain_id: u64) -> PathBuf {
        outdata.join(format!("{chain_id}.json"))
    }

    /// Look up a deployed contract by name.
    pub fn contract(&self, name: &str) -> Option<&DeployedContract> {
        self.contracts.iter().find(|c| c.contract_name == name)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize manifest")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write manifest to {}", path.display()))?;

        tracing::info!(path = %path.display(), "Deployment manifest saved");
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Deployment manifest does not exist: {}", path.display());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest from {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse deployment manifest JSON")
    }
}
