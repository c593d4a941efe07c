//! Deployment configuration loaded from the shared YAML configuration file.
//!
//! The file is shared with the rest of the system (devices, middleware, analytics), so only
//! the keys needed for contract deployment are read from its `DEFAULT` section and every other
//! key is ignored.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use alloy_core::primitives::Address;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// The default name of the configuration file, resolved against the working directory.
pub const DEFAULT_CONFIG_FILENAME: &str = "CONFIG.yaml";

/// Name of the section holding all deployment parameters.
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Key read by the middleware to locate the deployed `FederatedModel` contract.
pub const FL_CONTRACT_ADDRESS_KEY: &str = "FLContractAddress";

/// Key read by the middleware to locate the deployed `Verifier` contract.
pub const VERIFIER_CONTRACT_ADDRESS_KEY: &str = "VerifierContractAddress";

/// Errors raised while loading or updating the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file is missing or unreadable.
    #[error("failed to read configuration file {}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file content is malformed or lacks a required key.
    #[error("failed to parse configuration file {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The file could not be rewritten with the deployed addresses.
    #[error("failed to update configuration file {}: {reason}", .path.display())]
    Write { path: PathBuf, reason: String },
}

/// A numeric configuration value, forwarded verbatim as a constructor argument.
///
/// The value keeps the representation it had in the YAML file so that it is encoded exactly
/// as written; the contract ABI decides later whether it is acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Unsigned(value) => write!(f, "{value}"),
            Scalar::Signed(value) => write!(f, "{value}"),
            Scalar::Float(value) => write!(f, "{value}"),
        }
    }
}

impl Scalar {
    /// Whether the value has no fractional part.
    pub fn is_integral(&self) -> bool {
        match self {
            Scalar::Unsigned(_) | Scalar::Signed(_) => true,
            Scalar::Float(value) => value.is_finite() && value.fract() == 0.0,
        }
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Scalar::Unsigned(value)
    }
}

/// The `DEFAULT` section of the configuration file.
///
/// Every field is required: a missing key fails the load instead of reaching a contract
/// constructor as an empty value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentConfig {
    pub input_dimension: Scalar,
    pub output_dimension: Scalar,
    pub learning_rate: Scalar,
    pub precision: Scalar,
    pub batch_size: Scalar,
    pub interval_time: Scalar,
    /// Gas limit for the `Verifier` deployment transaction.
    pub gas: u64,
    /// JSON-RPC endpoint of the Ethereum node, shared with the middleware.
    #[serde(
        default,
        rename = "EtheriumRPCServer",
        skip_serializing_if = "Option::is_none"
    )]
    pub rpc_server: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(rename = "DEFAULT")]
    default: DeploymentConfig,
}

impl DeploymentConfig {
    /// Load the deployment configuration from a YAML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_yaml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(path = %path.display(), "Configuration loaded");
        tracing::debug!(config = ?config, "Deployment parameters");

        Ok(config)
    }

    /// Parse the deployment configuration from YAML content.
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        let file: ConfigFile = serde_yaml::from_str(content)?;
        Ok(file.default)
    }

    /// The `FederatedModel` constructor arguments, in constructor order.
    pub fn federated_model_args(&self) -> Vec<Scalar> {
        vec![
            self.input_dimension,
            self.output_dimension,
            self.learning_rate,
            self.precision,
            self.batch_size,
            self.interval_time,
        ]
    }
}

/// Write the deployed contract addresses back into the configuration file.
///
/// Only `DEFAULT.FLContractAddress` and `DEFAULT.VerifierContractAddress` are set; all other
/// keys keep their values. Comments and key formatting of the original file are not preserved.
pub fn write_contract_addresses(
    path: &Path,
    federated_model: Address,
    verifier: Address,
) -> Result<(), ConfigError> {
    let write_error = |reason: String| ConfigError::Write {
        path: path.to_path_buf(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    let mut document: Value = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let section = document
        .as_mapping_mut()
        .and_then(|root| root.get_mut(DEFAULT_SECTION))
        .and_then(Value::as_mapping_mut)
        .ok_or_else(|| write_error(format!("missing `{DEFAULT_SECTION}` mapping")))?;

    set_string(section, FL_CONTRACT_ADDRESS_KEY, federated_model.to_checksum(None));
    set_string(section, VERIFIER_CONTRACT_ADDRESS_KEY, verifier.to_checksum(None));

    let updated = serde_yaml::to_string(&document).map_err(|e| write_error(e.to_string()))?;
    std::fs::write(path, updated).map_err(|e| write_error(e.to_string()))?;

    tracing::info!(
        path = %path.display(),
        federated_model = %federated_model,
        verifier = %verifier,
        "Contract addresses written to configuration"
    );

    Ok(())
}

fn set_string(section: &mut Mapping, key: &str, value: String) {
    section.insert(Value::String(key.to_string()), Value::String(value));
}
