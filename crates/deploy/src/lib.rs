//! fedchain-deploy - Contract migration library for the federated learning chain.
//!
//! Reads the deployment parameters from the system's YAML configuration and publishes the
//! `Migrations`, `FederatedModel` and `Verifier` contracts through a [`DeploymentFramework`].

pub mod artifact;
pub mod config;
pub mod framework;
mod manifest;
mod migration;
mod migrator;
pub mod rpc;

pub use artifact::{ArtifactStore, ContractArtifact, DEFAULT_ARTIFACTS_DIR};
pub use config::{ConfigError, DEFAULT_CONFIG_FILENAME, DeploymentConfig, Scalar};
pub use framework::{
    DEFAULT_CONFIRMATION_TIMEOUT, DEFAULT_DRY_RUN_CHAIN_ID, DeployRequest, DeployedContract,
    DeploymentFramework, DryRunFramework, RpcFramework, RpcFrameworkConfig, TxOptions,
};
pub use manifest::{ConfigFingerprint, DeploymentManifest};
pub use migration::{FEDERATED_MODEL, InitialMigration, MIGRATIONS, MigrationOutcome, VERIFIER};
pub use migrator::{DEFAULT_OUTDATA_DIR, MigrationReport, MigrationStatus, Migrator};
