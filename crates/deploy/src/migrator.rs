//! Orchestration of a migration run: up-to-date detection, deployment and bookkeeping.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    ConfigError, ConfigFingerprint, DeployedContract, DeploymentConfig, DeploymentFramework,
    DeploymentManifest, InitialMigration, config, migration,
};

/// The default directory holding deployment manifests.
pub const DEFAULT_OUTDATA_DIR: &str = "deployments";

/// How a migration run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum MigrationStatus {
    /// The contracts were deployed by this run.
    Deployed,
    /// A previous deployment with the same configuration exists on this chain.
    UpToDate,
    /// Nothing was sent; the contracts were only validated.
    DryRun,
}

/// Result of [`Migrator::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub chain_id: u64,
    pub status: MigrationStatus,
    /// Contracts in deployment order.
    pub contracts: Vec<DeployedContract>,
    pub manifest_path: Option<PathBuf>,
}

/// Runs the initial migration against a deployment framework and keeps the manifest of
/// what has been deployed.
#[derive(Debug, Clone)]
pub struct Migrator {
    config: DeploymentConfig,
    config_path: PathBuf,
    outdata: PathBuf,
    reset: bool,
    dry_run: bool,
    write_addresses: bool,
    record_completion: bool,
}

impl Migrator {
    pub fn new(config: DeploymentConfig, config_path: impl Into<PathBuf>) -> Self {
        Self {
            config,
            config_path: config_path.into(),
            outdata: PathBuf::from(DEFAULT_OUTDATA_DIR),
            reset: false,
            dry_run: false,
            write_addresses: false,
            record_completion: true,
        }
    }

    /// Load the configuration file and create a migrator for it.
    pub fn load(config_path: &Path) -> Result<Self, ConfigError> {
        let config = DeploymentConfig::load_from_file(config_path)?;
        Ok(Self::new(config, config_path))
    }

    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    /// Directory where deployment manifests are kept.
    pub fn outdata(mut self, outdata: impl Into<PathBuf>) -> Self {
        self.outdata = outdata.into();
        self
    }

    /// Deploy even if an up-to-date deployment is recorded.
    pub fn reset(mut self, reset: bool) -> Self {
        self.reset = reset;
        self
    }

    /// Skip the manifest and the configuration write-back.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Write the deployed addresses back into the configuration file.
    pub fn write_addresses(mut self, write_addresses: bool) -> Self {
        self.write_addresses = write_addresses;
        self
    }

    pub fn record_completion(mut self, record_completion: bool) -> Self {
        self.record_completion = record_completion;
        self
    }

    pub async fn run<F: DeploymentFramework>(&self, framework: &mut F) -> Result<MigrationReport> {
        let chain_id = framework.chain_id();
        let migration =
            InitialMigration::new(self.config.clone()).record_completion(self.record_completion);

        if self.dry_run {
            let outcome = migration.run(framework).await?;
            tracing::info!(chain_id, "Dry run complete, nothing was sent");
            return Ok(MigrationReport {
                chain_id,
                status: MigrationStatus::DryRun,
                contracts: outcome.contracts().into_iter().cloned().collect(),
                manifest_path: None,
            });
        }

        let config_hash = ConfigFingerprint::new(&self.config, chain_id).compute_hash()?;
        let manifest_path = DeploymentManifest::path_for(&self.outdata, chain_id);

        if let Some(manifest) = self
            .up_to_date_manifest(&*framework, &manifest_path, &config_hash)
            .await?
        {
            tracing::info!(
                chain_id,
                manifest = %manifest_path.display(),
                deployed_at = %manifest.deployed_at,
                "Contracts already deployed with this configuration, skipping (use reset to redeploy)"
            );
            self.maybe_write_addresses(&manifest.contracts)?;
            return Ok(MigrationReport {
                chain_id,
                status: MigrationStatus::UpToDate,
                contracts: manifest.contracts,
                manifest_path: Some(manifest_path),
            });
        }

        tracing::info!(chain_id, "Starting migration...");
        let outcome = migration.run(framework).await?;

        let manifest = DeploymentManifest::new(config_hash, chain_id, &outcome);
        manifest.save_to_file(&manifest_path)?;
        self.maybe_write_addresses(&manifest.contracts)?;

        tracing::info!(chain_id, "Migration complete");

        Ok(MigrationReport {
            chain_id,
            status: MigrationStatus::Deployed,
            contracts: manifest.contracts,
            manifest_path: Some(manifest_path),
        })
    }

    /// The recorded manifest, if it matches the current configuration, reset is off and every
    /// recorded contract still has code on the chain.
    async fn up_to_date_manifest<F: DeploymentFramework>(
        &self,
        framework: &F,
        path: &Path,
        config_hash: &str,
    ) -> Result<Option<DeploymentManifest>> {
        if self.reset || !path.exists() {
            return Ok(None);
        }

        let manifest = match DeploymentManifest::load_from_file(path) {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "Ignoring unreadable manifest");
                return Ok(None);
            }
        };

        if manifest.config_hash != config_hash {
            tracing::info!(
                old_hash = %manifest.config_hash,
                new_hash = %config_hash,
                "Configuration changed since the last deployment, redeploying"
            );
            return Ok(None);
        }

        for name in [migration::MIGRATIONS, migration::FEDERATED_MODEL, migration::VERIFIER] {
            let Some(contract) = manifest.contract(name) else {
                return Ok(None);
            };

            let has_code = framework
                .has_code(contract.address)
                .await
                .with_context(|| format!("Failed to check {} at {}", name, contract.address))?;

            if !has_code {
                tracing::info!(
                    contract = %name,
                    address = %contract.address,
                    "Recorded contract has no code on chain (chain reset?), redeploying"
                );
                return Ok(None);
            }
        }

        Ok(Some(manifest))
    }

    fn maybe_write_addresses(&self, contracts: &[DeployedContract]) -> Result<()> {
        if !self.write_addresses {
            return Ok(());
        }

        let address_of = |name: &str| {
            contracts
                .iter()
                .find(|c| c.contract_name == name)
                .map(|c| c.address)
                .with_context(|| format!("{name} missing from deployment"))
        };

        config::write_contract_addresses(
            &self.config_path,
            address_of(migration::FEDERATED_MODEL)?,
            address_of(migration::VERIFIER)?,
        )?;

        Ok(())
    }
}
