//! The initial migration: publishes the contracts of the federated learning system.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{DeployRequest, DeployedContract, DeploymentConfig, DeploymentFramework, Scalar};

/// Bookkeeping contract recording which migrations have run.
pub const MIGRATIONS: &str = "Migrations";
/// Contract aggregating the participants' model updates.
pub const FEDERATED_MODEL: &str = "FederatedModel";
/// Contract verifying the participants' zero-knowledge proofs.
pub const VERIFIER: &str = "Verifier";

/// The function recording a completed migration on the `Migrations` contract.
const SET_COMPLETED: &str = "setCompleted";

/// The contracts deployed by a migration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationOutcome {
    pub migrations: DeployedContract,
    pub federated_model: DeployedContract,
    pub verifier: DeployedContract,
}

impl MigrationOutcome {
    /// The deployed contracts in deployment order.
    pub fn contracts(&self) -> [&DeployedContract; 3] {
        [&self.migrations, &self.federated_model, &self.verifier]
    }
}

/// Migration number 1: deploys `Migrations`, `FederatedModel` and `Verifier`, in that order.
#[derive(Debug, Clone)]
pub struct InitialMigration {
    config: DeploymentConfig,
    record_completion: bool,
}

impl InitialMigration {
    /// The migration's number, recorded on the `Migrations` contract once it completes.
    pub const NUMBER: u64 = 1;

    pub fn new(config: DeploymentConfig) -> Self {
        Self {
            config,
            record_completion: true,
        }
    }

    /// Whether to call `setCompleted` on the `Migrations` contract after deploying.
    pub fn record_completion(mut self, record_completion: bool) -> Self {
        self.record_completion = record_completion;
        self
    }

    /// The deployment requests, in issue order.
    pub fn requests(&self) -> [DeployRequest; 3] {
        [
            DeployRequest::new(MIGRATIONS),
            DeployRequest::new(FEDERATED_MODEL).args(self.config.federated_model_args()),
            DeployRequest::new(VERIFIER).gas(self.config.gas),
        ]
    }

    /// Issue the deployment requests one after the other, stopping at the first failure.
    pub async fn run<F: DeploymentFramework>(&self, framework: &mut F) -> Result<MigrationOutcome> {
        let [migrations, federated_model, verifier] = self.requests();

        let migrations = framework
            .deploy(migrations)
            .await
            .with_context(|| format!("Failed to deploy {MIGRATIONS}"))?;
        let federated_model = framework
            .deploy(federated_model)
            .await
            .with_context(|| format!("Failed to deploy {FEDERATED_MODEL}"))?;
        let verifier = framework
            .deploy(verifier)
            .await
            .with_context(|| format!("Failed to deploy {VERIFIER}"))?;

        if self.record_completion {
            framework
                .transact(
                    &migrations,
                    SET_COMPLETED,
                    vec![Scalar::Unsigned(Self::NUMBER)],
                )
                .await
                .context("Failed to record migration completion")?;
            tracing::debug!(migration = Self::NUMBER, "Migration recorded as completed");
        }

        Ok(MigrationOutcome {
            migrations,
            federated_model,
            verifier,
        })
    }
}
