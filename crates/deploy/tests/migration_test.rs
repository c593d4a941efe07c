//! Integration tests for the initial migration.
//!
//! The deployment framework is replaced by a recording implementation so the tests check
//! exactly which requests reach the chain, and in which order, without a node.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use alloy_core::primitives::{Address, B256};
use anyhow::Result;
use fedchain_deploy::{
    ArtifactStore, ConfigError, DeployRequest, DeployedContract, DeploymentConfig,
    DeploymentFramework, DryRunFramework, FEDERATED_MODEL, InitialMigration, MIGRATIONS,
    MigrationStatus, Migrator, Scalar, TxOptions, VERIFIER,
};
use serde_json::json;
use tempdir::TempDir;

const CONFIG: &str = r#"
DEFAULT:
  InputDimension: 6
  OutputDimension: 3
  LearningRate: 15
  Precision: 1000
  BatchSize: 10
  IntervalTime: 120
  Gas: 6000000
  EtheriumRPCServer: http://127.0.0.1:7545
  Rounds: 50
"#;

const CHAIN_ID: u64 = 1337;

/// Records every request and answers with deterministic addresses.
///
/// Holds the set of addresses with code, so a fresh instance behaves like a wiped chain.
#[derive(Default)]
struct RecordingFramework {
    deployments: Vec<DeployRequest>,
    calls: Vec<(String, String, Vec<Scalar>)>,
    code: HashSet<Address>,
    fail_on: Option<String>,
}

impl RecordingFramework {
    fn failing_on(contract: &str) -> Self {
        Self {
            fail_on: Some(contract.to_string()),
            ..Default::default()
        }
    }

    fn deployed_names(&self) -> Vec<&str> {
        self.deployments.iter().map(|r| r.contract.as_str()).collect()
    }
}

impl DeploymentFramework for RecordingFramework {
    fn chain_id(&self) -> u64 {
        CHAIN_ID
    }

    async fn has_code(&self, address: Address) -> Result<bool> {
        Ok(self.code.contains(&address))
    }

    async fn deploy(&mut self, request: DeployRequest) -> Result<DeployedContract> {
        if self.fail_on.as_deref() == Some(request.contract.as_str()) {
            anyhow::bail!("out of gas");
        }

        let index = self.deployments.len() as u8 + 1;
        let address = Address::repeat_byte(index);
        let contract_name = request.contract.clone();
        self.deployments.push(request);
        self.code.insert(address);

        Ok(DeployedContract {
            contract_name,
            address,
            transaction_hash: B256::repeat_byte(index),
            block_number: Some(index as u64),
            gas_used: Some(500_000),
        })
    }

    async fn transact(
        &mut self,
        contract: &DeployedContract,
        function: &str,
        args: Vec<Scalar>,
    ) -> Result<B256> {
        self.calls
            .push((contract.contract_name.clone(), function.to_string(), args));
        Ok(B256::repeat_byte(0xee))
    }
}

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("CONFIG.yaml");
    std::fs::write(&path, content).expect("Failed to write config");
    path
}

fn write_artifacts(dir: &Path) -> ArtifactStore {
    let uint = |name: &str| json!({ "name": name, "type": "uint256", "internalType": "uint256" });
    let artifacts = [
        (
            MIGRATIONS,
            json!([{
                "type": "function",
                "name": "setCompleted",
                "inputs": [uint("completed")],
                "outputs": [],
                "stateMutability": "nonpayable"
            }]),
        ),
        (
            FEDERATED_MODEL,
            json!([{
                "type": "constructor",
                "inputs": [
                    uint("_inputDimension"),
                    uint("_outputDimension"),
                    uint("_learningRate"),
                    uint("_precision"),
                    uint("_batchSize"),
                    uint("_intervalTime")
                ],
                "stateMutability": "nonpayable"
            }]),
        ),
        (VERIFIER, json!([])),
    ];

    std::fs::create_dir_all(dir).unwrap();
    let store = ArtifactStore::new(dir);
    for (name, abi) in artifacts {
        let artifact = json!({
            "contractName": name,
            "abi": abi,
            "bytecode": "0x6080604052348015600f57600080fd5b50",
        });
        std::fs::write(store.path_for(name), artifact.to_string()).unwrap();
    }
    store
}

#[tokio::test]
async fn test_deploys_three_contracts_in_order() {
    let config = DeploymentConfig::from_yaml_str(CONFIG).unwrap();
    let mut framework = RecordingFramework::default();

    let outcome = InitialMigration::new(config).run(&mut framework).await.unwrap();

    assert_eq!(
        framework.deployed_names(),
        vec![MIGRATIONS, FEDERATED_MODEL, VERIFIER]
    );
    assert_eq!(outcome.migrations.address, Address::repeat_byte(1));
    assert_eq!(outcome.federated_model.address, Address::repeat_byte(2));
    assert_eq!(outcome.verifier.address, Address::repeat_byte(3));
}

#[tokio::test]
async fn test_request_arguments_come_from_config() {
    let config = DeploymentConfig::from_yaml_str(CONFIG).unwrap();
    let mut framework = RecordingFramework::default();

    InitialMigration::new(config).run(&mut framework).await.unwrap();

    let [migrations, federated_model, verifier] = &framework.deployments[..] else {
        panic!("expected exactly three deployments");
    };

    assert!(migrations.args.is_empty());
    assert_eq!(migrations.options, TxOptions::default());

    assert_eq!(
        federated_model.args,
        vec![
            Scalar::Unsigned(6),
            Scalar::Unsigned(3),
            Scalar::Unsigned(15),
            Scalar::Unsigned(1000),
            Scalar::Unsigned(10),
            Scalar::Unsigned(120),
        ]
    );
    assert_eq!(federated_model.options.gas, None);

    assert!(verifier.args.is_empty());
    assert_eq!(verifier.options.gas, Some(6_000_000));
}

#[tokio::test]
async fn test_records_migration_completion() {
    let config = DeploymentConfig::from_yaml_str(CONFIG).unwrap();

    let mut framework = RecordingFramework::default();
    InitialMigration::new(config.clone()).run(&mut framework).await.unwrap();
    assert_eq!(
        framework.calls,
        vec![(
            MIGRATIONS.to_string(),
            "setCompleted".to_string(),
            vec![Scalar::Unsigned(InitialMigration::NUMBER)]
        )]
    );

    let mut framework = RecordingFramework::default();
    InitialMigration::new(config)
        .record_completion(false)
        .run(&mut framework)
        .await
        .unwrap();
    assert!(framework.calls.is_empty());
}

#[tokio::test]
async fn test_stops_at_first_failed_deployment() {
    let config = DeploymentConfig::from_yaml_str(CONFIG).unwrap();
    let mut framework = RecordingFramework::failing_on(FEDERATED_MODEL);

    let result = InitialMigration::new(config).run(&mut framework).await;

    assert!(result.is_err());
    assert_eq!(framework.deployed_names(), vec![MIGRATIONS]);
    assert!(framework.calls.is_empty());
}

#[test]
fn test_missing_config_fails_before_any_request() {
    let dir = TempDir::new("fedchain-it").unwrap();

    let err = Migrator::load(&dir.path().join("CONFIG.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Load { .. }));
}

#[test]
fn test_missing_key_fails_before_any_request() {
    let dir = TempDir::new("fedchain-it").unwrap();
    let path = write_config(&dir, &CONFIG.replace("  IntervalTime: 120\n", ""));

    let err = Migrator::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[tokio::test]
async fn test_second_run_is_up_to_date() {
    let dir = TempDir::new("fedchain-it").unwrap();
    let config_path = write_config(&dir, CONFIG);
    let outdata = dir.path().join("deployments");

    let migrator = Migrator::load(&config_path).unwrap().outdata(&outdata);

    let mut framework = RecordingFramework::default();
    let first = migrator.run(&mut framework).await.unwrap();
    assert_eq!(first.status, MigrationStatus::Deployed);
    assert_eq!(first.chain_id, CHAIN_ID);
    assert_eq!(
        first.manifest_path.as_deref(),
        Some(outdata.join("1337.json").as_path())
    );

    let second = migrator.run(&mut framework).await.unwrap();
    assert_eq!(second.status, MigrationStatus::UpToDate);
    assert_eq!(framework.deployments.len(), 3);
    assert_eq!(second.contracts, first.contracts);

    let reset = migrator.clone().reset(true).run(&mut framework).await.unwrap();
    assert_eq!(reset.status, MigrationStatus::Deployed);
    assert_eq!(framework.deployments.len(), 6);
}

#[tokio::test]
async fn test_wiped_chain_redeploys() {
    let dir = TempDir::new("fedchain-it").unwrap();
    let config_path = write_config(&dir, CONFIG);
    let outdata = dir.path().join("deployments");

    let migrator = Migrator::load(&config_path)
        .unwrap()
        .outdata(&outdata)
        .write_addresses(true);

    let mut framework = RecordingFramework::default();
    migrator.run(&mut framework).await.unwrap();

    // Same chain id, but none of the recorded contracts exist any more.
    let mut wiped = RecordingFramework::default();
    let report = migrator.run(&mut wiped).await.unwrap();

    assert_eq!(report.status, MigrationStatus::Deployed);
    assert_eq!(
        wiped.deployed_names(),
        vec![MIGRATIONS, FEDERATED_MODEL, VERIFIER]
    );
    for contract in &report.contracts {
        assert!(wiped.code.contains(&contract.address));
    }

    let document: serde_yaml::Value =
        serde_yaml::from_str(&std::fs::read_to_string(&config_path).unwrap()).unwrap();
    let verifier = report
        .contracts
        .iter()
        .find(|c| c.contract_name == VERIFIER)
        .unwrap();
    assert_eq!(
        document["DEFAULT"]["VerifierContractAddress"].as_str(),
        Some(verifier.address.to_checksum(None).as_str())
    );
}

#[tokio::test]
async fn test_partially_wiped_chain_redeploys() {
    let dir = TempDir::new("fedchain-it").unwrap();
    let config_path = write_config(&dir, CONFIG);
    let migrator = Migrator::load(&config_path)
        .unwrap()
        .outdata(dir.path().join("deployments"));

    let mut framework = RecordingFramework::default();
    let first = migrator.run(&mut framework).await.unwrap();

    framework.code.remove(&first.contracts[2].address);
    let report = migrator.run(&mut framework).await.unwrap();

    assert_eq!(report.status, MigrationStatus::Deployed);
    assert_eq!(framework.deployments.len(), 6);
}

#[tokio::test]
async fn test_changed_config_redeploys() {
    let dir = TempDir::new("fedchain-it").unwrap();
    let config_path = write_config(&dir, CONFIG);
    let outdata = dir.path().join("deployments");

    let mut framework = RecordingFramework::default();
    Migrator::load(&config_path)
        .unwrap()
        .outdata(&outdata)
        .run(&mut framework)
        .await
        .unwrap();

    write_config(&dir, &CONFIG.replace("BatchSize: 10", "BatchSize: 20"));

    let mut framework = RecordingFramework::default();
    let report = Migrator::load(&config_path)
        .unwrap()
        .outdata(&outdata)
        .run(&mut framework)
        .await
        .unwrap();

    assert_eq!(report.status, MigrationStatus::Deployed);
    assert_eq!(framework.deployments[1].args[4], Scalar::Unsigned(20));
}

#[tokio::test]
async fn test_failed_migration_writes_no_manifest() {
    let dir = TempDir::new("fedchain-it").unwrap();
    let config_path = write_config(&dir, CONFIG);
    let outdata = dir.path().join("deployments");

    let mut framework = RecordingFramework::failing_on(VERIFIER);
    let result = Migrator::load(&config_path)
        .unwrap()
        .outdata(&outdata)
        .run(&mut framework)
        .await;

    assert!(result.is_err());
    assert!(!outdata.join("1337.json").exists());
}

#[tokio::test]
async fn test_write_addresses_updates_config() {
    let dir = TempDir::new("fedchain-it").unwrap();
    let config_path = write_config(&dir, CONFIG);

    let mut framework = RecordingFramework::default();
    Migrator::load(&config_path)
        .unwrap()
        .outdata(dir.path().join("deployments"))
        .write_addresses(true)
        .run(&mut framework)
        .await
        .unwrap();

    let document: serde_yaml::Value =
        serde_yaml::from_str(&std::fs::read_to_string(&config_path).unwrap()).unwrap();
    let expected_model = Address::repeat_byte(2).to_checksum(None);
    let expected_verifier = Address::repeat_byte(3).to_checksum(None);
    assert_eq!(
        document["DEFAULT"]["FLContractAddress"].as_str(),
        Some(expected_model.as_str())
    );
    assert_eq!(
        document["DEFAULT"]["VerifierContractAddress"].as_str(),
        Some(expected_verifier.as_str())
    );
    assert_eq!(document["DEFAULT"]["Rounds"].as_u64(), Some(50));
}

#[tokio::test]
async fn test_dry_run_validates_artifacts_without_manifest() {
    let dir = TempDir::new("fedchain-it").unwrap();
    let config_path = write_config(&dir, CONFIG);
    let outdata = dir.path().join("deployments");
    let store = write_artifacts(&dir.path().join("build/contracts"));

    let mut framework = DryRunFramework::new(store);
    let report = Migrator::load(&config_path)
        .unwrap()
        .outdata(&outdata)
        .dry_run(true)
        .write_addresses(true)
        .run(&mut framework)
        .await
        .unwrap();

    assert_eq!(report.status, MigrationStatus::DryRun);
    assert_eq!(report.contracts.len(), 3);
    assert!(report.manifest_path.is_none());
    assert!(!outdata.exists());

    let untouched = std::fs::read_to_string(&config_path).unwrap();
    assert_eq!(untouched, CONFIG);
}

#[tokio::test]
async fn test_dry_run_rejects_fractional_argument() {
    let dir = TempDir::new("fedchain-it").unwrap();
    let config_path = write_config(&dir, &CONFIG.replace("LearningRate: 15", "LearningRate: 0.15"));
    let store = write_artifacts(&dir.path().join("build/contracts"));

    let mut framework = DryRunFramework::new(store);
    let result = Migrator::load(&config_path)
        .unwrap()
        .dry_run(true)
        .run(&mut framework)
        .await;

    assert!(result.is_err());
}
