//! Offline deployment: validates artifacts and constructor encoding without a node.

use alloy_core::primitives::{Address, B256};
use anyhow::Result;

use crate::{ArtifactStore, Scalar};

use super::{DeployRequest, DeployedContract, DeploymentFramework};

/// Chain id of a local development chain, reported when none is configured.
pub const DEFAULT_DRY_RUN_CHAIN_ID: u64 = 1337;

/// Simulates deployments from `sender`, predicting each contract's CREATE address from the
/// sender's nonce. Transaction hashes are left zero.
#[derive(Debug, Clone)]
pub struct DryRunFramework {
    artifacts: ArtifactStore,
    sender: Address,
    nonce: u64,
    chain_id: u64,
    deployed: Vec<Address>,
}

impl DryRunFramework {
    pub fn new(artifacts: ArtifactStore) -> Self {
        Self {
            artifacts,
            sender: Address::ZERO,
            nonce: 0,
            chain_id: DEFAULT_DRY_RUN_CHAIN_ID,
            deployed: Vec::new(),
        }
    }

    pub fn sender(mut self, sender: Address) -> Self {
        self.sender = sender;
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    fn next_nonce(&mut self) -> u64 {
        let nonce = self.nonce;
        self.nonce += 1;
        nonce
    }
}

impl DeploymentFramework for DryRunFramework {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Only contracts simulated by this framework have code.
    async fn has_code(&self, address: Address) -> Result<bool> {
        Ok(self.deployed.contains(&address))
    }

    async fn deploy(&mut self, request: DeployRequest) -> Result<DeployedContract> {
        let artifact = self.artifacts.load(&request.contract)?;
        let data = artifact.deploy_data(&request.args)?;

        let nonce = self.next_nonce();
        let address = self.sender.create(nonce);
        self.deployed.push(address);

        tracing::info!(
            contract = %request.contract,
            args = ?request.args,
            gas = ?request.options.gas,
            payload_len = data.len(),
            address = %address,
            "[dry-run] Contract would be deployed"
        );

        Ok(DeployedContract {
            contract_name: request.contract,
            address,
            transaction_hash: B256::ZERO,
            block_number: None,
            gas_used: None,
        })
    }

    async fn transact(
        &mut self,
        contract: &DeployedContract,
        function: &str,
        args: Vec<Scalar>,
    ) -> Result<B256> {
        let artifact = self.artifacts.load(&contract.contract_name)?;
        let data = artifact.call_data(function, &args)?;
        self.next_nonce();

        tracing::info!(
            contract = %contract.contract_name,
            function = %function,
            calldata = %data,
            "[dry-run] Transaction would be sent"
        );

        Ok(B256::ZERO)
    }
}
