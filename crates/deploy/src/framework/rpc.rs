//! JSON-RPC deployment against an Ethereum node with unlocked accounts.

use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes, U64};
use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{
    ArtifactStore, Scalar,
    rpc::{self, json_rpc_call, poll_until, quantity},
};

use super::{DeployRequest, DeployedContract, DeploymentFramework};

/// Default time to wait for a transaction to be mined.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Default interval between receipt polls.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Settings for [`RpcFramework::connect`].
#[derive(Debug, Clone)]
pub struct RpcFrameworkConfig {
    /// The JSON-RPC endpoint of the node.
    pub rpc_url: String,
    /// The sending account. Defaults to the node's first account.
    pub from: Option<Address>,
    /// The chain id the node is expected to report.
    pub expected_chain_id: Option<u64>,
    pub confirmation_timeout: Duration,
}

impl RpcFrameworkConfig {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            from: None,
            expected_chain_id: None,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionReceipt {
    transaction_hash: B256,
    #[serde(default)]
    contract_address: Option<Address>,
    #[serde(default)]
    status: Option<U64>,
    #[serde(default)]
    block_number: Option<U64>,
    #[serde(default)]
    gas_used: Option<U64>,
}

impl TransactionReceipt {
    /// Pre-Byzantium receipts carry no status; they are treated as successful.
    fn succeeded(&self) -> bool {
        self.status.is_none_or(|status| status == U64::from(1))
    }
}

/// Deploys contracts by sending `eth_sendTransaction` from a node-managed account.
pub struct RpcFramework {
    client: reqwest::Client,
    rpc_url: String,
    from: Address,
    chain_id: u64,
    artifacts: ArtifactStore,
    confirmation_timeout: Duration,
}

impl RpcFramework {
    /// Connect to the node, resolve the sender and check the chain id.
    pub async fn connect(config: RpcFrameworkConfig, artifacts: ArtifactStore) -> Result<Self> {
        let client = rpc::create_client()?;

        let chain_id: U64 = json_rpc_call(&client, &config.rpc_url, "eth_chainId", vec![])
            .await
            .with_context(|| format!("Failed to reach Ethereum node at {}", config.rpc_url))?;
        let chain_id = chain_id.to::<u64>();

        if let Some(expected) = config.expected_chain_id {
            if expected != chain_id {
                anyhow::bail!(
                    "Chain id mismatch: node at {} reports {}, expected {}",
                    config.rpc_url,
                    chain_id,
                    expected
                );
            }
        }

        let from = match config.from {
            Some(from) => from,
            None => {
                let accounts: Vec<Address> =
                    json_rpc_call(&client, &config.rpc_url, "eth_accounts", vec![])
                        .await
                        .context("Failed to list node accounts")?;
                *accounts.first().with_context(|| {
                    format!(
                        "Node at {} has no unlocked accounts; pass a sender explicitly",
                        config.rpc_url
                    )
                })?
            }
        };

        tracing::info!(
            rpc_url = %config.rpc_url,
            chain_id,
            from = %from,
            "Connected to Ethereum node"
        );

        Ok(Self {
            client,
            rpc_url: config.rpc_url,
            from,
            chain_id,
            artifacts,
            confirmation_timeout: config.confirmation_timeout,
        })
    }

    /// The account deployments are sent from.
    pub fn from(&self) -> Address {
        self.from
    }

    async fn send_transaction(
        &self,
        to: Option<Address>,
        data: &Bytes,
        gas: Option<u64>,
    ) -> Result<B256> {
        let mut tx = serde_json::json!({
            "from": self.from,
            "data": data,
        });
        if let Some(to) = to {
            tx["to"] = serde_json::json!(to);
        }
        if let Some(gas) = gas {
            tx["gas"] = serde_json::json!(quantity(gas));
        }

        json_rpc_call(&self.client, &self.rpc_url, "eth_sendTransaction", vec![tx])
            .await
            .context("Failed to send transaction")
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TransactionReceipt> {
        let receipt = poll_until(
            &format!("receipt of {tx_hash}"),
            self.confirmation_timeout,
            RECEIPT_POLL_INTERVAL,
            || async move {
                json_rpc_call::<Option<TransactionReceipt>>(
                    &self.client,
                    &self.rpc_url,
                    "eth_getTransactionReceipt",
                    vec![serde_json::json!(tx_hash)],
                )
                .await
            },
        )
        .await?;

        if !receipt.succeeded() {
            anyhow::bail!("Transaction {} reverted", receipt.transaction_hash);
        }

        Ok(receipt)
    }
}

impl DeploymentFramework for RpcFramework {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn has_code(&self, address: Address) -> Result<bool> {
        let code: Bytes = json_rpc_call(
            &self.client,
            &self.rpc_url,
            "eth_getCode",
            vec![serde_json::json!(address), serde_json::json!("latest")],
        )
        .await
        .context("Failed to fetch deployed code")?;

        Ok(!code.is_empty())
    }

    async fn deploy(&mut self, request: DeployRequest) -> Result<DeployedContract> {
        let artifact = self.artifacts.load(&request.contract)?;
        let data = artifact.deploy_data(&request.args)?;

        tracing::info!(
            contract = %request.contract,
            args = ?request.args,
            gas = ?request.options.gas,
            "Deploying contract..."
        );

        let tx_hash = self
            .send_transaction(None, &data, request.options.gas)
            .await
            .with_context(|| format!("Failed to deploy {}", request.contract))?;

        tracing::debug!(contract = %request.contract, tx_hash = %tx_hash, "Deployment transaction sent");

        let receipt = self
            .wait_for_receipt(tx_hash)
            .await
            .with_context(|| format!("Deployment of {} failed", request.contract))?;

        let address = receipt.contract_address.with_context(|| {
            format!(
                "Receipt of {} deployment has no contract address",
                request.contract
            )
        })?;

        if !self.has_code(address).await? {
            anyhow::bail!(
                "{} was deployed at {} but no code is stored there (out of gas?)",
                request.contract,
                address
            );
        }

        let deployed = DeployedContract {
            contract_name: request.contract,
            address,
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number.map(|n| n.to::<u64>()),
            gas_used: receipt.gas_used.map(|n| n.to::<u64>()),
        };

        tracing::info!(
            contract = %deployed.contract_name,
            address = %deployed.address,
            tx_hash = %deployed.transaction_hash,
            gas_used = ?deployed.gas_used,
            "Contract deployed"
        );

        Ok(deployed)
    }

    async fn transact(
        &mut self,
        contract: &DeployedContract,
        function: &str,
        args: Vec<Scalar>,
    ) -> Result<B256> {
        let artifact = self.artifacts.load(&contract.contract_name)?;
        let data = artifact.call_data(function, &args)?;

        let tx_hash = self
            .send_transaction(Some(contract.address), &data, None)
            .await
            .with_context(|| format!("Failed to call {}.{}", contract.contract_name, function))?;

        self.wait_for_receipt(tx_hash)
            .await
            .with_context(|| format!("Call to {}.{} failed", contract.contract_name, function))?;

        tracing::debug!(
            contract = %contract.contract_name,
            function = %function,
            tx_hash = %tx_hash,
            "Transaction mined"
        );

        Ok(tx_hash)
    }
}
