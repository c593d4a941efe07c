//! The deployment framework: the collaborator that turns a deployment request into a
//! contract living on chain.
//!
//! The migration only describes *what* to deploy; an implementation of
//! [`DeploymentFramework`] decides *how*: over JSON-RPC against a node ([`RpcFramework`]) or
//! offline, validating artifacts and predicting addresses ([`DryRunFramework`]).

mod dry_run;
mod rpc;

use std::future::Future;

use alloy_core::primitives::{Address, B256};
use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::Scalar;

pub use dry_run::{DEFAULT_DRY_RUN_CHAIN_ID, DryRunFramework};
pub use rpc::{DEFAULT_CONFIRMATION_TIMEOUT, RpcFramework, RpcFrameworkConfig};

/// Transaction options attached to a deployment request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOptions {
    /// Gas limit for the transaction. The node estimates it when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<u64>,
}

/// A request to deploy one contract.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployRequest {
    /// The contract name, used to locate its artifact.
    pub contract: String,
    /// Positional constructor arguments.
    pub args: Vec<Scalar>,
    pub options: TxOptions,
}

impl DeployRequest {
    pub fn new(contract: impl Into<String>) -> Self {
        Self {
            contract: contract.into(),
            args: Vec::new(),
            options: TxOptions::default(),
        }
    }

    pub fn args(mut self, args: Vec<Scalar>) -> Self {
        self.args = args;
        self
    }

    pub fn gas(mut self, gas: u64) -> Self {
        self.options.gas = Some(gas);
        self
    }
}

/// A contract deployed by the framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedContract {
    pub contract_name: String,
    pub address: Address,
    pub transaction_hash: B256,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
}

/// Publishes contracts to a chain.
pub trait DeploymentFramework: Send {
    /// The chain id deployments are issued against.
    fn chain_id(&self) -> u64;

    /// Deploy a contract and wait until it is available at its address.
    fn deploy(
        &mut self,
        request: DeployRequest,
    ) -> impl Future<Output = Result<DeployedContract>> + Send;

    /// Whether contract code is stored at `address` on the chain.
    fn has_code(&self, address: Address) -> impl Future<Output = Result<bool>> + Send;

    /// Send a state-changing call to a deployed contract, returning the transaction hash.
    fn transact(
        &mut self,
        contract: &DeployedContract,
        function: &str,
        args: Vec<Scalar>,
    ) -> impl Future<Output = Result<B256>> + Send;
}
