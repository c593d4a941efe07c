use std::path::PathBuf;

use alloy_core::primitives::Address;
use clap::Parser;
use fedchain_deploy::{DEFAULT_ARTIFACTS_DIR, DEFAULT_CONFIG_FILENAME, DEFAULT_OUTDATA_DIR};
use tracing::level_filters::LevelFilter;

/// The RPC endpoint of a local Ganache instance.
const GANACHE_RPC_URL: &str = "http://127.0.0.1:7545";

#[derive(Debug, Clone, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum RpcEndpoint {
    Ganache,
    #[strum(default)]
    Custom(String),
}

impl RpcEndpoint {
    pub fn to_rpc_url(&self) -> anyhow::Result<String> {
        match self {
            RpcEndpoint::Ganache => Ok(GANACHE_RPC_URL.to_string()),
            RpcEndpoint::Custom(url) => {
                let parsed = url::Url::parse(url)
                    .map_err(|e| anyhow::anyhow!("Invalid RPC URL '{}': {}", url, e))?;
                Ok(parsed.to_string())
            }
        }
    }

    /// The endpoint to use: the command line wins over the configuration file, which wins
    /// over a local Ganache instance.
    pub fn resolve(cli: Option<&RpcEndpoint>, config: Option<&str>) -> RpcEndpoint {
        match (cli, config) {
            (Some(endpoint), _) => endpoint.clone(),
            (None, Some(url)) => RpcEndpoint::Custom(url.to_string()),
            (None, None) => RpcEndpoint::Ganache,
        }
    }
}

#[derive(Parser)]
#[command(name = "fedchain")]
#[command(
    author,
    version,
    about = "Deploy the federated learning contracts (Migrations, FederatedModel, Verifier)"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "FEDCHAIN_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to the YAML configuration file holding the `DEFAULT` deployment parameters.
    #[arg(short, long, env = "FEDCHAIN_CONFIG", default_value = DEFAULT_CONFIG_FILENAME)]
    pub config: PathBuf,

    /// The JSON-RPC endpoint of the Ethereum node (`ganache` or a URL).
    ///
    /// If not provided, `EtheriumRPCServer` from the configuration file is used, falling back
    /// to a local Ganache instance.
    #[arg(long, alias = "rpc", env = "FEDCHAIN_RPC_URL")]
    pub rpc_url: Option<RpcEndpoint>,

    /// Directory containing the compiled contract artifacts (`<ContractName>.json`).
    #[arg(long, env = "FEDCHAIN_ARTIFACTS", default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts: PathBuf,

    /// The account deployments are sent from. Must be unlocked on the node.
    ///
    /// Defaults to the node's first account.
    #[arg(long, env = "FEDCHAIN_FROM")]
    pub from: Option<Address>,

    /// Abort unless the node reports this chain id.
    #[arg(long, env = "FEDCHAIN_CHAIN_ID")]
    pub chain_id: Option<u64>,

    /// Directory where deployment manifests are stored, one per chain id.
    #[arg(long, env = "FEDCHAIN_OUTDATA", default_value = DEFAULT_OUTDATA_DIR)]
    pub outdata: PathBuf,

    /// Seconds to wait for each transaction to be mined.
    #[arg(long, env = "FEDCHAIN_CONFIRMATION_TIMEOUT", default_value_t = 120)]
    pub confirmation_timeout: u64,

    /// Redeploy all contracts, even if the manifest shows an up-to-date deployment.
    #[arg(long, env = "FEDCHAIN_RESET")]
    pub reset: bool,

    /// Validate artifacts and constructor arguments without sending any transaction.
    #[arg(long, env = "FEDCHAIN_DRY_RUN")]
    pub dry_run: bool,

    /// Write `FLContractAddress` and `VerifierContractAddress` back into the configuration
    /// file after deploying.
    #[arg(long, env = "FEDCHAIN_WRITE_ADDRESSES")]
    pub write_addresses: bool,

    /// Do not call `setCompleted` on the Migrations contract.
    #[arg(long, env = "FEDCHAIN_NO_RECORD_COMPLETION")]
    pub no_record_completion: bool,
}
