//! fedchain deploys the smart contracts of the federated learning system.

mod cli;
mod summary;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, RpcEndpoint};
use fedchain_deploy::{ArtifactStore, DryRunFramework, Migrator, RpcFramework, RpcFrameworkConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    // The configuration is loaded before anything is sent to the chain.
    let migrator = Migrator::load(&cli.config)?
        .outdata(&cli.outdata)
        .reset(cli.reset)
        .dry_run(cli.dry_run)
        .write_addresses(cli.write_addresses)
        .record_completion(!cli.no_record_completion);

    let artifacts = ArtifactStore::new(&cli.artifacts);

    tracing::info!(
        config_path = %cli.config.display(),
        artifacts = %artifacts.dir().display(),
        dry_run = cli.dry_run,
        "Loaded deployment configuration"
    );

    let report = if cli.dry_run {
        let mut framework = DryRunFramework::new(artifacts);
        if let Some(from) = cli.from {
            framework = framework.sender(from);
        }
        if let Some(chain_id) = cli.chain_id {
            framework = framework.with_chain_id(chain_id);
        }
        migrator.run(&mut framework).await?
    } else {
        let endpoint = RpcEndpoint::resolve(
            cli.rpc_url.as_ref(),
            migrator.config().rpc_server.as_deref(),
        );

        let mut rpc_config = RpcFrameworkConfig::new(endpoint.to_rpc_url()?);
        rpc_config.from = cli.from;
        rpc_config.expected_chain_id = cli.chain_id;
        rpc_config.confirmation_timeout = Duration::from_secs(cli.confirmation_timeout);

        let mut framework = RpcFramework::connect(rpc_config, artifacts).await?;
        migrator.run(&mut framework).await?
    };

    println!("{}", summary::render(&report));

    Ok(())
}
