use anyhow::Context;
use clap::Parser;
use clido_core::{Config, Db};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

mod cli;
mod cmd;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Completion { shell } => cmd::cmd_completion(shell),
        Commands::Version => cmd::cmd_version(),
        command => {
            let config = Config::resolve(cli.db)?;
            tracing::debug!(db = %config.db_path.display(), "resolved configuration");
            let db = Db::connect(&config)
                .await
                .with_context(|| format!("opening database {}", config.db_path.display()))?;

            let result = cmd::run(&db, command).await;
            db.close().await;
            result?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "clido=debug,clido_core=debug"
    } else {
        "clido=warn,clido_core=warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
