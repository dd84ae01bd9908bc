//! CLI entry point - the composition root.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use newscast_cli::handlers::{self, play::PlayArgs};
use newscast_cli::{Cli, CliConfig, CliError, Commands, bootstrap};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        let code = err.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
        eprintln!("Error: {err:#}");
        std::process::exit(code);
    }
}

/// `RUST_LOG` wins; otherwise `-v` raises the default from `warn` to `debug`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::from_cli(&cli)?;

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Play {
            category,
            count,
            manual,
            rate,
        } => {
            let ctx = bootstrap(&config.with_chars_per_second(rate)).await?;
            let args = PlayArgs {
                category,
                count,
                manual,
            };
            handlers::play::execute(&ctx, args).await?;
        }
        Commands::Categories { fetch } => {
            let ctx = bootstrap(&config).await?;
            handlers::categories::execute(&ctx, fetch).await?;
        }
        Commands::History { reset } => {
            let ctx = bootstrap(&config).await?;
            handlers::history::execute(&ctx, reset).await?;
        }
    }

    Ok(())
}
