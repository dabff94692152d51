//! Pagewright CLI entry point.

use clap::Parser;

use pagewright::cli::commands::{generate, init, orchestrate, patterns, validate};
use pagewright::cli::{self, Cli, Commands};
use pagewright::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        cli::handle_error(err, json);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli::load_config(&cli)?;
    let _logger = LoggerImpl::init(&config.logging)?;

    match cli.command {
        Commands::Init(args) => init::execute(args, cli.json),
        Commands::Orchestrate(args) => {
            let pagewright = cli::connect(config).await?;
            let result = orchestrate::execute(args, &pagewright, cli.json).await;
            pagewright.close().await;
            result
        }
        Commands::Generate(args) => {
            let pagewright = cli::connect(config).await?;
            let result = generate::execute(args, &pagewright, cli.json).await;
            pagewright.close().await;
            result
        }
        Commands::Validate(args) => {
            let pagewright = cli::connect(config).await?;
            validate::execute(args, &pagewright, cli.json).await
        }
        Commands::Patterns(command) => {
            let pagewright = cli::connect(config).await?;
            patterns::execute(command, &pagewright, cli.json).await
        }
    }
}
