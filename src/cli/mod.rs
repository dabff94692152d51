//! Command-line interface.

pub mod commands;
pub mod display;
pub mod types;

pub use types::{Cli, Commands};

use anyhow::{Context, Result};

use crate::application::Pagewright;
use crate::domain::models::{CompletionBackend, Config, EmbeddingBackend};
use crate::infrastructure::config::ConfigLoader;

/// Load configuration from `--config` or the standard hierarchy.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    if cli.offline {
        config.completion.backend = CompletionBackend::Scripted;
        config.embedding.backend = EmbeddingBackend::Hash;
    }
    Ok(config)
}

/// Build the facade and load the knowledge base.
pub async fn connect(config: Config) -> Result<Pagewright> {
    let pagewright = Pagewright::builder(config)
        .build()
        .context("Failed to set up Pagewright")?;
    pagewright
        .init()
        .await
        .context("Failed to load the knowledge base")?;
    Ok(pagewright)
}

/// Report a command failure and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let chain: Vec<String> = err.chain().map(ToString::to_string).collect();
        let body = serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "causes": chain.get(1..).unwrap_or_default(),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{}", display::action_failure(&format!("{err:#}")));
    }
    std::process::exit(1);
}
