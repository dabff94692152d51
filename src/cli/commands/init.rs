//! Implementation of the `pagewright init` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::display::{action_success, output, CommandOutput};
use crate::infrastructure::setup::{self, SetupPaths};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config file (the pattern store is never truncated)
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub config_file: PathBuf,
    pub store_file: PathBuf,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        if !self.success {
            return self.message.clone();
        }
        [
            action_success(&self.message),
            format!("  config: {}", self.config_file.display()),
            format!("  patterns: {}", self.store_file.display()),
        ]
        .join("\n")
    }
}

pub fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let root = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };
    let paths = SetupPaths::in_dir(&root);

    let out = if paths.is_initialized() && !args.force {
        InitOutput {
            success: false,
            message: "Project already initialized. Use --force to rewrite the config.".to_string(),
            config_file: paths.config_file,
            store_file: paths.store_file,
        }
    } else {
        setup::initialize(&paths, args.force)
            .with_context(|| format!("Failed to initialize {}", root.display()))?;
        InitOutput {
            success: true,
            message: if args.force {
                "Project reinitialized.".to_string()
            } else {
                "Project initialized.".to_string()
            },
            config_file: paths.config_file,
            store_file: paths.store_file,
        }
    };

    output(&out, json_mode);
    Ok(())
}
