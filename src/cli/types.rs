//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::generate::GenerateArgs;
use super::commands::init::InitArgs;
use super::commands::orchestrate::OrchestrateArgs;
use super::commands::patterns::PatternCommands;
use super::commands::validate::ValidateArgs;

#[derive(Parser, Debug)]
#[command(name = "pagewright")]
#[command(about = "Pagewright - turn page descriptions into validated markup components", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .pagewright/config.yaml and local.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Use the scripted completion backend and hash embeddings
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create .pagewright/ with a default config and an empty pattern store
    Init(InitArgs),

    /// Plan and run the full pipeline for a request
    Orchestrate(OrchestrateArgs),

    /// Parse a request and generate one component
    Generate(GenerateArgs),

    /// Compile a component file, repairing it if needed
    Validate(ValidateArgs),

    /// Inspect the knowledge base
    #[command(subcommand)]
    Patterns(PatternCommands),
}
