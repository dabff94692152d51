//! Implementation of the `pagewright validate` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::application::Pagewright;
use crate::cli::display::{action_success, output, CommandOutput};
use crate::domain::models::ValidationReport;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Component source file
    pub file: PathBuf,

    /// Write the repaired code back to the file
    #[arg(short, long)]
    pub write: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateOutput {
    pub file: PathBuf,
    pub written: bool,
    #[serde(flatten)]
    pub report: ValidationReport,
}

impl CommandOutput for ValidateOutput {
    fn to_human(&self) -> String {
        let mut message = format!(
            "{} compiles ({} attempt{})",
            self.file.display(),
            self.report.attempts,
            if self.report.attempts == 1 { "" } else { "s" }
        );
        if self.report.repaired {
            message.push_str(if self.written {
                ", repaired in place"
            } else {
                ", repaired (use --write to save)"
            });
        }

        let mut lines = vec![action_success(&message)];
        if self.report.repaired && !self.written {
            lines.push(String::new());
            lines.push(self.report.code.clone());
        }
        lines.join("\n")
    }
}

pub async fn execute(args: ValidateArgs, pagewright: &Pagewright, json_mode: bool) -> Result<()> {
    let code = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let report = pagewright
        .validate_and_fix_report(&code)
        .await
        .with_context(|| format!("{} could not be repaired", args.file.display()))?;

    let written = args.write && report.repaired;
    if written {
        tokio::fs::write(&args.file, &report.code)
            .await
            .with_context(|| format!("Failed to write {}", args.file.display()))?;
    }

    output(
        &ValidateOutput {
            file: args.file,
            written,
            report,
        },
        json_mode,
    );
    Ok(())
}
