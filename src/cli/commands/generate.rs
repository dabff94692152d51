//! Implementation of the `pagewright generate` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::application::Pagewright;
use crate::cli::display::{colorize_confidence, label, output, CommandOutput};
use crate::domain::models::{ComponentRequirement, ValidationReport};

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Free-text description of the component
    pub request: String,

    /// Component name, used to filter retrieved patterns
    #[arg(long)]
    pub component: Option<String>,

    /// Run the compile-and-repair loop on the result
    #[arg(long)]
    pub validate: bool,

    /// Write the code to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOutput {
    pub requirement: ComponentRequirement,
    pub requirements_confidence: f32,
    pub strategy: String,
    pub confidence: f32,
    pub reasoning: String,
    pub validation: Option<ValidationReport>,
    pub code: String,
}

impl CommandOutput for GenerateOutput {
    fn to_human(&self) -> String {
        let layout = &self.requirement.layout;
        let mut lines = vec![
            format!(
                "{} {} (content {}, image {}), confidence {}",
                label("Layout"),
                layout.layout_type,
                layout.content_position,
                layout.image_position,
                colorize_confidence(self.requirements_confidence)
            ),
            format!(
                "{} {}, confidence {}",
                label("Strategy"),
                self.strategy,
                colorize_confidence(self.confidence)
            ),
        ];
        if let Some(report) = &self.validation {
            lines.push(format!(
                "{} compiled after {} attempt{}",
                label("Validation"),
                report.attempts,
                if report.attempts == 1 { "" } else { "s" }
            ));
        }
        lines.push(String::new());
        lines.push(self.code.clone());
        lines.join("\n")
    }
}

pub async fn execute(args: GenerateArgs, pagewright: &Pagewright, json_mode: bool) -> Result<()> {
    let component = pagewright
        .generate_component(&args.request, args.component.as_deref())
        .await
        .context("Generation failed")?;

    let validation = if args.validate {
        Some(
            pagewright
                .validate_and_fix_report(&component.result.code)
                .await
                .context("Generated code did not compile")?,
        )
    } else {
        None
    };
    let code = validation
        .as_ref()
        .map_or_else(|| component.result.code.clone(), |report| report.code.clone());

    if let Some(path) = &args.output {
        tokio::fs::write(path, &code)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    output(
        &GenerateOutput {
            requirement: component.requirements.primary(),
            requirements_confidence: component.requirements.confidence,
            strategy: component.result.strategy,
            confidence: component.result.confidence,
            reasoning: component.result.reasoning,
            validation,
            code,
        },
        json_mode,
    );
    Ok(())
}
