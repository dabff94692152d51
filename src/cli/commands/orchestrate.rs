//! Implementation of the `pagewright orchestrate` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::application::Pagewright;
use crate::cli::display::{
    colorize_confidence, colorize_status, label, list_table, output, truncate, CommandOutput,
};
use crate::domain::models::{AgentResult, OrchestrationPlan};
use crate::services::orchestrator::final_code;

#[derive(Args, Debug)]
pub struct OrchestrateArgs {
    /// Free-text description of the page or component
    pub request: String,

    /// Print the plan without running it
    #[arg(long)]
    pub plan_only: bool,

    /// Write the final code to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrateOutput {
    pub request: String,
    pub plan: OrchestrationPlan,
    pub results: Vec<AgentResult>,
    pub code: Option<String>,
}

impl CommandOutput for OrchestrateOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "{} {} tasks{}, estimated {:.0}s",
            label("Plan"),
            self.plan.tasks.len(),
            if self.plan.is_fallback { " (fallback)" } else { "" },
            self.plan.estimated_time
        )];

        let mut table = list_table(&["order", "task", "type", "deps"]);
        for (i, id) in self.plan.execution_order.iter().enumerate() {
            let (kind, deps) = self.plan.task(id).map_or(("?".to_string(), String::new()), |t| {
                (t.kind.to_string(), t.dependencies.join(", "))
            });
            table.add_row(vec![(i + 1).to_string(), id.clone(), kind, deps]);
        }
        lines.push(table.to_string());

        if !self.results.is_empty() {
            let mut table = list_table(&["task", "status", "confidence", "reasoning"]);
            for result in &self.results {
                table.add_row(vec![
                    result.task_id.clone(),
                    colorize_status(result.success).to_string(),
                    colorize_confidence(result.confidence).to_string(),
                    truncate(&result.reasoning, 60),
                ]);
            }
            lines.push(String::new());
            lines.push(table.to_string());
        }

        if let Some(code) = &self.code {
            lines.push(String::new());
            lines.push(code.clone());
        }
        lines.join("\n")
    }
}

pub async fn execute(args: OrchestrateArgs, pagewright: &Pagewright, json_mode: bool) -> Result<()> {
    let plan = pagewright.plan(&args.request).await;
    let results = if args.plan_only {
        Vec::new()
    } else {
        pagewright.execute(&plan, &args.request).await
    };
    let code = final_code(&results).map(str::to_string);

    if let (Some(path), Some(code)) = (&args.output, &code) {
        tokio::fs::write(path, code)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    output(
        &OrchestrateOutput {
            request: args.request,
            plan,
            results,
            code,
        },
        json_mode,
    );
    Ok(())
}
