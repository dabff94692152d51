//! Implementation of the `pagewright patterns` commands.

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::Serialize;

use crate::application::Pagewright;
use crate::cli::display::{
    colorize_confidence, colorize_status, label, list_table, output, render_list, short_id,
    truncate, CommandOutput,
};
use crate::domain::models::{GenerationPattern, KnowledgeBaseStats};

#[derive(Subcommand, Debug)]
pub enum PatternCommands {
    /// List recorded patterns, newest first
    List {
        /// Maximum number of patterns to display
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Rank recorded patterns by similarity to a query
    Search {
        query: String,

        /// Only patterns with this component name
        #[arg(long)]
        component: Option<String>,

        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Knowledge base totals
    Stats,
}

#[derive(Debug, Serialize)]
pub struct PatternRow {
    pub id: String,
    pub component_name: String,
    pub user_request: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
    pub timestamp: String,
}

impl PatternRow {
    fn from_pattern(pattern: &GenerationPattern, similarity: Option<f32>) -> Self {
        Self {
            id: pattern.id.to_string(),
            component_name: pattern.component_name.clone(),
            user_request: pattern.user_request.clone(),
            success: pattern.success,
            similarity,
            timestamp: pattern.timestamp.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PatternListOutput {
    pub patterns: Vec<PatternRow>,
}

impl CommandOutput for PatternListOutput {
    fn to_human(&self) -> String {
        let with_similarity = self.patterns.iter().any(|p| p.similarity.is_some());
        let mut headers = vec!["id", "component", "request", "status"];
        headers.push(if with_similarity { "similarity" } else { "recorded" });

        let mut table = list_table(&headers);
        for row in &self.patterns {
            let last = match row.similarity {
                Some(similarity) => colorize_confidence(similarity).to_string(),
                None => row.timestamp.clone(),
            };
            table.add_row(vec![
                short_id(&row.id).to_string(),
                row.component_name.clone(),
                truncate(&row.user_request, 50),
                colorize_status(row.success).to_string(),
                last,
            ]);
        }
        render_list("pattern", table, self.patterns.len())
    }
}

#[derive(Debug, Serialize)]
pub struct PatternStatsOutput {
    #[serde(flatten)]
    pub stats: KnowledgeBaseStats,
    pub success_rate: f32,
    pub cached_embeddings: u64,
}

impl CommandOutput for PatternStatsOutput {
    fn to_human(&self) -> String {
        [
            format!("{} {}", label("Patterns"), self.stats.total_patterns),
            format!(
                "{} {} ({:.0}%)",
                label("Successful"),
                self.stats.successful_patterns,
                self.success_rate * 100.0
            ),
            format!("{} {}", label("Embedded"), self.stats.embedded_patterns),
            format!("{} {}", label("Cached embeddings"), self.cached_embeddings),
            format!(
                "{} {}",
                label("Retrieval"),
                if self.stats.retrieval_enabled { "enabled" } else { "disabled" }
            ),
        ]
        .join("\n")
    }
}

pub async fn execute(command: PatternCommands, pagewright: &Pagewright, json_mode: bool) -> Result<()> {
    let knowledge_base = pagewright.knowledge_base();

    match command {
        PatternCommands::List { limit } => {
            let mut patterns = knowledge_base
                .patterns()
                .await
                .context("Failed to read patterns")?;
            patterns.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            let rows = patterns
                .iter()
                .take(limit)
                .map(|p| PatternRow::from_pattern(p, None))
                .collect();
            output(&PatternListOutput { patterns: rows }, json_mode);
        }
        PatternCommands::Search {
            query,
            component,
            limit,
        } => {
            let entries = knowledge_base
                .find_similar_patterns(&query, component.as_deref(), limit)
                .await
                .context("Pattern search failed")?;
            let rows = entries
                .iter()
                .map(|e| PatternRow::from_pattern(&e.pattern, Some(e.similarity)))
                .collect();
            output(&PatternListOutput { patterns: rows }, json_mode);
        }
        PatternCommands::Stats => {
            let stats = knowledge_base
                .stats()
                .await
                .context("Failed to read knowledge base stats")?;
            output(
                &PatternStatsOutput {
                    success_rate: stats.success_rate(),
                    stats,
                    cached_embeddings: pagewright.embeddings().entry_count().await,
                },
                json_mode,
            );
        }
    }

    Ok(())
}
