//! Status and confidence coloring for CLI output.
//!
//! `console` drops styling automatically when stdout is not a terminal or
//! `NO_COLOR` is set.

use console::{style, StyledObject};

/// Green "ok" or red "failed".
pub fn colorize_status(success: bool) -> StyledObject<&'static str> {
    if success {
        style("ok").green().bold()
    } else {
        style("failed").red().bold()
    }
}

/// Confidence as a two-decimal figure: green at 0.8 and above, yellow from
/// 0.5, red below.
pub fn colorize_confidence(confidence: f32) -> StyledObject<String> {
    let text = format!("{confidence:.2}");
    if confidence >= 0.8 {
        style(text).green()
    } else if confidence >= 0.5 {
        style(text).yellow()
    } else {
        style(text).red()
    }
}

/// Dimmed field label for detail lines.
pub fn label(text: &str) -> StyledObject<String> {
    style(format!("{text}:")).dim()
}
