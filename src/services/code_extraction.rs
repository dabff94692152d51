//! Pull source code out of model responses.

use regex::Regex;
use std::sync::LazyLock;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+.-]*[ \t]*\r?\n(.*?)\r?\n[ \t]*```")
        .expect("fence pattern is valid")
});

/// Code recovered from a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedCode {
    pub code: String,
    /// True when a complete fenced block was found.
    pub fenced: bool,
}

/// Prefer the first well-formed fenced block; otherwise drop any stray
/// fence lines and keep the rest.
pub fn extract_code(response: &str) -> ExtractedCode {
    if let Some(block) = FENCED_BLOCK.captures(response).and_then(|c| c.get(1)) {
        let code = block.as_str().trim_matches('\n').to_string();
        if !code.trim().is_empty() {
            return ExtractedCode { code, fenced: true };
        }
    }

    ExtractedCode {
        code: strip_fences(response),
        fenced: false,
    }
}

/// Remove lines that open or close a fence.
pub fn strip_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
