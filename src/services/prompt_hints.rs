//! Keyword heuristics over the raw request text.
//!
//! Hints recover the obvious structure of a request ("headline on the right",
//! "three pricing cards") without a model call. They fill gaps left in
//! model-parsed requirements and seed the default requirement when every
//! parsing path failed, so degraded output still reflects the request.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::domain::models::{ComponentRequirement, LayoutSpec, StylingSpec};

static POSITION_AFTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?P<subject>headline|heading|title|text|copy|content|tagline|image|photo|picture|illustration|video)s?\b[^.,;]{0,30}?\b(?:on|to|at|in)\s+the\s+(?P<side>left|right|top|bottom|center|middle)\b",
    )
    .expect("position pattern is valid")
});

static POSITION_BEFORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?P<side>left|right)(?:-|\s)?(?:side|aligned)?\s+(?P<subject>headline|heading|title|text|copy|content|image|photo|picture|illustration|video)s?\b",
    )
    .expect("position pattern is valid")
});

static COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?P<n>\d{1,2}|one|two|three|four|five|six|seven|eight|nine|ten|twelve)\s+(?:\w+\s+)?(?P<noun>cards?|columns?|features?|items?|testimonials?|sections?|images?|buttons?|plans?|tiers?|links?|slides?|steps?)\b",
    )
    .expect("count pattern is valid")
});

const ELEMENT_KEYWORDS: &[(&str, &[&str])] = &[
    ("headline", &["headline", "heading", "title"]),
    ("subheadline", &["subheadline", "subheading", "subtitle", "tagline"]),
    ("image", &["image", "photo", "picture", "illustration"]),
    ("button", &["button", "cta", "call to action", "call-to-action"]),
    ("logo", &["logo"]),
    ("navigation", &["nav", "navbar", "navigation", "menu"]),
    ("form", &["form", "signup", "sign up", "newsletter"]),
    ("video", &["video"]),
    ("testimonial", &["testimonial", "review", "quote"]),
    ("pricing", &["pricing", "price", "plan"]),
    ("card", &["card"]),
];

const LAYOUT_KEYWORDS: &[(&str, &[&str])] = &[
    ("grid", &["grid", "columns", "gallery"]),
    ("carousel", &["carousel", "slider", "slideshow"]),
    ("hero", &["hero", "banner", "landing"]),
    ("navbar", &["navbar", "navigation bar", "header"]),
    ("footer", &["footer"]),
];

/// Structure recovered from the request text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptHints {
    pub content_position: Option<String>,
    pub image_position: Option<String>,
    pub layout_type: Option<String>,
    pub direction: Option<String>,
    pub elements: Vec<String>,
    pub counts: BTreeMap<String, u32>,
    pub theme: Option<String>,
}

impl PromptHints {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fill fields of `requirement` that still hold their defaults.
    /// Values a model produced are never overwritten.
    pub fn apply(&self, requirement: &mut ComponentRequirement) {
        let layout_defaults = LayoutSpec::default();
        let layout = &mut requirement.layout;
        fill(&mut layout.content_position, &layout_defaults.content_position, &self.content_position);
        fill(&mut layout.image_position, &layout_defaults.image_position, &self.image_position);
        fill(&mut layout.layout_type, &layout_defaults.layout_type, &self.layout_type);
        fill(&mut layout.direction, &layout_defaults.direction, &self.direction);

        let content = &mut requirement.content;
        for element in &self.elements {
            if !content.elements.iter().any(|e| e.eq_ignore_ascii_case(element)) {
                content.elements.push(element.clone());
            }
        }
        for (noun, n) in &self.counts {
            content.counts.entry(noun.clone()).or_insert(*n);
        }

        fill(
            &mut requirement.styling.theme,
            &StylingSpec::default().theme,
            &self.theme,
        );
    }

    /// A normalized requirement built from hints alone.
    pub fn to_requirement(&self) -> ComponentRequirement {
        let mut requirement = ComponentRequirement::default();
        self.apply(&mut requirement);
        requirement
    }
}

fn fill(target: &mut String, default: &str, hint: &Option<String>) {
    if let Some(value) = hint {
        if target == default {
            *target = value.clone();
        }
    }
}

/// Extract hints from a request.
pub fn extract_hints(prompt: &str) -> PromptHints {
    let lower = prompt.to_lowercase();
    let mut hints = PromptHints::default();

    for caps in POSITION_AFTER
        .captures_iter(prompt)
        .chain(POSITION_BEFORE.captures_iter(prompt))
    {
        let (Some(subject), Some(side)) = (caps.name("subject"), caps.name("side")) else {
            continue;
        };
        let side = match side.as_str().to_lowercase().as_str() {
            "middle" => "center".to_string(),
            other => other.to_string(),
        };
        let slot = if is_media(subject.as_str()) {
            &mut hints.image_position
        } else {
            &mut hints.content_position
        };
        if slot.is_none() {
            *slot = Some(side);
        }
    }

    // One side given, the other implied by the split.
    let mentions_media = ["image", "photo", "picture", "illustration", "video"]
        .iter()
        .any(|w| lower.contains(w));
    match (&hints.content_position, &hints.image_position) {
        (Some(content), None) if mentions_media => hints.image_position = opposite(content),
        (None, Some(image)) => hints.content_position = opposite(image),
        _ => {}
    }

    let horizontal = |p: &Option<String>| matches!(p.as_deref(), Some("left" | "right"));
    if horizontal(&hints.content_position) || horizontal(&hints.image_position) {
        hints.direction = Some("horizontal".to_string());
        if horizontal(&hints.content_position) && horizontal(&hints.image_position) {
            hints.layout_type = Some("split".to_string());
        }
    }

    if hints.layout_type.is_none() {
        hints.layout_type = LAYOUT_KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| contains_word(&lower, w)))
            .map(|(layout, _)| (*layout).to_string());
    }

    for (element, words) in ELEMENT_KEYWORDS {
        if words.iter().any(|w| contains_word(&lower, w)) {
            hints.elements.push((*element).to_string());
        }
    }

    for caps in COUNT.captures_iter(&lower) {
        let (Some(n), Some(noun)) = (caps.name("n"), caps.name("noun")) else {
            continue;
        };
        if let Some(n) = parse_count(n.as_str()) {
            let noun = noun.as_str();
            let singular = noun.strip_suffix('s').unwrap_or(noun);
            hints.counts.entry(format!("{singular}s")).or_insert(n);
        }
    }

    if contains_word(&lower, "dark") {
        hints.theme = Some("dark".to_string());
    }

    hints
}

fn is_media(subject: &str) -> bool {
    matches!(
        subject.to_lowercase().as_str(),
        "image" | "photo" | "picture" | "illustration" | "video"
    )
}

fn opposite(side: &str) -> Option<String> {
    match side {
        "left" => Some("right".to_string()),
        "right" => Some("left".to_string()),
        "top" => Some("bottom".to_string()),
        "bottom" => Some("top".to_string()),
        _ => None,
    }
}

/// Word-boundary containment; allows a trailing plural `s`.
fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.match_indices(word).any(|(idx, _)| {
        let before_ok = haystack[..idx]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let rest = &haystack[idx + word.len()..];
        let rest = rest.strip_prefix('s').unwrap_or(rest);
        let after_ok = rest.chars().next().is_none_or(|c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

fn parse_count(raw: &str) -> Option<u32> {
    match raw {
        "one" => Some(1),
        "two" => Some(2),
        "three" => Some(3),
        "four" => Some(4),
        "five" => Some(5),
        "six" => Some(6),
        "seven" => Some(7),
        "eight" => Some(8),
        "nine" => Some(9),
        "ten" => Some(10),
        "twelve" => Some(12),
        digits => digits.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hero_positions() {
        let hints =
            extract_hints("create a hero section with a headline on the right and an image on the left");
        assert_eq!(hints.content_position.as_deref(), Some("right"));
        assert_eq!(hints.image_position.as_deref(), Some("left"));
        assert_eq!(hints.layout_type.as_deref(), Some("split"));
        assert_eq!(hints.direction.as_deref(), Some("horizontal"));
        assert!(hints.elements.contains(&"headline".to_string()));
        assert!(hints.elements.contains(&"image".to_string()));
    }

    #[test]
    fn test_implied_opposite_side() {
        let hints = extract_hints("left-aligned text with a photo");
        assert_eq!(hints.content_position.as_deref(), Some("left"));
        assert_eq!(hints.image_position.as_deref(), Some("right"));
    }

    #[test]
    fn test_counts_and_layout() {
        let hints = extract_hints("A pricing grid with three pricing cards and 2 buttons, dark theme");
        assert_eq!(hints.layout_type.as_deref(), Some("grid"));
        assert_eq!(hints.counts.get("cards"), Some(&3));
        assert_eq!(hints.counts.get("buttons"), Some(&2));
        assert_eq!(hints.theme.as_deref(), Some("dark"));
    }

    #[test]
    fn test_apply_keeps_model_values() {
        let mut requirement = ComponentRequirement::default();
        requirement.layout.content_position = "left".to_string();

        extract_hints("headline on the right and an image on the left").apply(&mut requirement);

        assert_eq!(requirement.layout.content_position, "left");
        assert_eq!(requirement.layout.image_position, "left");
    }

    #[test]
    fn test_no_hints() {
        assert!(extract_hints("make it pop").is_empty());
        assert!(!contains_word("navigation", "nav"));
        assert!(contains_word("two cards", "card"));
    }
}
