//! Lenient JSON recovery for model output.
//!
//! Model responses wrap JSON in prose and code fences, drop quotes, leave
//! trailing commas and get cut off mid-object. The ladder here climbs from
//! strict parsing to progressively more forgiving strategies:
//!
//! 1. strict parse of the whole text
//! 2. the first balanced `{...}` span
//! 3. the span after [`repair_json`]
//! 4. an array literal lifted from the raw text, only when no object
//!    carrying a `requirements` key was found
//! 5. nothing usable ([`RepairStage::Default`])
//!
//! Nothing in this module panics on any input.

use serde_json::{Map, Value};

/// How far down the ladder parsing had to go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairStage {
    Strict,
    Extracted,
    Repaired,
    LiftedArray,
    Default,
}

impl RepairStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepairStage::Strict => "strict",
            RepairStage::Extracted => "extracted",
            RepairStage::Repaired => "repaired",
            RepairStage::LiftedArray => "lifted_array",
            RepairStage::Default => "default",
        }
    }
}

/// Requirement entries recovered from a model response.
#[derive(Debug, Clone, PartialEq)]
pub struct LadderOutcome {
    /// Raw entries (objects or strings), not yet normalized.
    pub entries: Vec<Value>,
    pub confidence: Option<f32>,
    pub reasoning: Option<String>,
    pub stage: RepairStage,
}

const SECTION_KEYS: &[&str] = &["layout", "content", "styling", "interactions"];

/// The first `{...}` span, respecting double-quoted strings. An object that
/// never closes yields everything from its opening brace.
pub fn extract_first_object(text: &str) -> Option<&str> {
    extract_balanced(text, b'{', b'}')
}

/// The first `[...]` span, with the same rules as [`extract_first_object`].
pub fn extract_first_array(text: &str) -> Option<&str> {
    extract_balanced(text, b'[', b']')
}

fn extract_balanced(text: &str, open: u8, close: u8) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|b| *b == open)?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        if b == b'"' {
            in_string = true;
        } else if b == open {
            depth += 1;
        } else if b == close {
            depth -= 1;
            if depth == 0 {
                return text.get(start..=start + offset);
            }
        }
    }

    text.get(start..)
}

/// Parse the first JSON object in `text`, climbing the first three rungs.
pub fn parse_json_object(text: &str) -> Option<(Map<String, Value>, RepairStage)> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text.trim()) {
        return Some((map, RepairStage::Strict));
    }

    let span = extract_first_object(text)?;
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(span) {
        return Some((map, RepairStage::Extracted));
    }

    match serde_json::from_str::<Value>(&repair_json(span)) {
        Ok(Value::Object(map)) => Some((map, RepairStage::Repaired)),
        _ => None,
    }
}

/// Recover requirement entries from a model response. Never fails; an
/// unusable response yields an empty outcome at [`RepairStage::Default`].
pub fn parse_requirements(text: &str) -> LadderOutcome {
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(text.trim()) {
        let entries = usable_entries(items);
        if !entries.is_empty() {
            return LadderOutcome {
                entries,
                confidence: None,
                reasoning: None,
                stage: RepairStage::Strict,
            };
        }
    }

    if let Some((map, stage)) = parse_json_object(text) {
        let confidence = map
            .get("confidence")
            .and_then(Value::as_f64)
            .map(|c| c.clamp(0.0, 1.0) as f32);
        let reasoning = map
            .get("reasoning")
            .and_then(Value::as_str)
            .map(ToString::to_string);

        let entries = requirement_entries(&map);
        if !entries.is_empty() {
            return LadderOutcome {
                entries,
                confidence,
                reasoning,
                stage,
            };
        }
        if map.contains_key("requirements") {
            return LadderOutcome {
                entries,
                confidence,
                reasoning,
                stage: RepairStage::Default,
            };
        }
    }

    if let Some(entries) = lift_array(text) {
        return LadderOutcome {
            entries,
            confidence: None,
            reasoning: None,
            stage: RepairStage::LiftedArray,
        };
    }

    LadderOutcome {
        entries: Vec::new(),
        confidence: None,
        reasoning: None,
        stage: RepairStage::Default,
    }
}

/// Requirement entries held by a parsed object: its `requirements` member,
/// or the object itself when it already looks like a single requirement.
pub fn requirement_entries(map: &Map<String, Value>) -> Vec<Value> {
    match map.get("requirements") {
        Some(Value::Array(items)) => usable_entries(items.clone()),
        Some(item @ (Value::Object(_) | Value::String(_))) => usable_entries(vec![item.clone()]),
        _ if SECTION_KEYS.iter().any(|k| map.contains_key(*k)) => vec![Value::Object(map.clone())],
        _ => Vec::new(),
    }
}

fn lift_array(text: &str) -> Option<Vec<Value>> {
    let span = extract_first_array(text)?;
    let value = serde_json::from_str::<Value>(span)
        .ok()
        .or_else(|| serde_json::from_str::<Value>(&repair_json(span)).ok())?;
    match value {
        Value::Array(items) => Some(usable_entries(items)).filter(|e| !e.is_empty()),
        _ => None,
    }
}

fn usable_entries(items: Vec<Value>) -> Vec<Value> {
    items
        .into_iter()
        .filter(|item| match item {
            Value::Object(_) => true,
            Value::String(s) => !s.trim().is_empty(),
            _ => false,
        })
        .collect()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Last {
    Start,
    Open,
    Colon,
    Comma,
    Value,
}

#[derive(Clone, Copy)]
struct Frame {
    closer: char,
    expect_key: bool,
}

/// Rewrite almost-JSON into JSON.
///
/// Applied repairs: trailing commas, bare keys and bare word values,
/// single-quoted strings, missing commas between adjacent values, unclosed
/// strings and brackets. Characters that cannot start a JSON token are
/// dropped. Valid JSON passes through unchanged.
pub fn repair_json(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 16);
    let mut stack: Vec<Frame> = Vec::new();
    let mut last = Last::Start;
    let mut pending_key = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' | '\'' => {
                separate(&mut out, &mut stack, last, &mut pending_key);
                let (literal, next) = read_string(&chars, i);
                out.push_str(&literal);
                pending_key = mark_key(&mut stack);
                last = Last::Value;
                i = next;
                continue;
            }
            '{' | '[' => {
                separate(&mut out, &mut stack, last, &mut pending_key);
                stack.push(Frame {
                    closer: if c == '{' { '}' } else { ']' },
                    expect_key: c == '{',
                });
                out.push(c);
                last = Last::Open;
            }
            '}' | ']' => {
                if stack.iter().any(|f| f.closer == c) {
                    while let Some(frame) = stack.pop() {
                        close_frame(&mut out, &mut pending_key, last, frame.closer);
                        last = Last::Value;
                        if frame.closer == c {
                            break;
                        }
                    }
                    mark_value_done(&mut stack);
                }
            }
            ',' => {
                if last == Last::Value {
                    if pending_key {
                        out.push_str(":null");
                        pending_key = false;
                    }
                    out.push(',');
                    if let Some(frame) = stack.last_mut() {
                        frame.expect_key = frame.closer == '}';
                    }
                    last = Last::Comma;
                }
            }
            ':' => {
                if pending_key {
                    out.push(':');
                    pending_key = false;
                    if let Some(frame) = stack.last_mut() {
                        frame.expect_key = false;
                    }
                    last = Last::Colon;
                }
            }
            c if c.is_whitespace() => out.push(c),
            c if c == '-' || c.is_ascii_digit() => {
                let end = scan_while(&chars, i, |ch| ch.is_ascii_digit() || "+-.eE".contains(ch));
                let token: String = chars[i..end].iter().collect();
                separate(&mut out, &mut stack, last, &mut pending_key);
                pending_key = mark_key(&mut stack);
                if pending_key {
                    out.push('"');
                    out.push_str(&token);
                    out.push('"');
                } else {
                    out.push_str(&token);
                }
                last = Last::Value;
                i = end;
                continue;
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let end = scan_while(&chars, i, |ch| ch.is_alphanumeric() || "_-$".contains(ch));
                let word: String = chars[i..end].iter().collect();
                separate(&mut out, &mut stack, last, &mut pending_key);
                let expecting_key = stack.last().is_some_and(|f| f.expect_key);
                if !expecting_key && matches!(word.as_str(), "true" | "false" | "null") {
                    out.push_str(&word);
                } else {
                    out.push('"');
                    out.push_str(&word);
                    out.push('"');
                }
                pending_key = mark_key(&mut stack);
                last = Last::Value;
                i = end;
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    strip_trailing_comma(&mut out);
    if last == Last::Colon {
        out.push_str("null");
        last = Last::Value;
    }
    while let Some(frame) = stack.pop() {
        close_frame(&mut out, &mut pending_key, last, frame.closer);
        last = Last::Value;
    }

    out
}

/// Insert the separator a model forgot between two adjacent tokens: a colon
/// after a dangling key, otherwise a comma.
fn separate(out: &mut String, stack: &mut [Frame], last: Last, pending_key: &mut bool) {
    if last != Last::Value {
        return;
    }
    if *pending_key {
        out.push(':');
        *pending_key = false;
        return;
    }
    out.push(',');
    if let Some(frame) = stack.last_mut() {
        frame.expect_key = frame.closer == '}';
    }
}

/// Called after emitting a scalar; returns true when it was an object key.
fn mark_key(stack: &mut [Frame]) -> bool {
    match stack.last_mut() {
        Some(frame) if frame.expect_key => {
            frame.expect_key = false;
            true
        }
        _ => false,
    }
}

/// A nested container just closed; it filled a value slot of its parent.
fn mark_value_done(stack: &mut [Frame]) {
    if let Some(frame) = stack.last_mut() {
        frame.expect_key = false;
    }
}

fn close_frame(out: &mut String, pending_key: &mut bool, last: Last, closer: char) {
    if *pending_key {
        out.push_str(":null");
        *pending_key = false;
    } else if last == Last::Colon {
        out.push_str("null");
    }
    strip_trailing_comma(out);
    out.push(closer);
}

fn strip_trailing_comma(out: &mut String) {
    let trimmed_len = out.trim_end().len();
    if out[..trimmed_len].ends_with(',') {
        out.replace_range(trimmed_len - 1..trimmed_len, "");
    }
}

fn scan_while(chars: &[char], start: usize, pred: impl Fn(char) -> bool) -> usize {
    let mut end = start;
    while end < chars.len() && pred(chars[end]) {
        end += 1;
    }
    end.max(start + 1)
}

/// Read a string starting at `chars[start]` (either quote style) and return
/// it as a double-quoted JSON literal plus the index after it.
fn read_string(chars: &[char], start: usize) -> (String, usize) {
    let quote = chars[start];
    let mut literal = String::from('"');
    let mut j = start + 1;

    while j < chars.len() {
        let c = chars[j];
        match c {
            '\\' => {
                match chars.get(j + 1) {
                    Some('\'') => literal.push('\''),
                    Some(&next) => {
                        literal.push('\\');
                        literal.push(next);
                    }
                    None => {}
                }
                j += 2;
                continue;
            }
            c if c == quote => {
                literal.push('"');
                return (literal, j + 1);
            }
            '"' => literal.push_str("\\\""),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            '\t' => literal.push_str("\\t"),
            c => literal.push(c),
        }
        j += 1;
    }

    literal.push('"');
    (literal, chars.len())
}
