//! Scripted completion service for testing and offline runs.
//!
//! Replies are chosen by the first rule whose needle occurs in the request's
//! model, system prompt or user prompt. Each rule holds a queue of replies;
//! the last reply repeats once the queue is drained. Every request is
//! recorded so tests can assert on call counts and prompt contents.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::domain::ports::completion::{CompletionError, CompletionRequest, CompletionService};

/// One canned reply.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    Fail(CompletionError),
    /// Wait before producing the inner reply.
    Delayed(Duration, Box<ScriptedReply>),
}

impl ScriptedReply {
    pub fn text(text: impl Into<String>) -> Self {
        ScriptedReply::Text(text.into())
    }

    pub fn fail(error: CompletionError) -> Self {
        ScriptedReply::Fail(error)
    }

    pub fn delayed(self, delay: Duration) -> Self {
        ScriptedReply::Delayed(delay, Box::new(self))
    }
}

#[derive(Debug)]
struct Rule {
    needle: String,
    replies: VecDeque<ScriptedReply>,
}

/// Deterministic [`CompletionService`] driven by substring rules.
#[derive(Debug)]
pub struct ScriptedCompletionService {
    rules: Mutex<Vec<Rule>>,
    fallback: ScriptedReply,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl Default for ScriptedCompletionService {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl ScriptedCompletionService {
    /// No rules; unmatched requests fail with `MalformedOutput`.
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            fallback: ScriptedReply::Fail(CompletionError::MalformedOutput(
                "no scripted reply matched".to_string(),
            )),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Offline backend: plans fail over to the fixed plan, parsing falls
    /// back to prompt hints, and every strategy returns a minimal skeleton.
    pub fn offline() -> Self {
        Self::new()
            .on("task planner", ScriptedReply::text("{}"))
            .on("requirements analyst", ScriptedReply::text("{}"))
            .on(
                "markup component",
                ScriptedReply::text(
                    "```tsx\nexport default function Component() {\n  return <section className=\"component\" />;\n}\n```",
                ),
            )
            .with_fallback(ScriptedReply::text("{}"))
    }

    /// Add a reply for requests containing `needle`. Repeated calls with the
    /// same needle extend that rule's queue.
    pub fn on(self, needle: impl Into<String>, reply: ScriptedReply) -> Self {
        let needle = needle.into();
        {
            let mut rules = lock(&self.rules);
            if let Some(rule) = rules.iter_mut().find(|r| r.needle == needle) {
                rule.replies.push_back(reply);
            } else {
                rules.push(Rule {
                    needle,
                    replies: VecDeque::from([reply]),
                });
            }
        }
        self
    }

    pub fn with_fallback(mut self, reply: ScriptedReply) -> Self {
        self.fallback = reply;
        self
    }

    /// Every request seen so far, in arrival order.
    pub fn calls(&self) -> Vec<CompletionRequest> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Requests whose prompts or model contain `needle`.
    pub fn calls_matching(&self, needle: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|req| matches_request(req, needle))
            .count()
    }

    fn next_reply(&self, request: &CompletionRequest) -> ScriptedReply {
        let mut rules = lock(&self.rules);
        match rules.iter_mut().find(|r| matches_request(request, &r.needle)) {
            Some(rule) if rule.replies.len() > 1 => rule
                .replies
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone()),
            Some(rule) => rule
                .replies
                .front()
                .cloned()
                .unwrap_or_else(|| self.fallback.clone()),
            None => self.fallback.clone(),
        }
    }
}

fn matches_request(request: &CompletionRequest, needle: &str) -> bool {
    request.model.contains(needle)
        || request.system_prompt.contains(needle)
        || request.user_prompt.contains(needle)
}

#[async_trait]
impl CompletionService for ScriptedCompletionService {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        lock(&self.calls).push(request.clone());
        let mut reply = self.next_reply(&request);
        loop {
            match reply {
                ScriptedReply::Text(text) => return Ok(text),
                ScriptedReply::Fail(err) => return Err(err),
                ScriptedReply::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
            }
        }
    }
}
