//! Free-text helpers on top of the language model.
//!
//! Besides criteria extraction the model answers direct questions and runs a
//! few fixed rewriting tasks. Unlike interpretation these surface their
//! failures to the caller.

use docsift_core::{LanguageModel, LlmError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::interpreter::extract_json_object;

const ASK_PROMPT: &str = "Please answer the following question in clear, professional, and \
concise English. Avoid providing long and unnecessary explanations. Keep it to the point. \
Return the response like this {\"response\": \"answer\" }";

/// A preset rewriting task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextTask {
    Summarize,
    Email,
    Qa,
}

impl TextTask {
    pub const ALL: [TextTask; 3] = [Self::Summarize, Self::Email, Self::Qa];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Summarize => "summarize",
            Self::Email => "email",
            Self::Qa => "qa",
        }
    }

    #[must_use]
    pub const fn system_prompt(self) -> &'static str {
        match self {
            Self::Summarize => "Please summarize the following text:",
            Self::Email => {
                "Please rewrite the following email to improve its clarity and professionalism:"
            }
            Self::Qa => "Please answer the following question or respond to the statement:",
        }
    }
}

impl fmt::Display for TextTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TextTask {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|task| task.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown task `{wanted}` (expected summarize, email or qa)"))
    }
}

/// Errors from the free-text helpers.
#[derive(Error, Debug)]
pub enum AssistError {
    #[error("input text is empty")]
    EmptyInput,

    #[error(transparent)]
    Model(#[from] LlmError),
}

/// Question answering and preset text tasks.
pub struct Assistant {
    model: Arc<dyn LanguageModel>,
}

impl Assistant {
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Answer a question directly, without searching documents.
    ///
    /// # Errors
    ///
    /// `EmptyInput` for a blank question, otherwise the model's error or
    /// `LlmError::EmptyResponse` when the answer is blank.
    pub async fn ask(&self, question: &str) -> Result<String, AssistError> {
        self.run(ASK_PROMPT, question).await
    }

    /// Run `task` over `text`.
    ///
    /// # Errors
    ///
    /// Same as [`Assistant::ask`].
    pub async fn process(&self, task: TextTask, text: &str) -> Result<String, AssistError> {
        self.run(task.system_prompt(), text).await
    }

    async fn run(&self, system: &str, text: &str) -> Result<String, AssistError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AssistError::EmptyInput);
        }

        let reply = self.model.complete(system, text).await?;
        let answer = answer_text(&reply);
        if answer.is_empty() {
            return Err(LlmError::EmptyResponse.into());
        }

        debug!(
            "{} answered {} chars with {} chars",
            self.model.model_name(),
            text.len(),
            answer.len()
        );
        Ok(answer)
    }
}

/// The answer carried by a model reply.
///
/// JSON-mode backends wrap it as `{"response": "..."}`; anything else is
/// taken as plain text.
#[must_use]
pub fn answer_text(reply: &str) -> String {
    let wrapped = extract_json_object(reply)
        .and_then(|json| serde_json::from_str::<Value>(json).ok())
        .and_then(|value| match value.get("response") {
            Some(Value::String(text)) => Some(text.trim().to_string()),
            _ => None,
        });
    wrapped.unwrap_or_else(|| reply.trim().to_string())
}
