//! Natural-language query interpretation.
//!
//! A [`QueryInterpreter`] asks a [`LanguageModel`] to pull explicitly
//! mentioned terms out of a free-form query and sort them into the buckets of
//! a [`CriteriaProfile`]. Interpretation never fails: any problem with the
//! model or its reply falls back to searching for the whole query.

use docsift_core::{LanguageModel, LlmError, SearchCriteria, TermBucket};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Which term buckets the model is asked to fill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CriteriaProfile {
    /// People and keywords
    #[default]
    Generic,
    /// Doctors, medical terms and conditions
    Medical,
}

impl CriteriaProfile {
    /// Buckets requested from the model, in prompt order.
    #[must_use]
    pub const fn buckets(self) -> &'static [TermBucket] {
        match self {
            Self::Generic => &[TermBucket::Names, TermBucket::Keywords],
            Self::Medical => &[
                TermBucket::Doctors,
                TermBucket::MedicalTerms,
                TermBucket::Conditions,
            ],
        }
    }

    fn system_prompt(self) -> &'static str {
        match self {
            Self::Generic => {
                "You are a precise search query analyzer. Extract only explicitly mentioned terms."
            }
            Self::Medical => {
                "You are a precise medical search query analyzer. Extract only explicitly mentioned terms."
            }
        }
    }

    fn user_prompt(self, query: &str) -> String {
        let shape = self
            .buckets()
            .iter()
            .map(|b| format!("  \"{}\": [],", b.key()))
            .collect::<Vec<_>>()
            .join("\n");
        let (guidance, example) = match self {
            Self::Generic => (
                "- names: people explicitly named in the query\n\
                 - keywords: other explicitly mentioned words or phrases to look for",
                "Query: \"reports by alice about budget or forecast\"\n\
                 {\"names\": [\"alice\"], \"keywords\": [\"budget\", \"forecast\"], \"requireAll\": false}",
            ),
            Self::Medical => (
                "- doctors: doctor names explicitly mentioned, without titles\n\
                 - medicalTerms: explicitly mentioned medical terms or specialties\n\
                 - conditions: explicitly mentioned conditions or diagnoses",
                "Query: \"I want docs with neuro or if it contains doctor's name as zaid\"\n\
                 {\"doctors\": [\"zaid\"], \"medicalTerms\": [\"neuro\"], \"conditions\": [], \"requireAll\": false}",
            ),
        };

        format!(
            "Analyze this search query and extract specific search criteria.\n\
             Query: \"{query}\"\n\n\
             Return ONLY a JSON object with this exact structure:\n\
             {{\n{shape}\n  \"requireAll\": false\n}}\n\n\
             {guidance}\n\
             - requireAll: true only if the query joins terms with \"and\"\n\n\
             Extract ONLY explicitly mentioned terms. Do not infer or expand terms.\n\n\
             Example:\n{example}"
        )
    }
}

/// Why a model reply could not be turned into criteria.
///
/// Never escapes [`QueryInterpreter::interpret`]; it is logged and replaced
/// by the fail-open default.
#[derive(Debug, Error)]
pub enum InterpretError {
    #[error("language model call failed: {0}")]
    Model(#[from] LlmError),

    #[error("no JSON object found in model reply")]
    NoJson,

    #[error("invalid JSON in model reply: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model reply is not a JSON object")]
    NotObject,

    #[error("model reply has none of the keys: {0}")]
    MissingBuckets(String),

    #[error("`{0}` must be an array")]
    NotArray(&'static str),

    #[error("`requireAll` must be a boolean")]
    RequireAllNotBool,
}

/// Turns free-form queries into [`SearchCriteria`].
pub struct QueryInterpreter {
    model: Arc<dyn LanguageModel>,
    profile: CriteriaProfile,
}

impl QueryInterpreter {
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>, profile: CriteriaProfile) -> Self {
        Self { model, profile }
    }

    #[must_use]
    pub fn profile(&self) -> CriteriaProfile {
        self.profile
    }

    /// Interpret `query`.
    ///
    /// Blank queries give empty criteria without calling the model. Any
    /// model or parsing failure gives the whole trimmed query as a single
    /// term with `require_all` off.
    pub async fn interpret(&self, query: &str) -> SearchCriteria {
        let query = query.trim();
        if query.is_empty() {
            return SearchCriteria::new(false);
        }

        match self.try_interpret(query).await {
            Ok(criteria) => {
                debug!(
                    "Interpreted {:?} into {} terms (require_all={})",
                    query,
                    criteria.term_count(),
                    criteria.require_all
                );
                criteria
            }
            Err(e) => {
                warn!("Query interpretation failed, searching for the raw query: {}", e);
                SearchCriteria::fallback(query)
            }
        }
    }

    /// Interpret `query`, surfacing failures.
    ///
    /// # Errors
    ///
    /// Returns an [`InterpretError`] if the model call fails or its reply
    /// does not hold valid criteria.
    pub async fn try_interpret(&self, query: &str) -> Result<SearchCriteria, InterpretError> {
        let reply = self
            .model
            .complete(self.profile.system_prompt(), &self.profile.user_prompt(query))
            .await?;
        parse_criteria(&reply, self.profile)
    }
}

/// Parse a model reply into criteria for `profile`.
///
/// # Errors
///
/// See [`InterpretError`].
pub fn parse_criteria(reply: &str, profile: CriteriaProfile) -> Result<SearchCriteria, InterpretError> {
    let json = extract_json_object(reply).ok_or(InterpretError::NoJson)?;
    let value: Value = serde_json::from_str(json)?;
    let object = value.as_object().ok_or(InterpretError::NotObject)?;

    if !profile.buckets().iter().any(|b| object.contains_key(b.key())) {
        let keys = profile
            .buckets()
            .iter()
            .map(|b| b.key())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(InterpretError::MissingBuckets(keys));
    }

    let require_all = match object.get("requireAll") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(_) => return Err(InterpretError::RequireAllNotBool),
    };

    let mut criteria = SearchCriteria::new(require_all);
    for &bucket in profile.buckets() {
        fill_bucket(&mut criteria, object, bucket)?;
    }
    Ok(criteria)
}

fn fill_bucket(
    criteria: &mut SearchCriteria,
    object: &Map<String, Value>,
    bucket: TermBucket,
) -> Result<(), InterpretError> {
    match object.get(bucket.key()) {
        None => Ok(()),
        Some(Value::Array(items)) => {
            for item in items {
                if let Value::String(term) = item {
                    criteria.push(bucket, term);
                }
            }
            Ok(())
        }
        Some(_) => Err(InterpretError::NotArray(bucket.key())),
    }
}

/// Find the first balanced `{...}` in `text`.
///
/// Braces inside JSON string literals, including escaped quotes, do not
/// count. If a candidate never closes, the next opening brace is tried.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<&str> {
    text.char_indices()
        .filter(|&(_, c)| c == '{')
        .find_map(|(start, _)| balanced_end(&text[start..]).map(|len| &text[start..start + len]))
}

/// Byte length of the balanced object at the start of `text`.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}
