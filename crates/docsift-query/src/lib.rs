//! Query interpretation and search for docsift.
//!
//! A query goes through three stages:
//!
//! 1. [`QueryInterpreter`] asks a language model for structured
//!    [`SearchCriteria`](docsift_core::SearchCriteria), falling back to the
//!    raw query when the model is unavailable or answers nonsense
//! 2. A [`RetrievalStrategy`] produces scored candidates, either by vector
//!    similarity ([`VectorStrategy`]) or by scanning every stored document
//!    ([`ScanStrategy`])
//! 3. [`SearchEngine`] drops candidates without matches, builds highlighted
//!    snippets with [`TermMatcher`], ranks and truncates
//!
//! The same model also backs [`Assistant`], which answers questions directly
//! and runs preset [`TextTask`]s such as summarizing.
//!
//! ```rust,ignore
//! let interpreter = QueryInterpreter::new(model, CriteriaProfile::Medical);
//! let strategy = Arc::new(VectorStrategy::new(embedder, store));
//! let engine = SearchEngine::new(interpreter, strategy);
//!
//! for hit in engine.search("notes from Dr. Zaid about neuro", 5).await? {
//!     println!("{} ({:.2})\n{}", hit.filename, hit.score, hit.context.text);
//! }
//! ```

pub mod assistant;
pub mod context;
pub mod executor;
pub mod interpreter;
pub mod llm;
pub mod strategy;

pub use assistant::{answer_text, AssistError, Assistant, TextTask};
pub use context::{term_variants, SnippetStyle, TermMatcher};
pub use executor::{SearchEngine, SearchOptions, DEFAULT_LIMIT};
pub use interpreter::{CriteriaProfile, QueryInterpreter};
pub use llm::{OllamaConfig, OllamaModel, OpenAiChat, OpenAiChatConfig, StaticModel};
pub use strategy::{Candidate, RetrievalStrategy, ScanStrategy, VectorStrategy};
