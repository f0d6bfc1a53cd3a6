//! # docsift CLI
//!
//! Command-line interface for docsift.
//!
//! docsift extracts text from PDFs, spreadsheets, CSV and text files, stores
//! one embedding per document in Qdrant and answers natural-language queries
//! with ranked, highlighted snippets.
//!
//! ## Commands
//!
//! - `docsift index <PATH>` - Index a file, or every file directly inside a directory
//! - `docsift search <QUERY>` - Search indexed documents
//! - `docsift info` - Show collection statistics
//! - `docsift ask <QUESTION>` - Ask the language model directly
//! - `docsift process <TASK> [TEXT]` - Summarize, rewrite an email or answer (reads stdin without TEXT)
//! - `docsift config show|init|path` - Inspect configuration
//!
//! ## Examples
//!
//! ```bash
//! # Index a directory
//! docsift index ~/Documents/clinic
//!
//! # Search for content
//! docsift search "notes from Dr. Zaid about neuro"
//!
//! # Get JSON output
//! docsift --format json search "invoices from march" --limit 10
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docsift_core::{Embedder, LanguageModel, SearchResult, VectorStore};
#[cfg(feature = "candle")]
use docsift_embed::CandleEmbedder;
use docsift_embed::{EmbeddingProvider, HashEmbedder, OpenAiEmbedder, OpenAiEmbedderConfig};
use docsift_extract::ExtractorRegistry;
use docsift_index::{IndexReport, IndexerConfig, IndexerService};
use docsift_query::{
    Assistant, OllamaConfig, OllamaModel, OpenAiChat, OpenAiChatConfig, QueryInterpreter,
    RetrievalStrategy, ScanStrategy, SearchEngine, TextTask, VectorStrategy,
};
use docsift_store::{QdrantConfig, QdrantStore, RetryPolicy, StoreClient};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod config;

use config::{Config, EmbeddingBackend, LlmBackend, SearchMode};

#[derive(Parser)]
#[command(name = "docsift")]
#[command(about = "Index documents and search them with natural-language queries")]
#[command(version)]
struct Cli {
    /// Path to config file (default: ~/.config/docsift/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a file or the files directly inside a directory
    Index {
        /// File or directory to index
        path: PathBuf,
    },

    /// Search indexed documents
    Search {
        /// Natural-language query
        query: String,

        /// Maximum results
        #[arg(short, long)]
        limit: Option<usize>,

        /// Retrieval mode (overrides the config file)
        #[arg(short, long)]
        mode: Option<SearchMode>,
    },

    /// Show collection statistics
    Info,

    /// Ask the language model a question directly, without searching
    Ask {
        /// Question to answer
        question: String,
    },

    /// Run a preset text task (summarize, email, qa)
    Process {
        /// Task to run
        task: TextTask,

        /// Input text (read from stdin when omitted)
        text: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Print sample configuration file
    Init,
    /// Show config file path
    Path,
}

/// Output structure for search results.
#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    mode: &'a str,
    results: &'a [SearchResult],
}

/// Output structure for the language model helpers.
#[derive(Serialize)]
struct AssistOutput<'a> {
    task: &'a str,
    input: &'a str,
    response: &'a str,
}

/// Output structure for a single indexed file.
#[derive(Serialize)]
struct FileOutput {
    path: String,
    id: String,
    filetype: String,
    characters: usize,
}

fn load_config(cli: &Cli) -> Result<Config> {
    match cli.config {
        Some(ref path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Config::load().context("Failed to load config"),
    }
}

fn init_logging(verbose: bool, config: &Config) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Build the embedding provider selected by the config.
fn create_embedder(config: &Config) -> Result<Arc<EmbeddingProvider>> {
    let settings = &config.embedding;
    let backend: Arc<dyn Embedder> = match settings.backend {
        EmbeddingBackend::OpenAi => {
            let api_key = settings
                .api_key
                .clone()
                .context("OPENAI_API_KEY is not set (needed for OpenAI embeddings)")?;
            Arc::new(
                OpenAiEmbedder::new(OpenAiEmbedderConfig {
                    api_key,
                    base_url: settings.base_url.clone(),
                    model: settings.model.clone(),
                    dimension: settings.dimension,
                    timeout: Duration::from_secs(settings.timeout_secs),
                    max_retries: settings.max_retries,
                })
                .context("Failed to create OpenAI embedder")?,
            )
        }
        EmbeddingBackend::Hash => Arc::new(HashEmbedder::new(settings.dimension)),
        #[cfg(feature = "candle")]
        EmbeddingBackend::Candle => {
            let cache_dir = config::cache_dir()
                .context("Failed to get cache directory")?
                .join("models");
            Arc::new(CandleEmbedder::new(cache_dir))
        }
        #[cfg(not(feature = "candle"))]
        EmbeddingBackend::Candle => {
            anyhow::bail!("The candle embedding backend requires building with --features candle")
        }
    };

    if backend.dimension() != settings.dimension {
        warn!(
            "Embedding backend {} produces {} dimensions, config says {}",
            backend.model_name(),
            backend.dimension(),
            settings.dimension
        );
    }

    Ok(Arc::new(EmbeddingProvider::new(backend)))
}

/// Dimension of the configured embedding backend, without building it.
fn embedding_dimension(config: &Config) -> usize {
    match config.embedding.backend {
        #[cfg(feature = "candle")]
        EmbeddingBackend::Candle => CandleEmbedder::DIMENSION,
        _ => config.embedding.dimension,
    }
}

/// Build the store client for the configured collection.
fn create_store(config: &Config, dimension: usize) -> Result<Arc<StoreClient>> {
    let settings = &config.store;
    let backend = QdrantStore::new(QdrantConfig {
        url: settings.url.clone(),
        api_key: settings.api_key.clone(),
        timeout: Duration::from_secs(settings.timeout_secs),
        ..QdrantConfig::default()
    })
    .context("Failed to create Qdrant client")?;

    let client = StoreClient::new(
        Arc::new(backend) as Arc<dyn VectorStore>,
        settings.collection.clone(),
        dimension,
    )
    .with_retry_policy(RetryPolicy {
        attempts: settings.provision_attempts,
        delay: Duration::from_secs(settings.provision_delay_secs),
    });

    Ok(Arc::new(client))
}

/// Build the language model used for query interpretation.
fn create_model(config: &Config) -> Result<Arc<dyn LanguageModel>> {
    let settings = &config.llm;
    let timeout = Duration::from_secs(settings.timeout_secs);

    let model: Arc<dyn LanguageModel> = match settings.backend {
        LlmBackend::OpenAi => {
            let defaults = OpenAiChatConfig::default();
            let api_key = settings
                .api_key
                .clone()
                .context("OPENAI_API_KEY is not set (needed for query interpretation)")?;
            Arc::new(
                OpenAiChat::new(OpenAiChatConfig {
                    api_key,
                    base_url: settings.base_url.clone().unwrap_or(defaults.base_url),
                    model: settings.model.clone().unwrap_or(defaults.model),
                    temperature: settings.temperature,
                    timeout,
                    max_retries: defaults.max_retries,
                })
                .context("Failed to create OpenAI chat client")?,
            )
        }
        LlmBackend::Ollama => {
            let defaults = OllamaConfig::default();
            Arc::new(
                OllamaModel::new(OllamaConfig {
                    base_url: settings.base_url.clone().unwrap_or(defaults.base_url),
                    model: settings.model.clone().unwrap_or(defaults.model),
                    timeout,
                    max_retries: defaults.max_retries,
                })
                .context("Failed to create Ollama client")?,
            )
        }
    };

    Ok(model)
}

/// Build the search engine. Only vector mode needs an embedder.
fn create_engine(config: &Config, mode: SearchMode) -> Result<SearchEngine> {
    let strategy: Arc<dyn RetrievalStrategy> = match mode {
        SearchMode::Vector => {
            let embedder = create_embedder(config)?;
            let store = create_store(config, embedder.dimension())?;
            Arc::new(VectorStrategy::new(embedder, store))
        }
        SearchMode::Scan => {
            let store = create_store(config, embedding_dimension(config))?;
            Arc::new(ScanStrategy::new(store))
        }
    };
    let interpreter = QueryInterpreter::new(create_model(config)?, config.llm.profile);
    Ok(SearchEngine::new(interpreter, strategy).with_options(config.search.options.clone()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(cli.verbose, &config)?;

    match cli.command {
        Commands::Index { ref path } => {
            if !path.exists() {
                anyhow::bail!("Path does not exist: {}", path.display());
            }

            let embedder = create_embedder(&config)?;
            let store = create_store(&config, embedder.dimension())?;
            let indexer = IndexerService::new(
                Arc::new(ExtractorRegistry::with_defaults()),
                embedder,
                store,
                IndexerConfig {
                    verify_writes: config.index.verify_writes,
                },
            );

            if path.is_dir() {
                info!("Indexing directory {:?}", path);
                let print_status = |status: &str| println!("{status}");
                let progress: docsift_index::Progress<'_> = match cli.format {
                    OutputFormat::Text => Some(&print_status),
                    OutputFormat::Json => None,
                };

                let report = indexer
                    .index_directory(path, progress)
                    .await
                    .with_context(|| format!("Failed to index {}", path.display()))?;
                print_report(cli.format, &report)?;
            } else {
                let record = indexer
                    .index_one(path)
                    .await
                    .with_context(|| format!("Failed to index {}", path.display()))?;

                match cli.format {
                    OutputFormat::Json => {
                        let output = FileOutput {
                            path: record.path.to_string_lossy().to_string(),
                            id: record.id.to_string(),
                            filetype: record.file_type.clone(),
                            characters: record.content.chars().count(),
                        };
                        println!("{}", serde_json::to_string_pretty(&output)?);
                    }
                    OutputFormat::Text => {
                        println!("Successfully indexed {}", record.filename);
                        println!("  Id:         {}", record.id);
                        println!("  Type:       {}", record.file_type);
                        println!("  Characters: {}", record.content.chars().count());
                    }
                }
            }
        }

        Commands::Search {
            ref query,
            limit,
            mode,
        } => {
            let engine = create_engine(&config, mode.unwrap_or(config.search.mode))?;
            let limit = limit.unwrap_or(config.search.default_limit);

            let results = engine
                .search(query, limit)
                .await
                .context("Search failed")?;

            match cli.format {
                OutputFormat::Json => {
                    let output = SearchOutput {
                        query,
                        mode: engine.strategy_name(),
                        results: &results,
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Text => {
                    println!("Query: {query}\n");
                    if results.is_empty() {
                        println!("No results found.");
                    }
                    for (i, result) in results.iter().enumerate() {
                        println!(
                            "{}. {} [{}] (score: {:.3})",
                            i + 1,
                            result.filename,
                            result.directory,
                            result.score
                        );
                        println!("   {}", result.path.display());
                        for line in result.context.text.lines() {
                            println!("   | {line}");
                        }
                        println!();
                    }
                }
            }
        }

        Commands::Info => {
            let store = create_store(&config, embedding_dimension(&config))?;
            let info = store
                .inspect()
                .await
                .context("Failed to read collection info")?;

            match (cli.format, info) {
                (OutputFormat::Json, info) => {
                    println!("{}", serde_json::to_string_pretty(&info)?);
                }
                (OutputFormat::Text, None) => {
                    println!(
                        "Collection {} does not exist yet on {}",
                        store.collection(),
                        store.backend_name()
                    );
                }
                (OutputFormat::Text, Some(info)) => {
                    println!("Collection {} on {}", info.name, store.backend_name());
                    println!("  Documents: {}", info.points_count);
                    println!("  Dimension: {}", info.dimension);
                    println!("  Distance:  {:?}", info.distance);
                    println!("  Status:    {}", info.status);
                }
            }
        }

        Commands::Ask { ref question } => {
            let assistant = Assistant::new(create_model(&config)?);
            let answer = assistant.ask(question).await.context("Question failed")?;
            print_assist(cli.format, "ask", question, &answer)?;
        }

        Commands::Process { task, ref text } => {
            let input = match text {
                Some(text) => text.clone(),
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read text from stdin")?;
                    buf
                }
            };

            let assistant = Assistant::new(create_model(&config)?);
            let response = assistant
                .process(task, &input)
                .await
                .with_context(|| format!("Task {task} failed"))?;
            print_assist(cli.format, task.name(), input.trim(), &response)?;
        }

        Commands::Config { ref action } => match action {
            ConfigAction::Show => match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&redacted(&config))
                            .context("Failed to serialize config")?
                    );
                }
                OutputFormat::Text => {
                    println!(
                        "{}",
                        toml::to_string_pretty(&redacted(&config))
                            .context("Failed to serialize config")?
                    );
                }
            },
            ConfigAction::Init => {
                println!("{}", Config::sample_toml());
            }
            ConfigAction::Path => {
                if let Some(path) = Config::config_path() {
                    println!("{}", path.display());
                } else {
                    println!("Could not determine config directory");
                }
            }
        },
    }

    Ok(())
}

fn print_report(format: OutputFormat, report: &IndexReport) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            println!();
            println!(
                "Indexed {} of {} files",
                report.success.len(),
                report.total()
            );
            if !report.failed.is_empty() {
                println!("Failed: {}", report.failed.join(", "));
            }
        }
    }
    Ok(())
}

fn print_assist(format: OutputFormat, task: &str, input: &str, response: &str) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output = AssistOutput {
                task,
                input,
                response,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => println!("{response}"),
    }
    Ok(())
}

/// Copy of the config with secrets masked, for display.
fn redacted(config: &Config) -> Config {
    let mask = |key: &Option<String>| key.as_ref().map(|_| "********".to_string());
    let mut shown = config.clone();
    shown.store.api_key = mask(&config.store.api_key);
    shown.embedding.api_key = mask(&config.embedding.api_key);
    shown.llm.api_key = mask(&config.llm.api_key);
    shown
}
