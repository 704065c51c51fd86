// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cairn - conversational memory recall, curation and extraction.
//!
//! This is the operator CLI over the memory engine.

mod extract;
mod memory;
mod status;
mod transcript;
mod transfer;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use cairn_config::{CairnConfig, ConfigError};
use cairn_core::CairnError;
use cairn_memory::{ImportTarget, MemorySystem};
use cairn_openai::{OpenAiCompatEmbedder, OpenAiCompatProvider};
use clap::{Parser, Subcommand, ValueEnum};

/// Cairn - conversational memory recall, curation and extraction.
#[derive(Parser, Debug)]
#[command(name = "cairn", version, about, long_about = None)]
struct Cli {
    /// Load this config file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Channels an operator may write one record into. Semantic memory is
/// written by promotion or bulk import.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum WritableChannel {
    Persona,
    Episodic,
}

/// Collections that export, import and seed operate on.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FactCollection {
    Semantic,
    Candidates,
}

impl From<FactCollection> for ImportTarget {
    fn from(collection: FactCollection) -> Self {
        match collection {
            FactCollection::Semantic => ImportTarget::Semantic,
            FactCollection::Candidates => ImportTarget::Candidates,
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one recall pass and print the injection block.
    Recall {
        query: String,
        /// Also print the per-channel recall snapshot.
        #[arg(long)]
        debug: bool,
        #[arg(long)]
        json: bool,
    },
    /// Write a record into the persona or episodic channel.
    Remember {
        text: String,
        #[arg(long, value_enum, default_value = "persona")]
        channel: WritableChannel,
        /// Importance for persona seeds (defaults to ingest.default_importance).
        #[arg(long)]
        importance: Option<f32>,
        #[arg(long)]
        style: Option<String>,
    },
    /// Extract semantic candidates from a transcript file or folder.
    Extract {
        /// JSON transcript, or a folder of normalized_*.json files.
        #[arg(long)]
        transcript: PathBuf,
        /// Turns between window starts.
        #[arg(long, default_value_t = 10)]
        stride: usize,
        #[arg(long)]
        max_windows: Option<usize>,
        /// Extract and distill without staging anything.
        #[arg(long)]
        dry_run: bool,
        /// Facts below this confidence are not staged.
        #[arg(long, default_value_t = 0.85)]
        min_confidence: f32,
        /// Provenance recorded on staged candidates.
        #[arg(long, default_value = "bootstrap")]
        source: String,
        /// Write every extracted fact to this JSONL file for review.
        #[arg(long)]
        review_out: Option<PathBuf>,
    },
    /// Promote staged candidates into the semantic channel.
    Promote {
        #[arg(long, default_value_t = 50)]
        limit: usize,
        /// Defaults to archivist.promote_min_confidence.
        #[arg(long)]
        min_confidence: Option<f32>,
        /// Only candidates staged with this provenance.
        #[arg(long)]
        source: Option<String>,
        /// Delete promoted candidates instead of tagging them.
        #[arg(long)]
        delete: bool,
        /// Promote only these candidate ids.
        #[arg(long = "id")]
        ids: Vec<String>,
    },
    /// List staged candidates, or promoted semantic memory.
    Candidates {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// List the semantic channel instead of candidates.
        #[arg(long)]
        semantic: bool,
        #[arg(long)]
        json: bool,
    },
    /// Write semantic memory or candidates as JSONL.
    Export {
        #[arg(long, value_enum, default_value = "semantic")]
        from: FactCollection,
        /// Output file; stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Load JSONL rows (as written by export) into semantic or candidates.
    Import {
        file: PathBuf,
        #[arg(long, value_enum, default_value = "semantic")]
        into: FactCollection,
        /// Provenance stamped on rows that have none.
        #[arg(long, default_value = "import")]
        source: String,
    },
    /// Stage facts from a YAML seed file.
    Seed {
        file: PathBuf,
        #[arg(long, value_enum, default_value = "candidates")]
        into: FactCollection,
        /// Run each seed line through the archivist instead of storing it verbatim.
        #[arg(long)]
        extract: bool,
    },
    /// Check adapters and show per-collection counts.
    Status {
        #[arg(long)]
        json: bool,
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Manage Cairn configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Load and validate configuration, reporting every problem.
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            cairn_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.agent.log_level);

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("cairn: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: &CairnConfig) -> Result<(), CairnError> {
    match command {
        Commands::Config {
            action: ConfigCommands::Check,
        } => {
            println!(
                "config OK (agent.name={}, storage={:?}, embedding.dimensions={})",
                config.agent.name, config.storage.backend, config.embedding.dimensions
            );
            Ok(())
        }
        Commands::Status { json, plain } => status::run_status(config, json, plain).await,
        Commands::Recall { query, debug, json } => {
            let system = open_system(config).await?;
            memory::run_recall(&system, &query, debug, json).await
        }
        Commands::Remember {
            text,
            channel,
            importance,
            style,
        } => {
            let system = open_system(config).await?;
            memory::run_remember(&system, &text, channel, importance, style).await
        }
        Commands::Candidates {
            limit,
            semantic,
            json,
        } => {
            let system = open_system(config).await?;
            memory::run_candidates(&system, limit, semantic, json).await
        }
        Commands::Export { from, out } => {
            let system = open_system(config).await?;
            transfer::run_export(&system, from.into(), out.as_deref()).await
        }
        Commands::Import { file, into, source } => {
            let system = open_system(config).await?;
            transfer::run_import(&system, &file, into.into(), &source).await
        }
        Commands::Seed {
            file,
            into,
            extract,
        } => {
            let system = open_system(config).await?;
            transfer::run_seed(&system, &file, into.into(), extract).await
        }
        Commands::Extract {
            transcript,
            stride,
            max_windows,
            dry_run,
            min_confidence,
            source,
            review_out,
        } => {
            let system = open_system(config).await?;
            let args = extract::ExtractArgs {
                transcript,
                stride,
                max_windows,
                dry_run,
                min_confidence,
                source,
                review_out,
            };
            extract::run_extract(&system, &args).await
        }
        Commands::Promote {
            limit,
            min_confidence,
            source,
            delete,
            ids,
        } => {
            let system = open_system(config).await?;
            let options = cairn_memory::PromoteOptions {
                limit,
                min_confidence: min_confidence
                    .unwrap_or(config.archivist.promote_min_confidence),
                source,
                delete_from_candidates: delete,
            };
            extract::run_promote(&system, &options, &ids).await
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<CairnConfig, Vec<ConfigError>> {
    match path {
        Some(path) => cairn_config::load_and_validate_path(path),
        None => cairn_config::load_and_validate(),
    }
}

/// Open the configured store and HTTP adapters and wire the engine.
async fn open_system(config: &CairnConfig) -> Result<MemorySystem, CairnError> {
    let store = cairn_storage::open_store(&config.storage).await?;
    let embedder = Arc::new(OpenAiCompatEmbedder::new(&config.embedding)?);
    let provider = Arc::new(OpenAiCompatProvider::new(&config.archivist)?);
    MemorySystem::initialize(config, store, embedder, provider).await
}

/// Initialize tracing to stderr. `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cairn={log_level},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}
