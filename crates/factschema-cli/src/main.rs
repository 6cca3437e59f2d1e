//! factschema CLI
//!
//! Command-line front end for the model compiler:
//! - `compile`: model JSON → OpenAPI 3.1 document
//! - `check`: resolve and validate a model without compiling it
//! - `tokenize` / `classify`: inspect how readings and fact types are read

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

use factschema_compiler::{classify, compile, GeneratorConfig};
use factschema_model::{
    digest_bytes, snapshot_digest, JsonModelFile, ModelRepository, ModelSnapshot,
    NounPattern,
};

#[derive(Parser)]
#[command(name = "factschema")]
#[command(
    author,
    version,
    about = "Compile Object-Role Models into JSON Schema and OpenAPI 3.1"
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a model document into an OpenAPI document.
    Compile {
        /// Model document (JSON)
        model: PathBuf,
        /// Generator configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output file (default: stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Override `info.title`
        #[arg(long)]
        title: Option<String>,
        /// Override `info.version`
        #[arg(long)]
        api_version: Option<String>,
        /// Emit compact JSON instead of pretty-printed
        #[arg(long)]
        compact: bool,
    },

    /// Resolve and validate a model document.
    Check {
        /// Model document (JSON)
        model: PathBuf,
    },

    /// Tokenize a reading against the model's noun names.
    Tokenize {
        /// Model document (JSON)
        model: PathBuf,
        /// Reading text, e.g. "Person has first- Name"
        reading: String,
    },

    /// Print the shape every fact type is classified as.
    Classify {
        /// Model document (JSON)
        model: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Compile {
            model,
            config,
            out,
            title,
            api_version,
            compact,
        } => {
            let mut config = load_config(config.as_deref())?;
            if title.is_some() {
                config.title = title;
            }
            if api_version.is_some() {
                config.version = api_version;
            }
            cmd_compile(&model, &config, out.as_deref(), compact)?;
        }
        Commands::Check { model } => cmd_check(&model)?,
        Commands::Tokenize { model, reading } => cmd_tokenize(&model, &reading)?,
        Commands::Classify { model } => cmd_classify(&model)?,
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_snapshot(model: &Path) -> Result<ModelSnapshot> {
    JsonModelFile::new(model)
        .load_snapshot()
        .with_context(|| format!("failed to load model {}", model.display()))
}

fn load_config(path: Option<&Path>) -> Result<GeneratorConfig> {
    let Some(path) = path else {
        return Ok(GeneratorConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    GeneratorConfig::from_json(&text)
        .with_context(|| format!("malformed config {}", path.display()))
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_compile(
    model: &Path,
    config: &GeneratorConfig,
    out: Option<&Path>,
    compact: bool,
) -> Result<()> {
    let snapshot = load_snapshot(model)?;
    let model_digest = snapshot_digest(&snapshot)?;
    let document = compile(&snapshot, config)
        .with_context(|| format!("failed to compile {}", model.display()))?;

    let mut json = if compact {
        serde_json::to_string(&document)?
    } else {
        serde_json::to_string_pretty(&document)?
    };
    json.push('\n');
    let output_digest = digest_bytes(json.as_bytes());

    match out {
        Some(out) => {
            fs::write(out, &json).with_context(|| format!("failed to write {}", out.display()))?;
            eprintln!("{} {}", "wrote".green().bold(), out.display().to_string().bold());
        }
        None => print!("{json}"),
    }
    eprintln!(
        "  {} {} schemas, {} paths",
        "→".cyan(),
        document.components.schemas.len(),
        document.paths.len()
    );
    eprintln!("  {} model  {}", "→".cyan(), model_digest);
    eprintln!("  {} output {}", "→".cyan(), output_digest);
    Ok(())
}

fn cmd_check(model: &Path) -> Result<()> {
    let snapshot = load_snapshot(model)?;
    let digest = snapshot_digest(&snapshot)?;
    eprintln!(
        "{} {} (nouns={} factTypes={} roles={} constraints={})",
        "ok".green().bold(),
        model.display(),
        snapshot.nouns.len(),
        snapshot.fact_types.len(),
        snapshot.roles.len(),
        snapshot.constraints.len()
    );
    println!("{digest}");
    Ok(())
}

fn cmd_tokenize(model: &Path, reading: &str) -> Result<()> {
    let snapshot = load_snapshot(model)?;
    let pattern = NounPattern::new(snapshot.noun_names()).context("invalid noun pattern")?;
    for token in pattern.tokenize(reading).tokens() {
        if token.noun {
            println!("{} {}", "noun".cyan(), token.text.bold());
        } else {
            println!("{} {}", "word".dimmed(), token.text);
        }
    }
    Ok(())
}

fn cmd_classify(model: &Path) -> Result<()> {
    let snapshot = load_snapshot(model)?;
    for id in snapshot.ordered_fact_types() {
        let fact_type = snapshot.fact_type(id);
        let shape = classify(&snapshot, id)
            .with_context(|| format!("failed to classify `{}`", fact_type.title()))?;
        println!("{:<13} {}", shape.label().yellow(), fact_type.title());
    }
    Ok(())
}
