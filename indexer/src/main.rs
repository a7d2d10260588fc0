use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use lexis_core::overrides::suffix_boost;
use lexis_core::{Engine, EngineConfig, ExtractedDocument, Language};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query a full-text index", long_about = None)]
struct Cli {
    /// JSON config file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Index directory
    #[arg(long, global = true)]
    index: Option<PathBuf>,
    /// Language profile for text fields (none, english, romanian)
    #[arg(long, global = true)]
    language: Option<Language>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the index with the documents found under the input path
    Build(BuildArgs),
    /// Run one query against the committed index
    Search(SearchArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Input path: a directory, a .json/.jsonl file of extracted documents, or a text file
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long)]
    title_boost: Option<f32>,
    #[arg(long)]
    contents_boost: Option<f32>,
    /// Strip diacritics from text terms
    #[arg(long, default_value_t = false)]
    fold_diacritics: bool,
}

#[derive(Args)]
struct SearchArgs {
    /// Query string, e.g. `cautare rapida` or `title:raport OR keywords:lucene`
    query: String,
    /// Default field for unqualified terms
    #[arg(long)]
    field: Option<String>,
    #[arg(long)]
    limit: Option<usize>,
    /// Multiply the score of documents whose path ends with this suffix
    #[arg(long)]
    boost_suffix: Option<String>,
    #[arg(long, default_value_t = 2.0)]
    boost_factor: f32,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path).with_context(|| format!("reading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(index) = cli.index {
        config.index_location = index;
    }
    if let Some(language) = cli.language {
        config.language = language;
    }

    match cli.command {
        Commands::Build(args) => {
            if let Some(input) = args.input {
                config.documents_location = input;
            }
            if let Some(boost) = args.title_boost {
                config.title_boost = boost;
            }
            if let Some(boost) = args.contents_boost {
                config.contents_boost = boost;
            }
            config.fold_diacritics |= args.fold_diacritics;
            build_index(config)
        }
        Commands::Search(args) => run_search(config, args),
    }
}

fn build_index(config: EngineConfig) -> Result<()> {
    tracing::info!(input = %config.documents_location.display(), output = %config.index_location.display(), "building index");
    let docs = collect_documents(&config.documents_location)?;
    tracing::info!(num_docs = docs.len(), "extracted documents");

    let engine = Engine::open(config)?;
    let report = engine.reindex(docs)?;
    for skipped in &report.skipped_fields {
        tracing::warn!(%skipped, "field skipped");
    }
    tracing::info!(generation = report.generation, indexed = report.indexed, skipped = report.skipped_fields.len(), "index build complete");
    println!("{} documents written", report.indexed);
    Ok(())
}

fn run_search(config: EngineConfig, args: SearchArgs) -> Result<()> {
    let field = args.field.unwrap_or_else(|| config.default_field.clone());
    let limit = args.limit.unwrap_or(config.default_limit);
    let engine = Engine::open(config)?;

    let rescorer = args.boost_suffix.map(|suffix| suffix_boost("path", &suffix, args.boost_factor));
    let hits = match &rescorer {
        Some(rescorer) => engine.search_with(&args.query, &field, limit, Some(rescorer))?,
        None => engine.search(&args.query, &field, limit)?,
    };

    println!("{} matching documents", hits.len());
    for hit in hits {
        match &hit.path {
            Some(path) => println!("{}. {}", hit.doc_id, path),
            None => println!("{}. (no path for this document)", hit.doc_id),
        }
        println!(" --> score={}", hit.score);
        println!(" --> explanation=");
        println!("{}", hit.explanation);
    }
    Ok(())
}

fn collect_documents(input: &Path) -> Result<Vec<ExtractedDocument>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            if entry.path().is_file() {
                files.push(entry.path().to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        anyhow::bail!("input {} does not exist", input.display());
    }

    let mut docs = Vec::new();
    for file in files {
        match file.extension().and_then(|s| s.to_str()) {
            Some("jsonl") => read_jsonl(&file, &mut docs)?,
            Some("json") => read_json(&file, &mut docs)?,
            Some("txt" | "md" | "text") => {
                if let Some(doc) = read_text(&file)? {
                    docs.push(doc);
                }
            }
            _ => tracing::warn!(path = %file.display(), "no text extractor for this format, skipping"),
        }
    }
    Ok(docs)
}

fn read_jsonl(file: &Path, docs: &mut Vec<ExtractedDocument>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc: ExtractedDocument = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}", file.display(), n + 1))?;
        docs.push(doc);
    }
    Ok(())
}

fn read_json(file: &Path, docs: &mut Vec<ExtractedDocument>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                docs.push(serde_json::from_value(v)?);
            }
        }
        serde_json::Value::Object(_) => docs.push(serde_json::from_value(json)?),
        _ => tracing::warn!(path = %file.display(), "expected an object or array of documents"),
    }
    Ok(())
}

/// Plain text is its own extraction: the file name becomes the source id.
fn read_text(file: &Path) -> Result<Option<ExtractedDocument>> {
    let bytes = fs::read(file)?;
    let source_id = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());
    match String::from_utf8(bytes) {
        Ok(text) => Ok(Some(ExtractedDocument { source_id, text, ..Default::default() })),
        Err(err) => {
            tracing::warn!(path = %file.display(), error = %err, "not valid UTF-8, skipping");
            Ok(None)
        }
    }
}
