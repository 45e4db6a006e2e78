//! doc-entities CLI
//!
//! Runs relation extraction or entity resolution over JSON input. Results go
//! to stdout as JSON; logs and summaries go to stderr.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use doc_entities::config::{
    ENV_CONFIDENCE_THRESHOLD, ENV_FUZZY_FALLBACK, ENV_FUZZY_SCORER, ENV_FUZZY_THRESHOLD,
};
use doc_entities::{
    DocEntitiesError, EntityLabel, EntityMention, EntityResolver, ExtractorConfig, FuzzyScorer,
    InMemoryMetrics, InMemoryStores, MentionId, MentionStore, ParsedDoc, PrecomputedParser,
    RelationExtractor, ResolveMode, ResolverConfig, Token,
};

#[derive(Parser)]
#[command(name = "doc-entities")]
#[command(
    about = "Relation extraction and entity resolution over entity mentions",
    long_about = None
)]
struct Cli {
    /// Verbose logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract relations from `{ "text": ..., "entities": [...] }`
    Extract {
        /// Input file, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Largest gap between mentions for pattern matching
        #[arg(long)]
        max_pattern_gap: Option<usize>,
    },

    /// Resolve an array of mentions against the built-in knowledge base
    Resolve {
        /// Input file, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Mode label for metrics
        #[arg(long, default_value = "async")]
        mode: ResolveMode,

        #[command(flatten)]
        knobs: ResolverKnobs,
    },
}

#[derive(Args)]
struct ResolverKnobs {
    /// Minimum score to resolve
    #[arg(long, env = ENV_CONFIDENCE_THRESHOLD)]
    confidence_threshold: Option<f32>,

    /// `1` enables fuzzy fallback, anything else disables it
    #[arg(long, env = ENV_FUZZY_FALLBACK)]
    fuzzy_fallback: Option<String>,

    /// Minimum fuzzy score (0-100)
    #[arg(long, env = ENV_FUZZY_THRESHOLD)]
    fuzzy_threshold: Option<f64>,

    /// Fuzzy scorer
    #[arg(long, env = ENV_FUZZY_SCORER)]
    fuzzy_scorer: Option<FuzzyScorer>,
}

impl ResolverKnobs {
    fn into_config(self) -> Result<ResolverConfig> {
        let mut config = ResolverConfig::default();
        if let Some(v) = self.confidence_threshold {
            config.confidence_threshold = v;
        }
        if let Some(v) = self.fuzzy_fallback {
            config.fuzzy_fallback = v.trim() == "1";
        }
        if let Some(v) = self.fuzzy_threshold {
            config.fuzzy_threshold = v;
        }
        if let Some(v) = self.fuzzy_scorer {
            config.fuzzy_scorer = v;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Deserialize)]
struct ExtractInput {
    text: String,
    #[serde(default)]
    entities: Vec<serde_json::Value>,
    #[serde(default)]
    parse: Option<ParseInput>,
}

#[derive(Deserialize)]
struct ParseInput {
    tokens: Vec<Token>,
    #[serde(default)]
    sentences: Vec<(usize, usize)>,
}

#[derive(Deserialize)]
struct MentionInput {
    #[serde(default)]
    id: Option<MentionId>,
    label: EntityLabel,
    value: String,
    #[serde(default)]
    span_start: Option<usize>,
    #[serde(default)]
    span_end: Option<usize>,
}

impl MentionInput {
    fn into_mention(self) -> EntityMention {
        let start = self.span_start.unwrap_or(0);
        let end = self
            .span_end
            .unwrap_or_else(|| start + self.value.chars().count());
        let mention = EntityMention::new(self.label, self.value, start, end);
        match self.id {
            Some(id) => mention.with_id(id),
            None => mention,
        }
    }
}

fn read_input(path: &Path) -> Result<String, DocEntitiesError> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn write_json(value: &impl serde::Serialize) -> Result<(), DocEntitiesError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

fn run_extract(input: &Path, max_pattern_gap: Option<usize>) -> Result<()> {
    let raw = read_input(input).with_context(|| format!("failed to read {}", input.display()))?;
    let doc: ExtractInput = serde_json::from_str(&raw).context("invalid extract input")?;

    let mut config = ExtractorConfig::default();
    if let Some(gap) = max_pattern_gap {
        config.max_pattern_gap = gap;
    }
    let mut builder = RelationExtractor::builder().config(config);
    if let Some(parse) = doc.parse {
        let parsed = ParsedDoc::from_tokens(parse.tokens, parse.sentences)?;
        let parser = PrecomputedParser::new();
        parser.insert(doc.text.clone(), parsed)?;
        builder = builder.parser(Arc::new(parser));
    }
    let extractor = builder.build();

    let relations = extractor.extract_values(&doc.text, &doc.entities);
    info!(relations = relations.len(), "extraction finished");
    write_json(&relations)?;
    Ok(())
}

fn run_resolve(input: &Path, mode: ResolveMode, knobs: ResolverKnobs) -> Result<()> {
    let raw = read_input(input).with_context(|| format!("failed to read {}", input.display()))?;
    let mentions: Vec<MentionInput> = serde_json::from_str(&raw).context("invalid resolve input")?;

    let stores = InMemoryStores::new();
    let mut ids = Vec::with_capacity(mentions.len());
    for mention in mentions {
        let mention = mention.into_mention();
        ids.push(mention.id.to_string());
        stores.mentions.insert(mention)?;
    }

    let metrics = Arc::new(InMemoryMetrics::new());
    let resolver = EntityResolver::new(stores.mentions.clone(), stores.resolutions.clone())
        .with_config(knobs.into_config()?)
        .with_metrics(metrics.clone());

    let payloads = resolver.resolve_entities(&ids, mode)?;
    write_json(&payloads)?;

    let summary = serde_json::to_string_pretty(&metrics.snapshot())?;
    eprintln!("{summary}");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Extract {
            input,
            max_pattern_gap,
        } => run_extract(&input, max_pattern_gap),
        Commands::Resolve { input, mode, knobs } => run_resolve(&input, mode, knobs),
    }
}
