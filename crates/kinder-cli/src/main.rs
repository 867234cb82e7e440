//! kinder CLI
//!
//! Assemble the kindergarten site's composite views from the command line.
//!
//! Usage:
//!   kinder homepage --fixtures fixtures.json [--config homepage.yaml] [--format json|yaml|text]
//!   kinder fetch <collection> --fixtures fixtures.json [--limit N] [--attempts M] [--base-delay 500ms]
//!   kinder validate <config.yaml>
//!
//! `--fail news=always` or `--fail events=2` injects a simulated outage for
//! a collection, to see how the page degrades.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use kinder_core::{AggregationConfig, Collection, FailureReport, HomepageView, Record};
use kinder_runtime::{
    Aggregator, DataSource, FetchTask, FlakySource, HomepageService, InMemorySource, RetryPolicy,
};

#[derive(Parser)]
#[command(name = "kinder")]
#[command(author, version, about = "Resilient content aggregation for the kindergarten site")]
struct Cli {
    /// Log retries and backoff at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble the homepage view
    Homepage {
        /// Aggregation config (YAML or JSON); defaults to the standard homepage
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        source: SourceArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Fetch one collection with retries
    Fetch {
        /// Collection name (news, events, notices, teachers, gallery, downloads)
        collection: Collection,

        /// Maximum records
        #[arg(short, long, default_value = "5")]
        limit: usize,

        /// Total attempts, including the first
        #[arg(short, long, default_value = "3")]
        attempts: u32,

        /// Delay before the second attempt; doubles after each failure
        #[arg(long, value_parser = humantime::parse_duration, default_value = "500ms")]
        base_delay: Duration,

        /// Give up once this much time has passed
        #[arg(long, value_parser = humantime::parse_duration)]
        deadline: Option<Duration>,

        #[command(flatten)]
        source: SourceArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Validate an aggregation config
    Validate {
        /// Config file (YAML or JSON)
        config: PathBuf,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Fixture file: a JSON object of rows keyed by collection
    #[arg(long)]
    fixtures: Option<PathBuf>,

    /// Hosted database base URL (key from KINDER_API_KEY)
    #[cfg(feature = "rest")]
    #[arg(long, conflicts_with = "fixtures")]
    rest_url: Option<String>,

    /// Simulate an outage: `collection=always` or `collection=N` (first N calls)
    #[arg(long = "fail", value_parser = parse_fault)]
    faults: Vec<(Collection, Fault)>,
}

#[derive(Debug, Clone, Copy)]
enum Fault {
    Always,
    First(u32),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Homepage {
            config,
            source,
            format,
        } => cmd_homepage(config, source, format).await,
        Commands::Fetch {
            collection,
            limit,
            attempts,
            base_delay,
            deadline,
            source,
            format,
        } => {
            let policy = RetryPolicy::new(attempts, base_delay);
            cmd_fetch(collection, limit, policy, deadline, source, format).await
        }
        Commands::Validate { config } => cmd_validate(config),
    }
}

async fn cmd_homepage(
    config: Option<PathBuf>,
    source: SourceArgs,
    format: OutputFormat,
) -> Result<()> {
    let config = match config {
        Some(path) => AggregationConfig::from_file(&path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => AggregationConfig::homepage(),
    };

    let source = open_source(&source)?;
    let service = HomepageService::with_config(source, config)?;
    let view = service.load().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&view)?),
        OutputFormat::Text => print_homepage(&view),
    }

    Ok(())
}

async fn cmd_fetch(
    collection: Collection,
    limit: usize,
    policy: RetryPolicy,
    deadline: Option<Duration>,
    source: SourceArgs,
    format: OutputFormat,
) -> Result<()> {
    let source = open_source(&source)?;
    let aggregator = Aggregator::builder().deadline(deadline).build();
    let task = FetchTask::from_source(collection.as_str(), source, collection, limit, policy);

    let outcome = aggregator.fetch_one(task).await;
    let failure = outcome.failure().cloned();
    let attempts = outcome.attempts();
    let records = outcome.into_records();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&records)?),
        OutputFormat::Text => {
            println!("{} ({} attempt(s))", collection, attempts);
            print_records(&records);
            if let Some(report) = &failure {
                print_failures(std::slice::from_ref(report));
            }
        }
    }

    Ok(())
}

fn cmd_validate(path: PathBuf) -> Result<()> {
    let config = AggregationConfig::from_file(&path)
        .with_context(|| format!("Invalid config: {}", path.display()))?;

    println!("✓ {} is valid", path.display());
    for section in &config.sections {
        let policy = RetryPolicy::for_section(section, &config.defaults);
        println!(
            "  {:<16} {:<10} limit {:<3} attempts {} (worst-case backoff {})",
            section.name,
            section.collection,
            section.limit,
            policy.max_attempts,
            humantime::format_duration(policy.total_delay())
        );
    }
    if let Some(deadline) = config.defaults.deadline {
        println!("  deadline {}", humantime::format_duration(deadline));
    }

    Ok(())
}

fn open_source(args: &SourceArgs) -> Result<Arc<dyn DataSource>> {
    #[cfg(feature = "rest")]
    if let Some(url) = &args.rest_url {
        let config = serde_json::json!({ "base_url": url });
        let source = kinder_runtime::RestSource::from_config(&config)
            .context("Failed to configure REST source")?;
        return Ok(with_faults(source, &args.faults));
    }

    match &args.fixtures {
        Some(path) => {
            let source = InMemorySource::from_json_file(path)
                .with_context(|| format!("Failed to load fixtures: {}", path.display()))?;
            Ok(with_faults(source, &args.faults))
        }
        None => bail!("No data source: pass --fixtures FILE{}", rest_hint()),
    }
}

fn with_faults<S: DataSource + 'static>(inner: S, faults: &[(Collection, Fault)]) -> Arc<dyn DataSource> {
    if faults.is_empty() {
        return Arc::new(inner);
    }

    let source = faults
        .iter()
        .fold(FlakySource::new(inner), |source, (collection, fault)| match fault {
            Fault::Always => source.fail_always(*collection),
            Fault::First(n) => source.fail_first(*collection, *n),
        });
    Arc::new(source)
}

fn rest_hint() -> &'static str {
    if cfg!(feature = "rest") {
        " or --rest-url URL"
    } else {
        ""
    }
}

fn parse_fault(s: &str) -> Result<(Collection, Fault), String> {
    let (name, count) = s
        .split_once('=')
        .ok_or_else(|| format!("expected COLLECTION=always|N, got '{}'", s))?;
    let collection: Collection = name.parse().map_err(|e| format!("{}", e))?;
    let fault = match count {
        "always" => Fault::Always,
        n => Fault::First(
            n.parse()
                .map_err(|_| format!("expected 'always' or a number, got '{}'", n))?,
        ),
    };
    Ok((collection, fault))
}

fn print_homepage(view: &HomepageView) {
    println!("News");
    for news in &view.news {
        println!("  {}  {}", news.published_at.format("%Y-%m-%d"), news.title);
    }

    println!("Upcoming events");
    for event in &view.events {
        let location = event.location.as_deref().unwrap_or("");
        println!("  {}  {}  {}", event.starts_at.format("%Y-%m-%d %H:%M"), event.title, location);
    }

    println!("Notices");
    for notice in &view.notices {
        println!("  [{:?}] {}", notice.priority, notice.title);
    }

    println!("Teachers");
    for teacher in &view.teachers {
        println!("  {} ({})", teacher.name, teacher.position);
    }

    if !view.gallery.is_empty() {
        println!("Gallery");
        for item in &view.gallery {
            println!("  {}", item.title);
        }
    }

    if !view.downloads.is_empty() {
        println!("Downloads");
        for download in &view.downloads {
            println!("  {}  {}", download.title, download.file_url);
        }
    }

    print_failures(&view.failures);
}

fn print_records(records: &[Record]) {
    if records.is_empty() {
        println!("  (none)");
    }
    for record in records {
        println!("  {}  {}", record.id(), record.title());
    }
}

fn print_failures(failures: &[FailureReport]) {
    if failures.is_empty() {
        return;
    }
    eprintln!();
    eprintln!("⚠ {} section(s) unavailable:", failures.len());
    for failure in failures {
        eprintln!("  {}", failure);
    }
}
