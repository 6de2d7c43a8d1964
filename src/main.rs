// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use workflow_harvest::utils::logging::{format_info, format_step, format_success, format_warning};
use workflow_harvest::{
    CatalogueIndex, Config, IntegrationClassifier, OperationTimer, PipelineStats, Validator,
    load_sources, run_from_config,
};

#[derive(Parser)]
#[command(name = "workflow_harvest")]
#[command(author = "cipher")]
#[command(version)]
#[command(about = "Harvest and catalogue workflow JSON from GitHub repositories", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest every configured source and persist the catalogue
    Harvest {
        /// Sources file, overriding sources.path from the config
        #[arg(long, value_name = "FILE")]
        sources: Option<PathBuf>,

        /// Process at most NUM candidate files per source
        #[arg(long, value_name = "NUM")]
        limit: Option<usize>,

        #[arg(long)]
        no_progress: bool,
    },

    /// Summarise the persisted catalogue
    Stats,

    /// Validate configuration and list sources
    Check {
        #[arg(long, value_name = "FILE")]
        sources: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    workflow_harvest::utils::logging::init_logger(cli.color, cli.verbose);
    colored::control::set_override(cli.color);

    info!("Loading configuration from: {}", cli.config.display());

    let config = if cli.config.exists() {
        Config::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using default configuration",
            cli.config.display()
        );
        Config::default_config()
    };

    match cli.command {
        Commands::Harvest {
            sources,
            limit,
            no_progress,
        } => cmd_harvest(&config, sources.as_deref(), limit, !no_progress),
        Commands::Stats => cmd_stats(&config),
        Commands::Check { sources } => cmd_check(&config, sources.as_deref()),
    }
}

fn sources_path(config: &Config, override_path: Option<&Path>) -> PathBuf {
    match override_path {
        Some(path) => path.to_path_buf(),
        None => config.storage.root.join(&config.sources.path),
    }
}

fn cmd_harvest(
    config: &Config,
    sources_override: Option<&Path>,
    limit: Option<usize>,
    show_progress: bool,
) -> Result<()> {
    let path = sources_path(config, sources_override);
    let sources = load_sources(&path)
        .with_context(|| format!("Failed to load sources from {}", path.display()))?;

    if sources.is_empty() {
        eprintln!("{}", format_warning("No sources configured, nothing to harvest"));
        return Ok(());
    }

    let timer = OperationTimer::new("harvest");
    let stats = run_from_config(config, &sources, limit, show_progress)
        .context("Harvest failed")?;
    timer.finish_with_count(stats.files_seen);

    print_summary(&stats);
    Ok(())
}

fn print_summary(stats: &PipelineStats) {
    println!("\n{}", "=".repeat(60));
    println!(
        "{}",
        format_success(&format!(
            "Harvest complete in {:.1}s ({:.2} files/sec)",
            stats.duration_secs,
            stats.files_per_second()
        ))
    );
    println!(
        "  Sources: {} processed, {} failed",
        stats.sources_processed, stats.sources_failed
    );
    println!(
        "  Files:   {} seen, {} catalogued, {} failed, {} link-only",
        stats.files_seen, stats.files_catalogued, stats.files_failed, stats.link_only
    );
    println!(
        "  Entries: {} new, {} repeat sightings",
        stats.new_entries, stats.duplicate_sightings
    );
    println!("  Stored:  {} bytes", stats.bytes_stored);
    println!("  Success rate: {:.2}%", stats.success_rate());

    if stats.files_failed > 0 || stats.sources_failed > 0 {
        println!(
            "{}",
            format_warning("Some files or sources failed; see warnings above")
        );
    }
    println!("{}", "=".repeat(60));
}

fn cmd_stats(config: &Config) -> Result<()> {
    let path = config.storage.catalogue_file();
    let index = CatalogueIndex::load(&path);

    if index.is_empty() {
        println!(
            "{}",
            format_info(&format!("Catalogue {} is empty", path.display()))
        );
        return Ok(());
    }

    let mut by_integration: BTreeMap<&str, usize> = BTreeMap::new();
    let mut stored = 0usize;
    for (_, entry) in index.entries() {
        if entry.stored_at.is_some() {
            stored += 1;
        }
        for tag in &entry.integrations {
            *by_integration.entry(tag.as_str()).or_default() += 1;
        }
    }

    println!("\nCatalogue: {}", path.display());
    println!("  Unique entries:  {}", index.len());
    println!("  Sightings:       {}", index.sighting_count());
    println!("  Stored content:  {}", stored);
    println!("  Link-only/other: {}", index.len() - stored);

    if !by_integration.is_empty() {
        println!("\nBy integration:");
        for (tag, count) in by_integration {
            println!("  {:<16} {}", tag, count);
        }
    }

    Ok(())
}

fn cmd_check(config: &Config, sources_override: Option<&Path>) -> Result<()> {
    println!(
        "{}",
        format_success(&format!("Configuration OK (api: {})", config.github.api_base))
    );

    let classifier = IntegrationClassifier::with_extra(&config.classification.extra_integrations)
        .context("Invalid integration patterns")?;
    println!(
        "{}",
        format_info(&format!(
            "Integrations: {}",
            classifier.names().collect::<Vec<_>>().join(", ")
        ))
    );

    if config.github.resolved_token().is_none() {
        println!(
            "{}",
            format_warning("No GitHub token set; unauthenticated rate limits apply")
        );
    }

    let path = sources_path(config, sources_override);
    let sources = load_sources(&path).context("Source configuration is invalid")?;

    println!(
        "{}",
        format_success(&format!("{} sources in {}", sources.len(), path.display()))
    );

    for (i, source) in sources.iter().enumerate() {
        let include = if source.include.is_empty() {
            "*".to_string()
        } else {
            Validator::truncate_text(&source.include.join(", "), 60)
        };
        println!(
            "{}",
            format_step(
                i + 1,
                sources.len(),
                &format!(
                    "{}@{} [{}] include: {}",
                    source.slug(),
                    source.branch,
                    source.mode,
                    include
                )
            )
        );
    }

    Ok(())
}
