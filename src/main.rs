use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facematch::catalog::Catalog;
use facematch::session::{Outcome, Session, Watcher};
use facematch::source::JsonLinesSource;
use facematch::{config, source, Threshold};
use log::{info, warn};

#[derive(Parser)]
#[command(name = "facematch")]
#[command(
    version,
    about = "Match face embeddings against a gallery of known references"
)]
struct Cli {
    /// Catalog directory (defaults to the configured one)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a reference image to the catalog
    Add {
        /// Name reported when this reference matches
        #[arg(short, long)]
        name: String,
        /// Where the reference image lives
        #[arg(short, long)]
        url: String,
        /// Embedding as an inline JSON array or a path to a JSON file
        embedding: String,
    },
    /// List catalog entries
    List,
    /// Rename a catalog entry
    Rename { id: String, name: String },
    /// Remove a catalog entry
    Remove { id: String },
    /// Remove every catalog entry
    Purge,
    /// Match one embedding against the catalog
    Match {
        /// Embedding as an inline JSON array or a path to a JSON file
        embedding: String,
        /// Override the configured threshold
        #[arg(short, long)]
        threshold: Option<f32>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Match a stream of JSON-lines embeddings at a fixed cadence
    Watch {
        /// One embedding array per line, `null` for frames without a face (`-` for stdin)
        queries: PathBuf,
        /// Override the configured period
        #[arg(short, long)]
        interval_ms: Option<u64>,
        /// Stop after this many cycles
        #[arg(short, long)]
        cycles: Option<usize>,
        /// Override the configured threshold
        #[arg(short, long)]
        threshold: Option<f32>,
    },
    /// Open config file in editor
    Config,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(None)?;
    let catalog = Catalog::open(cli.catalog.unwrap_or_else(|| cfg.catalog.clone()));

    match cli.command {
        Commands::Add {
            name,
            url,
            embedding,
        } => add(&catalog, &name, &url, &embedding),
        Commands::List => list(&catalog),
        Commands::Rename { id, name } => rename(&catalog, &id, &name),
        Commands::Remove { id } => remove(&catalog, &id),
        Commands::Purge => purge(&catalog),
        Commands::Match {
            embedding,
            threshold,
            json,
        } => {
            let threshold = pick_threshold(&cfg, threshold)?;
            match_once(&catalog, &embedding, threshold, json)
        }
        Commands::Watch {
            queries,
            interval_ms,
            cycles,
            threshold,
        } => {
            let threshold = pick_threshold(&cfg, threshold)?;
            let interval = Duration::from_millis(interval_ms.unwrap_or(cfg.interval_ms));
            watch(&catalog, &queries, threshold, interval, cycles)
        }
        Commands::Config => open_config(),
    }
}

fn pick_threshold(cfg: &config::Config, cli: Option<f32>) -> Result<Threshold> {
    match cli {
        Some(t) => Threshold::new(t).context("invalid --threshold"),
        None => Ok(cfg.threshold),
    }
}

fn add(catalog: &Catalog, name: &str, url: &str, embedding: &str) -> Result<()> {
    let embedding = source::parse_embedding(embedding)?;
    let dim = embedding.dim();

    // Warn early rather than fail every later match
    if let Some(existing) = catalog.list()?.first() {
        if existing.embedding.len() != dim {
            warn!(
                "Embedding has {} dimensions but the catalog uses {}",
                dim,
                existing.embedding.len()
            );
        }
    }

    let record = catalog
        .add(name, url, embedding.to_vec())
        .context("Failed to add reference")?;
    info!("✓ Added {} as {}", record.name, record.id);
    Ok(())
}

fn list(catalog: &Catalog) -> Result<()> {
    let records = catalog.list().context("Failed to load catalog")?;
    if records.is_empty() {
        info!("Catalog at {} is empty", catalog.dir().display());
        return Ok(());
    }
    for r in &records {
        println!("{}\t{}\t{}\t{}d", r.id, r.name, r.url, r.embedding.len());
    }
    Ok(())
}

fn rename(catalog: &Catalog, id: &str, name: &str) -> Result<()> {
    if !catalog.rename(id, name)? {
        anyhow::bail!("No catalog entry with id {}", id);
    }
    info!("✓ Renamed {} to {}", id, name);
    Ok(())
}

fn remove(catalog: &Catalog, id: &str) -> Result<()> {
    if !catalog.remove(id)? {
        anyhow::bail!("No catalog entry with id {}", id);
    }
    info!("✓ Removed {}", id);
    Ok(())
}

fn purge(catalog: &Catalog) -> Result<()> {
    info!("Purging catalog at {}", catalog.dir().display());
    catalog.purge().context("Failed to purge catalog")?;
    info!("✓ Catalog purged");
    Ok(())
}

fn match_once(
    catalog: &Catalog,
    embedding: &str,
    threshold: Threshold,
    json: bool,
) -> Result<()> {
    let query = source::parse_embedding(embedding)?;
    let references = catalog.references().context("Failed to load references")?;
    let session = Session::new(references, threshold);

    let obs = session.observe(&query)?;
    if json {
        println!("{}", serde_json::to_string(&obs.result)?);
    } else {
        println!(
            "{}\tdistance {:.4}\tconfidence {:.1}%",
            obs.result.identity, obs.result.distance, obs.confidence
        );
    }
    Ok(())
}

fn watch(
    catalog: &Catalog,
    queries: &Path,
    threshold: Threshold,
    interval: Duration,
    cycles: Option<usize>,
) -> Result<()> {
    let references = catalog.references().context("Failed to load references")?;
    if references.is_empty() {
        warn!("Catalog is empty; every face will be reported as Unknown");
    }
    info!(
        "Watching with {} reference(s), threshold {}, every {:?}",
        references.len(),
        threshold,
        interval
    );

    let mut frames = JsonLinesSource::open(queries)?;
    let session = Session::new(references, threshold);
    let mut watcher = Watcher::new(interval);
    if let Some(n) = cycles {
        watcher = watcher.with_max_cycles(n);
    }

    let done = watcher.run(&session, &mut frames, |n, outcome| match outcome {
        Outcome::Matched(obs) => info!(
            "Frame {}: {} (distance {:.4}, confidence {:.1}%)",
            n, obs.result.identity, obs.result.distance, obs.confidence
        ),
        Outcome::NoFace => info!("Frame {}: No face", n),
        // already logged by the watcher
        Outcome::Rejected(_) => {}
    });

    if frames.skipped() > 0 {
        warn!("Skipped {} malformed line(s)", frames.skipped());
    }
    info!("Processed {} frame(s)", done);
    Ok(())
}

fn open_config() -> Result<()> {
    if !config::CONFIG_PATH.exists() {
        config::save_config(&config::Config::default(), None)
            .context("Failed to write default config")?;
    }
    let config_path = config::CONFIG_PATH.as_os_str();
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
