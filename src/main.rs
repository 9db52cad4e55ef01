mod config;
mod error;
mod export;
mod flatten;
mod layout;
mod parser;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use config::ParserConfig;
use error::RegisterError;
use parser::categories::CategoryTable;
use parser::ParsedDocument;

#[derive(Parser)]
#[command(
    name = "interest_register",
    about = "Parse the register of representatives' economic interests from pdftohtml layout files"
)]
struct Cli {
    /// Parser config (JSON); defaults are used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse one layout file (`pdftohtml -xml` output or JSON) and write JSON + CSV
    Parse {
        layout: PathBuf,
        /// Output directory
        #[arg(short, long, default_value = "out")]
        out: PathBuf,
    },
    /// Re-parse every layout file in a directory, one pipeline per document
    Batch {
        dir: PathBuf,
        /// Output directory
        #[arg(short, long, default_value = "out")]
        out: PathBuf,
    },
    /// Print the canonical category table
    Categories,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let cfg = ParserConfig::load(cli.config.as_deref())?;
    let table = CategoryTable::standard();

    let result = match cli.command {
        Commands::Parse { layout, out } => {
            let doc = process_document(&layout, &cfg, &table)
                .with_context(|| format!("Failed to parse {}", layout.display()))?;
            let written = export::write_document(&out, &doc, &table)?;
            println!(
                "{} representatives as of {} -> {}, {}",
                doc.representatives.len(),
                doc.meta.updated_at,
                written.json.display(),
                written.csv.display()
            );
            Ok(())
        }
        Commands::Batch { dir, out } => {
            let files = layout_files(&dir)?;
            if files.is_empty() {
                println!("No layout files (*.xml, *.json) in {}", dir.display());
                return Ok(());
            }
            println!("Parsing {} documents...", files.len());
            let counts = process_batch(&files, &out, &cfg, &table)?;
            counts.print();
            Ok(())
        }
        Commands::Categories => {
            println!("Category table revision {} ({} codes)", table.revision(), table.len());
            for (code, label) in table.iter() {
                println!("{:>3} | {}", code, label);
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Load → parse for one document. Shares nothing mutable with other documents.
fn process_document(
    path: &Path,
    cfg: &ParserConfig,
    table: &CategoryTable,
) -> Result<ParsedDocument, RegisterError> {
    let pages = layout::load(path)?;
    parser::parse_document(&pages, cfg, table)
}

struct BatchCounts {
    ok: usize,
    failed: usize,
    skipped: usize,
}

impl BatchCounts {
    fn print(&self) {
        println!(
            "Wrote {} documents ({} failed, {} duplicate dates skipped).",
            self.ok, self.failed, self.skipped,
        );
    }
}

fn process_batch(
    files: &[PathBuf],
    out: &Path,
    cfg: &ParserConfig,
    table: &CategoryTable,
) -> Result<BatchCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let results: Vec<_> = files
        .par_iter()
        .map(|path| {
            let result = process_document(path, cfg, table);
            pb.inc(1);
            (path, result)
        })
        .collect();
    pb.finish_and_clear();

    let mut counts = BatchCounts {
        ok: 0,
        failed: 0,
        skipped: 0,
    };
    let mut seen = HashSet::new();

    for (path, result) in results {
        match result {
            Ok(doc) => {
                if !seen.insert(doc.meta.updated_at) {
                    info!("Skipping already parsed {} ({})", path.display(), doc.meta.updated_at);
                    counts.skipped += 1;
                    continue;
                }
                match export::write_document(out, &doc, table) {
                    Ok(_) => counts.ok += 1,
                    Err(e) => {
                        warn!("Failed to export {}: {:#}", path.display(), e);
                        counts.failed += 1;
                    }
                }
            }
            Err(e) => {
                warn!("Failed to parse {}: {}", path.display(), e);
                counts.failed += 1;
            }
        }
    }

    Ok(counts)
}

/// Layout files in `dir`, sorted so duplicate dates resolve to the same file every run.
fn layout_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| matches!(p.extension().and_then(|e| e.to_str()), Some("xml" | "json")))
        .collect();
    files.sort();
    Ok(files)
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
