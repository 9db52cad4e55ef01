use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::flatten::{flatten_all, FlatRecord};
use crate::parser::categories::CategoryTable;
use crate::parser::date::DocumentMeta;
use crate::parser::segment::{Interest, Representative};
use crate::parser::ParsedDocument;

const BASE_FIELDS: &[&str] = &["rep_number", "first_name", "last_name", "party"];

#[derive(Serialize)]
struct JsonDocument<'a> {
    #[serde(flatten)]
    meta: &'a DocumentMeta,
    representatives: &'a [Representative],
}

/// Paths written for one document.
#[derive(Debug)]
pub struct Written {
    pub json: PathBuf,
    pub csv: PathBuf,
}

/// Write `interests-<date>.json` and `interests-<date>.csv` into `out_dir`.
///
/// Both files are staged under `.tmp` names and renamed into place; on any
/// failure neither artifact is left behind.
pub fn write_document(out_dir: &Path, doc: &ParsedDocument, table: &CategoryTable) -> Result<Written> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let stem = format!("interests-{}", doc.meta.updated_at.format("%Y-%m-%d"));
    let json = out_dir.join(format!("{}.json", stem));
    let csv = out_dir.join(format!("{}.csv", stem));
    let json_tmp = out_dir.join(format!("{}.json.tmp", stem));
    let csv_tmp = out_dir.join(format!("{}.csv.tmp", stem));

    let result = write_json(&json_tmp, &doc.meta, &doc.representatives)
        .and_then(|_| write_csv(&csv_tmp, &flatten_all(&doc.representatives, table), table))
        .and_then(|_| commit(&json_tmp, &json))
        .and_then(|_| {
            commit(&csv_tmp, &csv).inspect_err(|_| {
                let _ = std::fs::remove_file(&json);
            })
        });

    if let Err(e) = result {
        let _ = std::fs::remove_file(&json_tmp);
        let _ = std::fs::remove_file(&csv_tmp);
        return Err(e);
    }

    info!("Wrote {} and {}", json.display(), csv.display());
    Ok(Written { json, csv })
}

fn commit(staged: &Path, path: &Path) -> Result<()> {
    std::fs::rename(staged, path)
        .with_context(|| format!("Failed to move {} into place", path.display()))
}

pub fn write_json(path: &Path, meta: &DocumentMeta, reps: &[Representative]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let doc = JsonDocument {
        meta,
        representatives: reps,
    };
    serde_json::to_writer_pretty(BufWriter::new(file), &doc)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Header schedule: base fields, every canonical label in table order, then any
/// raw codes the flattener could not label.
pub fn csv_header(records: &[FlatRecord], table: &CategoryTable) -> Vec<String> {
    let known: BTreeSet<&str> = table.labels().collect();
    let extra: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.fields.keys())
        .map(String::as_str)
        .filter(|k| !known.contains(k))
        .collect();

    let mut header: Vec<String> = BASE_FIELDS.iter().map(|f| f.to_string()).collect();
    header.extend(table.labels().map(str::to_string));
    header.extend(extra.into_iter().map(str::to_string));
    header
}

pub fn write_csv(path: &Path, records: &[FlatRecord], table: &CategoryTable) -> Result<()> {
    let header = csv_header(records, table);
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(&header)?;

    for r in records {
        let row = header.iter().map(|field| match field.as_str() {
            "rep_number" => r.rep_number.map(|n| n.to_string()).unwrap_or_default(),
            "first_name" => r.first_name.clone(),
            "last_name" => r.last_name.clone(),
            "party" => r.party.clone(),
            label => match r.fields.get(label) {
                Some(Interest::Text(t)) => t.clone(),
                Some(Interest::Flag(b)) => b.to_string(),
                None => String::new(),
            },
        });
        writer.write_record(row).context("writing record")?;
    }

    // Check for error rather than implicitly flushing and ignoring.
    writer.flush().context("flushing CSV")?;
    Ok(())
}
