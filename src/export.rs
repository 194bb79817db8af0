// src/export.rs
use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use crate::api_types::{record_to_row, value_to_string, UNIQUE_ID_FIELD};
use crate::config::ColumnMap;
use crate::models::Record;
use crate::out_models::Dashboard;
use crate::session::{Panel, Session};

pub const FILTERED_CSV: &str = "filtered_interview_data.csv";
pub const HOPEFULS_CSV: &str = "transfer_hopefuls_data.csv";
pub const DASHBOARD_JSON: &str = "dashboard.json";

const UTF8_BOM: &[u8] = "\u{feff}".as_bytes();

/// Globally filtered records: original header order, then `uniqueId`.
pub fn write_filtered_csv(dir: &Path, headers: &[String], records: &[&Record], cols: &ColumnMap) -> Result<PathBuf> {
    let mut columns: Vec<&str> = headers.iter().map(String::as_str).collect();
    columns.push(UNIQUE_ID_FIELD);
    let path = dir.join(FILTERED_CSV);
    write_records_csv(&path, &columns, records, cols)?;
    Ok(path)
}

/// Hopefuls under the transfer panel filter, without `uniqueId`.
/// Nothing is written when there are none.
pub fn write_hopefuls_csv(dir: &Path, headers: &[String], hopefuls: &[Record], cols: &ColumnMap) -> Result<Option<PathBuf>> {
    if hopefuls.is_empty() {
        warn!("No transfer hopefuls to export - skipping {}", HOPEFULS_CSV);
        return Ok(None);
    }
    let columns: Vec<&str> = headers
        .iter()
        .map(String::as_str)
        .filter(|h| *h != UNIQUE_ID_FIELD)
        .collect();
    let refs: Vec<&Record> = hopefuls.iter().collect();
    let path = dir.join(HOPEFULS_CSV);
    write_records_csv(&path, &columns, &refs, cols)?;
    Ok(Some(path))
}

fn write_records_csv(path: &Path, columns: &[&str], records: &[&Record], cols: &ColumnMap) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
    }
    let mut file = fs::File::create(path).with_context(|| format!("create {:?}", path))?;
    file.write_all(UTF8_BOM).with_context(|| format!("write {:?}", path))?;

    let mut w = csv::Writer::from_writer(file);
    w.write_record(columns).with_context(|| format!("write header to {:?}", path))?;
    for r in records {
        let row = record_to_row(r, cols);
        let values = columns
            .iter()
            .map(|c| row.get(*c).map(value_to_string).unwrap_or_default());
        w.write_record(values).with_context(|| format!("write row {} to {:?}", r.id, path))?;
    }
    w.flush().with_context(|| format!("flush {:?}", path))?;

    info!("CSV exported - file={}, rows={}", path.display(), records.len());
    Ok(())
}

/// Writes all three export files for the current session into `dir`.
pub fn export_session(dir: &Path, session: &Session, cols: &ColumnMap) -> Result<Dashboard> {
    let start = std::time::Instant::now();
    let dashboard = Dashboard::derive(session);
    let headers = &session.store.headers;

    write_filtered_csv(dir, headers, &session.filtered(), cols)?;
    let hopefuls = dashboard
        .transfer
        .as_ref()
        .map(|t| t.summary.hopefuls.as_slice())
        .unwrap_or_default();
    write_hopefuls_csv(dir, headers, hopefuls, cols)?;
    write_json(dir.join(DASHBOARD_JSON), &dashboard)?;

    info!(
        "Export completed - dir={}, duration={:.2}s, records={}, transfer_panel_records={}",
        dir.display(),
        start.elapsed().as_secs_f32(),
        session.filtered().len(),
        session.panel_records(Panel::Transfer).len()
    );
    Ok(dashboard)
}

pub fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
    }
    let s = serde_json::to_string_pretty(value)?;
    fs::write(path, s).with_context(|| format!("write {:?}", path))?;
    Ok(())
}
