use anyhow::{anyhow, bail, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

use crate::config::ColumnMap;
use crate::models::{Record, RecordStore, Topic};

/// Reads the first sheet of a workbook; row 1 is the header row.
pub fn read_workbook(path: &Path, cols: &ColumnMap) -> Result<RecordStore> {
    let start = std::time::Instant::now();
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("opening workbook {}", path.display()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("workbook {} has no sheets", path.display()))?
        .with_context(|| format!("reading first sheet of {}", path.display()))?;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect::<Vec<String>>());
    let headers = rows.next().unwrap_or_default();

    let store = records_from_rows(headers, rows, cols)?;
    info!(
        "Workbook parsed - file={}, duration={:.2}s, rows={}, columns={}",
        path.display(),
        start.elapsed().as_secs_f32(),
        store.len(),
        store.headers.len()
    );
    Ok(store)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn normalize(s: &str) -> String {
    s.trim().nfc().collect()
}

/// Builds records in row order (`row_0`, `row_1`, ...), skipping blank rows.
/// Unmapped columns land in [`Record::extra`].
pub fn records_from_rows<I>(headers: Vec<String>, rows: I, cols: &ColumnMap) -> Result<RecordStore>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let headers: Vec<String> = headers.iter().map(|h| normalize(h)).collect();
    if headers.iter().all(String::is_empty) {
        bail!("sheet has no header row");
    }

    let missing: Vec<&str> = [&cols.employee_name, &cols.job, &cols.tenure_band, &cols.quarter]
        .into_iter()
        .filter(|h| !headers.contains(*h))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        warn!("Expected columns not found in sheet - missing={:?}", missing);
    }
    for topic in Topic::ALL {
        let col = cols.opinion_column(topic);
        if !headers.iter().any(|h| h == col) {
            warn!("Opinion column not found - topic={}, column={}", topic, col);
        }
    }

    let mut records = Vec::new();
    for cells in rows {
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let mut r = Record::new(format!("row_{}", records.len()));
        for (header, cell) in headers.iter().zip(cells.iter()) {
            let value = normalize(cell);
            if header.is_empty() || value.is_empty() {
                continue;
            }
            assign(&mut r, header, value, cols);
        }
        records.push(r);
    }

    if records.is_empty() {
        bail!("sheet contains a header row but no data rows");
    }
    debug!("Records built - count={}", records.len());

    Ok(RecordStore {
        headers: headers.into_iter().filter(|h| !h.is_empty()).collect(),
        records,
    })
}

fn assign(r: &mut Record, header: &str, value: String, cols: &ColumnMap) {
    if header == cols.employee_name {
        r.employee_name = value;
    } else if header == cols.job {
        r.job = value;
    } else if header == cols.tenure_band {
        r.tenure_band = value;
    } else if header == cols.quarter {
        r.quarter = value;
    } else if let Some(topic) = Topic::ALL.into_iter().find(|t| cols.opinion_column(*t) == header) {
        r.set_opinion(topic, Some(value));
    } else {
        r.extra.insert(header.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    fn headers() -> Vec<String> {
        strings(&[
            "이름",
            "직무",
            "직무연차",
            "분기",
            "(1) 업무-구성원 의견",
            "(2) 성장/역량/커리어-구성원 의견",
            "(1) 업무-리더 의견",
        ])
    }

    #[test]
    fn assigns_ids_in_row_order_and_skips_blank_rows() {
        let rows = vec![
            strings(&["김철수", "영업", "1-3년", "1Q", "업무량이 많음", "", "성실함"]),
            strings(&["", "", "", "", "", "", ""]),
            strings(&["이영희", "생산", "4-7년", "1Q", "", "부서 이동 희망"]),
        ];
        let store = records_from_rows(headers(), rows, &ColumnMap::default()).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.records[0].id, "row_0");
        assert_eq!(store.records[1].id, "row_1");
        assert_eq!(store.records[1].employee_name, "이영희");
        assert_eq!(store.records[0].opinion(Topic::Work), Some("업무량이 많음"));
        assert_eq!(store.records[0].opinion(Topic::Growth), None);
        assert_eq!(store.records[1].opinion(Topic::Growth), Some("부서 이동 희망"));
        assert_eq!(store.records[0].extra.get("(1) 업무-리더 의견").map(String::as_str), Some("성실함"));
        assert_eq!(store.headers, headers());
    }

    #[test]
    fn values_are_trimmed_and_nfc_normalized() {
        // "영업" in decomposed jamo form
        let decomposed: String = "영업".nfd().collect();
        let rows = vec![vec!["  김철수 ".to_string(), decomposed]];
        let store = records_from_rows(strings(&["이름", "직무"]), rows, &ColumnMap::default()).unwrap();
        assert_eq!(store.records[0].employee_name, "김철수");
        assert_eq!(store.records[0].job, "영업");
    }

    #[test]
    fn header_only_sheet_is_rejected() {
        let rows: Vec<Vec<String>> = Vec::new();
        assert!(records_from_rows(headers(), rows, &ColumnMap::default()).is_err());
        assert!(records_from_rows(Vec::new(), vec![strings(&["x"])], &ColumnMap::default()).is_err());
    }

    #[test]
    fn integral_floats_render_without_fraction() {
        assert_eq!(cell_to_string(&Data::Float(2024.0)), "2024");
        assert_eq!(cell_to_string(&Data::Float(3.5)), "3.5");
        assert_eq!(cell_to_string(&Data::Empty), "");
    }
}
