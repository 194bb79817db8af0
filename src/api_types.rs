use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::config::ColumnMap;
use crate::models::{KeywordScore, Record, Topic};

/// A record as the analysis service sees it: original headers plus `uniqueId`.
pub type ApiRow = Map<String, Value>;

pub const UNIQUE_ID_FIELD: &str = "uniqueId";

#[derive(Debug, Clone, Serialize)]
pub struct KeywordBatchRequest<'a> {
    pub data: &'a [ApiRow],
    pub column_name: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyword {
    pub word: String,
    #[serde(default)]
    pub score: f64,
}

/// `uniqueId` -> keywords
pub type KeywordBatchResponse = BTreeMap<String, Vec<ApiKeyword>>;

#[derive(Debug, Clone, Serialize)]
pub struct TransferIntentRequest<'a> {
    pub data: &'a [ApiRow],
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferIntentResponse {
    #[serde(default)]
    pub transfer_hopefuls: Vec<ApiRow>,
    #[serde(default)]
    pub others: Vec<ApiRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestionRequest<'a> {
    pub text: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionResponse {
    #[serde(default)]
    pub suggestion: String,
}

impl From<ApiKeyword> for KeywordScore {
    fn from(k: ApiKeyword) -> Self {
        KeywordScore { word: k.word, score: k.score }
    }
}

pub fn value_to_string(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

pub fn record_to_row(r: &Record, cols: &ColumnMap) -> ApiRow {
    let mut row = ApiRow::new();
    for (k, v) in &r.extra {
        row.insert(k.clone(), Value::String(v.clone()));
    }
    let dims = [
        (&cols.employee_name, &r.employee_name),
        (&cols.job, &r.job),
        (&cols.tenure_band, &r.tenure_band),
        (&cols.quarter, &r.quarter),
    ];
    for (header, value) in dims {
        if !value.is_empty() {
            row.insert(header.clone(), Value::String(value.clone()));
        }
    }
    for topic in Topic::ALL {
        if let Some(text) = r.opinion(topic) {
            row.insert(cols.opinion_column(topic).to_string(), Value::String(text.to_string()));
        }
    }
    row.insert(UNIQUE_ID_FIELD.into(), Value::String(r.id.clone()));
    row
}

/// Inverse of [`record_to_row`]; rows without `uniqueId` get `fallback_id`.
pub fn row_to_record(row: &ApiRow, cols: &ColumnMap, fallback_id: &str) -> Record {
    let get = |header: &str| row.get(header).map(value_to_string).unwrap_or_default();
    let id = row
        .get(UNIQUE_ID_FIELD)
        .map(value_to_string)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback_id.to_string());

    let mut r = Record::new(id);
    r.employee_name = get(&cols.employee_name);
    r.job = get(&cols.job);
    r.tenure_band = get(&cols.tenure_band);
    r.quarter = get(&cols.quarter);
    for topic in Topic::ALL {
        r.set_opinion(topic, row.get(cols.opinion_column(topic)).map(value_to_string));
    }
    for (k, v) in row {
        if k != UNIQUE_ID_FIELD && !cols.is_mapped(k) {
            r.extra.insert(k.clone(), value_to_string(v));
        }
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn row_keeps_original_headers_and_unique_id() {
        let cols = ColumnMap::default();
        let mut r = Record::new("row_3");
        r.employee_name = "김철수".into();
        r.job = "영업".into();
        r.set_opinion(Topic::Growth, Some("직무 변경을 원함".into()));
        r.extra.insert("(1) 업무-리더 의견".into(), "성실함".into());

        let row = record_to_row(&r, &cols);
        assert_eq!(row.get("uniqueId"), Some(&json!("row_3")));
        assert_eq!(row.get("이름"), Some(&json!("김철수")));
        assert_eq!(row.get("(2) 성장/역량/커리어-구성원 의견"), Some(&json!("직무 변경을 원함")));
        assert!(row.get("(1) 업무-구성원 의견").is_none());

        assert_eq!(row_to_record(&row, &cols, "unused"), r);
    }

    #[test]
    fn numeric_cells_and_missing_id_decode() {
        let cols = ColumnMap::default();
        let row: ApiRow = serde_json::from_value(json!({
            "이름": "박영희",
            "직무연차": 3,
            "분기": "2024Q1"
        }))
        .unwrap();

        let r = row_to_record(&row, &cols, "transfer_0");
        assert_eq!(r.id, "transfer_0");
        assert_eq!(r.tenure_band, "3");
        assert_eq!(r.quarter, "2024Q1");
        assert!(r.extra.is_empty());
    }
}
