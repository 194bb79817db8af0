use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Record;

pub const ALL: &str = "all";

/// One dimension of a filter: everything, or exactly one value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Choice {
    #[default]
    All,
    Only(String),
}

impl Choice {
    pub fn is_all(&self) -> bool {
        matches!(self, Choice::All)
    }

    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Choice::All => true,
            Choice::Only(v) => v == value,
        }
    }
}

impl From<String> for Choice {
    fn from(s: String) -> Self {
        if s == ALL {
            Choice::All
        } else {
            Choice::Only(s)
        }
    }
}

impl From<&str> for Choice {
    fn from(s: &str) -> Self {
        Choice::from(s.to_string())
    }
}

impl From<Choice> for String {
    fn from(c: Choice) -> Self {
        match c {
            Choice::All => ALL.to_string(),
            Choice::Only(v) => v,
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choice::All => f.write_str(ALL),
            Choice::Only(v) => f.write_str(v),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub job: Choice,
    pub tenure_band: Choice,
}

impl FilterSelection {
    pub fn new(job: impl Into<Choice>, tenure_band: impl Into<Choice>) -> Self {
        FilterSelection { job: job.into(), tenure_band: tenure_band.into() }
    }

    pub fn matches(&self, r: &Record) -> bool {
        self.job.accepts(&r.job) && self.tenure_band.accepts(&r.tenure_band)
    }

    pub fn is_unfiltered(&self) -> bool {
        self.job.is_all() && self.tenure_band.is_all()
    }
}

pub fn filter_records<'a, I>(records: I, selection: &FilterSelection) -> Vec<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    records.into_iter().filter(|r| selection.matches(r)).collect()
}

/// `all` followed by the distinct non-empty values in first-seen order.
pub fn dimension_options<'a, I, F>(records: I, dimension: F) -> Vec<Choice>
where
    I: IntoIterator<Item = &'a Record>,
    F: Fn(&'a Record) -> &'a str,
{
    std::iter::once(Choice::All)
        .chain(
            records
                .into_iter()
                .map(dimension)
                .filter(|v| !v.is_empty())
                .unique()
                .map(|v| Choice::Only(v.to_string())),
        )
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub jobs: Vec<Choice>,
    pub tenure_bands: Vec<Choice>,
}

impl FilterOptions {
    pub fn from_records(records: &[&Record]) -> Self {
        FilterOptions {
            jobs: dimension_options(records.iter().copied(), |r| r.job.as_str()),
            tenure_bands: dimension_options(records.iter().copied(), |r| r.tenure_band.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rec(id: &str, job: &str, tenure: &str) -> Record {
        let mut r = Record::new(id);
        r.job = job.into();
        r.tenure_band = tenure.into();
        r
    }

    #[test]
    fn selection_is_conjunctive() {
        let rows = vec![
            rec("row_0", "영업", "1-3년"),
            rec("row_1", "영업", "4-7년"),
            rec("row_2", "생산", "1-3년"),
        ];
        let sel = FilterSelection::new("영업", "1-3년");
        let ids: Vec<_> = filter_records(&rows, &sel).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["row_0"]);

        let everything = filter_records(&rows, &FilterSelection::default());
        assert_eq!(everything.len(), 3);

        let none = filter_records(&rows, &FilterSelection::new("연구", ALL));
        assert!(none.is_empty());
    }

    #[test]
    fn options_dedupe_skip_empty_and_lead_with_all() {
        let rows = vec![
            rec("row_0", "생산", ""),
            rec("row_1", "", "1-3년"),
            rec("row_2", "영업", "1-3년"),
            rec("row_3", "생산", "4-7년"),
        ];
        let refs: Vec<&Record> = rows.iter().collect();
        let opts = FilterOptions::from_records(&refs);
        assert_eq!(
            opts.jobs,
            vec![Choice::All, Choice::from("생산"), Choice::from("영업")]
        );
        assert_eq!(
            opts.tenure_bands,
            vec![Choice::All, Choice::from("1-3년"), Choice::from("4-7년")]
        );
    }

    #[test]
    fn choice_serializes_as_plain_string() {
        let sel = FilterSelection::new(ALL, "4-7년");
        let json = serde_json::to_string(&sel).unwrap();
        assert_eq!(json, r#"{"job":"all","tenure_band":"4-7년"}"#);
        let back: FilterSelection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sel);
    }
}
