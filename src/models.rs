use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// The three fixed interview question categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Work,
    Growth,
    Environment,
}

impl Topic {
    /// Pipeline order.
    pub const ALL: [Topic; 3] = [Topic::Work, Topic::Growth, Topic::Environment];

    pub fn key(self) -> &'static str {
        match self {
            Topic::Work => "work",
            Topic::Growth => "growth",
            Topic::Environment => "environment",
        }
    }

    /// 1-based stage number in the pipeline.
    pub fn ordinal(self) -> usize {
        match self {
            Topic::Work => 1,
            Topic::Growth => 2,
            Topic::Environment => 3,
        }
    }

    pub fn next(self) -> Option<Topic> {
        match self {
            Topic::Work => Some(Topic::Growth),
            Topic::Growth => Some(Topic::Environment),
            Topic::Environment => None,
        }
    }

    pub fn panel_title(self) -> &'static str {
        match self {
            Topic::Work => "업무 관련 키워드 분석",
            Topic::Growth => "성장/역량 관련 키워드 분석",
            Topic::Environment => "업무환경 관련 키워드 분석",
        }
    }

    pub fn loading_message(self) -> &'static str {
        match self {
            Topic::Work => "업무 관련 의견을 분석 중입니다...",
            Topic::Growth => "성장/역량 관련 의견을 분석 중입니다...",
            Topic::Environment => "업무환경 관련 의견을 분석 중입니다...",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "work" | "1" => Ok(Topic::Work),
            "growth" | "career" | "2" => Ok(Topic::Growth),
            "environment" | "env" | "3" => Ok(Topic::Environment),
            other => Err(format!("unknown topic '{}' (expected work|growth|environment)", other)),
        }
    }
}

/// One interview entry (one spreadsheet row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String, // "row_0", "row_1", ...
    pub employee_name: String,
    pub job: String,
    pub tenure_band: String,
    pub quarter: String,
    pub work_opinion: Option<String>,
    pub growth_opinion: Option<String>,
    pub environment_opinion: Option<String>,
    /// Unmapped spreadsheet columns, kept for export and the wire format.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Record {
            id: id.into(),
            employee_name: String::new(),
            job: String::new(),
            tenure_band: String::new(),
            quarter: String::new(),
            work_opinion: None,
            growth_opinion: None,
            environment_opinion: None,
            extra: BTreeMap::new(),
        }
    }

    /// Opinion text for a topic; empty strings read as absent.
    pub fn opinion(&self, topic: Topic) -> Option<&str> {
        let text = match topic {
            Topic::Work => self.work_opinion.as_deref(),
            Topic::Growth => self.growth_opinion.as_deref(),
            Topic::Environment => self.environment_opinion.as_deref(),
        };
        text.filter(|t| !t.is_empty())
    }

    pub fn set_opinion(&mut self, topic: Topic, text: Option<String>) {
        let slot = match topic {
            Topic::Work => &mut self.work_opinion,
            Topic::Growth => &mut self.growth_opinion,
            Topic::Environment => &mut self.environment_opinion,
        };
        *slot = text.filter(|t| !t.is_empty());
    }
}

/// Ingested rows plus the sheet's header order (for export).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordStore {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

impl RecordStore {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn ids(&self) -> HashSet<&str> {
        self.records.iter().map(|r| r.id.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordScore {
    pub word: String,
    pub score: f64,
}

/// Record id -> extracted keywords for one topic. Replaced wholesale on re-run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordDataset(BTreeMap<String, Vec<KeywordScore>>);

impl KeywordDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, scores: Vec<KeywordScore>) {
        self.0.insert(id.into(), scores);
    }

    /// Absent ids and analyzed-but-empty ids both read as no contribution.
    pub fn scores_for(&self, id: &str) -> &[KeywordScore] {
        self.0.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_word(&self, id: &str, word: &str) -> bool {
        self.scores_for(id).iter().any(|k| k.word == word)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<KeywordScore>)> {
        self.0.iter()
    }

    pub fn is_all_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }
}

impl FromIterator<(String, Vec<KeywordScore>)> for KeywordDataset {
    fn from_iter<I: IntoIterator<Item = (String, Vec<KeywordScore>)>>(iter: I) -> Self {
        KeywordDataset(iter.into_iter().collect())
    }
}

/// One optional dataset per topic; `None` means the pass never ran.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicDatasets {
    pub work: Option<KeywordDataset>,
    pub growth: Option<KeywordDataset>,
    pub environment: Option<KeywordDataset>,
}

impl TopicDatasets {
    pub fn get(&self, topic: Topic) -> Option<&KeywordDataset> {
        match topic {
            Topic::Work => self.work.as_ref(),
            Topic::Growth => self.growth.as_ref(),
            Topic::Environment => self.environment.as_ref(),
        }
    }

    pub fn set(&mut self, topic: Topic, dataset: Option<KeywordDataset>) {
        match topic {
            Topic::Work => self.work = dataset,
            Topic::Growth => self.growth = dataset,
            Topic::Environment => self.environment = dataset,
        }
    }

    pub fn all_absent(&self) -> bool {
        Topic::ALL.iter().all(|t| self.get(*t).is_none())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedKeyword {
    pub word: String,
    pub score: f64, // mean of contributing scores
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordGroup {
    pub name: String,
    pub keywords: Vec<AggregatedKeyword>,
}

/// Raw result of the transfer-intent pass, in service order (may repeat employees).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferResult {
    pub hopefuls: Vec<Record>,
}
