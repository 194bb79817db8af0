use std::collections::HashMap;
use tracing::debug;

use crate::filter::FilterSelection;
use crate::models::{AggregatedKeyword, KeywordDataset, KeywordGroup, Record};

pub const TOP_KEYWORDS: usize = 15;
pub const OVERALL_GROUP: &str = "전체";
pub const OTHER_GROUP: &str = "기타";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingMode {
    /// Single synthetic group.
    Overall,
    /// One group per job value.
    ByJob,
}

impl GroupingMode {
    /// Overall only while both local dimensions are unset.
    pub fn for_selection(local: &FilterSelection) -> Self {
        if local.is_unfiltered() {
            GroupingMode::Overall
        } else {
            GroupingMode::ByJob
        }
    }

    pub fn group_key(self, r: &Record) -> &str {
        match self {
            GroupingMode::Overall => OVERALL_GROUP,
            GroupingMode::ByJob if r.job.is_empty() => OTHER_GROUP,
            GroupingMode::ByJob => &r.job,
        }
    }
}

/// Running (count, total score) per word, in first-seen order.
#[derive(Default)]
struct Tally {
    index: HashMap<String, usize>,
    words: Vec<(String, f64, usize)>,
}

impl Tally {
    fn add(&mut self, word: &str, score: f64) {
        let i = match self.index.get(word) {
            Some(&i) => i,
            None => {
                self.words.push((word.to_string(), 0.0, 0));
                self.index.insert(word.to_string(), self.words.len() - 1);
                self.words.len() - 1
            }
        };
        let entry = &mut self.words[i];
        entry.1 += score;
        entry.2 += 1;
    }

    fn finish(self) -> Vec<AggregatedKeyword> {
        let mut out: Vec<AggregatedKeyword> = self
            .words
            .into_iter()
            .map(|(word, total, count)| AggregatedKeyword {
                word,
                score: total / count as f64,
                count,
            })
            .collect();
        rank_keywords(&mut out);
        out.truncate(TOP_KEYWORDS);
        out
    }
}

/// Count descending, then mean score descending. Stable for full ties.
pub fn rank_keywords(keywords: &mut [AggregatedKeyword]) {
    keywords.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| b.score.total_cmp(&a.score))
    });
}

/// Groups `records` (already filtered) and ranks each group's keywords.
///
/// Groups appear in the order their first member appears. A group whose
/// members contributed nothing is still present with an empty list. An
/// empty record set or an absent/empty dataset yields no groups at all.
pub fn group_keywords(
    records: &[&Record],
    dataset: Option<&KeywordDataset>,
    mode: GroupingMode,
) -> Vec<KeywordGroup> {
    let dataset = match dataset {
        Some(d) if !d.is_empty() && !records.is_empty() => d,
        _ => return Vec::new(),
    };

    let mut order: Vec<String> = Vec::new();
    let mut tallies: HashMap<String, Tally> = HashMap::new();

    for r in records {
        let key = mode.group_key(r);
        let tally = tallies.entry(key.to_string()).or_insert_with(|| {
            order.push(key.to_string());
            Tally::default()
        });
        for k in dataset.scores_for(&r.id) {
            tally.add(&k.word, k.score);
        }
    }

    let groups: Vec<KeywordGroup> = order
        .into_iter()
        .filter_map(|name| {
            tallies.remove(&name).map(|t| KeywordGroup { keywords: t.finish(), name })
        })
        .collect();

    debug!(
        "Keyword grouping - records={}, mode={:?}, groups={}",
        records.len(),
        mode,
        groups.len()
    );
    groups
}

/// Every visible record whose keyword list contains `keyword`, in visible order.
pub fn records_for_keyword<'a>(
    keyword: &str,
    visible: &[&'a Record],
    dataset: &KeywordDataset,
) -> Vec<&'a Record> {
    visible
        .iter()
        .copied()
        .filter(|r| dataset.contains_word(&r.id, keyword))
        .collect()
}
