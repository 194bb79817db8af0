use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::aggregate::OTHER_GROUP;
use crate::models::{Record, TransferResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobBreakdown {
    pub job: String,
    pub total: usize,
    pub hopefuls: usize,
    pub percentage: u32,
}

/// Transfer-intent figures for one filtered view. Counts are per distinct employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferSummary {
    /// Deduplicated hopefuls that appear in the filtered view.
    pub hopefuls: Vec<Record>,
    pub total: usize,
    pub hopeful_count: usize,
    pub percentage: u32,
    pub by_job: Vec<JobBreakdown>,
}

/// `round(part / whole * 100)`, 0 when `whole` is 0.
pub fn hope_percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}

/// First row per employee name wins; unnamed rows are dropped.
pub fn dedup_hopefuls(raw: &TransferResult) -> Vec<&Record> {
    let mut seen = HashSet::new();
    raw.hopefuls
        .iter()
        .filter(|&r| !r.employee_name.is_empty() && seen.insert(r.employee_name.as_str()))
        .collect()
}

pub fn distinct_employees<'a>(records: &[&'a Record]) -> HashSet<&'a str> {
    records
        .iter()
        .map(|&r| r.employee_name.as_str())
        .filter(|n| !n.is_empty())
        .collect()
}

pub fn summarize(raw: &TransferResult, filtered: &[&Record]) -> TransferSummary {
    let deduped = dedup_hopefuls(raw);
    let hopeful_names: HashSet<&str> = deduped.iter().map(|&r| r.employee_name.as_str()).collect();
    let in_view = distinct_employees(filtered);

    let hopefuls: Vec<Record> = deduped
        .into_iter()
        .filter(|r| in_view.contains(r.employee_name.as_str()))
        .cloned()
        .collect();

    let total = in_view.len();
    let hopeful_count = in_view.iter().filter(|n| hopeful_names.contains(*n)).count();

    TransferSummary {
        percentage: hope_percentage(hopeful_count, total),
        by_job: job_breakdown(filtered, &hopeful_names),
        hopefuls,
        total,
        hopeful_count,
    }
}

fn job_breakdown(filtered: &[&Record], hopeful_names: &HashSet<&str>) -> Vec<JobBreakdown> {
    let mut order: Vec<&str> = Vec::new();
    let mut members: HashMap<&str, HashSet<&str>> = HashMap::new();

    for r in filtered {
        if r.employee_name.is_empty() {
            continue;
        }
        let job = if r.job.is_empty() { OTHER_GROUP } else { r.job.as_str() };
        members
            .entry(job)
            .or_insert_with(|| {
                order.push(job);
                HashSet::new()
            })
            .insert(r.employee_name.as_str());
    }

    let mut out: Vec<JobBreakdown> = order
        .into_iter()
        .map(|job| {
            let names = &members[job];
            let hopefuls = names.iter().filter(|n| hopeful_names.contains(*n)).count();
            JobBreakdown {
                job: job.to_string(),
                total: names.len(),
                hopefuls,
                percentage: hope_percentage(hopefuls, names.len()),
            }
        })
        .collect();
    out.sort_by(|a, b| b.hopefuls.cmp(&a.hopefuls));
    out
}
