use serde::Serialize;
use std::collections::HashSet;

use crate::aggregate::{group_keywords, GroupingMode};
use crate::drilldown::{employee_transfer_rows, keyword_cards, OpinionCard};
use crate::filter::{FilterOptions, FilterSelection};
use crate::models::{AggregatedKeyword, KeywordGroup, Record, Topic};
use crate::session::{Panel, Phase, Session};
use crate::transfer::{distinct_employees, summarize, TransferSummary};

/// Chart slice shown when a panel has a single group.
pub const CHART_TOP: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatCards {
    pub employees: usize,
    pub jobs: usize,
    pub transfer_hopefuls: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferPanelView {
    pub filter: FilterSelection,
    pub options: FilterOptions,
    pub summary: TransferSummary,
    pub selected_employee: Option<String>,
    pub employee_rows: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordPanelView {
    pub topic: Topic,
    pub title: String,
    pub filter: FilterSelection,
    pub options: FilterOptions,
    pub groups: Vec<KeywordGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<Vec<AggregatedKeyword>>,
    pub selected_keyword: Option<String>,
    pub cards: Vec<OpinionCard>,
}

/* Everything a reader of the dashboard sees, derived from one Session */
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub phase: Phase,
    pub global_filter: FilterSelection,
    pub global_options: FilterOptions,
    pub stats: StatCards,
    pub transfer: Option<TransferPanelView>,
    pub keyword_panels: Vec<KeywordPanelView>,
}

impl Dashboard {
    pub fn derive(session: &Session) -> Self {
        let all: Vec<&Record> = session.records().iter().collect();
        let filtered = session.filtered();

        let stats = StatCards {
            employees: distinct_employees(&filtered).len(),
            jobs: filtered
                .iter()
                .map(|r| r.job.as_str())
                .filter(|j| !j.is_empty())
                .collect::<HashSet<_>>()
                .len(),
            transfer_hopefuls: session
                .transfer
                .as_ref()
                .map(|t| t.hopefuls.iter().collect::<Vec<_>>())
                .map(|h| distinct_employees(&h).len())
                .unwrap_or(0),
        };

        let transfer = session.transfer.as_ref().map(|raw| {
            let state = &session.panels.transfer;
            let visible = session.panel_records(Panel::Transfer);
            let employee_rows: Vec<Record> = state
                .selected_employee
                .as_deref()
                .map(|name| employee_transfer_rows(session.records(), name).into_iter().cloned().collect())
                .unwrap_or_default();
            TransferPanelView {
                filter: state.local.clone(),
                options: FilterOptions::from_records(&filtered),
                summary: summarize(raw, &visible),
                selected_employee: state.selected_employee.clone(),
                employee_rows,
            }
        });

        let keyword_panels = Topic::ALL
            .into_iter()
            .filter_map(|topic| keyword_panel(session, topic, &filtered))
            .collect();

        Dashboard {
            phase: session.phase,
            global_filter: session.global.clone(),
            global_options: FilterOptions::from_records(&all),
            stats,
            transfer,
            keyword_panels,
        }
    }

    pub fn panel(&self, topic: Topic) -> Option<&KeywordPanelView> {
        self.keyword_panels.iter().find(|p| p.topic == topic)
    }
}

fn keyword_panel(session: &Session, topic: Topic, filtered: &[&Record]) -> Option<KeywordPanelView> {
    let dataset = session.datasets.get(topic)?;
    let state = session.panels.keywords(topic);
    let visible = session.panel_records(Panel::Keywords(topic));

    let groups = group_keywords(&visible, Some(dataset), GroupingMode::for_selection(&state.local));
    let chart = match groups.as_slice() {
        [only] => Some(only.keywords.iter().take(CHART_TOP).cloned().collect()),
        _ => None,
    };
    let cards = state
        .selected_keyword
        .as_deref()
        .map(|kw| keyword_cards(kw, &visible, dataset, topic))
        .unwrap_or_default();

    Some(KeywordPanelView {
        topic,
        title: topic.panel_title().to_string(),
        filter: state.local.clone(),
        options: FilterOptions::from_records(filtered),
        groups,
        chart,
        selected_keyword: state.selected_keyword.clone(),
        cards,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{KeywordDataset, KeywordScore, RecordStore, TransferResult};
    use crate::session::Action;
    use pretty_assertions::assert_eq;

    fn rec(id: &str, name: &str, job: &str, growth: &str) -> Record {
        let mut r = Record::new(id);
        r.employee_name = name.into();
        r.job = job.into();
        r.tenure_band = "1-3년".into();
        r.quarter = "1Q".into();
        r.set_opinion(Topic::Growth, Some(growth.into()));
        r
    }

    fn kw(word: &str, score: f64) -> KeywordScore {
        KeywordScore { word: word.into(), score }
    }

    fn ready(with_growth: bool) -> Session {
        let records = vec![
            rec("row_0", "김철수", "영업", "타 부서로 이동 희망"),
            rec("row_1", "이영희", "생산", "교육 지원이 더 필요"),
            rec("row_2", "김철수", "영업", "성장 기회 부족"),
            rec("row_3", "박민수", "", "직무 변경 고려 중"),
        ];
        let hopefuls = vec![records[0].clone(), records[2].clone(), records[3].clone()];
        let mut s = Session::new(with_growth);
        s.apply(Action::BeginIngestion).unwrap();
        s.apply(Action::FileParsed(RecordStore { headers: vec!["이름".into()], records })).unwrap();
        if with_growth {
            for t in Topic::ALL {
                s.apply(Action::StageStarted(t)).unwrap();
                let mut ds = KeywordDataset::new();
                if t == Topic::Growth {
                    ds.insert("row_0", vec![kw("이동", 0.9), kw("부서", 0.4)]);
                    ds.insert("row_1", vec![kw("교육", 0.8)]);
                    ds.insert("row_2", vec![kw("성장", 0.7), kw("이동", 0.5)]);
                }
                s.apply(Action::StageCompleted(t, ds)).unwrap();
            }
        }
        s.apply(Action::TransferStarted).unwrap();
        s.apply(Action::TransferCompleted(TransferResult { hopefuls })).unwrap();
        s.apply(Action::Finalized).unwrap();
        s
    }

    #[test]
    fn stat_cards_count_distinct_people_and_jobs() {
        let d = Dashboard::derive(&ready(true));
        assert_eq!(d.stats, StatCards { employees: 3, jobs: 2, transfer_hopefuls: 2 });
    }

    #[test]
    fn unfiltered_panel_has_one_group_and_a_chart() {
        let d = Dashboard::derive(&ready(true));
        let growth = d.panel(Topic::Growth).unwrap();
        assert_eq!(growth.groups.len(), 1);
        assert_eq!(growth.groups[0].name, "전체");
        let chart: Vec<&str> = growth.chart.as_ref().unwrap().iter().map(|k| k.word.as_str()).collect();
        assert_eq!(chart[0], "이동");
        assert_eq!(chart.len(), 4);
    }

    #[test]
    fn job_filter_switches_to_per_job_groups_without_chart() {
        let mut s = ready(true);
        s.apply(Action::SetPanelFilter(
            Panel::Keywords(Topic::Growth),
            FilterSelection::new("all", "1-3년"),
        ))
        .unwrap();
        let d = Dashboard::derive(&s);
        let growth = d.panel(Topic::Growth).unwrap();
        let names: Vec<&str> = growth.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["영업", "생산", "기타"]);
        assert_eq!(growth.chart, None);
    }

    #[test]
    fn selections_expand_into_cards_and_rows() {
        let mut s = ready(true);
        s.apply(Action::SelectKeyword(Topic::Growth, "이동".into())).unwrap();
        s.apply(Action::SelectEmployee("김철수".into())).unwrap();
        let d = Dashboard::derive(&s);

        let ids: Vec<&str> = d.panel(Topic::Growth).unwrap().cards.iter().map(|c| c.card_id.as_str()).collect();
        assert_eq!(ids, vec!["row_0_0", "row_2_1"]);

        let t = d.transfer.unwrap();
        let rows: Vec<&str> = t.employee_rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(rows, vec!["row_0"]);
        assert_eq!(t.summary.hopeful_count, 2);
        assert_eq!(t.summary.total, 3);
    }

    #[test]
    fn no_keyword_panels_when_analysis_disabled() {
        let d = Dashboard::derive(&ready(false));
        assert!(d.keyword_panels.is_empty());
        assert!(d.transfer.is_some());
    }
}
