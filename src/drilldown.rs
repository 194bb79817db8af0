use serde::{Deserialize, Serialize};

use crate::aggregate::records_for_keyword;
use crate::models::{KeywordDataset, Record, Topic};

/// Substrings that mark a growth opinion as transfer-related.
pub const TRANSFER_TERMS: [&str; 2] = ["이동", "변경"];

/// One source opinion shown under a selected keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpinionCard {
    pub card_id: String, // "<uniqueId>_<index>"
    pub record_id: String,
    pub name: String,
    pub job: String,
    pub tenure_band: String,
    pub quarter: String,
    pub opinion: String,
}

/// Selecting the current value again clears it. Returns whether something is selected.
pub fn toggle(current: &mut Option<String>, value: &str) -> bool {
    if current.as_deref() == Some(value) {
        *current = None;
        false
    } else {
        *current = Some(value.to_string());
        true
    }
}

pub fn keyword_cards(
    keyword: &str,
    visible: &[&Record],
    dataset: &KeywordDataset,
    topic: Topic,
) -> Vec<OpinionCard> {
    records_for_keyword(keyword, visible, dataset)
        .into_iter()
        .enumerate()
        .map(|(i, r)| OpinionCard {
            card_id: format!("{}_{}", r.id, i),
            record_id: r.id.clone(),
            name: r.employee_name.clone(),
            job: r.job.clone(),
            tenure_band: r.tenure_band.clone(),
            quarter: r.quarter.clone(),
            opinion: r.opinion(topic).unwrap_or_default().to_string(),
        })
        .collect()
}

pub fn mentions_transfer(text: &str) -> bool {
    TRANSFER_TERMS.iter().any(|t| text.contains(t))
}

/// Every row of `employee` whose growth opinion mentions a transfer term.
/// Rescans the text locally; the remote verdict is not consulted.
pub fn employee_transfer_rows<'a>(records: &'a [Record], employee: &str) -> Vec<&'a Record> {
    records
        .iter()
        .filter(|r| r.employee_name == employee)
        .filter(|r| r.opinion(Topic::Growth).is_some_and(mentions_transfer))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::KeywordScore;
    use pretty_assertions::assert_eq;

    fn rec(id: &str, name: &str, quarter: &str, growth: &str) -> Record {
        let mut r = Record::new(id);
        r.employee_name = name.into();
        r.quarter = quarter.into();
        r.set_opinion(Topic::Growth, Some(growth.into()));
        r
    }

    #[test]
    fn selecting_twice_clears() {
        let mut sel = None;
        assert!(toggle(&mut sel, "성장"));
        assert_eq!(sel.as_deref(), Some("성장"));
        assert!(!toggle(&mut sel, "성장"));
        assert_eq!(sel, None);

        toggle(&mut sel, "성장");
        assert!(toggle(&mut sel, "보상"));
        assert_eq!(sel.as_deref(), Some("보상"));
    }

    #[test]
    fn cards_carry_quarter_and_topic_text() {
        let rows = vec![
            rec("row_0", "김철수", "1Q", "성장 기회가 필요"),
            rec("row_1", "이영희", "2Q", "교육 지원"),
            rec("row_2", "김철수", "2Q", "성장 경로 불명확"),
        ];
        let mut ds = KeywordDataset::new();
        ds.insert("row_0", vec![KeywordScore { word: "성장".into(), score: 0.9 }]);
        ds.insert("row_2", vec![KeywordScore { word: "성장".into(), score: 0.7 }]);
        let visible: Vec<&Record> = rows.iter().collect();

        let cards = keyword_cards("성장", &visible, &ds, Topic::Growth);
        let got: Vec<(&str, &str, &str)> = cards
            .iter()
            .map(|c| (c.card_id.as_str(), c.quarter.as_str(), c.opinion.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![("row_0_0", "1Q", "성장 기회가 필요"), ("row_2_1", "2Q", "성장 경로 불명확")]
        );
    }

    #[test]
    fn employee_rows_rescan_growth_text() {
        let rows = vec![
            rec("row_0", "김철수", "1Q", "타 부서로 이동 희망"),
            rec("row_1", "김철수", "2Q", "직무 변경을 고려 중"),
            rec("row_2", "김철수", "3Q", "현재 업무 만족"),
            rec("row_3", "이영희", "1Q", "부서 이동 희망"),
        ];
        let hits: Vec<&str> = employee_transfer_rows(&rows, "김철수").iter().map(|r| r.id.as_str()).collect();
        assert_eq!(hits, vec!["row_0", "row_1"]);
        assert!(employee_transfer_rows(&rows, "박민수").is_empty());
    }
}
