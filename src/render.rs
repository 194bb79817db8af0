// src/render.rs
use crate::models::{KeywordGroup, Topic};
use crate::out_models::{Dashboard, KeywordPanelView, TransferPanelView};

/// Progress line shown while the pipeline runs.
pub fn render_progress(progress: u8, message: &str) -> String {
    let filled = (progress as usize).min(100) / 5;
    format!("[{}{}] {:>3}% {}", "#".repeat(filled), ".".repeat(20 - filled), progress, message)
}

pub fn render_dashboard_markdown(d: &Dashboard) -> String {
    let mut md = String::new();
    md.push_str("# 인터뷰 분석 대시보드\n\n");

    if !d.global_filter.is_unfiltered() {
        md.push_str(&format!(
            "_필터: 직무={}, 직무연차={}_\n\n",
            d.global_filter.job, d.global_filter.tenure_band
        ));
    }

    md.push_str("| 총 인터뷰 인원 | 직무 수 | 인사이동 희망자 |\n");
    md.push_str("|---|---|---|\n");
    md.push_str(&format!(
        "| {}명 | {}개 | {}명 |\n\n",
        d.stats.employees, d.stats.jobs, d.stats.transfer_hopefuls
    ));

    if let Some(t) = &d.transfer {
        render_transfer(&mut md, t);
    }

    for p in &d.keyword_panels {
        render_keyword_panel(&mut md, p);
    }

    md
}

fn render_transfer(md: &mut String, t: &TransferPanelView) {
    md.push_str("## 인사이동 희망 분석\n");
    md.push_str(&format!(
        "희망 {}명 / 전체 {}명 ({}%)\n\n",
        t.summary.hopeful_count, t.summary.total, t.summary.percentage
    ));

    if !t.summary.by_job.is_empty() {
        md.push_str("| 직무 | 희망자 | 전체 | 비율 |\n|---|---|---|---|\n");
        for j in &t.summary.by_job {
            md.push_str(&format!("| {} | {} | {} | {}% |\n", j.job, j.hopefuls, j.total, j.percentage));
        }
        md.push('\n');
    }

    if !t.summary.hopefuls.is_empty() {
        md.push_str("희망자:\n");
        for r in &t.summary.hopefuls {
            md.push_str(&format!("- {} ({}, {})\n", r.employee_name, r.job, r.tenure_band));
        }
        md.push('\n');
    }

    if let Some(name) = &t.selected_employee {
        md.push_str(&format!("### {} 님의 이동 관련 의견\n", name));
        if t.employee_rows.is_empty() {
            md.push_str("- (해당 의견 없음)\n");
        }
        for r in &t.employee_rows {
            md.push_str(&format!(
                "- **{}** {}\n",
                r.quarter,
                r.opinion(Topic::Growth).unwrap_or_default()
            ));
        }
        md.push('\n');
    }
}

fn render_keyword_panel(md: &mut String, p: &KeywordPanelView) {
    md.push_str(&format!("## {}\n", p.title));
    if !p.filter.is_unfiltered() {
        md.push_str(&format!("_직무={}, 직무연차={}_\n", p.filter.job, p.filter.tenure_band));
    }

    if p.groups.is_empty() {
        md.push_str("분석할 키워드가 없습니다.\n\n");
        return;
    }

    if let Some(chart) = &p.chart {
        md.push_str("\nTop 5:\n");
        for (i, k) in chart.iter().enumerate() {
            md.push_str(&format!("{}. {} ({}회)\n", i + 1, k.word, k.count));
        }
    }

    for g in &p.groups {
        render_group(md, g);
    }

    if let Some(kw) = &p.selected_keyword {
        md.push_str(&format!("\n### '{}' 관련 의견\n", kw));
        for (i, c) in p.cards.iter().enumerate() {
            md.push_str(&format!(
                "{}. {} · {} · {} · {}\n   > {}\n",
                i + 1,
                c.name,
                c.job,
                c.tenure_band,
                c.quarter,
                c.opinion
            ));
        }
    }
    md.push('\n');
}

fn render_group(md: &mut String, g: &KeywordGroup) {
    md.push_str(&format!("\n**{}**\n", g.name));
    if g.keywords.is_empty() {
        md.push_str("- (키워드 없음)\n");
        return;
    }
    let line = g
        .keywords
        .iter()
        .map(|k| format!("{}({}, {:.2})", k.word, k.count, k.score))
        .collect::<Vec<_>>()
        .join(", ");
    md.push_str(&format!("- {}\n", line));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_bar_fills_in_twentieths() {
        assert_eq!(render_progress(0, "대기"), "[....................]   0% 대기");
        assert_eq!(render_progress(35, "x"), "[#######.............]  35% x");
        assert_eq!(render_progress(100, ""), "[####################] 100% ");
    }
}
