use std::path::Path;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::api_types::{record_to_row, row_to_record, ApiRow, UNIQUE_ID_FIELD};
use crate::config::ColumnMap;
use crate::ingest::read_workbook;
use crate::models::{KeywordDataset, KeywordScore, Record, RecordStore, Topic, TransferResult};
use crate::remote::{AnalysisBackend, RemoteError};
use crate::session::{Action, Session, SessionError};

/// Opinions shorter than this (after trimming) are not sent for extraction.
pub const MIN_OPINION_CHARS: usize = 5;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("파일 처리 중 오류가 발생했습니다: {0}")]
    Parse(String),
    #[error("인사이동 분석 API 실패: {0}")]
    Transfer(#[source] RemoteError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

pub fn is_eligible(text: Option<&str>) -> bool {
    text.is_some_and(|t| t.trim().chars().count() >= MIN_OPINION_CHARS)
}

pub fn eligible_records(records: &[Record], topic: Topic) -> Vec<&Record> {
    records.iter().filter(|r| is_eligible(r.opinion(topic))).collect()
}

/// Reads `path`, then runs the analysis pipeline. Any failure leaves the
/// session in `Failed` with all data cleared.
pub async fn ingest_file<B, F>(
    session: &mut Session,
    backend: &B,
    cols: &ColumnMap,
    path: &Path,
    mut observe: F,
) -> Result<(), PipelineError>
where
    B: AnalysisBackend + ?Sized,
    F: FnMut(&Session),
{
    session.apply(Action::BeginIngestion)?;
    observe(session);

    let store = match read_workbook(path, cols) {
        Ok(store) => store,
        Err(e) => {
            let msg = format!("{:#}", e);
            error!("Spreadsheet ingestion failed - file={}, error={}", path.display(), msg);
            session.apply(Action::Failed(msg.clone()))?;
            observe(session);
            return Err(PipelineError::Parse(msg));
        }
    };
    session.apply(Action::FileRead)?;
    observe(session);

    run_pipeline(session, backend, cols, store, observe).await
}

/// Runs the fixed stage sequence over all of `store`'s records, strictly one
/// stage at a time. Keyword stage failures degrade to empty lists; a transfer
/// failure is fatal.
pub async fn run_pipeline<B, F>(
    session: &mut Session,
    backend: &B,
    cols: &ColumnMap,
    store: RecordStore,
    mut observe: F,
) -> Result<(), PipelineError>
where
    B: AnalysisBackend + ?Sized,
    F: FnMut(&Session),
{
    let pipeline_start = std::time::Instant::now();
    info!(
        "Pipeline started - records={}, keyword_analysis={}",
        store.len(),
        session.analysis_enabled
    );

    let rows: Vec<ApiRow> = store.records.iter().map(|r| record_to_row(r, cols)).collect();
    session.apply(Action::FileParsed(store))?;
    observe(session);

    // 1) keyword passes, in topic order
    if session.analysis_enabled {
        for topic in Topic::ALL {
            session.apply(Action::StageStarted(topic))?;
            observe(session);

            let dataset = run_keyword_stage(backend, &session.store, topic, cols).await;
            session.apply(Action::StageCompleted(topic, dataset))?;
            observe(session);
        }
    } else {
        info!("Keyword analysis disabled - skipping 3 keyword stages");
    }

    // 2) transfer intent
    session.apply(Action::TransferStarted)?;
    observe(session);

    let transfer_start = std::time::Instant::now();
    let result = match backend.analyze_transfer_intent(&rows).await {
        Ok(resp) => resolve_hopefuls(&session.store, &resp.transfer_hopefuls, cols),
        Err(e) => {
            error!("Transfer-intent stage failed, aborting ingestion - error={}", e);
            session.apply(Action::Failed(e.to_string()))?;
            observe(session);
            return Err(PipelineError::Transfer(e));
        }
    };
    info!(
        "Transfer stage completed - duration={:.2}s, hopeful_rows={}",
        transfer_start.elapsed().as_secs_f32(),
        result.hopefuls.len()
    );
    session.apply(Action::TransferCompleted(result))?;
    observe(session);

    // 3) local finalization
    session.apply(Action::Finalized)?;
    observe(session);

    info!(
        "Pipeline completed successfully - total_duration={:.2}s, records={}",
        pipeline_start.elapsed().as_secs_f32(),
        session.records().len()
    );
    Ok(())
}

async fn run_keyword_stage<B>(
    backend: &B,
    store: &RecordStore,
    topic: Topic,
    cols: &ColumnMap,
) -> KeywordDataset
where
    B: AnalysisBackend + ?Sized,
{
    let stage_start = std::time::Instant::now();
    let eligible = eligible_records(&store.records, topic);
    if eligible.is_empty() {
        info!("Keyword stage skipped - topic={}, eligible=0", topic);
        return KeywordDataset::new();
    }

    let column = cols.opinion_column(topic);
    let rows: Vec<ApiRow> = eligible.iter().map(|r| record_to_row(r, cols)).collect();
    debug!(
        "Keyword stage starting - topic={}, column={}, eligible={}/{}",
        topic,
        column,
        eligible.len(),
        store.len()
    );

    let dataset = match backend.extract_keywords(&rows, column).await {
        Ok(resp) => {
            let known = store.ids();
            let mut dropped = 0usize;
            let dataset: KeywordDataset = resp
                .into_iter()
                .filter(|(id, _)| {
                    let keep = known.contains(id.as_str());
                    if !keep {
                        dropped += 1;
                    }
                    keep
                })
                .map(|(id, kws)| (id, kws.into_iter().map(KeywordScore::from).collect::<Vec<_>>()))
                .collect();
            if dropped > 0 {
                warn!("Keyword response contained unknown ids - topic={}, dropped={}", topic, dropped);
            }
            dataset
        }
        Err(e) => {
            warn!(
                "Keyword stage degraded to empty results - topic={}, eligible={}, error={}",
                topic,
                eligible.len(),
                e
            );
            eligible.iter().map(|r| (r.id.clone(), Vec::new())).collect()
        }
    };

    if dataset.is_all_empty() {
        debug!("Keyword stage produced no keywords - topic={}", topic);
    }
    info!(
        "Keyword stage completed - topic={}, stage={}/3, duration={:.2}s, records={}, records_with_keywords={}",
        topic,
        topic.ordinal(),
        stage_start.elapsed().as_secs_f32(),
        dataset.len(),
        dataset.iter().filter(|(_, v)| !v.is_empty()).count()
    );
    dataset
}

/// Maps service rows back to ingested records by `uniqueId`; unknown rows are decoded as-is.
fn resolve_hopefuls(store: &RecordStore, rows: &[ApiRow], cols: &ColumnMap) -> TransferResult {
    let hopefuls = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let known = row
                .get(UNIQUE_ID_FIELD)
                .and_then(|v| v.as_str())
                .and_then(|id| store.get(id));
            match known {
                Some(r) => r.clone(),
                None => row_to_record(row, cols, &format!("transfer_{}", i)),
            }
        })
        .collect();
    TransferResult { hopefuls }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_types::{ApiKeyword, KeywordBatchResponse, TransferIntentResponse};
    use crate::session::Phase;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    /// Scripted backend: answers every eligible row with one keyword per stage,
    /// flags rows whose growth text mentions a transfer, and fails on demand.
    #[derive(Default)]
    struct ScriptedBackend {
        fail_columns: Vec<String>,
        fail_transfer: bool,
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl ScriptedBackend {
        fn calls(&self) -> Vec<(String, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn row_id(row: &ApiRow) -> String {
        row[UNIQUE_ID_FIELD].as_str().unwrap().to_string()
    }

    #[async_trait]
    impl AnalysisBackend for ScriptedBackend {
        async fn extract_keywords(
            &self,
            rows: &[ApiRow],
            column_name: &str,
        ) -> Result<KeywordBatchResponse, RemoteError> {
            self.calls
                .lock()
                .unwrap()
                .push((column_name.to_string(), rows.iter().map(row_id).collect()));
            if self.fail_columns.iter().any(|c| c == column_name) {
                return Err(RemoteError::Status { endpoint: "/extract-keywords-llm-batch", status: 500 });
            }
            Ok(rows
                .iter()
                .map(|r| {
                    let kw = ApiKeyword { word: format!("kw:{}", column_name), score: 0.8 };
                    (row_id(r), vec![kw])
                })
                .collect())
        }

        async fn analyze_transfer_intent(
            &self,
            rows: &[ApiRow],
        ) -> Result<TransferIntentResponse, RemoteError> {
            self.calls.lock().unwrap().push(("transfer".into(), rows.iter().map(row_id).collect()));
            if self.fail_transfer {
                return Err(RemoteError::Status { endpoint: "/analyze-transfer-intent", status: 500 });
            }
            let growth = ColumnMap::default().growth_opinion;
            let hopefuls = rows
                .iter()
                .filter(|r| r.get(&growth).and_then(|v| v.as_str()).is_some_and(|t| t.contains("이동")))
                .cloned()
                .collect();
            Ok(TransferIntentResponse { transfer_hopefuls: hopefuls, others: Vec::new() })
        }

        async fn generate_suggestion(&self, _text: &str) -> Result<String, RemoteError> {
            Ok("TF 참여를 권장합니다.".into())
        }
    }

    fn record(i: usize, name: &str, work: &str, growth: &str, env: &str) -> Record {
        let mut r = Record::new(format!("row_{i}"));
        r.employee_name = name.into();
        r.job = "영업".into();
        r.quarter = format!("{}Q", i + 1);
        r.set_opinion(Topic::Work, Some(work.into()));
        r.set_opinion(Topic::Growth, Some(growth.into()));
        r.set_opinion(Topic::Environment, Some(env.into()));
        r
    }

    fn store() -> RecordStore {
        RecordStore {
            headers: Vec::new(),
            records: vec![
                record(0, "김철수", "업무량이 너무 많습니다", "타 부서로 이동 희망합니다", "사무 환경 개선 필요"),
                record(1, "김철수", "업무 분장이 명확함", "여전히 부서 이동 희망", "그럭저럭"),
                record(2, "이영희", "협업이 원활합니다", "교육 기회 확대 희망", "휴게 공간 부족함"),
            ],
        }
    }

    fn started(enabled: bool) -> Session {
        let mut s = Session::new(enabled);
        s.apply(Action::BeginIngestion).unwrap();
        s
    }

    #[test]
    fn eligibility_threshold_is_five_chars_after_trim() {
        assert!(!is_eligible(Some("성장기회")));
        assert!(is_eligible(Some("성장기회들")));
        assert!(!is_eligible(Some("  abcd  ")));
        assert!(is_eligible(Some(" abcde ")));
        assert!(!is_eligible(None));
    }

    #[tokio::test]
    async fn four_char_text_is_left_out_of_the_batch() {
        let backend = ScriptedBackend::default();
        let mut session = started(true);
        run_pipeline(&mut session, &backend, &ColumnMap::default(), store(), |_| {})
            .await
            .unwrap();

        let calls = backend.calls();
        let env_call = &calls[2];
        assert_eq!(env_call.0, ColumnMap::default().environment_opinion);
        // row_1's environment text has exactly four characters
        assert_eq!(env_call.1, vec!["row_0".to_string(), "row_2".to_string()]);
        let env = session.datasets.get(Topic::Environment).unwrap();
        assert!(env.scores_for("row_1").is_empty());
    }

    #[tokio::test]
    async fn stages_run_in_order_with_monotonic_progress() {
        let backend = ScriptedBackend::default();
        let mut session = started(true);
        let mut seen = Vec::new();
        run_pipeline(&mut session, &backend, &ColumnMap::default(), store(), |s| {
            seen.push((s.phase, s.progress))
        })
        .await
        .unwrap();

        let order: Vec<String> = backend.calls().into_iter().map(|c| c.0).collect();
        let cols = ColumnMap::default();
        assert_eq!(
            order,
            vec![cols.work_opinion, cols.growth_opinion, cols.environment_opinion, "transfer".into()]
        );
        assert!(seen.windows(2).all(|w| w[0].1 <= w[1].1));
        let progress: Vec<u8> = seen.iter().map(|(_, p)| *p).collect();
        assert_eq!(progress, vec![10, 10, 35, 35, 60, 60, 85, 85, 95, 100]);
        assert_eq!(session.phase, Phase::Ready);
    }

    #[tokio::test]
    async fn failed_keyword_stage_degrades_to_empty_lists() {
        let cols = ColumnMap::default();
        let backend = ScriptedBackend { fail_columns: vec![cols.growth_opinion.clone()], ..Default::default() };
        let mut session = started(true);
        run_pipeline(&mut session, &backend, &cols, store(), |_| {}).await.unwrap();

        assert_eq!(session.phase, Phase::Ready);
        assert_eq!(session.progress, 100);

        let growth = session.datasets.get(Topic::Growth).unwrap();
        assert_eq!(growth.len(), 3);
        assert!(growth.is_all_empty());

        for topic in [Topic::Work, Topic::Environment] {
            let ds = session.datasets.get(topic).unwrap();
            assert!(!ds.is_all_empty());
            let column = cols.opinion_column(topic);
            assert_eq!(ds.scores_for("row_0")[0].word, format!("kw:{}", column));
        }
    }

    #[tokio::test]
    async fn transfer_failure_resets_everything() {
        let backend = ScriptedBackend { fail_transfer: true, ..Default::default() };
        let mut session = started(true);
        let err = run_pipeline(&mut session, &backend, &ColumnMap::default(), store(), |_| {})
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Transfer(_)));
        assert_eq!(session.phase, Phase::Failed);
        assert!(session.store.is_empty());
        assert!(session.datasets.all_absent());
        assert!(session.transfer.is_none());
    }

    #[tokio::test]
    async fn disabled_analysis_still_runs_transfer() {
        let backend = ScriptedBackend::default();
        let mut session = started(false);
        run_pipeline(&mut session, &backend, &ColumnMap::default(), store(), |_| {})
            .await
            .unwrap();

        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "transfer");
        assert_eq!(calls[0].1.len(), 3);
        assert!(session.datasets.all_absent());
        assert_eq!(session.phase, Phase::Ready);
    }

    #[tokio::test]
    async fn hopefuls_resolve_to_ingested_records() {
        let backend = ScriptedBackend::default();
        let mut session = started(true);
        run_pipeline(&mut session, &backend, &ColumnMap::default(), store(), |_| {})
            .await
            .unwrap();

        let transfer = session.transfer.as_ref().unwrap();
        let ids: BTreeSet<&str> = transfer.hopefuls.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, BTreeSet::from(["row_0", "row_1"]));
        assert_eq!(transfer.hopefuls[0], session.records()[0]);
    }

    #[tokio::test]
    async fn missing_workbook_fails_the_session() {
        let backend = ScriptedBackend::default();
        let mut session = Session::new(true);
        let err = ingest_file(
            &mut session,
            &backend,
            &ColumnMap::default(),
            Path::new("/nonexistent/interviews.xlsx"),
            |_| {},
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::Parse(_)));
        assert_eq!(session.phase, Phase::Failed);
        assert!(backend.calls().is_empty());
    }
}
