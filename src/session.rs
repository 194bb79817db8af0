use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::drilldown::toggle;
use crate::filter::{filter_records, FilterSelection};
use crate::models::{KeywordDataset, Record, RecordStore, Topic, TopicDatasets, TransferResult};

pub const PROGRESS_FILE_READ: u8 = 5;
pub const PROGRESS_PARSED: u8 = 10;
pub const PROGRESS_TRANSFER_START: u8 = 85;
pub const PROGRESS_TRANSFER_DONE: u8 = 95;
pub const PROGRESS_COMPLETE: u8 = 100;

/// Progress sub-range `(start, end)` owned by one keyword stage.
pub fn stage_range(topic: Topic) -> (u8, u8) {
    match topic {
        Topic::Work => (10, 35),
        Topic::Growth => (35, 60),
        Topic::Environment => (60, 85),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    ParsingFile,
    RunningStage(Topic),
    RunningTransfer,
    Ready,
    Failed,
}

pub fn allowed_transitions(from: Phase) -> Vec<Phase> {
    use Phase::*;
    match from {
        Idle => vec![ParsingFile],
        ParsingFile => vec![RunningStage(Topic::Work), RunningTransfer, Failed],
        RunningStage(t) => match t.next() {
            Some(n) => vec![RunningStage(n), Failed],
            None => vec![RunningTransfer, Failed],
        },
        RunningTransfer => vec![Ready, Failed],
        Ready => vec![Idle],
        Failed => vec![Idle],
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("illegal transition {from:?} -> {to:?}")]
    IllegalTransition { from: Phase, to: Phase },
    #[error("{action} requires phase {expected:?}, session is {actual:?}")]
    WrongPhase {
        action: &'static str,
        expected: Phase,
        actual: Phase,
    },
    #[error("no {0} dataset is loaded")]
    NoDataset(Topic),
    #[error("no transfer result is loaded")]
    NoTransferResult,
}

/// Which dashboard panel a local filter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Panel {
    Keywords(Topic),
    Transfer,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeywordPanelState {
    pub local: FilterSelection,
    pub selected_keyword: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransferPanelState {
    pub local: FilterSelection,
    pub selected_employee: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PanelStates {
    pub work: KeywordPanelState,
    pub growth: KeywordPanelState,
    pub environment: KeywordPanelState,
    pub transfer: TransferPanelState,
}

impl PanelStates {
    pub fn keywords(&self, topic: Topic) -> &KeywordPanelState {
        match topic {
            Topic::Work => &self.work,
            Topic::Growth => &self.growth,
            Topic::Environment => &self.environment,
        }
    }

    fn keywords_mut(&mut self, topic: Topic) -> &mut KeywordPanelState {
        match topic {
            Topic::Work => &mut self.work,
            Topic::Growth => &mut self.growth,
            Topic::Environment => &mut self.environment,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    BeginIngestion,
    FileRead,
    FileParsed(RecordStore),
    StageStarted(Topic),
    StageCompleted(Topic, KeywordDataset),
    TransferStarted,
    TransferCompleted(TransferResult),
    Finalized,
    Failed(String),
    Reset,
    SetAnalysisEnabled(bool),
    SetGlobalFilter(FilterSelection),
    SetPanelFilter(Panel, FilterSelection),
    SelectKeyword(Topic, String),
    SelectEmployee(String),
}

/// The whole session as one value. Every change goes through [`Session::apply`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub phase: Phase,
    pub progress: u8,
    pub message: String,
    pub analysis_enabled: bool,
    pub store: RecordStore,
    pub datasets: TopicDatasets,
    pub transfer: Option<TransferResult>,
    pub global: FilterSelection,
    pub panels: PanelStates,
    pub last_error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Session::new(true)
    }
}

impl Session {
    pub fn new(analysis_enabled: bool) -> Self {
        Session {
            phase: Phase::Idle,
            progress: 0,
            message: String::new(),
            analysis_enabled,
            store: RecordStore::default(),
            datasets: TopicDatasets::default(),
            transfer: None,
            global: FilterSelection::default(),
            panels: PanelStates::default(),
            last_error: None,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.store.records
    }

    /// Records narrowed by the global filter.
    pub fn filtered(&self) -> Vec<&Record> {
        filter_records(&self.store.records, &self.global)
    }

    /// Globally filtered records narrowed again by a panel's local filter.
    pub fn panel_records(&self, panel: Panel) -> Vec<&Record> {
        let local = match panel {
            Panel::Keywords(t) => &self.panels.keywords(t).local,
            Panel::Transfer => &self.panels.transfer.local,
        };
        filter_records(self.filtered(), local)
    }

    pub fn apply(&mut self, action: Action) -> Result<(), SessionError> {
        match action {
            Action::BeginIngestion => {
                self.transition(Phase::ParsingFile)?;
                self.clear_data();
                self.last_error = None;
                self.progress = 0;
                self.message = "Excel 파일을 파싱 중입니다...".into();
            }
            Action::FileRead => {
                self.expect_phase("FileRead", Phase::ParsingFile)?;
                self.advance(PROGRESS_FILE_READ);
                self.message = "데이터를 변환 중입니다...".into();
            }
            Action::FileParsed(store) => {
                self.expect_phase("FileParsed", Phase::ParsingFile)?;
                self.store = store;
                self.advance(PROGRESS_PARSED);
            }
            Action::StageStarted(topic) => {
                self.transition(Phase::RunningStage(topic))?;
                self.advance(stage_range(topic).0);
                self.message = topic.loading_message().into();
            }
            Action::StageCompleted(topic, dataset) => {
                self.expect_phase("StageCompleted", Phase::RunningStage(topic))?;
                self.datasets.set(topic, Some(dataset));
                self.advance(stage_range(topic).1);
            }
            Action::TransferStarted => {
                self.transition(Phase::RunningTransfer)?;
                if !self.analysis_enabled {
                    self.datasets = TopicDatasets::default();
                }
                self.advance(PROGRESS_TRANSFER_START);
                self.message = "인사이동 희망 여부를 분석 중입니다...".into();
            }
            Action::TransferCompleted(result) => {
                self.expect_phase("TransferCompleted", Phase::RunningTransfer)?;
                self.transfer = Some(result);
                self.advance(PROGRESS_TRANSFER_DONE);
                self.message = "대시보드를 준비 중입니다...".into();
            }
            Action::Finalized => {
                self.transition(Phase::Ready)?;
                self.advance(PROGRESS_COMPLETE);
                self.message.clear();
            }
            Action::Failed(reason) => {
                self.transition(Phase::Failed)?;
                warn!("Session failed, clearing all data - reason={}", reason);
                self.clear_data();
                self.progress = 0;
                self.message.clear();
                self.last_error = Some(reason);
            }
            Action::Reset => {
                if self.phase != Phase::Idle {
                    self.transition(Phase::Idle)?;
                }
                let enabled = self.analysis_enabled;
                *self = Session::new(enabled);
            }
            Action::SetAnalysisEnabled(enabled) => {
                if matches!(
                    self.phase,
                    Phase::ParsingFile | Phase::RunningStage(_) | Phase::RunningTransfer
                ) {
                    return Err(SessionError::WrongPhase {
                        action: "SetAnalysisEnabled",
                        expected: Phase::Idle,
                        actual: self.phase,
                    });
                }
                self.analysis_enabled = enabled;
            }
            Action::SetGlobalFilter(sel) => {
                self.expect_phase("SetGlobalFilter", Phase::Ready)?;
                self.global = sel;
            }
            Action::SetPanelFilter(panel, sel) => {
                self.expect_phase("SetPanelFilter", Phase::Ready)?;
                match panel {
                    Panel::Keywords(t) => self.panels.keywords_mut(t).local = sel,
                    Panel::Transfer => self.panels.transfer.local = sel,
                }
            }
            Action::SelectKeyword(topic, word) => {
                self.expect_phase("SelectKeyword", Phase::Ready)?;
                if self.datasets.get(topic).is_none() {
                    return Err(SessionError::NoDataset(topic));
                }
                toggle(&mut self.panels.keywords_mut(topic).selected_keyword, &word);
            }
            Action::SelectEmployee(name) => {
                self.expect_phase("SelectEmployee", Phase::Ready)?;
                if self.transfer.is_none() {
                    return Err(SessionError::NoTransferResult);
                }
                toggle(&mut self.panels.transfer.selected_employee, &name);
            }
        }
        Ok(())
    }

    fn transition(&mut self, to: Phase) -> Result<(), SessionError> {
        if !allowed_transitions(self.phase).contains(&to) {
            return Err(SessionError::IllegalTransition { from: self.phase, to });
        }
        debug!("Phase transition - from={:?}, to={:?}", self.phase, to);
        self.phase = to;
        Ok(())
    }

    fn expect_phase(&self, action: &'static str, expected: Phase) -> Result<(), SessionError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(SessionError::WrongPhase { action, expected, actual: self.phase })
        }
    }

    fn advance(&mut self, pct: u8) {
        self.progress = self.progress.max(pct.min(PROGRESS_COMPLETE));
    }

    /// Records, all three datasets and the transfer result go together.
    fn clear_data(&mut self) {
        self.store = RecordStore::default();
        self.datasets = TopicDatasets::default();
        self.transfer = None;
        self.global = FilterSelection::default();
        self.panels = PanelStates::default();
    }
}
