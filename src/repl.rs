use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::config::ColumnMap;
use crate::export::export_session;
use crate::filter::{Choice, FilterSelection};
use crate::models::Topic;
use crate::orchestrator::ingest_file;
use crate::out_models::Dashboard;
use crate::remote::AnalysisBackend;
use crate::render::{render_dashboard_markdown, render_progress};
use crate::session::{Action, Panel, Phase, Session};
use crate::suggest::SuggestionCache;

pub const HELP: &str = "\
commands:
  filter job|tenure <value|all>
  panel work|growth|environment|transfer job|tenure <value|all>
  keyword <topic> <word>      select or clear a keyword
  employee <name>             select or clear a transfer hopeful
  suggest <topic> <n>         AI suggestion for the n-th opinion card
  analysis on|off             keyword analysis toggle for the next load
  load <file.xlsx>
  show | export | reset | help | quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Job,
    Tenure,
}

impl FromStr for Dimension {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "job" | "직무" => Ok(Dimension::Job),
            "tenure" | "직무연차" => Ok(Dimension::Tenure),
            other => bail!("unknown filter dimension '{}' (expected job|tenure)", other),
        }
    }
}

/// Returns `sel` with one dimension replaced.
pub fn with_dimension(sel: &FilterSelection, dim: Dimension, value: Choice) -> FilterSelection {
    let mut next = sel.clone();
    match dim {
        Dimension::Job => next.job = value,
        Dimension::Tenure => next.tenure_band = value,
    }
    next
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Filter(Dimension, Choice),
    PanelFilter(Panel, Dimension, Choice),
    Keyword(Topic, String),
    Employee(String),
    Suggest(Topic, usize),
    Analysis(bool),
    Load(PathBuf),
    Show,
    Export,
    Reset,
    Help,
    Quit,
}

fn parse_panel(s: &str) -> Result<Panel> {
    if s == "transfer" {
        return Ok(Panel::Transfer);
    }
    Topic::from_str(s).map(Panel::Keywords).map_err(|e| anyhow!(e))
}

fn parse_topic(s: &str) -> Result<Topic> {
    Topic::from_str(s).map_err(|e| anyhow!(e))
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let rest = |from: usize| words.get(from..).map(|w| w.join(" ")).unwrap_or_default();
        let need = |n: usize| -> Result<()> {
            if words.len() < n {
                bail!("'{}' needs more arguments; try 'help'", words.first().copied().unwrap_or_default());
            }
            Ok(())
        };

        let Some(&head) = words.first() else {
            bail!("empty command");
        };
        let cmd = match head {
            "filter" => {
                need(3)?;
                Command::Filter(words[1].parse()?, Choice::from(rest(2)))
            }
            "panel" => {
                need(4)?;
                Command::PanelFilter(parse_panel(words[1])?, words[2].parse()?, Choice::from(rest(3)))
            }
            "keyword" => {
                need(3)?;
                Command::Keyword(parse_topic(words[1])?, rest(2))
            }
            "employee" => {
                need(2)?;
                Command::Employee(rest(1))
            }
            "suggest" => {
                need(3)?;
                let n: usize = words[2].parse().with_context(|| format!("card number '{}'", words[2]))?;
                if n == 0 {
                    bail!("card numbers start at 1");
                }
                Command::Suggest(parse_topic(words[1])?, n)
            }
            "analysis" => {
                need(2)?;
                match words[1] {
                    "on" => Command::Analysis(true),
                    "off" => Command::Analysis(false),
                    other => bail!("expected on|off, got '{}'", other),
                }
            }
            "load" => {
                need(2)?;
                Command::Load(PathBuf::from(rest(1)))
            }
            "show" => Command::Show,
            "export" => Command::Export,
            "reset" => Command::Reset,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => bail!("unknown command '{}'; try 'help'", other),
        };
        Ok(cmd)
    }
}

pub enum Outcome {
    Print(String),
    Quit,
}

/// One analysis session bound to a backend and an export directory.
pub struct Repl<'a, B: AnalysisBackend + ?Sized> {
    pub session: Session,
    backend: &'a B,
    columns: &'a ColumnMap,
    export_dir: PathBuf,
    suggestions: SuggestionCache,
}

impl<'a, B: AnalysisBackend + ?Sized> Repl<'a, B> {
    pub fn new(session: Session, backend: &'a B, columns: &'a ColumnMap, export_dir: PathBuf) -> Self {
        Repl { session, backend, columns, export_dir, suggestions: SuggestionCache::default() }
    }

    /// Ingests `path` into a fresh session, printing progress to stderr.
    pub async fn load(&mut self, path: &Path) -> Result<()> {
        if matches!(self.session.phase, Phase::Ready | Phase::Failed) {
            self.session.apply(Action::Reset)?;
        }
        self.suggestions.clear();

        let mut last = None;
        ingest_file(&mut self.session, self.backend, self.columns, path, |s| {
            if last != Some(s.progress) {
                eprintln!("{}", render_progress(s.progress, &s.message));
                last = Some(s.progress);
            }
        })
        .await
        .with_context(|| format!("analyzing {}", path.display()))
    }

    pub async fn execute(&mut self, cmd: Command) -> Result<Outcome> {
        let out = match cmd {
            Command::Filter(dim, value) => {
                let next = with_dimension(&self.session.global, dim, value);
                self.session.apply(Action::SetGlobalFilter(next))?;
                self.render()
            }
            Command::PanelFilter(panel, dim, value) => {
                let current = match panel {
                    Panel::Keywords(t) => &self.session.panels.keywords(t).local,
                    Panel::Transfer => &self.session.panels.transfer.local,
                };
                let next = with_dimension(current, dim, value);
                self.session.apply(Action::SetPanelFilter(panel, next))?;
                self.render()
            }
            Command::Keyword(topic, word) => {
                self.session.apply(Action::SelectKeyword(topic, word))?;
                self.render()
            }
            Command::Employee(name) => {
                self.session.apply(Action::SelectEmployee(name))?;
                self.render()
            }
            Command::Suggest(topic, n) => self.suggest(topic, n).await?,
            Command::Analysis(enabled) => {
                self.session.apply(Action::SetAnalysisEnabled(enabled))?;
                format!("keyword analysis {}", if enabled { "on" } else { "off" })
            }
            Command::Load(path) => {
                self.load(&path).await?;
                self.render()
            }
            Command::Show => self.render(),
            Command::Export => {
                if self.session.phase != Phase::Ready {
                    bail!("nothing to export; load a file first");
                }
                export_session(&self.export_dir, &self.session, self.columns)?;
                format!("exported to {}", self.export_dir.display())
            }
            Command::Reset => {
                self.session.apply(Action::Reset)?;
                self.suggestions.clear();
                "session reset".to_string()
            }
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(Outcome::Quit),
        };
        Ok(Outcome::Print(out))
    }

    pub fn render(&self) -> String {
        match self.session.phase {
            Phase::Ready => render_dashboard_markdown(&Dashboard::derive(&self.session)),
            Phase::Failed => format!(
                "분석 실패: {}",
                self.session.last_error.as_deref().unwrap_or("알 수 없는 오류")
            ),
            _ => "no data loaded".to_string(),
        }
    }

    async fn suggest(&mut self, topic: Topic, n: usize) -> Result<String> {
        let dashboard = Dashboard::derive(&self.session);
        let panel = dashboard
            .panel(topic)
            .ok_or_else(|| anyhow!("no {} keyword panel; analysis was not run", topic))?;
        if panel.selected_keyword.is_none() {
            bail!("select a keyword in the {} panel first", topic);
        }
        let card = panel
            .cards
            .get(n - 1)
            .ok_or_else(|| anyhow!("card {} out of range (1..={})", n, panel.cards.len()))?;

        let text = self
            .suggestions
            .get_or_fetch(self.backend, &card.card_id, &card.opinion)
            .await;
        Ok(format!("[{} · {}] {}", card.name, card.quarter, text))
    }

    /// Reads commands from stdin until `quit` or end of input.
    pub async fn run_interactive(&mut self) -> Result<()> {
        info!("Interactive session started - type 'help' for commands");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await.context("reading stdin")? {
            if line.trim().is_empty() {
                continue;
            }
            let cmd = match line.parse::<Command>() {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("{:#}", e);
                    continue;
                }
            };
            match self.execute(cmd).await {
                Ok(Outcome::Print(s)) => println!("{}", s),
                Ok(Outcome::Quit) => break,
                Err(e) => {
                    warn!("Command failed - error={:#}", e);
                    eprintln!("{:#}", e);
                }
            }
        }
        Ok(())
    }
}
