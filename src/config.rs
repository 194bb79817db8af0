use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::models::Topic;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";

/// Spreadsheet header names for the fields the engine understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub employee_name: String,
    pub job: String,
    pub tenure_band: String,
    pub quarter: String,
    pub work_opinion: String,
    pub growth_opinion: String,
    pub environment_opinion: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        ColumnMap {
            employee_name: "이름".into(),
            job: "직무".into(),
            tenure_band: "직무연차".into(),
            quarter: "분기".into(),
            work_opinion: "(1) 업무-구성원 의견".into(),
            growth_opinion: "(2) 성장/역량/커리어-구성원 의견".into(),
            environment_opinion: "(3) 업무환경조성-구성원 의견".into(),
        }
    }
}

impl ColumnMap {
    pub fn opinion_column(&self, topic: Topic) -> &str {
        match topic {
            Topic::Work => &self.work_opinion,
            Topic::Growth => &self.growth_opinion,
            Topic::Environment => &self.environment_opinion,
        }
    }

    pub fn is_mapped(&self, header: &str) -> bool {
        [
            &self.employee_name,
            &self.job,
            &self.tenure_band,
            &self.quarter,
            &self.work_opinion,
            &self.growth_opinion,
            &self.environment_opinion,
        ]
        .iter()
        .any(|h| h.as_str() == header)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend_url: String,
    pub request_timeout_secs: u64,
    pub analysis_enabled: bool,
    pub columns: ColumnMap,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            backend_url: DEFAULT_BACKEND_URL.into(),
            request_timeout_secs: 300,
            analysis_enabled: true,
            columns: ColumnMap::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<AppConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: AppConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("parsing config {}", path.display()))?;
    debug!("Config loaded - path={}, backend_url={}", path.display(), cfg.backend_url);
    Ok(cfg)
}

/// `--config` > `ENSIGHT_CONFIG` > `<config dir>/ensight/config.yaml`.
/// A missing default file is not an error; explicit paths must exist.
pub fn resolve_config(cli_path: Option<&Path>) -> Result<AppConfig> {
    if let Some(p) = cli_path {
        return load_config(p);
    }
    if let Ok(p) = std::env::var("ENSIGHT_CONFIG") {
        return load_config(Path::new(&p));
    }
    match default_config_path() {
        Some(p) if p.exists() => load_config(&p),
        _ => {
            debug!("No config file found, using defaults");
            Ok(AppConfig::default())
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ensight").join("config.yaml"))
}
