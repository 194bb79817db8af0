mod aggregate;
mod api_types;
mod config;
mod drilldown;
mod export;
mod filter;
mod ingest;
mod models;
mod orchestrator;
mod out_models;
mod remote;
mod render;
mod repl;
mod session;
mod suggest;
mod transfer;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use config::resolve_config;
use remote::HttpBackend;
use repl::{Command, Outcome, Repl};
use session::Session;

/// Ensight - interview opinion keyword and transfer-intent dashboard
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Interview spreadsheet (.xlsx); the first sheet is read
    input: Option<PathBuf>,

    /// Output directory for exported files (default: "out")
    #[arg(short, long, default_value = "out")]
    output_dir: PathBuf,

    /// Path to config file (overrides ENSIGHT_CONFIG environment variable)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Analysis service base URL (overrides the config file)
    #[arg(long, env = "ENSIGHT_BACKEND_URL")]
    backend_url: Option<String>,

    /// Skip the three keyword stages; only transfer intent is analyzed
    #[arg(long)]
    no_keywords: bool,

    /// Global job filter
    #[arg(long, default_value = "all")]
    job: String,

    /// Global tenure band filter
    #[arg(long, default_value = "all")]
    tenure: String,

    /// Initial keyword selection, e.g. growth=성장 (repeatable)
    #[arg(long, value_name = "TOPIC=WORD")]
    keyword: Vec<String>,

    /// Initial transfer hopeful selection
    #[arg(long)]
    employee: Option<String>,

    /// Keep reading commands from stdin after the first analysis
    #[arg(short, long)]
    interactive: bool,
}

impl Args {
    /// Startup flags expressed as the commands an interactive user would type.
    fn initial_commands(&self) -> Result<Vec<Command>> {
        let mut lines = vec![format!("filter job {}", self.job), format!("filter tenure {}", self.tenure)];
        for kw in &self.keyword {
            let (topic, word) = kw
                .split_once('=')
                .ok_or_else(|| anyhow!("--keyword expects TOPIC=WORD, got '{}'", kw))?;
            lines.push(format!("keyword {} {}", topic, word));
        }
        if let Some(name) = &self.employee {
            lines.push(format!("employee {}", name));
        }
        lines.iter().map(|l| l.parse()).collect()
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting ensight");

    let args = Args::parse();
    let mut cfg = resolve_config(args.config.as_deref())?;
    if let Some(url) = &args.backend_url {
        debug!("Backend URL overridden - url={}", url);
        cfg.backend_url = url.clone();
    }
    if args.no_keywords {
        cfg.analysis_enabled = false;
    }
    let initial = args.initial_commands()?;

    let ymd_today = Local::now().format("%Y-%m-%d").to_string();
    let export_dir = args.output_dir.join(&ymd_today);
    info!(
        "Run settings - backend_url={}, keywords={}, output_dir={}",
        cfg.backend_url,
        cfg.analysis_enabled,
        export_dir.display()
    );

    let backend = HttpBackend::new(&cfg.backend_url, Duration::from_secs(cfg.request_timeout_secs))
        .context("building HTTP client")?;
    let mut repl = Repl::new(Session::new(cfg.analysis_enabled), &backend, &cfg.columns, export_dir);

    match &args.input {
        Some(path) => {
            if let Err(e) = repl.load(path).await {
                error!("Analysis failed - error={:#}", e);
                if !args.interactive {
                    return Err(e);
                }
                eprintln!("{}", repl.render());
            } else {
                for cmd in initial {
                    if let Err(e) = repl.execute(cmd).await {
                        warn!("Startup selection ignored - error={:#}", e);
                    }
                }
                println!("{}", repl.render());
                if let Outcome::Print(msg) = repl.execute(Command::Export).await? {
                    info!("{}", msg);
                }
            }
        }
        None if !args.interactive => {
            return Err(anyhow!("no input file given; pass an .xlsx path or use --interactive"));
        }
        None => {}
    }

    if args.interactive {
        repl.run_interactive().await?;
    }

    info!("ensight finished");
    Ok(())
}
