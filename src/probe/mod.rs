// Probe descriptors and the uniform bounded runner.
// Every inspection, whatever its source, goes through the same budget +
// isolation wrapper: a probe can be slow, missing, or broken, but its run
// always produces exactly one outcome and never takes the aggregator down.

pub mod exec;
pub mod inspector;
pub mod parsers;
pub mod registry;

use crate::models::{ProbeReport, ProbeStatus};
use exec::ExecOutcome;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{Duration, timeout};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeDomain {
    Hardware,
    Peripherals,
    Software,
    Network,
}

impl ProbeDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeDomain::Hardware => "hardware",
            ProbeDomain::Peripherals => "peripherals",
            ProbeDomain::Software => "software",
            ProbeDomain::Network => "network",
        }
    }
}

/// Turns raw probe output into a structured value; None means the output
/// was not in a recognizable shape.
pub type ParseFn = fn(&str) -> Option<Value>;

/// In-process accessor, executed on the blocking pool under the budget.
pub type ReadFn = Arc<dyn Fn() -> anyhow::Result<Value> + Send + Sync>;

pub enum ProbeSource {
    /// External command, killed if it outlives the budget.
    Command { argv: Vec<String>, parse: ParseFn },
    /// A /proc, /sys or /etc style interface read.
    File { path: PathBuf, parse: ParseFn },
    /// Library accessor (sysinfo etc.).
    Reader { read: ReadFn },
}

/// One registered inspection. Immutable once registered.
pub struct ProbeSpec {
    pub domain: ProbeDomain,
    pub name: &'static str,
    pub budget: Duration,
    pub source: ProbeSource,
}

/// Tri-state probe result. Never an Err: absence and overrun are data.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Ok(Value),
    Unavailable(String),
    TimedOut,
}

impl ProbeOutcome {
    pub fn into_report(self, budget: Duration) -> ProbeReport {
        match self {
            ProbeOutcome::Ok(value) => ProbeReport {
                status: ProbeStatus::Ok,
                detected: true,
                value: Some(value),
                error: None,
            },
            ProbeOutcome::Unavailable(reason) => ProbeReport {
                status: ProbeStatus::Unavailable,
                detected: false,
                value: None,
                error: Some(reason),
            },
            ProbeOutcome::TimedOut => ProbeReport {
                status: ProbeStatus::TimedOut,
                detected: false,
                value: None,
                error: Some(format!("exceeded {budget:?} budget")),
            },
        }
    }
}

impl ProbeSpec {
    /// Runs the probe to completion within its budget. Infallible by
    /// construction: every failure mode maps to an outcome variant.
    pub async fn run(&self) -> ProbeOutcome {
        match &self.source {
            ProbeSource::Command { argv, parse } => {
                match exec::run(argv, self.budget).await {
                    ExecOutcome::Output(stdout) => apply_parser(*parse, &stdout),
                    ExecOutcome::NotFound(bin) => {
                        ProbeOutcome::Unavailable(format!("command not found: {bin}"))
                    }
                    ExecOutcome::Failed { code, stderr } => {
                        let detail = if stderr.is_empty() {
                            format!("exited with status {}", code.unwrap_or(-1))
                        } else {
                            stderr
                        };
                        ProbeOutcome::Unavailable(detail)
                    }
                    ExecOutcome::TimedOut => ProbeOutcome::TimedOut,
                    ExecOutcome::Error(e) => ProbeOutcome::Unavailable(e),
                }
            }
            ProbeSource::File { path, parse } => {
                match timeout(self.budget, tokio::fs::read_to_string(path)).await {
                    Err(_) => ProbeOutcome::TimedOut,
                    Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                        ProbeOutcome::Unavailable(format!("{}: not present", path.display()))
                    }
                    Ok(Err(e)) => ProbeOutcome::Unavailable(e.to_string()),
                    Ok(Ok(contents)) => apply_parser(*parse, &contents),
                }
            }
            ProbeSource::Reader { read } => {
                let read = read.clone();
                match timeout(self.budget, tokio::task::spawn_blocking(move || read())).await {
                    Err(_) => ProbeOutcome::TimedOut,
                    Ok(Err(join)) => ProbeOutcome::Unavailable(format!("reader panicked: {join}")),
                    Ok(Ok(Err(e))) => ProbeOutcome::Unavailable(e.to_string()),
                    Ok(Ok(Ok(value))) => ProbeOutcome::Ok(value),
                }
            }
        }
    }
}

fn apply_parser(parse: ParseFn, raw: &str) -> ProbeOutcome {
    match parse(raw) {
        Some(value) => ProbeOutcome::Ok(value),
        None => ProbeOutcome::Unavailable("no usable output".into()),
    }
}
