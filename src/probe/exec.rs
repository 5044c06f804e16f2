// Bounded external-command execution. One wrapper for probes, camera
// capture, and the control endpoints: spawn with piped output, race the
// wait against the budget, and rely on kill_on_drop so an overrunning
// child is terminated rather than leaked.

use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{Duration, timeout};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// Zero exit; trimmed stdout.
    Output(String),
    /// Non-zero exit; first stderr line kept as the reason.
    Failed { code: Option<i32>, stderr: String },
    /// The binary is not installed.
    NotFound(String),
    /// Budget exceeded; the child has been killed.
    TimedOut,
    /// Spawn or I/O error.
    Error(String),
}

pub async fn run(argv: &[String], budget: Duration) -> ExecOutcome {
    let Some((bin, args)) = argv.split_first() else {
        return ExecOutcome::Error("empty command".into());
    };
    let mut cmd = Command::new(bin);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return ExecOutcome::NotFound(bin.clone());
        }
        Err(e) => return ExecOutcome::Error(e.to_string()),
    };

    // On timeout the dropped future takes the child with it; kill_on_drop
    // reaps the process.
    match timeout(budget, child.wait_with_output()).await {
        Err(_) => ExecOutcome::TimedOut,
        Ok(Err(e)) => ExecOutcome::Error(e.to_string()),
        Ok(Ok(output)) => {
            if output.status.success() {
                ExecOutcome::Output(String::from_utf8_lossy(&output.stdout).trim().to_string())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                ExecOutcome::Failed {
                    code: output.status.code(),
                    stderr: stderr.trim().lines().next().unwrap_or_default().to_string(),
                }
            }
        }
    }
}

/// Replaces `{key}` with `value` in every argument of a command template.
pub fn substitute(argv: &[String], key: &str, value: &str) -> Vec<String> {
    let needle = format!("{{{key}}}");
    argv.iter().map(|arg| arg.replace(&needle, value)).collect()
}
