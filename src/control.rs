// Interactive control wrappers: GPIO pin map, audio output, log viewer.
// Each endpoint is a thin bounded-command wrapper; the pin map and the
// volume level are single-writer state owned here and safe to read as a
// plain snapshot.

use crate::config::{AudioConfig, GpioConfig};
use crate::error::ApiError;
use crate::probe::exec::{self, ExecOutcome};
use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::Mutex;
use tokio::process::Command;
use tokio::time::{Duration, timeout};

const CONTROL_BUDGET: Duration = Duration::from_secs(10);
const PLAYBACK_BUDGET: Duration = Duration::from_secs(30);
const LOG_BUDGET: Duration = Duration::from_secs(15);

/// Longest utterance accepted by the speak endpoint.
const MAX_SPEAK_CHARS: usize = 200;

pub const MAX_LOG_LINES: usize = 1000;

pub struct GpioState {
    pins: Vec<u8>,
    set_command: Vec<String>,
    levels: Mutex<BTreeMap<u8, bool>>,
}

impl GpioState {
    pub fn new(config: &GpioConfig) -> Self {
        let levels = config.pins.iter().map(|&pin| (pin, false)).collect();
        Self {
            pins: config.pins.clone(),
            set_command: config.set_command.clone(),
            levels: Mutex::new(levels),
        }
    }

    /// Drives one allowlisted pin high or low.
    pub async fn set(&self, pin: u8, state: bool) -> Result<(), ApiError> {
        if !self.pins.contains(&pin) {
            return Err(ApiError::InvalidRequest(format!(
                "pin {pin} is not in the configured set"
            )));
        }
        let level = if state { "dh" } else { "dl" };
        let argv = exec::substitute(&self.set_command, "pin", &pin.to_string());
        let argv = exec::substitute(&argv, "level", level);
        run_control(&argv, CONTROL_BUDGET).await?;
        self.levels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(pin, state);
        tracing::info!(pin, state, "gpio pin set");
        Ok(())
    }

    /// Drives every configured pin low.
    pub async fn all_off(&self) -> Result<(), ApiError> {
        for pin in self.pins.clone() {
            self.set(pin, false).await?;
        }
        Ok(())
    }

    pub fn levels(&self) -> BTreeMap<u8, bool> {
        self.levels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

pub struct AudioControl {
    speak_command: Vec<String>,
    play_command: Vec<String>,
    volume_command: Vec<String>,
    level: Mutex<u8>,
}

impl AudioControl {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            speak_command: config.speak_command.clone(),
            play_command: config.play_command.clone(),
            volume_command: config.volume_command.clone(),
            level: Mutex::new(50),
        }
    }

    /// Text-to-speech: the speak command's stdout is piped into the
    /// playback command.
    pub async fn speak(&self, text: &str) -> Result<(), ApiError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ApiError::InvalidRequest("no text to speak".into()));
        }
        let text = truncate_chars(text, MAX_SPEAK_CHARS);

        let argv = exec::substitute(&self.speak_command, "text", text);
        let Some((speak_bin, speak_args)) = argv.split_first() else {
            return Err(ApiError::Internal(anyhow::anyhow!("empty speak command")));
        };
        let mut speaker = Command::new(speak_bin)
            .args(speak_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(speak_bin, e))?;
        let speech = speaker
            .stdout
            .take()
            .ok_or_else(|| anyhow::anyhow!("speak stdout not captured"))?;
        let speech: Stdio = speech
            .try_into()
            .map_err(|e: std::io::Error| anyhow::Error::from(e))?;

        let Some((play_bin, play_args)) = self.play_command.split_first() else {
            return Err(ApiError::Internal(anyhow::anyhow!("empty play command")));
        };
        let mut player = Command::new(play_bin)
            .args(play_args)
            .stdin(speech)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(play_bin, e))?;

        match timeout(PLAYBACK_BUDGET, player.wait()).await {
            Err(_) => return Err(ApiError::Unavailable("playback timed out".into())),
            Ok(Err(e)) => return Err(ApiError::Internal(e.into())),
            Ok(Ok(status)) if !status.success() => {
                return Err(ApiError::Unavailable(format!(
                    "playback exited with status {}",
                    status.code().unwrap_or(-1)
                )));
            }
            Ok(Ok(_)) => {}
        }
        let _ = speaker.wait().await;
        Ok(())
    }

    /// Sets the mixer volume and retains the level.
    pub async fn set_volume(&self, volume: u8) -> Result<u8, ApiError> {
        if volume > 100 {
            return Err(ApiError::InvalidRequest(format!(
                "volume must be 0-100, got {volume}"
            )));
        }
        let argv = exec::substitute(&self.volume_command, "volume", &volume.to_string());
        run_control(&argv, CONTROL_BUDGET).await?;
        *self.level.lock().unwrap_or_else(|e| e.into_inner()) = volume;
        tracing::info!(volume, "mixer volume set");
        Ok(volume)
    }

    pub fn level(&self) -> u8 {
        *self.level.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Log sources exposed by the viewer; `{lines}` is substituted per request.
const LOG_SOURCES: &[(&str, &[&str])] = &[
    ("syslog", &["journalctl", "-n", "{lines}", "--no-pager"]),
    ("kernel", &["journalctl", "-k", "-n", "{lines}", "--no-pager"]),
    ("auth", &["journalctl", "-u", "ssh", "-n", "{lines}", "--no-pager"]),
    ("picontrol", &["journalctl", "-u", "picontrol", "-n", "{lines}", "--no-pager"]),
    ("dmesg", &["dmesg", "--human", "-T"]),
];

pub fn log_source_names() -> Vec<&'static str> {
    LOG_SOURCES.iter().map(|(name, _)| *name).collect()
}

/// Reads the tail of one log source, capped at MAX_LOG_LINES.
pub async fn read_log(source: &str, lines: usize) -> Result<String, ApiError> {
    let Some((_, template)) = LOG_SOURCES.iter().find(|(name, _)| *name == source) else {
        return Err(ApiError::InvalidRequest(format!("unknown log source: {source}")));
    };
    let lines = lines.clamp(1, MAX_LOG_LINES);
    let argv: Vec<String> = template
        .iter()
        .map(|arg| arg.replace("{lines}", &lines.to_string()))
        .collect();
    let output = run_control(&argv, LOG_BUDGET).await?;

    // dmesg has no line-count flag; tail it here.
    if source == "dmesg" {
        let tail: Vec<&str> = output.lines().rev().take(lines).collect();
        return Ok(tail.into_iter().rev().collect::<Vec<_>>().join("\n"));
    }
    Ok(output)
}

async fn run_control(argv: &[String], budget: Duration) -> Result<String, ApiError> {
    match exec::run(argv, budget).await {
        ExecOutcome::Output(stdout) => Ok(stdout),
        ExecOutcome::NotFound(bin) => {
            Err(ApiError::Unavailable(format!("command not found: {bin}")))
        }
        ExecOutcome::Failed { code, stderr } => Err(ApiError::Unavailable(if stderr.is_empty() {
            format!("exited with status {}", code.unwrap_or(-1))
        } else {
            stderr
        })),
        ExecOutcome::TimedOut => Err(ApiError::Unavailable(format!(
            "timed out after {budget:?}"
        ))),
        ExecOutcome::Error(e) => Err(ApiError::Internal(anyhow::anyhow!(e))),
    }
}

fn spawn_error(bin: &str, e: std::io::Error) -> ApiError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ApiError::Unavailable(format!("command not found: {bin}"))
    } else {
        ApiError::Internal(e.into())
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
