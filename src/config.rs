use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub timelapse: TimelapseConfig,
    #[serde(default)]
    pub gpio: GpioConfig,
    #[serde(default)]
    pub audio: AudioConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Max probes in flight during one aggregator run.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Per-probe time budget unless the probe declares its own.
    #[serde(default = "default_budget_secs")]
    pub default_budget_secs: u64,
    /// Run one discovery in the background at startup when no persisted
    /// snapshot exists yet.
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
    /// Snapshot file, fully overwritten on every run.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
}

/// Capture command templates; `{output}` is replaced with the target file.
/// Tests substitute stub commands here, production uses the rpicam tools.
#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_still_command")]
    pub still_command: Vec<String>,
    #[serde(default = "default_stream_command")]
    pub stream_command: Vec<String>,
    #[serde(default = "default_capture_timeout_secs")]
    pub capture_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelapseConfig {
    /// Directory the captured frames accumulate in (append-only, cleared
    /// only by the explicit clear endpoint).
    #[serde(default = "default_frames_dir")]
    pub frames_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GpioConfig {
    /// Pins the control API may toggle.
    #[serde(default = "default_gpio_pins")]
    pub pins: Vec<u8>,
    /// `{pin}` and `{level}` are substituted per request.
    #[serde(default = "default_gpio_set_command")]
    pub set_command: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Text-to-speech producer; `{text}` is substituted, stdout is piped
    /// into the playback command.
    #[serde(default = "default_speak_command")]
    pub speak_command: Vec<String>,
    #[serde(default = "default_play_command")]
    pub play_command: Vec<String>,
    /// `{volume}` is substituted with the requested percentage.
    #[serde(default = "default_volume_command")]
    pub volume_command: Vec<String>,
}

fn default_concurrency() -> usize {
    8
}

fn default_budget_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_snapshot_path() -> String {
    "data/discovery.json".into()
}

fn default_capture_timeout_secs() -> u64 {
    10
}

fn default_still_command() -> Vec<String> {
    [
        "rpicam-still", "-o", "{output}", "--width", "1920", "--height", "1080", "-t", "1000",
    ]
    .map(str::to_string)
    .to_vec()
}

fn default_stream_command() -> Vec<String> {
    [
        "rpicam-vid",
        "-t",
        "0",
        "--inline",
        "--width",
        "640",
        "--height",
        "480",
        "--framerate",
        "15",
        "--codec",
        "mjpeg",
        "-o",
        "-",
    ]
    .map(str::to_string)
    .to_vec()
}

fn default_frames_dir() -> String {
    "data/timelapse".into()
}

fn default_gpio_pins() -> Vec<u8> {
    vec![17, 22, 23, 27]
}

fn default_gpio_set_command() -> Vec<String> {
    ["pinctrl", "set", "{pin}", "op", "{level}"]
        .map(str::to_string)
        .to_vec()
}

fn default_speak_command() -> Vec<String> {
    ["espeak-ng", "--stdout", "{text}"].map(str::to_string).to_vec()
}

fn default_play_command() -> Vec<String> {
    ["aplay", "-D", "plughw:0,0"].map(str::to_string).to_vec()
}

fn default_volume_command() -> Vec<String> {
    ["amixer", "-c", "0", "set", "PCM", "{volume}%"]
        .map(str::to_string)
        .to_vec()
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            default_budget_secs: default_budget_secs(),
            run_on_startup: default_true(),
            snapshot_path: default_snapshot_path(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            still_command: default_still_command(),
            stream_command: default_stream_command(),
            capture_timeout_secs: default_capture_timeout_secs(),
        }
    }
}

impl Default for TimelapseConfig {
    fn default() -> Self {
        Self {
            frames_dir: default_frames_dir(),
        }
    }
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            pins: default_gpio_pins(),
            set_command: default_gpio_set_command(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            speak_command: default_speak_command(),
            play_command: default_play_command(),
            volume_command: default_volume_command(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            self.discovery.concurrency > 0,
            "discovery.concurrency must be > 0, got {}",
            self.discovery.concurrency
        );
        anyhow::ensure!(
            self.discovery.default_budget_secs > 0,
            "discovery.default_budget_secs must be > 0, got {}",
            self.discovery.default_budget_secs
        );
        anyhow::ensure!(
            !self.discovery.snapshot_path.is_empty(),
            "discovery.snapshot_path must be non-empty"
        );
        anyhow::ensure!(
            !self.camera.still_command.is_empty(),
            "camera.still_command must be non-empty"
        );
        anyhow::ensure!(
            !self.camera.stream_command.is_empty(),
            "camera.stream_command must be non-empty"
        );
        anyhow::ensure!(
            self.camera.capture_timeout_secs > 0,
            "camera.capture_timeout_secs must be > 0, got {}",
            self.camera.capture_timeout_secs
        );
        anyhow::ensure!(
            !self.timelapse.frames_dir.is_empty(),
            "timelapse.frames_dir must be non-empty"
        );
        anyhow::ensure!(
            !self.gpio.set_command.is_empty(),
            "gpio.set_command must be non-empty"
        );
        anyhow::ensure!(
            !self.audio.speak_command.is_empty(),
            "audio.speak_command must be non-empty"
        );
        anyhow::ensure!(
            !self.audio.play_command.is_empty(),
            "audio.play_command must be non-empty"
        );
        anyhow::ensure!(
            !self.audio.volume_command.is_empty(),
            "audio.volume_command must be non-empty"
        );
        Ok(())
    }
}
