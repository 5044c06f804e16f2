// The ordered probe set. Registration order is snapshot order.

use super::inspector::SystemInspector;
use super::{ParseFn, ProbeDomain, ProbeSource, ProbeSpec, parsers};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Duration;

/// Binaries whose presence on PATH is worth reporting.
const NOTABLE_TOOLS: &[&str] = &[
    "python3", "node", "git", "gcc", "make", "docker", "pip3", "go", "rustc",
];

pub struct ProbeRegistry {
    probes: Vec<ProbeSpec>,
}

impl ProbeRegistry {
    pub fn new(probes: Vec<ProbeSpec>) -> Self {
        Self { probes }
    }

    pub fn probes(&self) -> &[ProbeSpec] {
        &self.probes
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// The full inventory, in the order it appears in the snapshot.
    pub fn standard(inspector: Arc<SystemInspector>, default_budget: Duration) -> Self {
        use ProbeDomain::*;

        let mem = inspector.clone();
        let sto = inspector.clone();
        let upt = inspector.clone();
        let krn = inspector.clone();
        let net = inspector.clone();

        let probes = vec![
            // hardware
            file(Hardware, "board_model", default_budget, "/proc/device-tree/model", parsers::device_tree_model),
            file(Hardware, "cpu", default_budget, "/proc/cpuinfo", parsers::cpuinfo),
            reader(Hardware, "memory", default_budget, move || {
                mem.memory().and_then(to_value)
            }),
            reader(Hardware, "storage", default_budget, move || {
                sto.storage().and_then(to_value)
            }),
            command(Hardware, "thermal", default_budget, &["vcgencmd", "measure_temp"], parsers::vcgencmd_temp),
            command(Hardware, "throttling", default_budget, &["vcgencmd", "get_throttled"], parsers::vcgencmd_throttled),
            command(Hardware, "gpio_pins", default_budget, &["pinctrl", "get"], parsers::raw_text),
            // peripherals
            command(Peripherals, "usb", default_budget, &["lsusb"], parsers::lsusb_devices),
            command(Peripherals, "audio_playback", default_budget, &["aplay", "-l"], parsers::alsa_devices),
            command(Peripherals, "audio_capture", default_budget, &["arecord", "-l"], parsers::alsa_devices),
            // Camera enumeration powers up the sensor stack; give it headroom.
            command(Peripherals, "camera", Duration::from_secs(15), &["rpicam-hello", "--list-cameras"], parsers::camera_list),
            command(Peripherals, "bluetooth", default_budget, &["hciconfig"], parsers::bluetooth_adapters),
            command(Peripherals, "display", default_budget, &["vcgencmd", "display_power"], parsers::vcgencmd_display_power),
            file(Peripherals, "input_devices", default_budget, "/proc/bus/input/devices", parsers::input_devices),
            reader(Peripherals, "hat", default_budget, hat_eeprom),
            command(Peripherals, "i2c", default_budget, &["i2cdetect", "-y", "1"], parsers::raw_text),
            // software
            file(Software, "os", default_budget, "/etc/os-release", parsers::os_release),
            reader(Software, "kernel", default_budget, move || {
                krn.kernel_version()
                    .map(|version| json!({ "version": version }))
                    .ok_or_else(|| anyhow::anyhow!("kernel version not readable"))
            }),
            reader(Software, "uptime", default_budget, move || to_value(upt.uptime())),
            command(Software, "packages", default_budget, &["dpkg-query", "-f", "${binary:Package}\n", "-W"], parsers::dpkg_count),
            reader(Software, "tooling", default_budget, || Ok(tool_presence(NOTABLE_TOOLS))),
            command(Software, "services", default_budget, &["systemctl", "list-units", "--type=service", "--state=running", "--no-legend", "--no-pager", "--plain"], parsers::running_services),
            // network
            reader(Network, "interfaces", default_budget, move || {
                net.interfaces().and_then(to_value)
            }),
            command(Network, "default_gateway", default_budget, &["ip", "route", "show", "default"], parsers::default_gateway),
            file(Network, "dns", default_budget, "/etc/resolv.conf", parsers::dns_servers),
            command(Network, "wifi", Duration::from_secs(5), &["nmcli", "-t", "-f", "active,ssid", "dev", "wifi"], parsers::wifi_connection),
            command(Network, "listening_sockets", default_budget, &["ss", "-tlnH"], parsers::listening_sockets),
        ];

        Self::new(probes)
    }
}

pub fn command(
    domain: ProbeDomain,
    name: &'static str,
    budget: Duration,
    argv: &[&str],
    parse: ParseFn,
) -> ProbeSpec {
    ProbeSpec {
        domain,
        name,
        budget,
        source: ProbeSource::Command {
            argv: argv.iter().map(|s| s.to_string()).collect(),
            parse,
        },
    }
}

pub fn file(
    domain: ProbeDomain,
    name: &'static str,
    budget: Duration,
    path: &str,
    parse: ParseFn,
) -> ProbeSpec {
    ProbeSpec {
        domain,
        name,
        budget,
        source: ProbeSource::File {
            path: PathBuf::from(path),
            parse,
        },
    }
}

pub fn reader<F>(domain: ProbeDomain, name: &'static str, budget: Duration, read: F) -> ProbeSpec
where
    F: Fn() -> anyhow::Result<Value> + Send + Sync + 'static,
{
    ProbeSpec {
        domain,
        name,
        budget,
        source: ProbeSource::Reader {
            read: Arc::new(read),
        },
    }
}

fn to_value<T: serde::Serialize>(value: T) -> anyhow::Result<Value> {
    serde_json::to_value(value).map_err(Into::into)
}

/// HAT EEPROM identity exposed through the device tree.
fn hat_eeprom() -> anyhow::Result<Value> {
    let read = |name: &str| -> Option<String> {
        std::fs::read_to_string(format!("/proc/device-tree/hat/{name}"))
            .ok()
            .map(|s| s.replace('\0', "").trim().to_string())
            .filter(|s| !s.is_empty())
    };
    let product = read("product").ok_or_else(|| anyhow::anyhow!("no HAT EEPROM present"))?;
    to_value(crate::models::HatInfo {
        product,
        vendor: read("vendor"),
        uuid: read("uuid"),
    })
}

/// Which of the notable tools are on PATH.
fn tool_presence(tools: &[&str]) -> Value {
    let mut map = serde_json::Map::new();
    let paths: Vec<PathBuf> = std::env::var_os("PATH")
        .map(|p| std::env::split_paths(&p).collect())
        .unwrap_or_default();
    for &tool in tools {
        let present = paths.iter().any(|dir| dir.join(tool).is_file());
        map.insert(tool.to_string(), Value::Bool(present));
    }
    Value::Object(map)
}
