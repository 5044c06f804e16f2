// Parsers turning raw probe output into structured values.
// Each one is total over arbitrary input: None means "not in a shape we
// recognize", which the runner records as an unavailable entry.

use crate::models::{
    AlsaDevice, BoardInfo, CameraModule, CpuInfo, GatewayInfo, OsInfo, PackagesInfo, SocketInfo,
    ThermalInfo, ThrottleInfo,
};
use serde_json::{Value, json};

/// Fallback parser: the trimmed output as-is.
pub fn raw_text(raw: &str) -> Option<Value> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    Some(Value::String(text.to_string()))
}

/// /proc/device-tree/model is NUL-terminated.
pub fn device_tree_model(raw: &str) -> Option<Value> {
    let model = raw.replace('\0', "").trim().to_string();
    if model.is_empty() {
        return None;
    }
    serde_json::to_value(BoardInfo { model }).ok()
}

/// /proc/cpuinfo: "key : value" lines; one "processor" line per logical core.
pub fn cpuinfo(raw: &str) -> Option<Value> {
    let mut info = CpuInfo {
        architecture: std::env::consts::ARCH.to_string(),
        logical_cores: 0,
        model_name: None,
        hardware: None,
        revision: None,
        serial: None,
    };
    for line in raw.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();
        match key.as_str() {
            "processor" => info.logical_cores += 1,
            "model name" if info.model_name.is_none() => {
                info.model_name = Some(value.to_string());
            }
            "hardware" => info.hardware = Some(value.to_string()),
            "revision" => info.revision = Some(value.to_string()),
            "serial" => info.serial = Some(value.to_string()),
            _ => {}
        }
    }
    if info.logical_cores == 0 {
        return None;
    }
    serde_json::to_value(info).ok()
}

/// /etc/os-release: KEY=VALUE lines, values possibly quoted.
pub fn os_release(raw: &str) -> Option<Value> {
    let mut info = OsInfo {
        name: None,
        pretty_name: None,
        id: None,
        version_id: None,
    };
    for line in raw.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').to_string();
        match key.trim() {
            "NAME" => info.name = Some(value),
            "PRETTY_NAME" => info.pretty_name = Some(value),
            "ID" => info.id = Some(value),
            "VERSION_ID" => info.version_id = Some(value),
            _ => {}
        }
    }
    if info.name.is_none() && info.pretty_name.is_none() {
        return None;
    }
    serde_json::to_value(info).ok()
}

/// `vcgencmd measure_temp` -> "temp=48.3'C"
pub fn vcgencmd_temp(raw: &str) -> Option<Value> {
    let celsius = parse_measure(raw, "temp=")?;
    serde_json::to_value(ThermalInfo { cpu_celsius: celsius }).ok()
}

/// `vcgencmd get_throttled` -> "throttled=0x50000"
pub fn vcgencmd_throttled(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    let hex = raw.strip_prefix("throttled=0x")?;
    let mask = u64::from_str_radix(hex, 16).ok()?;
    serde_json::to_value(ThrottleInfo {
        raw: raw.to_string(),
        throttled: mask != 0,
    })
    .ok()
}

/// `vcgencmd display_power` -> "display_power=1"
pub fn vcgencmd_display_power(raw: &str) -> Option<Value> {
    let value = raw.trim().strip_prefix("display_power=")?;
    Some(json!({ "powered": value == "1" }))
}

/// `aplay -l` / `arecord -l` card lines:
/// "card 0: Device [USB PnP Sound Device], device 0: USB Audio [USB Audio]"
pub fn alsa_devices(raw: &str) -> Option<Value> {
    let devices: Vec<AlsaDevice> = raw.lines().filter_map(parse_alsa_line).collect();
    serde_json::to_value(devices).ok()
}

fn parse_alsa_line(line: &str) -> Option<AlsaDevice> {
    let rest = line.strip_prefix("card ")?;
    let (card_str, rest) = rest.split_once(':')?;
    let card = card_str.trim().parse().ok()?;
    let rest = rest.trim_start();
    let (card_name, rest) = rest.split_once('[')?;
    let (card_description, rest) = rest.split_once(']')?;
    let rest = rest.strip_prefix(", device ")?;
    let (device_str, device_description) = rest.split_once(':')?;
    Some(AlsaDevice {
        card,
        card_name: card_name.trim().to_string(),
        card_description: card_description.trim().to_string(),
        device: device_str.trim().parse().ok()?,
        device_description: device_description.trim().to_string(),
    })
}

/// `rpicam-hello --list-cameras`:
/// "0 : imx219 [3280x2464 10-bit RGGB] (/base/soc/...)"
pub fn camera_list(raw: &str) -> Option<Value> {
    if !raw.contains("Available cameras") {
        return None;
    }
    let cameras: Vec<CameraModule> = raw
        .lines()
        .filter(|line| !line.trim_start().starts_with('-'))
        .filter_map(|line| {
            let (id, description) = line.split_once(" : ")?;
            let id = id.trim().parse().ok()?;
            let description = description.trim();
            let sensor = description.split_whitespace().next()?.to_string();
            Some(CameraModule {
                id,
                sensor,
                description: description.to_string(),
            })
        })
        .collect();
    serde_json::to_value(cameras).ok()
}

/// `lsusb`: one device per line.
pub fn lsusb_devices(raw: &str) -> Option<Value> {
    let devices: Vec<&str> = raw.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    Some(json!({ "devices": devices }))
}

/// `hciconfig`: adapter blocks start at column zero as "hci0:".
pub fn bluetooth_adapters(raw: &str) -> Option<Value> {
    let adapters: Vec<String> = raw
        .lines()
        .filter(|line| !line.starts_with(char::is_whitespace))
        .filter_map(|line| line.split_once(':').map(|(name, _)| name.trim().to_string()))
        .filter(|name| name.starts_with("hci"))
        .collect();
    if adapters.is_empty() {
        return None;
    }
    Some(json!({ "adapters": adapters }))
}

/// `nmcli -t -f active,ssid dev wifi`: "yes:HomeNet"
pub fn wifi_connection(raw: &str) -> Option<Value> {
    let ssid = raw
        .lines()
        .find_map(|line| line.strip_prefix("yes:"))?
        .to_string();
    Some(json!({ "ssid": ssid }))
}

/// /proc/bus/input/devices: blocks with `N: Name="..."` lines.
pub fn input_devices(raw: &str) -> Option<Value> {
    let names: Vec<String> = raw
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("N: Name=\"")?;
            rest.strip_suffix('"').map(str::to_string)
        })
        .collect();
    Some(json!({ "devices": names }))
}

/// `ip route show default`:
/// "default via 192.168.1.1 dev wlan0 proto dhcp metric 600"
pub fn default_gateway(raw: &str) -> Option<Value> {
    let mut tokens = raw.split_whitespace().peekable();
    let mut via = None;
    let mut dev = None;
    while let Some(token) = tokens.next() {
        match token {
            "via" => via = tokens.peek().map(|s| s.to_string()),
            "dev" => dev = tokens.peek().map(|s| s.to_string()),
            _ => {}
        }
    }
    serde_json::to_value(GatewayInfo { via: via?, dev }).ok()
}

/// /etc/resolv.conf nameserver lines.
pub fn dns_servers(raw: &str) -> Option<Value> {
    let servers: Vec<&str> = raw
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            line.strip_prefix("nameserver")
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
        .collect();
    if servers.is_empty() {
        return None;
    }
    Some(json!({ "nameservers": servers }))
}

/// `ss -tlnH`: "LISTEN 0 128 0.0.0.0:22 0.0.0.0:*"
pub fn listening_sockets(raw: &str) -> Option<Value> {
    let sockets: Vec<SocketInfo> = raw
        .lines()
        .filter_map(|line| {
            let local = line.split_whitespace().nth(3)?;
            let (address, port) = local.rsplit_once(':')?;
            Some(SocketInfo {
                address: address.to_string(),
                port: port.parse().ok()?,
            })
        })
        .collect();
    serde_json::to_value(sockets).ok()
}

/// `dpkg-query -f '${binary:Package}\n' -W`: one package per line.
pub fn dpkg_count(raw: &str) -> Option<Value> {
    let installed_count = raw.lines().filter(|l| !l.trim().is_empty()).count() as u64;
    serde_json::to_value(PackagesInfo { installed_count }).ok()
}

/// `systemctl list-units --type=service --state=running --no-legend --plain`:
/// "ssh.service loaded active running OpenBSD Secure Shell server"
pub fn running_services(raw: &str) -> Option<Value> {
    let services: Vec<String> = raw
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter_map(|unit| unit.strip_suffix(".service"))
        .map(str::to_string)
        .collect();
    Some(json!({ "running": services }))
}

fn parse_measure(raw: &str, prefix: &str) -> Option<f64> {
    let rest = raw.trim().strip_prefix(prefix)?;
    let numeric: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    numeric.parse().ok()
}
