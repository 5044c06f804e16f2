use serde::{Deserialize, Serialize};

/// One ALSA card/device line from `aplay -l` or `arecord -l`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlsaDevice {
    pub card: u32,
    pub card_name: String,
    pub card_description: String,
    pub device: u32,
    pub device_description: String,
}

/// One camera as listed by `rpicam-hello --list-cameras`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraModule {
    pub id: u32,
    pub sensor: String,
    pub description: String,
}

/// HAT EEPROM identity from /proc/device-tree/hat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HatInfo {
    pub product: String,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub uuid: Option<String>,
}
