use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardInfo {
    pub model: String,
}

/// Parsed from /proc/cpuinfo; the board-specific fields are absent on
/// non-Pi hardware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuInfo {
    pub architecture: String,
    pub logical_cores: u32,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub hardware: Option<String>,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub serial: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RamInfo {
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub used_bytes: u64,
    pub usage_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapInfo {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub usage_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryInfo {
    pub ram: RamInfo,
    pub swap: SwapInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionInfo {
    pub name: String,
    pub mountpoint: String,
    pub fstype: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
    pub usage_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageInfo {
    pub partitions: Vec<PartitionInfo>,
}

/// From `vcgencmd measure_temp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThermalInfo {
    pub cpu_celsius: f64,
}

/// From `vcgencmd get_throttled`; a non-zero mask means the firmware saw
/// undervoltage or thermal throttling since boot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleInfo {
    pub raw: String,
    pub throttled: bool,
}
