// System accessors via sysinfo; the library-backed side of the probe set.

use crate::models::{InterfaceInfo, MemoryInfo, PartitionInfo, RamInfo, StorageInfo, SwapInfo, UptimeInfo};
use sysinfo::{Disks, Networks, System};
use std::sync::Mutex;

pub struct SystemInspector {
    sys: Mutex<System>,
    disks: Mutex<Disks>,
    networks: Mutex<Networks>,
}

impl Default for SystemInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemInspector {
    pub fn new() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();
        let disks = Disks::new_with_refreshed_list();
        let networks = Networks::new_with_refreshed_list();
        Self {
            sys: Mutex::new(sys),
            disks: Mutex::new(disks),
            networks: Mutex::new(networks),
        }
    }

    pub fn memory(&self) -> anyhow::Result<MemoryInfo> {
        let mut sys = self
            .sys
            .lock()
            .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {e}"))?;
        sys.refresh_memory();

        let total = sys.total_memory();
        let available = sys.available_memory();
        let used = total.saturating_sub(available);
        let swap_total = sys.total_swap();
        let swap_used = sys.used_swap();

        Ok(MemoryInfo {
            ram: RamInfo {
                total_bytes: total,
                available_bytes: available,
                used_bytes: used,
                usage_percent: percent(used, total),
            },
            swap: SwapInfo {
                total_bytes: swap_total,
                used_bytes: swap_used,
                usage_percent: percent(swap_used, swap_total),
            },
        })
    }

    pub fn storage(&self) -> anyhow::Result<StorageInfo> {
        let mut disks = self
            .disks
            .lock()
            .map_err(|e| anyhow::anyhow!("sysinfo disks lock poisoned: {e}"))?;
        disks.refresh(false);
        let partitions: Vec<PartitionInfo> = disks
            .list()
            .iter()
            .map(|d| {
                let total = d.total_space();
                let available = d.available_space();
                let used = total.saturating_sub(available);
                PartitionInfo {
                    name: d.name().to_string_lossy().into_owned(),
                    mountpoint: d.mount_point().to_string_lossy().into_owned(),
                    fstype: d.file_system().to_string_lossy().into_owned(),
                    total_bytes: total,
                    used_bytes: used,
                    available_bytes: available,
                    usage_percent: percent(used, total),
                }
            })
            .collect();

        Ok(StorageInfo { partitions })
    }

    pub fn interfaces(&self) -> anyhow::Result<Vec<InterfaceInfo>> {
        let mut networks = self
            .networks
            .lock()
            .map_err(|e| anyhow::anyhow!("sysinfo networks lock poisoned: {e}"))?;
        networks.refresh(true);
        let interfaces = networks
            .list()
            .iter()
            .map(|(name, data)| InterfaceInfo {
                name: name.clone(),
                mac_address: data.mac_address().to_string(),
                ipv4: data
                    .ip_networks()
                    .iter()
                    .filter(|n| n.addr.is_ipv4())
                    .map(|n| n.addr.to_string())
                    .collect(),
                ipv6: data
                    .ip_networks()
                    .iter()
                    .filter(|n| n.addr.is_ipv6())
                    .map(|n| n.addr.to_string())
                    .collect(),
            })
            .collect();
        Ok(interfaces)
    }

    pub fn uptime(&self) -> UptimeInfo {
        let secs = System::uptime();
        UptimeInfo {
            secs,
            pretty: pretty_uptime(secs),
        }
    }

    pub fn hostname(&self) -> String {
        System::host_name().unwrap_or_else(|| "unknown".into())
    }

    pub fn kernel_version(&self) -> Option<String> {
        System::kernel_version()
    }

    /// Usage of the partition mounted at `/`, when present.
    pub fn root_usage_percent(&self) -> anyhow::Result<Option<f64>> {
        let storage = self.storage()?;
        Ok(storage
            .partitions
            .iter()
            .find(|p| p.mountpoint == "/")
            .map(|p| p.usage_percent))
    }
}

fn percent(used: u64, total: u64) -> f64 {
    if total > 0 {
        (used as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

fn pretty_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    if days > 0 {
        format!("up {days} days, {hours} hours, {minutes} minutes")
    } else if hours > 0 {
        format!("up {hours} hours, {minutes} minutes")
    } else {
        format!("up {minutes} minutes")
    }
}
