use serde::{Deserialize, Serialize};

/// Parsed from /etc/os-release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub pretty_name: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub version_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UptimeInfo {
    pub secs: u64,
    pub pretty: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagesInfo {
    pub installed_count: u64,
}
