// Build-time version from Cargo.toml

/// Package version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name (from Cargo.toml).
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Snapshot schema version, bumped when the discovery JSON shape changes.
pub const SCHEMA_VERSION: &str = "1.0.0";
