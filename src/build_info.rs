//! Build information module
//!
//! Compile-time build number and timestamp embedded by `build.rs`.

use std::path::Path;

use serde::Serialize;

use crate::conversion::Unit;

/// Build number, incremented on each recompilation
pub const BUILD_NUMBER: u64 = match option_env!("BOH_BUILD_NUMBER") {
    Some(s) => match parse_u64(s) {
        Some(n) => n,
        None => 0,
    },
    None => 0,
};

/// Build timestamp in ISO 8601 format
pub const BUILD_TIMESTAMP: &str = match option_env!("BOH_BUILD_TIMESTAMP") {
    Some(s) => s,
    None => "unknown",
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

// str::parse is not const
const fn parse_u64(s: &str) -> Option<u64> {
    let bytes = s.as_bytes();
    let mut result: u64 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b < b'0' || b > b'9' {
            return None;
        }
        result = result * 10 + (b - b'0') as u64;
        i += 1;
    }
    Some(result)
}

/// Build information reported by the status tool
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub description: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            name: NAME,
            version: VERSION,
            build_number: BUILD_NUMBER,
            build_timestamp: BUILD_TIMESTAMP,
            description: DESCRIPTION,
        }
    }
}

/// Startup banner: build line, database location, and the units the
/// converter accepts
fn banner_lines(info: &BuildInfo, db_path: &Path) -> Vec<String> {
    let units: Vec<&str> = Unit::ALL.iter().map(Unit::as_str).collect();
    vec![
        "===============================================".to_string(),
        "  Back-of-House Costing".to_string(),
        format!("  {} v{} (build {}, {})", info.name, info.version, info.build_number, info.build_timestamp),
        format!("  Kitchen database: {}", db_path.display()),
        format!("  Units: {}", units.join(" ")),
        "===============================================".to_string(),
    ]
}

/// Print the startup banner to stderr
pub fn print_startup_banner(db_path: &Path) {
    for line in banner_lines(&BuildInfo::current(), db_path) {
        eprintln!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u64() {
        assert_eq!(parse_u64("42"), Some(42));
        assert_eq!(parse_u64("0"), Some(0));
        assert_eq!(parse_u64("4x2"), None);
    }

    #[test]
    fn test_banner_names_database_and_units() {
        let lines = banner_lines(&BuildInfo::current(), Path::new("/srv/kitchen/boh.db"));
        assert!(lines.iter().any(|l| l.ends_with("/srv/kitchen/boh.db")));
        assert!(lines.iter().any(|l| l == "  Units: g kg oz lb ml l"));
    }
}
