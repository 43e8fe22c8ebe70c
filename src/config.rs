//! Runtime configuration
//!
//! Everything is read from the environment; there is no config file.

use std::path::{Path, PathBuf};

/// Environment variable overriding the SQLite database location
pub const DATABASE_PATH_VAR: &str = "BOH_DATABASE_PATH";

/// Default tracing directive when `RUST_LOG` does not mention this crate
pub const DEFAULT_LOG_DIRECTIVE: &str = "boh_costing=info";

/// Resolve the database path from `BOH_DATABASE_PATH`, falling back to
/// `<project root>/data/boh.db`.
pub fn database_path() -> PathBuf {
    std::env::var(DATABASE_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()))
                .unwrap_or_else(|| PathBuf::from("."));
            default_database_path(&exe_dir)
        })
}

/// Go up from target/release or target/debug to the project root
fn default_database_path(exe_dir: &Path) -> PathBuf {
    let mut path = exe_dir.to_path_buf();
    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(grandparent) = path.parent().and_then(|p| p.parent()) {
            path = grandparent.to_path_buf();
        }
    }

    path.push("data");
    path.push("boh.db");
    path
}

/// Create the parent directory of the database file if needed
pub fn ensure_parent_dir(db_path: &Path) -> std::io::Result<()> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_path_from_target_dir() {
        let path = default_database_path(Path::new("/srv/kitchen/target/release"));
        assert_eq!(path, PathBuf::from("/srv/kitchen/data/boh.db"));
    }

    #[test]
    fn test_default_path_from_install_dir() {
        let path = default_database_path(Path::new("/opt/boh/bin"));
        assert_eq!(path, PathBuf::from("/opt/boh/bin/data/boh.db"));
    }
}
