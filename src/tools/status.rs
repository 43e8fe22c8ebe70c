//! Costing Status Tool
//!
//! Provides runtime status information about the costing service.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::db::Database;
use crate::models::{BatchRecipe, InventoryItem, MenuItem};

/// Record counts in the costing database
#[derive(Debug, Clone, Serialize)]
pub struct RecordCounts {
    pub inventory_items: i64,
    pub batch_recipes: i64,
    pub menu_items: i64,
}

/// Runtime status of the costing service
#[derive(Debug, Clone, Serialize)]
pub struct CostingStatus {
    /// Build information
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    /// Database information
    pub database_path: String,
    pub database_size_bytes: Option<u64>,
    pub records: Option<RecordCounts>,

    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
        }
    }

    /// Get the current status
    pub fn get_status(&self, database: &Database) -> CostingStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        let records = database
            .with_conn(|conn| {
                Ok(RecordCounts {
                    inventory_items: InventoryItem::count(conn)?,
                    batch_recipes: BatchRecipe::count(conn)?,
                    menu_items: MenuItem::count(conn)?,
                })
            })
            .map_err(|e| tracing::warn!("Failed to count records for status: {}", e))
            .ok();

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        CostingStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            records,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_database;

    #[test]
    fn test_status_counts_records() {
        let db = test_database();
        let tracker = StatusTracker::new(PathBuf::from("/nonexistent/boh.db"));
        let status = tracker.get_status(&db);

        assert!(status.database_size_bytes.is_none());
        let records = status.records.unwrap();
        assert_eq!(records.inventory_items, 0);
        assert_eq!(records.menu_items, 0);
        assert_eq!(status.process_id, std::process::id());
    }
}
