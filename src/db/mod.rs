//! Database module
//!
//! SQLite connection pooling, migrations, and demo data.

pub mod connection;
pub mod migrations;
pub mod seed;

pub use connection::{Database, DbError, DbResult};
