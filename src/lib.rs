//! Back-of-House Costing Library
//!
//! Unit conversion, cost rollup, and persistence for restaurant inventory,
//! batch recipes, and menu items.

pub mod build_info;
pub mod config;
pub mod conversion;
pub mod costing;
pub mod db;
pub mod mcp;
pub mod models;
pub mod tools;
