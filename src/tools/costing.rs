//! Costing MCP Tools
//!
//! Live cost breakdowns for batches and menu items, and unit conversion.

use serde::Serialize;

use crate::conversion::{convert, Dimension, Unit};
use crate::costing::{self, BatchCost, CostError, MenuItemCost};
use crate::db::Database;

/// Response for convert_units
#[derive(Debug, Serialize)]
pub struct ConvertUnitsResponse {
    pub value: f64,
    pub from_unit: Unit,
    pub to_unit: Unit,
    pub result: f64,
    pub dimension: Dimension,
}

/// Cost breakdown of a batch, or `None` if it does not exist
pub fn get_batch_cost(db: &Database, batch_id: i64) -> Result<Option<BatchCost>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    match costing::batch_cost(&conn, batch_id) {
        Ok(cost) => Ok(Some(cost)),
        Err(CostError::UnknownBatch(id)) if id == batch_id => Ok(None),
        Err(e) => Err(format!("Failed to cost batch: {}", e)),
    }
}

/// Cost breakdown of a menu item, or `None` if it does not exist
pub fn get_menu_item_cost(db: &Database, menu_item_id: i64) -> Result<Option<MenuItemCost>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    match costing::menu_item_cost(&conn, menu_item_id) {
        Ok(cost) => Ok(Some(cost)),
        Err(CostError::UnknownMenuItem(_)) => Ok(None),
        Err(e) => Err(format!("Failed to cost menu item: {}", e)),
    }
}

/// Convert a quantity between two units of the same dimension
pub fn convert_units(value: f64, from_unit: &str, to_unit: &str) -> Result<ConvertUnitsResponse, String> {
    if !value.is_finite() {
        return Err("value must be a finite number".to_string());
    }

    let from: Unit = from_unit.parse().map_err(|e| format!("{}", e))?;
    let to: Unit = to_unit.parse().map_err(|e| format!("{}", e))?;
    let result = convert(value, from, to).map_err(|e| e.to_string())?;

    Ok(ConvertUnitsResponse {
        value,
        from_unit: from,
        to_unit: to,
        result,
        dimension: from.dimension(),
    })
}
