//! Inventory MCP Tools
//!
//! Tools for managing purchased inventory items and their prices.

use rusqlite::Connection;
use serde::Serialize;

use crate::conversion::{same_dimension, Unit};
use crate::db::Database;
use crate::models::{InventoryItem, InventoryItemCreate, InventoryItemUpdate};

use super::{validate_name, validate_non_negative};

/// Inventory item with how many recipe lines use it
#[derive(Debug, Serialize)]
pub struct InventoryItemDetail {
    #[serde(flatten)]
    pub item: InventoryItem,
    pub usage_count: i64,
}

/// Response for list_inventory_items
#[derive(Debug, Serialize)]
pub struct ListInventoryItemsResponse {
    pub items: Vec<InventoryItem>,
    pub count: usize,
}

/// Response for delete blocked
#[derive(Debug, Serialize)]
pub struct InventoryDeleteBlockedResponse {
    pub error: String,
    pub usage_count: i64,
}

/// Response for successful delete
#[derive(Debug, Serialize)]
pub struct InventoryDeleteSuccessResponse {
    pub success: bool,
    pub deleted_id: i64,
}

/// Add an inventory item
pub fn add_inventory_item(db: &Database, data: InventoryItemCreate) -> Result<InventoryItem, String> {
    let name = validate_name("Inventory item", &data.name)?;
    validate_non_negative("unit_cost", data.unit_cost)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if InventoryItem::get_by_name(&conn, &name)
        .map_err(|e| format!("Database error: {}", e))?
        .is_some()
    {
        return Err(format!("Inventory item already exists: {}", name));
    }

    let item = InventoryItem::create(&conn, &InventoryItemCreate { name, ..data })
        .map_err(|e| format!("Failed to add inventory item: {}", e))?;

    tracing::info!(id = item.id, name = %item.name, unit = %item.unit, "Added inventory item");
    Ok(item)
}

pub fn get_inventory_item(db: &Database, id: i64) -> Result<Option<InventoryItemDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let item = InventoryItem::get_by_id(&conn, id)
        .map_err(|e| format!("Failed to get inventory item: {}", e))?;

    match item {
        Some(item) => {
            let usage_count = InventoryItem::usage_count(&conn, id)
                .map_err(|e| format!("Failed to check usage: {}", e))?;
            Ok(Some(InventoryItemDetail { item, usage_count }))
        }
        None => Ok(None),
    }
}

/// List inventory items, optionally filtered by name
pub fn list_inventory_items(db: &Database, query: Option<&str>) -> Result<ListInventoryItemsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let items = InventoryItem::list(&conn, query.map(str::trim).filter(|q| !q.is_empty()))
        .map_err(|e| format!("Failed to list inventory items: {}", e))?;
    let count = items.len();

    Ok(ListInventoryItemsResponse { items, count })
}

/// Update an inventory item's name, unit, or cost.
///
/// Changing the unit to another dimension is refused while lines use the item
/// in units of the old dimension.
pub fn update_inventory_item(
    db: &Database,
    id: i64,
    mut data: InventoryItemUpdate,
) -> Result<Option<InventoryItem>, String> {
    if let Some(name) = data.name.take() {
        data.name = Some(validate_name("Inventory item", &name)?);
    }
    if let Some(unit_cost) = data.unit_cost {
        validate_non_negative("unit_cost", unit_cost)?;
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let existing = match InventoryItem::get_by_id(&conn, id).map_err(|e| format!("Database error: {}", e))? {
        Some(item) => item,
        None => return Ok(None),
    };

    if let Some(ref name) = data.name {
        let clash = InventoryItem::get_by_name(&conn, name).map_err(|e| format!("Database error: {}", e))?;
        if clash.map_or(false, |other| other.id != id) {
            return Err(format!("Inventory item already exists: {}", name));
        }
    }

    if let Some(unit) = data.unit {
        if !same_dimension(unit, existing.unit) {
            let incompatible = incompatible_line_count(&conn, id, unit)
                .map_err(|e| format!("Failed to check usage: {}", e))?;
            if incompatible > 0 {
                return Err(format!(
                    "Cannot change unit of {} to '{}': {} recipe line(s) use it in {} units",
                    existing.name,
                    unit,
                    incompatible,
                    existing.unit.dimension()
                ));
            }
        }
    }

    let updated = InventoryItem::update(&conn, id, &data)
        .map_err(|e| format!("Failed to update inventory item: {}", e))?;

    if let (Some(item), Some(new_cost)) = (&updated, data.unit_cost) {
        tracing::info!(id, name = %item.name, old_cost = existing.unit_cost, new_cost, "Updated inventory price");
    }

    Ok(updated)
}

/// Delete an inventory item (blocked while any batch or menu line uses it)
pub fn delete_inventory_item(
    db: &Database,
    id: i64,
) -> Result<Result<InventoryDeleteSuccessResponse, InventoryDeleteBlockedResponse>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let item = InventoryItem::get_by_id(&conn, id).map_err(|e| format!("Database error: {}", e))?;
    if item.is_none() {
        return Err(format!("Inventory item not found with id: {}", id));
    }

    let usage_count = InventoryItem::usage_count(&conn, id)
        .map_err(|e| format!("Failed to check usage: {}", e))?;
    if usage_count > 0 {
        return Ok(Err(InventoryDeleteBlockedResponse {
            error: format!("Cannot delete inventory item: used in {} recipe line(s)", usage_count),
            usage_count,
        }));
    }

    InventoryItem::delete(&conn, id).map_err(|e| format!("Failed to delete inventory item: {}", e))?;

    Ok(Ok(InventoryDeleteSuccessResponse {
        success: true,
        deleted_id: id,
    }))
}

/// Lines using the item in a unit that would not convert to `unit`
fn incompatible_line_count(conn: &Connection, item_id: i64, unit: Unit) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare(
        r#"
        SELECT unit FROM batch_ingredients WHERE item_id = ?1
        UNION ALL
        SELECT unit FROM menu_ingredients WHERE item_id = ?1
        "#,
    )?;
    let units = stmt
        .query_map([item_id], |row| row.get::<_, Unit>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(units.into_iter().filter(|u| !same_dimension(*u, unit)).count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BatchIngredient, BatchIngredientCreate, BatchRecipe, BatchRecipeCreate};
    use crate::tools::test_database;

    fn chicken() -> InventoryItemCreate {
        InventoryItemCreate { name: " Chicken ".to_string(), unit: Unit::Lb, unit_cost: 2.50 }
    }

    /// Put the item on a batch so it is in use
    fn use_in_batch(db: &Database, item_id: i64) {
        db.with_conn(|conn| {
            let batch = BatchRecipe::create(
                conn,
                &BatchRecipeCreate {
                    name: "Marinade".to_string(),
                    yield_qty: 10.0,
                    yield_unit: Unit::Kg,
                    notes: None,
                },
            )?;
            BatchIngredient::create(
                conn,
                &BatchIngredientCreate { batch_id: batch.id, item_id, qty: 5.0, unit: Unit::Kg },
            )?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_add_trims_and_rejects_duplicates() {
        let db = test_database();
        let item = add_inventory_item(&db, chicken()).unwrap();
        assert_eq!(item.name, "Chicken");

        let err = add_inventory_item(&db, chicken()).unwrap_err();
        assert!(err.contains("already exists"));
    }

    #[test]
    fn test_add_rejects_negative_cost() {
        let db = test_database();
        let data = InventoryItemCreate { unit_cost: -1.0, ..chicken() };
        assert!(add_inventory_item(&db, data).is_err());
    }

    #[test]
    fn test_get_reports_usage() {
        let db = test_database();
        let item = add_inventory_item(&db, chicken()).unwrap();
        use_in_batch(&db, item.id);

        let detail = get_inventory_item(&db, item.id).unwrap().unwrap();
        assert_eq!(detail.usage_count, 1);
        assert!(get_inventory_item(&db, item.id + 100).unwrap().is_none());
    }

    #[test]
    fn test_unit_change_within_dimension_allowed() {
        let db = test_database();
        let item = add_inventory_item(&db, chicken()).unwrap();
        use_in_batch(&db, item.id);

        let update = InventoryItemUpdate { unit: Some(Unit::Kg), unit_cost: Some(5.51), ..Default::default() };
        let updated = update_inventory_item(&db, item.id, update).unwrap().unwrap();
        assert_eq!(updated.unit, Unit::Kg);
    }

    #[test]
    fn test_unit_change_across_dimension_blocked_while_used() {
        let db = test_database();
        let item = add_inventory_item(&db, chicken()).unwrap();
        use_in_batch(&db, item.id);

        let update = InventoryItemUpdate { unit: Some(Unit::Ml), ..Default::default() };
        let err = update_inventory_item(&db, item.id, update).unwrap_err();
        assert!(err.contains("1 recipe line"));
    }

    #[test]
    fn test_delete_blocked_while_used() {
        let db = test_database();
        let item = add_inventory_item(&db, chicken()).unwrap();
        use_in_batch(&db, item.id);

        let blocked = delete_inventory_item(&db, item.id).unwrap().unwrap_err();
        assert_eq!(blocked.usage_count, 1);
    }

    #[test]
    fn test_delete_unused() {
        let db = test_database();
        let item = add_inventory_item(&db, chicken()).unwrap();
        let deleted = delete_inventory_item(&db, item.id).unwrap().unwrap();
        assert_eq!(deleted.deleted_id, item.id);
        assert_eq!(list_inventory_items(&db, None).unwrap().count, 0);
        assert!(delete_inventory_item(&db, item.id).is_err());
    }
}
