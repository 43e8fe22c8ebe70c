//! Batch Recipe MCP Tools
//!
//! Tools for managing batch recipes, their inventory ingredients, and the
//! sub-batches they consume.

use rusqlite::Connection;
use serde::Serialize;

use crate::conversion::{same_dimension, Unit};
use crate::db::{Database, DbError};
use crate::models::{
    BatchIngredient, BatchIngredientCreate, BatchIngredientDetail, BatchIngredientUpdate,
    BatchRecipe, BatchRecipeCreate, BatchRecipeUpdate, BatchSubBatch, BatchSubBatchCreate,
    BatchSubBatchDetail, BatchSubBatchUpdate, BatchUsage, InventoryItem,
};

use super::{validate_line_unit, validate_name, validate_positive};

/// Full batch detail with ingredient and sub-batch lines
#[derive(Debug, Serialize)]
pub struct BatchDetail {
    pub id: i64,
    pub name: String,
    pub yield_qty: f64,
    pub yield_unit: Unit,
    pub notes: Option<String>,
    pub ingredients: Vec<BatchIngredientDetail>,
    pub sub_batches: Vec<BatchSubBatchDetail>,
    /// Batches that consume this one directly
    pub used_by_batch_ids: Vec<i64>,
    pub usage: BatchUsage,
    pub created_at: String,
    pub updated_at: String,
}

/// Batch summary for listing
#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub id: i64,
    pub name: String,
    pub yield_qty: f64,
    pub yield_unit: Unit,
    pub ingredient_count: usize,
    pub sub_batch_count: usize,
}

/// Response for list_batches
#[derive(Debug, Serialize)]
pub struct ListBatchesResponse {
    pub batches: Vec<BatchSummary>,
    pub count: usize,
}

/// Response for delete blocked
#[derive(Debug, Serialize)]
pub struct BatchDeleteBlockedResponse {
    pub error: String,
    pub parent_batch_count: i64,
    pub menu_item_count: i64,
}

/// Response for successful delete
#[derive(Debug, Serialize)]
pub struct BatchDeleteSuccessResponse {
    pub success: bool,
    pub deleted_id: i64,
}

/// Response for add_sub_batch
#[derive(Debug, Serialize)]
pub struct AddSubBatchResponse {
    pub id: i64,
    pub parent_batch_id: i64,
    pub child_batch_id: i64,
    pub child_batch_name: String,
    pub qty: f64,
    pub unit: Unit,
}

// ============================================================================
// Batch Tools
// ============================================================================

/// Create a new batch recipe
pub fn create_batch(db: &Database, data: BatchRecipeCreate) -> Result<BatchRecipe, String> {
    let name = validate_name("Batch", &data.name)?;
    validate_positive("yield_qty", data.yield_qty)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if BatchRecipe::get_by_name(&conn, &name)
        .map_err(|e| format!("Database error: {}", e))?
        .is_some()
    {
        return Err(format!("Batch already exists: {}", name));
    }

    let batch = BatchRecipe::create(&conn, &BatchRecipeCreate { name, ..data })
        .map_err(|e| format!("Failed to create batch: {}", e))?;

    tracing::info!(id = batch.id, name = %batch.name, "Created batch recipe");
    Ok(batch)
}

/// Get a batch with its lines
pub fn get_batch(db: &Database, id: i64) -> Result<Option<BatchDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let batch = match BatchRecipe::get_by_id(&conn, id).map_err(|e| format!("Failed to get batch: {}", e))? {
        Some(batch) => batch,
        None => return Ok(None),
    };

    let ingredients = BatchIngredient::get_details_for_batch(&conn, id)
        .map_err(|e| format!("Failed to get ingredients: {}", e))?;
    let sub_batches = BatchSubBatch::get_details_for_batch(&conn, id)
        .map_err(|e| format!("Failed to get sub-batches: {}", e))?;
    let used_by_batch_ids = BatchSubBatch::get_parent_batch_ids(&conn, id)
        .map_err(|e| format!("Failed to get parent batches: {}", e))?;
    let usage = BatchRecipe::usage(&conn, id).map_err(|e| format!("Failed to check usage: {}", e))?;

    Ok(Some(BatchDetail {
        id: batch.id,
        name: batch.name,
        yield_qty: batch.yield_qty,
        yield_unit: batch.yield_unit,
        notes: batch.notes,
        ingredients,
        sub_batches,
        used_by_batch_ids,
        usage,
        created_at: batch.created_at,
        updated_at: batch.updated_at,
    }))
}

/// List batches, optionally filtered by name
pub fn list_batches(db: &Database, query: Option<&str>) -> Result<ListBatchesResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let batches = BatchRecipe::list(&conn, query.map(str::trim).filter(|q| !q.is_empty()))
        .map_err(|e| format!("Failed to list batches: {}", e))?;

    let mut summaries = Vec::with_capacity(batches.len());
    for batch in batches {
        let ingredient_count = BatchIngredient::get_for_batch(&conn, batch.id)
            .map_err(|e| format!("Failed to get ingredients: {}", e))?
            .len();
        let sub_batch_count = BatchSubBatch::get_for_batch(&conn, batch.id)
            .map_err(|e| format!("Failed to get sub-batches: {}", e))?
            .len();

        summaries.push(BatchSummary {
            id: batch.id,
            name: batch.name,
            yield_qty: batch.yield_qty,
            yield_unit: batch.yield_unit,
            ingredient_count,
            sub_batch_count,
        });
    }

    let count = summaries.len();
    Ok(ListBatchesResponse { batches: summaries, count })
}

/// Update a batch's name, yield, or notes.
///
/// Changing the yield unit to another dimension is refused while parent
/// batches or menu items consume this batch in units of the old dimension.
pub fn update_batch(db: &Database, id: i64, mut data: BatchRecipeUpdate) -> Result<Option<BatchRecipe>, String> {
    if let Some(name) = data.name.take() {
        data.name = Some(validate_name("Batch", &name)?);
    }
    if let Some(yield_qty) = data.yield_qty {
        validate_positive("yield_qty", yield_qty)?;
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let existing = match BatchRecipe::get_by_id(&conn, id).map_err(|e| format!("Database error: {}", e))? {
        Some(batch) => batch,
        None => return Ok(None),
    };

    if let Some(ref name) = data.name {
        let clash = BatchRecipe::get_by_name(&conn, name).map_err(|e| format!("Database error: {}", e))?;
        if clash.map_or(false, |other| other.id != id) {
            return Err(format!("Batch already exists: {}", name));
        }
    }

    if let Some(yield_unit) = data.yield_unit {
        if !same_dimension(yield_unit, existing.yield_unit) {
            let incompatible = incompatible_consumer_count(&conn, id, yield_unit)
                .map_err(|e| format!("Failed to check usage: {}", e))?;
            if incompatible > 0 {
                return Err(format!(
                    "Cannot change yield unit of {} to '{}': {} line(s) consume it in {} units",
                    existing.name,
                    yield_unit,
                    incompatible,
                    existing.yield_unit.dimension()
                ));
            }
        }
    }

    BatchRecipe::update(&conn, id, &data).map_err(|e| format!("Failed to update batch: {}", e))
}

/// Delete a batch (blocked while another batch or a menu item consumes it)
pub fn delete_batch(
    db: &Database,
    id: i64,
) -> Result<Result<BatchDeleteSuccessResponse, BatchDeleteBlockedResponse>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let batch = BatchRecipe::get_by_id(&conn, id).map_err(|e| format!("Database error: {}", e))?;
    if batch.is_none() {
        return Err(format!("Batch not found with id: {}", id));
    }

    let usage = BatchRecipe::usage(&conn, id).map_err(|e| format!("Failed to check usage: {}", e))?;
    if usage.is_used() {
        let mut reasons = Vec::new();
        if usage.parent_batches > 0 {
            reasons.push(format!("used as sub-batch in {} batch line(s)", usage.parent_batches));
        }
        if usage.menu_items > 0 {
            reasons.push(format!("portioned on {} menu line(s)", usage.menu_items));
        }
        return Ok(Err(BatchDeleteBlockedResponse {
            error: format!("Cannot delete batch: {}", reasons.join(", ")),
            parent_batch_count: usage.parent_batches,
            menu_item_count: usage.menu_items,
        }));
    }

    // Own ingredient and sub-batch lines cascade
    BatchRecipe::delete(&conn, id).map_err(|e| format!("Failed to delete batch: {}", e))?;

    Ok(Ok(BatchDeleteSuccessResponse {
        success: true,
        deleted_id: id,
    }))
}

// ============================================================================
// Batch Ingredient Tools
// ============================================================================

/// Add an inventory item to a batch
pub fn add_batch_ingredient(db: &Database, data: BatchIngredientCreate) -> Result<BatchIngredient, String> {
    validate_positive("qty", data.qty)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if BatchRecipe::get_by_id(&conn, data.batch_id)
        .map_err(|e| format!("Database error checking batch: {}", e))?
        .is_none()
    {
        return Err(format!("Batch not found with id: {}", data.batch_id));
    }

    let item = InventoryItem::get_by_id(&conn, data.item_id)
        .map_err(|e| format!("Database error checking inventory item: {}", e))?
        .ok_or_else(|| format!("Inventory item not found with id: {}", data.item_id))?;
    validate_line_unit(data.unit, item.unit, &item.name)?;

    let existing = BatchIngredient::get_for_batch(&conn, data.batch_id)
        .map_err(|e| format!("Database error checking existing ingredients: {}", e))?;
    if existing.iter().any(|i| i.item_id == data.item_id) {
        return Err(format!(
            "{} is already an ingredient in batch {}. Use update_batch_ingredient to change the quantity.",
            item.name, data.batch_id
        ));
    }

    BatchIngredient::create(&conn, &data).map_err(|e| format!("Failed to add ingredient: {}", e))
}

/// Update the quantity or unit of a batch ingredient
pub fn update_batch_ingredient(
    db: &Database,
    id: i64,
    data: BatchIngredientUpdate,
) -> Result<Option<BatchIngredient>, String> {
    if let Some(qty) = data.qty {
        validate_positive("qty", qty)?;
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let line = match BatchIngredient::get_by_id(&conn, id).map_err(|e| format!("Database error: {}", e))? {
        Some(line) => line,
        None => return Ok(None),
    };

    if let Some(unit) = data.unit {
        let item = InventoryItem::get_by_id(&conn, line.item_id)
            .map_err(|e| format!("Database error checking inventory item: {}", e))?
            .ok_or_else(|| format!("Inventory item not found with id: {}", line.item_id))?;
        validate_line_unit(unit, item.unit, &item.name)?;
    }

    BatchIngredient::update(&conn, id, &data).map_err(|e| format!("Failed to update ingredient: {}", e))
}

pub fn remove_batch_ingredient(db: &Database, id: i64) -> Result<bool, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    BatchIngredient::delete(&conn, id).map_err(|e| format!("Failed to remove ingredient: {}", e))
}

// ============================================================================
// Sub-Batch Tools
// ============================================================================

/// Use one batch as a component of another
pub fn add_sub_batch(db: &Database, data: BatchSubBatchCreate) -> Result<AddSubBatchResponse, String> {
    validate_positive("qty", data.qty)?;
    if data.parent_batch_id == data.child_batch_id {
        return Err("A batch cannot include itself as a sub-batch".to_string());
    }

    // Checks and insert share one write lock so concurrent edges cannot close a cycle
    let (edge, child) = db
        .with_write_transaction(|tx| {
            if BatchRecipe::get_by_id(tx, data.parent_batch_id)?.is_none() {
                return Err(DbError::Invalid(format!("Batch not found with id: {}", data.parent_batch_id)));
            }

            let child = BatchRecipe::get_by_id(tx, data.child_batch_id)?
                .ok_or_else(|| DbError::Invalid(format!("Sub-batch not found with id: {}", data.child_batch_id)))?;
            validate_line_unit(data.unit, child.yield_unit, &child.name).map_err(DbError::Invalid)?;

            let existing = BatchSubBatch::get_for_batch(tx, data.parent_batch_id)?;
            if existing.iter().any(|e| e.child_batch_id == data.child_batch_id) {
                return Err(DbError::Invalid(format!(
                    "{} is already a sub-batch of batch {}. Use update_sub_batch to change the quantity.",
                    child.name, data.parent_batch_id
                )));
            }

            let edge = BatchSubBatch::create(tx, &data)?;
            Ok((edge, child))
        })
        .map_err(|e| match e {
            DbError::Invalid(message) => message,
            DbError::CycleDetected { .. } => format!("Cannot add sub-batch: {}", e),
            _ => format!("Failed to add sub-batch: {}", e),
        })?;

    Ok(AddSubBatchResponse {
        id: edge.id,
        parent_batch_id: edge.parent_batch_id,
        child_batch_id: edge.child_batch_id,
        child_batch_name: child.name,
        qty: edge.qty,
        unit: edge.unit,
    })
}

/// Update the quantity or unit of a sub-batch line
pub fn update_sub_batch(
    db: &Database,
    id: i64,
    data: BatchSubBatchUpdate,
) -> Result<Option<BatchSubBatch>, String> {
    if let Some(qty) = data.qty {
        validate_positive("qty", qty)?;
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let edge = match BatchSubBatch::get_by_id(&conn, id).map_err(|e| format!("Database error: {}", e))? {
        Some(edge) => edge,
        None => return Ok(None),
    };

    if let Some(unit) = data.unit {
        let child = BatchRecipe::get_by_id(&conn, edge.child_batch_id)
            .map_err(|e| format!("Database error checking sub-batch: {}", e))?
            .ok_or_else(|| format!("Sub-batch not found with id: {}", edge.child_batch_id))?;
        validate_line_unit(unit, child.yield_unit, &child.name)?;
    }

    BatchSubBatch::update(&conn, id, &data).map_err(|e| format!("Failed to update sub-batch: {}", e))
}

pub fn remove_sub_batch(db: &Database, id: i64) -> Result<bool, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    BatchSubBatch::delete(&conn, id).map_err(|e| format!("Failed to remove sub-batch: {}", e))
}

/// Lines consuming the batch in a unit that would not convert to `unit`
fn incompatible_consumer_count(conn: &Connection, batch_id: i64, unit: Unit) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare(
        r#"
        SELECT unit FROM batch_sub_batches WHERE child_batch_id = ?1
        UNION ALL
        SELECT portion_unit FROM menu_batch_portions WHERE batch_id = ?1
        "#,
    )?;
    let units = stmt
        .query_map([batch_id], |row| row.get::<_, Unit>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(units.into_iter().filter(|u| !same_dimension(*u, unit)).count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InventoryItemCreate, MenuBatchPortion, MenuBatchPortionCreate, MenuItem, MenuItemCreate};
    use crate::tools::test_database;

    fn batch(db: &Database, name: &str, yield_qty: f64, yield_unit: Unit) -> BatchRecipe {
        create_batch(
            db,
            BatchRecipeCreate { name: name.to_string(), yield_qty, yield_unit, notes: None },
        )
        .unwrap()
    }

    fn oil(db: &Database) -> InventoryItem {
        db.with_conn(|conn| {
            InventoryItem::create(
                conn,
                &InventoryItemCreate { name: "Olive Oil".to_string(), unit: Unit::Ml, unit_cost: 0.004 },
            )
        })
        .unwrap()
    }

    fn sub(parent: i64, child: i64, qty: f64, unit: Unit) -> BatchSubBatchCreate {
        BatchSubBatchCreate { parent_batch_id: parent, child_batch_id: child, qty, unit }
    }

    #[test]
    fn test_create_batch_validation() {
        let db = test_database();
        let zero_yield = BatchRecipeCreate {
            name: "Stock".to_string(),
            yield_qty: 0.0,
            yield_unit: Unit::L,
            notes: None,
        };
        assert!(create_batch(&db, zero_yield).is_err());

        batch(&db, "Stock", 4.0, Unit::L);
        let dup = BatchRecipeCreate {
            name: "Stock ".to_string(),
            yield_qty: 1.0,
            yield_unit: Unit::L,
            notes: None,
        };
        assert!(create_batch(&db, dup).unwrap_err().contains("already exists"));
    }

    #[test]
    fn test_ingredient_unit_must_match_item_dimension() {
        let db = test_database();
        let dressing = batch(&db, "Dressing", 1.0, Unit::L);
        let oil = oil(&db);

        let wrong = BatchIngredientCreate { batch_id: dressing.id, item_id: oil.id, qty: 100.0, unit: Unit::G };
        assert!(add_batch_ingredient(&db, wrong).is_err());

        let right = BatchIngredientCreate { batch_id: dressing.id, item_id: oil.id, qty: 0.5, unit: Unit::L };
        let line = add_batch_ingredient(&db, right.clone()).unwrap();
        assert_eq!(line.unit, Unit::L);
        assert!(add_batch_ingredient(&db, right).unwrap_err().contains("already an ingredient"));

        let bad_update = BatchIngredientUpdate { qty: None, unit: Some(Unit::Kg) };
        assert!(update_batch_ingredient(&db, line.id, bad_update).is_err());
        let update = BatchIngredientUpdate { qty: Some(250.0), unit: Some(Unit::Ml) };
        let updated = update_batch_ingredient(&db, line.id, update).unwrap().unwrap();
        assert_eq!(updated.qty, 250.0);

        assert!(remove_batch_ingredient(&db, line.id).unwrap());
        assert!(!remove_batch_ingredient(&db, line.id).unwrap());
    }

    #[test]
    fn test_sub_batch_rules() {
        let db = test_database();
        let stock = batch(&db, "Stock", 4.0, Unit::L);
        let soup = batch(&db, "Soup", 6.0, Unit::L);
        let stew = batch(&db, "Stew", 3.0, Unit::Kg);

        assert!(add_sub_batch(&db, sub(soup.id, soup.id, 1.0, Unit::L)).is_err());
        assert!(add_sub_batch(&db, sub(soup.id, stock.id, 500.0, Unit::G)).is_err());

        let edge = add_sub_batch(&db, sub(soup.id, stock.id, 2.0, Unit::L)).unwrap();
        assert_eq!(edge.child_batch_name, "Stock");
        add_sub_batch(&db, sub(stew.id, soup.id, 1.0, Unit::L)).unwrap();

        let err = add_sub_batch(&db, sub(stock.id, stew.id, 100.0, Unit::G)).unwrap_err();
        assert!(err.contains("circular"));

        let detail = get_batch(&db, soup.id).unwrap().unwrap();
        assert_eq!(detail.sub_batches.len(), 1);
        assert_eq!(detail.used_by_batch_ids, vec![stew.id]);
        assert_eq!(detail.usage.parent_batches, 1);
    }

    #[test]
    fn test_delete_batch_blocked_while_consumed() {
        let db = test_database();
        let stock = batch(&db, "Stock", 4.0, Unit::L);
        let soup = batch(&db, "Soup", 6.0, Unit::L);
        add_sub_batch(&db, sub(soup.id, stock.id, 2.0, Unit::L)).unwrap();

        let blocked = delete_batch(&db, stock.id).unwrap().unwrap_err();
        assert_eq!(blocked.parent_batch_count, 1);

        // Deleting the parent cascades its edge and frees the child
        delete_batch(&db, soup.id).unwrap().unwrap();
        delete_batch(&db, stock.id).unwrap().unwrap();
        assert_eq!(list_batches(&db, None).unwrap().count, 0);
    }

    #[test]
    fn test_yield_unit_change_checks_consumers() {
        let db = test_database();
        let hummus = batch(&db, "Hummus", 4.0, Unit::Kg);
        db.with_conn(|conn| {
            let plate = MenuItem::create(
                conn,
                &MenuItemCreate { name: "Mezze".to_string(), price: 12.0, notes: None },
            )?;
            MenuBatchPortion::create(
                conn,
                &MenuBatchPortionCreate {
                    menu_item_id: plate.id,
                    batch_id: hummus.id,
                    portion_qty: 4.0,
                    portion_unit: Unit::Oz,
                },
            )
        })
        .unwrap();

        let to_lb = BatchRecipeUpdate { yield_qty: Some(9.0), yield_unit: Some(Unit::Lb), ..Default::default() };
        assert!(update_batch(&db, hummus.id, to_lb).unwrap().is_some());

        let to_l = BatchRecipeUpdate { yield_unit: Some(Unit::L), ..Default::default() };
        assert!(update_batch(&db, hummus.id, to_l).unwrap_err().contains("1 line"));
    }

    #[test]
    fn test_list_batches_counts_lines() {
        let db = test_database();
        let dressing = batch(&db, "Dressing", 1.0, Unit::L);
        let oil = oil(&db);
        add_batch_ingredient(
            &db,
            BatchIngredientCreate { batch_id: dressing.id, item_id: oil.id, qty: 800.0, unit: Unit::Ml },
        )
        .unwrap();

        let list = list_batches(&db, Some("dress")).unwrap();
        assert_eq!(list.count, 1);
        assert_eq!(list.batches[0].ingredient_count, 1);
        assert_eq!(list.batches[0].sub_batch_count, 0);
    }

    #[test]
    fn test_opposite_sub_batches_added_concurrently_never_both_stick() {
        use std::sync::{Arc, Barrier};
        use std::thread;

        let path = std::env::temp_dir().join(format!("boh-sub-batch-{}.db", std::process::id()));
        let db = Database::new(&path).unwrap();
        db.with_conn(|conn| crate::db::migrations::run_migrations(conn)).unwrap();

        for round in 0..20 {
            let a = batch(&db, &format!("Sauce {}", round), 1.0, Unit::L);
            let b = batch(&db, &format!("Base {}", round), 1.0, Unit::L);

            let barrier = Arc::new(Barrier::new(2));
            let handles: Vec<_> = [(a.id, b.id), (b.id, a.id)]
                .into_iter()
                .map(|(parent, child)| {
                    let db = db.clone();
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        add_sub_batch(&db, sub(parent, child, 100.0, Unit::Ml))
                    })
                })
                .collect();
            let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

            assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1, "round {}", round);
            let rejected = results.iter().find_map(|r| r.as_ref().err()).unwrap();
            assert!(rejected.contains("circular"), "round {}: {}", round, rejected);
            assert!(crate::tools::costing::get_batch_cost(&db, a.id).unwrap().is_some());
        }

        drop(db);
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }
}
