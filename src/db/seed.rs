//! Demo kitchen data
//!
//! Three inventory items, one marinade batch, and one plate that uses both a
//! raw item and a portion of the batch.

use rusqlite::Connection;
use serde::Serialize;

use crate::conversion::Unit;
use crate::models::{
    BatchIngredient, BatchIngredientCreate, BatchRecipe, BatchRecipeCreate, InventoryItem,
    InventoryItemCreate, MenuBatchPortion, MenuBatchPortionCreate, MenuIngredient,
    MenuIngredientCreate, MenuItem, MenuItemCreate,
};

use super::DbResult;

/// What seeding created
#[derive(Debug, Clone, Serialize)]
pub struct SeedSummary {
    pub inventory_items: usize,
    pub batch_recipes: usize,
    pub menu_items: usize,
}

/// Insert the demo kitchen when the inventory is empty.
///
/// Returns `None` without touching anything if inventory items already exist.
pub fn seed_demo(conn: &Connection) -> DbResult<Option<SeedSummary>> {
    if InventoryItem::count(conn)? > 0 {
        tracing::info!("Inventory not empty, skipping demo seed");
        return Ok(None);
    }

    let item = |name: &str, unit: Unit, unit_cost: f64| {
        InventoryItem::create(conn, &InventoryItemCreate { name: name.to_string(), unit, unit_cost })
    };
    let rice = item("Rice", Unit::G, 0.003)?;
    let chicken = item("Chicken", Unit::Lb, 2.50)?;
    let oil = item("Olive Oil", Unit::Ml, 0.004)?;

    let marinade = BatchRecipe::create(
        conn,
        &BatchRecipeCreate {
            name: "Chicken Shawarma Marinade".to_string(),
            yield_qty: 18144.0,
            yield_unit: Unit::G,
            notes: Some("~40 lb batch".to_string()),
        },
    )?;
    for (item_id, qty, unit) in [(chicken.id, 40.0, Unit::Lb), (oil.id, 500.0, Unit::Ml)] {
        BatchIngredient::create(
            conn,
            &BatchIngredientCreate { batch_id: marinade.id, item_id, qty, unit },
        )?;
    }

    let plate = MenuItem::create(
        conn,
        &MenuItemCreate {
            name: "Shawarma Plate".to_string(),
            price: 16.99,
            notes: Some("Includes rice".to_string()),
        },
    )?;
    MenuIngredient::create(
        conn,
        &MenuIngredientCreate { menu_item_id: plate.id, item_id: rice.id, qty: 180.0, unit: Unit::G },
    )?;
    MenuBatchPortion::create(
        conn,
        &MenuBatchPortionCreate {
            menu_item_id: plate.id,
            batch_id: marinade.id,
            portion_qty: 180.0,
            portion_unit: Unit::G,
        },
    )?;

    tracing::info!("Seeded demo kitchen");
    Ok(Some(SeedSummary {
        inventory_items: 3,
        batch_recipes: 1,
        menu_items: 1,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costing;
    use crate::db::migrations::test_connection;

    #[test]
    fn test_seed_only_once() {
        let conn = test_connection();
        assert!(seed_demo(&conn).unwrap().is_some());
        assert!(seed_demo(&conn).unwrap().is_none());
        assert_eq!(InventoryItem::count(&conn).unwrap(), 3);
    }

    #[test]
    fn test_seeded_plate_cost() {
        let conn = test_connection();
        seed_demo(&conn).unwrap();

        let plate = MenuItem::get_by_name(&conn, "Shawarma Plate").unwrap().unwrap();
        let cost = costing::menu_item_cost(&conn, plate.id).unwrap();

        let expected = 180.0 * 0.003 + (180.0 / 18144.0) * (40.0 * 2.50 + 500.0 * 0.004);
        assert!((cost.total_cost - expected).abs() < 1e-9);
        assert!(cost.food_cost_percent.unwrap() < 10.0);
    }
}
