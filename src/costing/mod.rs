//! Cost rollup
//!
//! Builds a [`CostGraph`] from the database and evaluates batch and menu item
//! costs over it. Costs are computed fresh on every call, so they always
//! reflect the current inventory prices.

pub mod evaluator;
pub mod graph;

pub use evaluator::{
    BatchCost, CostError, CostEvaluator, CostIssue, LineCost, LineKind, MenuItemCost,
};
pub use graph::{BatchNode, CostGraph, IngredientLine, ItemNode, MenuNode, PortionLine};

use rusqlite::Connection;

use crate::models::MenuItem;

/// Cost breakdown of one batch recipe
pub fn batch_cost(conn: &Connection, batch_id: i64) -> Result<BatchCost, CostError> {
    let graph = CostGraph::load(conn)?;
    CostEvaluator::new(&graph).batch_cost(batch_id)
}

/// Cost breakdown of one menu item
pub fn menu_item_cost(conn: &Connection, menu_item_id: i64) -> Result<MenuItemCost, CostError> {
    let menu = CostGraph::load_menu_item(conn, menu_item_id)?
        .ok_or(CostError::UnknownMenuItem(menu_item_id))?;
    let graph = CostGraph::load(conn)?;
    CostEvaluator::new(&graph).menu_item_cost(&menu)
}

/// Cost of every batch recipe, ordered by name
pub fn all_batch_costs(conn: &Connection) -> Result<Vec<BatchCost>, CostError> {
    let graph = CostGraph::load(conn)?;
    let mut evaluator = CostEvaluator::new(&graph);
    graph
        .batch_ids()
        .into_iter()
        .map(|id| evaluator.batch_cost(id))
        .collect()
}

/// Cost of every menu item, ordered by name
pub fn all_menu_item_costs(conn: &Connection) -> Result<Vec<MenuItemCost>, CostError> {
    let graph = CostGraph::load(conn)?;
    let mut evaluator = CostEvaluator::new(&graph);
    let mut costs = Vec::new();

    for menu_item in MenuItem::list(conn, None)? {
        if let Some(menu) = CostGraph::load_menu_item(conn, menu_item.id)? {
            costs.push(evaluator.menu_item_cost(&menu)?);
        }
    }

    Ok(costs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::Unit;
    use crate::db::migrations::test_connection;
    use crate::models::*;

    /// The demo kitchen: rice, chicken, oil, a marinade batch, and one plate
    fn seed(conn: &Connection) -> (i64, i64) {
        let rice = InventoryItem::create(
            conn,
            &InventoryItemCreate { name: "Rice".to_string(), unit: Unit::G, unit_cost: 0.003 },
        )
        .unwrap();
        let chicken = InventoryItem::create(
            conn,
            &InventoryItemCreate { name: "Chicken".to_string(), unit: Unit::Lb, unit_cost: 2.50 },
        )
        .unwrap();
        let oil = InventoryItem::create(
            conn,
            &InventoryItemCreate { name: "Olive Oil".to_string(), unit: Unit::Ml, unit_cost: 0.004 },
        )
        .unwrap();

        let marinade = BatchRecipe::create(
            conn,
            &BatchRecipeCreate {
                name: "Chicken Shawarma Marinade".to_string(),
                yield_qty: 18144.0,
                yield_unit: Unit::G,
                notes: Some("~40 lb batch".to_string()),
            },
        )
        .unwrap();
        for (item_id, qty, unit) in [(chicken.id, 40.0, Unit::Lb), (oil.id, 500.0, Unit::Ml)] {
            BatchIngredient::create(
                conn,
                &BatchIngredientCreate { batch_id: marinade.id, item_id, qty, unit },
            )
            .unwrap();
        }

        let plate = MenuItem::create(
            conn,
            &MenuItemCreate {
                name: "Shawarma Plate".to_string(),
                price: 16.99,
                notes: Some("Includes rice".to_string()),
            },
        )
        .unwrap();
        MenuIngredient::create(
            conn,
            &MenuIngredientCreate { menu_item_id: plate.id, item_id: rice.id, qty: 180.0, unit: Unit::G },
        )
        .unwrap();
        MenuBatchPortion::create(
            conn,
            &MenuBatchPortionCreate {
                menu_item_id: plate.id,
                batch_id: marinade.id,
                portion_qty: 180.0,
                portion_unit: Unit::G,
            },
        )
        .unwrap();

        (marinade.id, plate.id)
    }

    #[test]
    fn test_demo_batch_cost() {
        let conn = test_connection();
        let (marinade_id, _) = seed(&conn);

        let cost = batch_cost(&conn, marinade_id).unwrap();
        assert!((cost.total_cost - 102.0).abs() < 1e-9);
        assert!((cost.cost_per_yield_unit - 102.0 / 18144.0).abs() < 1e-12);
        assert!(!cost.has_issues());
    }

    #[test]
    fn test_demo_plate_cost() {
        let conn = test_connection();
        let (_, plate_id) = seed(&conn);

        let cost = menu_item_cost(&conn, plate_id).unwrap();
        let expected = 180.0 * 0.003 + (180.0 / 18144.0) * (40.0 * 2.50 + 500.0 * 0.004);
        assert!((cost.total_cost - expected).abs() < 1e-9);
        assert!((cost.margin - (16.99 - expected)).abs() < 1e-9);
        assert_eq!(cost.lines.len(), 2);
    }

    #[test]
    fn test_price_change_flows_through_to_plate() {
        let conn = test_connection();
        let (_, plate_id) = seed(&conn);
        let before = menu_item_cost(&conn, plate_id).unwrap().total_cost;

        let chicken = InventoryItem::get_by_name(&conn, "Chicken").unwrap().unwrap();
        InventoryItem::update(
            &conn,
            chicken.id,
            &InventoryItemUpdate { name: None, unit: None, unit_cost: Some(5.00) },
        )
        .unwrap();

        let after = menu_item_cost(&conn, plate_id).unwrap().total_cost;
        assert!((after - before - (180.0 / 18144.0) * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_menu_item() {
        let conn = test_connection();
        assert!(matches!(menu_item_cost(&conn, 99), Err(CostError::UnknownMenuItem(99))));
    }

    #[test]
    fn test_all_costs() {
        let conn = test_connection();
        seed(&conn);
        assert_eq!(all_batch_costs(&conn).unwrap().len(), 1);
        let menu = all_menu_item_costs(&conn).unwrap();
        assert_eq!(menu.len(), 1);
        assert_eq!(menu[0].name, "Shawarma Plate");
    }
}
