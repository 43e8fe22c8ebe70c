//! Menu MCP Tools
//!
//! Tools for managing menu items and what goes on the plate: inventory
//! items directly, and portions of batch recipes.

use serde::Serialize;

use crate::db::Database;
use crate::models::{
    BatchRecipe, InventoryItem, MenuBatchPortion, MenuBatchPortionCreate, MenuBatchPortionDetail,
    MenuIngredient, MenuIngredientCreate, MenuIngredientDetail, MenuItem, MenuItemCreate,
    MenuItemUpdate,
};

use super::{validate_line_unit, validate_name, validate_non_negative, validate_positive};

/// Full menu item detail with its plate lines
#[derive(Debug, Serialize)]
pub struct MenuItemDetail {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub notes: Option<String>,
    pub ingredients: Vec<MenuIngredientDetail>,
    pub batch_portions: Vec<MenuBatchPortionDetail>,
    pub created_at: String,
    pub updated_at: String,
}

/// Menu item summary for listing
#[derive(Debug, Serialize)]
pub struct MenuItemSummary {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub ingredient_count: usize,
    pub batch_portion_count: usize,
}

/// Response for list_menu_items
#[derive(Debug, Serialize)]
pub struct ListMenuItemsResponse {
    pub menu_items: Vec<MenuItemSummary>,
    pub count: usize,
}

/// Response for successful delete
#[derive(Debug, Serialize)]
pub struct MenuItemDeleteResponse {
    pub success: bool,
    pub deleted_id: i64,
}

/// Create a new menu item
pub fn create_menu_item(db: &Database, data: MenuItemCreate) -> Result<MenuItem, String> {
    let name = validate_name("Menu item", &data.name)?;
    validate_non_negative("price", data.price)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if MenuItem::get_by_name(&conn, &name)
        .map_err(|e| format!("Database error: {}", e))?
        .is_some()
    {
        return Err(format!("Menu item already exists: {}", name));
    }

    let menu_item = MenuItem::create(&conn, &MenuItemCreate { name, ..data })
        .map_err(|e| format!("Failed to create menu item: {}", e))?;

    tracing::info!(id = menu_item.id, name = %menu_item.name, price = menu_item.price, "Created menu item");
    Ok(menu_item)
}

pub fn get_menu_item(db: &Database, id: i64) -> Result<Option<MenuItemDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let menu_item = match MenuItem::get_by_id(&conn, id).map_err(|e| format!("Failed to get menu item: {}", e))? {
        Some(m) => m,
        None => return Ok(None),
    };

    let ingredients = MenuIngredient::get_details_for_menu_item(&conn, id)
        .map_err(|e| format!("Failed to get ingredients: {}", e))?;
    let batch_portions = MenuBatchPortion::get_details_for_menu_item(&conn, id)
        .map_err(|e| format!("Failed to get batch portions: {}", e))?;

    Ok(Some(MenuItemDetail {
        id: menu_item.id,
        name: menu_item.name,
        price: menu_item.price,
        notes: menu_item.notes,
        ingredients,
        batch_portions,
        created_at: menu_item.created_at,
        updated_at: menu_item.updated_at,
    }))
}

/// List menu items, optionally filtered by name
pub fn list_menu_items(db: &Database, query: Option<&str>) -> Result<ListMenuItemsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let menu_items = MenuItem::list(&conn, query.map(str::trim).filter(|q| !q.is_empty()))
        .map_err(|e| format!("Failed to list menu items: {}", e))?;

    let mut summaries = Vec::with_capacity(menu_items.len());
    for menu_item in menu_items {
        let ingredient_count = MenuIngredient::get_for_menu_item(&conn, menu_item.id)
            .map_err(|e| format!("Failed to get ingredients: {}", e))?
            .len();
        let batch_portion_count = MenuBatchPortion::get_for_menu_item(&conn, menu_item.id)
            .map_err(|e| format!("Failed to get batch portions: {}", e))?
            .len();

        summaries.push(MenuItemSummary {
            id: menu_item.id,
            name: menu_item.name,
            price: menu_item.price,
            ingredient_count,
            batch_portion_count,
        });
    }

    let count = summaries.len();
    Ok(ListMenuItemsResponse { menu_items: summaries, count })
}

pub fn update_menu_item(db: &Database, id: i64, mut data: MenuItemUpdate) -> Result<Option<MenuItem>, String> {
    if let Some(name) = data.name.take() {
        data.name = Some(validate_name("Menu item", &name)?);
    }
    if let Some(price) = data.price {
        validate_non_negative("price", price)?;
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if let Some(ref name) = data.name {
        let clash = MenuItem::get_by_name(&conn, name).map_err(|e| format!("Database error: {}", e))?;
        if clash.map_or(false, |other| other.id != id) {
            return Err(format!("Menu item already exists: {}", name));
        }
    }

    MenuItem::update(&conn, id, &data).map_err(|e| format!("Failed to update menu item: {}", e))
}

/// Delete a menu item and its plate lines
pub fn delete_menu_item(db: &Database, id: i64) -> Result<MenuItemDeleteResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let deleted = MenuItem::delete(&conn, id).map_err(|e| format!("Failed to delete menu item: {}", e))?;
    if !deleted {
        return Err(format!("Menu item not found with id: {}", id));
    }

    Ok(MenuItemDeleteResponse {
        success: true,
        deleted_id: id,
    })
}

// ============================================================================
// Plate Line Tools
// ============================================================================

/// Put an inventory item directly on a menu item
pub fn add_menu_ingredient(db: &Database, data: MenuIngredientCreate) -> Result<MenuIngredient, String> {
    validate_positive("qty", data.qty)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if MenuItem::get_by_id(&conn, data.menu_item_id)
        .map_err(|e| format!("Database error checking menu item: {}", e))?
        .is_none()
    {
        return Err(format!("Menu item not found with id: {}", data.menu_item_id));
    }

    let item = InventoryItem::get_by_id(&conn, data.item_id)
        .map_err(|e| format!("Database error checking inventory item: {}", e))?
        .ok_or_else(|| format!("Inventory item not found with id: {}", data.item_id))?;
    validate_line_unit(data.unit, item.unit, &item.name)?;

    MenuIngredient::create(&conn, &data).map_err(|e| format!("Failed to add ingredient: {}", e))
}

pub fn remove_menu_ingredient(db: &Database, id: i64) -> Result<bool, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    MenuIngredient::delete(&conn, id).map_err(|e| format!("Failed to remove ingredient: {}", e))
}

/// Serve a portion of a batch recipe on a menu item
pub fn add_menu_batch_portion(db: &Database, data: MenuBatchPortionCreate) -> Result<MenuBatchPortion, String> {
    validate_positive("portion_qty", data.portion_qty)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if MenuItem::get_by_id(&conn, data.menu_item_id)
        .map_err(|e| format!("Database error checking menu item: {}", e))?
        .is_none()
    {
        return Err(format!("Menu item not found with id: {}", data.menu_item_id));
    }

    let batch = BatchRecipe::get_by_id(&conn, data.batch_id)
        .map_err(|e| format!("Database error checking batch: {}", e))?
        .ok_or_else(|| format!("Batch not found with id: {}", data.batch_id))?;
    validate_line_unit(data.portion_unit, batch.yield_unit, &batch.name)?;

    MenuBatchPortion::create(&conn, &data).map_err(|e| format!("Failed to add batch portion: {}", e))
}

pub fn remove_menu_batch_portion(db: &Database, id: i64) -> Result<bool, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    MenuBatchPortion::delete(&conn, id).map_err(|e| format!("Failed to remove batch portion: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::Unit;
    use crate::models::{BatchRecipeCreate, InventoryItemCreate};
    use crate::tools::test_database;

    fn plate(db: &Database) -> MenuItem {
        create_menu_item(
            db,
            MenuItemCreate {
                name: "Shawarma Plate".to_string(),
                price: 16.99,
                notes: Some("Includes rice".to_string()),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_create_menu_item_validation() {
        let db = test_database();
        let negative = MenuItemCreate { name: "Soup".to_string(), price: -1.0, notes: None };
        assert!(create_menu_item(&db, negative).is_err());

        let free = MenuItemCreate { name: "Bread".to_string(), price: 0.0, notes: None };
        assert_eq!(create_menu_item(&db, free).unwrap().price, 0.0);

        plate(&db);
        let dup = MenuItemCreate { name: "Shawarma Plate".to_string(), price: 1.0, notes: None };
        assert!(create_menu_item(&db, dup).is_err());
    }

    #[test]
    fn test_plate_lines() {
        let db = test_database();
        let plate = plate(&db);
        let (rice, marinade) = db
            .with_conn(|conn| {
                let rice = InventoryItem::create(
                    conn,
                    &InventoryItemCreate { name: "Rice".to_string(), unit: Unit::G, unit_cost: 0.003 },
                )?;
                let marinade = BatchRecipe::create(
                    conn,
                    &BatchRecipeCreate {
                        name: "Marinade".to_string(),
                        yield_qty: 18144.0,
                        yield_unit: Unit::G,
                        notes: None,
                    },
                )?;
                Ok((rice, marinade))
            })
            .unwrap();

        let wrong = MenuIngredientCreate { menu_item_id: plate.id, item_id: rice.id, qty: 1.0, unit: Unit::Ml };
        assert!(add_menu_ingredient(&db, wrong).is_err());
        add_menu_ingredient(
            &db,
            MenuIngredientCreate { menu_item_id: plate.id, item_id: rice.id, qty: 180.0, unit: Unit::G },
        )
        .unwrap();

        let zero = MenuBatchPortionCreate {
            menu_item_id: plate.id,
            batch_id: marinade.id,
            portion_qty: 0.0,
            portion_unit: Unit::G,
        };
        assert!(add_menu_batch_portion(&db, zero).is_err());
        let portion = add_menu_batch_portion(
            &db,
            MenuBatchPortionCreate {
                menu_item_id: plate.id,
                batch_id: marinade.id,
                portion_qty: 6.0,
                portion_unit: Unit::Oz,
            },
        )
        .unwrap();

        let detail = get_menu_item(&db, plate.id).unwrap().unwrap();
        assert_eq!(detail.ingredients[0].item_name, "Rice");
        assert_eq!(detail.batch_portions[0].batch_name, "Marinade");
        assert_eq!(detail.batch_portions[0].batch_yield_unit, Unit::G);

        assert!(remove_menu_batch_portion(&db, portion.id).unwrap());
        let list = list_menu_items(&db, None).unwrap();
        assert_eq!(list.menu_items[0].ingredient_count, 1);
        assert_eq!(list.menu_items[0].batch_portion_count, 0);
    }

    #[test]
    fn test_delete_menu_item() {
        let db = test_database();
        let plate = plate(&db);
        assert!(delete_menu_item(&db, plate.id).unwrap().success);
        assert!(delete_menu_item(&db, plate.id).is_err());
        assert!(get_menu_item(&db, plate.id).unwrap().is_none());
    }

    #[test]
    fn test_rename_clash() {
        let db = test_database();
        plate(&db);
        let soup = create_menu_item(
            &db,
            MenuItemCreate { name: "Lentil Soup".to_string(), price: 7.5, notes: None },
        )
        .unwrap();
        let rename = MenuItemUpdate { name: Some("Shawarma Plate".to_string()), ..Default::default() };
        assert!(update_menu_item(&db, soup.id, rename).is_err());

        let reprice = MenuItemUpdate { price: Some(8.0), ..Default::default() };
        assert_eq!(update_menu_item(&db, soup.id, reprice).unwrap().unwrap().price, 8.0);
    }
}
