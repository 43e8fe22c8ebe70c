//! Menu Ingredient model
//!
//! An inventory item plated directly on a menu item.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::conversion::Unit;
use crate::db::{DbError, DbResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuIngredient {
    pub id: i64,
    pub menu_item_id: i64,
    pub item_id: i64,
    pub qty: f64,
    pub unit: Unit,
    pub created_at: String,
    pub updated_at: String,
}

/// Menu ingredient with the inventory item's name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuIngredientDetail {
    pub id: i64,
    pub item_id: i64,
    pub item_name: String,
    pub qty: f64,
    pub unit: Unit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuIngredientCreate {
    pub menu_item_id: i64,
    pub item_id: i64,
    pub qty: f64,
    pub unit: Unit,
}

impl MenuIngredient {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            menu_item_id: row.get("menu_item_id")?,
            item_id: row.get("item_id")?,
            qty: row.get("qty")?,
            unit: row.get("unit")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn create(conn: &Connection, data: &MenuIngredientCreate) -> DbResult<Self> {
        conn.execute(
            "INSERT INTO menu_ingredients (menu_item_id, item_id, qty, unit) VALUES (?1, ?2, ?3, ?4)",
            params![data.menu_item_id, data.item_id, data.qty, data.unit],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let line = conn
            .query_row("SELECT * FROM menu_ingredients WHERE id = ?1", [id], Self::from_row)
            .optional()?;
        Ok(line)
    }

    pub fn get_for_menu_item(conn: &Connection, menu_item_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt =
            conn.prepare("SELECT * FROM menu_ingredients WHERE menu_item_id = ?1 ORDER BY id")?;
        let lines = stmt
            .query_map([menu_item_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    pub fn get_details_for_menu_item(conn: &Connection, menu_item_id: i64) -> DbResult<Vec<MenuIngredientDetail>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT mi.id, mi.item_id, ii.name AS item_name, mi.qty, mi.unit
            FROM menu_ingredients mi
            INNER JOIN inventory_items ii ON mi.item_id = ii.id
            WHERE mi.menu_item_id = ?1
            ORDER BY mi.id
            "#,
        )?;

        let details = stmt
            .query_map([menu_item_id], |row| {
                Ok(MenuIngredientDetail {
                    id: row.get("id")?,
                    item_id: row.get("item_id")?,
                    item_name: row.get("item_name")?,
                    qty: row.get("qty")?,
                    unit: row.get("unit")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(details)
    }

    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM menu_ingredients WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}
