//! Inventory Item model
//!
//! A purchased raw ingredient with a cost per storage unit.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::conversion::Unit;
use crate::db::{DbError, DbResult};

/// A raw ingredient priced per storage unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: i64,
    pub name: String,
    pub unit: Unit,
    pub unit_cost: f64,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a new inventory item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItemCreate {
    pub name: String,
    pub unit: Unit,
    #[serde(default)]
    pub unit_cost: f64,
}

/// Data for updating an inventory item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryItemUpdate {
    pub name: Option<String>,
    pub unit: Option<Unit>,
    pub unit_cost: Option<f64>,
}

impl InventoryItem {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            unit: row.get("unit")?,
            unit_cost: row.get("unit_cost")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert a new inventory item
    pub fn create(conn: &Connection, data: &InventoryItemCreate) -> DbResult<Self> {
        conn.execute(
            "INSERT INTO inventory_items (name, unit, unit_cost) VALUES (?1, ?2, ?3)",
            params![data.name, data.unit, data.unit_cost],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let item = conn
            .query_row("SELECT * FROM inventory_items WHERE id = ?1", [id], Self::from_row)
            .optional()?;
        Ok(item)
    }

    pub fn get_by_name(conn: &Connection, name: &str) -> DbResult<Option<Self>> {
        let item = conn
            .query_row("SELECT * FROM inventory_items WHERE name = ?1", [name], Self::from_row)
            .optional()?;
        Ok(item)
    }

    /// List all inventory items, optionally filtered by a name substring
    pub fn list(conn: &Connection, query: Option<&str>) -> DbResult<Vec<Self>> {
        let items = match query {
            Some(q) => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM inventory_items WHERE name LIKE ?1 ORDER BY name",
                )?;
                let pattern = format!("%{}%", q);
                let rows = stmt.query_map([pattern], Self::from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare("SELECT * FROM inventory_items ORDER BY name")?;
                let rows = stmt.query_map([], Self::from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(items)
    }

    pub fn update(conn: &Connection, id: i64, data: &InventoryItemUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref name) = data.name {
            updates.push(format!("name = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(name.clone()));
        }
        if let Some(unit) = data.unit {
            updates.push(format!("unit = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(unit));
        }
        if let Some(unit_cost) = data.unit_cost {
            updates.push(format!("unit_cost = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(unit_cost));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE inventory_items SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );
        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Number of batch and menu lines referencing this item
    pub fn usage_count(conn: &Connection, id: i64) -> DbResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT (SELECT COUNT(*) FROM batch_ingredients WHERE item_id = ?1)
                  + (SELECT COUNT(*) FROM menu_ingredients WHERE item_id = ?1)",
            [id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete an item. Fails with a foreign key error while lines reference it.
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM inventory_items WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    pub fn count(conn: &Connection) -> DbResult<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM inventory_items", [], |row| row.get(0))?;
        Ok(count)
    }
}
