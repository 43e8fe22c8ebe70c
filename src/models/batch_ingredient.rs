//! Batch Ingredient model
//!
//! An inventory item used in a batch recipe, in any unit of the item's dimension.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::conversion::Unit;
use crate::db::{DbError, DbResult};

/// A line linking an inventory item to a batch recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchIngredient {
    pub id: i64,
    pub batch_id: i64,
    pub item_id: i64,
    pub qty: f64,
    pub unit: Unit,
    pub created_at: String,
    pub updated_at: String,
}

/// Batch ingredient with the inventory item's name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchIngredientDetail {
    pub id: i64,
    pub item_id: i64,
    pub item_name: String,
    pub qty: f64,
    pub unit: Unit,
}

/// Data for adding an ingredient to a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchIngredientCreate {
    pub batch_id: i64,
    pub item_id: i64,
    pub qty: f64,
    pub unit: Unit,
}

/// Data for updating a batch ingredient
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchIngredientUpdate {
    pub qty: Option<f64>,
    pub unit: Option<Unit>,
}

impl BatchIngredient {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            batch_id: row.get("batch_id")?,
            item_id: row.get("item_id")?,
            qty: row.get("qty")?,
            unit: row.get("unit")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn create(conn: &Connection, data: &BatchIngredientCreate) -> DbResult<Self> {
        conn.execute(
            "INSERT INTO batch_ingredients (batch_id, item_id, qty, unit) VALUES (?1, ?2, ?3, ?4)",
            params![data.batch_id, data.item_id, data.qty, data.unit],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let line = conn
            .query_row("SELECT * FROM batch_ingredients WHERE id = ?1", [id], Self::from_row)
            .optional()?;
        Ok(line)
    }

    pub fn get_for_batch(conn: &Connection, batch_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt =
            conn.prepare("SELECT * FROM batch_ingredients WHERE batch_id = ?1 ORDER BY id")?;
        let lines = stmt
            .query_map([batch_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    /// Every batch ingredient line, for loading the cost graph
    pub fn list_all(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM batch_ingredients ORDER BY batch_id, id")?;
        let lines = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    pub fn get_details_for_batch(conn: &Connection, batch_id: i64) -> DbResult<Vec<BatchIngredientDetail>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT bi.id, bi.item_id, ii.name AS item_name, bi.qty, bi.unit
            FROM batch_ingredients bi
            INNER JOIN inventory_items ii ON bi.item_id = ii.id
            WHERE bi.batch_id = ?1
            ORDER BY bi.id
            "#,
        )?;

        let details = stmt
            .query_map([batch_id], |row| {
                Ok(BatchIngredientDetail {
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

    pub fn update(conn: &Connection, id: i64, data: &BatchIngredientUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(qty) = data.qty {
            updates.push(format!("qty = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(qty));
        }
        if let Some(unit) = data.unit {
            updates.push(format!("unit = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(unit));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE batch_ingredients SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );
        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM batch_ingredients WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}
