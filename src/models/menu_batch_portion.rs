//! Menu Batch Portion model
//!
//! A portion of a batch recipe served on a menu item.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::conversion::Unit;
use crate::db::{DbError, DbResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuBatchPortion {
    pub id: i64,
    pub menu_item_id: i64,
    pub batch_id: i64,
    pub portion_qty: f64,
    pub portion_unit: Unit,
    pub created_at: String,
    pub updated_at: String,
}

/// Batch portion with the batch's name and yield
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuBatchPortionDetail {
    pub id: i64,
    pub batch_id: i64,
    pub batch_name: String,
    pub portion_qty: f64,
    pub portion_unit: Unit,
    pub batch_yield_qty: f64,
    pub batch_yield_unit: Unit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuBatchPortionCreate {
    pub menu_item_id: i64,
    pub batch_id: i64,
    pub portion_qty: f64,
    pub portion_unit: Unit,
}

impl MenuBatchPortion {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            menu_item_id: row.get("menu_item_id")?,
            batch_id: row.get("batch_id")?,
            portion_qty: row.get("portion_qty")?,
            portion_unit: row.get("portion_unit")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn create(conn: &Connection, data: &MenuBatchPortionCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO menu_batch_portions (menu_item_id, batch_id, portion_qty, portion_unit)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![data.menu_item_id, data.batch_id, data.portion_qty, data.portion_unit],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let line = conn
            .query_row("SELECT * FROM menu_batch_portions WHERE id = ?1", [id], Self::from_row)
            .optional()?;
        Ok(line)
    }

    pub fn get_for_menu_item(conn: &Connection, menu_item_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn
            .prepare("SELECT * FROM menu_batch_portions WHERE menu_item_id = ?1 ORDER BY id")?;
        let lines = stmt
            .query_map([menu_item_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    pub fn get_details_for_menu_item(
        conn: &Connection,
        menu_item_id: i64,
    ) -> DbResult<Vec<MenuBatchPortionDetail>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT mp.id, mp.batch_id, br.name AS batch_name, mp.portion_qty, mp.portion_unit,
                   br.yield_qty AS batch_yield_qty, br.yield_unit AS batch_yield_unit
            FROM menu_batch_portions mp
            INNER JOIN batch_recipes br ON mp.batch_id = br.id
            WHERE mp.menu_item_id = ?1
            ORDER BY mp.id
            "#,
        )?;

        let details = stmt
            .query_map([menu_item_id], |row| {
                Ok(MenuBatchPortionDetail {
                    id: row.get("id")?,
                    batch_id: row.get("batch_id")?,
                    batch_name: row.get("batch_name")?,
                    portion_qty: row.get("portion_qty")?,
                    portion_unit: row.get("portion_unit")?,
                    batch_yield_qty: row.get("batch_yield_qty")?,
                    batch_yield_unit: row.get("batch_yield_unit")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(details)
    }

    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM menu_batch_portions WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}
