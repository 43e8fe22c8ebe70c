//! Batch Recipe model
//!
//! A recipe prepared in bulk, producing `yield_qty` of `yield_unit`.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::conversion::Unit;
use crate::db::{DbError, DbResult};

/// A batch recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRecipe {
    pub id: i64,
    pub name: String,
    pub yield_qty: f64,
    pub yield_unit: Unit,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a new batch recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRecipeCreate {
    pub name: String,
    pub yield_qty: f64,
    pub yield_unit: Unit,
    pub notes: Option<String>,
}

/// Data for updating a batch recipe
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchRecipeUpdate {
    pub name: Option<String>,
    pub yield_qty: Option<f64>,
    pub yield_unit: Option<Unit>,
    pub notes: Option<String>,
}

/// Where a batch is referenced from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchUsage {
    pub parent_batches: i64,
    pub menu_items: i64,
}

impl BatchUsage {
    pub fn is_used(&self) -> bool {
        self.parent_batches > 0 || self.menu_items > 0
    }
}

impl BatchRecipe {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            yield_qty: row.get("yield_qty")?,
            yield_unit: row.get("yield_unit")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn create(conn: &Connection, data: &BatchRecipeCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO batch_recipes (name, yield_qty, yield_unit, notes)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![data.name, data.yield_qty, data.yield_unit, data.notes],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let batch = conn
            .query_row("SELECT * FROM batch_recipes WHERE id = ?1", [id], Self::from_row)
            .optional()?;
        Ok(batch)
    }

    pub fn get_by_name(conn: &Connection, name: &str) -> DbResult<Option<Self>> {
        let batch = conn
            .query_row("SELECT * FROM batch_recipes WHERE name = ?1", [name], Self::from_row)
            .optional()?;
        Ok(batch)
    }

    /// List batches ordered by name, optionally filtered by a name substring
    pub fn list(conn: &Connection, query: Option<&str>) -> DbResult<Vec<Self>> {
        let batches = match query {
            Some(q) => {
                let mut stmt =
                    conn.prepare("SELECT * FROM batch_recipes WHERE name LIKE ?1 ORDER BY name")?;
                let rows = stmt.query_map([format!("%{}%", q)], Self::from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare("SELECT * FROM batch_recipes ORDER BY name")?;
                let rows = stmt.query_map([], Self::from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(batches)
    }

    pub fn update(conn: &Connection, id: i64, data: &BatchRecipeUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref name) = data.name {
            updates.push(format!("name = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(name.clone()));
        }
        if let Some(yield_qty) = data.yield_qty {
            updates.push(format!("yield_qty = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(yield_qty));
        }
        if let Some(yield_unit) = data.yield_unit {
            updates.push(format!("yield_unit = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(yield_unit));
        }
        if let Some(ref notes) = data.notes {
            updates.push(format!("notes = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(notes.clone()));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE batch_recipes SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );
        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Count the sub-batch lines and menu portions that consume this batch
    pub fn usage(conn: &Connection, id: i64) -> DbResult<BatchUsage> {
        let parent_batches: i64 = conn.query_row(
            "SELECT COUNT(*) FROM batch_sub_batches WHERE child_batch_id = ?1",
            [id],
            |row| row.get(0),
        )?;
        let menu_items: i64 = conn.query_row(
            "SELECT COUNT(*) FROM menu_batch_portions WHERE batch_id = ?1",
            [id],
            |row| row.get(0),
        )?;
        Ok(BatchUsage { parent_batches, menu_items })
    }

    /// Delete a batch. Its own ingredient and sub-batch lines cascade; being
    /// used by another batch or menu item is a foreign key error.
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM batch_recipes WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    pub fn count(conn: &Connection) -> DbResult<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM batch_recipes", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::test_connection;

    fn marinade() -> BatchRecipeCreate {
        BatchRecipeCreate {
            name: "Shawarma Marinade".to_string(),
            yield_qty: 18144.0,
            yield_unit: Unit::G,
            notes: Some("~40 lb batch".to_string()),
        }
    }

    #[test]
    fn test_create_and_get() {
        let conn = test_connection();
        let batch = BatchRecipe::create(&conn, &marinade()).unwrap();
        assert_eq!(batch.yield_unit, Unit::G);
        assert_eq!(batch.notes.as_deref(), Some("~40 lb batch"));

        let by_name = BatchRecipe::get_by_name(&conn, "Shawarma Marinade").unwrap().unwrap();
        assert_eq!(by_name.id, batch.id);
    }

    #[test]
    fn test_update_yield() {
        let conn = test_connection();
        let batch = BatchRecipe::create(&conn, &marinade()).unwrap();
        let update = BatchRecipeUpdate {
            yield_qty: Some(40.0),
            yield_unit: Some(Unit::Lb),
            ..Default::default()
        };
        let updated = BatchRecipe::update(&conn, batch.id, &update).unwrap().unwrap();
        assert_eq!(updated.yield_qty, 40.0);
        assert_eq!(updated.yield_unit, Unit::Lb);
    }

    #[test]
    fn test_unused_batch_usage() {
        let conn = test_connection();
        let batch = BatchRecipe::create(&conn, &marinade()).unwrap();
        let usage = BatchRecipe::usage(&conn, batch.id).unwrap();
        assert!(!usage.is_used());
        assert!(BatchRecipe::delete(&conn, batch.id).unwrap());
        assert_eq!(BatchRecipe::count(&conn).unwrap(), 0);
    }
}
