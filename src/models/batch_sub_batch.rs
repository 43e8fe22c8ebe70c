//! Batch Sub-Batch model
//!
//! Lets a batch recipe use another batch recipe as a component. The edges form
//! a directed graph over batches that must stay acyclic.

use std::collections::HashSet;

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::conversion::Unit;
use crate::db::{DbError, DbResult};

/// An edge from a parent batch to a child batch it consumes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSubBatch {
    pub id: i64,
    pub parent_batch_id: i64,
    pub child_batch_id: i64,
    pub qty: f64,
    pub unit: Unit,
    pub created_at: String,
    pub updated_at: String,
}

/// Sub-batch line with the child batch's name and yield
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSubBatchDetail {
    pub id: i64,
    pub child_batch_id: i64,
    pub child_batch_name: String,
    pub qty: f64,
    pub unit: Unit,
    pub child_yield_qty: f64,
    pub child_yield_unit: Unit,
}

/// Data for adding a sub-batch to a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSubBatchCreate {
    pub parent_batch_id: i64,
    pub child_batch_id: i64,
    pub qty: f64,
    pub unit: Unit,
}

/// Data for updating a sub-batch line
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSubBatchUpdate {
    pub qty: Option<f64>,
    pub unit: Option<Unit>,
}

impl BatchSubBatch {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            parent_batch_id: row.get("parent_batch_id")?,
            child_batch_id: row.get("child_batch_id")?,
            qty: row.get("qty")?,
            unit: row.get("unit")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Add a sub-batch edge, rejecting it if it would close a cycle
    pub fn create(conn: &Connection, data: &BatchSubBatchCreate) -> DbResult<Self> {
        if would_create_cycle(conn, data.parent_batch_id, data.child_batch_id)? {
            tracing::warn!(
                parent_batch_id = data.parent_batch_id,
                child_batch_id = data.child_batch_id,
                "Rejected sub-batch edge that would create a cycle"
            );
            return Err(DbError::CycleDetected {
                parent_id: data.parent_batch_id,
                child_id: data.child_batch_id,
            });
        }

        conn.execute(
            r#"
            INSERT INTO batch_sub_batches (parent_batch_id, child_batch_id, qty, unit)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![data.parent_batch_id, data.child_batch_id, data.qty, data.unit],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let edge = conn
            .query_row("SELECT * FROM batch_sub_batches WHERE id = ?1", [id], Self::from_row)
            .optional()?;
        Ok(edge)
    }

    pub fn get_for_batch(conn: &Connection, parent_batch_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM batch_sub_batches WHERE parent_batch_id = ?1 ORDER BY id",
        )?;
        let edges = stmt
            .query_map([parent_batch_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    /// Every sub-batch edge, for loading the cost graph
    pub fn list_all(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM batch_sub_batches ORDER BY parent_batch_id, id")?;
        let edges = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    pub fn get_details_for_batch(conn: &Connection, parent_batch_id: i64) -> DbResult<Vec<BatchSubBatchDetail>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT sb.id, sb.child_batch_id, br.name AS child_batch_name, sb.qty, sb.unit,
                   br.yield_qty AS child_yield_qty, br.yield_unit AS child_yield_unit
            FROM batch_sub_batches sb
            INNER JOIN batch_recipes br ON sb.child_batch_id = br.id
            WHERE sb.parent_batch_id = ?1
            ORDER BY sb.id
            "#,
        )?;

        let details = stmt
            .query_map([parent_batch_id], |row| {
                Ok(BatchSubBatchDetail {
                    id: row.get("id")?,
                    child_batch_id: row.get("child_batch_id")?,
                    child_batch_name: row.get("child_batch_name")?,
                    qty: row.get("qty")?,
                    unit: row.get("unit")?,
                    child_yield_qty: row.get("child_yield_qty")?,
                    child_yield_unit: row.get("child_yield_unit")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(details)
    }

    pub fn update(conn: &Connection, id: i64, data: &BatchSubBatchUpdate) -> DbResult<Option<Self>> {
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
            "UPDATE batch_sub_batches SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );
        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM batch_sub_batches WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    /// Batches that use this batch as a direct component
    pub fn get_parent_batch_ids(conn: &Connection, child_batch_id: i64) -> DbResult<Vec<i64>> {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT parent_batch_id FROM batch_sub_batches WHERE child_batch_id = ?1",
        )?;
        let ids = stmt
            .query_map([child_batch_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }
}

/// Check whether adding `child_batch_id` under `parent_batch_id` closes a cycle,
/// i.e. whether the parent is reachable from the child (or is the child).
pub fn would_create_cycle(conn: &Connection, parent_batch_id: i64, child_batch_id: i64) -> DbResult<bool> {
    let mut visited = HashSet::new();
    let mut to_check = vec![child_batch_id];

    while let Some(current) = to_check.pop() {
        if current == parent_batch_id {
            return Ok(true);
        }
        if !visited.insert(current) {
            continue;
        }

        for edge in BatchSubBatch::get_for_batch(conn, current)? {
            to_check.push(edge.child_batch_id);
        }
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::test_connection;
    use crate::models::{BatchRecipe, BatchRecipeCreate};

    fn batch(conn: &Connection, name: &str) -> i64 {
        BatchRecipe::create(
            conn,
            &BatchRecipeCreate {
                name: name.to_string(),
                yield_qty: 1000.0,
                yield_unit: Unit::G,
                notes: None,
            },
        )
        .unwrap()
        .id
    }

    fn edge(conn: &Connection, parent: i64, child: i64) -> DbResult<BatchSubBatch> {
        BatchSubBatch::create(
            conn,
            &BatchSubBatchCreate { parent_batch_id: parent, child_batch_id: child, qty: 100.0, unit: Unit::G },
        )
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let conn = test_connection();
        let a = batch(&conn, "A");
        assert!(would_create_cycle(&conn, a, a).unwrap());
        assert!(matches!(edge(&conn, a, a), Err(DbError::CycleDetected { .. })));
    }

    #[test]
    fn test_transitive_cycle_rejected() {
        let conn = test_connection();
        let a = batch(&conn, "A");
        let b = batch(&conn, "B");
        let c = batch(&conn, "C");

        edge(&conn, a, b).unwrap();
        edge(&conn, b, c).unwrap();

        assert!(would_create_cycle(&conn, c, a).unwrap());
        let err = edge(&conn, c, a).unwrap_err();
        assert!(matches!(err, DbError::CycleDetected { parent_id, child_id } if parent_id == c && child_id == a));
        assert!(BatchSubBatch::get_for_batch(&conn, c).unwrap().is_empty());
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let conn = test_connection();
        let top = batch(&conn, "Top");
        let left = batch(&conn, "Left");
        let right = batch(&conn, "Right");
        let base = batch(&conn, "Base");

        edge(&conn, top, left).unwrap();
        edge(&conn, top, right).unwrap();
        edge(&conn, left, base).unwrap();
        assert!(!would_create_cycle(&conn, right, base).unwrap());
        edge(&conn, right, base).unwrap();

        let mut parents = BatchSubBatch::get_parent_batch_ids(&conn, base).unwrap();
        parents.sort();
        assert_eq!(parents, vec![left, right]);
    }

    #[test]
    fn test_child_in_use_cannot_be_deleted() {
        let conn = test_connection();
        let parent = batch(&conn, "Parent");
        let child = batch(&conn, "Child");
        edge(&conn, parent, child).unwrap();

        assert!(BatchRecipe::delete(&conn, child).is_err());
        assert_eq!(BatchRecipe::usage(&conn, child).unwrap().parent_batches, 1);
    }

    #[test]
    fn test_details_include_child_yield() {
        let conn = test_connection();
        let parent = batch(&conn, "Parent");
        let child = batch(&conn, "Child");
        edge(&conn, parent, child).unwrap();

        let details = BatchSubBatch::get_details_for_batch(&conn, parent).unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].child_batch_name, "Child");
        assert_eq!(details[0].child_yield_qty, 1000.0);
        assert_eq!(details[0].child_yield_unit, Unit::G);
    }
}
