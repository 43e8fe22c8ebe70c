//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        tracing::info!("Applied schema migration v1");
    }

    Ok(())
}

/// Migration v1: Initial schema
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- INVENTORY ITEMS
        -- Raw purchased goods; leaves of the cost graph
        -- ============================================
        CREATE TABLE inventory_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            unit TEXT NOT NULL CHECK(unit IN ('g', 'kg', 'oz', 'lb', 'ml', 'l')),
            unit_cost REAL NOT NULL DEFAULT 0,   -- cost per one `unit`
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- ============================================
        -- BATCH RECIPES
        -- Prepped components made in bulk (sauces, marinades, doughs)
        -- ============================================
        CREATE TABLE batch_recipes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            yield_qty REAL NOT NULL,
            yield_unit TEXT NOT NULL CHECK(yield_unit IN ('g', 'kg', 'oz', 'lb', 'ml', 'l')),
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE batch_ingredients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id INTEGER NOT NULL REFERENCES batch_recipes(id) ON DELETE CASCADE,
            item_id INTEGER NOT NULL REFERENCES inventory_items(id) ON DELETE RESTRICT,
            qty REAL NOT NULL,
            unit TEXT NOT NULL CHECK(unit IN ('g', 'kg', 'oz', 'lb', 'ml', 'l')),
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_batch_ingredients_batch ON batch_ingredients(batch_id);
        CREATE INDEX idx_batch_ingredients_item ON batch_ingredients(item_id);

        -- Edges of the batch graph: parent uses qty/unit of child
        CREATE TABLE batch_sub_batches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            parent_batch_id INTEGER NOT NULL REFERENCES batch_recipes(id) ON DELETE CASCADE,
            child_batch_id INTEGER NOT NULL REFERENCES batch_recipes(id) ON DELETE RESTRICT,
            qty REAL NOT NULL,
            unit TEXT NOT NULL CHECK(unit IN ('g', 'kg', 'oz', 'lb', 'ml', 'l')),
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),

            CHECK(parent_batch_id <> child_batch_id),
            UNIQUE(parent_batch_id, child_batch_id)
        );

        CREATE INDEX idx_batch_sub_batches_parent ON batch_sub_batches(parent_batch_id);
        CREATE INDEX idx_batch_sub_batches_child ON batch_sub_batches(child_batch_id);

        -- ============================================
        -- MENU ITEMS
        -- What the guest orders
        -- ============================================
        CREATE TABLE menu_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            price REAL NOT NULL DEFAULT 0,
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE menu_ingredients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            menu_item_id INTEGER NOT NULL REFERENCES menu_items(id) ON DELETE CASCADE,
            item_id INTEGER NOT NULL REFERENCES inventory_items(id) ON DELETE RESTRICT,
            qty REAL NOT NULL,
            unit TEXT NOT NULL CHECK(unit IN ('g', 'kg', 'oz', 'lb', 'ml', 'l')),
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_menu_ingredients_menu ON menu_ingredients(menu_item_id);
        CREATE INDEX idx_menu_ingredients_item ON menu_ingredients(item_id);

        CREATE TABLE menu_batch_portions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            menu_item_id INTEGER NOT NULL REFERENCES menu_items(id) ON DELETE CASCADE,
            batch_id INTEGER NOT NULL REFERENCES batch_recipes(id) ON DELETE RESTRICT,
            portion_qty REAL NOT NULL,
            portion_unit TEXT NOT NULL CHECK(portion_unit IN ('g', 'kg', 'oz', 'lb', 'ml', 'l')),
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_menu_batch_portions_menu ON menu_batch_portions(menu_item_id);
        CREATE INDEX idx_menu_batch_portions_batch ON menu_batch_portions(batch_id);
        "#,
    )?;

    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let tracked: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_migrations')",
        [],
        |row| row.get(0),
    )?;
    if !tracked {
        return Ok(true);
    }
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}

/// Open an in-memory connection with the current schema applied
#[cfg(test)]
pub fn test_connection() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory database");
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .expect("enable foreign keys");
    run_migrations(&conn).expect("run migrations");
    conn
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_database_needs_migration() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(needs_migration(&conn).unwrap());
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = test_connection();
        assert!(!needs_migration(&conn).unwrap());
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_unit_check_constraint() {
        let conn = test_connection();
        let result = conn.execute(
            "INSERT INTO inventory_items (name, unit, unit_cost) VALUES ('Flour', 'cup', 1.0)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_self_edge_rejected_by_schema() {
        let conn = test_connection();
        conn.execute(
            "INSERT INTO batch_recipes (name, yield_qty, yield_unit) VALUES ('Stock', 1000, 'ml')",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO batch_sub_batches (parent_batch_id, child_batch_id, qty, unit) VALUES (1, 1, 10, 'ml')",
            [],
        );
        assert!(result.is_err());
    }
}
