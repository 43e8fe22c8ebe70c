//! Seed the demo kitchen into an empty costing database
//! Usage: cargo run --bin seed_demo

use tracing_subscriber::EnvFilter;

use boh_costing::{config, db};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(config::DEFAULT_LOG_DIRECTIVE.parse()?))
        .with_writer(std::io::stderr)
        .init();

    let db_path = config::database_path();
    println!("Database: {}", db_path.display());
    config::ensure_parent_dir(&db_path)?;

    let database = db::Database::new(&db_path)?;
    database.with_conn(db::migrations::run_migrations)?;

    match database.with_transaction(|tx| db::seed::seed_demo(tx))? {
        Some(summary) => println!(
            "Seeded {} inventory items, {} batch recipes, {} menu items",
            summary.inventory_items, summary.batch_recipes, summary.menu_items
        ),
        None => println!("Inventory already has items; nothing seeded"),
    }

    Ok(())
}
