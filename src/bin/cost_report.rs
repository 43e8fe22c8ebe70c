//! Print the current cost of every batch recipe and menu item
//! Usage: cargo run --bin cost_report -- [--json]

use serde::Serialize;
use tracing_subscriber::EnvFilter;

use boh_costing::costing::{self, BatchCost, MenuItemCost};
use boh_costing::{config, db};

#[derive(Serialize)]
struct CostReport {
    generated_at: String,
    batches: Vec<BatchCost>,
    menu_items: Vec<MenuItemCost>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(config::DEFAULT_LOG_DIRECTIVE.parse()?))
        .with_writer(std::io::stderr)
        .init();

    let as_json = std::env::args().skip(1).any(|a| a == "--json");

    let db_path = config::database_path();
    if !db_path.exists() {
        return Err(format!("Database not found: {}", db_path.display()).into());
    }

    let database = db::Database::new(&db_path)?;
    let conn = database.get_conn()?;
    db::migrations::run_migrations(&conn)?;

    let report = CostReport {
        generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        batches: costing::all_batch_costs(&conn)?,
        menu_items: costing::all_menu_item_costs(&conn)?,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Cost report generated {}", report.generated_at);
    println!("Database: {}", db_path.display());

    println!("\nBatch recipes");
    for batch in &report.batches {
        println!(
            "  {:<32} total ${:>9.2}  yield {} {}  per {} ${:.4}",
            batch.name, batch.total_cost, batch.yield_qty, batch.yield_unit, batch.yield_unit, batch.cost_per_yield_unit
        );
        for line in batch.lines.iter().filter(|l| l.issue.is_some()) {
            println!("      ! {} {} {}: costed at zero", line.component_name, line.qty, line.unit);
        }
    }

    println!("\nMenu items");
    for item in &report.menu_items {
        let food_cost = item
            .food_cost_percent
            .map(|p| format!("{:.1}%", p))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "  {:<32} price ${:>7.2}  cost ${:>7.2}  margin ${:>7.2}  food cost {}",
            item.name, item.price, item.total_cost, item.margin, food_cost
        );
        for line in item.lines.iter().filter(|l| l.issue.is_some()) {
            println!("      ! {} {} {}: costed at zero", line.component_name, line.qty, line.unit);
        }
    }

    Ok(())
}
