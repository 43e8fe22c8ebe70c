//! Costing MCP Server Implementation
//!
//! Implements the MCP server with all costing tools.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::conversion::Unit;
use crate::db::Database;
use crate::models::{
    BatchIngredientCreate, BatchIngredientUpdate, BatchRecipeCreate, BatchRecipeUpdate,
    BatchSubBatchCreate, BatchSubBatchUpdate, InventoryItemCreate, InventoryItemUpdate,
    MenuBatchPortionCreate, MenuIngredientCreate, MenuItemCreate, MenuItemUpdate,
};
use crate::tools::batches;
use crate::tools::costing;
use crate::tools::inventory;
use crate::tools::menu;
use crate::tools::status::StatusTracker;

/// Back-of-house costing MCP service
#[derive(Clone)]
pub struct CostingService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    tool_router: ToolRouter<CostingService>,
}

impl CostingService {
    pub fn new(database_path: PathBuf, database: Database) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(database_path))),
            database,
            tool_router: Self::tool_router(),
        }
    }
}

fn parse_unit(unit: &str) -> Result<Unit, McpError> {
    unit.parse::<Unit>()
        .map_err(|e| McpError::invalid_params(e.to_string(), None))
}

fn parse_optional_unit(unit: Option<String>) -> Result<Option<Unit>, McpError> {
    unit.as_deref().map(parse_unit).transpose()
}

fn to_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn not_found(kind: &str, id: i64) -> CallToolResult {
    CallToolResult::success(vec![Content::text(format!(r#"{{"error": "{} not found", "id": {}}}"#, kind, id))])
}

#[derive(Debug, Serialize)]
struct RemovedResponse {
    success: bool,
    removed_id: i64,
}

// ============================================================================
// Shared Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IdParams {
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListParams {
    /// Case-insensitive name filter (optional)
    pub query: Option<String>,
}

// ============================================================================
// Inventory Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddInventoryItemParams {
    pub name: String,
    /// Storage unit: g, kg, oz, lb, ml, or l
    pub unit: String,
    /// Cost per one storage unit
    #[serde(default)]
    pub unit_cost: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateInventoryItemParams {
    pub id: i64,
    pub name: Option<String>,
    pub unit: Option<String>,
    pub unit_cost: Option<f64>,
}

// ============================================================================
// Batch Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateBatchParams {
    pub name: String,
    /// Quantity one batch produces
    pub yield_qty: f64,
    /// Unit of the yield: g, kg, oz, lb, ml, or l
    pub yield_unit: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateBatchParams {
    pub id: i64,
    pub name: Option<String>,
    pub yield_qty: Option<f64>,
    pub yield_unit: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddBatchIngredientParams {
    pub batch_id: i64,
    /// Inventory item ID
    pub item_id: i64,
    pub qty: f64,
    /// Must be the same dimension (mass or volume) as the item's unit
    pub unit: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateLineParams {
    /// Line ID
    pub id: i64,
    pub qty: Option<f64>,
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddSubBatchParams {
    /// Batch that consumes the sub-batch
    pub parent_batch_id: i64,
    /// Batch being consumed
    pub child_batch_id: i64,
    pub qty: f64,
    /// Must be the same dimension as the sub-batch's yield unit
    pub unit: String,
}

// ============================================================================
// Menu Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateMenuItemParams {
    pub name: String,
    #[serde(default)]
    pub price: f64,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateMenuItemParams {
    pub id: i64,
    pub name: Option<String>,
    pub price: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddMenuIngredientParams {
    pub menu_item_id: i64,
    /// Inventory item ID
    pub item_id: i64,
    pub qty: f64,
    pub unit: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddMenuBatchPortionParams {
    pub menu_item_id: i64,
    pub batch_id: i64,
    pub portion_qty: f64,
    /// Must be the same dimension as the batch's yield unit
    pub portion_unit: String,
}

// ============================================================================
// Costing Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ConvertUnitsParams {
    pub value: f64,
    pub from_unit: String,
    pub to_unit: String,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl CostingService {
    // --- Status ---

    #[tool(description = "Get the current status of the costing service including build info, database status, record counts, and process information")]
    async fn costing_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status(&self.database);
        let json = serde_json::to_string_pretty(&status)
            .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    // --- Inventory ---

    #[tool(description = "Add a purchased inventory item with its storage unit and cost per unit")]
    fn add_inventory_item(&self, Parameters(p): Parameters<AddInventoryItemParams>) -> Result<CallToolResult, McpError> {
        let data = InventoryItemCreate { name: p.name, unit: parse_unit(&p.unit)?, unit_cost: p.unit_cost };
        let result = inventory::add_inventory_item(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get an inventory item and how many recipe lines use it")]
    fn get_inventory_item(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = inventory::get_inventory_item(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(item) => to_json(&item),
            None => Ok(not_found("Inventory item", p.id)),
        }
    }

    #[tool(description = "List inventory items ordered by name, optionally filtered by name")]
    fn list_inventory_items(&self, Parameters(p): Parameters<ListParams>) -> Result<CallToolResult, McpError> {
        let result = inventory::list_inventory_items(&self.database, p.query.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Update an inventory item's name, unit, or cost. Costs of every batch and menu item using it change immediately.")]
    fn update_inventory_item(&self, Parameters(p): Parameters<UpdateInventoryItemParams>) -> Result<CallToolResult, McpError> {
        let data = InventoryItemUpdate { name: p.name, unit: parse_optional_unit(p.unit)?, unit_cost: p.unit_cost };
        let result = inventory::update_inventory_item(&self.database, p.id, data)
            .map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(item) => to_json(&item),
            None => Ok(not_found("Inventory item", p.id)),
        }
    }

    #[tool(description = "Delete an inventory item (only allowed if no batch or menu line uses it)")]
    fn delete_inventory_item(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = inventory::delete_inventory_item(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Ok(success) => to_json(&success),
            Err(blocked) => to_json(&blocked),
        }
    }

    // --- Batches ---

    #[tool(description = "Create a batch recipe with its yield quantity and unit")]
    fn create_batch(&self, Parameters(p): Parameters<CreateBatchParams>) -> Result<CallToolResult, McpError> {
        let data = BatchRecipeCreate {
            name: p.name,
            yield_qty: p.yield_qty,
            yield_unit: parse_unit(&p.yield_unit)?,
            notes: p.notes,
        };
        let result = batches::create_batch(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get a batch recipe with its ingredient and sub-batch lines and where it is used")]
    fn get_batch(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = batches::get_batch(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(batch) => to_json(&batch),
            None => Ok(not_found("Batch", p.id)),
        }
    }

    #[tool(description = "List batch recipes ordered by name, optionally filtered by name")]
    fn list_batches(&self, Parameters(p): Parameters<ListParams>) -> Result<CallToolResult, McpError> {
        let result = batches::list_batches(&self.database, p.query.as_deref()).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Update a batch recipe's name, yield, or notes")]
    fn update_batch(&self, Parameters(p): Parameters<UpdateBatchParams>) -> Result<CallToolResult, McpError> {
        let data = BatchRecipeUpdate {
            name: p.name,
            yield_qty: p.yield_qty,
            yield_unit: parse_optional_unit(p.yield_unit)?,
            notes: p.notes,
        };
        let result = batches::update_batch(&self.database, p.id, data).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(batch) => to_json(&batch),
            None => Ok(not_found("Batch", p.id)),
        }
    }

    #[tool(description = "Delete a batch recipe and its lines (only allowed if no other batch or menu item uses it)")]
    fn delete_batch(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = batches::delete_batch(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Ok(success) => to_json(&success),
            Err(blocked) => to_json(&blocked),
        }
    }

    #[tool(description = "Add an inventory item to a batch recipe. The unit must be the same dimension (mass or volume) as the item's unit.")]
    fn add_batch_ingredient(&self, Parameters(p): Parameters<AddBatchIngredientParams>) -> Result<CallToolResult, McpError> {
        let data = BatchIngredientCreate { batch_id: p.batch_id, item_id: p.item_id, qty: p.qty, unit: parse_unit(&p.unit)? };
        let result = batches::add_batch_ingredient(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Update the quantity or unit of a batch ingredient line")]
    fn update_batch_ingredient(&self, Parameters(p): Parameters<UpdateLineParams>) -> Result<CallToolResult, McpError> {
        let data = BatchIngredientUpdate { qty: p.qty, unit: parse_optional_unit(p.unit)? };
        let result = batches::update_batch_ingredient(&self.database, p.id, data)
            .map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(line) => to_json(&line),
            None => Ok(not_found("Batch ingredient", p.id)),
        }
    }

    #[tool(description = "Remove an ingredient line from a batch recipe")]
    fn remove_batch_ingredient(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let removed = batches::remove_batch_ingredient(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        if !removed {
            return Ok(not_found("Batch ingredient", p.id));
        }
        to_json(&RemovedResponse { success: true, removed_id: p.id })
    }

    #[tool(description = "Use one batch recipe as a component of another. Rejected if it would make a batch include itself.")]
    fn add_sub_batch(&self, Parameters(p): Parameters<AddSubBatchParams>) -> Result<CallToolResult, McpError> {
        let data = BatchSubBatchCreate {
            parent_batch_id: p.parent_batch_id,
            child_batch_id: p.child_batch_id,
            qty: p.qty,
            unit: parse_unit(&p.unit)?,
        };
        let result = batches::add_sub_batch(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Update the quantity or unit of a sub-batch line")]
    fn update_sub_batch(&self, Parameters(p): Parameters<UpdateLineParams>) -> Result<CallToolResult, McpError> {
        let data = BatchSubBatchUpdate { qty: p.qty, unit: parse_optional_unit(p.unit)? };
        let result = batches::update_sub_batch(&self.database, p.id, data).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(line) => to_json(&line),
            None => Ok(not_found("Sub-batch line", p.id)),
        }
    }

    #[tool(description = "Remove a sub-batch line from a batch recipe")]
    fn remove_sub_batch(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let removed = batches::remove_sub_batch(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        if !removed {
            return Ok(not_found("Sub-batch line", p.id));
        }
        to_json(&RemovedResponse { success: true, removed_id: p.id })
    }

    // --- Menu ---

    #[tool(description = "Create a menu item with its selling price")]
    fn create_menu_item(&self, Parameters(p): Parameters<CreateMenuItemParams>) -> Result<CallToolResult, McpError> {
        let data = MenuItemCreate { name: p.name, price: p.price, notes: p.notes };
        let result = menu::create_menu_item(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get a menu item with its ingredient and batch portion lines")]
    fn get_menu_item(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = menu::get_menu_item(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(menu_item) => to_json(&menu_item),
            None => Ok(not_found("Menu item", p.id)),
        }
    }

    #[tool(description = "List menu items ordered by name, optionally filtered by name")]
    fn list_menu_items(&self, Parameters(p): Parameters<ListParams>) -> Result<CallToolResult, McpError> {
        let result = menu::list_menu_items(&self.database, p.query.as_deref()).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Update a menu item's name, price, or notes")]
    fn update_menu_item(&self, Parameters(p): Parameters<UpdateMenuItemParams>) -> Result<CallToolResult, McpError> {
        let data = MenuItemUpdate { name: p.name, price: p.price, notes: p.notes };
        let result = menu::update_menu_item(&self.database, p.id, data).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(menu_item) => to_json(&menu_item),
            None => Ok(not_found("Menu item", p.id)),
        }
    }

    #[tool(description = "Delete a menu item and its plate lines")]
    fn delete_menu_item(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = menu::delete_menu_item(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Put an inventory item directly on a menu item. The unit must be the same dimension as the item's unit.")]
    fn add_menu_ingredient(&self, Parameters(p): Parameters<AddMenuIngredientParams>) -> Result<CallToolResult, McpError> {
        let data = MenuIngredientCreate { menu_item_id: p.menu_item_id, item_id: p.item_id, qty: p.qty, unit: parse_unit(&p.unit)? };
        let result = menu::add_menu_ingredient(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Remove an inventory item line from a menu item")]
    fn remove_menu_ingredient(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let removed = menu::remove_menu_ingredient(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        if !removed {
            return Ok(not_found("Menu ingredient", p.id));
        }
        to_json(&RemovedResponse { success: true, removed_id: p.id })
    }

    #[tool(description = "Serve a portion of a batch recipe on a menu item. The unit must be the same dimension as the batch's yield unit.")]
    fn add_menu_batch_portion(&self, Parameters(p): Parameters<AddMenuBatchPortionParams>) -> Result<CallToolResult, McpError> {
        let data = MenuBatchPortionCreate {
            menu_item_id: p.menu_item_id,
            batch_id: p.batch_id,
            portion_qty: p.portion_qty,
            portion_unit: parse_unit(&p.portion_unit)?,
        };
        let result = menu::add_menu_batch_portion(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Remove a batch portion line from a menu item")]
    fn remove_menu_batch_portion(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let removed = menu::remove_menu_batch_portion(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        if !removed {
            return Ok(not_found("Menu batch portion", p.id));
        }
        to_json(&RemovedResponse { success: true, removed_id: p.id })
    }

    // --- Costing ---

    #[tool(description = "Compute the current cost of a batch recipe: total, cost per yield unit, and the extended cost of every line. Lines that cannot be costed are reported with an issue.")]
    fn get_batch_cost(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = costing::get_batch_cost(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(cost) => to_json(&cost),
            None => Ok(not_found("Batch", p.id)),
        }
    }

    #[tool(description = "Compute the current plate cost of a menu item with margin and food cost percentage")]
    fn get_menu_item_cost(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = costing::get_menu_item_cost(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(cost) => to_json(&cost),
            None => Ok(not_found("Menu item", p.id)),
        }
    }

    #[tool(description = "Convert a quantity between two units of the same dimension (g, kg, oz, lb, or ml, l)")]
    fn convert_units(&self, Parameters(p): Parameters<ConvertUnitsParams>) -> Result<CallToolResult, McpError> {
        let result = costing::convert_units(p.value, &p.from_unit, &p.to_unit)
            .map_err(|e| McpError::invalid_params(e, None))?;
        to_json(&result)
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for CostingService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "boh-costing".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Back-of-House Costing".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Back-of-House Costing - recipe and plate costing for a restaurant kitchen. \
                 Units: g, kg, oz, lb (mass) and ml, l (volume); lines must use a unit of the same dimension as what they reference. \
                 Inventory: add/get/list/update/delete_inventory_item (cost is per storage unit). \
                 Batches: create/get/list/update/delete_batch, add/update/remove_batch_ingredient, add/update/remove_sub_batch. \
                 Menu: create/get/list/update/delete_menu_item, add/remove_menu_ingredient, add/remove_menu_batch_portion. \
                 Costing: get_batch_cost, get_menu_item_cost (always computed from current prices), convert_units. \
                 Status: costing_status."
                    .into(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unit() {
        assert_eq!(parse_unit(" Kg ").unwrap(), Unit::Kg);
        assert!(parse_unit("cup").is_err());
        assert_eq!(parse_optional_unit(None).unwrap(), None);
        assert_eq!(parse_optional_unit(Some("ml".to_string())).unwrap(), Some(Unit::Ml));
    }
}
