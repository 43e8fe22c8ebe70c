//! Data models
//!
//! Rust structs representing database entities.

mod batch_ingredient;
mod batch_recipe;
mod batch_sub_batch;
mod inventory_item;
mod menu_batch_portion;
mod menu_ingredient;
mod menu_item;

pub use batch_ingredient::{
    BatchIngredient, BatchIngredientCreate, BatchIngredientDetail, BatchIngredientUpdate,
};
pub use batch_recipe::{BatchRecipe, BatchRecipeCreate, BatchRecipeUpdate, BatchUsage};
pub use batch_sub_batch::{
    would_create_cycle, BatchSubBatch, BatchSubBatchCreate, BatchSubBatchDetail,
    BatchSubBatchUpdate,
};
pub use inventory_item::{InventoryItem, InventoryItemCreate, InventoryItemUpdate};
pub use menu_batch_portion::{MenuBatchPortion, MenuBatchPortionCreate, MenuBatchPortionDetail};
pub use menu_ingredient::{MenuIngredient, MenuIngredientCreate, MenuIngredientDetail};
pub use menu_item::{MenuItem, MenuItemCreate, MenuItemUpdate};
