//! Cost graph
//!
//! An explicit, request-scoped index of inventory items and batch recipes,
//! loaded from the database once and then evaluated in memory.

use std::collections::{HashMap, HashSet};

use rusqlite::Connection;
use serde::Serialize;

use crate::conversion::Unit;
use crate::db::DbResult;
use crate::models::{
    BatchIngredient, BatchRecipe, BatchSubBatch, InventoryItem, MenuBatchPortion, MenuIngredient,
    MenuItem,
};

use super::evaluator::CostError;

/// Leaf of the graph: a priced inventory item
#[derive(Debug, Clone, Serialize)]
pub struct ItemNode {
    pub id: i64,
    pub name: String,
    pub unit: Unit,
    pub unit_cost: f64,
}

/// `qty` of `unit` of an inventory item
#[derive(Debug, Clone, Serialize)]
pub struct IngredientLine {
    pub line_id: i64,
    pub item_id: i64,
    pub qty: f64,
    pub unit: Unit,
}

/// `qty` of `unit` of a batch's yield. Used both for sub-batch edges and for
/// batch portions on a menu item.
#[derive(Debug, Clone, Serialize)]
pub struct PortionLine {
    pub line_id: i64,
    pub batch_id: i64,
    pub qty: f64,
    pub unit: Unit,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchNode {
    pub id: i64,
    pub name: String,
    pub yield_qty: f64,
    pub yield_unit: Unit,
    pub ingredients: Vec<IngredientLine>,
    pub sub_batches: Vec<PortionLine>,
}

impl BatchNode {
    pub fn new(id: i64, name: impl Into<String>, yield_qty: f64, yield_unit: Unit) -> Self {
        Self {
            id,
            name: name.into(),
            yield_qty,
            yield_unit,
            ingredients: Vec::new(),
            sub_batches: Vec::new(),
        }
    }
}

/// Root of a menu item evaluation
#[derive(Debug, Clone, Serialize)]
pub struct MenuNode {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub ingredients: Vec<IngredientLine>,
    pub portions: Vec<PortionLine>,
}

/// Items and batches keyed by id
#[derive(Debug, Clone, Default)]
pub struct CostGraph {
    items: HashMap<i64, ItemNode>,
    batches: HashMap<i64, BatchNode>,
}

impl CostGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every inventory item, batch, and batch line
    pub fn load(conn: &Connection) -> DbResult<Self> {
        let mut graph = Self::new();

        for item in InventoryItem::list(conn, None)? {
            graph.add_item(ItemNode {
                id: item.id,
                name: item.name,
                unit: item.unit,
                unit_cost: item.unit_cost,
            });
        }

        for batch in BatchRecipe::list(conn, None)? {
            graph.add_batch(BatchNode::new(batch.id, batch.name, batch.yield_qty, batch.yield_unit));
        }

        for line in BatchIngredient::list_all(conn)? {
            if let Some(node) = graph.batches.get_mut(&line.batch_id) {
                node.ingredients.push(IngredientLine {
                    line_id: line.id,
                    item_id: line.item_id,
                    qty: line.qty,
                    unit: line.unit,
                });
            }
        }

        // Stored edges were cycle-checked on insert; the evaluator still
        // guards against a cycle rather than trusting that here.
        for edge in BatchSubBatch::list_all(conn)? {
            if let Some(node) = graph.batches.get_mut(&edge.parent_batch_id) {
                node.sub_batches.push(PortionLine {
                    line_id: edge.id,
                    batch_id: edge.child_batch_id,
                    qty: edge.qty,
                    unit: edge.unit,
                });
            }
        }

        tracing::debug!(
            items = graph.items.len(),
            batches = graph.batches.len(),
            "Loaded cost graph"
        );

        Ok(graph)
    }

    /// Load a menu item and its lines as an evaluation root
    pub fn load_menu_item(conn: &Connection, menu_item_id: i64) -> DbResult<Option<MenuNode>> {
        let menu_item = match MenuItem::get_by_id(conn, menu_item_id)? {
            Some(m) => m,
            None => return Ok(None),
        };

        let ingredients = MenuIngredient::get_for_menu_item(conn, menu_item_id)?
            .into_iter()
            .map(|line| IngredientLine {
                line_id: line.id,
                item_id: line.item_id,
                qty: line.qty,
                unit: line.unit,
            })
            .collect();

        let portions = MenuBatchPortion::get_for_menu_item(conn, menu_item_id)?
            .into_iter()
            .map(|line| PortionLine {
                line_id: line.id,
                batch_id: line.batch_id,
                qty: line.portion_qty,
                unit: line.portion_unit,
            })
            .collect();

        Ok(Some(MenuNode {
            id: menu_item.id,
            name: menu_item.name,
            price: menu_item.price,
            ingredients,
            portions,
        }))
    }

    pub fn add_item(&mut self, item: ItemNode) {
        self.items.insert(item.id, item);
    }

    pub fn add_batch(&mut self, batch: BatchNode) {
        self.batches.insert(batch.id, batch);
    }

    pub fn add_ingredient(&mut self, batch_id: i64, line: IngredientLine) -> Result<(), CostError> {
        if !self.items.contains_key(&line.item_id) {
            return Err(CostError::UnknownItem(line.item_id));
        }
        let node = self
            .batches
            .get_mut(&batch_id)
            .ok_or(CostError::UnknownBatch(batch_id))?;
        node.ingredients.push(line);
        Ok(())
    }

    /// Add a sub-batch edge, rejecting any edge that would close a cycle
    pub fn add_sub_batch(&mut self, parent_batch_id: i64, line: PortionLine) -> Result<(), CostError> {
        if !self.batches.contains_key(&line.batch_id) {
            return Err(CostError::UnknownBatch(line.batch_id));
        }
        if !self.batches.contains_key(&parent_batch_id) {
            return Err(CostError::UnknownBatch(parent_batch_id));
        }
        if self.would_create_cycle(parent_batch_id, line.batch_id) {
            return Err(CostError::Cycle { batch_id: parent_batch_id });
        }
        if let Some(node) = self.batches.get_mut(&parent_batch_id) {
            node.sub_batches.push(line);
        }
        Ok(())
    }

    /// True when `parent_batch_id` is reachable from `child_batch_id`
    pub fn would_create_cycle(&self, parent_batch_id: i64, child_batch_id: i64) -> bool {
        let mut visited = HashSet::new();
        let mut to_check = vec![child_batch_id];

        while let Some(current) = to_check.pop() {
            if current == parent_batch_id {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(node) = self.batches.get(&current) {
                to_check.extend(node.sub_batches.iter().map(|edge| edge.batch_id));
            }
        }

        false
    }

    pub fn item(&self, id: i64) -> Option<&ItemNode> {
        self.items.get(&id)
    }

    pub fn batch(&self, id: i64) -> Option<&BatchNode> {
        self.batches.get(&id)
    }

    /// Batch ids ordered by name, for stable reports
    pub fn batch_ids(&self) -> Vec<i64> {
        let mut batches: Vec<&BatchNode> = self.batches.values().collect();
        batches.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        batches.into_iter().map(|b| b.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with_chain() -> CostGraph {
        let mut graph = CostGraph::new();
        for (id, name) in [(1, "Stock"), (2, "Sauce"), (3, "Braise")] {
            graph.add_batch(BatchNode::new(id, name, 1000.0, Unit::Ml));
        }
        let portion = |batch_id| PortionLine { line_id: batch_id, batch_id, qty: 100.0, unit: Unit::Ml };
        graph.add_sub_batch(2, portion(1)).unwrap();
        graph.add_sub_batch(3, portion(2)).unwrap();
        graph
    }

    #[test]
    fn test_would_create_cycle() {
        let graph = graph_with_chain();
        assert!(graph.would_create_cycle(1, 3));
        assert!(graph.would_create_cycle(2, 2));
        assert!(!graph.would_create_cycle(3, 1));
    }

    #[test]
    fn test_add_sub_batch_rejects_cycle() {
        let mut graph = graph_with_chain();
        let back_edge = PortionLine { line_id: 99, batch_id: 3, qty: 1.0, unit: Unit::L };
        let err = graph.add_sub_batch(1, back_edge).unwrap_err();
        assert!(matches!(err, CostError::Cycle { batch_id: 1 }));
        assert!(graph.batch(1).unwrap().sub_batches.is_empty());
    }

    #[test]
    fn test_add_lines_require_known_nodes() {
        let mut graph = graph_with_chain();
        let line = IngredientLine { line_id: 1, item_id: 42, qty: 1.0, unit: Unit::G };
        assert!(matches!(graph.add_ingredient(1, line), Err(CostError::UnknownItem(42))));

        let edge = PortionLine { line_id: 1, batch_id: 42, qty: 1.0, unit: Unit::G };
        assert!(matches!(graph.add_sub_batch(1, edge), Err(CostError::UnknownBatch(42))));
    }

    #[test]
    fn test_batch_ids_sorted_by_name() {
        let graph = graph_with_chain();
        assert_eq!(graph.batch_ids(), vec![3, 2, 1]);
    }
}
