//! Cost graph evaluator
//!
//! Rolls costs up from inventory items through nested batch recipes to menu
//! items. Batch totals are memoized for the lifetime of one evaluator, so a
//! batch referenced from several places in one request is evaluated once.
//!
//! Data problems on a single line (a unit of the wrong dimension, a batch with
//! a non-positive yield) do not fail the evaluation: the line contributes zero
//! and carries a [`CostIssue`]. Structural problems (dangling ids, a cycle)
//! are errors.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;

use crate::conversion::{convert, unit_cost_in, Unit};
use crate::db::DbError;

use super::graph::{CostGraph, IngredientLine, MenuNode, PortionLine};

/// Errors that stop a cost evaluation
#[derive(Debug, Error)]
pub enum CostError {
    #[error("Batch recipe not found with id: {0}")]
    UnknownBatch(i64),

    #[error("Inventory item not found with id: {0}")]
    UnknownItem(i64),

    #[error("Menu item not found with id: {0}")]
    UnknownMenuItem(i64),

    #[error("Batch {batch_id} includes itself through its sub-batches")]
    Cycle { batch_id: i64 },

    #[error("Database error: {0}")]
    Db(#[from] DbError),
}

/// Why a line contributed zero instead of its extended cost
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CostIssue {
    /// The line's unit cannot be converted to the unit it is priced in
    UnitMismatch { line_unit: Unit, expected_unit: Unit },
    /// The referenced batch yields zero or a negative quantity
    NonPositiveYield { batch_id: i64, yield_qty: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Ingredient,
    SubBatch,
    BatchPortion,
}

/// Extended cost of one line
#[derive(Debug, Clone, Serialize)]
pub struct LineCost {
    pub line_id: i64,
    pub kind: LineKind,
    pub component_id: i64,
    pub component_name: String,
    pub qty: f64,
    pub unit: Unit,
    pub extended_cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<CostIssue>,
}

/// Cost breakdown of a batch recipe
#[derive(Debug, Clone, Serialize)]
pub struct BatchCost {
    pub batch_id: i64,
    pub name: String,
    pub yield_qty: f64,
    pub yield_unit: Unit,
    pub total_cost: f64,
    /// Zero when the yield is not positive
    pub cost_per_yield_unit: f64,
    pub lines: Vec<LineCost>,
}

impl BatchCost {
    pub fn has_issues(&self) -> bool {
        self.lines.iter().any(|l| l.issue.is_some())
    }
}

/// Cost breakdown of a menu item
#[derive(Debug, Clone, Serialize)]
pub struct MenuItemCost {
    pub menu_item_id: i64,
    pub name: String,
    pub price: f64,
    pub total_cost: f64,
    pub margin: f64,
    /// Cost as a percentage of price; absent when the price is not positive
    pub food_cost_percent: Option<f64>,
    pub lines: Vec<LineCost>,
}

impl MenuItemCost {
    pub fn has_issues(&self) -> bool {
        self.lines.iter().any(|l| l.issue.is_some())
    }
}

/// Evaluates batch and menu item costs over a loaded [`CostGraph`]
pub struct CostEvaluator<'g> {
    graph: &'g CostGraph,
    memo: HashMap<i64, f64>,
    visiting: HashSet<i64>,
}

impl<'g> CostEvaluator<'g> {
    pub fn new(graph: &'g CostGraph) -> Self {
        Self {
            graph,
            memo: HashMap::new(),
            visiting: HashSet::new(),
        }
    }

    /// Total cost of one full yield of a batch
    pub fn batch_total_cost(&mut self, batch_id: i64) -> Result<f64, CostError> {
        if let Some(&total) = self.memo.get(&batch_id) {
            return Ok(total);
        }
        Ok(self.batch_cost(batch_id)?.total_cost)
    }

    /// Full cost breakdown of a batch
    pub fn batch_cost(&mut self, batch_id: i64) -> Result<BatchCost, CostError> {
        let graph = self.graph;
        let batch = graph.batch(batch_id).ok_or(CostError::UnknownBatch(batch_id))?;

        if !self.visiting.insert(batch_id) {
            return Err(CostError::Cycle { batch_id });
        }

        let lines = self.batch_lines(batch_id);
        self.visiting.remove(&batch_id);
        let lines = lines?;

        let total_cost: f64 = lines.iter().map(|l| l.extended_cost).sum();
        self.memo.insert(batch_id, total_cost);

        let cost_per_yield_unit = if batch.yield_qty > 0.0 {
            total_cost / batch.yield_qty
        } else {
            0.0
        };

        Ok(BatchCost {
            batch_id,
            name: batch.name.clone(),
            yield_qty: batch.yield_qty,
            yield_unit: batch.yield_unit,
            total_cost,
            cost_per_yield_unit,
            lines,
        })
    }

    fn batch_lines(&mut self, batch_id: i64) -> Result<Vec<LineCost>, CostError> {
        let graph = self.graph;
        let batch = graph.batch(batch_id).ok_or(CostError::UnknownBatch(batch_id))?;

        let mut lines = Vec::with_capacity(batch.ingredients.len() + batch.sub_batches.len());
        for line in &batch.ingredients {
            lines.push(self.ingredient_line_cost(line)?);
        }
        for line in &batch.sub_batches {
            lines.push(self.portion_line_cost(line, LineKind::SubBatch)?);
        }
        Ok(lines)
    }

    /// Plate cost of a menu item
    pub fn menu_item_cost(&mut self, menu: &MenuNode) -> Result<MenuItemCost, CostError> {
        let mut lines = Vec::with_capacity(menu.ingredients.len() + menu.portions.len());
        for line in &menu.ingredients {
            lines.push(self.ingredient_line_cost(line)?);
        }
        for line in &menu.portions {
            lines.push(self.portion_line_cost(line, LineKind::BatchPortion)?);
        }

        let total_cost: f64 = lines.iter().map(|l| l.extended_cost).sum();
        let food_cost_percent = if menu.price > 0.0 {
            Some(total_cost / menu.price * 100.0)
        } else {
            None
        };

        Ok(MenuItemCost {
            menu_item_id: menu.id,
            name: menu.name.clone(),
            price: menu.price,
            total_cost,
            margin: menu.price - total_cost,
            food_cost_percent,
            lines,
        })
    }

    /// `unit_cost_in(item cost, item unit, line unit) × qty`
    fn ingredient_line_cost(&self, line: &IngredientLine) -> Result<LineCost, CostError> {
        let item = self
            .graph
            .item(line.item_id)
            .ok_or(CostError::UnknownItem(line.item_id))?;

        let (extended_cost, issue) = match unit_cost_in(item.unit_cost, item.unit, line.unit) {
            Ok(cost_per_line_unit) => (cost_per_line_unit * line.qty, None),
            Err(e) => {
                tracing::warn!(line_id = line.line_id, item = %item.name, "Ingredient line costed at zero: {}", e);
                (
                    0.0,
                    Some(CostIssue::UnitMismatch { line_unit: line.unit, expected_unit: item.unit }),
                )
            }
        };

        Ok(LineCost {
            line_id: line.line_id,
            kind: LineKind::Ingredient,
            component_id: item.id,
            component_name: item.name.clone(),
            qty: line.qty,
            unit: line.unit,
            extended_cost,
            issue,
        })
    }

    /// `(qty in child yield unit ÷ child yield) × child total cost`
    fn portion_line_cost(&mut self, line: &PortionLine, kind: LineKind) -> Result<LineCost, CostError> {
        let graph = self.graph;
        let child = graph
            .batch(line.batch_id)
            .ok_or(CostError::UnknownBatch(line.batch_id))?;

        let mut cost = LineCost {
            line_id: line.line_id,
            kind,
            component_id: child.id,
            component_name: child.name.clone(),
            qty: line.qty,
            unit: line.unit,
            extended_cost: 0.0,
            issue: None,
        };

        if child.yield_qty.is_nan() || child.yield_qty <= 0.0 {
            tracing::warn!(
                line_id = line.line_id,
                batch = %child.name,
                yield_qty = child.yield_qty,
                "Batch portion costed at zero: non-positive yield"
            );
            cost.issue = Some(CostIssue::NonPositiveYield {
                batch_id: child.id,
                yield_qty: child.yield_qty,
            });
            return Ok(cost);
        }

        let qty_in_yield_unit = match convert(line.qty, line.unit, child.yield_unit) {
            Ok(qty) => qty,
            Err(e) => {
                tracing::warn!(line_id = line.line_id, batch = %child.name, "Batch portion costed at zero: {}", e);
                cost.issue = Some(CostIssue::UnitMismatch {
                    line_unit: line.unit,
                    expected_unit: child.yield_unit,
                });
                return Ok(cost);
            }
        };

        let child_total = self.batch_total_cost(child.id)?;
        cost.extended_cost = qty_in_yield_unit / child.yield_qty * child_total;
        Ok(cost)
    }
}
