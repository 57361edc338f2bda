//! Dependency graph for sheet cells.
//!
//! Owns every materialized cell, keyed by position. Edges are positions,
//! never references, so a cell can be replaced or dropped without leaving
//! anything dangling.
//!
//! # Edge Direction
//!
//! ```text
//! B reads A  =>  A ∈ B.referenced_cells()   (forward, derived from content)
//!                B ∈ A.dependents()          (reverse, stored on A)
//! ```
//!
//! Forward edges answer "what do I need to compute this?", reverse edges
//! answer "what breaks if I change this?".
//!
//! # Invariants
//!
//! 1. **Targets exist:** every referenced position has a cell in the arena.
//! 2. **Bidirectional consistency:** A ∈ B.referenced_cells() iff B ∈ A.dependents().
//! 3. **Acyclic:** no cell reaches itself through forward edges. Checked
//!    before a content change is committed.
//! 4. **Caches are fresh:** a cached value was computed after the last change
//!    of every cell it transitively reads.

use std::cell::Cell as Counter;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::cell::{Cell, CellContent};
use crate::error::{Result, SheetError};
use crate::position::Position;
use crate::value::Value;

#[derive(Default, Debug)]
pub struct DepGraph {
    cells: FxHashMap<Position, Cell>,
    /// Number of cell evaluations performed so far (cache misses).
    evaluations: Counter<u64>,
}

impl DepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pos: Position) -> Option<&Cell> {
        self.cells.get(&pos)
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.cells.contains_key(&pos)
    }

    /// Number of materialized cells, including empty ones kept alive by
    /// references.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, &Cell)> + '_ {
        self.cells.iter().map(|(pos, cell)| (*pos, cell))
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations.get()
    }

    /// Get the cell at `pos`, creating it empty if absent.
    pub(crate) fn ensure(&mut self, pos: Position) -> &mut Cell {
        self.cells.entry(pos).or_default()
    }

    /// Replace a cell's content, keeping every invariant.
    ///
    /// Rejects the change with `CircularDependency` if the new content would
    /// make `cell` reachable from itself; in that case nothing but the
    /// materialization of empty cells along the searched paths happens.
    pub fn replace_content(&mut self, cell: Position, content: CellContent) -> Result<()> {
        if self.would_create_cycle(cell, content.referenced_cells()) {
            log::debug!("rejected edit of {}: circular dependency", cell);
            return Err(SheetError::CircularDependency(cell));
        }

        self.unlink(cell);
        self.ensure(cell).set_content(content);
        let invalidated = self.invalidate(cell);
        self.link(cell);

        log::debug!("committed edit of {} ({} caches invalidated)", cell, invalidated);
        Ok(())
    }

    /// Would `cell` become reachable from itself if it read `refs`?
    ///
    /// Depth-first search from `refs` along each visited cell's own
    /// references. Cells met that do not exist yet are created empty: an
    /// empty cell reads nothing, so it never extends the search.
    pub fn would_create_cycle(&mut self, cell: Position, refs: &[Position]) -> bool {
        let mut visited: FxHashSet<Position> = FxHashSet::default();
        let mut stack: Vec<Position> = refs.to_vec();

        while let Some(pos) = stack.pop() {
            if pos == cell {
                return true;
            }
            if !visited.insert(pos) {
                continue;
            }
            stack.extend_from_slice(self.ensure(pos).referenced_cells());
        }

        false
    }

    /// Mark `cell` and everything that transitively reads it as stale.
    ///
    /// Each cell is visited once, however many paths lead to it. Returns
    /// the number of cells visited.
    pub fn invalidate(&mut self, cell: Position) -> usize {
        let mut visited: FxHashSet<Position> = FxHashSet::default();
        let mut stack = vec![cell];

        while let Some(pos) = stack.pop() {
            if !visited.insert(pos) {
                continue;
            }
            let Some(node) = self.cells.get_mut(&pos) else {
                continue;
            };
            node.invalidate();
            stack.extend(node.dependents());
        }

        log::trace!("invalidated {} cells from {}", visited.len(), cell);
        visited.len()
    }

    /// Remove `cell` from the dependents of everything its content reads.
    fn unlink(&mut self, cell: Position) {
        let Some(node) = self.cells.get(&cell) else {
            return;
        };
        let targets = node.referenced_cells().to_vec();
        for target in targets {
            if let Some(target_cell) = self.cells.get_mut(&target) {
                target_cell.remove_dependent(cell);
            }
        }
    }

    /// Add `cell` to the dependents of everything its content reads,
    /// creating missing targets.
    fn link(&mut self, cell: Position) {
        let Some(node) = self.cells.get(&cell) else {
            return;
        };
        let targets = node.referenced_cells().to_vec();
        for target in targets {
            self.ensure(target).add_dependent(cell);
        }
    }

    /// Drop an empty cell nothing depends on. Returns true if removed.
    pub(crate) fn remove_if_unused(&mut self, pos: Position) -> bool {
        let unused = self
            .cells
            .get(&pos)
            .map_or(false, |c| matches!(c.content(), CellContent::Empty) && !c.has_dependents());
        if unused {
            self.cells.remove(&pos);
        }
        unused
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// Value of the cell at `pos`, computing and caching it on demand.
    ///
    /// Absent cells read as empty text.
    pub fn value(&self, pos: Position) -> Value {
        let Some(cell) = self.cells.get(&pos) else {
            return Value::default();
        };
        if let Some(value) = cell.cached_value() {
            return value;
        }

        // Post-order puts every stale precedent before its dependents, so
        // each lookup below is a cache hit and recursion stays shallow.
        let mut value = Value::default();
        for stale in self.evaluation_order(pos) {
            value = self.evaluate_cell(stale);
        }
        value
    }

    /// Stale cells reachable from `root` through forward edges, precedents
    /// first, `root` last.
    fn evaluation_order(&self, root: Position) -> Vec<Position> {
        // Iterative DFS to avoid stack overflow on long reference chains.
        struct DfsFrame<'a> {
            cell: Position,
            refs: &'a [Position],
            next_idx: usize,
        }

        let mut order = Vec::new();
        let mut seen: FxHashSet<Position> = FxHashSet::default();
        seen.insert(root);
        let mut dfs_stack = vec![DfsFrame {
            cell: root,
            refs: self.refs_of(root),
            next_idx: 0,
        }];

        while let Some(frame) = dfs_stack.last_mut() {
            if frame.next_idx < frame.refs.len() {
                let next = frame.refs[frame.next_idx];
                frame.next_idx += 1;

                let stale = self.cells.get(&next).map_or(false, |c| !c.is_cached());
                if stale && seen.insert(next) {
                    dfs_stack.push(DfsFrame {
                        cell: next,
                        refs: self.refs_of(next),
                        next_idx: 0,
                    });
                }
            } else {
                order.push(frame.cell);
                dfs_stack.pop();
            }
        }

        order
    }

    fn refs_of(&self, pos: Position) -> &[Position] {
        self.cells.get(&pos).map(|c| c.referenced_cells()).unwrap_or(&[])
    }

    fn evaluate_cell(&self, pos: Position) -> Value {
        let Some(cell) = self.cells.get(&pos) else {
            return Value::default();
        };
        if let Some(value) = cell.cached_value() {
            return value;
        }

        let value = cell.content().evaluate(&|p: Position| self.value(p));
        self.evaluations.set(self.evaluations.get() + 1);
        log::trace!("evaluated {} = {}", pos, value);
        cell.store_cache(value.clone());
        value
    }
}
