use std::io::{self, Write};

use crate::cell::{Cell, CellContent};
use crate::dep_graph::DepGraph;
use crate::error::{Result, SheetError};
use crate::position::{Limits, Position, Size};
use crate::value::Value;

/// A sparse grid of cells backed by the dependency graph.
///
/// Every position argument is checked against the sheet limits first;
/// positions outside them fail with [`SheetError::InvalidPosition`].
#[derive(Debug, Default)]
pub struct Sheet {
    graph: DepGraph,
    limits: Limits,
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: Limits) -> Self {
        Self {
            graph: DepGraph::new(),
            limits,
        }
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    fn check(&self, pos: Position) -> Result<()> {
        if self.limits.contains(pos) {
            Ok(())
        } else {
            Err(SheetError::InvalidPosition(pos))
        }
    }

    /// Set a cell from raw input.
    ///
    /// Input equal to the cell's current text is a no-op: caches and edges
    /// stay as they are. Syntax errors and circular references reject the
    /// edit and leave the sheet unchanged.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<()> {
        self.check(pos)?;

        // Absent cells have empty text, so clearing one is a no-op too
        let current = self.graph.get(pos).map(Cell::text).unwrap_or_default();
        if current == text {
            return Ok(());
        }

        let content = CellContent::from_input(text, &self.limits).map_err(|message| {
            log::debug!("rejected edit of {}: {}", pos, message);
            SheetError::FormulaSyntax(message)
        })?;
        self.graph.replace_content(pos, content)
    }

    /// Clear a cell.
    ///
    /// Goes through the same pipeline as setting empty input, so the
    /// cell's outgoing edges are dropped and its dependents recompute. The
    /// cell is then deallocated unless other cells still read it.
    pub fn clear_cell(&mut self, pos: Position) -> Result<()> {
        self.set_cell(pos, "")?;
        self.graph.remove_if_unused(pos);
        Ok(())
    }

    pub fn cell(&self, pos: Position) -> Result<Option<&Cell>> {
        self.check(pos)?;
        Ok(self.graph.get(pos))
    }

    /// Evaluated value of a cell; absent cells are empty text.
    pub fn value(&self, pos: Position) -> Result<Value> {
        self.check(pos)?;
        Ok(self.graph.value(pos))
    }

    /// Raw text of a cell (`=` plus canonical expression for formulas).
    pub fn text(&self, pos: Position) -> Result<String> {
        self.check(pos)?;
        Ok(self.graph.get(pos).map(Cell::text).unwrap_or_default())
    }

    pub fn referenced_cells(&self, pos: Position) -> Result<Vec<Position>> {
        self.check(pos)?;
        Ok(self
            .graph
            .get(pos)
            .map(|c| c.referenced_cells().to_vec())
            .unwrap_or_default())
    }

    /// True when the cell's own content reads other cells.
    pub fn is_referenced(&self, pos: Position) -> Result<bool> {
        self.check(pos)?;
        Ok(self.graph.get(pos).map_or(false, Cell::is_referenced))
    }

    /// Cells that read `pos`, sorted.
    pub fn dependents(&self, pos: Position) -> Result<Vec<Position>> {
        self.check(pos)?;
        let mut deps: Vec<Position> = self
            .graph
            .get(pos)
            .map(|c| c.dependents().collect())
            .unwrap_or_default();
        deps.sort_unstable();
        Ok(deps)
    }

    pub fn is_cached(&self, pos: Position) -> Result<bool> {
        self.check(pos)?;
        Ok(self.graph.get(pos).map_or(false, Cell::is_cached))
    }

    /// Number of materialized cells, including empty referenced ones.
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Number of cell evaluations performed so far.
    pub fn evaluations(&self) -> u64 {
        self.graph.evaluations()
    }

    /// Smallest rectangle anchored at `A1` holding every cell with text.
    ///
    /// Empty cells that exist only because something references them do
    /// not count.
    pub fn printable_size(&self) -> Size {
        self.graph
            .iter()
            .filter(|(_, cell)| !matches!(cell.content(), CellContent::Empty))
            .fold(Size::default(), |size, (pos, _)| {
                Size::new(size.rows.max(pos.row + 1), size.cols.max(pos.col + 1))
            })
    }

    /// Write the printable area as tab-separated values, one line per row.
    pub fn print_values<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_with(out, |pos, _| self.graph.value(pos).to_string())
    }

    /// Write the printable area as tab-separated raw texts, one line per row.
    pub fn print_texts<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_with(out, |_, cell| cell.text())
    }

    fn print_with<W, F>(&self, out: &mut W, render: F) -> io::Result<()>
    where
        W: Write,
        F: Fn(Position, &Cell) -> String,
    {
        let size = self.printable_size();
        for row in 0..size.rows {
            for col in 0..size.cols {
                if col > 0 {
                    out.write_all(b"\t")?;
                }
                let pos = Position::new(row, col);
                if let Some(cell) = self.graph.get(pos) {
                    out.write_all(render(pos, cell).as_bytes())?;
                }
            }
            out.write_all(b"\n")?;
        }
        Ok(())
    }
}
