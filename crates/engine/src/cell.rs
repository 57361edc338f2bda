use std::cell::RefCell;

use rustc_hash::FxHashSet;

use crate::formula::{CellLookup, Formula};
use crate::position::{Limits, Position};
use crate::value::Value;

/// Leading character that turns input into a formula.
pub const FORMULA_SIGN: char = '=';

/// Leading character that forces input to be read as text (`'=5` is the
/// text `=5`). It is kept in the cell text and dropped from the value.
pub const ESCAPE_SIGN: char = '\'';

/// What a cell holds. Replaced wholesale on edit.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellContent {
    #[default]
    Empty,
    Text(String),
    Formula(Formula),
}

impl CellContent {
    /// Classify raw input.
    ///
    /// Empty input is `Empty`; input starting with `=` and longer than the
    /// sign alone is parsed as a formula; everything else is text.
    pub fn from_input(text: &str, limits: &Limits) -> Result<Self, String> {
        if text.is_empty() {
            return Ok(CellContent::Empty);
        }
        match text.strip_prefix(FORMULA_SIGN) {
            Some(expression) if !expression.is_empty() => {
                Formula::parse(expression, limits).map(CellContent::Formula)
            }
            _ => Ok(CellContent::Text(text.to_string())),
        }
    }

    /// Canonical text: what the user would see in the formula bar.
    pub fn text(&self) -> String {
        match self {
            CellContent::Empty => String::new(),
            CellContent::Text(s) => s.clone(),
            CellContent::Formula(f) => format!("{}{}", FORMULA_SIGN, f.expression()),
        }
    }

    pub fn referenced_cells(&self) -> &[Position] {
        match self {
            CellContent::Formula(f) => f.referenced_cells(),
            CellContent::Empty | CellContent::Text(_) => &[],
        }
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, CellContent::Formula(_))
    }

    /// Compute the value. Only formulas consult `lookup`.
    pub fn evaluate<L: CellLookup + ?Sized>(&self, lookup: &L) -> Value {
        match self {
            CellContent::Empty => Value::default(),
            CellContent::Text(s) => {
                let shown = s.strip_prefix(ESCAPE_SIGN).unwrap_or(s);
                Value::Text(shown.to_string())
            }
            CellContent::Formula(f) => f.evaluate(lookup),
        }
    }
}

/// A node of the dependency graph.
///
/// Forward edges live in the content (`referenced_cells`); reverse edges
/// (`dependents`, the cells that read this one) are kept here and updated
/// by the sheet on every committed edit.
#[derive(Debug, Clone, Default)]
pub struct Cell {
    content: CellContent,
    /// Memoized value; `None` means stale. Written only by the sheet's
    /// evaluation and invalidation passes.
    cache: RefCell<Option<Value>>,
    dependents: FxHashSet<Position>,
}

impl Cell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &CellContent {
        &self.content
    }

    pub fn text(&self) -> String {
        self.content.text()
    }

    pub fn referenced_cells(&self) -> &[Position] {
        self.content.referenced_cells()
    }

    /// True when this cell's own content reads other cells.
    ///
    /// This is about outgoing references; see [`Cell::has_dependents`] for
    /// the reverse direction.
    pub fn is_referenced(&self) -> bool {
        !self.referenced_cells().is_empty()
    }

    /// Cells whose content reads this cell.
    pub fn dependents(&self) -> impl Iterator<Item = Position> + '_ {
        self.dependents.iter().copied()
    }

    pub fn has_dependents(&self) -> bool {
        !self.dependents.is_empty()
    }

    pub fn is_cached(&self) -> bool {
        self.cache.borrow().is_some()
    }

    pub fn cached_value(&self) -> Option<Value> {
        self.cache.borrow().clone()
    }

    pub(crate) fn set_content(&mut self, content: CellContent) {
        self.content = content;
    }

    pub(crate) fn store_cache(&self, value: Value) {
        *self.cache.borrow_mut() = Some(value);
    }

    pub(crate) fn invalidate(&mut self) {
        *self.cache.get_mut() = None;
    }

    pub(crate) fn add_dependent(&mut self, cell: Position) {
        self.dependents.insert(cell);
    }

    pub(crate) fn remove_dependent(&mut self, cell: Position) {
        self.dependents.remove(&cell);
    }
}
