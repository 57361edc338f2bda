// Formula parsing and evaluation

pub mod eval;
pub mod parser;
pub mod refs;

use crate::position::{Limits, Position};
use crate::value::Value;

pub use eval::CellLookup;
pub use parser::{Expr, Op, UnaryOp};

/// A parsed formula together with the cells it reads.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    expr: Expr,
    refs: Vec<Position>,
}

impl Formula {
    /// Parse formula text without its leading `=`.
    pub fn parse(expression: &str, limits: &Limits) -> Result<Self, String> {
        let expr = parser::parse(expression, limits)?;
        let refs = refs::extract_cell_refs(&expr);
        Ok(Self { expr, refs })
    }

    pub fn evaluate<L: CellLookup + ?Sized>(&self, lookup: &L) -> Value {
        eval::evaluate(&self.expr, lookup)
    }

    /// Canonical text of the expression, without the leading `=`.
    pub fn expression(&self) -> String {
        parser::format_expr(&self.expr)
    }

    /// Cells read by this formula, sorted and de-duplicated.
    pub fn referenced_cells(&self) -> &[Position] {
        &self.refs
    }
}

/// Parse formula text without its leading `=` against the given limits.
pub fn parse_formula(expression: &str, limits: &Limits) -> Result<Formula, String> {
    Formula::parse(expression, limits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ErrorKind;

    #[test]
    fn test_formula_expression_and_refs() {
        let f = parse_formula(" B2 + (A1*B2) ", &Limits::default()).unwrap();
        assert_eq!(f.expression(), "B2+A1*B2");
        assert_eq!(f.referenced_cells(), &[Position::new(0, 0), Position::new(1, 1)]);
    }

    #[test]
    fn test_formula_evaluate() {
        let f = parse_formula("A1/B1", &Limits::default()).unwrap();
        let lookup = |pos: Position| {
            if pos == Position::new(0, 0) {
                Value::Number(1.0)
            } else {
                Value::from("")
            }
        };
        assert_eq!(f.evaluate(&lookup), Value::Error(ErrorKind::Div0));
    }

    #[test]
    fn test_formula_parse_error() {
        assert!(parse_formula("1+", &Limits::default()).is_err());
    }
}
