//! Reference extraction from formula AST.
//!
//! Extracts the cell positions a formula reads, for dependency graph
//! construction.

use crate::position::Position;

use super::parser::Expr;

/// Extract all cell references from an expression.
///
/// Returns positions sorted row-major with duplicates removed, so `=A1+A1`
/// reports `A1` once. References outside the sheet limits are not cells
/// and are skipped (the evaluator turns them into `#REF!`).
pub fn extract_cell_refs(expr: &Expr) -> Vec<Position> {
    let mut refs = Vec::new();
    collect_refs(expr, &mut refs);
    refs.sort_unstable();
    refs.dedup();
    refs
}

fn collect_refs(expr: &Expr, refs: &mut Vec<Position>) {
    match expr {
        Expr::Number(_) | Expr::InvalidRef(_) => {}
        Expr::CellRef(cell) => refs.push(*cell),
        Expr::Unary { operand, .. } => collect_refs(operand, refs),
        Expr::BinaryOp { left, right, .. } => {
            collect_refs(left, refs);
            collect_refs(right, refs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::parser::parse;
    use crate::position::Limits;

    fn refs(input: &str) -> Vec<Position> {
        extract_cell_refs(&parse(input, &Limits::default()).unwrap())
    }

    #[test]
    fn test_no_refs() {
        assert!(refs("1+2*3").is_empty());
    }

    #[test]
    fn test_refs_deduplicated_and_sorted() {
        assert_eq!(
            refs("C1+A2+A1*C1-A2"),
            vec![Position::new(0, 0), Position::new(0, 2), Position::new(1, 0)]
        );
    }

    #[test]
    fn test_refs_skip_invalid() {
        let expr = parse("A1+A99", &Limits::new(10, 10)).unwrap();
        assert_eq!(extract_cell_refs(&expr), vec![Position::new(0, 0)]);
    }

    #[test]
    fn test_refs_inside_unary() {
        assert_eq!(refs("-(B2)"), vec![Position::new(1, 1)]);
    }
}
