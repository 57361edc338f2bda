// Formula evaluator - evaluates an expression against a cell lookup

use crate::position::Position;
use crate::value::{ErrorKind, Value};

use super::parser::{Expr, Op, UnaryOp};

/// Source of referenced cell values during evaluation.
///
/// The sheet implements this with its memoizing value lookup; any
/// `Fn(Position) -> Value` closure works too.
pub trait CellLookup {
    fn value(&self, pos: Position) -> Value;
}

impl<F> CellLookup for F
where
    F: Fn(Position) -> Value,
{
    fn value(&self, pos: Position) -> Value {
        self(pos)
    }
}

/// Evaluate an expression to a `Value`.
///
/// The result is always a number or an error: referenced text is coerced,
/// the first error met aborts the whole expression and becomes its value.
pub fn evaluate<L: CellLookup + ?Sized>(expr: &Expr, lookup: &L) -> Value {
    match eval_number(expr, lookup) {
        Ok(n) => Value::Number(n),
        Err(e) => Value::Error(e),
    }
}

fn eval_number<L: CellLookup + ?Sized>(expr: &Expr, lookup: &L) -> Result<f64, ErrorKind> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::CellRef(cell) => lookup.value(*cell).to_number(),
        Expr::InvalidRef(_) => Err(ErrorKind::Ref),
        Expr::Unary { op, operand } => {
            let n = eval_number(operand, lookup)?;
            Ok(match op {
                UnaryOp::Plus => n,
                UnaryOp::Minus => -n,
            })
        }
        Expr::BinaryOp { op, left, right } => {
            let l = eval_number(left, lookup)?;
            let r = eval_number(right, lookup)?;
            let result = match op {
                Op::Add => l + r,
                Op::Sub => l - r,
                Op::Mul => l * r,
                Op::Div => l / r,
            };
            if result.is_finite() {
                Ok(result)
            } else {
                Err(ErrorKind::Div0)
            }
        }
    }
}
