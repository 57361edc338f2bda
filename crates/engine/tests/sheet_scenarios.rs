// End-to-end behavior of the sheet: caching, invalidation, cycles, coercion.

use tabula_engine::{ErrorKind, Position, Sheet, SheetError, Value};

fn pos(name: &str) -> Position {
    name.parse().unwrap()
}

fn num(n: f64) -> Value {
    Value::Number(n)
}

// ---------------------------------------------------------------------------
// Referenced cells
// ---------------------------------------------------------------------------

#[test]
fn referenced_cells_are_deduplicated_operands() {
    let mut sheet = Sheet::new();
    sheet.set_cell(pos("C3"), "=B1+A1*B1+A1-A2").unwrap();
    assert_eq!(
        sheet.referenced_cells(pos("C3")).unwrap(),
        vec![pos("A1"), pos("B1"), pos("A2")]
    );
    assert!(sheet.cell(pos("C3")).unwrap().unwrap().is_referenced());
}

#[test]
fn referencing_absent_cell_materializes_it() {
    let mut sheet = Sheet::new();
    sheet.set_cell(pos("A1"), "=B7").unwrap();

    let target = sheet.cell(pos("B7")).unwrap().expect("B7 should exist");
    assert_eq!(target.text(), "");
    assert_eq!(sheet.dependents(pos("B7")).unwrap(), vec![pos("A1")]);
    assert_eq!(sheet.value(pos("A1")).unwrap(), num(0.0));
}

// ---------------------------------------------------------------------------
// Cycles
// ---------------------------------------------------------------------------

#[test]
fn self_reference_is_rejected_and_state_kept() {
    let mut sheet = Sheet::new();
    sheet.set_cell(pos("A1"), "=B1+1").unwrap();
    sheet.set_cell(pos("C1"), "=A1").unwrap();
    assert_eq!(sheet.value(pos("C1")).unwrap(), num(1.0));

    let err = sheet.set_cell(pos("A1"), "=A1").unwrap_err();
    assert_eq!(err, SheetError::CircularDependency(pos("A1")));

    assert_eq!(sheet.text(pos("A1")).unwrap(), "=B1+1");
    assert!(sheet.is_cached(pos("A1")).unwrap());
    assert!(sheet.is_cached(pos("C1")).unwrap());
    assert_eq!(sheet.referenced_cells(pos("A1")).unwrap(), vec![pos("B1")]);
    assert_eq!(sheet.dependents(pos("B1")).unwrap(), vec![pos("A1")]);
    assert_eq!(sheet.dependents(pos("A1")).unwrap(), vec![pos("C1")]);
}

#[test]
fn self_reference_on_fresh_cell_is_rejected() {
    let mut sheet = Sheet::new();
    assert!(matches!(
        sheet.set_cell(pos("E5"), "=E5*2"),
        Err(SheetError::CircularDependency(_))
    ));
    assert_eq!(sheet.text(pos("E5")).unwrap(), "");
}

#[test]
fn long_cycle_is_rejected() {
    let mut sheet = Sheet::new();
    sheet.set_cell(pos("A1"), "=A2").unwrap();
    sheet.set_cell(pos("A2"), "=A3").unwrap();
    sheet.set_cell(pos("A3"), "=A4").unwrap();
    assert!(sheet.set_cell(pos("A4"), "=1+A1").is_err());
    assert_eq!(sheet.text(pos("A4")).unwrap(), "");
    assert!(sheet.dependents(pos("A1")).unwrap().is_empty());
}

#[test]
fn breaking_a_chain_allows_former_cycle() {
    let mut sheet = Sheet::new();
    sheet.set_cell(pos("A1"), "=B1").unwrap();
    assert!(sheet.set_cell(pos("B1"), "=A1").is_err());

    sheet.set_cell(pos("A1"), "3").unwrap();
    sheet.set_cell(pos("B1"), "=A1").unwrap();
    assert_eq!(sheet.value(pos("B1")).unwrap(), num(3.0));
}

// ---------------------------------------------------------------------------
// Invalidation
// ---------------------------------------------------------------------------

#[test]
fn diamond_invalidation_recomputes_each_cell_once() {
    let mut sheet = Sheet::new();
    sheet.set_cell(pos("A1"), "1").unwrap();
    sheet.set_cell(pos("B1"), "=A1+1").unwrap();
    sheet.set_cell(pos("C1"), "=B1*10").unwrap();
    sheet.set_cell(pos("D1"), "=C1+A1").unwrap();

    assert_eq!(sheet.value(pos("D1")).unwrap(), num(21.0));
    for name in ["A1", "B1", "C1", "D1"] {
        assert!(sheet.is_cached(pos(name)).unwrap(), "{} should be cached", name);
    }

    sheet.set_cell(pos("A1"), "5").unwrap();
    for name in ["A1", "B1", "C1", "D1"] {
        assert!(!sheet.is_cached(pos(name)).unwrap(), "{} should be stale", name);
    }

    let before = sheet.evaluations();
    assert_eq!(sheet.value(pos("D1")).unwrap(), num(65.0));
    assert_eq!(sheet.evaluations() - before, 4);

    assert_eq!(sheet.value(pos("B1")).unwrap(), num(6.0));
    assert_eq!(sheet.value(pos("C1")).unwrap(), num(60.0));
    assert_eq!(sheet.evaluations() - before, 4);
}

#[test]
fn invalidation_does_not_touch_unrelated_cells() {
    let mut sheet = Sheet::new();
    sheet.set_cell(pos("A1"), "1").unwrap();
    sheet.set_cell(pos("B1"), "=A1").unwrap();
    sheet.set_cell(pos("A2"), "2").unwrap();
    sheet.set_cell(pos("B2"), "=A2").unwrap();
    sheet.value(pos("B1")).unwrap();
    sheet.value(pos("B2")).unwrap();

    sheet.set_cell(pos("A1"), "10").unwrap();
    assert!(!sheet.is_cached(pos("B1")).unwrap());
    assert!(sheet.is_cached(pos("B2")).unwrap());
    assert!(sheet.is_cached(pos("A2")).unwrap());
}

#[test]
fn repointing_formula_stops_old_invalidation() {
    let mut sheet = Sheet::new();
    sheet.set_cell(pos("B1"), "=A1").unwrap();
    sheet.set_cell(pos("B1"), "=A2").unwrap();
    sheet.value(pos("B1")).unwrap();

    sheet.set_cell(pos("A1"), "7").unwrap();
    assert!(sheet.is_cached(pos("B1")).unwrap());

    sheet.set_cell(pos("A2"), "7").unwrap();
    assert!(!sheet.is_cached(pos("B1")).unwrap());
    assert_eq!(sheet.value(pos("B1")).unwrap(), num(7.0));
}

#[test]
fn identical_text_is_a_no_op() {
    let mut sheet = Sheet::new();
    sheet.set_cell(pos("A1"), "2").unwrap();
    sheet.set_cell(pos("B1"), "=A1 * 2").unwrap();
    assert_eq!(sheet.value(pos("B1")).unwrap(), num(4.0));
    let evaluations = sheet.evaluations();

    // Canonical text of B1 is "=A1*2"
    sheet.set_cell(pos("B1"), "=A1*2").unwrap();
    sheet.set_cell(pos("A1"), "2").unwrap();

    assert!(sheet.is_cached(pos("A1")).unwrap());
    assert!(sheet.is_cached(pos("B1")).unwrap());
    assert_eq!(sheet.dependents(pos("A1")).unwrap(), vec![pos("B1")]);
    assert_eq!(sheet.value(pos("B1")).unwrap(), num(4.0));
    assert_eq!(sheet.evaluations(), evaluations);
}

#[test]
fn non_canonical_equivalent_text_recommits() {
    let mut sheet = Sheet::new();
    sheet.set_cell(pos("B1"), "=A1*2").unwrap();
    sheet.value(pos("B1")).unwrap();

    sheet.set_cell(pos("B1"), "=(A1)*2").unwrap();
    assert_eq!(sheet.text(pos("B1")).unwrap(), "=A1*2");
    assert!(!sheet.is_cached(pos("B1")).unwrap());
}

// ---------------------------------------------------------------------------
// Text and coercion
// ---------------------------------------------------------------------------

#[test]
fn escaped_formula_is_text() {
    let mut sheet = Sheet::new();
    sheet.set_cell(pos("A1"), "'=5").unwrap();
    assert_eq!(sheet.value(pos("A1")).unwrap(), Value::from("=5"));
    assert_eq!(sheet.text(pos("A1")).unwrap(), "'=5");
    assert!(sheet.referenced_cells(pos("A1")).unwrap().is_empty());
}

#[test]
fn empty_text_coerces_to_zero() {
    let mut sheet = Sheet::new();
    sheet.set_cell(pos("A1"), "x").unwrap();
    sheet.set_cell(pos("A1"), "").unwrap();
    sheet.set_cell(pos("B1"), "=A1+1").unwrap();
    assert_eq!(sheet.value(pos("B1")).unwrap(), num(1.0));
}

#[test]
fn numeric_text_coerces() {
    let mut sheet = Sheet::new();
    sheet.set_cell(pos("A1"), "2.5").unwrap();
    sheet.set_cell(pos("B1"), "=A1*4").unwrap();
    assert_eq!(sheet.value(pos("A1")).unwrap(), Value::from("2.5"));
    assert_eq!(sheet.value(pos("B1")).unwrap(), num(10.0));
}

#[test]
fn non_numeric_text_is_value_error() {
    let mut sheet = Sheet::new();
    sheet.set_cell(pos("A1"), "abc").unwrap();
    sheet.set_cell(pos("B1"), "=A1+1").unwrap();
    assert_eq!(sheet.value(pos("B1")).unwrap(), Value::Error(ErrorKind::Value));
}

#[test]
fn text_with_leading_number_coerces_to_that_number() {
    let mut sheet = Sheet::new();
    sheet.set_cell(pos("B1"), "=A1+1").unwrap();
    for text in ["3 apples", " 3", "3 "] {
        sheet.set_cell(pos("A1"), text).unwrap();
        assert_eq!(sheet.value(pos("B1")).unwrap(), num(4.0), "A1 = {:?}", text);
    }
}

#[test]
fn escaped_number_text_coerces_after_stripping() {
    let mut sheet = Sheet::new();
    sheet.set_cell(pos("A1"), "'12").unwrap();
    sheet.set_cell(pos("B1"), "=A1+1").unwrap();
    assert_eq!(sheet.value(pos("B1")).unwrap(), num(13.0));
}

#[test]
fn errors_propagate_verbatim() {
    let mut sheet = Sheet::new();
    sheet.set_cell(pos("A1"), "=1/0").unwrap();
    sheet.set_cell(pos("B1"), "=A1+1").unwrap();
    sheet.set_cell(pos("C1"), "=B1*0").unwrap();
    sheet.set_cell(pos("D1"), "=ZZZZ1").unwrap();
    sheet.set_cell(pos("E1"), "=D1/0").unwrap();

    assert_eq!(sheet.value(pos("A1")).unwrap(), Value::Error(ErrorKind::Div0));
    assert_eq!(sheet.value(pos("B1")).unwrap(), Value::Error(ErrorKind::Div0));
    assert_eq!(sheet.value(pos("C1")).unwrap(), Value::Error(ErrorKind::Div0));
    assert_eq!(sheet.value(pos("E1")).unwrap(), Value::Error(ErrorKind::Ref));
}

#[test]
fn fixing_upstream_error_clears_downstream() {
    let mut sheet = Sheet::new();
    sheet.set_cell(pos("A1"), "0").unwrap();
    sheet.set_cell(pos("B1"), "=1/A1").unwrap();
    sheet.set_cell(pos("C1"), "=B1+1").unwrap();
    assert_eq!(sheet.value(pos("C1")).unwrap(), Value::Error(ErrorKind::Div0));

    sheet.set_cell(pos("A1"), "4").unwrap();
    assert_eq!(sheet.value(pos("C1")).unwrap(), num(1.25));
}

// ---------------------------------------------------------------------------
// Clearing
// ---------------------------------------------------------------------------

#[test]
fn clearing_upstream_recomputes_dependents() {
    let mut sheet = Sheet::new();
    sheet.set_cell(pos("A1"), "3").unwrap();
    sheet.set_cell(pos("B1"), "=A1*A1").unwrap();
    assert_eq!(sheet.value(pos("B1")).unwrap(), num(9.0));

    sheet.clear_cell(pos("A1")).unwrap();
    assert_eq!(sheet.value(pos("B1")).unwrap(), num(0.0));
}

#[test]
fn clearing_formula_unlinks_it() {
    let mut sheet = Sheet::new();
    sheet.set_cell(pos("A1"), "1").unwrap();
    sheet.set_cell(pos("B1"), "=A1").unwrap();
    sheet.clear_cell(pos("B1")).unwrap();

    assert!(sheet.dependents(pos("A1")).unwrap().is_empty());
    // With the edge gone A1 may now read B1
    sheet.set_cell(pos("A1"), "=B1").unwrap();
    assert_eq!(sheet.value(pos("A1")).unwrap(), num(0.0));
}
