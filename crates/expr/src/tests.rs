use super::*;
use types::Value::*;

fn schema(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|s| s.to_string()).collect()
}

#[test]
fn eval_literals_and_columns() {
    let row = Row::new(vec![Int(1), Text("Will".into()), Bool(true)]);
    let schema = schema(&["id", "name", "active"]);
    let ctx = EvalContext { schema: &schema };

    assert_eq!(ctx.eval(&Expr::Literal(Int(42)), &row).unwrap(), Int(42));
    assert_eq!(
        ctx.eval(&Expr::Column("name".into()), &row).unwrap(),
        Text("Will".into())
    );
}

#[test]
fn eval_comparisons() {
    let row = Row::new(vec![Int(10), Int(20)]);
    let schema = schema(&["a", "b"]);
    let ctx = EvalContext { schema: &schema };

    let lt = Expr::Binary {
        left: Box::new(Expr::Column("a".into())),
        op: BinaryOp::Lt,
        right: Box::new(Expr::Column("b".into())),
    };
    assert_eq!(ctx.eval(&lt, &row).unwrap(), Bool(true));
}

#[test]
fn eval_logical_ops() {
    let row = Row::new(vec![Bool(true), Bool(false)]);
    let schema = schema(&["x", "y"]);
    let ctx = EvalContext { schema: &schema };

    let expr = Expr::Binary {
        left: Box::new(Expr::Column("x".into())),
        op: BinaryOp::And,
        right: Box::new(Expr::Column("y".into())),
    };
    assert_eq!(ctx.eval(&expr, &row).unwrap(), Bool(false));
}

#[test]
fn not_operator() {
    let row = Row::new(vec![Bool(false)]);
    let schema = schema(&["f"]);
    let ctx = EvalContext { schema: &schema };

    let expr = Expr::Unary {
        op: UnaryOp::Not,
        expr: Box::new(Expr::Column("f".into())),
    };
    assert_eq!(ctx.eval(&expr, &row).unwrap(), Bool(true));
}

#[test]
fn null_never_equals_anything_including_itself() {
    let row = Row::new(vec![Null, Text("x".into())]);
    let schema = schema(&["a", "b"]);
    let ctx = EvalContext { schema: &schema };

    let eq_literal = Expr::Binary {
        left: Box::new(Expr::Column("a".into())),
        op: BinaryOp::Eq,
        right: Box::new(Expr::Literal(Text("x".into()))),
    };
    assert_eq!(ctx.eval(&eq_literal, &row).unwrap(), Bool(false));

    let ne_literal = Expr::Binary {
        left: Box::new(Expr::Column("a".into())),
        op: BinaryOp::Ne,
        right: Box::new(Expr::Literal(Text("x".into()))),
    };
    assert_eq!(ctx.eval(&ne_literal, &row).unwrap(), Bool(true));

    let self_eq = Expr::Binary {
        left: Box::new(Expr::Literal(Null)),
        op: BinaryOp::Eq,
        right: Box::new(Expr::Literal(Null)),
    };
    assert_eq!(ctx.eval(&self_eq, &row).unwrap(), Bool(false));
}

#[test]
fn ordering_against_null_is_still_a_type_error() {
    let row = Row::new(vec![Null]);
    let schema = schema(&["a"]);
    let ctx = EvalContext { schema: &schema };

    let expr = Expr::Binary {
        left: Box::new(Expr::Column("a".into())),
        op: BinaryOp::Lt,
        right: Box::new(Expr::Literal(Int(1))),
    };
    assert!(ctx.eval(&expr, &row).is_err());
}

#[test]
fn mismatched_types_fail() {
    let row = Row::new(vec![Int(1), Text("hi".into())]);
    let schema = schema(&["a", "b"]);
    let ctx = EvalContext { schema: &schema };

    let expr = Expr::Binary {
        left: Box::new(Expr::Column("a".into())),
        op: BinaryOp::Eq,
        right: Box::new(Expr::Column("b".into())),
    };

    let err = ctx.eval(&expr, &row).unwrap_err();
    assert!(format!("{err:?}").contains("incompatible types"));
}
