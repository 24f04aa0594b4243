use super::*;
use pretty_assertions::assert_eq;

#[test]
fn parse_basic_statements() {
    let sql = r#"
        CREATE TABLE users (id INT, name TEXT, age INT);
        INSERT INTO users VALUES (1, 'Will', 27), (2, 'Ada', 30);
        SELECT id, name FROM users WHERE age > 20;
    "#;

    let stmts = parse_sql(sql).expect("parser should succeed");
    assert_eq!(stmts.len(), 3);

    match &stmts[0] {
        Statement::CreateTable { name, columns } => {
            assert_eq!(name, "users");
            assert_eq!(columns.len(), 3);
            assert_eq!(columns[1].name, "name");
            assert_eq!(columns[1].ty, "TEXT");
        }
        other => panic!("expected CreateTable, got {other:?}"),
    }

    match &stmts[1] {
        Statement::Insert {
            table,
            columns,
            values,
        } => {
            assert_eq!(table, "users");
            assert!(columns.is_none());
            assert_eq!(values.len(), 2);
            assert_eq!(values[0].len(), 3);
        }
        other => panic!("expected Insert, got {other:?}"),
    }

    match &stmts[2] {
        Statement::Select {
            table,
            selection,
            columns,
        } => {
            assert_eq!(table, "users");
            assert_eq!(columns.len(), 2);
            let selection = selection.as_ref().expect("WHERE clause required");
            let display = format!("{selection:?}");
            assert!(display.contains("age"));
        }
        other => panic!("expected Select, got {other:?}"),
    }
}

#[test]
fn parse_insert_with_explicit_column_list() {
    let sql = "INSERT INTO t (b, a) VALUES (1, 2);";
    let stmts = parse_sql(sql).expect("parser should succeed");
    match &stmts[0] {
        Statement::Insert { columns, .. } => {
            assert_eq!(columns.as_deref(), Some(&["b".to_string(), "a".to_string()][..]));
        }
        other => panic!("expected Insert, got {other:?}"),
    }
}

#[test]
fn parse_delete_has_no_selection() {
    let sql = "DELETE FROM users;";
    let stmts = parse_sql(sql).expect("parser should succeed");
    match &stmts[0] {
        Statement::Delete { table } => assert_eq!(table, "users"),
        other => panic!("expected Delete, got {other:?}"),
    }
}

#[test]
fn parse_select_wildcard() {
    let sql = "SELECT * FROM users;";
    let stmts = parse_sql(sql).expect("parser should succeed");
    match &stmts[0] {
        Statement::Select {
            columns, selection, ..
        } => {
            assert_eq!(columns, &[SelectItem::Wildcard]);
            assert!(selection.is_none());
        }
        other => panic!("expected Select, got {other:?}"),
    }
}

#[test]
fn rejects_joins() {
    let sql = "SELECT * FROM a, b;";
    assert!(parse_sql(sql).is_err());
}

#[test]
fn negative_int_literal_folds_into_a_single_value() {
    let sql = "INSERT INTO t VALUES (-5); SELECT * FROM t WHERE id = -5;";
    let stmts = parse_sql(sql).expect("parser should succeed");

    match &stmts[0] {
        Statement::Insert { values, .. } => {
            assert_eq!(values[0], vec![Expr::Literal(Value::Int(-5))]);
        }
        other => panic!("expected Insert, got {other:?}"),
    }
    match &stmts[1] {
        Statement::Select { selection, .. } => {
            let expected = Expr::Binary {
                left: Box::new(Expr::Column("id".into())),
                op: BinaryOp::Eq,
                right: Box::new(Expr::Literal(Value::Int(-5))),
            };
            assert_eq!(selection.as_ref().unwrap(), &expected);
        }
        other => panic!("expected Select, got {other:?}"),
    }
}

#[test]
fn negative_double_literal_folds_into_a_single_value() {
    let sql = "INSERT INTO t VALUES (-3.14);";
    let stmts = parse_sql(sql).expect("parser should succeed");
    match &stmts[0] {
        Statement::Insert { values, .. } => {
            assert_eq!(values[0], vec![Expr::Literal(Value::Double(-3.14))]);
        }
        other => panic!("expected Insert, got {other:?}"),
    }
}

#[test]
fn decimal_literal_parses_as_double() {
    let sql = "INSERT INTO t VALUES (3.14);";
    let stmts = parse_sql(sql).expect("parser should succeed");
    match &stmts[0] {
        Statement::Insert { values, .. } => {
            assert_eq!(values[0], vec![Expr::Literal(Value::Double(3.14))]);
        }
        other => panic!("expected Insert, got {other:?}"),
    }
}
