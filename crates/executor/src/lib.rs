//! Walks a parsed statement directly against the catalog: no physical
//! plan, no Volcano iterator tree. Each statement kind gets one
//! dispatch function that talks to `catalog::Catalog` and picks an
//! access path (index seek, index scan, or full scan) for its
//! predicate.

use catalog::{Catalog, Column as CatalogColumn};
use common::{DbError, DbResult, RecordBatch, Row};
use expr::{BinaryOp, EvalContext, Expr};
use parser::{ColumnDef, SelectItem, Statement};
use types::{SqlType, Value};

/// What executing a statement produced.
#[derive(Debug)]
pub enum ExecResult {
    Created,
    Inserted(usize),
    Deleted(usize),
    Rows(RecordBatch),
}

pub fn execute(stmt: Statement, catalog: &mut Catalog) -> DbResult<ExecResult> {
    match stmt {
        Statement::CreateTable { name, columns } => execute_create(&name, columns, catalog),
        Statement::Insert {
            table,
            columns,
            values,
        } => execute_insert(&table, columns, values, catalog),
        Statement::Select {
            columns,
            table,
            selection,
        } => execute_select(&table, columns, selection, catalog),
        Statement::Delete { table } => execute_delete(&table, catalog),
    }
}

fn execute_create(name: &str, columns: Vec<ColumnDef>, catalog: &mut Catalog) -> DbResult<ExecResult> {
    let _span =
        tracing::debug_span!("execute_statement", statement_kind = "create_table", table = name).entered();

    let columns = columns
        .into_iter()
        .map(|col| {
            let ty = SqlType::from_name(&col.ty)
                .ok_or_else(|| DbError::TypeError(format!("unsupported column type '{}'", col.ty)))?;
            Ok(CatalogColumn::new(col.name, ty))
        })
        .collect::<DbResult<Vec<_>>>()?;

    catalog.create_table(name, columns)?;
    Ok(ExecResult::Created)
}

fn execute_insert(
    table_name: &str,
    target_columns: Option<Vec<String>>,
    values: Vec<Vec<Expr>>,
    catalog: &mut Catalog,
) -> DbResult<ExecResult> {
    let _span = tracing::debug_span!("execute_statement", statement_kind = "insert", table = table_name).entered();

    let empty_ctx = EvalContext { schema: &[] };
    let empty_row = Row::new(vec![]);

    let table = catalog.table_mut(table_name)?;
    let width = table.columns.len();
    let index_col = table.index_column();

    let mut ordinals: Option<Vec<usize>> = None;
    if let Some(names) = &target_columns {
        let mut resolved = Vec::with_capacity(names.len());
        for name in names {
            resolved.push(table.column_index(name)?);
        }
        ordinals = Some(resolved);
    }

    let mut inserted = 0usize;
    for row_exprs in values {
        let evaluated = row_exprs
            .iter()
            .map(|e| empty_ctx.eval(e, &empty_row))
            .collect::<DbResult<Vec<_>>>()?;

        let row_values = match &ordinals {
            None => {
                if evaluated.len() != width {
                    return Err(DbError::Constraint(format!(
                        "expected {width} values, got {}",
                        evaluated.len()
                    )));
                }
                evaluated
            }
            Some(ordinals) => {
                if evaluated.len() != ordinals.len() {
                    return Err(DbError::Constraint(format!(
                        "expected {} values, got {}",
                        ordinals.len(),
                        evaluated.len()
                    )));
                }
                let mut full = vec![Value::Null; width];
                for (ordinal, value) in ordinals.iter().zip(evaluated.into_iter()) {
                    full[*ordinal] = value;
                }
                full
            }
        };

        let rid = table.heap.insert(&row_values)?;
        if let Some(idx) = index_col {
            let key = row_values[idx].clone();
            table
                .index
                .as_mut()
                .expect("index_column() returned Some")
                .insert(table.heap.pool_mut(), key, rid)?;
        }
        inserted += 1;
    }

    if index_col.is_some() {
        catalog.sync_index_roots()?;
    }
    Ok(ExecResult::Inserted(inserted))
}

fn execute_select(
    table_name: &str,
    projection: Vec<SelectItem>,
    selection: Option<Expr>,
    catalog: &mut Catalog,
) -> DbResult<ExecResult> {
    let _span = tracing::debug_span!("execute_statement", statement_kind = "select", table = table_name).entered();

    let table = catalog.table_mut(table_name)?;
    let schema = table.schema();
    let ctx = EvalContext { schema: &schema };
    let index_col_name = table.index_column().map(|i| schema[i].clone());

    let mut matched: Vec<Vec<Value>> = Vec::new();

    match access_path(&selection, index_col_name.as_deref()) {
        AccessPath::IndexSeek { literal } => {
            tracing::debug!(table = table_name, "index seek");
            // A delete never touches the index, so the rid it points at
            // may now hold an unrelated (or no) row. Re-check the
            // predicate against whatever the heap actually has there.
            if let Some(rid) = table
                .index
                .as_ref()
                .unwrap()
                .search(table.heap.pool_mut(), &literal)?
            {
                if let Some(values) = table.heap.get(rid)? {
                    let row = Row::new(values.clone());
                    let keep = match &selection {
                        Some(expr) => ctx.eval(expr, &row)?.as_bool().unwrap_or(false),
                        None => true,
                    };
                    if keep {
                        matched.push(values);
                    }
                }
            }
        }
        AccessPath::IndexScan { op, literal } => {
            tracing::debug!(table = table_name, ?op, "index scan");
            let mut cursor = table
                .index
                .as_ref()
                .unwrap()
                .range_start(table.heap.pool_mut(), Some(&literal))?;
            while !cursor.is_end() {
                let key = cursor.key().unwrap().clone();
                if matches!(op, BinaryOp::Eq) && !matches!(key.eq_same_type(&literal), Some(true)) {
                    break;
                }
                let rid = cursor.rid().unwrap();
                if let Some(values) = table.heap.get(rid)? {
                    let row = Row::new(values.clone());
                    let keep = match &selection {
                        Some(expr) => ctx.eval(expr, &row)?.as_bool().unwrap_or(false),
                        None => true,
                    };
                    if keep {
                        matched.push(values);
                    }
                }
                cursor.next(table.heap.pool_mut())?;
            }
        }
        AccessPath::FullScan => {
            tracing::debug!(table = table_name, "full scan");
            let mut iter = table.heap.scan();
            while let Some((_, values)) = iter.next_row()? {
                let row = Row::new(values.clone());
                let keep = match &selection {
                    Some(expr) => ctx.eval(expr, &row)?.as_bool().unwrap_or(false),
                    None => true,
                };
                if keep {
                    matched.push(values);
                }
            }
        }
    }

    let (out_columns, project): (Vec<String>, Box<dyn Fn(&[Value]) -> Vec<Value>>) =
        if projection.iter().any(|item| matches!(item, SelectItem::Wildcard)) {
            (schema.clone(), Box::new(|values: &[Value]| values.to_vec()))
        } else {
            let mut indices = Vec::with_capacity(projection.len());
            let mut names = Vec::with_capacity(projection.len());
            for item in &projection {
                if let SelectItem::Column(name) = item {
                    let idx = schema
                        .iter()
                        .position(|c| c.eq_ignore_ascii_case(name))
                        .ok_or_else(|| DbError::TypeError(format!("unknown column '{name}'")))?;
                    indices.push(idx);
                    names.push(schema[idx].clone());
                }
            }
            (
                names,
                Box::new(move |values: &[Value]| indices.iter().map(|&i| values[i].clone()).collect()),
            )
        };

    let rows = matched.into_iter().map(|v| Row::new(project(&v))).collect();
    Ok(ExecResult::Rows(RecordBatch {
        columns: out_columns,
        rows,
    }))
}

/// `DELETE` carries no WHERE clause at the parser level, so it always
/// removes every row of the table. Secondary-index entries are left in
/// place (no cleanup).
fn execute_delete(table_name: &str, catalog: &mut Catalog) -> DbResult<ExecResult> {
    let _span = tracing::debug_span!("execute_statement", statement_kind = "delete", table = table_name).entered();

    let table = catalog.table_mut(table_name)?;
    let mut rids = Vec::new();
    {
        let mut iter = table.heap.scan();
        while let Some((rid, _)) = iter.next_row()? {
            rids.push(rid);
        }
    }
    let mut deleted = 0;
    for rid in rids {
        if table.heap.delete(rid)? {
            deleted += 1;
        }
    }
    Ok(ExecResult::Deleted(deleted))
}

enum AccessPath {
    IndexSeek { literal: Value },
    IndexScan { op: BinaryOp, literal: Value },
    FullScan,
}

/// Picks an access path per the rule: a lone top-level `col = literal`
/// (or `literal = col`) on the indexed column is a point seek; any
/// conjunction containing a `col op literal` (`op` in `=`, `>=`, `>`) on
/// the indexed column is a range scan seeded at that bound; anything
/// else is a full scan.
fn access_path(selection: &Option<Expr>, index_col: Option<&str>) -> AccessPath {
    let (Some(expr), Some(index_col)) = (selection, index_col) else {
        return AccessPath::FullScan;
    };

    if let Some(literal) = as_indexed_equality(expr, index_col) {
        return AccessPath::IndexSeek {
            literal: literal.clone(),
        };
    }

    for conjunct in conjuncts(expr) {
        if let Some((op, literal)) = as_indexed_bound(conjunct, index_col) {
            return AccessPath::IndexScan {
                op,
                literal: literal.clone(),
            };
        }
    }

    AccessPath::FullScan
}

fn conjuncts(expr: &Expr) -> Vec<&Expr> {
    match expr {
        Expr::Binary {
            left,
            op: BinaryOp::And,
            right,
        } => {
            let mut out = conjuncts(left);
            out.extend(conjuncts(right));
            out
        }
        other => vec![other],
    }
}

fn as_indexed_equality<'a>(expr: &'a Expr, index_col: &str) -> Option<&'a Value> {
    match expr {
        Expr::Binary {
            left,
            op: BinaryOp::Eq,
            right,
        } => match (left.as_ref(), right.as_ref()) {
            (Expr::Column(c), Expr::Literal(v)) if c.eq_ignore_ascii_case(index_col) => Some(v),
            (Expr::Literal(v), Expr::Column(c)) if c.eq_ignore_ascii_case(index_col) => Some(v),
            _ => None,
        },
        _ => None,
    }
}

fn as_indexed_bound<'a>(expr: &'a Expr, index_col: &str) -> Option<(BinaryOp, &'a Value)> {
    match expr {
        Expr::Binary { left, op, right } if matches!(op, BinaryOp::Eq | BinaryOp::Ge | BinaryOp::Gt) => {
            match (left.as_ref(), right.as_ref()) {
                (Expr::Column(c), Expr::Literal(v)) if c.eq_ignore_ascii_case(index_col) => Some((*op, v)),
                (Expr::Literal(v), Expr::Column(c)) if *op == BinaryOp::Eq && c.eq_ignore_ascii_case(index_col) => {
                    Some((*op, v))
                }
                _ => None,
            }
        }
        _ => None,
    }
}
