use super::*;
use tempfile::tempdir;
use types::Value;

#[test]
fn create_then_lookup_round_trips_schema() {
    let dir = tempdir().unwrap();
    let mut catalog = Catalog::open(dir.path(), 16).unwrap();
    catalog
        .create_table(
            "users",
            vec![
                Column::new("id", SqlType::Int),
                Column::new("name", SqlType::Varchar),
            ],
        )
        .unwrap();

    let table = catalog.table("USERS").unwrap();
    assert_eq!(table.name, "users");
    assert_eq!(table.schema(), vec!["id".to_string(), "name".to_string()]);
    assert_eq!(table.index_column(), Some(0));
}

#[test]
fn duplicate_table_name_is_rejected() {
    let dir = tempdir().unwrap();
    let mut catalog = Catalog::open(dir.path(), 16).unwrap();
    catalog
        .create_table("t", vec![Column::new("a", SqlType::Int)])
        .unwrap();
    assert!(catalog
        .create_table("t", vec![Column::new("a", SqlType::Int)])
        .is_err());
}

#[test]
fn unknown_table_lookup_fails() {
    let dir = tempdir().unwrap();
    let catalog = Catalog::open(dir.path(), 16).unwrap();
    assert!(catalog.table("nope").is_err());
}

#[test]
fn drop_table_removes_backing_file() {
    let dir = tempdir().unwrap();
    let mut catalog = Catalog::open(dir.path(), 16).unwrap();
    catalog
        .create_table("t", vec![Column::new("a", SqlType::Int)])
        .unwrap();
    let path = dir.path().join("t.db");
    assert!(path.exists());

    catalog.drop_table("t").unwrap();
    assert!(!path.exists());
    assert!(catalog.table("t").is_err());
}

#[test]
fn reopening_restores_tables_and_index_binding() {
    let dir = tempdir().unwrap();
    let rid;
    {
        let mut catalog = Catalog::open(dir.path(), 16).unwrap();
        catalog
            .create_table(
                "t",
                vec![Column::new("id", SqlType::Int), Column::new("v", SqlType::Varchar)],
            )
            .unwrap();
        let table = catalog.table_mut("t").unwrap();
        rid = table.heap.insert(&[Value::Int(1), Value::Text("a".into())]).unwrap();
        table
            .index
            .as_mut()
            .unwrap()
            .insert(table.heap.pool_mut(), Value::Int(1), rid)
            .unwrap();
        catalog.sync_index_roots().unwrap();
        catalog.flush_all().unwrap();
    }

    let mut catalog = Catalog::open(dir.path(), 16).unwrap();
    let table = catalog.table_mut("t").unwrap();
    assert_eq!(
        table.heap.get(rid).unwrap().unwrap(),
        vec![Value::Int(1), Value::Text("a".into())]
    );
    let found = table
        .index
        .as_ref()
        .unwrap()
        .search(table.heap.pool_mut(), &Value::Int(1))
        .unwrap();
    assert_eq!(found, Some(rid));
}
