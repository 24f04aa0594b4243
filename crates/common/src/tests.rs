use super::*;
use std::io;

#[test]
fn config_defaults_are_sane() {
    let cfg = Config::default();
    assert_eq!(cfg.data_dir, PathBuf::from("."));
    assert_eq!(cfg.buffer_pool_pages, 128);
}

#[test]
fn db_error_formats_cleanly() {
    let err = DbError::Storage("corruption".into());
    assert!(format!("{err}").contains("storage"));
}

#[test]
fn pool_exhausted_has_no_payload_but_still_reports() {
    let err = DbError::PoolExhausted;
    assert!(format!("{err}").contains("exhausted"));
}

#[test]
fn recordbatch_consistency() {
    let rb = RecordBatch {
        columns: vec!["id".into()],
        rows: vec![Row::new(vec![Value::Int(1)])],
    };
    assert_eq!(rb.columns.len(), 1);
    assert_eq!(rb.rows[0].values.len(), 1);
}

#[test]
fn record_id_invalid_sentinel() {
    assert!(!RecordId::invalid().is_valid());
    assert!(RecordId { page_id: 1, slot: 0 }.is_valid());
}

#[test]
fn io_error_converts() {
    let e = io::Error::other("oops");
    let db_err: DbError = e.into();
    assert!(matches!(db_err, DbError::Io(_)));
}
