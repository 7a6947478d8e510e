use super::*;
use tempfile::TempDir;

fn create_test_log() -> (RedbLog, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let log = RedbLog::open(dir.path()).expect("Failed to open log");
    (log, dir)
}

fn collect(log: &dyn DurableLog) -> Vec<(String, Vec<u8>)> {
    let mut records = Vec::new();
    log.scan(&mut |key, value| {
        records.push((key.to_string(), value.to_vec()));
        Ok(())
    })
    .expect("scan failed");
    records
}

#[test]
fn test_encode_decode_vector() {
    let vector = vec![1.0f32, -0.5, 0.25, f32::MIN_POSITIVE];
    let bytes = encode_vector(&vector);

    assert_eq!(bytes.len(), vector.len() * 4);
    assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
    assert_eq!(decode_vector(&bytes), Some(vector));
}

#[test]
fn test_decode_rejects_ragged_length() {
    assert_eq!(decode_vector(&[0u8; 7]), None);
    assert_eq!(decode_vector(&[]), Some(Vec::new()));
    assert_eq!(codec::encoded_dim(12), Some(3));
    assert_eq!(codec::encoded_dim(13), None);
}

#[test]
fn test_open_directory_uses_default_filename() {
    let (log, dir) = create_test_log();
    assert_eq!(log.path(), dir.path().join(DEFAULT_LOG_FILENAME));
    assert!(log.path().exists());
}

#[test]
fn test_open_creates_parent_dirs() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let nested = dir.path().join("a").join("b").join("feat.redb");

    let log = RedbLog::open(&nested).expect("Failed to open nested log");
    assert_eq!(log.path(), nested.as_path());
    assert!(nested.exists());
}

#[test]
fn test_open_invalid_path_fails() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").expect("write");

    let result = RedbLog::open(blocker.join("feat.redb"));
    assert!(matches!(result, Err(StorageError::OpenFailed { .. })));
}

#[test]
fn test_put_scan_in_key_order() {
    let (log, _dir) = create_test_log();

    log.put("zebra", &encode_vector(&[1.0])).expect("put");
    log.put("apple", &encode_vector(&[2.0])).expect("put");
    log.put("mango", &encode_vector(&[3.0])).expect("put");

    let keys: Vec<String> = collect(&log).into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["apple", "mango", "zebra"]);
}

#[test]
fn test_put_replaces_value() {
    let (log, _dir) = create_test_log();

    log.put("k", &encode_vector(&[1.0, 2.0])).expect("put");
    log.put("k", &encode_vector(&[3.0, 4.0])).expect("put");

    let records = collect(&log);
    assert_eq!(records.len(), 1);
    assert_eq!(decode_vector(&records[0].1), Some(vec![3.0, 4.0]));
}

#[test]
fn test_delete_absent_is_ok() {
    let (log, _dir) = create_test_log();

    log.put("k", b"abcd").expect("put");
    log.delete("k").expect("delete");
    log.delete("k").expect("second delete");

    assert!(collect(&log).is_empty());
}

#[test]
fn test_reopen_sees_committed_records() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    {
        let log = RedbLog::open(dir.path()).expect("open");
        log.put("a", &encode_vector(&[0.5])).expect("put");
        log.put("b", &encode_vector(&[0.25])).expect("put");
        log.delete("a").expect("delete");
    }

    let log = RedbLog::open(dir.path()).expect("reopen");
    let records = collect(&log);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].0, "b");
}

#[test]
fn test_scan_stops_on_visitor_error() {
    let (log, _dir) = create_test_log();
    log.put("a", b"1111").expect("put");
    log.put("b", b"2222").expect("put");

    let mut visited = 0;
    let result = log.scan(&mut |key, _| {
        visited += 1;
        Err(StorageError::CorruptRecord {
            key: key.to_string(),
            reason: "stop".to_string(),
        })
    });

    assert!(matches!(result, Err(StorageError::CorruptRecord { .. })));
    assert_eq!(visited, 1);
}

#[test]
fn test_mock_log_injected_failure() {
    let log = MockLog::new();
    log.put("a", b"1234").expect("put");

    log.set_fail_writes(true);
    assert!(matches!(
        log.put("b", b"5678"),
        Err(StorageError::WriteFailed { .. })
    ));
    assert!(matches!(
        log.delete("a"),
        Err(StorageError::WriteFailed { .. })
    ));
    assert_eq!(log.len(), 1);

    log.set_fail_writes(false);
    log.delete("a").expect("delete");
    assert!(log.is_empty());
}

#[test]
fn test_arc_log_forwards() {
    let log = std::sync::Arc::new(MockLog::new());
    let shared: std::sync::Arc<MockLog> = std::sync::Arc::clone(&log);

    shared.put("k", b"abcd").expect("put");
    assert_eq!(log.get("k"), Some(b"abcd".to_vec()));
    assert_eq!(collect(&shared).len(), 1);
}
