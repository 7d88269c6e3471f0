// SPDX-License-Identifier: MIT

use super::*;
use std::collections::BTreeMap;

#[test]
fn round_trips_through_atomic_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("thing.json");
    let tmp = dir.path().join("thing.json.tmp");
    let mut value = BTreeMap::new();
    value.insert("a".to_string(), 1);
    write_json_atomic(&path, &tmp, &value).unwrap();
    assert!(!tmp.exists());
    let back: Option<BTreeMap<String, i32>> = read_json(&path).unwrap();
    assert_eq!(back, Some(value));
}

#[test]
fn missing_file_reads_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.json");
    let back: Option<BTreeMap<String, i32>> = read_json(&path).unwrap();
    assert_eq!(back, None);
}
