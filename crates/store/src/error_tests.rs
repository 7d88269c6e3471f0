// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn core_not_found_maps_through() {
    let err: StoreError = CoreError::NotFound("fix-bug-aaaa".into()).into();
    assert!(matches!(err, StoreError::NotFound(id) if id == "fix-bug-aaaa"));
}

#[test]
fn core_cycle_becomes_validation() {
    let err: StoreError = CoreError::CycleDetected("a -> b -> a".into()).into();
    assert!(matches!(err, StoreError::Validation(_)));
}
