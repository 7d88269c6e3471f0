// SPDX-License-Identifier: MIT

use super::*;
use oms_core::FixedClock;

fn coordinator() -> ConflictCoordinator {
    ConflictCoordinator::new(Arc::new(FixedClock::new(1_700_000_000_000)))
}

#[test]
fn claim_then_same_task_reclaim_succeeds() {
    let c = coordinator();
    c.claim_file("src/lib.rs", "task-1").unwrap();
    c.claim_file("src/lib.rs", "task-1").unwrap();
    assert_eq!(c.holder_of("src/lib.rs").unwrap(), "task-1");
}

#[test]
fn claim_by_other_task_is_contested() {
    let c = coordinator();
    c.claim_file("src/lib.rs", "task-1").unwrap();
    let err = c.claim_file("src/lib.rs", "task-2").unwrap_err();
    assert!(matches!(err, EngineError::FileContested(_)));
}

#[test]
fn release_frees_the_file_for_others() {
    let c = coordinator();
    c.claim_file("src/lib.rs", "task-1").unwrap();
    c.release_file("src/lib.rs", "task-1");
    c.claim_file("src/lib.rs", "task-2").unwrap();
    assert_eq!(c.holder_of("src/lib.rs").unwrap(), "task-2");
}

#[test]
fn complain_and_revoke_round_trip() {
    let c = coordinator();
    c.claim_file("src/lib.rs", "task-1").unwrap();
    c.complain("src/lib.rs", "task-2", "stale lock").unwrap();
    assert_eq!(c.complaints_for("src/lib.rs").len(), 1);
    c.revoke_complaint("src/lib.rs", "task-2");
    assert!(c.complaints_for("src/lib.rs").is_empty());
}

#[test]
fn revoke_all_clears_every_complaint_by_that_agent() {
    let c = coordinator();
    c.claim_file("src/lib.rs", "task-1").unwrap();
    c.claim_file("src/main.rs", "task-1").unwrap();
    c.complain("src/lib.rs", "task-2", "stale lock").unwrap();
    c.complain("src/main.rs", "task-2", "stale lock").unwrap();
    c.revoke_all("task-2");
    assert!(c.complaints_for("src/lib.rs").is_empty());
    assert!(c.complaints_for("src/main.rs").is_empty());
}

#[tokio::test]
async fn wait_for_release_wakes_on_release() {
    let c = Arc::new(coordinator());
    c.claim_file("src/lib.rs", "task-1").unwrap();
    let waiter = {
        let c = c.clone();
        tokio::spawn(async move { c.wait_for_release("src/lib.rs").await })
    };
    tokio::task::yield_now().await;
    c.release_file("src/lib.rs", "task-1");
    tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
        .await
        .expect("waiter should have woken")
        .unwrap();
}
