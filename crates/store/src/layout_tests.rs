// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn issue_file_lives_under_tasks_dir() {
    let layout = StoreLayout::new("/var/oms");
    assert_eq!(
        layout.issue_file("fix-bug-aaaa"),
        PathBuf::from("/var/oms/tasks/fix-bug-aaaa.json")
    );
}

#[test]
fn legacy_file_renamed_on_migration() {
    let layout = StoreLayout::new("/var/oms");
    assert_eq!(layout.legacy_tasks_file(), PathBuf::from("/var/oms/tasks.json"));
    assert_eq!(
        layout.legacy_tasks_migrated_file(),
        PathBuf::from("/var/oms/tasks.json.migrated")
    );
}
