// SPDX-License-Identifier: MIT

//! On-disk layout (§4.1, §6 "task store files"): one JSON file per issue
//! under `tasks/`, plus `_index.json` and `_activity.json` siblings. A
//! legacy single-file `tasks.json` is migrated in place on first open and
//! renamed to `tasks.json.migrated`.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.root.join("tasks")
    }

    pub fn issue_file(&self, id: &str) -> PathBuf {
        self.tasks_dir().join(format!("{id}.json"))
    }

    pub fn issue_tmp_file(&self, id: &str) -> PathBuf {
        self.tasks_dir().join(format!("{id}.json.tmp"))
    }

    pub fn index_file(&self) -> PathBuf {
        self.root.join("_index.json")
    }

    pub fn index_tmp_file(&self) -> PathBuf {
        self.root.join("_index.json.tmp")
    }

    pub fn activity_file(&self) -> PathBuf {
        self.root.join("_activity.json")
    }

    pub fn activity_tmp_file(&self) -> PathBuf {
        self.root.join("_activity.json.tmp")
    }

    pub fn legacy_tasks_file(&self) -> PathBuf {
        self.root.join("tasks.json")
    }

    pub fn legacy_tasks_migrated_file(&self) -> PathBuf {
        self.root.join("tasks.json.migrated")
    }
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
