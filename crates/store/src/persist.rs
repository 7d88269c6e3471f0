// SPDX-License-Identifier: MIT

//! Atomic write-then-rename helpers shared by every durable write the store
//! performs.

use std::fs;
use std::path::Path;

pub fn write_json_atomic<T: serde::Serialize>(
    path: &Path,
    tmp_path: &Path,
    value: &T,
) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut body = serde_json::to_vec_pretty(value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    body.push(b'\n');
    fs::write(tmp_path, body)?;
    fs::rename(tmp_path, path)?;
    Ok(())
}

pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> std::io::Result<Option<T>> {
    match fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
