//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub fn temp_dir() -> TempDir {
    TempDir::new().expect("create temp dir")
}

/// Drops the temp dir, or keeps it on disk when `KEEP_FILES=1` is set.
pub fn finish(dir: TempDir) {
    if std::env::var("KEEP_FILES").as_deref() == Ok("1") {
        let path = dir.into_path();
        eprintln!("KEEP {}", path.display());
    }
}

pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write test file");
    path
}

/// Deterministic pseudo-random bytes without pulling in a seeded RNG for
/// every test site.
pub fn patterned_bytes(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u64 * 31 + seed as u64 * 17 + (i >> 8) as u64 * 7) as u8)
        .collect()
}
