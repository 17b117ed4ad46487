//! # Atomic JSON file writes
//!
//! A table file is replaced as a whole on every mutation. Writing it in
//! place would let a crash (or a concurrent reader) observe a torn file, so
//! every write goes through a sibling temp file:
//!
//! ```text
//! 1. Write <dir>/.tmpXXXXXX
//! 2. fsync() the temp file            (Synchronous only)
//! 3. rename(.tmpXXXXXX → target)      ← ATOMIC COMMIT POINT
//! 4. fsync() parent directory         (Synchronous only)
//! ```
//!
//! Backups use the no-clobber variant of step 3, which fails instead of
//! replacing an existing file.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::config::DurabilityLevel;
use crate::error::{Result, TabulaError};

/// Atomically replace `path` with the JSON encoding of `value`
pub fn write_json_atomic<T: Serialize>(
    path: &Path,
    value: &T,
    durability: DurabilityLevel,
) -> Result<()> {
    let temp = write_temp(path, value, durability)?;
    temp.persist(path)?;
    sync_parent(path, durability)?;
    Ok(())
}

/// Atomically create `path`; never replaces an existing file
///
/// Returns `Ok(false)` if `path` already exists (nothing is written).
pub fn write_json_new<T: Serialize>(
    path: &Path,
    value: &T,
    durability: DurabilityLevel,
) -> Result<bool> {
    let temp = write_temp(path, value, durability)?;
    match temp.persist_noclobber(path) {
        Ok(_) => {
            sync_parent(path, durability)?;
            Ok(true)
        }
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Read a JSON file; `Ok(None)` if it does not exist
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let value = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        TabulaError::Serialization(format!("{}: {}", path.display(), e))
    })?;
    Ok(Some(value))
}

fn write_temp<T: Serialize>(
    path: &Path,
    value: &T,
    durability: DurabilityLevel,
) -> Result<NamedTempFile> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        serde_json::to_writer(&mut writer, value)?;
        writer.flush()?;
    }
    if durability.requires_sync() {
        temp.as_file().sync_all()?;
    }
    Ok(temp)
}

/// fsync the directory so the rename itself is durable
fn sync_parent(path: &Path, durability: DurabilityLevel) -> Result<()> {
    if !durability.requires_sync() {
        return Ok(());
    }
    #[cfg(unix)]
    {
        if let Some(dir) = path.parent() {
            File::open(dir)?.sync_all()?;
        }
    }
    #[cfg(not(unix))]
    {
        File::open(path)?.sync_all()?;
    }
    Ok(())
}
