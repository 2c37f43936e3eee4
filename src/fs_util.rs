use std::fs;

use camino::Utf8Path;
use tempfile::NamedTempFile;

use crate::error::SketchError;

/// Refuse to touch an existing destination unless `force` was given.
pub fn check_destination(path: &Utf8Path, force: bool) -> Result<(), SketchError> {
    if path.as_std_path().exists() && !force {
        return Err(SketchError::OutputConflict(path.to_path_buf()));
    }
    Ok(())
}

/// A temporary file in the destination's directory, so the final rename stays
/// on one filesystem.
pub fn temp_file_beside(dest: &Utf8Path) -> Result<NamedTempFile, SketchError> {
    let parent = match dest.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| SketchError::Filesystem(err.to_string()))?;
    tempfile::Builder::new()
        .prefix(".sketch-from")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| SketchError::Filesystem(err.to_string()))
}

pub fn persist(temp: NamedTempFile, dest: &Utf8Path) -> Result<(), SketchError> {
    if dest.as_std_path().is_dir() {
        return Err(SketchError::Filesystem(format!(
            "{dest} is a directory, expected a file"
        )));
    }
    temp.persist(dest.as_std_path())
        .map_err(|err| SketchError::Filesystem(err.to_string()))?;
    Ok(())
}
