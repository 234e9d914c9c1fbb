//! Directory discovery for the artifact store's `List` operation.
//! Ownership of a path is derived from its filename
//! prefix, not any external index, so discovery just walks the base
//! directory and filters by that prefix.

use std::path::{Path, PathBuf};

use qops_core::FQ_PREFIX;

use crate::error::StoreError;

/// Recursively collects paths under `base_dir` whose file name starts with
/// the managed prefix, covering both top-level unit files and drop-in
/// overrides nested one level under `<unit>.<ext>.d/`.
pub fn discover_managed_paths(base_dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let mut found = Vec::new();
    if !base_dir.exists() {
        return Ok(found);
    }
    walk(base_dir, false, &mut found)?;
    found.sort();
    Ok(found)
}

/// `inside_managed_dir` is true once we've descended into a directory whose
/// own name already matched the prefix (a `.d/` drop-in directory); files
/// below it are collected unconditionally since the directory name, not the
/// file name, is what's managed.
fn walk(dir: &Path, inside_managed_dir: bool, found: &mut Vec<PathBuf>) -> Result<(), StoreError> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| StoreError::new("read_dir", dir.to_path_buf(), e))?;

    for entry in entries {
        let entry = entry.map_err(|e| StoreError::new("read_dir_entry", dir.to_path_buf(), e))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|e| StoreError::new("stat", path.clone(), e))?;

        let name = entry.file_name();
        let name = name.to_string_lossy();
        let is_managed = inside_managed_dir || name.starts_with(FQ_PREFIX);
        if !is_managed {
            continue;
        }

        if file_type.is_dir() {
            walk(&path, true, found)?;
        } else if file_type.is_file() {
            found.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovers_top_level_unit_files_and_ignores_unmanaged_ones() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(format!("{FQ_PREFIX}.svc-a.web.container")), "x").unwrap();
        std::fs::write(dir.path().join("unrelated.txt"), "x").unwrap();

        let found = discover_managed_paths(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with(format!("{FQ_PREFIX}.svc-a.web.container")));
    }

    #[test]
    fn discovers_dropins_nested_under_dot_d_directories() {
        let dir = tempfile::tempdir().unwrap();
        let dropin_dir = dir
            .path()
            .join(format!("{FQ_PREFIX}.svc-a.web.container.d"));
        std::fs::create_dir_all(&dropin_dir).unwrap();
        std::fs::write(dropin_dir.join("override.conf"), "x").unwrap();

        let found = discover_managed_paths(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("override.conf"));
    }

    #[test]
    fn missing_base_dir_returns_empty_list() {
        let found = discover_managed_paths(Path::new("/nonexistent/quad-ops-dir")).unwrap();
        assert!(found.is_empty());
    }
}
