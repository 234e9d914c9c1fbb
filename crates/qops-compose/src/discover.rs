//! Recursive discovery of compose document groups under a directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One project's compose files: a base `(docker-compose|compose).(ya?ml)`
/// plus any co-located `*.override.(ya?ml)` files, sorted for deterministic
/// merge order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeGroup {
    pub project_name: String,
    pub dir: PathBuf,
    pub base_file: PathBuf,
    pub override_files: Vec<PathBuf>,
}

pub fn discover_compose_groups(root: &Path) -> std::io::Result<Vec<ComposeGroup>> {
    let mut by_dir: BTreeMap<PathBuf, (Option<PathBuf>, Vec<PathBuf>)> = BTreeMap::new();
    walk(root, &mut by_dir)?;

    let mut groups = Vec::new();
    for (dir, (base, mut overrides)) in by_dir {
        let Some(base_file) = base else { continue };
        overrides.sort();
        let project_name = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "root".to_string());
        groups.push(ComposeGroup {
            project_name,
            dir,
            base_file,
            override_files: overrides,
        });
    }
    groups.sort_by(|a, b| a.dir.cmp(&b.dir));
    Ok(groups)
}

fn walk(
    dir: &Path,
    by_dir: &mut BTreeMap<PathBuf, (Option<PathBuf>, Vec<PathBuf>)>,
) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            walk(&path, by_dir)?;
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };

        if is_base_compose_file(file_name) {
            by_dir.entry(dir.to_path_buf()).or_default().0 = Some(path.clone());
        } else if is_override_compose_file(file_name) {
            by_dir.entry(dir.to_path_buf()).or_default().1.push(path.clone());
        }
    }
    Ok(())
}

fn is_base_compose_file(file_name: &str) -> bool {
    matches!(
        file_name,
        "docker-compose.yml"
            | "docker-compose.yaml"
            | "compose.yml"
            | "compose.yaml"
    )
}

fn is_override_compose_file(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    lower.ends_with(".override.yml") || lower.ends_with(".override.yaml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discovers_one_group_per_directory_with_a_base_file() {
        let tmp = tempfile::tempdir().unwrap();
        let svc_a = tmp.path().join("svc-a");
        let svc_b = tmp.path().join("svc-b");
        fs::create_dir_all(&svc_a).unwrap();
        fs::create_dir_all(&svc_b).unwrap();
        fs::write(svc_a.join("docker-compose.yml"), "services: {}\n").unwrap();
        fs::write(svc_a.join("prod.override.yml"), "services: {}\n").unwrap();
        fs::write(svc_b.join("compose.yaml"), "services: {}\n").unwrap();

        let groups = discover_compose_groups(tmp.path()).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].project_name, "svc-a");
        assert_eq!(groups[0].override_files.len(), 1);
        assert_eq!(groups[1].project_name, "svc-b");
        assert!(groups[1].override_files.is_empty());
    }

    #[test]
    fn directory_with_only_an_override_file_yields_no_group() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("x.override.yml"), "services: {}\n").unwrap();

        let groups = discover_compose_groups(tmp.path()).unwrap();
        assert!(groups.is_empty());
    }
}
