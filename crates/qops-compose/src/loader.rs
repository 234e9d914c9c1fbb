//! Top-level entry point: directory -> list of `Project`s.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use qops_core::Project;
use serde_yaml::Value;

use crate::discover::discover_compose_groups;
use crate::error::ComposeError;
use crate::interpolate::interpolate;
use crate::parse::merge_documents;

/// One discovered project and its parse outcome. The directory is carried
/// along so callers can resolve project-relative paths (env files, secret
/// sources) later in the pipeline.
#[derive(Debug)]
pub struct LoadedProject {
    pub project_name: String,
    pub dir: std::path::PathBuf,
    pub result: Result<Project, ComposeError>,
}

/// Parse every compose document group found under `dir` into a `Project`.
/// One entry per discovered group, in deterministic directory order, so a
/// caller can apply "one malformed project doesn't block the others"
/// without this crate making that policy decision itself.
pub fn load_projects(
    dir: &Path,
    repo_name: &str,
    env: &HashMap<String, String>,
) -> std::io::Result<Vec<LoadedProject>> {
    let groups = discover_compose_groups(dir)?;
    Ok(groups
        .into_iter()
        .map(|group| {
            let result = load_group(&group, repo_name, env);
            LoadedProject {
                project_name: group.project_name,
                dir: group.dir,
                result,
            }
        })
        .collect())
}

fn load_group(
    group: &crate::discover::ComposeGroup,
    repo_name: &str,
    env: &HashMap<String, String>,
) -> Result<Project, ComposeError> {
    let mut document = read_and_parse(&group.base_file, env)?;
    for override_path in &group.override_files {
        let overlay = read_and_parse(override_path, env)?;
        document = merge_documents(document, overlay);
    }
    Ok(crate::parse::document_to_project(&document, &group.project_name, repo_name))
}

fn read_and_parse(path: &Path, env: &HashMap<String, String>) -> Result<Value, ComposeError> {
    let raw = fs::read_to_string(path).map_err(|source| ComposeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let interpolated = interpolate(&raw, env, path)?;
    serde_yaml::from_str(&interpolated).map_err(|source| ComposeError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn loads_base_and_override_for_a_single_project() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("svc-a");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("docker-compose.yml"),
            "services:\n  web:\n    image: nginx:${TAG:-1.25}\n",
        )
        .unwrap();
        fs::write(
            dir.join("prod.override.yml"),
            "services:\n  web:\n    restart: always\n",
        )
        .unwrap();

        let env = HashMap::new();
        let results = load_projects(tmp.path(), "svc-a", &env).unwrap();
        assert_eq!(results.len(), 1);
        let loaded = &results[0];
        assert_eq!(loaded.project_name, "svc-a");
        assert_eq!(loaded.dir, dir);
        let project = loaded.result.as_ref().unwrap();
        let web = project.services.get("web").unwrap();
        assert_eq!(web.image.as_deref(), Some("nginx:1.25"));
        assert_eq!(web.restart, qops_core::RestartPolicy::Always);
    }

    #[test]
    fn malformed_project_reports_error_without_aborting_others() {
        let tmp = tempfile::tempdir().unwrap();
        let bad = tmp.path().join("svc-bad");
        let good = tmp.path().join("svc-good");
        fs::create_dir_all(&bad).unwrap();
        fs::create_dir_all(&good).unwrap();
        fs::write(bad.join("compose.yml"), "services: [this is not a mapping\n").unwrap();
        fs::write(good.join("compose.yml"), "services:\n  web:\n    image: nginx\n").unwrap();

        let env = HashMap::new();
        let results = load_projects(tmp.path(), "svc-x", &env).unwrap();
        assert_eq!(results.len(), 2);
        let bad_result = results
            .iter()
            .find(|loaded| loaded.project_name == "svc-bad")
            .unwrap();
        assert!(bad_result.result.is_err());
        let good_result = results
            .iter()
            .find(|loaded| loaded.project_name == "svc-good")
            .unwrap();
        assert!(good_result.result.is_ok());
    }
}
