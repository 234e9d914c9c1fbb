//! Project -> service spec translation. Pure and filesystem-free:
//! `env_file` contents and secret
//! path safety are checked against data the caller already resolved, so
//! this module stays testable with in-memory fixtures.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use qops_core::{
    fq_name, fq_name_suffixed, ExtensionValue, Project, RestartPolicy, ServiceSecretRef,
    ServiceSpec, SpecKind,
};

use crate::error::{ProjectSpecResult, SpecError};
use crate::graph::topological_order;

const INIT_CONTAINERS_LABEL: &str = "quad-ops.init-containers";
const MAX_ENV_VALUE_BYTES: usize = 128 * 1024;

/// `env_file` contents, already read from disk and parsed with
/// [`parse_env_file`], keyed by the path as it appeared in the compose
/// document.
pub type EnvFileContents = BTreeMap<String, Vec<(String, Option<String>)>>;

/// Parse a `.env`-style file: `KEY=value` per line, blank lines and `#`
/// comments ignored, no quoting rules beyond that (matches Compose's own
/// env_file format, a strict subset of shell assignment syntax).
pub fn parse_env_file(text: &str) -> Vec<(String, Option<String>)> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| match line.split_once('=') {
            Some((key, value)) => Some((key.trim().to_string(), Some(value.trim().to_string()))),
            None => Some((line.to_string(), None)),
        })
        .collect()
}

pub fn process_project(
    project: &Project,
    project_dir: &Path,
    env_files: &EnvFileContents,
) -> ProjectSpecResult {
    let mut errors = Vec::new();

    let default_network = format!("{}_default", project.name);
    let mut node_names: Vec<String> = Vec::new();
    let mut edges: Vec<(String, String)> = Vec::new();
    let mut init_children: BTreeSet<String> = BTreeSet::new();

    for (name, service) in &project.services {
        node_names.push(name.clone());
        for dep in &service.depends_on {
            if project.services.contains_key(dep) {
                edges.push((dep.clone(), name.clone()));
            }
        }
        if let Some(label) = service.labels.get(INIT_CONTAINERS_LABEL) {
            match parse_init_label(label) {
                Ok(children) => {
                    for child in &children {
                        if !project.services.contains_key(child) {
                            errors.push(SpecError::UnknownInitContainer {
                                project: project.name.clone(),
                                service: name.clone(),
                                child: child.clone(),
                            });
                            continue;
                        }
                        init_children.insert(child.clone());
                        edges.push((child.clone(), name.clone()));
                    }
                }
                Err(()) => errors.push(SpecError::EmptyInitLabel {
                    project: project.name.clone(),
                    service: name.clone(),
                }),
            }
        }
    }

    for (name, service) in &project.services {
        let networks = service
            .networks
            .clone()
            .unwrap_or_else(|| vec![qops_core::NetworkAttachment {
                network: default_network.clone(),
                aliases: Vec::new(),
            }]);
        for attachment in &networks {
            if let Some(net) = project.networks.get(&attachment.network) {
                if !net.external {
                    edges.push((attachment.network.clone(), name.clone()));
                }
            } else if attachment.network == default_network {
                edges.push((attachment.network.clone(), name.clone()));
            } else {
                errors.push(SpecError::UnknownNetwork {
                    project: project.name.clone(),
                    service: name.clone(),
                    network: attachment.network.clone(),
                });
            }
        }
        for mount in &service.mounts {
            if let Some(vol) = project.volumes.get(&mount.source) {
                if !vol.external {
                    edges.push((mount.source.clone(), name.clone()));
                }
            }
        }
    }

    for (name, network) in &project.networks {
        if !network.external {
            node_names.push(name.clone());
        } else if network.driver.is_some() {
            errors.push(SpecError::ExternalDriverConflict {
                project: project.name.clone(),
                network: name.clone(),
            });
        }
    }
    if !project.networks.contains_key(&default_network) {
        node_names.push(default_network.clone());
    }
    for (name, volume) in &project.volumes {
        if !volume.external {
            node_names.push(name.clone());
        }
    }

    if !errors.is_empty() {
        return ProjectSpecResult {
            project: project.name.clone(),
            specs: Vec::new(),
            errors,
        };
    }

    let order = match topological_order(&node_names, &edges) {
        Ok(order) => order,
        Err(nodes) => {
            return ProjectSpecResult {
                project: project.name.clone(),
                specs: Vec::new(),
                errors: vec![SpecError::Cycle {
                    project: project.name.clone(),
                    nodes,
                }],
            }
        }
    };

    let mut specs = Vec::new();
    let depends_by_node: BTreeMap<&str, BTreeSet<&str>> = {
        let mut map: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for (parent, child) in &edges {
            map.entry(child.as_str()).or_default().insert(parent.as_str());
        }
        map
    };

    let network_options = project
        .extensions
        .get("x-podman-network-options")
        .and_then(ExtensionValue::as_mapping);

    for name in &order {
        if project.networks.contains_key(name) || name == &default_network {
            let mut spec = aux_spec(&project.name, &project.repo_name, name, SpecKind::Network);
            if let Some(options) = network_options.and_then(|by_network| by_network.get(name)) {
                spec.extensions
                    .insert("x-podman-network-options".to_string(), options.clone());
            }
            specs.push(spec);
            continue;
        }
        if project.volumes.get(name).is_some() {
            specs.push(aux_spec(&project.name, &project.repo_name, name, SpecKind::Volume));
            continue;
        }

        let Some(service) = project.services.get(name) else {
            continue;
        };

        // Dependency edges are tracked by bare node name while the graph is
        // built; the spec field carries the targets' fq names.
        let mut depends: Vec<String> = depends_by_node
            .get(name.as_str())
            .into_iter()
            .flatten()
            .map(|dep| fq_name(&project.name, dep))
            .collect();
        depends.sort();

        let env = match merge_environment(project, name, service, env_files, &mut errors) {
            Some(env) => env,
            None => continue,
        };

        let secrets_refs = match resolve_secrets(project, project_dir, name, service, &mut errors) {
            Some(refs) => refs,
            None => continue,
        };

        let is_init_child = init_children.contains(name);
        let restart = if is_init_child { RestartPolicy::No } else { service.restart };

        if let Some(build_context) = &service.build_context {
            if build_context.trim().is_empty() {
                errors.push(SpecError::EmptyBuildContext {
                    project: project.name.clone(),
                    service: name.clone(),
                });
                continue;
            }
            let build_fq = fq_name_suffixed(&project.name, name, "build");
            let mut build_spec = aux_spec(&project.name, &project.repo_name, name, SpecKind::Build);
            build_spec.fq_name = build_fq.clone();
            build_spec.build_context = Some(build_context.clone());
            specs.push(build_spec);
            depends.push(build_fq);
            depends.sort();
        }

        let init_containers: Vec<String> = service
            .labels
            .get(INIT_CONTAINERS_LABEL)
            .and_then(|label| parse_init_label(label).ok())
            .unwrap_or_default();

        specs.push(ServiceSpec {
            fq_name: fq_name(&project.name, name),
            project: project.name.clone(),
            repo_name: project.repo_name.clone(),
            service_name: name.clone(),
            kind: SpecKind::Container,
            image: service.image.clone(),
            build_context: None,
            command: service.command.clone(),
            args: Vec::new(),
            working_dir: service.working_dir.clone(),
            user: service.user.clone(),
            env,
            ports: service.ports.clone(),
            mounts: service.mounts.clone(),
            networks: service.networks.clone().unwrap_or_else(|| {
                vec![qops_core::NetworkAttachment {
                    network: default_network.clone(),
                    aliases: Vec::new(),
                }]
            }),
            depends,
            restart,
            init_containers,
            secrets_refs,
            labels: service.labels.clone(),
            extensions: service.extensions.clone(),
            one_shot: is_init_child,
        });
    }

    if !errors.is_empty() {
        return ProjectSpecResult {
            project: project.name.clone(),
            specs: Vec::new(),
            errors,
        };
    }

    ProjectSpecResult {
        project: project.name.clone(),
        specs,
        errors: Vec::new(),
    }
}

/// A spec for a non-service node (network, volume or build helper): no
/// image, no env, no mounts, just identity and kind.
fn aux_spec(project_name: &str, repo_name: &str, name: &str, kind: SpecKind) -> ServiceSpec {
    ServiceSpec {
        fq_name: fq_name(project_name, name),
        project: project_name.to_string(),
        repo_name: repo_name.to_string(),
        service_name: name.to_string(),
        kind,
        image: None,
        build_context: None,
        command: Vec::new(),
        args: Vec::new(),
        working_dir: None,
        user: None,
        env: Vec::new(),
        ports: Vec::new(),
        mounts: Vec::new(),
        networks: Vec::new(),
        depends: Vec::new(),
        restart: RestartPolicy::No,
        init_containers: Vec::new(),
        secrets_refs: Vec::new(),
        labels: BTreeMap::new(),
        extensions: BTreeMap::new(),
        one_shot: false,
    }
}

fn parse_init_label(label: &str) -> Result<Vec<String>, ()> {
    let children: Vec<String> = label
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if children.is_empty() {
        Err(())
    } else {
        Ok(children)
    }
}

fn is_valid_env_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn merge_environment(
    project: &Project,
    service_name: &str,
    service: &qops_core::ComposeService,
    env_files: &EnvFileContents,
    errors: &mut Vec<SpecError>,
) -> Option<Vec<(String, Option<String>)>> {
    let mut merged: BTreeMap<String, Option<String>> = BTreeMap::new();

    for path in &service.env_files {
        let key = path.to_string_lossy().into_owned();
        if let Some(entries) = env_files.get(&key) {
            for (k, v) in entries {
                merged.insert(k.clone(), v.clone());
            }
        }
    }
    for (k, v) in &service.environment {
        merged.insert(k.clone(), v.clone());
    }

    let mut ok = true;
    for (key, value) in &merged {
        if !is_valid_env_key(key) {
            errors.push(SpecError::InvalidEnvKey {
                project: project.name.clone(),
                service: service_name.to_string(),
                key: key.clone(),
            });
            ok = false;
        }
        if let Some(value) = value {
            if value.len() > MAX_ENV_VALUE_BYTES {
                errors.push(SpecError::EnvValueTooLarge {
                    project: project.name.clone(),
                    service: service_name.to_string(),
                    key: key.clone(),
                });
                ok = false;
            }
        }
    }

    if ok {
        Some(merged.into_iter().collect())
    } else {
        None
    }
}

fn resolve_secrets(
    project: &Project,
    project_dir: &Path,
    service_name: &str,
    service: &qops_core::ComposeService,
    errors: &mut Vec<SpecError>,
) -> Option<Vec<ServiceSecretRef>> {
    let mut refs = Vec::new();
    let mut ok = true;

    for secret_ref in &service.secrets {
        let Some(secret) = project.secrets.get(&secret_ref.source_secret) else {
            errors.push(SpecError::UnknownSecret {
                project: project.name.clone(),
                service: service_name.to_string(),
                secret: secret_ref.source_secret.clone(),
            });
            ok = false;
            continue;
        };
        if let Some(file) = &secret.file {
            if !is_safe_secret_path(project_dir, file) {
                errors.push(SpecError::UnsafeSecretPath {
                    project: project.name.clone(),
                    service: service_name.to_string(),
                    secret: secret_ref.source_secret.clone(),
                });
                ok = false;
                continue;
            }
        }
        refs.push(secret_ref.clone());
    }

    if let Some(ExtensionValue::Mapping(bindings)) = project.extensions.get("x-podman-env-secrets") {
        for (secret_name, env_var) in bindings {
            if !project.secrets.contains_key(secret_name) {
                errors.push(SpecError::UnknownSecret {
                    project: project.name.clone(),
                    service: service_name.to_string(),
                    secret: secret_name.clone(),
                });
                ok = false;
                continue;
            }
            if let Some(env_var_name) = env_var.as_scalar() {
                if let Some(existing) = refs.iter_mut().find(|r| r.source_secret == *secret_name) {
                    existing.env_var_name = Some(env_var_name.to_string());
                } else {
                    refs.push(ServiceSecretRef {
                        source_secret: secret_name.clone(),
                        mount_target: None,
                        env_var_name: Some(env_var_name.to_string()),
                    });
                }
            }
        }
    }

    if ok {
        Some(refs)
    } else {
        None
    }
}

fn is_safe_secret_path(project_dir: &Path, file: &Path) -> bool {
    let resolved = if file.is_absolute() {
        file.to_path_buf()
    } else {
        project_dir.join(file)
    };
    !resolved
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use qops_core::{ComposeNetwork, ComposeSecret, ComposeService, ComposeVolume};
    use std::collections::BTreeMap as Map;

    fn project_with_services(services: Vec<(&str, ComposeService)>) -> Project {
        let mut project = Project::new("svc-a", "svc-a");
        for (name, service) in services {
            project.services.insert(name.to_string(), service);
        }
        project
    }

    #[test]
    fn simple_web_service_produces_one_container_and_default_network() {
        let mut web = ComposeService::default();
        web.image = Some("nginx:1.25".to_string());
        let project = project_with_services(vec![("web", web)]);

        let result = process_project(&project, Path::new("/tmp"), &Map::new());
        assert!(result.is_success(), "{:?}", result.errors);
        let container = result.specs.iter().find(|s| s.kind == SpecKind::Container).unwrap();
        assert_eq!(container.fq_name, "dev.trly.quad-ops.svc-a.web");
        assert!(result.specs.iter().any(|s| s.kind == SpecKind::Network));
    }

    #[test]
    fn depends_on_orders_dependency_before_dependent() {
        let mut db = ComposeService::default();
        db.image = Some("postgres".to_string());
        let mut web = ComposeService::default();
        web.image = Some("nginx".to_string());
        web.depends_on = vec!["db".to_string()];

        let project = project_with_services(vec![("db", db), ("web", web)]);
        let result = process_project(&project, Path::new("/tmp"), &Map::new());
        assert!(result.is_success(), "{:?}", result.errors);

        let positions: Map<String, usize> = result
            .specs
            .iter()
            .enumerate()
            .map(|(i, s)| (s.fq_name.clone(), i))
            .collect();
        assert!(positions["dev.trly.quad-ops.svc-a.db"] < positions["dev.trly.quad-ops.svc-a.web"]);

        let web_spec = result.specs.iter().find(|s| s.service_name == "web").unwrap();
        assert!(web_spec
            .depends
            .contains(&"dev.trly.quad-ops.svc-a.db".to_string()));
    }

    #[test]
    fn every_depends_entry_is_a_fq_name_emitted_in_the_same_pass() {
        let mut db = ComposeService::default();
        db.image = Some("postgres".to_string());
        let mut web = ComposeService::default();
        web.image = Some("nginx".to_string());
        web.depends_on = vec!["db".to_string()];
        web.mounts = vec![qops_core::Mount {
            source: "data".to_string(),
            target: "/data".to_string(),
            mount_type: qops_core::MountType::Volume,
            readonly: false,
            options: Vec::new(),
        }];
        let mut project = project_with_services(vec![("db", db), ("web", web)]);
        project.volumes.insert(
            "data".to_string(),
            ComposeVolume {
                external: false,
                driver: None,
            },
        );

        let result = process_project(&project, Path::new("/tmp"), &Map::new());
        assert!(result.is_success(), "{:?}", result.errors);

        let known: std::collections::BTreeSet<&str> =
            result.specs.iter().map(|s| s.fq_name.as_str()).collect();
        for spec in &result.specs {
            for dep in &spec.depends {
                assert!(dep.starts_with("dev.trly.quad-ops."), "{dep}");
                assert!(known.contains(dep.as_str()), "{dep} not emitted in this pass");
            }
        }
    }

    #[test]
    fn dependency_cycle_fails_the_whole_project() {
        let mut a = ComposeService::default();
        a.depends_on = vec!["b".to_string()];
        let mut b = ComposeService::default();
        b.depends_on = vec!["a".to_string()];

        let project = project_with_services(vec![("a", a), ("b", b)]);
        let result = process_project(&project, Path::new("/tmp"), &Map::new());
        assert!(!result.is_success());
        assert!(result.specs.is_empty());
        assert!(matches!(result.errors[0], SpecError::Cycle { .. }));
    }

    #[test]
    fn unknown_secret_reference_fails_the_project() {
        let mut web = ComposeService::default();
        web.image = Some("nginx".to_string());
        web.secrets = vec![ServiceSecretRef {
            source_secret: "db_pw".to_string(),
            mount_target: None,
            env_var_name: None,
        }];
        let project = project_with_services(vec![("web", web)]);

        let result = process_project(&project, Path::new("/tmp"), &Map::new());
        assert!(!result.is_success());
        assert!(matches!(result.errors[0], SpecError::UnknownSecret { .. }));
    }

    #[test]
    fn declared_secret_resolves_successfully() {
        let mut web = ComposeService::default();
        web.image = Some("nginx".to_string());
        web.secrets = vec![ServiceSecretRef {
            source_secret: "db_pw".to_string(),
            mount_target: None,
            env_var_name: None,
        }];
        let mut project = project_with_services(vec![("web", web)]);
        project.secrets.insert(
            "db_pw".to_string(),
            ComposeSecret {
                file: Some(std::path::PathBuf::from("secrets/db_pw.txt")),
                external: false,
            },
        );

        let result = process_project(&project, Path::new("/srv/svc-a"), &Map::new());
        assert!(result.is_success(), "{:?}", result.errors);
    }

    #[test]
    fn secret_path_escaping_project_dir_is_rejected() {
        let mut web = ComposeService::default();
        web.image = Some("nginx".to_string());
        web.secrets = vec![ServiceSecretRef {
            source_secret: "db_pw".to_string(),
            mount_target: None,
            env_var_name: None,
        }];
        let mut project = project_with_services(vec![("web", web)]);
        project.secrets.insert(
            "db_pw".to_string(),
            ComposeSecret {
                file: Some(std::path::PathBuf::from("../outside/db_pw.txt")),
                external: false,
            },
        );

        let result = process_project(&project, Path::new("/srv/svc-a"), &Map::new());
        assert!(!result.is_success());
        assert!(matches!(result.errors[0], SpecError::UnsafeSecretPath { .. }));
    }

    #[test]
    fn invalid_environment_key_is_rejected() {
        let mut web = ComposeService::default();
        web.image = Some("nginx".to_string());
        web.environment = vec![("1BAD".to_string(), Some("x".to_string()))];
        let project = project_with_services(vec![("web", web)]);

        let result = process_project(&project, Path::new("/tmp"), &Map::new());
        assert!(!result.is_success());
        assert!(matches!(result.errors[0], SpecError::InvalidEnvKey { .. }));
    }

    #[test]
    fn env_file_entries_lose_to_inline_entries() {
        let mut web = ComposeService::default();
        web.image = Some("nginx".to_string());
        web.env_files = vec![std::path::PathBuf::from(".env")];
        web.environment = vec![("FOO".to_string(), Some("inline".to_string()))];
        let project = project_with_services(vec![("web", web)]);

        let mut env_files = Map::new();
        env_files.insert(
            ".env".to_string(),
            vec![("FOO".to_string(), Some("from_file".to_string()))],
        );

        let result = process_project(&project, Path::new("/tmp"), &env_files);
        assert!(result.is_success(), "{:?}", result.errors);
        let web_spec = result.specs.iter().find(|s| s.service_name == "web").unwrap();
        assert_eq!(
            web_spec.env.iter().find(|(k, _)| k == "FOO"),
            Some(&("FOO".to_string(), Some("inline".to_string())))
        );
    }

    #[test]
    fn init_containers_label_links_siblings_as_one_shot() {
        let mut migrate = ComposeService::default();
        migrate.image = Some("migrate".to_string());
        let mut web = ComposeService::default();
        web.image = Some("nginx".to_string());
        web.labels.insert(INIT_CONTAINERS_LABEL.to_string(), "migrate".to_string());

        let project = project_with_services(vec![("migrate", migrate), ("web", web)]);
        let result = process_project(&project, Path::new("/tmp"), &Map::new());
        assert!(result.is_success(), "{:?}", result.errors);

        let migrate_spec = result.specs.iter().find(|s| s.service_name == "migrate").unwrap();
        assert!(migrate_spec.one_shot);
        assert_eq!(migrate_spec.restart, RestartPolicy::No);

        let web_spec = result.specs.iter().find(|s| s.service_name == "web").unwrap();
        assert_eq!(web_spec.init_containers, vec!["migrate".to_string()]);
        assert!(web_spec
            .depends
            .contains(&"dev.trly.quad-ops.svc-a.migrate".to_string()));
    }

    #[test]
    fn init_containers_label_naming_unknown_sibling_is_rejected() {
        let mut web = ComposeService::default();
        web.image = Some("nginx".to_string());
        web.labels.insert(INIT_CONTAINERS_LABEL.to_string(), "ghost".to_string());
        let project = project_with_services(vec![("web", web)]);

        let result = process_project(&project, Path::new("/tmp"), &Map::new());
        assert!(!result.is_success());
        assert!(matches!(result.errors[0], SpecError::UnknownInitContainer { .. }));
    }

    #[test]
    fn empty_init_containers_label_is_rejected() {
        let mut web = ComposeService::default();
        web.image = Some("nginx".to_string());
        web.labels.insert(INIT_CONTAINERS_LABEL.to_string(), "  ".to_string());
        let project = project_with_services(vec![("web", web)]);

        let result = process_project(&project, Path::new("/tmp"), &Map::new());
        assert!(!result.is_success());
        assert!(matches!(result.errors[0], SpecError::EmptyInitLabel { .. }));
    }

    #[test]
    fn build_service_gets_a_build_spec_dependency() {
        let mut web = ComposeService::default();
        web.build_context = Some("./app".to_string());
        let project = project_with_services(vec![("web", web)]);

        let result = process_project(&project, Path::new("/tmp"), &Map::new());
        assert!(result.is_success(), "{:?}", result.errors);
        let build_spec = result.specs.iter().find(|s| s.kind == SpecKind::Build).unwrap();
        assert_eq!(build_spec.fq_name, "dev.trly.quad-ops.svc-a.web-build");
        let web_spec = result.specs.iter().find(|s| s.service_name == "web").unwrap();
        assert!(web_spec.depends.contains(&build_spec.fq_name));
    }

    #[test]
    fn empty_build_context_is_rejected() {
        let mut web = ComposeService::default();
        web.build_context = Some("   ".to_string());
        let project = project_with_services(vec![("web", web)]);

        let result = process_project(&project, Path::new("/tmp"), &Map::new());
        assert!(!result.is_success());
        assert!(matches!(result.errors[0], SpecError::EmptyBuildContext { .. }));
    }

    #[test]
    fn external_network_with_driver_is_rejected() {
        let mut web = ComposeService::default();
        web.image = Some("nginx".to_string());
        let mut project = project_with_services(vec![("web", web.clone())]);
        web.networks = None;
        project.networks.insert(
            "shared".to_string(),
            ComposeNetwork {
                external: true,
                driver: Some("bridge".to_string()),
            },
        );

        let result = process_project(&project, Path::new("/tmp"), &Map::new());
        assert!(!result.is_success());
        assert!(matches!(result.errors[0], SpecError::ExternalDriverConflict { .. }));
    }

    #[test]
    fn external_volume_is_skipped_as_a_dependency_node() {
        let mut web = ComposeService::default();
        web.image = Some("nginx".to_string());
        web.mounts = vec![qops_core::Mount {
            source: "data".to_string(),
            target: "/data".to_string(),
            mount_type: qops_core::MountType::Volume,
            readonly: false,
            options: Vec::new(),
        }];
        let mut project = project_with_services(vec![("web", web)]);
        project.volumes.insert(
            "data".to_string(),
            ComposeVolume {
                external: true,
                driver: None,
            },
        );

        let result = process_project(&project, Path::new("/tmp"), &Map::new());
        assert!(result.is_success(), "{:?}", result.errors);
        assert!(!result.specs.iter().any(|s| s.service_name == "data"));
    }

    #[test]
    fn undeclared_network_reference_fails_the_project() {
        let mut web = ComposeService::default();
        web.image = Some("nginx".to_string());
        web.networks = Some(vec![qops_core::NetworkAttachment {
            network: "missing".to_string(),
            aliases: Vec::new(),
        }]);
        let project = project_with_services(vec![("web", web)]);

        let result = process_project(&project, Path::new("/tmp"), &Map::new());
        assert!(!result.is_success());
        assert!(result.specs.is_empty());
        assert!(matches!(
            result.errors[0],
            SpecError::UnknownNetwork { ref network, .. } if network == "missing"
        ));
    }

    #[test]
    fn network_options_extension_is_attached_to_the_network_spec() {
        let mut web = ComposeService::default();
        web.image = Some("nginx".to_string());
        let mut project = project_with_services(vec![("web", web)]);

        let mut options = Map::new();
        options.insert(
            "isolate".to_string(),
            qops_core::ExtensionValue::Scalar("true".to_string()),
        );
        let mut by_network = Map::new();
        by_network.insert(
            "svc-a_default".to_string(),
            qops_core::ExtensionValue::Mapping(options),
        );
        project.extensions.insert(
            "x-podman-network-options".to_string(),
            qops_core::ExtensionValue::Mapping(by_network),
        );

        let result = process_project(&project, Path::new("/tmp"), &Map::new());
        assert!(result.is_success(), "{:?}", result.errors);
        let network = result
            .specs
            .iter()
            .find(|s| s.kind == SpecKind::Network)
            .unwrap();
        assert!(network
            .extensions
            .get("x-podman-network-options")
            .and_then(qops_core::ExtensionValue::as_mapping)
            .is_some());
    }
}
