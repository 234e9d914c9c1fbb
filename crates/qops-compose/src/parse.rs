//! YAML document -> domain `Project` conversion.
//!
//! Compose documents are deliberately permissive about shape (`environment`
//! as a list or a map, `ports` as short or long syntax, ...); this module
//! normalizes each into the single in-memory representation `qops_core`
//! defines, leaving every semantic rule (cycles, secret existence, ...) to
//! the spec processor.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use qops_core::{
    ComposeConfig, ComposeNetwork, ComposeSecret, ComposeService, ComposeVolume, ExtensionValue,
    Mount, MountType, NetworkAttachment, PortMapping, Project, RestartPolicy,
};
use serde_yaml::Value;

use crate::error::ComposeError;

pub fn parse_document(text: &str, path: &Path, project_name: &str, repo_name: &str) -> Result<Project, ComposeError> {
    let value: Value = serde_yaml::from_str(text).map_err(|source| ComposeError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(document_to_project(&value, project_name, repo_name))
}

/// Shallow-merges `overlay` onto `base` the way Compose's override files do:
/// mappings merge key-by-key (recursively), everything else is replaced.
pub fn merge_documents(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(mut base_map), Value::Mapping(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => merge_documents(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Mapping(base_map)
        }
        (_, overlay) => overlay,
    }
}

pub(crate) fn document_to_project(value: &Value, project_name: &str, repo_name: &str) -> Project {
    let mut project = Project::new(project_name, repo_name);
    let Some(mapping) = value.as_mapping() else {
        return project;
    };

    for (key, value) in mapping {
        let Some(key) = key.as_str() else { continue };
        match key {
            "services" => {
                if let Some(services) = value.as_mapping() {
                    for (name, spec) in services {
                        if let Some(name) = name.as_str() {
                            project
                                .services
                                .insert(name.to_string(), parse_service(spec));
                        }
                    }
                }
            }
            "networks" => {
                if let Some(networks) = value.as_mapping() {
                    for (name, spec) in networks {
                        if let Some(name) = name.as_str() {
                            project
                                .networks
                                .insert(name.to_string(), parse_network(spec));
                        }
                    }
                }
            }
            "volumes" => {
                if let Some(volumes) = value.as_mapping() {
                    for (name, spec) in volumes {
                        if let Some(name) = name.as_str() {
                            project.volumes.insert(name.to_string(), parse_volume(spec));
                        }
                    }
                }
            }
            "secrets" => {
                if let Some(secrets) = value.as_mapping() {
                    for (name, spec) in secrets {
                        if let Some(name) = name.as_str() {
                            project.secrets.insert(name.to_string(), parse_secret(spec));
                        }
                    }
                }
            }
            "configs" => {
                if let Some(configs) = value.as_mapping() {
                    for (name, spec) in configs {
                        if let Some(name) = name.as_str() {
                            project.configs.insert(name.to_string(), parse_config(spec));
                        }
                    }
                }
            }
            other if other.starts_with("x-") => {
                project
                    .extensions
                    .insert(other.to_string(), yaml_to_extension(value));
            }
            _ => {}
        }
    }

    project
}

fn parse_service(value: &Value) -> ComposeService {
    let mut service = ComposeService::default();
    let Some(mapping) = value.as_mapping() else {
        return service;
    };

    for (key, value) in mapping {
        let Some(key) = key.as_str() else { continue };
        match key {
            "image" => service.image = value.as_str().map(str::to_string),
            "build" => service.build_context = parse_build_context(value),
            "command" => service.command = string_list(value),
            "working_dir" => service.working_dir = value.as_str().map(str::to_string),
            "user" => service.user = value.as_str().map(str::to_string),
            "environment" => service.environment = parse_environment(value),
            "env_file" => service.env_files = string_list(value).into_iter().map(PathBuf::from).collect(),
            "ports" => service.ports = parse_ports(value),
            "volumes" => service.mounts = parse_mounts(value),
            "networks" => service.networks = parse_service_networks(value),
            "depends_on" => service.depends_on = parse_depends_on(value),
            "restart" => service.restart = parse_restart(value.as_str().unwrap_or("no")),
            "secrets" => service.secrets = parse_service_secrets(value),
            "labels" => service.labels = parse_labels(value),
            other if other.starts_with("x-") => {
                service.extensions.insert(other.to_string(), yaml_to_extension(value));
            }
            _ => {}
        }
    }

    service
}

fn parse_build_context(value: &Value) -> Option<String> {
    match value {
        Value::String(context) => Some(context.clone()),
        Value::Mapping(mapping) => mapping
            .get(Value::String("context".to_string()))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or(Some(String::new())),
        _ => None,
    }
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(single) => single.split_whitespace().map(str::to_string).collect(),
        Value::Sequence(items) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

fn parse_environment(value: &Value) -> Vec<(String, Option<String>)> {
    match value {
        Value::Mapping(mapping) => mapping
            .iter()
            .filter_map(|(key, value)| {
                let key = key.as_str()?.to_string();
                let value = match value {
                    Value::Null => None,
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    Value::Bool(b) => Some(b.to_string()),
                    _ => None,
                };
                Some((key, value))
            })
            .collect(),
        Value::Sequence(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|entry| match entry.split_once('=') {
                Some((key, value)) => (key.to_string(), Some(value.to_string())),
                None => (entry.to_string(), None),
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_ports(value: &Value) -> Vec<PortMapping> {
    let Some(items) = value.as_sequence() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(short) => parse_short_port(short),
            Value::Mapping(mapping) => {
                let container_port = mapping
                    .get(Value::String("target".to_string()))
                    .and_then(|v| v.as_u64())? as u16;
                let host_port = mapping
                    .get(Value::String("published".to_string()))
                    .and_then(value_as_port);
                let protocol = mapping
                    .get(Value::String("protocol".to_string()))
                    .and_then(Value::as_str)
                    .unwrap_or("tcp")
                    .to_string();
                Some(PortMapping {
                    host_ip: None,
                    host_port,
                    container_port,
                    protocol,
                })
            }
            _ => None,
        })
        .collect()
}

fn value_as_port(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().map(|v| v as u16),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn parse_short_port(short: &str) -> Option<PortMapping> {
    let (host_part, rest) = short.rsplit_once(':').map_or(("", short), |(h, r)| (h, r));
    let (container_part, protocol) = rest
        .split_once('/')
        .map(|(port, proto)| (port, proto.to_string()))
        .unwrap_or_else(|| (rest, "tcp".to_string()));
    let container_port: u16 = container_part.parse().ok()?;

    if host_part.is_empty() {
        return Some(PortMapping {
            host_ip: None,
            host_port: None,
            container_port,
            protocol,
        });
    }

    let (host_ip, host_port_str) = host_part
        .rsplit_once(':')
        .map_or((None, host_part), |(ip, port)| (Some(ip.to_string()), port));
    let host_port = host_port_str.parse().ok();

    Some(PortMapping {
        host_ip,
        host_port,
        container_port,
        protocol,
    })
}

fn parse_mounts(value: &Value) -> Vec<Mount> {
    let Some(items) = value.as_sequence() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(short) => parse_short_mount(short),
            Value::Mapping(mapping) => {
                let source = mapping
                    .get(Value::String("source".to_string()))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let target = mapping
                    .get(Value::String("target".to_string()))
                    .and_then(Value::as_str)?
                    .to_string();
                let mount_type = match mapping
                    .get(Value::String("type".to_string()))
                    .and_then(Value::as_str)
                {
                    Some("bind") => MountType::Bind,
                    Some("tmpfs") => MountType::Tmpfs,
                    _ => MountType::Volume,
                };
                let readonly = mapping
                    .get(Value::String("read_only".to_string()))
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                Some(Mount {
                    source,
                    target,
                    mount_type,
                    readonly,
                    options: Vec::new(),
                })
            }
            _ => None,
        })
        .collect()
}

fn parse_short_mount(short: &str) -> Option<Mount> {
    let mut parts = short.split(':');
    let source = parts.next()?.to_string();
    let target = parts.next()?.to_string();
    let options: Vec<String> = parts.next().map(|opts| opts.split(',').map(str::to_string).collect()).unwrap_or_default();
    let readonly = options.iter().any(|opt| opt == "ro");
    let mount_type = if source.starts_with('.') || source.starts_with('/') {
        MountType::Bind
    } else {
        MountType::Volume
    };
    Some(Mount {
        source,
        target,
        mount_type,
        readonly,
        options,
    })
}

fn parse_service_networks(value: &Value) -> Option<Vec<NetworkAttachment>> {
    match value {
        Value::Sequence(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|name| NetworkAttachment {
                    network: name.to_string(),
                    aliases: Vec::new(),
                })
                .collect(),
        ),
        Value::Mapping(mapping) => Some(
            mapping
                .iter()
                .filter_map(|(key, value)| {
                    let network = key.as_str()?.to_string();
                    let aliases = value
                        .as_mapping()
                        .and_then(|m| m.get(Value::String("aliases".to_string())))
                        .map(string_list)
                        .unwrap_or_default();
                    Some(NetworkAttachment { network, aliases })
                })
                .collect(),
        ),
        _ => None,
    }
}

fn parse_depends_on(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(_) => string_list(value),
        Value::Mapping(mapping) => mapping.keys().filter_map(Value::as_str).map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

fn parse_restart(value: &str) -> RestartPolicy {
    match value {
        "always" => RestartPolicy::Always,
        "on-failure" => RestartPolicy::OnFailure,
        "unless-stopped" => RestartPolicy::UnlessStopped,
        _ => RestartPolicy::No,
    }
}

fn parse_service_secrets(value: &Value) -> Vec<qops_core::ServiceSecretRef> {
    let Some(items) = value.as_sequence() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(qops_core::ServiceSecretRef {
                source_secret: name.clone(),
                mount_target: None,
                env_var_name: None,
            }),
            Value::Mapping(mapping) => {
                let source = mapping
                    .get(Value::String("source".to_string()))
                    .and_then(Value::as_str)?
                    .to_string();
                let target = mapping
                    .get(Value::String("target".to_string()))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Some(qops_core::ServiceSecretRef {
                    source_secret: source,
                    mount_target: target,
                    env_var_name: None,
                })
            }
            _ => None,
        })
        .collect()
}

fn parse_labels(value: &Value) -> BTreeMap<String, String> {
    match value {
        Value::Mapping(mapping) => mapping
            .iter()
            .filter_map(|(key, value)| Some((key.as_str()?.to_string(), value.as_str().unwrap_or_default().to_string())))
            .collect(),
        Value::Sequence(items) => items
            .iter()
            .filter_map(Value::as_str)
            .filter_map(|entry| entry.split_once('=').map(|(k, v)| (k.to_string(), v.to_string())))
            .collect(),
        _ => BTreeMap::new(),
    }
}

fn parse_network(value: &Value) -> ComposeNetwork {
    let mapping = value.as_mapping();
    ComposeNetwork {
        external: mapping
            .and_then(|m| m.get(Value::String("external".to_string())))
            .and_then(Value::as_bool)
            .unwrap_or(false),
        driver: mapping
            .and_then(|m| m.get(Value::String("driver".to_string())))
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

fn parse_volume(value: &Value) -> ComposeVolume {
    let mapping = value.as_mapping();
    ComposeVolume {
        external: mapping
            .and_then(|m| m.get(Value::String("external".to_string())))
            .and_then(Value::as_bool)
            .unwrap_or(false),
        driver: mapping
            .and_then(|m| m.get(Value::String("driver".to_string())))
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

fn parse_secret(value: &Value) -> ComposeSecret {
    let mapping = value.as_mapping();
    ComposeSecret {
        file: mapping
            .and_then(|m| m.get(Value::String("file".to_string())))
            .and_then(Value::as_str)
            .map(PathBuf::from),
        external: mapping
            .and_then(|m| m.get(Value::String("external".to_string())))
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}

fn parse_config(value: &Value) -> ComposeConfig {
    let mapping = value.as_mapping();
    ComposeConfig {
        file: mapping
            .and_then(|m| m.get(Value::String("file".to_string())))
            .and_then(Value::as_str)
            .map(PathBuf::from),
        external: mapping
            .and_then(|m| m.get(Value::String("external".to_string())))
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}

fn yaml_to_extension(value: &Value) -> ExtensionValue {
    match value {
        Value::Mapping(mapping) => ExtensionValue::Mapping(
            mapping
                .iter()
                .filter_map(|(key, value)| Some((key.as_str()?.to_string(), yaml_to_extension(value))))
                .collect(),
        ),
        Value::Sequence(items) => ExtensionValue::Sequence(items.iter().map(yaml_to_extension).collect()),
        Value::String(s) => ExtensionValue::Scalar(s.clone()),
        Value::Bool(b) => ExtensionValue::Scalar(b.to_string()),
        Value::Number(n) => ExtensionValue::Scalar(n.to_string()),
        Value::Null => ExtensionValue::Scalar(String::new()),
        Value::Tagged(tagged) => yaml_to_extension(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_image_and_environment() {
        let doc = "\
services:
  web:
    image: nginx:1.25
    environment:
      - FOO=bar
      - EMPTY
    ports:
      - \"8080:80\"
";
        let project = parse_document(doc, Path::new("compose.yml"), "svc-a", "svc-a").unwrap();
        let web = project.services.get("web").unwrap();
        assert_eq!(web.image.as_deref(), Some("nginx:1.25"));
        assert_eq!(
            web.environment,
            vec![
                ("FOO".to_string(), Some("bar".to_string())),
                ("EMPTY".to_string(), None),
            ]
        );
        assert_eq!(web.ports.len(), 1);
        assert_eq!(web.ports[0].container_port, 80);
        assert_eq!(web.ports[0].host_port, Some(8080));
    }

    #[test]
    fn preserves_extension_fields_verbatim() {
        let doc = "\
x-podman-env-secrets:
  db_pw: DB_PASSWORD
services:
  web:
    image: nginx
    x-quad-ops-label: marker
";
        let project = parse_document(doc, Path::new("compose.yml"), "svc-a", "svc-a").unwrap();
        assert!(project.extensions.contains_key("x-podman-env-secrets"));
        let web = project.services.get("web").unwrap();
        assert!(web.extensions.contains_key("x-quad-ops-label"));
    }

    #[test]
    fn merge_documents_overlays_service_fields_without_losing_siblings() {
        let base: Value = serde_yaml::from_str("services:\n  web:\n    image: nginx\n    restart: always\n").unwrap();
        let overlay: Value = serde_yaml::from_str("services:\n  web:\n    image: nginx:1.26\n").unwrap();
        let merged = merge_documents(base, overlay);
        let project = document_to_project(&merged, "svc-a", "svc-a");
        let web = project.services.get("web").unwrap();
        assert_eq!(web.image.as_deref(), Some("nginx:1.26"));
    }
}
