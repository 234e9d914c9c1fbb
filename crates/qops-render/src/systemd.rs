//! Systemd/quadlet renderer.

use std::collections::BTreeMap;

use qops_core::{
    fingerprint, Artifact, ExtensionValue, MountType, RestartPolicy, ServiceSpec, SpecKind,
};

use crate::error::RenderError;
use crate::ini::IniDocument;
use crate::render::PlatformRenderer;

pub struct SystemdRenderer {
    user_mode: bool,
}

impl SystemdRenderer {
    pub fn new(user_mode: bool) -> Self {
        Self { user_mode }
    }

    fn install_target(&self) -> &'static str {
        if self.user_mode {
            "default.target"
        } else {
            "multi-user.target"
        }
    }
}

impl PlatformRenderer for SystemdRenderer {
    fn render(&self, specs: &[ServiceSpec]) -> (Vec<Artifact>, Vec<RenderError>) {
        let mut artifacts = Vec::new();
        let mut errors = Vec::new();

        let kind_by_fq: BTreeMap<&str, SpecKind> =
            specs.iter().map(|s| (s.fq_name.as_str(), s.kind)).collect();

        for spec in specs {
            if spec.kind == SpecKind::Container
                && spec.image.is_none()
                && spec.build_context.is_none()
            {
                errors.push(RenderError::MissingImageOrBuild {
                    fq_name: spec.fq_name.clone(),
                });
                continue;
            }

            let body = render_unit_body(spec, self.install_target());
            let bytes = body.into_bytes();
            let hash = fingerprint(&bytes);
            let rel_path = format!("{}.{}", spec.fq_name, spec.kind.unit_extension());

            artifacts.push(Artifact {
                rel_path,
                hash,
                bytes,
                service_fq_name: Some(spec.fq_name.clone()),
                kind: spec.kind,
                owning_repo: spec.repo_name.clone(),
            });

            if !spec.depends.is_empty() {
                artifacts.push(dropin_artifact(spec, &kind_by_fq));
            }
        }

        (artifacts, errors)
    }
}

fn render_unit_body(spec: &ServiceSpec, install_target: &str) -> String {
    let mut doc = IniDocument::new();

    doc.section("Unit");
    doc.entry(
        "Description",
        format!("quad-ops managed {} ({})", spec.service_name, spec.project),
    );

    match spec.kind {
        SpecKind::Container => render_container_section(&mut doc, spec),
        SpecKind::Build => render_build_section(&mut doc, spec),
        SpecKind::Volume => render_labelled_section(&mut doc, "Volume", spec),
        SpecKind::Network => render_network_section(&mut doc, spec),
        SpecKind::Image => {
            doc.section("Image");
            if let Some(image) = &spec.image {
                doc.entry("Image", image);
            }
            render_labels(&mut doc, spec);
        }
        SpecKind::Secret => render_labelled_section(&mut doc, "Container", spec),
    }

    if matches!(spec.kind, SpecKind::Container) {
        doc.section("Service");
        doc.entry("Restart", restart_to_systemd(spec.restart));
        if spec.one_shot {
            doc.entry("Type", "oneshot");
            doc.entry("RemainAfterExit", "yes");
        }

        doc.section("Install");
        doc.entry("WantedBy", install_target);
    }

    doc.render()
}

fn render_container_section(doc: &mut IniDocument, spec: &ServiceSpec) {
    doc.section("Container");
    doc.entry("ContainerName", &spec.fq_name);
    if let Some(image) = &spec.image {
        doc.entry("Image", image);
    }
    if !spec.command.is_empty() {
        doc.entry("Exec", spec.command.join(" "));
    }
    if let Some(working_dir) = &spec.working_dir {
        doc.entry("WorkingDir", working_dir);
    }
    if let Some(user) = &spec.user {
        doc.entry("User", user);
    }
    for (key, value) in &spec.env {
        match value {
            Some(value) => doc.entry("Environment", format!("{key}={value}")),
            None => doc.entry("Environment", format!("{key}=unset")),
        };
    }
    for port in &spec.ports {
        let host = port.host_ip.as_deref().unwrap_or("");
        let host_port = port
            .host_port
            .map(|p| p.to_string())
            .unwrap_or_default();
        doc.entry(
            "PublishPort",
            format!(
                "{host}{sep}{host_port}:{cport}/{proto}",
                sep = if host.is_empty() { "" } else { ":" },
                cport = port.container_port,
                proto = port.protocol,
            ),
        );
    }
    for mount in &spec.mounts {
        let ro = if mount.readonly { ",ro" } else { "" };
        let opts = if mount.options.is_empty() {
            String::new()
        } else {
            format!(",{}", mount.options.join(","))
        };
        let prefix = match mount.mount_type {
            MountType::Bind => "",
            MountType::Volume => "",
            MountType::Tmpfs => "tmpfs:",
        };
        doc.entry(
            "Volume",
            format!("{prefix}{}:{}{ro}{opts}", mount.source, mount.target),
        );
    }
    for network in &spec.networks {
        if network.aliases.is_empty() {
            doc.entry("Network", &network.network);
        } else {
            doc.entry(
                "Network",
                format!("{}:alias={}", network.network, network.aliases.join(",")),
            );
        }
    }
    for secret in &spec.secrets_refs {
        match (&secret.mount_target, &secret.env_var_name) {
            (Some(target), _) => doc.entry(
                "Secret",
                format!("{},type=mount,target={target}", secret.source_secret),
            ),
            (None, Some(env_var)) => doc.entry(
                "Secret",
                format!("{},type=env,target={env_var}", secret.source_secret),
            ),
            (None, None) => doc.entry("Secret", &secret.source_secret),
        };
    }
    render_labels(doc, spec);
}

fn render_build_section(doc: &mut IniDocument, spec: &ServiceSpec) {
    doc.section("Build");
    doc.entry("ImageTag", &spec.fq_name);
    if let Some(context) = &spec.build_context {
        doc.entry("Context", context);
    }
    render_labels(doc, spec);
}

fn render_labelled_section(doc: &mut IniDocument, name: &str, spec: &ServiceSpec) {
    doc.section(name);
    render_labels(doc, spec);
}

fn render_network_section(doc: &mut IniDocument, spec: &ServiceSpec) {
    doc.section("Network");
    if let Some(options) = spec
        .extensions
        .get("x-podman-network-options")
        .and_then(ExtensionValue::as_mapping)
    {
        for (key, value) in options {
            if let Some(value) = value.as_scalar() {
                doc.entry("Options", format!("{key}={value}"));
            }
        }
    }
    render_labels(doc, spec);
}

fn render_labels(doc: &mut IniDocument, spec: &ServiceSpec) {
    for (key, value) in &spec.labels {
        doc.comment(format!("label: {key}={value}"));
    }
}

fn restart_to_systemd(policy: RestartPolicy) -> &'static str {
    match policy {
        RestartPolicy::No => "no",
        RestartPolicy::Always => "always",
        RestartPolicy::OnFailure => "on-failure",
        // systemd has no literal "unless-stopped"; quadlet maps it to always
        // and relies on the supervisor not auto-restarting stopped units.
        RestartPolicy::UnlessStopped => "always",
    }
}

fn generated_unit_name(dep_fq_name: &str, kind_by_fq: &BTreeMap<&str, SpecKind>) -> String {
    match kind_by_fq.get(dep_fq_name) {
        Some(SpecKind::Volume) => format!("{dep_fq_name}-volume.service"),
        Some(SpecKind::Network) => format!("{dep_fq_name}-network.service"),
        _ => format!("{dep_fq_name}.service"),
    }
}

fn dropin_artifact(spec: &ServiceSpec, kind_by_fq: &BTreeMap<&str, SpecKind>) -> Artifact {
    let mut doc = IniDocument::new();
    doc.section("Unit");
    for dep in &spec.depends {
        let unit = generated_unit_name(dep, kind_by_fq);
        doc.entry("After", &unit);
        doc.entry("Requires", &unit);
    }
    let bytes = doc.render().into_bytes();
    let hash = fingerprint(&bytes);
    Artifact {
        rel_path: format!(
            "{}.{}.d/override.conf",
            spec.fq_name,
            spec.kind.unit_extension()
        ),
        bytes,
        hash,
        service_fq_name: None,
        kind: spec.kind,
        owning_repo: spec.repo_name.clone(),
    }
}
