//! Launchd renderer.
//!
//! One plist per container spec; secrets and networks are expressed as
//! `podman run` CLI arguments inside `ProgramArguments` since launchd has no
//! native notion of either.

use qops_core::{fingerprint, Artifact, RestartPolicy, ServiceSpec, SpecKind};

use crate::error::RenderError;
use crate::render::PlatformRenderer;

pub struct LaunchdRenderer {
    user_mode: bool,
}

impl LaunchdRenderer {
    pub fn new(user_mode: bool) -> Self {
        Self { user_mode }
    }
}

impl PlatformRenderer for LaunchdRenderer {
    fn render(&self, specs: &[ServiceSpec]) -> (Vec<Artifact>, Vec<RenderError>) {
        let mut artifacts = Vec::new();
        let mut errors = Vec::new();

        for spec in specs {
            if spec.kind != SpecKind::Container {
                continue;
            }
            if spec.image.is_none() && spec.build_context.is_none() {
                errors.push(RenderError::MissingImageOrBuild {
                    fq_name: spec.fq_name.clone(),
                });
                continue;
            }

            let bytes = render_plist(spec, self.user_mode).into_bytes();
            let hash = fingerprint(&bytes);
            artifacts.push(Artifact {
                rel_path: format!("{}.plist", spec.fq_name),
                bytes,
                hash,
                service_fq_name: Some(spec.fq_name.clone()),
                kind: spec.kind,
                owning_repo: spec.repo_name.clone(),
            });
        }

        (artifacts, errors)
    }
}

fn render_plist(spec: &ServiceSpec, _user_mode: bool) -> String {
    let mut args = vec![
        "/usr/bin/podman".to_string(),
        "run".to_string(),
        "--rm".to_string(),
        "--name".to_string(),
        spec.fq_name.clone(),
    ];

    for network in &spec.networks {
        args.push("--network".to_string());
        args.push(network.network.clone());
    }
    for mount in &spec.mounts {
        let ro = if mount.readonly { ":ro" } else { "" };
        args.push("-v".to_string());
        args.push(format!("{}:{}{ro}", mount.source, mount.target));
    }
    for port in &spec.ports {
        args.push("-p".to_string());
        let host_port = port.host_port.map(|p| p.to_string()).unwrap_or_default();
        args.push(format!("{host_port}:{}/{}", port.container_port, port.protocol));
    }
    for (key, value) in &spec.env {
        args.push("-e".to_string());
        match value {
            Some(value) => args.push(format!("{key}={value}")),
            None => args.push(format!("{key}=unset")),
        }
    }
    for secret in &spec.secrets_refs {
        args.push("--secret".to_string());
        match &secret.mount_target {
            Some(target) => args.push(format!(
                "{},target={target}",
                secret.source_secret
            )),
            None => args.push(secret.source_secret.clone()),
        }
        if let Some(env_var) = &secret.env_var_name {
            args.push("-e".to_string());
            args.push(format!("{env_var}_FILE=/run/secrets/{}", secret.source_secret));
        }
    }
    if let Some(user) = &spec.user {
        args.push("--user".to_string());
        args.push(user.clone());
    }
    if let Some(working_dir) = &spec.working_dir {
        args.push("-w".to_string());
        args.push(working_dir.clone());
    }
    if let Some(image) = &spec.image {
        args.push(image.clone());
    }
    args.extend(spec.command.iter().cloned());

    let keep_alive = !matches!(spec.restart, RestartPolicy::No) && !spec.one_shot;

    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n");
    out.push_str("<plist version=\"1.0\">\n<dict>\n");
    out.push_str(&format!("  <key>Label</key>\n  <string>{}</string>\n", spec.fq_name));
    out.push_str("  <key>ProgramArguments</key>\n  <array>\n");
    for arg in &args {
        out.push_str(&format!("    <string>{}</string>\n", plist_escape(arg)));
    }
    out.push_str("  </array>\n");
    out.push_str(&format!(
        "  <key>KeepAlive</key>\n  <{}/>\n",
        if keep_alive { "true" } else { "false" }
    ));
    out.push_str("  <key>RunAtLoad</key>\n  <true/>\n");

    if !spec.labels.is_empty() {
        out.push_str("  <key>QuadOpsLabels</key>\n  <dict>\n");
        for (key, value) in &spec.labels {
            out.push_str(&format!(
                "    <key>{}</key>\n    <string>{}</string>\n",
                plist_escape(key),
                plist_escape(value)
            ));
        }
        out.push_str("  </dict>\n");
    }

    out.push_str("</dict>\n</plist>\n");
    out
}

fn plist_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
