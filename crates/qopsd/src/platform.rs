//! Host platform wiring. The renderer and supervisor client for the host
//! are constructed here once and injected into the reconciler; nothing
//! downstream ever asks "what OS am I on" again.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use qops_lifecycle::{LaunchdSupervisor, SupervisorClient, SystemdSupervisor};
use qops_render::{LaunchdRenderer, PlatformRenderer, SystemdRenderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Systemd,
    Launchd,
}

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("unsupported host platform {os}: no supervisor backend")]
    Unsupported { os: &'static str },
}

/// Pick the supervisor flavour for the compile-time target OS.
pub fn detect() -> Result<Platform, PlatformError> {
    if cfg!(target_os = "linux") {
        Ok(Platform::Systemd)
    } else if cfg!(target_os = "macos") {
        Ok(Platform::Launchd)
    } else {
        Err(PlatformError::Unsupported {
            os: std::env::consts::OS,
        })
    }
}

pub fn build_renderer(platform: Platform, user_mode: bool) -> Box<dyn PlatformRenderer> {
    match platform {
        Platform::Systemd => Box::new(SystemdRenderer::new(user_mode)),
        Platform::Launchd => Box::new(LaunchdRenderer::new(user_mode)),
    }
}

pub fn build_supervisor(
    platform: Platform,
    user_mode: bool,
    artifact_dir: &Path,
) -> Arc<dyn SupervisorClient> {
    match platform {
        Platform::Systemd => Arc::new(SystemdSupervisor::new(user_mode)),
        Platform::Launchd => Arc::new(LaunchdSupervisor::new(user_mode, artifact_dir)),
    }
}

/// Where artifacts land when the configuration does not override it.
pub fn default_artifact_dir(platform: Platform, user_mode: bool) -> PathBuf {
    match (platform, user_mode) {
        (Platform::Systemd, true) => home_dir().join(".config/containers/systemd"),
        (Platform::Systemd, false) => PathBuf::from("/etc/containers/systemd"),
        (Platform::Launchd, true) => home_dir().join("Library/LaunchAgents"),
        (Platform::Launchd, false) => PathBuf::from("/Library/LaunchDaemons"),
    }
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_mode_directories_are_absolute_fixed_paths() {
        assert_eq!(
            default_artifact_dir(Platform::Systemd, false),
            PathBuf::from("/etc/containers/systemd")
        );
        assert_eq!(
            default_artifact_dir(Platform::Launchd, false),
            PathBuf::from("/Library/LaunchDaemons")
        );
    }

    #[test]
    fn detect_matches_the_compile_target() {
        match detect() {
            Ok(Platform::Systemd) => assert!(cfg!(target_os = "linux")),
            Ok(Platform::Launchd) => assert!(cfg!(target_os = "macos")),
            Err(PlatformError::Unsupported { .. }) => {
                assert!(!cfg!(target_os = "linux") && !cfg!(target_os = "macos"));
            }
        }
    }
}
