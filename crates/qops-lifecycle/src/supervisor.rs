//! Host supervisor clients: systemd driven through `systemctl`, launchd
//! through `launchctl`. Both speak the same trait so the manager and its
//! tests never care which host they run on.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::LifecycleError;

/// Snapshot of one unit as the supervisor reports it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnitStatus {
    pub active: bool,
    pub state: String,
    pub substate: Option<String>,
    pub last_error: Option<String>,
}

impl UnitStatus {
    /// A one-shot unit that ran to completion reports `inactive` with no
    /// recorded failure; treat that the same as `active` when deciding
    /// whether a start succeeded.
    pub fn settled_ok(&self) -> bool {
        self.active || (self.state == "inactive" && self.last_error.is_none())
    }
}

/// The operations the lifecycle manager is allowed to assume of the host
/// supervisor. Implementations: systemd, launchd, and an in-memory mock
/// for tests.
pub trait SupervisorClient: Send + Sync {
    /// Re-read unit definitions from disk.
    fn reload(&self) -> Result<(), LifecycleError>;
    fn start(&self, unit: &str) -> Result<(), LifecycleError>;
    fn stop(&self, unit: &str) -> Result<(), LifecycleError>;
    fn restart(&self, unit: &str) -> Result<(), LifecycleError>;
    /// Clear a transient failed state so a restart is not refused. No-op on
    /// hosts without the concept.
    fn reset_failed(&self, unit: &str) -> Result<(), LifecycleError>;
    fn status(&self, unit: &str) -> Result<UnitStatus, LifecycleError>;
    /// Map a managed service (fq name + artifact filename) to the unit
    /// identifier this supervisor addresses it by.
    fn unit_name(&self, fq_name: &str, rel_path: &str) -> String;
}

fn run_supervisor_command<I, S>(
    binary: &Path,
    args: I,
    unit: &str,
    op: &'static str,
) -> Result<String, LifecycleError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let owned_args: Vec<OsString> = args
        .into_iter()
        .map(|arg| arg.as_ref().to_os_string())
        .collect();

    let mut command = Command::new(binary);
    for arg in &owned_args {
        command.arg(arg);
    }

    let output = command
        .output()
        .map_err(|source| LifecycleError::OperationFailed {
            name: unit.to_string(),
            op,
            message: format!("failed to spawn {}: {source}", binary.display()),
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(LifecycleError::OperationFailed {
            name: unit.to_string(),
            op,
            message: format!(
                "exit status {:?}: {}",
                output.status.code(),
                stderr.trim()
            ),
        });
    }

    Ok(stdout)
}

/// Drives systemd via `systemctl`, against the user or system instance.
#[derive(Debug, Clone)]
pub struct SystemdSupervisor {
    user_mode: bool,
    binary: PathBuf,
}

impl SystemdSupervisor {
    pub fn new(user_mode: bool) -> Self {
        Self {
            user_mode,
            binary: PathBuf::from("systemctl"),
        }
    }

    fn args(&self, rest: &[&str]) -> Vec<String> {
        let mut args = Vec::with_capacity(rest.len() + 1);
        if self.user_mode {
            args.push("--user".to_string());
        }
        args.extend(rest.iter().map(|s| s.to_string()));
        args
    }

    fn run(&self, rest: &[&str], unit: &str, op: &'static str) -> Result<String, LifecycleError> {
        run_supervisor_command(&self.binary, self.args(rest), unit, op)
    }
}

impl SupervisorClient for SystemdSupervisor {
    fn reload(&self) -> Result<(), LifecycleError> {
        self.run(&["daemon-reload"], "-", "reload").map(|_| ())
    }

    fn start(&self, unit: &str) -> Result<(), LifecycleError> {
        self.run(&["start", unit], unit, "start").map(|_| ())
    }

    fn stop(&self, unit: &str) -> Result<(), LifecycleError> {
        self.run(&["stop", unit], unit, "stop").map(|_| ())
    }

    fn restart(&self, unit: &str) -> Result<(), LifecycleError> {
        self.run(&["restart", unit], unit, "restart").map(|_| ())
    }

    fn reset_failed(&self, unit: &str) -> Result<(), LifecycleError> {
        self.run(&["reset-failed", unit], unit, "reset-failed")
            .map(|_| ())
    }

    fn status(&self, unit: &str) -> Result<UnitStatus, LifecycleError> {
        let stdout = self.run(
            &["show", unit, "--property=ActiveState,SubState,Result"],
            unit,
            "status",
        )?;
        Ok(parse_systemd_show(&stdout))
    }

    fn unit_name(&self, _fq_name: &str, rel_path: &str) -> String {
        rel_path.to_string()
    }
}

fn parse_systemd_show(stdout: &str) -> UnitStatus {
    let mut status = UnitStatus::default();
    for line in stdout.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        match key.trim() {
            "ActiveState" => status.state = value.trim().to_string(),
            "SubState" => {
                let sub = value.trim();
                if !sub.is_empty() {
                    status.substate = Some(sub.to_string());
                }
            }
            "Result" => {
                let result = value.trim();
                if !result.is_empty() && result != "success" {
                    status.last_error = Some(result.to_string());
                }
            }
            _ => {}
        }
    }
    status.active = status.state == "active";
    status
}

/// Drives launchd via `launchctl`, bootstrapping plists out of the
/// artifact directory into the gui (user) or system domain.
#[derive(Debug, Clone)]
pub struct LaunchdSupervisor {
    user_mode: bool,
    plist_dir: PathBuf,
    binary: PathBuf,
}

impl LaunchdSupervisor {
    pub fn new(user_mode: bool, plist_dir: impl Into<PathBuf>) -> Self {
        Self {
            user_mode,
            plist_dir: plist_dir.into(),
            binary: PathBuf::from("launchctl"),
        }
    }

    fn domain(&self) -> Result<String, LifecycleError> {
        if !self.user_mode {
            return Ok("system".to_string());
        }
        let uid = run_supervisor_command(Path::new("id"), ["-u"], "-", "domain")?;
        Ok(format!("gui/{}", uid.trim()))
    }

    fn run(&self, rest: &[&str], unit: &str, op: &'static str) -> Result<String, LifecycleError> {
        run_supervisor_command(&self.binary, rest, unit, op)
    }

    fn plist_path(&self, unit: &str) -> PathBuf {
        self.plist_dir.join(unit)
    }
}

fn launchd_label(unit: &str) -> &str {
    unit.strip_suffix(".plist").unwrap_or(unit)
}

impl SupervisorClient for LaunchdSupervisor {
    /// launchd re-reads a plist at bootstrap time; there is no global
    /// definition reload.
    fn reload(&self) -> Result<(), LifecycleError> {
        Ok(())
    }

    fn start(&self, unit: &str) -> Result<(), LifecycleError> {
        let domain = self.domain()?;
        let plist = self.plist_path(unit);
        self.run(
            &["bootstrap", &domain, &plist.to_string_lossy()],
            unit,
            "start",
        )
        .map(|_| ())
    }

    fn stop(&self, unit: &str) -> Result<(), LifecycleError> {
        let domain = self.domain()?;
        let plist = self.plist_path(unit);
        self.run(
            &["bootout", &domain, &plist.to_string_lossy()],
            unit,
            "stop",
        )
        .map(|_| ())
    }

    fn restart(&self, unit: &str) -> Result<(), LifecycleError> {
        let domain = self.domain()?;
        let target = format!("{domain}/{}", launchd_label(unit));
        self.run(&["kickstart", "-k", &target], unit, "restart")
            .map(|_| ())
    }

    fn reset_failed(&self, _unit: &str) -> Result<(), LifecycleError> {
        Ok(())
    }

    fn status(&self, unit: &str) -> Result<UnitStatus, LifecycleError> {
        let domain = self.domain()?;
        let target = format!("{domain}/{}", launchd_label(unit));
        let stdout = self.run(&["print", &target], unit, "status")?;
        Ok(parse_launchctl_print(&stdout))
    }

    fn unit_name(&self, _fq_name: &str, rel_path: &str) -> String {
        rel_path.to_string()
    }
}

fn parse_launchctl_print(stdout: &str) -> UnitStatus {
    let mut status = UnitStatus::default();
    for line in stdout.lines() {
        let trimmed = line.trim();
        if let Some(value) = trimmed.strip_prefix("state = ") {
            status.state = value.trim().to_string();
        } else if let Some(value) = trimmed.strip_prefix("last exit code = ") {
            let code = value.trim();
            if code != "0" && !code.is_empty() {
                status.last_error = Some(format!("last exit code = {code}"));
            }
        }
    }
    status.active = status.state == "running";
    status
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn systemd_show_output_maps_to_status() {
        let status = parse_systemd_show("ActiveState=active\nSubState=running\nResult=success\n");
        assert!(status.active);
        assert_eq!(status.state, "active");
        assert_eq!(status.substate.as_deref(), Some("running"));
        assert!(status.last_error.is_none());
    }

    #[test]
    fn systemd_failure_result_is_surfaced() {
        let status =
            parse_systemd_show("ActiveState=failed\nSubState=failed\nResult=exit-code\n");
        assert!(!status.active);
        assert_eq!(status.last_error.as_deref(), Some("exit-code"));
    }

    #[test]
    fn finished_oneshot_counts_as_settled() {
        let status = parse_systemd_show("ActiveState=inactive\nSubState=dead\nResult=success\n");
        assert!(!status.active);
        assert!(status.settled_ok());
    }

    #[test]
    fn failed_oneshot_is_not_settled() {
        let status = parse_systemd_show("ActiveState=inactive\nSubState=dead\nResult=exit-code\n");
        assert!(!status.settled_ok());
    }

    #[test]
    fn launchctl_print_running_state_is_active() {
        let out = "service = com.example.web\n\tstate = running\n\tlast exit code = 0\n";
        let status = parse_launchctl_print(out);
        assert!(status.active);
        assert_eq!(status.state, "running");
    }

    #[test]
    fn launchd_label_strips_plist_suffix() {
        assert_eq!(
            launchd_label("dev.trly.quad-ops.svc-a.web.plist"),
            "dev.trly.quad-ops.svc-a.web"
        );
    }

    #[test]
    fn systemd_unit_name_is_the_artifact_filename() {
        let client = SystemdSupervisor::new(true);
        assert_eq!(
            client.unit_name(
                "dev.trly.quad-ops.svc-a.web",
                "dev.trly.quad-ops.svc-a.web.container"
            ),
            "dev.trly.quad-ops.svc-a.web.container"
        );
    }
}
