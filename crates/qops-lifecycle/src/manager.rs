//! Drives the host supervisor over a reconciled change set: reload once,
//! then starts/restarts in the caller-supplied dependency order, with a
//! per-service activation deadline and bounded fan-out for batched calls.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use qops_core::{ChangeStatus, ServiceChange};

use crate::error::LifecycleError;
use crate::state::{transition, ServiceState};
use crate::supervisor::SupervisorClient;

const DEFAULT_WORKER_COUNT: usize = 8;
const DEFAULT_START_DEADLINE: Duration = Duration::from_secs(60);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct LifecycleManager {
    client: Arc<dyn SupervisorClient>,
    worker_count: usize,
    start_deadline: Duration,
    poll_interval: Duration,
}

impl LifecycleManager {
    pub fn new(client: Arc<dyn SupervisorClient>) -> Self {
        Self {
            client,
            worker_count: DEFAULT_WORKER_COUNT,
            start_deadline: DEFAULT_START_DEADLINE,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count.max(1);
        self
    }

    pub fn with_start_deadline(mut self, deadline: Duration) -> Self {
        self.start_deadline = deadline;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn reload(&self) -> Result<(), LifecycleError> {
        self.client.reload()
    }

    pub fn unit_name(&self, fq_name: &str, rel_path: &str) -> String {
        self.client.unit_name(fq_name, rel_path)
    }

    pub fn start(&self, unit: &str) -> Result<(), LifecycleError> {
        self.client.start(unit)
    }

    pub fn stop(&self, unit: &str) -> Result<(), LifecycleError> {
        self.client.stop(unit)
    }

    pub fn restart(&self, unit: &str) -> Result<(), LifecycleError> {
        self.client.restart(unit)
    }

    pub fn status(&self, unit: &str) -> Result<crate::supervisor::UnitStatus, LifecycleError> {
        self.client.status(unit)
    }

    /// Start `unit` and poll until the supervisor reports it active (or a
    /// one-shot unit settled cleanly). Exceeding the deadline yields
    /// `DeadlineExceeded` and the unit is considered failed.
    pub fn start_and_wait(&self, unit: &str) -> Result<(), LifecycleError> {
        let state = transition(unit, ServiceState::Absent, ServiceState::Loaded)?;
        let state = transition(unit, state, ServiceState::Started)?;
        self.client.start(unit)?;
        self.wait_settled(unit)?;
        transition(unit, state, ServiceState::Active)?;
        Ok(())
    }

    /// Restart `unit` after clearing any transient failed state, then wait
    /// for it to come back up. The reset is best-effort: a unit that was
    /// never failed has nothing to clear.
    pub fn restart_and_wait(&self, unit: &str) -> Result<(), LifecycleError> {
        let _ = self.client.reset_failed(unit);
        self.client.restart(unit)?;
        self.wait_settled(unit)
    }

    fn wait_settled(&self, unit: &str) -> Result<(), LifecycleError> {
        let deadline = Instant::now() + self.start_deadline;
        loop {
            let status = self.client.status(unit)?;
            if status.settled_ok() {
                return Ok(());
            }
            if let Some(error) = status.last_error {
                return Err(LifecycleError::OperationFailed {
                    name: unit.to_string(),
                    op: "activate",
                    message: error,
                });
            }
            if Instant::now() >= deadline {
                return Err(LifecycleError::DeadlineExceeded {
                    name: unit.to_string(),
                    deadline_secs: self.start_deadline.as_secs(),
                });
            }
            std::thread::sleep(self.poll_interval);
        }
    }

    pub fn start_many(&self, units: &[String]) -> BTreeMap<String, Result<(), LifecycleError>> {
        self.for_each_bounded(units, |unit| self.client.start(unit))
    }

    pub fn stop_many(&self, units: &[String]) -> BTreeMap<String, Result<(), LifecycleError>> {
        self.for_each_bounded(units, |unit| self.client.stop(unit))
    }

    pub fn restart_many(&self, units: &[String]) -> BTreeMap<String, Result<(), LifecycleError>> {
        self.for_each_bounded(units, |unit| self.client.restart(unit))
    }

    /// Fan `op` out over `units`, at most `worker_count` in flight.
    fn for_each_bounded<F>(
        &self,
        units: &[String],
        op: F,
    ) -> BTreeMap<String, Result<(), LifecycleError>>
    where
        F: Fn(&str) -> Result<(), LifecycleError> + Sync,
    {
        let mut results = BTreeMap::new();
        let op = &op;
        std::thread::scope(|scope| {
            for chunk in units.chunks(self.worker_count) {
                let handles: Vec<_> = chunk
                    .iter()
                    .map(|unit| (unit, scope.spawn(move || op(unit))))
                    .collect();
                for (unit, handle) in handles {
                    let result = handle.join().unwrap_or_else(|_| {
                        Err(LifecycleError::OperationFailed {
                            name: unit.clone(),
                            op: "batch",
                            message: "worker thread panicked".to_string(),
                        })
                    });
                    results.insert(unit.clone(), result);
                }
            }
        });
        results
    }

    /// Apply the lifecycle consequences of a reconciled change set. The
    /// caller must have called `reload()` first, and `ordered_fq_names`
    /// must list services in dependency order; a failed service never
    /// cancels its unrelated siblings.
    ///
    /// `force` promotes `unchanged` services to restart candidates without
    /// any bytes having been rewritten on disk.
    pub fn apply(
        &self,
        changes: &[ServiceChange],
        ordered_fq_names: &[String],
        force: bool,
    ) -> Vec<LifecycleError> {
        let mut errors = Vec::new();
        let change_by_fq: BTreeMap<&str, &ServiceChange> = changes
            .iter()
            .filter(|change| !change.fq_name.is_empty())
            .map(|change| (change.fq_name.as_str(), change))
            .collect();

        for fq_name in ordered_fq_names {
            let Some(change) = change_by_fq.get(fq_name.as_str()) else {
                continue;
            };
            let unit = self.client.unit_name(fq_name, &change.rel_path);
            let result = match change.status {
                ChangeStatus::Created => self.start_and_wait(&unit),
                ChangeStatus::Updated => self.restart_and_wait(&unit),
                ChangeStatus::Unchanged if force => self.restart_and_wait(&unit),
                ChangeStatus::Unchanged
                | ChangeStatus::Removed
                | ChangeStatus::OrphanedKeep
                | ChangeStatus::Failed => Ok(()),
            };
            if let Err(error) = result {
                errors.push(error);
            }
        }

        errors
    }
}
