//! The quad-ops reconciliation daemon: turns Compose projects held in git
//! repositories into supervisor units on the local host and keeps the two
//! in sync.

pub mod daemon;
pub mod platform;
pub mod reconciler;
pub mod report;

pub use daemon::run_loop;
pub use platform::{Platform, PlatformError};
pub use reconciler::Reconciler;
pub use report::Report;
