//! Pure, deterministic translation of `ServiceSpec` into supervisor
//! artifacts. Renderers never touch the filesystem or the
//! supervisor; that is the artifact store's and the lifecycle manager's job.

pub mod error;
pub mod ini;
pub mod launchd;
pub mod render;
pub mod systemd;

pub use error::*;
pub use launchd::LaunchdRenderer;
pub use render::PlatformRenderer;
pub use systemd::SystemdRenderer;
