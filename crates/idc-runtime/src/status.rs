//! Progress reporting hooks.
//!
//! Build and run actions announce progress at fixed points. The transport
//! to an external status service is pluggable; [`LogReporter`] writes the
//! events to the log.

use idc_core::AppIdentity;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildTarget {
    Image,
    Application,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    BuildStarted(BuildTarget),
    BuildSucceeded(BuildTarget),
    BuildFailed(BuildTarget),
    AppStarting,
    AppStopped,
}

pub trait StatusReporter: Send + Sync {
    fn report(&self, app: &AppIdentity, event: StatusEvent);
}

pub struct LogReporter;

impl StatusReporter for LogReporter {
    fn report(&self, app: &AppIdentity, event: StatusEvent) {
        info!(app_id = %app.id, app = %app.name, event = ?event, "status");
    }
}
