//! Container runtime plumbing and lifecycle execution for idc.
//!
//! ```text
//! Lifecycle::run(command)
//!   ├─ observe   fingerprints + docker/kubectl queries -> DecisionInput
//!   ├─ decide    idc_core::decide                      -> Decision
//!   └─ execute   ActionRunner, one action at a time    -> store updates
//! ```
//!
//! Every external command goes through a [`RuntimeExecutor`], so the whole
//! pipeline can be driven by a mock in tests.

pub mod actions;
pub mod client;
pub mod error;
pub mod executor;
pub mod lifecycle;
pub mod process;
pub mod prompt;
pub mod status;

pub use actions::ActionRunner;
pub use client::{ContainerInfo, ContainerSpec, RuntimeClient};
pub use error::{LifecycleError, RuntimeError};
pub use executor::{RuntimeExecutor, ShellExecutor};
pub use lifecycle::Lifecycle;
pub use process::{ProcessError, ProcessExecutor, ProcessResult, StreamKind};
pub use prompt::{AssumeYes, Confirm, ConsolePrompt};
pub use status::{BuildTarget, LogReporter, StatusEvent, StatusReporter};
