use idc_core::HostOs;

use crate::process::{ProcessError, ProcessExecutor, ProcessResult};

/// Console lines that carry no information during image builds.
pub const DEFAULT_NOISE: &[&str] = &[
    "Sending build context to Docker daemon",
    "Removing intermediate container",
    " ---> Running in",
];

/// Abstraction over shell command execution for testability.
///
/// Production code uses [`ShellExecutor`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait RuntimeExecutor: Send + Sync {
    /// Run a command line and capture its combined output.
    async fn run(&self, command_line: &str) -> Result<ProcessResult, ProcessError>;

    /// Run a command line, echoing output to the terminal while capturing it.
    async fn run_streaming(&self, command_line: &str) -> Result<ProcessResult, ProcessError>;
}

/// Real executor: one [`ProcessExecutor`] per command.
pub struct ShellExecutor {
    host_os: HostOs,
    elevation: Option<String>,
    noise: Vec<String>,
}

impl ShellExecutor {
    pub fn new(host_os: HostOs) -> Self {
        Self {
            host_os,
            elevation: None,
            noise: DEFAULT_NOISE.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    pub fn elevated(mut self, password: Option<String>) -> Self {
        self.elevation = password;
        self
    }

    /// Hide console lines starting with `prefix` during streaming runs.
    pub fn hide_lines_starting_with(mut self, prefix: impl Into<String>) -> Self {
        self.noise.push(prefix.into());
        self
    }

    fn process(&self) -> ProcessExecutor {
        ProcessExecutor::new(self.host_os).elevated(self.elevation.clone())
    }
}

impl RuntimeExecutor for ShellExecutor {
    async fn run(&self, command_line: &str) -> Result<ProcessResult, ProcessError> {
        self.process().run(command_line, false).await
    }

    async fn run_streaming(&self, command_line: &str) -> Result<ProcessResult, ProcessError> {
        let process = self.process();
        let noise = self.noise.clone();
        process.add_filter(move |_, line| noise.iter().any(|prefix| line.starts_with(prefix)));
        process.run(command_line, true).await
    }
}
