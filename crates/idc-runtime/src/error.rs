use std::path::PathBuf;

use idc_build::DockerfileError;

use crate::process::ProcessError;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("failed to run container runtime command")]
    Process { source: ProcessError },

    #[error("command failed with exit code {}: {command}\n{output}", exit_label(.exit_code))]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },
}

impl RuntimeError {
    /// Captured output of a failed command, if it ran at all.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { output, .. } => Some(output),
            Self::Process { .. } => None,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "none (terminated by signal)".to_owned(), |c| c.to_string())
}

/// Failure of one lifecycle command, categorised by [`exit_code`](Self::exit_code).
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("invalid idc configuration")]
    Config { source: idc_core::Error },

    #[error("Dockerfile set is unusable")]
    Dockerfile { source: DockerfileError },

    #[error("build descriptor not found at {0}")]
    MissingBuildDescriptor(PathBuf),

    #[error("failed to update idc state")]
    State { source: idc_core::Error },

    #[error("container runtime query failed")]
    Runtime { source: RuntimeError },

    #[error("image build failed for {image}")]
    ImageBuild { image: String, source: RuntimeError },

    #[error("container {name} failed to start")]
    ContainerStart { name: String, source: RuntimeError },

    #[error("application build failed")]
    AppBuild { source: RuntimeError },

    #[error("application {signal} failed")]
    AppSignal {
        signal: &'static str,
        source: RuntimeError,
    },

    #[error("failed to remove container or image {name}")]
    Cleanup { name: String, source: RuntimeError },

    #[error("leftover container or image {name} was kept; remove it or rerun and confirm")]
    CleanupDeclined { name: String },

    #[error("failed to read confirmation from the console")]
    Prompt { source: std::io::Error },
}

impl LifecycleError {
    /// Sort a core error into the configuration or state category.
    pub fn from_core(source: idc_core::Error) -> Self {
        if source.is_configuration() {
            Self::Config { source }
        } else {
            Self::State { source }
        }
    }

    /// Stable process exit code for this failure category.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } | Self::MissingBuildDescriptor(_) => 2,
            Self::Dockerfile { source } => match source {
                DockerfileError::MissingMaster(_) => 2,
                DockerfileError::Read { .. } | DockerfileError::Write { .. } => 1,
            },
            Self::ImageBuild { .. } => 3,
            Self::ContainerStart { .. } => 4,
            Self::AppBuild { .. } => 5,
            Self::AppSignal { .. } => 6,
            Self::Cleanup { .. } | Self::CleanupDeclined { .. } => 7,
            Self::State { .. } | Self::Runtime { .. } | Self::Prompt { .. } => 1,
        }
    }
}
