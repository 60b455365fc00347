use std::path::{Path, PathBuf};

use idc_core::fingerprint::directory_files;
use idc_core::{IdcConfig, PathsConfig};

/// File sets whose fingerprints drive the lifecycle decisions, besides the
/// Dockerfile set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedFiles {
    /// Build descriptor (e.g. `pom.xml`)
    pub build_descriptor: PathBuf,
    /// Files of the server configuration directory, sorted
    pub config_files: Vec<PathBuf>,
    /// Files of the Helm chart directory, sorted
    pub chart_files: Vec<PathBuf>,
}

impl WatchedFiles {
    pub fn discover(app_dir: &Path, config: &IdcConfig) -> idc_core::Result<Self> {
        let PathsConfig {
            build_descriptor,
            config_dir,
            chart_dir,
            ..
        } = &config.paths;

        Ok(Self {
            build_descriptor: app_dir.join(build_descriptor),
            config_files: directory_files(&app_dir.join(config_dir))?,
            chart_files: directory_files(&app_dir.join(chart_dir))?,
        })
    }

    pub fn has_build_descriptor(&self) -> bool {
        self.build_descriptor.is_file()
    }
}
