use std::path::{Path, PathBuf};

use crate::app::AppIdentity;
use crate::config::IdcConfig;

/// Everything a command needs to know about the application it targets.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub app: AppIdentity,
    pub config: IdcConfig,
    pub state_dir: PathBuf,
    /// Holds the store shared across applications
    pub global_dir: PathBuf,
    pub artifacts_dir: PathBuf,
}

impl AppContext {
    /// Load `.idc/idc.toml` for `app_dir`, apply environment overrides and
    /// derive the application identity.
    pub fn load<F>(app_dir: &Path, lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = IdcConfig::load(app_dir)?;
        config.apply_env(lookup)?;
        let app = AppIdentity::resolve(app_dir, &config.runtime.name_prefix)?;
        Ok(Self::new(app, config))
    }

    pub fn new(app: AppIdentity, config: IdcConfig) -> Self {
        let state_dir = config.state_dir(&app.dir);
        let global_dir = config.global_dir(&app.dir);
        let artifacts_dir = config.artifacts_dir(&app.dir);
        Self {
            app,
            config,
            state_dir,
            global_dir,
            artifacts_dir,
        }
    }

    pub fn app_dir(&self) -> &Path {
        &self.app.dir
    }

    /// Application directory as the container runtime should mount it.
    pub fn host_dir(&self) -> String {
        self.config
            .runtime
            .windows_path
            .clone()
            .unwrap_or_else(|| self.app.dir.to_string_lossy().into_owned())
    }

    pub fn chart_dir(&self) -> PathBuf {
        self.app.dir.join(&self.config.paths.chart_dir)
    }
}
