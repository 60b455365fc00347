use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Directory (relative to the application) holding idc metadata.
pub const IDC_DIR: &str = ".idc";

/// `.idc/idc.toml` configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdcConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostOs {
    Linux,
    Windows,
}

impl HostOs {
    pub fn detect() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Linux
        }
    }

    fn parse(name: &'static str, value: &str) -> crate::Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "windows" => Ok(Self::Windows),
            _ => Err(crate::Error::InvalidSetting {
                name,
                value: value.to_owned(),
                reason: "expected `linux` or `windows`",
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Run the container as a Kubernetes pod (kubectl/helm/buildah) instead of docker
    #[serde(default)]
    pub kubernetes: bool,
    /// Host operating system; decides the shell used for external commands
    #[serde(default = "HostOs::detect")]
    pub host_os: HostOs,
    /// Host path of the application as seen by the container runtime (Windows hosts)
    #[serde(default)]
    pub windows_path: Option<String>,
    /// Prefix for generated image and container names
    #[serde(default)]
    pub name_prefix: String,
    /// Directory inside the container holding the lifecycle scripts
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: String,
    /// Port the application server listens on
    #[serde(default = "default_app_port")]
    pub app_port: u16,
    /// Port the debugger attaches to
    #[serde(default = "default_debug_port")]
    pub debug_port: u16,
    /// Kubernetes namespace
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// State directory (defaults to `<app>/.idc`)
    pub state_dir: Option<PathBuf>,
    /// Home of the store shared by every application (defaults to `~/.idc`)
    pub global_dir: Option<PathBuf>,
    /// Directory holding the master Dockerfile (defaults to `<state_dir>/artifacts`)
    pub artifacts_dir: Option<PathBuf>,
    /// Build descriptor, relative to the application
    #[serde(default = "default_build_descriptor")]
    pub build_descriptor: PathBuf,
    /// Watched server configuration directory, relative to the application
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,
    /// Helm chart directory, relative to the application
    #[serde(default = "default_chart_dir")]
    pub chart_dir: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            kubernetes: false,
            host_os: HostOs::detect(),
            windows_path: None,
            name_prefix: String::new(),
            scripts_dir: default_scripts_dir(),
            app_port: default_app_port(),
            debug_port: default_debug_port(),
            namespace: None,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_dir: None,
            global_dir: None,
            artifacts_dir: None,
            build_descriptor: default_build_descriptor(),
            config_dir: default_config_dir(),
            chart_dir: default_chart_dir(),
        }
    }
}

impl IdcConfig {
    /// Load from `<app_dir>/.idc/idc.toml`, or return defaults if not found.
    pub fn load(app_dir: &Path) -> crate::Result<Self> {
        let config_path = app_dir.join(IDC_DIR).join("idc.toml");
        if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                    path: config_path.clone(),
                    source: e,
                })?;
            toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                path: config_path,
                source: e,
            })
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `IDC_*` overrides. `lookup` is normally `std::env::var(..).ok()`.
    pub fn apply_env<F>(&mut self, lookup: F) -> crate::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("IDC_HOST_OS") {
            self.runtime.host_os = HostOs::parse("IDC_HOST_OS", &v)?;
        }
        if let Some(v) = lookup("IDC_KUBE") {
            self.runtime.kubernetes = parse_bool("IDC_KUBE", &v)?;
        }
        if let Some(v) = lookup("IDC_WINDOWS_PATH") {
            self.runtime.windows_path = Some(v);
        }
        if let Some(v) = lookup("IDC_STATE_DIR") {
            self.paths.state_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("IDC_GLOBAL_DIR") {
            self.paths.global_dir = Some(PathBuf::from(v));
        }
        Ok(())
    }

    pub fn state_dir(&self, app_dir: &Path) -> PathBuf {
        self.paths
            .state_dir
            .clone()
            .unwrap_or_else(|| app_dir.join(IDC_DIR))
    }

    /// Directory of the global store. Falls back to the application's state
    /// directory when no home directory can be found.
    pub fn global_dir(&self, app_dir: &Path) -> PathBuf {
        self.paths
            .global_dir
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(IDC_DIR)))
            .unwrap_or_else(|| self.state_dir(app_dir))
    }

    pub fn artifacts_dir(&self, app_dir: &Path) -> PathBuf {
        self.paths
            .artifacts_dir
            .clone()
            .unwrap_or_else(|| self.state_dir(app_dir).join("artifacts"))
    }
}

fn parse_bool(name: &'static str, value: &str) -> crate::Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(crate::Error::InvalidSetting {
            name,
            value: value.to_owned(),
            reason: "expected a boolean",
        }),
    }
}

fn default_scripts_dir() -> String {
    "/scripts".to_owned()
}

fn default_app_port() -> u16 {
    9080
}

fn default_debug_port() -> u16 {
    7777
}

fn default_build_descriptor() -> PathBuf {
    PathBuf::from("pom.xml")
}

fn default_config_dir() -> PathBuf {
    PathBuf::from("src/main/liberty/config")
}

fn default_chart_dir() -> PathBuf {
    PathBuf::from("chart")
}
