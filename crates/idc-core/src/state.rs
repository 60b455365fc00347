//! Keys of the per-application and global state stores.

pub const CONTAINER_ID: &str = "container-id";
pub const POD_ID: &str = "pod-id";
pub const CONTAINER_NAME: &str = "container-name";
pub const IMAGE_NAME: &str = "image-name";
pub const CONTAINER_BUILT: &str = "container-built";
pub const APP_BUILT: &str = "app-built";
pub const DOCKERFILE_HASH: &str = "dockerfile-hash";
pub const BUILD_DESCRIPTOR_HASH: &str = "build-descriptor-hash";
pub const CONFIG_DIR_HASH: &str = "config-dir-hash";
pub const CHART_DIR_HASH: &str = "chart-dir-hash";
pub const START_MODE: &str = "start-mode";
pub const DEBUG_PORT: &str = "debug-port";
pub const WORKSPACE_ORIGIN: &str = "workspace-origin";

/// Global store: credential used to elevate shell commands.
pub const ROOT_PASSWORD: &str = "root-password";

/// Which store a `set` key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingScope {
    App,
    Global,
}

/// Keys accepted by `idc set`. Runtime records such as `container-name`
/// are written by the lifecycle only.
pub fn setting_scope(key: &str) -> Option<SettingScope> {
    match key {
        ROOT_PASSWORD => Some(SettingScope::Global),
        DEBUG_PORT | WORKSPACE_ORIGIN => Some(SettingScope::App),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    Dev,
    Prod,
}

impl StartMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Prod => "prod",
        }
    }
}
