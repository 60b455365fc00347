use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value {value:?} for {name}: {reason}")]
    InvalidSetting {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("failed to resolve application directory {path}")]
    AppDirResolve {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── State store ──
    #[error("failed to write state file {path}")]
    StoreWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to delete state file {path}")]
    StoreDelete {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Fingerprints ──
    #[error("failed to read {path} for fingerprinting")]
    FingerprintRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to walk directory {path}")]
    DirectoryWalk {
        path: PathBuf,
        source: walkdir::Error,
    },
}

impl Error {
    /// Configuration errors abort a command before anything is mutated.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigLoad { .. }
                | Self::ConfigParse { .. }
                | Self::InvalidSetting { .. }
                | Self::AppDirResolve { .. }
        )
    }
}
