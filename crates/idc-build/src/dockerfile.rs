use std::path::{Path, PathBuf};

use tracing::debug;

/// Master Dockerfile shipped in the artifacts directory.
pub const MASTER_DOCKERFILE: &str = "Dockerfile";
/// Optional language layer in the application directory.
pub const LANG_DOCKERFILE: &str = "Dockerfile-lang";
/// Optional user layer in the application directory.
pub const USER_DOCKERFILE: &str = "Dockerfile-idc";
/// Composed Dockerfile, relative to the state directory.
pub const GENERATED_DOCKERFILE: &str = "docker/Dockerfile-idc.generated";

/// The Dockerfiles that make up an application image, in precedence order.
///
/// The list order is the fingerprint order: the master file first, then the
/// language layer, then the user layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerfileSet {
    files: Vec<PathBuf>,
}

impl DockerfileSet {
    /// Resolve the set for `app_dir`. The master Dockerfile must exist.
    pub fn resolve(artifacts_dir: &Path, app_dir: &Path) -> Result<Self, DockerfileError> {
        let master = artifacts_dir.join(MASTER_DOCKERFILE);
        if !master.is_file() {
            return Err(DockerfileError::MissingMaster(master));
        }

        Ok(Self {
            files: vec![
                master,
                app_dir.join(LANG_DOCKERFILE),
                app_dir.join(USER_DOCKERFILE),
            ],
        })
    }

    /// All members, including optional ones that do not exist.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Members that exist on disk, in order.
    pub fn existing(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.iter().filter(|p| p.is_file())
    }

    /// Concatenate the existing members, each ending with a newline.
    pub fn compose(&self) -> Result<String, DockerfileError> {
        let mut out = String::new();
        for path in self.existing() {
            let content = std::fs::read_to_string(path).map_err(|e| DockerfileError::Read {
                path: path.clone(),
                source: e,
            })?;
            out.push_str(&content);
            if !content.ends_with('\n') {
                out.push('\n');
            }
        }
        Ok(out)
    }

    /// Compose and write to `<state_dir>/docker/Dockerfile-idc.generated`.
    pub fn write_composed(&self, state_dir: &Path) -> Result<PathBuf, DockerfileError> {
        let content = self.compose()?;
        let target = state_dir.join(GENERATED_DOCKERFILE);

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DockerfileError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::write(&target, content).map_err(|e| DockerfileError::Write {
            path: target.clone(),
            source: e,
        })?;

        debug!(path = %target.display(), "composed Dockerfile written");
        Ok(target)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DockerfileError {
    #[error("master Dockerfile not found at {0}; reinstall the idc artifacts")]
    MissingMaster(PathBuf),

    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write composed Dockerfile {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
