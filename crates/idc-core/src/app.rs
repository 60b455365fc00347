use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Marker every generated image/container name carries.
pub const NAME_MARKER: &str = "-idc-";

/// Identity of one application directory.
///
/// # Examples
///
/// ```
/// use idc_core::AppIdentity;
/// use std::path::Path;
///
/// let app = AppIdentity::from_resolved_dir(Path::new("/work/My App"), "");
/// assert_eq!(app.id.len(), 16);
/// assert!(app.container_name.starts_with("my-app-idc-"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIdentity {
    /// Canonical application directory
    pub dir: PathBuf,
    /// Final path component of `dir`
    pub name: String,
    /// Deterministic id derived from `dir`
    pub id: String,
    /// `<prefix><lowercased-name>-idc-<id>`, used for both image and container
    pub container_name: String,
}

impl AppIdentity {
    /// Canonicalize `dir` and derive the identity from it.
    pub fn resolve(dir: &Path, name_prefix: &str) -> crate::Result<Self> {
        let canonical = dir
            .canonicalize()
            .map_err(|e| crate::Error::AppDirResolve {
                path: dir.to_path_buf(),
                source: e,
            })?;
        Ok(Self::from_resolved_dir(&canonical, name_prefix))
    }

    /// Derive the identity from an already-canonical path.
    pub fn from_resolved_dir(dir: &Path, name_prefix: &str) -> Self {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "app".to_owned());

        let digest = format!("{:x}", Sha256::digest(dir.to_string_lossy().as_bytes()));
        let id = digest[..16].to_owned();

        let container_name = format!("{name_prefix}{}{NAME_MARKER}{id}", sanitize(&name));

        Self {
            dir: dir.to_path_buf(),
            name,
            id,
            container_name,
        }
    }

    pub fn image_name(&self) -> &str {
        &self.container_name
    }
}

/// Lowercase and replace anything outside `[a-z0-9_.-]` with `-`.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Whether `name` looks like a generated idc image or container name.
pub fn is_generated_name(name: &str, name_prefix: &str) -> bool {
    name.starts_with(name_prefix) && name.contains(NAME_MARKER)
}
