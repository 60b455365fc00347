//! Dockerfile composition and watched-file discovery for idc.
//!
//! # Image inputs
//!
//! ```text
//! <artifacts>/Dockerfile        master, required
//! <app>/Dockerfile-lang         optional language layer
//! <app>/Dockerfile-idc          optional user layer
//!        │
//!        └── concatenated ──> <state>/docker/Dockerfile-idc.generated
//! ```
//!
//! The same ordered list is fingerprinted to decide whether the image is
//! stale. The build descriptor, configuration directory and chart directory
//! are discovered by [`WatchedFiles`].

pub mod dockerfile;
pub mod watch;

pub use dockerfile::{DockerfileError, DockerfileSet};
pub use watch::WatchedFiles;
