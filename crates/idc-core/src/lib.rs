//! Core types for idc.
//!
//! This crate defines the `.idc/idc.toml` schema ([`IdcConfig`]), the
//! per-application state store ([`KeyValueStore`]), content fingerprints,
//! application identity and the pure lifecycle decision engine
//! ([`decision::decide`]).

pub mod app;
pub mod config;
pub mod context;
pub mod decision;
pub mod error;
pub mod fingerprint;
pub mod state;
pub mod store;

pub use app::AppIdentity;
pub use config::{HostOs, IdcConfig, PathsConfig, RuntimeConfig};
pub use context::AppContext;
pub use decision::{
    Action, AppSignal, BuildOptions, Decision, DecisionInput, LifecycleCommand, Observation,
    decide,
};
pub use error::{Error, Result};
pub use fingerprint::{Fingerprint, fingerprint, new_fingerprint_if_changed};
pub use store::KeyValueStore;
