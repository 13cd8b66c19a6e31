#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! File and environment backed configuration for vdiff.
//!
//! Layout: `model.rs` (typed config sections), `defaults.rs` (default values),
//! `loader.rs` (YAML file + `VDIFF_*` environment overlay), `validate.rs`
//! (validation helpers).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ENV_PREFIX;
pub use model::{
    AppConfig, ArtifactConfig, BuildConfig, ComparatorConfig, LoggingSettings, NotifyConfig,
};
