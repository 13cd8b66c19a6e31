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
#![allow(clippy::redundant_pub_crate)]

//! Command-line interface for building and inspecting visual diff reports.
//!
//! Layout: `cli.rs` (argument parsing and command handlers), `bootstrap.rs`
//! (config, telemetry and adapter wiring), `output.rs` (table and JSON
//! renderers), `error.rs` (usage vs failure errors and exit codes).

pub(crate) mod bootstrap;
pub(crate) mod cli;
pub(crate) mod error;
pub(crate) mod output;

pub use cli::run;
