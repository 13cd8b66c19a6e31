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

//! Shared test helpers used across integration suites.
//! Layout: fixtures.rs (scratch directories), tree.rs (artifact tree builder), assert.rs (test assertions).

pub mod assert;
pub mod fixtures;
pub mod tree;

/// Result alias used by test helpers and suites.
pub type TestResult<T = ()> = anyhow::Result<T>;
