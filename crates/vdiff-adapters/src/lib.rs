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

//! Concrete collaborators for the build engine: a filesystem mirror of the
//! artifact store, an HTTP image comparator, and a Slack notifier.
//!
//! Layout: `mirror.rs`, `comparator.rs`, `slack.rs`, `error.rs`.

pub mod comparator;
pub mod error;
pub mod mirror;
pub mod slack;

pub use comparator::HttpComparator;
pub use error::{AdapterError, AdapterResult};
pub use mirror::MirrorSource;
pub use slack::SlackNotifier;
