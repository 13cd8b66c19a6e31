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

//! Visual-diff build orchestration engine.
//!
//! A build request is validated into [`BuildParam`], fingerprinted into a
//! content-addressed [`WorkLocation`], guarded by a per-fingerprint
//! [`BuildLock`], and executed by [`BuildService`]: both artifact trees are
//! fetched, paired by relative path, compared file by file through a
//! [`Comparator`], and aggregated into a persisted [`Report`]. Callers that
//! arrive while a build runs await its result with the completion poller.
//!
//! Layout: `model.rs` (request, params, report), `filter.rs`, `location.rs`,
//! `lock.rs`, `capability.rs` (collaborator traits), `pairing.rs`,
//! `fanout.rs`, `aggregate.rs`, `store.rs`, `poller.rs`, `notify.rs`,
//! `resource.rs`, `service.rs` (pipeline).

pub mod aggregate;
pub mod capability;
pub mod error;
pub mod fanout;
pub mod filter;
pub mod location;
pub mod lock;
pub mod model;
pub mod notify;
pub mod pairing;
pub mod poller;
pub mod resource;
pub mod service;
pub mod store;

pub use aggregate::aggregate;
pub use capability::{ArtifactSource, Comparator, Comparison, ComparisonRequest, Notifier};
pub use error::{CoreError, CoreResult};
pub use filter::PathFilter;
pub use location::{WorkLocation, fingerprint};
pub use lock::{BuildLease, BuildLock, DEFAULT_STALE_AFTER};
pub use model::{
    BuildParam, BuildRequest, DEFAULT_THRESHOLD, ImageDiff, NumberInput, PathFilterInput, Report,
    Tuning,
};
pub use notify::{Notification, ReportSummary, SlackMessage, slack_payload};
pub use pairing::{PairedFile, PairedTrees, pair_trees, scan_tree};
pub use poller::{DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL, PollPolicy, await_result};
pub use resource::{AssetLink, ImageResource, ReportResource};
pub use service::{BuildService, BuildSettings};
