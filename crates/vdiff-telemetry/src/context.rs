//! Build-scoped tracing context.

use std::future::Future;

use tracing::Instrument;

/// Execute the future inside a `build` span tagged with the fingerprint, so
/// every log line of the pipeline carries it.
pub async fn with_build_context<Fut, T>(fingerprint: impl Into<String>, fut: Fut) -> T
where
    Fut: Future<Output = T>,
{
    let fingerprint = fingerprint.into();
    let span = tracing::info_span!("build", fingerprint = %fingerprint);
    fut.instrument(span).await
}
