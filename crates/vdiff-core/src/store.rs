//! Persisted report file.

use std::io::ErrorKind;
use std::path::Path;

use tokio::fs;

use crate::error::{CoreError, CoreResult};
use crate::model::Report;

const TEMP_SUFFIX: &str = "tmp";

/// Read a persisted report. A missing file yields `None`.
///
/// # Errors
///
/// Returns [`CoreError::Io`] for unreadable files and [`CoreError::Json`]
/// for content that does not decode as a report.
pub async fn read_report(path: &Path) -> CoreResult<Option<Report>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(CoreError::io("store.read_report", path, err)),
    };
    let report = serde_json::from_slice(&bytes)
        .map_err(|err| CoreError::json("store.decode_report", path, err))?;
    Ok(Some(report))
}

/// Write a report so readers never observe a partial file: the JSON goes to
/// a sibling temp file which is then renamed over `path`.
///
/// # Errors
///
/// Returns [`CoreError::Json`] if encoding fails and [`CoreError::Io`] if the
/// file cannot be written or renamed.
pub async fn write_report(path: &Path, report: &Report) -> CoreResult<()> {
    let bytes = serde_json::to_vec_pretty(report)
        .map_err(|err| CoreError::json("store.encode_report", path, err))?;
    let temp = path.with_extension(TEMP_SUFFIX);
    fs::write(&temp, &bytes)
        .await
        .map_err(|err| CoreError::io("store.write_temp", &temp, err))?;
    fs::rename(&temp, path)
        .await
        .map_err(|err| CoreError::io("store.rename_report", path, err))
}
