//! Output renderers and formatting helpers for CLI commands.

use std::fmt::Write as _;

use anyhow::anyhow;
use serde::Serialize;
use vdiff_core::{Report, ReportResource, WorkLocation};

use crate::cli::OutputFormat;
use crate::error::{CliError, CliResult};

/// State of a fingerprint's workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum BuildState {
    Cached,
    Building,
    Idle,
}

impl BuildState {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Cached => "cached",
            Self::Building => "building",
            Self::Idle => "idle",
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StatusView<'a> {
    pub(crate) fingerprint: &'a str,
    pub(crate) state: BuildState,
    pub(crate) workspace: String,
}

#[derive(Debug, Serialize)]
struct LocationView<'a> {
    fingerprint: &'a str,
    workspace: String,
    actual_dir: String,
    expect_dir: String,
    diff_dir: String,
    result_file: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportView<'a> {
    report_url: &'a str,
    #[serde(flatten)]
    report: &'a Report,
}

pub(crate) fn render_report(report: &Report, report_url: &str, format: OutputFormat) -> CliResult<()> {
    let text = match format {
        OutputFormat::Json => to_json(&ReportView { report_url, report })?,
        OutputFormat::Table => report_table(report, report_url),
    };
    println!("{text}");
    Ok(())
}

pub(crate) fn render_status(status: &StatusView<'_>, format: OutputFormat) -> CliResult<()> {
    let text = match format {
        OutputFormat::Json => to_json(status)?,
        OutputFormat::Table => format!(
            "fingerprint: {}\nstate: {}\nworkspace: {}",
            status.fingerprint,
            status.state.as_str(),
            status.workspace
        ),
    };
    println!("{text}");
    Ok(())
}

pub(crate) fn render_resource(resource: &ReportResource, format: OutputFormat) -> CliResult<()> {
    let text = match format {
        OutputFormat::Json => to_json(resource)?,
        OutputFormat::Table => resource_table(resource),
    };
    println!("{text}");
    Ok(())
}

pub(crate) fn render_location(location: &WorkLocation, format: OutputFormat) -> CliResult<()> {
    let text = match format {
        OutputFormat::Json => to_json(&LocationView {
            fingerprint: location.hash(),
            workspace: location.root().display().to_string(),
            actual_dir: location.actual_dir().display().to_string(),
            expect_dir: location.expect_dir().display().to_string(),
            diff_dir: location.diff_dir().display().to_string(),
            result_file: location.result_file().display().to_string(),
        })?,
        OutputFormat::Table => format!(
            "fingerprint: {}\nworkspace: {}",
            location.hash(),
            location.root().display()
        ),
    };
    println!("{text}");
    Ok(())
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))
}

fn percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn report_table(report: &Report, report_url: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "fingerprint: {}", report.fingerprint);
    let _ = writeln!(out, "report: {report_url}");
    let _ = writeln!(
        out,
        "max: {}  avg: {}  threshold: {}",
        percent(report.max_percentage),
        percent(report.avg_percentage),
        percent(report.threshold)
    );
    let _ = writeln!(
        out,
        "differing: {}  exceeding: {}  near threshold: {}  new: {}  deleted: {}",
        report.diff_count,
        report.exceeding_count,
        report.near_threshold_count,
        report.new_images.len(),
        report.del_images.len()
    );
    let _ = writeln!(out, "{:>8}  PATH", "DIFF");
    for image in &report.images {
        let _ = writeln!(out, "{:>8}  {}", percent(image.percentage), image.path);
    }
    for path in &report.new_images {
        let _ = writeln!(out, "{:>8}  {path}", "new");
    }
    for path in &report.del_images {
        let _ = writeln!(out, "{:>8}  {path}", "deleted");
    }
    out.trim_end().to_string()
}

fn resource_table(resource: &ReportResource) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "fingerprint: {}", resource.fingerprint);
    for image in &resource.images {
        let _ = writeln!(out, "{} {}", percent(image.percentage), image.path);
        let _ = writeln!(out, "  actual: {}", image.actual_image_path);
        let _ = writeln!(out, "  expect: {}", image.expect_image_path);
        let _ = writeln!(out, "  diff:   {}", image.diff_image_path);
    }
    for link in &resource.new_images {
        let _ = writeln!(out, "new {}: {}", link.path, link.image_path);
    }
    for link in &resource.del_images {
        let _ = writeln!(out, "deleted {}: {}", link.path, link.image_path);
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vdiff_core::{ImageDiff, aggregate};

    fn sample() -> Report {
        aggregate(
            "abc",
            vec![
                ImageDiff {
                    path: "/same.png".into(),
                    percentage: 0.0,
                },
                ImageDiff {
                    path: "/changed.png".into(),
                    percentage: 0.02,
                },
            ],
            vec!["/added.png".into()],
            Vec::new(),
            0.005,
        )
    }

    #[test]
    fn report_table_lists_every_path() {
        let table = report_table(&sample(), "https://vdiff.example/report/abc");
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines[0], "fingerprint: abc");
        assert_eq!(lines[1], "report: https://vdiff.example/report/abc");
        assert_eq!(lines[2], "max: 2.00%  avg: 1.00%  threshold: 0.50%");
        assert_eq!(
            lines[3],
            "differing: 1  exceeding: 1  near threshold: 0  new: 1  deleted: 0"
        );
        assert_eq!(lines[5], "   2.00%  /changed.png");
        assert_eq!(lines[6], "   0.00%  /same.png");
        assert_eq!(lines[7], "     new  /added.png");
        assert_eq!(lines.len(), 8);
    }

    #[test]
    fn report_json_carries_the_url() -> vdiff_test_support::TestResult {
        let report = sample();
        let text = to_json(&ReportView {
            report_url: "https://vdiff.example/report/abc",
            report: &report,
        })?;
        let value: serde_json::Value = serde_json::from_str(&text)?;
        assert_eq!(value["reportUrl"], "https://vdiff.example/report/abc");
        assert_eq!(value["fingerprint"], "abc");
        assert_eq!(value["exceedingCount"], 1);
        Ok(())
    }

    #[test]
    fn status_serializes_lowercase_state() -> vdiff_test_support::TestResult {
        let text = to_json(&StatusView {
            fingerprint: "abc",
            state: BuildState::Building,
            workspace: "/work/abc".into(),
        })?;
        let value: serde_json::Value = serde_json::from_str(&text)?;
        assert_eq!(value["state"], "building");
        Ok(())
    }
}
