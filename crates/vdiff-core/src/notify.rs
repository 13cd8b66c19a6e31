//! Build notifications and their Slack incoming-webhook encoding.

use serde::Serialize;

use crate::model::Report;

const COLOR_DANGER: &str = "#cc0000";
const COLOR_GOOD: &str = "#36a64f";

/// Counts carried by a success notification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportSummary {
    /// Highest difference score.
    pub max_percentage: f64,
    /// Threshold of the build.
    pub threshold: f64,
    /// Number of new images.
    pub new_count: usize,
    /// Number of deleted images.
    pub deleted_count: usize,
    /// Images above the threshold.
    pub exceeding_count: usize,
    /// Images above zero and at most the threshold.
    pub near_threshold_count: usize,
}

impl From<&Report> for ReportSummary {
    fn from(report: &Report) -> Self {
        Self {
            max_percentage: report.max_percentage,
            threshold: report.threshold,
            new_count: report.new_images.len(),
            deleted_count: report.del_images.len(),
            exceeding_count: report.exceeding_count,
            near_threshold_count: report.near_threshold_count,
        }
    }
}

/// Outcome of a build, as delivered to a chat channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// The build succeeded.
    Finished {
        /// Report counts.
        summary: ReportSummary,
        /// Where the report can be viewed.
        report_url: String,
        /// Free-form label shown above the attachment.
        label: Option<String>,
    },
    /// The build failed.
    Failed {
        /// Error description.
        message: String,
    },
}

/// Slack incoming-webhook body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackMessage {
    /// Message attachments.
    pub attachments: Vec<SlackAttachment>,
    /// Optional top-level text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Slack message attachment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackAttachment {
    /// Plain-text summary for clients that cannot render attachments.
    pub fallback: String,
    /// Sidebar colour.
    pub color: &'static str,
    /// Attachment fields.
    pub fields: Vec<SlackField>,
    /// Footer text.
    pub footer: &'static str,
    /// Epoch seconds.
    pub ts: i64,
}

/// Slack attachment field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackField {
    /// Field title.
    pub title: &'static str,
    /// Field value.
    pub value: String,
    /// Whether the field fits side by side with another.
    pub short: bool,
}

impl SlackField {
    const fn short(title: &'static str, value: String) -> Self {
        Self {
            title,
            value,
            short: true,
        }
    }
}

/// Encode a notification as a Slack webhook body stamped with `ts`.
#[must_use]
pub fn slack_payload(notification: &Notification, ts: i64) -> SlackMessage {
    match notification {
        Notification::Finished {
            summary,
            report_url,
            label,
        } => {
            let color = if summary.max_percentage > summary.threshold {
                COLOR_DANGER
            } else {
                COLOR_GOOD
            };
            SlackMessage {
                attachments: vec![SlackAttachment {
                    fallback: "Finish building images".to_string(),
                    color,
                    fields: vec![
                        SlackField::short(
                            "Max Percentage",
                            format!("{} %", summary.max_percentage * 100.0),
                        ),
                        SlackField::short(
                            "New / Delete Images",
                            format!("{} / {}", summary.new_count, summary.deleted_count),
                        ),
                        SlackField::short(
                            "Error / Less Difference Images",
                            format!(
                                "{} / {}",
                                summary.exceeding_count, summary.near_threshold_count
                            ),
                        ),
                        SlackField::short(
                            "Build URL",
                            format!("<{report_url}|View Image Diff Detail>"),
                        ),
                    ],
                    footer: "Finish building image diff",
                    ts,
                }],
                text: label.clone().filter(|label| !label.is_empty()),
            }
        }
        Notification::Failed { message } => SlackMessage {
            attachments: vec![SlackAttachment {
                fallback: message.clone(),
                color: COLOR_DANGER,
                fields: vec![SlackField {
                    title: "Build Error",
                    value: message.clone(),
                    short: false,
                }],
                footer: "Error building images",
                ts,
            }],
            text: None,
        },
    }
}
