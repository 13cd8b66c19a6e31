use std::path::PathBuf;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;
use vdiff_adapters::{HttpComparator, SlackNotifier};
use vdiff_core::{
    Comparator, ComparisonRequest, CoreError, Notification, Notifier, ReportSummary, Tuning,
};
use vdiff_test_support::TestResult;

fn request(tuning: Tuning) -> ComparisonRequest {
    ComparisonRequest {
        mode: "pixel".into(),
        path: "/pages/home.png".into(),
        actual_file: PathBuf::from("/work/actual/pages/home.png"),
        expect_file: PathBuf::from("/work/expect/pages/home.png"),
        actual_url: "https://artifacts.example/v2/pages/home.png".into(),
        expect_url: "https://artifacts.example/v1/pages/home.png".into(),
        tuning,
    }
}

#[tokio::test]
async fn comparator_posts_urls_and_decodes_the_image() -> TestResult {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST).path("/diff").json_body(json!({
            "mode": "pixel",
            "actual": "https://artifacts.example/v2/pages/home.png",
            "expect": "https://artifacts.example/v1/pages/home.png",
            "radius": 2.0
        }));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"percent": 0.25, "image": "aGVsbG8="}));
    });

    let comparator = HttpComparator::new(&server.url("/diff"), Duration::from_secs(5))?;
    let comparison = comparator
        .compare(&request(Tuning {
            radius: Some(2.0),
            ..Tuning::default()
        }))
        .await?;

    mock.assert();
    assert!((comparison.percentage - 0.25).abs() < f64::EPSILON);
    assert_eq!(comparison.image, b"hello");
    Ok(())
}

#[tokio::test]
async fn comparator_accepts_long_field_names() -> TestResult {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/diff");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"percentage": 0.0, "renderedDifferenceImage": ""}));
    });

    let comparator = HttpComparator::new(&server.url("/diff"), Duration::from_secs(5))?;
    let comparison = comparator.compare(&request(Tuning::default())).await?;
    assert!(comparison.percentage.abs() < f64::EPSILON);
    assert!(comparison.image.is_empty());
    Ok(())
}

#[tokio::test]
async fn comparator_failures_name_the_path() -> TestResult {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/diff");
        then.status(500);
    });

    let comparator = HttpComparator::new(&server.url("/diff"), Duration::from_secs(5))?;
    let err = comparator
        .compare(&request(Tuning::default()))
        .await
        .expect_err("server error");
    assert!(matches!(
        err,
        CoreError::Comparison { ref path, ref detail }
            if path == "/pages/home.png" && detail.contains("returned 500")
    ));
    Ok(())
}

#[tokio::test]
async fn comparator_rejects_invalid_base64() -> TestResult {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/diff");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"percent": 0.1, "image": "not base64!"}));
    });

    let comparator = HttpComparator::new(&server.url("/diff"), Duration::from_secs(5))?;
    let err = comparator
        .compare(&request(Tuning::default()))
        .await
        .expect_err("bad image");
    assert!(matches!(
        err,
        CoreError::Comparison { ref detail, .. }
            if detail.starts_with("failed to decode response field: image")
    ));
    Ok(())
}

#[tokio::test]
async fn slack_receives_the_failure_attachment() -> TestResult {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/hooks/build")
            .body_includes("\"footer\":\"Error building images\"")
            .body_includes("\"title\":\"Build Error\"")
            .body_includes("\"value\":\"artifact download failed\"");
        then.status(200).body("ok");
    });

    let notifier = SlackNotifier::new(&server.url("/hooks/build"))?;
    notifier
        .send(&Notification::Failed {
            message: "artifact download failed".into(),
        })
        .await?;
    mock.assert();
    Ok(())
}

#[tokio::test]
async fn slack_receives_the_summary_and_label() -> TestResult {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/hooks/build")
            .body_includes("\"text\":\"nightly\"")
            .body_includes("\"color\":\"#36a64f\"")
            .body_includes("<https://vdiff.example/report/abc|View Image Diff Detail>");
        then.status(200).body("ok");
    });

    let notifier = SlackNotifier::new(&server.url("/hooks/build"))?;
    notifier
        .send(&Notification::Finished {
            summary: ReportSummary {
                max_percentage: 0.0,
                threshold: 0.005,
                new_count: 0,
                deleted_count: 0,
                exceeding_count: 0,
                near_threshold_count: 0,
            },
            report_url: "https://vdiff.example/report/abc".into(),
            label: Some("nightly".into()),
        })
        .await?;
    mock.assert();
    Ok(())
}

#[tokio::test]
async fn slack_errors_surface_as_notify_failures() -> TestResult {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/hooks/build");
        then.status(404);
    });

    let notifier = SlackNotifier::new(&server.url("/hooks/build"))?;
    let err = notifier
        .send(&Notification::Failed {
            message: "boom".into(),
        })
        .await
        .expect_err("webhook missing");
    assert!(matches!(err, CoreError::Notify { channel: "slack", .. }));
    Ok(())
}
