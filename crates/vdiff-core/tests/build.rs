mod common;

use std::fs;
use std::time::Duration;

use common::{
    FakeComparator, FakeSource, RecordingNotifier, harness, recorded_events, standard_param,
    standard_source,
};
use tokio_stream::StreamExt;
use vdiff_core::{BuildParam, BuildRequest, CoreError, Notification, PathFilterInput};
use vdiff_events::Event;
use vdiff_test_support::TestResult;
use vdiff_test_support::assert::assert_close;
use vdiff_test_support::fixtures::temp_dir;

#[tokio::test]
async fn build_reports_changed_and_added_images() -> TestResult {
    let dir = temp_dir("build")?;
    let h = harness(
        dir.path(),
        standard_source(),
        FakeComparator::default().score("/changed.png", 0.01),
        RecordingNotifier::default(),
    )?;
    let param = standard_param()?;

    let report = h.service.build(&param, Some("nightly")).await?;

    assert_eq!(report.diff_count, 1);
    assert_eq!(report.new_images, ["/added.png"]);
    assert!(report.del_images.is_empty());
    assert_close(report.max_percentage, 0.01);
    assert_close(report.avg_percentage, 0.005);
    assert_eq!(report.exceeding_count, 1);
    assert_eq!(report.near_threshold_count, 0);
    assert_eq!(h.comparator.calls(), ["/changed.png", "/same.png"]);

    let location = h.service.locate(&param)?;
    assert_eq!(report.fingerprint, location.hash());
    assert!(!location.lock_marker().exists());
    assert!(!h.service.is_building(&param)?);
    assert_eq!(
        fs::read_to_string(location.diff_dir().join("changed.png"))?,
        "diff of /changed.png"
    );
    assert_eq!(h.service.load_report(&param).await?, Some(report));
    Ok(())
}

#[tokio::test]
async fn progress_is_reported_in_stage_order() -> TestResult {
    let dir = temp_dir("build")?;
    let h = harness(
        dir.path(),
        standard_source(),
        FakeComparator::default(),
        RecordingNotifier::default(),
    )?;
    h.service.build(&standard_param()?, None).await?;

    let progress: Vec<(u8, String)> = recorded_events(&h.events)
        .into_iter()
        .filter_map(|event| match event {
            Event::BuildProgress {
                percent, message, ..
            } => Some((percent, message)),
            _ => None,
        })
        .collect();
    assert_eq!(
        progress,
        vec![
            (20, "downloadExpectArtifacts".to_string()),
            (40, "downloadActualArtifacts".to_string()),
            (60, "makeDiffImages".to_string()),
            (80, "Image Diff Progress ... (1 / 2)".to_string()),
            (80, "Image Diff Progress ... (2 / 2)".to_string()),
            (100, "complete".to_string()),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn lifecycle_events_and_notification_follow_success() -> TestResult {
    let dir = temp_dir("build")?;
    let h = harness(
        dir.path(),
        standard_source(),
        FakeComparator::default().score("/changed.png", 0.002),
        RecordingNotifier::default(),
    )?;
    let param = standard_param()?;
    let report = h.service.build(&param, Some("nightly")).await?;

    let events = recorded_events(&h.events);
    assert!(matches!(events.first(), Some(Event::BuildStarted { mode, .. }) if mode == "pixel"));
    assert!(matches!(
        events.last(),
        Some(Event::BuildCompleted { diff_count: 1, fingerprint, .. }) if *fingerprint == report.fingerprint
    ));

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    let Notification::Finished {
        summary,
        report_url,
        label,
    } = &sent[0]
    else {
        panic!("expected a finished notification, got {:?}", sent[0]);
    };
    assert_eq!(summary.new_count, 1);
    assert_eq!(summary.near_threshold_count, 1);
    assert_eq!(
        report_url,
        &format!("https://vdiff.example/report/{}", report.fingerprint)
    );
    assert_eq!(label.as_deref(), Some("nightly"));

    let snapshot = h.metrics.snapshot();
    assert_eq!(snapshot.builds_succeeded, 1);
    assert_eq!(snapshot.comparisons_succeeded, 2);
    assert_eq!(snapshot.builds_in_flight, 0);
    Ok(())
}

#[tokio::test]
async fn comparison_failure_releases_the_lock_and_writes_nothing() -> TestResult {
    let dir = temp_dir("build")?;
    let h = harness(
        dir.path(),
        standard_source(),
        FakeComparator::default().fail("/changed.png"),
        RecordingNotifier::default(),
    )?;
    let param = standard_param()?;

    let err = h.service.build(&param, None).await.expect_err("build fails");
    assert!(matches!(err, CoreError::Comparison { ref path, .. } if path == "/changed.png"));

    let location = h.service.locate(&param)?;
    assert!(!location.result_file().exists());
    assert!(!location.lock_marker().exists());
    assert!(!h.service.is_building(&param)?);
    assert_eq!(h.service.load_report(&param).await?, None);

    let events = recorded_events(&h.events);
    assert!(events.iter().any(|event| matches!(
        event,
        Event::BuildFailed { message, .. } if message.contains("/changed.png")
    )));
    assert!(events.iter().any(|event| matches!(
        event,
        Event::HealthChanged { degraded } if degraded == &["builds".to_string()]
    )));
    assert!(matches!(
        h.notifier.sent().as_slice(),
        [Notification::Failed { message }] if message.starts_with("image comparison failed")
    ));
    assert_eq!(h.metrics.snapshot().builds_failed, 1);
    Ok(())
}

#[tokio::test]
async fn download_failure_is_reported_and_retry_recovers_health() -> TestResult {
    let dir = temp_dir("build")?;
    let h = harness(
        dir.path(),
        standard_source(),
        FakeComparator::default(),
        RecordingNotifier::default(),
    )?;

    let missing = BuildParam::new(BuildRequest::new("pixel", "v1", "v9"))?;
    let err = h.service.build(&missing, None).await.expect_err("missing prefix");
    assert!(matches!(err, CoreError::Download { ref prefix, .. } if prefix == "v9"));
    assert!(!h.service.is_building(&missing)?);

    h.service.build(&standard_param()?, None).await?;
    let health: Vec<Vec<String>> = recorded_events(&h.events)
        .into_iter()
        .filter_map(|event| match event {
            Event::HealthChanged { degraded } => Some(degraded),
            _ => None,
        })
        .collect();
    assert_eq!(health, vec![vec!["builds".to_string()], Vec::new()]);
    Ok(())
}

#[tokio::test]
async fn notification_failures_do_not_fail_the_build() -> TestResult {
    let dir = temp_dir("build")?;
    let h = harness(
        dir.path(),
        standard_source(),
        FakeComparator::default(),
        RecordingNotifier::failing(),
    )?;
    let report = h.service.build(&standard_param()?, None).await?;
    assert_eq!(report.diff_count, 0);
    assert_eq!(h.notifier.sent().len(), 1);
    Ok(())
}

#[tokio::test]
async fn path_filters_limit_the_compared_set() -> TestResult {
    let dir = temp_dir("build")?;
    let source = FakeSource::default()
        .with_prefix(
            "v1",
            &[("/pages/home.png", "a"), ("/pages/home.txt", "a"), ("/misc/x.png", "a")],
        )
        .with_prefix(
            "v2",
            &[("/pages/home.png", "b"), ("/pages/home.txt", "b"), ("/misc/x.png", "b")],
        );
    let h = harness(
        dir.path(),
        source,
        FakeComparator::default(),
        RecordingNotifier::default(),
    )?;
    let mut request = BuildRequest::new("pixel", "v1", "v2");
    request.path_filters = Some(PathFilterInput::Many(vec!["^/pages/".into(), "png$".into()]));
    let param = BuildParam::new(request)?;

    let report = h.service.build(&param, None).await?;
    let paths: Vec<_> = report.images.iter().map(|image| image.path.as_str()).collect();
    assert_eq!(paths, ["/pages/home.png"]);
    assert_eq!(h.comparator.calls(), ["/pages/home.png"]);
    Ok(())
}

#[tokio::test]
async fn empty_artifact_trees_build_an_empty_report() -> TestResult {
    let dir = temp_dir("build")?;
    let source = FakeSource::default()
        .with_prefix("v1", &[])
        .with_prefix("v2", &[]);
    let h = harness(
        dir.path(),
        source,
        FakeComparator::default(),
        RecordingNotifier::default(),
    )?;
    let report = h.service.build(&standard_param()?, None).await?;
    assert!(report.images.is_empty());
    assert_close(report.max_percentage, 0.0);
    assert_close(report.avg_percentage, 0.0);
    assert_eq!(report.diff_count, 0);
    Ok(())
}

#[tokio::test]
async fn concurrent_build_of_the_same_fingerprint_is_rejected() -> TestResult {
    let dir = temp_dir("build")?;
    let h = harness(
        dir.path(),
        standard_source(),
        FakeComparator::default().delay(Duration::from_millis(100)),
        RecordingNotifier::default(),
    )?;
    let param = standard_param()?;

    let (first, second) = tokio::join!(h.service.build(&param, None), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        h.service.build(&param, None).await
    });
    first?;
    assert!(matches!(second, Err(CoreError::DuplicateBuild { .. })));
    assert_eq!(h.metrics.snapshot().builds_rejected, 1);
    assert_eq!(h.source.fetches().len(), 2);
    Ok(())
}

#[tokio::test]
async fn ensure_report_waits_for_an_in_flight_build() -> TestResult {
    let dir = temp_dir("build")?;
    let h = harness(
        dir.path(),
        standard_source(),
        FakeComparator::default()
            .score("/changed.png", 0.01)
            .delay(Duration::from_millis(100)),
        RecordingNotifier::default(),
    )?;
    let param = standard_param()?;

    let (built, awaited) = tokio::join!(h.service.build(&param, None), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(h.service.is_building(&param).expect("fingerprint"));
        h.service.ensure_report(&param, None).await
    });
    let built = built?;
    assert_eq!(awaited?, built);
    assert_eq!(h.source.fetches().len(), 2);
    Ok(())
}

#[tokio::test]
async fn ensure_report_serves_cached_results_without_rebuilding() -> TestResult {
    let dir = temp_dir("build")?;
    let h = harness(
        dir.path(),
        standard_source(),
        FakeComparator::default(),
        RecordingNotifier::default(),
    )?;
    let param = standard_param()?;

    let first = h.service.ensure_report(&param, None).await?;
    let second = h.service.ensure_report(&param, None).await?;
    assert_eq!(first, second);
    assert_eq!(h.source.fetches().len(), 2);
    assert_eq!(h.notifier.sent().len(), 1);
    Ok(())
}

#[tokio::test]
async fn resource_links_point_at_the_asset_base() -> TestResult {
    let dir = temp_dir("build")?;
    let h = harness(
        dir.path(),
        standard_source(),
        FakeComparator::default(),
        RecordingNotifier::default(),
    )?;
    let param = standard_param()?;
    assert!(h.service.resource(&param).await?.is_none());

    let report = h.service.build(&param, None).await?;
    let resource = h.service.resource(&param).await?.expect("report persisted");
    let base = format!("https://vdiff.example/assets/{}", report.fingerprint);
    assert_eq!(resource.new_images[0].image_path, format!("{base}/actual/added.png"));
    assert_eq!(
        resource.images[0].diff_image_path,
        format!("{base}/diff/changed.png")
    );
    Ok(())
}

#[tokio::test]
async fn prepare_workspace_optionally_wipes_previous_builds() -> TestResult {
    let dir = temp_dir("build")?;
    let work_dir = dir.path().join("work");
    let h = harness(
        &work_dir,
        standard_source(),
        FakeComparator::default(),
        RecordingNotifier::default(),
    )?;

    h.service.prepare_workspace(false).await?;
    assert!(work_dir.is_dir());
    fs::write(work_dir.join("leftover"), "x")?;

    h.service.prepare_workspace(false).await?;
    assert!(work_dir.join("leftover").exists());

    h.service.prepare_workspace(true).await?;
    assert!(work_dir.is_dir());
    assert!(!work_dir.join("leftover").exists());
    Ok(())
}

#[tokio::test]
async fn subscribers_see_the_build_live() -> TestResult {
    let dir = temp_dir("build")?;
    let h = harness(
        dir.path(),
        standard_source(),
        FakeComparator::default(),
        RecordingNotifier::default(),
    )?;
    let mut stream = h.events.subscribe(None);
    let report = h.service.build(&standard_param()?, None).await?;

    let first = stream.next().await.expect("stream open")?;
    assert!(matches!(
        first.event,
        Event::BuildStarted { ref fingerprint, .. } if *fingerprint == report.fingerprint
    ));
    let second = stream.next().await.expect("stream open")?;
    assert!(second.id > first.id);
    assert!(matches!(second.event, Event::BuildProgress { percent: 20, .. }));
    Ok(())
}
