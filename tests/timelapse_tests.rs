// Timelapse scheduler: tick cadence, skip-on-busy, stop semantics.
// Stub capture commands and millisecond intervals keep these hermetic;
// second-granularity validation lives at the HTTP layer.

use picontrol::camera::{CameraKind, CameraLock, CameraService};
use picontrol::config::CameraConfig;
use picontrol::error::ApiError;
use picontrol::timelapse::{JobState, TimelapseScheduler};
use std::sync::Arc;
use tokio::time::{Duration, sleep};

fn scheduler(
    still: &[&str],
    dir: &tempfile::TempDir,
) -> (TimelapseScheduler, Arc<CameraLock>) {
    let lock = CameraLock::new();
    let config = CameraConfig {
        still_command: still.iter().map(|s| s.to_string()).collect(),
        stream_command: vec!["cat".into(), "/dev/null".into()],
        capture_timeout_secs: 5,
    };
    let camera = Arc::new(CameraService::new(
        lock.clone(),
        &config,
        dir.path().join("photos"),
    ));
    (
        TimelapseScheduler::new(camera, dir.path().join("frames")),
        lock,
    )
}

async fn wait_for_idle(scheduler: &TimelapseScheduler, max: Duration) {
    let deadline = tokio::time::Instant::now() + max;
    while scheduler.status().state != JobState::Idle {
        assert!(
            tokio::time::Instant::now() < deadline,
            "scheduler did not reach Idle within {max:?}"
        );
        sleep(Duration::from_millis(25)).await;
    }
}

#[tokio::test]
async fn rejects_zero_interval_before_any_state_changes() {
    let dir = tempfile::TempDir::new().unwrap();
    let (scheduler, _lock) = scheduler(&["true"], &dir);

    let err = scheduler
        .start(Duration::ZERO, Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidRequest(_)));
    assert_eq!(scheduler.status().state, JobState::Idle);
    assert_eq!(scheduler.status().frame_count, 0);
}

#[tokio::test]
async fn captures_one_frame_per_tick_until_duration_elapses() {
    let dir = tempfile::TempDir::new().unwrap();
    let (scheduler, _lock) = scheduler(&["sh", "-c", "printf x > {output}"], &dir);

    // Ticks at ~0ms, 200ms, 400ms; the tick ending past 600ms stops the
    // job instead of capturing a fourth frame.
    scheduler
        .start(Duration::from_millis(200), Duration::from_millis(600))
        .await
        .unwrap();
    assert_eq!(scheduler.status().state, JobState::Running);

    wait_for_idle(&scheduler, Duration::from_secs(3)).await;
    let status = scheduler.status();
    assert_eq!(status.frame_count, 3);
    assert_eq!(
        status.frames,
        vec!["frame_00001.jpg", "frame_00002.jpg", "frame_00003.jpg"]
    );
    for name in &status.frames {
        assert!(dir.path().join("frames").join(name).exists());
    }
}

#[tokio::test]
async fn second_start_is_rejected_while_running() {
    let dir = tempfile::TempDir::new().unwrap();
    let (scheduler, _lock) = scheduler(&["sh", "-c", "printf x > {output}"], &dir);

    scheduler
        .start(Duration::from_secs(1), Duration::from_secs(30))
        .await
        .unwrap();
    let err = scheduler
        .start(Duration::from_secs(1), Duration::from_secs(30))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Busy(_)));

    scheduler.stop();
    wait_for_idle(&scheduler, Duration::from_secs(3)).await;
}

#[tokio::test]
async fn ticks_skip_silently_while_a_stream_holds_the_camera() {
    let dir = tempfile::TempDir::new().unwrap();
    let (scheduler, lock) = scheduler(&["sh", "-c", "printf x > {output}"], &dir);

    // Ticks every 300ms for 2100ms: seq 1..=7.
    scheduler
        .start(Duration::from_millis(300), Duration::from_millis(2100))
        .await
        .unwrap();

    // Let the first few ticks capture, then hold the camera as a stream.
    sleep(Duration::from_millis(750)).await;
    let stream_lease = lock.try_acquire(CameraKind::Stream).unwrap();
    sleep(Duration::from_millis(100)).await;
    let before = scheduler.status();
    assert_eq!(before.state, JobState::Running, "skipping must not stop the job");
    assert!(before.frame_count >= 2);

    // Ticks during the hold are skipped: the count must not move.
    sleep(Duration::from_millis(700)).await;
    let during = scheduler.status();
    assert_eq!(during.state, JobState::Running);
    assert_eq!(during.frame_count, before.frame_count);

    drop(stream_lease);
    wait_for_idle(&scheduler, Duration::from_secs(4)).await;

    let status = scheduler.status();
    assert!(
        status.frame_count > during.frame_count,
        "capturing must resume after the stream ends"
    );
    // Frame names follow the tick sequence: strictly increasing, skipped
    // ticks leave gaps that are never reused.
    let seqs: Vec<u64> = status
        .frames
        .iter()
        .map(|name| {
            name.trim_start_matches("frame_")
                .trim_end_matches(".jpg")
                .parse()
                .unwrap()
        })
        .collect();
    assert!(seqs.windows(2).all(|w| w[0] < w[1]), "sequences: {seqs:?}");
}

#[tokio::test]
async fn stop_lets_the_in_flight_tick_finish() {
    let dir = tempfile::TempDir::new().unwrap();
    // The first capture takes ~500ms.
    let (scheduler, _lock) = scheduler(&["sh", "-c", "sleep 0.5 && printf x > {output}"], &dir);

    scheduler
        .start(Duration::from_millis(200), Duration::from_secs(30))
        .await
        .unwrap();
    sleep(Duration::from_millis(150)).await;

    // First tick's capture is in flight now.
    scheduler.stop();
    let status = scheduler.status();
    assert!(
        matches!(status.state, JobState::Stopping | JobState::Idle),
        "state after stop: {:?}",
        status.state
    );

    wait_for_idle(&scheduler, Duration::from_secs(3)).await;
    let status = scheduler.status();
    assert_eq!(status.frame_count, 1, "the in-flight tick must finish");
    assert_eq!(status.frames, vec!["frame_00001.jpg"]);
    assert!(dir.path().join("frames").join("frame_00001.jpg").exists());
}

#[tokio::test]
async fn stop_is_idempotent_and_keeps_frames() {
    let dir = tempfile::TempDir::new().unwrap();
    let (scheduler, _lock) = scheduler(&["sh", "-c", "printf x > {output}"], &dir);

    scheduler
        .start(Duration::from_millis(100), Duration::from_secs(30))
        .await
        .unwrap();
    sleep(Duration::from_millis(250)).await;
    scheduler.stop();
    scheduler.stop();
    wait_for_idle(&scheduler, Duration::from_secs(3)).await;

    let status = scheduler.status();
    assert!(status.frame_count >= 1);
    for name in &status.frames {
        assert!(dir.path().join("frames").join(name).exists());
    }

    // Stopping an idle job is a no-op.
    scheduler.stop();
    assert_eq!(scheduler.status().state, JobState::Idle);
}

#[tokio::test]
async fn clear_removes_frames_only_while_idle() {
    let dir = tempfile::TempDir::new().unwrap();
    let (scheduler, _lock) = scheduler(&["sh", "-c", "printf x > {output}"], &dir);

    scheduler
        .start(Duration::from_millis(100), Duration::from_millis(300))
        .await
        .unwrap();
    let err = scheduler.clear().await.unwrap_err();
    assert!(matches!(err, ApiError::Busy(_)));

    wait_for_idle(&scheduler, Duration::from_secs(3)).await;
    let captured = scheduler.status().frame_count;
    assert!(captured >= 1);

    let removed = scheduler.clear().await.unwrap();
    assert_eq!(removed, captured);
    assert_eq!(scheduler.status().frame_count, 0);
    assert!(scheduler.status().frames.is_empty());

    // Clearing an empty directory is fine.
    assert_eq!(scheduler.clear().await.unwrap(), 0);
}
