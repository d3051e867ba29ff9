mod common;

use std::sync::Mutex;

use common::{codes, FakeLauncher, Scripted};
use ean_report::config::MAX_PARALLEL_SESSIONS_CAP;
use ean_report::error::{AppError, InputError};
use ean_report::orchestrator::{AcquisitionConfig, AcquisitionOrchestrator, AcquisitionStatus, StopSignal};
use ean_report::progress::NoProgress;
use ean_report::workflow::SessionState;
use tokio_test::assert_ok;

fn orchestrator(launcher: FakeLauncher, parallel: usize) -> AcquisitionOrchestrator<FakeLauncher> {
    AcquisitionOrchestrator::new(
        AcquisitionConfig {
            max_parallel_sessions: parallel,
        },
        launcher,
    )
}

#[tokio::test]
async fn test_empty_code_list_launches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(FakeLauncher::new(dir.path()), 1);

    let err = orch
        .acquire(&[], 10, &StopSignal::new(), &NoProgress)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Input(InputError::NoCodes)));
}

#[tokio::test]
async fn test_failed_batch_does_not_stop_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::new(dir.path()).with(2, Scripted::Timeout);
    let orch = orchestrator(launcher, 1);

    let report = assert_ok!(orch.acquire(&codes(6), 2, &StopSignal::new(), &NoProgress).await);

    assert_eq!(report.status, AcquisitionStatus::Completed);
    assert_eq!(report.files.len(), 2);
    assert!(report.files.iter().all(|f| f.batch_index != 2));
    assert_eq!(report.failed_batches.len(), 1);
    assert_eq!(report.failed_batches[0].batch_index, 2);
    assert_eq!(report.failed_batches[0].state, SessionState::ExportClicked);
    assert_eq!(report.codes_covered, 6);
    assert!(report.duplicates.is_empty());
}

#[tokio::test]
async fn test_every_batch_failing_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::new(dir.path())
        .with(1, Scripted::Timeout)
        .with(2, Scripted::Timeout)
        .with(3, Scripted::Timeout);
    let orch = orchestrator(launcher, 1);

    let err = orch
        .acquire(&codes(5), 2, &StopSignal::new(), &NoProgress)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::AllBatchesFailed { attempted: 3 }));
}

#[tokio::test]
async fn test_stop_signal_cancels_remaining_batches() {
    let dir = tempfile::tempdir().unwrap();
    let stop = StopSignal::new();
    let launcher = FakeLauncher::new(dir.path()).stop_during(2, stop.clone());
    let orch = orchestrator(launcher, 1);

    let report = assert_ok!(orch.acquire(&codes(10), 2, &stop, &NoProgress).await);

    assert_eq!(report.files.len(), 2);
    assert_eq!(
        report.status,
        AcquisitionStatus::Cancelled {
            completed_batches: 2,
            total_batches: 5
        }
    );
    assert_eq!(report.codes_covered, 4);
}

#[tokio::test]
async fn test_cancelled_run_without_files_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let stop = StopSignal::new();
    let launcher = FakeLauncher::new(dir.path())
        .with(1, Scripted::Timeout)
        .stop_during(1, stop.clone());
    let orch = orchestrator(launcher, 1);

    let report = assert_ok!(orch.acquire(&codes(4), 2, &stop, &NoProgress).await);

    assert!(report.is_cancelled());
    assert!(report.files.is_empty());
    assert_eq!(report.failed_batches.len(), 1);
}

#[tokio::test]
async fn test_identical_downloads_are_reported_once() {
    let dir = tempfile::tempdir().unwrap();
    let same = b"identical report".to_vec();
    let launcher = FakeLauncher::new(dir.path())
        .with(1, Scripted::Content(same.clone()))
        .with(3, Scripted::Content(same));
    let orch = orchestrator(launcher, 1);

    let report = assert_ok!(orch.acquire(&codes(6), 2, &StopSignal::new(), &NoProgress).await);

    assert_eq!(report.files.len(), 3);
    assert_eq!(report.duplicates.len(), 1);
    assert_eq!(report.duplicates[0].first, report.files[0].path);
    assert_eq!(report.duplicates[0].duplicate, report.files[2].path);
}

#[tokio::test]
async fn test_progress_counts_failed_batches_as_covered() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::new(dir.path()).with(2, Scripted::Timeout);
    let orch = orchestrator(launcher, 1);

    let seen = Mutex::new(Vec::new());
    let sink = |covered: usize, total: usize| seen.lock().unwrap().push((covered, total));
    assert_ok!(orch.acquire(&codes(5), 2, &StopSignal::new(), &sink).await);

    assert_eq!(*seen.lock().unwrap(), vec![(2, 5), (4, 5), (5, 5)]);
}

#[tokio::test]
async fn test_vanished_file_is_dropped_from_report() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::new(dir.path()).with(1, Scripted::Vanished);
    let orch = orchestrator(launcher, 1);

    let report = assert_ok!(orch.acquire(&codes(4), 2, &StopSignal::new(), &NoProgress).await);

    assert_eq!(report.files.len(), 1);
    assert_eq!(report.files[0].batch_index, 2);
}

#[tokio::test]
async fn test_parallel_windows_keep_batch_order() {
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(FakeLauncher::new(dir.path()), 2);

    let report = assert_ok!(orch.acquire(&codes(9), 2, &StopSignal::new(), &NoProgress).await);

    let order: Vec<usize> = report.files.iter().map(|f| f.batch_index).collect();
    assert_eq!(order, vec![1, 2, 3, 4, 5]);
    assert_eq!(report.codes_covered, 9);
}

#[tokio::test]
async fn test_parallel_stop_is_checked_between_windows() {
    let dir = tempfile::tempdir().unwrap();
    let stop = StopSignal::new();
    let launcher = FakeLauncher::new(dir.path()).stop_during(1, stop.clone());
    let orch = orchestrator(launcher, 2);

    let report = assert_ok!(orch.acquire(&codes(10), 2, &stop, &NoProgress).await);

    // 同一窗口内的批次 2 已经启动，会正常完成
    assert_eq!(report.files.len(), 2);
    assert_eq!(
        report.status,
        AcquisitionStatus::Cancelled {
            completed_batches: 2,
            total_batches: 5
        }
    );
}

#[tokio::test]
async fn test_parallelism_is_capped() {
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(FakeLauncher::new(dir.path()), 64);

    let report = assert_ok!(orch.acquire(&codes(10), 1, &StopSignal::new(), &NoProgress).await);
    assert_eq!(report.files.len(), 10);
    assert_eq!(orch.launcher().peak_in_flight(), MAX_PARALLEL_SESSIONS_CAP);
}

#[tokio::test]
async fn test_sequential_mode_runs_one_session_at_a_time() {
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(FakeLauncher::new(dir.path()), 1);

    let report = assert_ok!(orch.acquire(&codes(3), 1, &StopSignal::new(), &NoProgress).await);
    assert_eq!(report.files.len(), 3);
    assert_eq!(orch.launcher().peak_in_flight(), 1);
}
