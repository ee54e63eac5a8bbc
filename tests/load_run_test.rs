//! End-to-end load runs against shell scripts posing as load generators

#![cfg(unix)]

mod common;

use common::{grinder_row, RunDir, GRINDER_HEADER};
use loadgen_harness::config::GRINDER_RESULT_LOG;
use loadgen_harness::error::ErrorCode;
use loadgen_harness::results::{ChannelSink, MemorySink};
use loadgen_harness::subprocess::LaunchError;
use loadgen_harness::{HarnessConfig, HarnessError, LoadRun};
use std::fs;
use std::time::Duration;

async fn load_run(dir: &RunDir, body: &str, extra: &str) -> LoadRun {
    let exe = dir.script("loadgen.sh", body);
    let config = HarnessConfig::load(&dir.config(&exe, extra)).await.unwrap();
    LoadRun::from_config(&config).unwrap()
}

fn write_log(rows: &[String]) -> String {
    let mut script = format!("echo '{}' > {}\n", GRINDER_HEADER, GRINDER_RESULT_LOG);
    for row in rows {
        script.push_str(&format!("echo '{}' >> {}\n", row, GRINDER_RESULT_LOG));
    }
    script
}

#[tokio::test]
async fn test_samples_stream_while_tool_runs() {
    let dir = RunDir::new();
    let body = format!(
        "{}sleep 1\necho '{}' >> {}\n",
        write_log(&[grinder_row(1_700_000_000_000, 120, 0, "200")]),
        grinder_row(1_700_000_001_000, 80, 0, "200"),
        GRINDER_RESULT_LOG
    );
    let mut run = load_run(&dir, &body, "").await;
    let (sink, mut receiver) = ChannelSink::channel();
    run.register_sink(sink).unwrap();
    run.startup().unwrap();

    let mut first = None;
    for _ in 0..100 {
        assert!(!run.tick().await.unwrap(), "tool finished before first sample");
        if let Ok(sample) = receiver.try_recv() {
            first = Some(sample);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let first = first.expect("no sample while tool was running");
    assert_eq!(first.timestamp, 1_700_000_000.0);
    assert_eq!(first.response_time, 0.12);
    assert_eq!(first.latency, 0.06);
    assert_eq!(first.connect_time, 0.005);
    assert_eq!(first.response_code, "200");
    assert!(first.error.is_none());

    let mut finished = false;
    for _ in 0..200 {
        if run.tick().await.unwrap() {
            finished = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(finished);

    let report = run.finish().await;
    assert_eq!(report.samples, 2);
    let second = receiver.recv().await.unwrap();
    assert_eq!(second.timestamp, 1_700_000_001.0);
}

#[tokio::test]
async fn test_non_zero_exit_is_process_failure_even_with_results() {
    let dir = RunDir::new();
    let body = format!(
        "{}exit 3",
        write_log(&[grinder_row(1_000, 250, 0, "200")])
    );
    let mut run = load_run(&dir, &body, "").await;
    let sink = MemorySink::new();
    run.register_sink(sink.clone()).unwrap();

    let err = run.run_to_completion().await.unwrap_err();

    assert!(matches!(err, HarnessError::ProcessFailure { exit_code: 3 }));
    assert_eq!(err.exit_code(), 4);
    // Whatever was logged before the failure is still delivered
    assert_eq!(sink.len(), 1);
}

#[tokio::test]
async fn test_clean_exit_with_empty_log_is_empty_results() {
    let dir = RunDir::new();
    let body = format!(": > {}\nexit 0", GRINDER_RESULT_LOG);
    let mut run = load_run(&dir, &body, "").await;

    let err = run.run_to_completion().await.unwrap_err();

    match err {
        HarnessError::EmptyResults { path } => {
            assert_eq!(path, dir.join(GRINDER_RESULT_LOG));
        }
        other => panic!("expected EmptyResults, got {:?}", other),
    }
}

#[tokio::test]
async fn test_clean_exit_without_log_is_empty_results() {
    let dir = RunDir::new();
    let mut run = load_run(&dir, "exit 0", "").await;

    let err = run.run_to_completion().await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::RESULTS_EMPTY);
    assert!(err.is_run_failure());
}

#[tokio::test]
async fn test_missing_executable_is_launch_error() {
    let dir = RunDir::new();
    let config = HarnessConfig::load(&dir.config(&dir.join("not-there.sh"), ""))
        .await
        .unwrap();
    let mut run = LoadRun::from_config(&config).unwrap();

    let err = run.run_to_completion().await.unwrap_err();

    assert!(matches!(
        err,
        HarnessError::Launch(LaunchError::ExecutableNotFound(_))
    ));
    assert_eq!(err.exit_code(), 3);
    assert!(run.supervisor().handle().is_none());
}

#[tokio::test]
async fn test_line_split_across_writes_is_reassembled() {
    let dir = RunDir::new();
    let row = grinder_row(5_000, 40, 1, "503");
    let (head, tail) = row.split_at(row.len() / 2);
    let body = format!(
        "echo '{}' > {log}\nprintf '%s' '{}' >> {log}\nsleep 0.3\necho '{}' >> {log}\nsleep 0.3",
        GRINDER_HEADER,
        head,
        tail,
        log = GRINDER_RESULT_LOG
    );
    let mut run = load_run(&dir, &body, "").await;
    let sink = MemorySink::new();
    run.register_sink(sink.clone()).unwrap();

    let report = run.run_to_completion().await.unwrap();

    assert_eq!(report.samples, 1);
    assert_eq!(report.lines_skipped, 0);
    let sample = &sink.samples()[0];
    assert_eq!(sample.timestamp, 5.0);
    assert_eq!(sample.response_code, "503");
    assert!(sample.is_error());
}

#[tokio::test]
async fn test_malformed_lines_do_not_stop_the_run() {
    let dir = RunDir::new();
    let body = write_log(&[
        grinder_row(1_000, 10, 0, "200"),
        "garbage line".to_string(),
        grinder_row(2_000, 20, 0, "200"),
    ]);
    let mut run = load_run(&dir, &body, "").await;
    let sink = MemorySink::new();
    run.register_sink(sink.clone()).unwrap();

    let report = run.run_to_completion().await.unwrap();

    assert_eq!(report.samples, 2);
    assert_eq!(report.lines_skipped, 1);
    let stamps: Vec<f64> = sink.samples().iter().map(|s| s.timestamp).collect();
    assert_eq!(stamps, vec![1.0, 2.0]);
}

#[tokio::test]
async fn test_report_lists_artifacts() {
    let dir = RunDir::new();
    let body = format!(
        "echo started\necho warming up >&2\n{}",
        write_log(&[grinder_row(1_000, 10, 0, "200")])
    );
    let mut run = load_run(&dir, &body, "").await;

    let report = run.run_to_completion().await.unwrap();

    assert_eq!(
        report.artifacts,
        vec![
            dir.join("loadgen-stdout.log"),
            dir.join("loadgen-stderr.log"),
            dir.join(GRINDER_RESULT_LOG),
        ]
    );
    assert_eq!(
        fs::read_to_string(dir.join("loadgen-stdout.log")).unwrap(),
        "started\n"
    );
    assert_eq!(
        fs::read_to_string(dir.join("loadgen-stderr.log")).unwrap(),
        "warming up\n"
    );
}

#[tokio::test]
async fn test_tool_ignoring_sigterm_is_killed() {
    let dir = RunDir::new();
    let mut run = load_run(&dir, "trap '' TERM\nsleep 30", "").await;
    run.startup().unwrap();
    assert!(!run.tick().await.unwrap(), "tool should still be running");

    let report = run.finish().await;

    let shutdown = report.shutdown.unwrap();
    assert_eq!(shutdown.exit_code, Some(128 + 9));
    assert!(shutdown.signals_sent >= 4);
    assert!(shutdown.elapsed < Duration::from_secs(10));
}

#[tokio::test]
async fn test_startup_timeout_from_config() {
    let dir = RunDir::new();
    let mut run = load_run(&dir, "sleep 30", "startup_timeout = \"200ms\"\n").await;

    let err = run.run_to_completion().await.unwrap_err();

    assert!(matches!(err, HarnessError::EmptyResults { .. }));
    let handle = run.supervisor().handle().unwrap();
    assert!(!handle.captures_open());
    assert_ne!(handle.exit_code(), None);
}

#[tokio::test]
async fn test_grinder_preset_launches_fixed_command() {
    let dir = RunDir::new();
    let java = dir.script(
        "java",
        &format!("echo \"$@\"\n{}", write_log(&[grinder_row(1_000, 10, 0, "200")])),
    );
    let content = format!(
        r#"[grinder]
java = "{}"
home = "/opt/grinder"
properties = "{}"

[artifacts]
dir = "{}"

[timing]
poll_interval = "20ms"
"#,
        java.display(),
        dir.join("grinder.properties").display(),
        dir.path().display()
    );
    let config = HarnessConfig::from_toml_str(&content).unwrap();
    let mut run = LoadRun::from_config(&config).unwrap();
    let sink = MemorySink::new();
    run.register_sink(sink.clone()).unwrap();

    let report = run.run_to_completion().await.unwrap();

    assert_eq!(report.samples, 1);
    let stdout = fs::read_to_string(dir.join("grinder-stdout.log")).unwrap();
    assert_eq!(
        stdout.trim(),
        format!(
            "-classpath /opt/grinder/lib/grinder.jar net.grinder.Grinder {}",
            dir.join("grinder.properties").display()
        )
    );
}

#[tokio::test]
async fn test_poll_reports_running_promptly() {
    let dir = RunDir::new();
    let mut run = load_run(&dir, "sleep 30", "").await;
    run.startup().unwrap();

    let started = std::time::Instant::now();
    assert!(!run.tick().await.unwrap());
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(run.supervisor().handle().unwrap().exit_code(), None);

    let report = run.finish().await;
    let shutdown = report.shutdown.unwrap();
    assert_eq!(shutdown.exit_code, Some(128 + 15));
    assert!(shutdown.signals_sent >= 1);
}
