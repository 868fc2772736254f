use std::time::{Duration, Instant};

use vpn_dash::executor::{execute, CommandRunner, Invocation, SystemRunner, TIMED_OUT_MESSAGE};

#[tokio::test]
async fn captures_stdout_and_exit_code() {
    let res = execute(&Invocation::argv(["echo", "active"]), Duration::from_secs(5)).await;
    assert!(res.succeeded);
    assert_eq!(res.exit_code, 0);
    assert_eq!(res.stdout, "active\n");
}

#[tokio::test]
async fn nonzero_exit_is_not_success() {
    let res = execute(&Invocation::shell("echo oops >&2; exit 3"), Duration::from_secs(5)).await;
    assert!(!res.succeeded);
    assert_eq!(res.exit_code, 3);
    assert_eq!(res.stderr, "oops\n");
}

#[tokio::test]
async fn missing_binary_is_spawn_failure() {
    let res = execute(
        &Invocation::argv(["definitely-not-a-real-binary-vpn-dash"]),
        Duration::from_secs(5),
    )
    .await;
    assert!(!res.succeeded);
    assert_eq!(res.exit_code, -1);
    assert!(!res.stderr.is_empty());
}

#[tokio::test]
async fn argv_timeout_kills_child() {
    let start = Instant::now();
    let res = execute(&Invocation::argv(["sleep", "10"]), Duration::from_millis(200)).await;
    assert!(start.elapsed() < Duration::from_secs(3));
    assert!(!res.succeeded);
    assert_eq!(res.exit_code, -1);
    assert_eq!(res.stderr, TIMED_OUT_MESSAGE);
}

#[tokio::test]
async fn shell_timeout_kills_whole_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("survived");
    let script = format!("(sleep 1; touch {}) & wait", marker.display());

    let start = Instant::now();
    let res = execute(&Invocation::shell(script), Duration::from_millis(200)).await;
    assert!(start.elapsed() < Duration::from_secs(3));
    assert_eq!(res.stderr, TIMED_OUT_MESSAGE);

    // The background subshell would create the marker if only `sh` had been killed.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!marker.exists());
}

#[tokio::test]
async fn system_runner_applies_its_timeout() {
    let runner = SystemRunner::new(Duration::from_millis(100));
    let res = runner.run(&Invocation::argv(["sleep", "5"])).await;
    assert_eq!(res.stderr, TIMED_OUT_MESSAGE);
}
