#![cfg(unix)]

use ball_ide_lib::error::RunError;
use ball_ide_lib::services::process::is_alive;
use ball_ide_lib::services::RunLauncher;
use std::time::{Duration, Instant};

#[test]
fn timed_out_run_leaves_no_process_behind() {
    let dir = tempfile::tempdir().unwrap();
    let pidfile = dir.path().join("pid");
    let script = dir.path().join("slow.sh");
    std::fs::write(
        &script,
        format!("echo $$ > '{}'\nsleep 30\n", pidfile.display()),
    )
    .unwrap();

    let launcher = RunLauncher::new("sh", Duration::from_millis(500));
    let started = Instant::now();
    let result = launcher.run(&script);

    assert!(matches!(result, Err(RunError::TimedOut { .. })));
    assert!(started.elapsed() < Duration::from_secs(10));

    let pid: u32 = std::fs::read_to_string(&pidfile).unwrap().trim().parse().unwrap();
    assert!(!is_alive(pid));
}

#[test]
fn run_does_not_read_terminal_input() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("reader.sh");
    std::fs::write(&script, "if read line; then echo \"read:$line\"; else echo eof; fi\n").unwrap();

    let result = RunLauncher::new("sh", Duration::from_secs(5)).run(&script).unwrap();
    assert_eq!(result.stdout, "eof\n");
    assert!(result.success());
}

/// Dead or a zombie waiting on its new parent
fn gone(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => stat
            .rsplit_once(')')
            .map_or(false, |(_, rest)| rest.trim_start().starts_with('Z')),
        Err(_) => true,
    }
}

#[cfg(target_os = "linux")]
#[test]
fn background_job_is_killed_when_script_exits() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("bg.sh");
    std::fs::write(&script, "sleep 30 &\necho $!\nexit 0\n").unwrap();

    let started = Instant::now();
    let result = RunLauncher::new("sh", Duration::from_secs(20)).run(&script).unwrap();
    assert!(result.success());
    assert!(started.elapsed() < Duration::from_secs(10));

    let pid: u32 = result.stdout.trim().parse().unwrap();
    let deadline = Instant::now() + Duration::from_secs(5);
    while !gone(pid) {
        assert!(Instant::now() < deadline, "background job {} survived", pid);
        std::thread::sleep(Duration::from_millis(20));
    }
}
