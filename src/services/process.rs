/// Process helpers
/// Children run in their own process group so a kill takes out anything
/// the script started too.

use std::io;
use std::process::{Child, Command, ExitStatus};

/// Put the child in a fresh process group (Unix only)
pub fn isolate_group(command: &mut Command) {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    #[cfg(not(unix))]
    {
        let _ = command;
    }
}

/// Kill the child and its process group, then reap it.
/// No request-to-exit first: the debugger has no reliable quit command.
pub fn kill_and_reap(child: &mut Child) -> io::Result<ExitStatus> {
    kill_group(child.id());

    // Already dead is fine here, the group kill may have won
    let _ = child.kill();

    // Wait for child to prevent zombies
    child.wait()
}

/// SIGKILL whatever is left in the group led by `pgid`
pub fn kill_group(pgid: u32) {
    #[cfg(unix)]
    {
        if pgid > 0 {
            unsafe {
                libc::kill(-(pgid as i32), libc::SIGKILL);
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = pgid;
    }
}

/// Whether the child has exited, leaving it unreaped. An unreaped leader
/// keeps its pid, so its group id cannot be handed to anyone else yet.
#[cfg(target_os = "linux")]
pub fn exited_unreaped(child: &mut Child) -> io::Result<bool> {
    let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
    let rc = unsafe {
        libc::waitid(
            libc::P_PID,
            child.id() as libc::id_t,
            &mut info,
            libc::WEXITED | libc::WNOWAIT | libc::WNOHANG,
        )
    };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    // si_pid stays zero when nothing has changed yet
    Ok(unsafe { info.si_pid() } != 0)
}

/// Elsewhere this reaps, so the group kill in `try_finish` can race with
/// pid reuse. Accepted: the window is one poll interval on an exited group.
#[cfg(not(target_os = "linux"))]
pub fn exited_unreaped(child: &mut Child) -> io::Result<bool> {
    Ok(child.try_wait()?.is_some())
}

/// Non-blocking exit check. Once the child has exited, whatever it left in
/// its group is killed before the child is reaped.
pub fn try_finish(child: &mut Child) -> io::Result<Option<ExitStatus>> {
    if !exited_unreaped(child)? {
        return Ok(None);
    }
    kill_group(child.id());
    child.wait().map(Some)
}

/// Whether a pid still names a process we could signal
#[cfg(unix)]
pub fn is_alive(pid: u32) -> bool {
    unsafe { libc::kill(pid as i32, 0) == 0 }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Stdio;

    #[test]
    fn kill_and_reap_leaves_no_process() {
        let mut command = Command::new("sh");
        command.arg("-c").arg("sleep 30").stdout(Stdio::null());
        isolate_group(&mut command);
        let mut child = command.spawn().unwrap();
        let pid = child.id();

        assert!(is_alive(pid));
        let status = kill_and_reap(&mut child).unwrap();
        assert!(!status.success());
        assert!(!is_alive(pid));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn exited_child_stays_unreaped_until_finished() {
        let mut child = Command::new("true").spawn().unwrap();
        let pid = child.id();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        while !exited_unreaped(&mut child).unwrap() {
            assert!(std::time::Instant::now() < deadline);
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        // still a zombie holding its pid
        assert!(std::path::Path::new(&format!("/proc/{}", pid)).exists());
        assert!(exited_unreaped(&mut child).unwrap());

        let status = try_finish(&mut child).unwrap().unwrap();
        assert!(status.success());
    }

    #[test]
    fn try_finish_waits_for_exit() {
        let mut command = Command::new("sh");
        command.arg("-c").arg("sleep 30").stdout(Stdio::null());
        isolate_group(&mut command);
        let mut child = command.spawn().unwrap();

        assert!(try_finish(&mut child).unwrap().is_none());
        kill_and_reap(&mut child).unwrap();
    }
}
