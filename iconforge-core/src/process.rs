//! Bounded external process execution. No retries.

use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
}

/// Run `command` to completion, killing it once `timeout` elapses.
/// Stdin and stderr are discarded.
pub fn run_with_timeout(command: &mut Command, timeout: Duration) -> io::Result<ProcessOutput> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "stdout not captured"))?;
    let reader = thread::spawn(move || {
        let mut buf = String::new();
        stdout.read_to_string(&mut buf).map(|_| buf)
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(io::Error::new(io::ErrorKind::TimedOut, "process timed out"));
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = reader
        .join()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "output reader panicked"))??;

    Ok(ProcessOutput { status, stdout })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_captures_stdout() {
        let out = run_with_timeout(Command::new("sh").args(["-c", "echo hello"]), Duration::from_secs(5)).unwrap();
        assert!(out.status.success());
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[test]
    fn test_times_out() {
        let err = run_with_timeout(Command::new("sh").args(["-c", "sleep 5"]), Duration::from_millis(100)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn test_missing_program() {
        assert!(run_with_timeout(&mut Command::new("definitely-not-a-real-binary"), Duration::from_secs(1)).is_err());
    }
}
