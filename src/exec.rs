//! Subprocess execution with logging and a hard timeout.
//!
//! Every external process the installer spawns (`git`, and `gh` for the
//! delegated PR path) goes through [`run`]. There is no shell interpolation
//! anywhere: callers build a `Command` with argv only, and `run` attaches
//! logging, a process-group detachment so the whole subtree can be killed,
//! and a hard wall-clock timeout.

use std::os::unix::process::CommandExt;
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

use wait_timeout::ChildExt;

#[derive(Debug)]
pub enum ExecError {
    Spawn(std::io::Error),
    Timeout { command: String, seconds: u64 },
}

impl std::fmt::Display for ExecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecError::Spawn(e) => write!(f, "failed to spawn process: {e}"),
            ExecError::Timeout { command, seconds } => {
                write!(f, "{command} timed out after {seconds}s")
            }
        }
    }
}

impl std::error::Error for ExecError {}

/// Run `cmd` to completion, killing its entire process group if it does not
/// exit within `timeout`. `context` is attached to the debug trace line for
/// correlating concurrent invocations in logs.
pub fn run(cmd: &mut Command, timeout: Duration, context: Option<&str>) -> Result<Output, ExecError> {
    let program = cmd.get_program().to_string_lossy().to_string();
    let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().to_string()).collect();
    let cmd_str = if args.is_empty() {
        program
    } else {
        format!("{program} {}", args.join(" "))
    };

    match context {
        Some(ctx) => log::debug!("$ {cmd_str} [{ctx}]"),
        None => log::debug!("$ {cmd_str}"),
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // New process group so a timeout kill takes any children with it,
        // and so the subprocess cannot forward a terminal prompt.
        .process_group(0);

    let t0 = Instant::now();
    let mut child = cmd.spawn().map_err(ExecError::Spawn)?;

    let status = match child.wait_timeout(timeout).map_err(ExecError::Spawn)? {
        Some(status) => status,
        None => {
            kill_process_group(&child);
            let _ = child.wait();
            let duration_ms = t0.elapsed().as_secs_f64() * 1000.0;
            log::debug!(
                "[exec-trace] cmd=\"{cmd_str}\" dur={duration_ms:.1}ms ok=false timeout=true"
            );
            return Err(ExecError::Timeout {
                command: cmd_str,
                seconds: timeout.as_secs(),
            });
        }
    };

    use std::io::Read;
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    if let Some(mut out) = child.stdout.take() {
        let _ = out.read_to_end(&mut stdout);
    }
    if let Some(mut err) = child.stderr.take() {
        let _ = err.read_to_end(&mut stderr);
    }

    let duration_ms = t0.elapsed().as_secs_f64() * 1000.0;
    log::debug!(
        "[exec-trace] cmd=\"{cmd_str}\" dur={duration_ms:.1}ms ok={}",
        status.success()
    );

    Ok(Output { status, stdout, stderr })
}

fn kill_process_group(child: &std::process::Child) {
    let pid = nix::unistd::Pid::from_raw(child.id() as i32);
    let _ = nix::sys::signal::killpg(pid, nix::sys::signal::Signal::SIGKILL);
}
