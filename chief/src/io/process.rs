//! Helpers for running child processes in the two shapes chief needs.
//!
//! - *Interactive*: the child inherits the terminal; we only wait for it.
//! - *Captured*: stdout is piped, echoed line by line and collected (bounded);
//!   stdin and stderr stay inherited.

use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Captured child process output.
#[derive(Debug)]
pub struct CapturedOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stdout_truncated: usize,
    pub timed_out: bool,
}

impl CapturedOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Run a command with the caller's terminal attached and wait for it to exit.
#[instrument(skip_all)]
pub fn run_interactive(mut cmd: Command) -> Result<ExitStatus> {
    cmd.stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    debug!("spawning interactive child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };
    let status = child.wait().context("wait for command")?;
    debug!(exit_code = ?status.code(), "interactive command finished");
    Ok(status)
}

/// Run a command capturing stdout, echoing each line to `echo` as it arrives.
///
/// Output is read on a helper thread while the child runs, so a chatty child
/// can never block on a full pipe. `output_limit_bytes` bounds what is kept in
/// memory; bytes beyond it are still drained and echoed. With a `timeout`, the
/// child is killed once it elapses and `timed_out` is set.
#[instrument(skip_all, fields(timeout_secs = timeout.map(|t| t.as_secs()), output_limit_bytes))]
pub fn run_captured<W>(
    mut cmd: Command,
    timeout: Option<Duration>,
    output_limit_bytes: usize,
    echo: W,
) -> Result<CapturedOutput>
where
    W: Write + Send + 'static,
{
    cmd.stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());

    debug!("spawning captured child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let reader = thread::spawn(move || read_lines_limited_with_echo(stdout, output_limit_bytes, echo));

    let mut timed_out = false;
    let status = match timeout {
        None => child.wait().context("wait for command")?,
        Some(limit) => match child.wait_timeout(limit).context("wait for command")? {
            Some(status) => status,
            None => {
                warn!(timeout_secs = limit.as_secs(), "command timed out, killing");
                timed_out = true;
                child.kill().context("kill command")?;
                child.wait().context("wait command after kill")?
            }
        },
    };

    let (stdout, stdout_truncated) = match reader.join() {
        Ok(result) => result.context("read stdout")?,
        Err(_) => return Err(anyhow!("output reader thread panicked")),
    };

    if stdout_truncated > 0 {
        warn!(stdout_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "captured command finished");
    Ok(CapturedOutput {
        status,
        stdout,
        stdout_truncated,
        timed_out,
    })
}

fn read_lines_limited_with_echo<R: Read, W: Write>(
    reader: R,
    limit: usize,
    mut echo: W,
) -> Result<(Vec<u8>, usize)> {
    let mut buf_reader = BufReader::new(reader);
    let mut collected = Vec::new();
    let mut truncated = 0usize;

    loop {
        let mut line = Vec::new();
        let n = buf_reader
            .read_until(b'\n', &mut line)
            .context("read line")?;
        if n == 0 {
            break;
        }

        if let Err(e) = echo.write_all(&line).and_then(|()| echo.flush()) {
            warn!(err = %e, "failed to echo output line");
        }

        let remaining = limit.saturating_sub(collected.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            collected.extend_from_slice(&line[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((collected, truncated))
}
