// src/exec/task_runner.rs

//! Individual script process runner.

use std::collections::VecDeque;
use std::process::Stdio;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::engine::ExecutionResult;
use crate::exec::ScriptRequest;

/// Number of trailing stderr lines kept as the diagnostic of a failed run.
const STDERR_TAIL: usize = 20;

/// Run a single command, forwarding its output, and turn every failure
/// (spawn error, non-zero exit, signal) into an `ExecutionResult`.
pub async fn run_script_process(request: &ScriptRequest, forward_output: bool) -> ExecutionResult {
    let started = Instant::now();

    match run_script_inner(request, forward_output).await {
        Ok((code, stderr_tail)) => {
            let duration = started.elapsed();
            if code == 0 {
                ExecutionResult::success(&request.unit, duration)
            } else {
                let diagnostic = if stderr_tail.is_empty() {
                    None
                } else {
                    Some(stderr_tail.into_iter().collect::<Vec<_>>().join("\n"))
                };
                ExecutionResult::failed(&request.unit, code, diagnostic, duration)
            }
        }
        Err(err) => {
            error!(
                unit = %request.unit,
                error = %err,
                "script execution error"
            );
            ExecutionResult::failed(
                &request.unit,
                -1,
                Some(format!("{err:#}")),
                started.elapsed(),
            )
        }
    }
}

async fn run_script_inner(
    request: &ScriptRequest,
    forward_output: bool,
) -> Result<(i32, VecDeque<String>)> {
    info!(
        unit = %request.unit,
        cwd = ?request.cwd,
        cmd = %request.command,
        "starting script process"
    );

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&request.command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&request.command);
        c
    };

    cmd.current_dir(&request.cwd)
        .envs(&request.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning '{}' for unit '{}'", request.command, request.unit))?;

    let stdout_task = child
        .stdout
        .take()
        .map(|out| forward_lines(out, request.label.clone(), Stream::Stdout, forward_output));
    let stderr_task = child
        .stderr
        .take()
        .map(|err| forward_lines(err, request.label.clone(), Stream::Stderr, forward_output));

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for '{}' in unit '{}'", request.command, request.unit))?;

    // Drain the readers so no output is lost after exit.
    if let Some(task) = stdout_task {
        let _ = task.await;
    }
    let stderr_tail = match stderr_task {
        Some(task) => task.await.unwrap_or_default(),
        None => VecDeque::new(),
    };

    let code = status.code().unwrap_or(-1);
    info!(
        unit = %request.unit,
        exit_code = code,
        success = status.success(),
        "script process exited"
    );

    Ok((code, stderr_tail))
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Forward every line of `reader` with the unit prefix and keep the last
/// few lines for diagnostics.
///
/// Lines are read as raw bytes and decoded lossily; the pipe is drained to
/// EOF so the child never sees it closed early.
fn forward_lines<R>(
    reader: R,
    prefix: String,
    stream: Stream,
    forward: bool,
) -> JoinHandle<VecDeque<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut segments = BufReader::new(reader).split(b'\n');
        let mut tail = VecDeque::with_capacity(STDERR_TAIL);

        loop {
            let raw = match segments.next_segment().await {
                Ok(Some(raw)) => raw,
                Ok(None) => break,
                Err(err) => {
                    warn!(unit = %prefix, ?stream, error = %err, "reading process output failed");
                    break;
                }
            };
            let text = String::from_utf8_lossy(&raw);
            let line = text.strip_suffix('\r').unwrap_or(&text);

            match (forward, stream) {
                (true, Stream::Stdout) => println!("{prefix} | {line}"),
                (true, Stream::Stderr) => eprintln!("{prefix} | {line}"),
                (false, _) => debug!(unit = %prefix, ?stream, "{}", line),
            }

            if tail.len() == STDERR_TAIL {
                tail.pop_front();
            }
            tail.push_back(line.to_string());
        }

        tail
    })
}
