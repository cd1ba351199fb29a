//! Async runner for the external media tools.

use lyriclip_core::CoreError;
use std::io::ErrorKind;
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::debug;

/// Lines of stderr kept in a [`CoreError::CommandFailed`]
const STDERR_TAIL_LINES: usize = 12;

/// Run `program` to completion and return its captured output.
///
/// The child is killed if the returned future is dropped, so a stage timeout
/// in the caller also stops the tool.
///
/// # Errors
///
/// Returns [`CoreError::CommandMissing`] if the program cannot be found and
/// [`CoreError::CommandFailed`] if it exits unsuccessfully.
pub async fn run(program: &str, args: &[String]) -> Result<Output, CoreError> {
    debug!("Running {} {}", program, args.join(" "));

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => CoreError::CommandMissing {
                program: program.to_string(),
            },
            _ => CoreError::IoError(e),
        })?;

    if output.status.success() {
        return Ok(output);
    }

    Err(CoreError::CommandFailed {
        program: program.to_string(),
        status: output.status.to_string(),
        stderr: stderr_tail(&output.stderr),
    })
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let skip = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[skip..].join("\n")
}
