use std::process::{Command, Output};

use anyhow::{anyhow, Context, Result};

pub(crate) fn command_exists(program: &str) -> bool {
    which::which(program).is_ok()
}

fn checked_output(command: &mut Command, context_message: &str) -> Result<Output> {
    let output = command
        .output()
        .with_context(|| format!("{context_message}: command failed to start"))?;
    if output.status.success() {
        return Ok(output);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    Err(anyhow!(
        "{context_message}: status={} stdout='{}' stderr='{}'",
        output.status,
        stdout.trim(),
        stderr.trim()
    ))
}

pub(crate) fn run_command(command: &mut Command, context_message: &str) -> Result<()> {
    checked_output(command, context_message).map(|_| ())
}

/// Runs `command` and returns its stdout.
pub(crate) fn run_command_capture(command: &mut Command, context_message: &str) -> Result<String> {
    let output = checked_output(command, context_message)?;
    String::from_utf8(output.stdout)
        .with_context(|| format!("{context_message}: output was not valid UTF-8"))
}
