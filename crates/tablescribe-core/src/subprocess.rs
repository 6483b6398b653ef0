//! Shared subprocess plumbing for CLI-backed components.
//!
//! Every external engine call runs as an isolated process; stdout carries
//! the payload and stderr is folded into the error on failure.

use crate::error::{CoreError, Result};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Run a subprocess to completion, returning stdout.
pub(crate) async fn run(description: &str, cmd: &mut Command) -> Result<Vec<u8>> {
    let output = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::error!("{} failed: {}", description, stderr.trim());
        return Err(CoreError::backend(format!(
            "{} failed: {}",
            description,
            stderr.trim()
        )));
    }

    Ok(output.stdout)
}

/// Run a subprocess, writing `input` to its stdin, returning stdout.
pub(crate) async fn run_with_stdin(
    description: &str,
    cmd: &mut Command,
    input: &[u8],
) -> Result<Vec<u8>> {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input).await?;
        // Dropping stdin closes the pipe so the child sees EOF
    }

    let output = child.wait_with_output().await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::error!("{} failed: {}", description, stderr.trim());
        return Err(CoreError::backend(format!(
            "{} failed: {}",
            description,
            stderr.trim()
        )));
    }

    Ok(output.stdout)
}
