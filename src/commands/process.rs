//! Local process execution shared by the script and open handlers

use super::HandlerError;
use crate::protocol::RequestPayload;
use serde::Serialize;
use std::ffi::OsStr;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tokio::task::JoinHandle;

/// Exit status and captured streams of a finished process
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub output: String,
    pub error: String,
}

impl ProcessOutput {
    /// A run that never started, reported in-band
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            output: String::new(),
            error: error.into(),
        }
    }

    pub fn into_payload(self, kind: &str) -> Result<RequestPayload, HandlerError> {
        Ok(RequestPayload::new(kind, serde_json::to_value(self)?))
    }
}

/// Run `program` to completion with stdin closed.
///
/// The child is killed if the returned future is dropped.
pub async fn run<I, S>(program: impl AsRef<OsStr>, args: I) -> Result<ProcessOutput, HandlerError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program = program.as_ref();
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await?;

    let exit_code = output.status.code().unwrap_or(-1);
    tracing::debug!(program = %program.to_string_lossy(), exit_code, "Process finished");

    Ok(ProcessOutput {
        exit_code,
        output: String::from_utf8_lossy(&output.stdout).into_owned(),
        error: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Start `program` without waiting for it.
///
/// The child outlives the handler. A background task reaps it when it
/// exits; its handle resolves to the exit status.
pub fn spawn_detached(
    program: impl AsRef<OsStr>,
) -> std::io::Result<JoinHandle<Option<ExitStatus>>> {
    let program = program.as_ref().to_string_lossy().into_owned();
    let mut child = Command::new(&program)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    Ok(tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => {
                tracing::debug!(program = %program, status = %status, "Detached process exited");
                Some(status)
            }
            Err(e) => {
                tracing::warn!(program = %program, error = %e, "Failed to wait for detached process");
                None
            }
        }
    }))
}
