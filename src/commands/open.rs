//! Opening files and launching applications

use super::process::{self, ProcessOutput};
use super::{CommandHandler, HandlerContext, HandlerError};
use crate::protocol::RequestPayload;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    File(String),
    App(String),
}

/// `app <name>` launches an application; any other leading word names a
/// file, e.g. `file ~/notes.txt`.
fn parse_target(args: &str) -> Option<Target> {
    let (kind, name) = args.trim().split_once(' ').unwrap_or((args.trim(), ""));
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(match kind {
        "app" => Target::App(name.to_string()),
        _ => Target::File(name.to_string()),
    })
}

/// Platform command that opens `target`
fn opener(target: &Target) -> (String, Vec<String>) {
    if cfg!(target_os = "macos") {
        match target {
            Target::File(file) => ("open".to_string(), vec![file.clone()]),
            Target::App(app) => ("open".to_string(), vec!["-a".to_string(), app.clone()]),
        }
    } else if cfg!(target_os = "windows") {
        let name = match target {
            Target::File(name) | Target::App(name) => name.clone(),
        };
        (
            "cmd".to_string(),
            vec!["/C".to_string(), "start".to_string(), String::new(), name],
        )
    } else {
        match target {
            Target::File(file) => ("xdg-open".to_string(), vec![file.clone()]),
            Target::App(app) => (app.clone(), Vec::new()),
        }
    }
}

pub struct OpenHandler;

impl OpenHandler {
    /// Start an application and leave it running.
    fn launch_detached(app: &str) -> Result<ProcessOutput, HandlerError> {
        let path = which::which(app)
            .map_err(|e| HandlerError::unavailable(format!("Could not find application {app}: {e}")))?;
        // Reaped in the background once the app exits
        drop(process::spawn_detached(&path)?);
        Ok(ProcessOutput {
            exit_code: 0,
            output: format!("Started {}", path.display()),
            error: String::new(),
        })
    }
}

#[async_trait]
impl CommandHandler for OpenHandler {
    fn error_title(&self) -> &'static str {
        "Open Error"
    }

    async fn handle(
        &self,
        args: String,
        _ctx: &HandlerContext,
    ) -> Result<Vec<RequestPayload>, HandlerError> {
        let Some(target) = parse_target(&args) else {
            return Ok(vec![ProcessOutput::failed("Specify a file or app").into_payload("open")?]);
        };
        tracing::info!(?target, "Opening");

        let (program, program_args) = opener(&target);
        let output = if program_args.is_empty() {
            Self::launch_detached(&program)?
        } else {
            process::run(&program, &program_args).await?
        };
        Ok(vec![output.into_payload("open")?])
    }
}
