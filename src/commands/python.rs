//! Script execution and package installs

use super::process::{self, ProcessOutput};
use super::{CommandHandler, HandlerContext, HandlerError};
use crate::config::Settings;
use crate::protocol::RequestPayload;
use crate::ui::ScriptingPhase;
use async_trait::async_trait;
use serde_json::json;
use std::path::PathBuf;

const DECLINED: &str = "The user decided to not run the script";

fn interpreter(settings: &Settings) -> Result<PathBuf, HandlerError> {
    let name = settings.python_interpreter();
    which::which(name)
        .map_err(|e| HandlerError::unavailable(format!("Could not find Python interpreter {name}: {e}")))
}

async fn run_script(code: &str, ctx: &HandlerContext) -> Result<Vec<RequestPayload>, HandlerError> {
    ctx.notifier.scripting_phase(ScriptingPhase::Idle);
    let python = interpreter(&ctx.settings.load())?;
    tracing::info!(interpreter = %python.display(), bytes = code.len(), "Running script");

    let output = process::run(&python, ["-c", code]).await?;
    Ok(vec![output.into_payload("python")?])
}

/// Runs a script only when the user accepts all risk up front. Otherwise the
/// assistant is expected to send the reviewed variant instead.
pub struct PythonHandler;

#[async_trait]
impl CommandHandler for PythonHandler {
    fn error_title(&self) -> &'static str {
        "Python Error"
    }

    async fn handle(
        &self,
        args: String,
        ctx: &HandlerContext,
    ) -> Result<Vec<RequestPayload>, HandlerError> {
        if !ctx.settings.load().accepts_all_risk() {
            ctx.notifier.scripting_phase(ScriptingPhase::Idle);
            tracing::info!("Risk not pre-accepted, leaving script to the reviewed path");
            return Ok(Vec::new());
        }
        run_script(&args, ctx).await
    }
}

/// Parse a risk rating the way a lenient integer parser would: optional
/// leading whitespace and sign, then digits. Negative ratings clamp to zero.
fn parse_rating(text: &str) -> Option<u32> {
    let text = text.trim_start();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(digits.len(), |(i, _)| i);
    let (number, _) = digits.split_at(end);
    if number.is_empty() {
        return None;
    }
    if negative {
        return Some(0);
    }
    Some(number.parse().unwrap_or(u32::MAX))
}

/// Script preceded by a rating line and a review line. Runs unasked when
/// the rating is below the user's risk acceptance.
pub struct PythonWithEvaluationHandler;

#[async_trait]
impl CommandHandler for PythonWithEvaluationHandler {
    fn error_title(&self) -> &'static str {
        "Python Error"
    }

    async fn handle(
        &self,
        args: String,
        ctx: &HandlerContext,
    ) -> Result<Vec<RequestPayload>, HandlerError> {
        ctx.notifier.scripting_phase(ScriptingPhase::Idle);

        let mut lines = args.split('\n');
        let rating = parse_rating(lines.next().unwrap_or_default());
        let review = lines.next().unwrap_or_default();
        let code = lines.collect::<Vec<_>>().join("\n");

        let acceptance = u32::from(ctx.settings.load().risk_acceptance);
        let approved = match rating {
            Some(rating) if rating < acceptance => true,
            _ => ctx.notifier.request_approval(rating, review).await,
        };

        if approved {
            return run_script(&code, ctx).await;
        }

        tracing::info!(?rating, "Script declined");
        Ok(vec![RequestPayload::new(
            "python",
            json!({ "exitCode": 1, "error": DECLINED }),
        )])
    }
}

/// `pip install` and friends, arguments split like a shell would
pub struct PipHandler;

#[async_trait]
impl CommandHandler for PipHandler {
    fn error_title(&self) -> &'static str {
        "Python Error"
    }

    async fn handle(
        &self,
        args: String,
        ctx: &HandlerContext,
    ) -> Result<Vec<RequestPayload>, HandlerError> {
        let pip_args = shlex::split(args.trim())
            .ok_or_else(|| HandlerError::invalid(format!("Unbalanced quoting in {args:?}")))?;
        let python = interpreter(&ctx.settings.load())?;
        tracing::info!(interpreter = %python.display(), args = ?pip_args, "Running pip");

        let output: ProcessOutput = process::run(
            &python,
            ["-m".to_string(), "pip".to_string()]
                .into_iter()
                .chain(pip_args)
                .chain(["-qq".to_string()]),
        )
        .await?;
        Ok(vec![output.into_payload("python")?])
    }
}
