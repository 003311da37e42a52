//! Field checks run before a spec is encoded. Every failing field is
//! reported; nothing here stops at the first problem.

use std::sync::LazyLock;

use cronjob_core::DeploymentContext;
use regex::Regex;
use url::Url;

use crate::error::ValidationErrors;
use crate::types::{HttpMethod, HttpRequest, JobCommand, JobSpec, MAX_TIMEOUT_MS, MIN_TIMEOUT_MS};

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").expect("valid regex"));

pub(crate) fn is_identifier(s: &str) -> bool {
    IDENTIFIER.is_match(s)
}

impl JobSpec {
    /// Check the structured fields. `ctx` decides which URLs count as the
    /// deployment's own edge functions.
    pub fn validate(&self, ctx: &DeploymentContext) -> Result<(), ValidationErrors> {
        validate_command(&self.command, ctx)
    }
}

pub fn validate_command(
    command: &JobCommand,
    ctx: &DeploymentContext,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    match command {
        JobCommand::SqlSnippet { snippet } => {
            if snippet.trim().is_empty() {
                errors.push("snippet", "Please provide a SQL snippet");
            } else if snippet.contains("$$") {
                errors.push(
                    "snippet",
                    "SQL snippets cannot contain $$ because the command is stored dollar-quoted",
                );
            } else if snippet.ends_with('$') {
                errors.push(
                    "snippet",
                    "SQL snippets cannot end with $ because the command is stored dollar-quoted",
                );
            }
        }
        JobCommand::SqlFunctionCall { schema, function } => {
            if !is_identifier(schema.trim()) {
                errors.push("schema", "Please select one of the listed database schemas");
            }
            if !is_identifier(function.trim()) {
                errors.push("function", "Please select one of the listed database functions");
            }
        }
        JobCommand::HttpRequest(req) => {
            check_url(&req.url, &mut errors);
            check_request(req, &mut errors);
        }
        JobCommand::EdgeFunctionCall(req) => {
            if req.url.trim().is_empty() || !ctx.matches_function_url(req.url.trim()) {
                errors.push("url", "Please select one of the listed Edge Functions");
            }
            check_request(req, &mut errors);
        }
    }
    errors.into_result()
}

fn check_url(url: &str, errors: &mut ValidationErrors) {
    let url = url.trim();
    if url.is_empty() {
        errors.push("url", "Please provide a URL");
    } else if !url.starts_with("http") {
        errors.push("url", "Please include HTTP/HTTPs to your URL");
    } else if !Url::parse(url).is_ok_and(|u| u.host_str().is_some()) {
        errors.push("url", "Please provide a valid URL");
    }
}

/// Checks shared by both network variants.
fn check_request(req: &HttpRequest, errors: &mut ValidationErrors) {
    if !req.url.trim().is_empty() && req.url.trim() != req.url {
        errors.push("url", "Please remove spaces around the URL");
    }

    if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&req.timeout_ms) {
        errors.push("timeout_ms", "Timeout should be between 1000ms and 5000ms");
    }

    match req.body.as_deref() {
        None => {}
        Some(body) if body.trim().is_empty() => {
            errors.push("body", "Please remove the empty request body");
        }
        Some(_) if req.method == HttpMethod::Get => {
            errors.push("body", "A request body can only be sent with POST");
        }
        Some(body) => {
            if serde_json::from_str::<serde_json::Value>(body).is_err() {
                errors.push("body", "Input must be valid JSON");
            }
        }
    }
}
