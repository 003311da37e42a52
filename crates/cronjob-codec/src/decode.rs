//! Best-effort recovery of a [`JobSpec`] from stored command text.
//!
//! Decoding never fails. Shapes are tried in a fixed order and the first
//! match wins:
//!
//!   1. a `net.http_get` / `net.http_post` call whose arguments are all
//!      plain literals → `EdgeFunctionCall` or `HttpRequest`;
//!   2. a zero-argument `select|call <schema>.<function>()` → `SqlFunctionCall`;
//!   3. anything else that is not blank → `SqlSnippet` with the stored text;
//!   4. blank → the empty default.
//!
//! Matching runs on normalized text (see [`crate::sql::normalize`]), but a
//! snippet always keeps the stored text exactly as it was.

use std::sync::LazyLock;

use cronjob_core::DeploymentContext;
use regex::Regex;
use tracing::{debug, warn};

use crate::sql::{
    find_closing_paren, normalize, parse_literal, split_named_arg, split_top_level,
    strip_dollar_quotes, strip_token_quotes,
};
use crate::types::{HttpHeader, HttpMethod, HttpRequest, JobCommand, JobSpec, DEFAULT_TIMEOUT_MS};

static NET_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^select\s+net\s*\.\s*(http_get|http_post)\s*\(").expect("valid regex")
});

static FUNCTION_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:select|call)\s+([A-Za-z_][A-Za-z0-9_$]*)\s*\.\s*([A-Za-z_][A-Za-z0-9_$]*)\s*\(\s*\)\s*;?$",
    )
    .expect("valid regex")
});

static HEADER_BUILDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:pg_catalog\s*\.\s*)?jsonb?_build_object\s*\(").expect("valid regex")
});

/// Positional parameter names of `net.http_get`.
const HTTP_GET_PARAMS: &[&str] = &["url", "params", "headers", "timeout_milliseconds"];
/// Positional parameter names of `net.http_post`.
const HTTP_POST_PARAMS: &[&str] = &["url", "body", "params", "headers", "timeout_milliseconds"];

/// Recover a [`JobSpec`] from `command`. Unrecognised text comes back as a
/// `SqlSnippet` holding the stored text.
pub fn decode(command: &str, ctx: &DeploymentContext) -> JobSpec {
    let stored = strip_dollar_quotes(command);
    let normalized = normalize(command);

    if normalized.is_empty() {
        debug!("empty command, using default snippet");
        return JobSpec::default();
    }

    let decoded = decode_net_call(&normalized, ctx).or_else(|| decode_function_call(&normalized));
    let command = match decoded {
        Some(command) => command,
        None => JobCommand::snippet(stored),
    };
    debug!(kind = %command.kind(), "command decoded");

    JobSpec {
        command,
        raw_snippet: stored.to_string(),
    }
}

fn decode_function_call(normalized: &str) -> Option<JobCommand> {
    let caps = FUNCTION_CALL.captures(normalized)?;
    Some(JobCommand::function_call(&caps[1], &caps[2]))
}

fn decode_net_call(normalized: &str, ctx: &DeploymentContext) -> Option<JobCommand> {
    let caps = NET_CALL.captures(normalized)?;
    let method = if caps[1].eq_ignore_ascii_case("http_get") {
        HttpMethod::Get
    } else {
        HttpMethod::Post
    };

    let open = caps.get(0)?.end() - 1;
    let close = find_closing_paren(normalized, open)?;
    let trailing = normalized[close + 1..].trim();
    if !(trailing.is_empty() || trailing == ";") {
        debug!("network call followed by more SQL, keeping as snippet");
        return None;
    }

    let args = match collect_args(&normalized[open + 1..close], method) {
        Some(args) => args,
        None => {
            debug!("network call arguments not representable, keeping as snippet");
            return None;
        }
    };

    let url = args.url?;
    if url.is_empty() {
        return None;
    }

    let request = HttpRequest {
        method,
        url,
        headers: args.headers,
        body: args.body,
        timeout_ms: args.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
    };

    if ctx.matches_function_url(&request.url) {
        Some(JobCommand::EdgeFunctionCall(request))
    } else {
        Some(JobCommand::HttpRequest(request))
    }
}

#[derive(Default)]
struct NetArgs {
    url: Option<String>,
    headers: Vec<HttpHeader>,
    body: Option<String>,
    timeout_ms: Option<u32>,
}

/// Read the argument list of a network call. `None` means an argument the
/// structured form cannot hold without losing it (an expression, a
/// non-empty `params`, an unknown name).
fn collect_args(list: &str, method: HttpMethod) -> Option<NetArgs> {
    let positional_names = match method {
        HttpMethod::Get => HTTP_GET_PARAMS,
        HttpMethod::Post => HTTP_POST_PARAMS,
    };

    let mut args = NetArgs::default();
    for (index, arg) in split_top_level(list).into_iter().enumerate() {
        let (name, value) = match split_named_arg(arg) {
            Some((name, value)) => (name, value),
            None => (positional_names.get(index)?.to_string(), arg),
        };

        match name.as_str() {
            "url" => args.url = Some(parse_literal(value)?.trim().to_string()),
            "headers" => args.headers = parse_headers(value)?,
            "body" if method == HttpMethod::Post => args.body = Some(parse_literal(value)?),
            "timeout_milliseconds" => args.timeout_ms = Some(value.trim().parse().ok()?),
            "params" => {
                let params = parse_literal(value)?;
                if !is_empty_json_object(&params) {
                    return None;
                }
            }
            _ => return None,
        }
    }
    Some(args)
}

/// Headers come either from `jsonb_build_object(name, value, ...)` or from
/// a JSON object literal.
fn parse_headers(value: &str) -> Option<Vec<HttpHeader>> {
    let value = value.trim();

    if let Some(m) = HEADER_BUILDER.find(value) {
        let open = m.end() - 1;
        let close = find_closing_paren(value, open)?;
        let rest = value[close + 1..].trim();
        if !(rest.is_empty() || rest.starts_with("::")) {
            return None;
        }
        return header_pairs(&value[open + 1..close]);
    }

    let literal = parse_literal(value)?;
    Some(headers_from_json(&literal))
}

/// Pair the builder's arguments positionally: even index is the name, odd
/// index the value. A trailing name without a value gets an empty value.
fn header_pairs(list: &str) -> Option<Vec<HttpHeader>> {
    let tokens = split_top_level(list);
    // Only plain literals can be edited as header fields.
    if tokens.iter().any(|t| parse_literal(t).is_none()) {
        return None;
    }
    let tokens: Vec<String> = tokens.iter().map(|t| strip_token_quotes(t)).collect();

    Some(
        tokens
            .chunks(2)
            .map(|pair| {
                let value = pair.get(1).cloned().unwrap_or_default();
                HttpHeader::new(pair[0].clone(), value)
            })
            .collect(),
    )
}

fn headers_from_json(literal: &str) -> Vec<HttpHeader> {
    match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(literal) {
        Ok(map) => map
            .into_iter()
            .map(|(name, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                HttpHeader::new(name, value)
            })
            .collect(),
        Err(e) => {
            warn!(error = %e, "headers literal is not a JSON object, ignoring headers");
            Vec::new()
        }
    }
}

fn is_empty_json_object(s: &str) -> bool {
    let s = s.trim();
    s.is_empty()
        || serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(s)
            .is_ok_and(|m| m.is_empty())
}
