use crate::error::{CodecError, Result};
use crate::sql::{dollar_quote, quote_literal};
use crate::types::{CommandText, HttpRequest, JobCommand, JobSpec};

impl JobSpec {
    /// Encode the structured fields. See [`encode`].
    pub fn encode(&self) -> Result<CommandText> {
        encode(&self.command)
    }
}

/// Translate a validated command into the text the job store executes.
///
/// - snippets are dollar-quoted;
/// - function calls become `SELECT <schema>.<function>()`;
/// - network calls become a `net.http_get` / `net.http_post` invocation with
///   named arguments in the fixed order `url`, `headers`, `body` (POST
///   only), `timeout_milliseconds`.
///
/// Only fails with [`CodecError::Invariant`] when handed something
/// validation would have rejected.
pub fn encode(command: &JobCommand) -> Result<CommandText> {
    let text = match command {
        JobCommand::SqlSnippet { snippet } => dollar_quote(snippet).ok_or_else(|| {
            CodecError::Invariant("SQL snippet cannot be wrapped in $$ delimiters".to_string())
        })?,
        JobCommand::SqlFunctionCall { schema, function } => {
            let (schema, function) = (schema.trim(), function.trim());
            if schema.is_empty() || function.is_empty() {
                return Err(CodecError::Invariant(
                    "function call without schema or function name".to_string(),
                ));
            }
            format!("SELECT {schema}.{function}()")
        }
        JobCommand::HttpRequest(req) | JobCommand::EdgeFunctionCall(req) => {
            if req.url.trim().is_empty() {
                return Err(CodecError::Invariant("network call without a URL".to_string()));
            }
            encode_http(req)
        }
    };
    Ok(CommandText(text))
}

fn encode_http(req: &HttpRequest) -> String {
    // Blank headers are dropped on write.
    let header_args: Vec<String> = req
        .headers
        .iter()
        .filter(|h| !h.is_blank())
        .flat_map(|h| [quote_literal(&h.name), quote_literal(&h.value)])
        .collect();

    let mut args = vec![
        format!("url:={}", quote_literal(req.url.trim())),
        format!("headers:=jsonb_build_object({})", header_args.join(", ")),
    ];
    if let Some(body) = req.effective_body() {
        args.push(format!("body:={}", quote_literal(body)));
    }
    args.push(format!("timeout_milliseconds:={}", req.timeout_ms));

    format!(
        "select net.{}(\n    {}\n)",
        req.method.net_function(),
        args.join(",\n    ")
    )
}
