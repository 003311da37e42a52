use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Default request timeout when none is given.
pub const DEFAULT_TIMEOUT_MS: u32 = 1000;
pub const MIN_TIMEOUT_MS: u32 = 1000;
pub const MAX_TIMEOUT_MS: u32 = 5000;

/// HTTP verb of a network call. Only the two verbs the form offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
}

impl HttpMethod {
    /// Name of the networking helper that issues this verb.
    pub fn net_function(&self) -> &'static str {
        match self {
            HttpMethod::Get => "http_get",
            HttpMethod::Post => "http_post",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            other => Err(format!("unsupported HTTP method: {other}")),
        }
    }
}

/// One request header. Order is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpHeader {
    pub name: String,
    pub value: String,
}

impl HttpHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Headers with an empty name or value are not written out.
    pub fn is_blank(&self) -> bool {
        self.name.is_empty() || self.value.is_empty()
    }
}

/// Fields shared by plain HTTP requests and edge-function invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    #[serde(default)]
    pub method: HttpMethod,
    pub url: String,
    #[serde(default)]
    pub headers: Vec<HttpHeader>,
    /// Sent only with POST. A blank body reads as no body.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub body: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u32,
}

fn default_timeout_ms() -> u32 {
    DEFAULT_TIMEOUT_MS
}

fn blank_as_none<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(d)?.filter(|b| !b.trim().is_empty()))
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(HttpHeader::new(name, value));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// The body that actually goes on the wire: POST only, never blank.
    pub fn effective_body(&self) -> Option<&str> {
        match self.method {
            HttpMethod::Post => self.body.as_deref().filter(|b| !b.trim().is_empty()),
            HttpMethod::Get => None,
        }
    }
}

/// Discriminant of [`JobCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    SqlSnippet,
    SqlFunction,
    HttpRequest,
    EdgeFunction,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobKind::SqlSnippet => "sql_snippet",
            JobKind::SqlFunction => "sql_function",
            JobKind::HttpRequest => "http_request",
            JobKind::EdgeFunction => "edge_function",
        };
        write!(f, "{s}")
    }
}

/// What a job does each time it fires, in structured form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobCommand {
    /// Arbitrary SQL, stored as-is.
    SqlSnippet { snippet: String },

    /// A zero-argument database function.
    #[serde(rename = "sql_function")]
    SqlFunctionCall { schema: String, function: String },

    /// A request to any HTTP endpoint.
    HttpRequest(HttpRequest),

    /// A request to one of the deployment's own edge functions. Same wire
    /// shape as `HttpRequest`; only the URL differs.
    #[serde(rename = "edge_function")]
    EdgeFunctionCall(HttpRequest),
}

impl JobCommand {
    pub fn snippet(snippet: impl Into<String>) -> Self {
        JobCommand::SqlSnippet {
            snippet: snippet.into(),
        }
    }

    pub fn function_call(schema: impl Into<String>, function: impl Into<String>) -> Self {
        JobCommand::SqlFunctionCall {
            schema: schema.into(),
            function: function.into(),
        }
    }

    pub fn kind(&self) -> JobKind {
        match self {
            JobCommand::SqlSnippet { .. } => JobKind::SqlSnippet,
            JobCommand::SqlFunctionCall { .. } => JobKind::SqlFunction,
            JobCommand::HttpRequest(_) => JobKind::HttpRequest,
            JobCommand::EdgeFunctionCall(_) => JobKind::EdgeFunction,
        }
    }

    /// The request fields, for either network variant.
    pub fn http(&self) -> Option<&HttpRequest> {
        match self {
            JobCommand::HttpRequest(req) | JobCommand::EdgeFunctionCall(req) => Some(req),
            _ => None,
        }
    }
}

impl Default for JobCommand {
    fn default() -> Self {
        JobCommand::snippet("")
    }
}

/// A schedulable job in structured form.
///
/// `raw_snippet` is the command text as the job store last held it. Editors
/// fall back to it when the structured fields cannot be used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    #[serde(flatten)]
    pub command: JobCommand,
    #[serde(default)]
    pub raw_snippet: String,
}

impl JobSpec {
    pub fn new(command: JobCommand) -> Self {
        Self {
            command,
            raw_snippet: String::new(),
        }
    }

    pub fn kind(&self) -> JobKind {
        self.command.kind()
    }

    /// The stored text, re-emitted verbatim when editing is abandoned.
    pub fn raw_command(&self) -> CommandText {
        CommandText::from(self.raw_snippet.as_str())
    }
}

impl From<JobCommand> for JobSpec {
    fn from(command: JobCommand) -> Self {
        Self::new(command)
    }
}

/// The literal payload the job store executes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandText(pub String);

impl CommandText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CommandText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CommandText {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CommandText {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_serialises_with_type_tag() {
        let spec = JobSpec::new(JobCommand::function_call("auth", "jwt"));
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["type"], "sql_function");
        assert_eq!(json["schema"], "auth");
        assert_eq!(json["function"], "jwt");

        let back: JobSpec = serde_json::from_value(json).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn http_spec_deserialises_with_defaults() {
        let json = r#"{"type":"http_request","url":"https://example.com/hook"}"#;
        let spec: JobSpec = serde_json::from_str(json).unwrap();
        let req = spec.command.http().expect("http variant");
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert!(req.headers.is_empty());
        assert_eq!(spec.raw_snippet, "");
        assert_eq!(spec.kind(), JobKind::HttpRequest);
    }

    #[test]
    fn blank_body_deserialises_as_none() {
        for body in [r#""""#, r#""  \n ""#, "null"] {
            let json = format!(
                r#"{{"type":"http_request","url":"https://example.com/hook","body":{body}}}"#
            );
            let spec: JobSpec = serde_json::from_str(&json).unwrap();
            assert_eq!(spec.command.http().unwrap().body, None, "body {body}");
        }
        let json = r#"{"type":"http_request","url":"https://example.com/hook","body":" {} "}"#;
        let spec: JobSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.command.http().unwrap().body.as_deref(), Some(" {} "));
    }

    #[test]
    fn edge_function_tag() {
        let json = r#"{"type":"edge_function","method":"GET","url":"https://x.supabase.co/functions/v1/a"}"#;
        let spec: JobSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.kind(), JobKind::EdgeFunction);
        assert_eq!(spec.command.http().unwrap().method, HttpMethod::Get);
    }

    #[test]
    fn effective_body_ignores_get_and_blank() {
        let post = HttpRequest::new(HttpMethod::Post, "https://a").with_body("  ");
        assert_eq!(post.effective_body(), None);
        let post = post.with_body("{}");
        assert_eq!(post.effective_body(), Some("{}"));
        let get = HttpRequest::new(HttpMethod::Get, "https://a").with_body("{}");
        assert_eq!(get.effective_body(), None);
    }

    #[test]
    fn method_from_str_is_case_insensitive() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("POST".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert!("DELETE".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn default_spec_is_empty_snippet() {
        let spec = JobSpec::default();
        assert_eq!(spec.command, JobCommand::snippet(""));
        assert_eq!(spec.raw_command().as_str(), "");
    }
}
