// Encoding a spec and decoding the result must give the spec back, and
// decoding must cope with anything the job store hands us.

use cronjob_codec::{
    decode, encode, CronJobDraft, DeploymentContext, HttpHeader, HttpMethod, HttpRequest,
    JobCommand, JobKind, Schedule, ScheduleError, ValidationOptions,
};

fn ctx() -> DeploymentContext {
    DeploymentContext::for_project("abcdefgh", "supabase.co").unwrap()
}

fn round_trip(command: &JobCommand) -> JobCommand {
    let text = encode(command).expect("encode");
    decode(text.as_str(), &ctx()).command
}

#[test]
fn http_request_round_trip() {
    let command = JobCommand::HttpRequest(
        HttpRequest::new(HttpMethod::Post, "https://api.example.com/hook")
            .with_header("X-Key", "abc")
            .with_body("{}")
            .with_timeout_ms(2000),
    );
    assert_eq!(round_trip(&command), command);

    // Any deployment will do for a generic endpoint.
    let other = DeploymentContext::new("http://localhost:54321/functions/v1").unwrap();
    let text = encode(&command).unwrap();
    assert_eq!(decode(text.as_str(), &other).command, command);
}

#[test]
fn get_request_round_trip() {
    let command = JobCommand::HttpRequest(
        HttpRequest::new(HttpMethod::Get, "https://example.com/status?verbose=true")
            .with_header("Accept", "text/plain, application/json")
            .with_header("X-Name", "O'Brien")
            .with_timeout_ms(5000),
    );
    assert_eq!(round_trip(&command), command);
}

#[test]
fn edge_function_round_trip() {
    let command = JobCommand::EdgeFunctionCall(
        HttpRequest::new(
            HttpMethod::Post,
            ctx().function_url("send-digest"),
        )
        .with_header("Content-Type", "application/json")
        .with_header("Authorization", "Bearer token")
        .with_body(r#"{"name": "Functions", "tags": ["a", "b"]}"#)
        .with_timeout_ms(3000),
    );
    assert_eq!(round_trip(&command), command);
}

#[test]
fn sql_function_round_trip() {
    let command = JobCommand::function_call("auth", "jwt");
    assert_eq!(encode(&command).unwrap().as_str(), "SELECT auth.jwt()");
    assert_eq!(round_trip(&command), command);
}

#[test]
fn sql_snippet_round_trip() {
    for snippet in [
        "select 1",
        "delete from logs\nwhere created_at < now() - interval '1 day';",
        "  vacuum   analyze  ",
    ] {
        let command = JobCommand::snippet(snippet);
        assert_eq!(round_trip(&command), command, "{snippet:?}");
    }
}

#[test]
fn blank_headers_are_the_only_loss() {
    let command = JobCommand::HttpRequest(
        HttpRequest::new(HttpMethod::Post, "https://api.example.com/hook")
            .with_header("", "no-name")
            .with_header("X-Key", "abc")
            .with_header("X-Empty", ""),
    );
    let decoded = round_trip(&command);
    let req = decoded.http().unwrap();
    assert_eq!(req.headers, vec![HttpHeader::new("X-Key", "abc")]);
    assert_eq!(req.url, "https://api.example.com/hook");
}

#[test]
fn edge_function_with_query_string_stays_http() {
    let url = format!("{}?debug=1", ctx().function_url("hello"));
    let text = format!(
        "select net.http_post(url:='{url}', headers:=jsonb_build_object(), timeout_milliseconds:=1000)"
    );
    let spec = decode(&text, &ctx());
    assert_eq!(spec.kind(), JobKind::HttpRequest);
    assert_eq!(spec.command.http().unwrap().url, url);
}

#[test]
fn legacy_call_spelling() {
    assert_eq!(
        decode("CALL auth.jwt ()", &ctx()).command,
        JobCommand::function_call("auth", "jwt")
    );
}

#[test]
fn opaque_fallback() {
    assert_eq!(
        decode("some random text", &ctx()).command,
        JobCommand::snippet("some random text")
    );
}

#[test]
fn decode_never_fails() {
    let inputs = [
        "",
        "   ",
        "$$",
        "$$$$",
        "'",
        "((((",
        "select net.http_post(",
        "select net.http_post(url:='",
        "select net.http_post(url:='https://a.com', headers:=jsonb_build_object('a'",
        "select net.http_get(url:='https://a.com', headers:='{\"a\":')",
        "SELECT .()",
        "call",
        "select net.http_get(url:='https://a.com')) extra",
        "\u{0}\u{1f600}\n\t",
        "$tag$ select 1 $other$",
    ];
    for input in inputs {
        let first = decode(input, &ctx());
        let second = decode(input, &ctx());
        assert_eq!(first, second, "decode must be deterministic for {input:?}");
    }

    for input in ["'", "((((", "SELECT .()", "call", "select net.http_post("] {
        assert_eq!(decode(input, &ctx()).kind(), JobKind::SqlSnippet, "{input:?}");
    }
}

#[test]
fn stored_command_reopens_for_editing() {
    let draft = CronJobDraft::new(
        "digest",
        "0 8 * * 1-5",
        JobCommand::EdgeFunctionCall(
            HttpRequest::new(HttpMethod::Post, ctx().function_url("send-digest"))
                .with_body("{}"),
        )
        .into(),
    );
    let statement = draft
        .to_statement(&ctx(), ValidationOptions::default())
        .unwrap();
    assert!(statement.starts_with("select cron.schedule('digest', '0 8 * * 1-5', $$select net.http_post("));
    assert!(statement.ends_with(")$$);"));

    // The job store keeps the text between the dollar quotes.
    let stored = encode(&draft.spec.command).unwrap();
    let reopened = CronJobDraft::from_stored("digest", "0 8 * * 1-5", stored.as_str(), &ctx());
    assert_eq!(reopened.spec.command, draft.spec.command);
    assert_eq!(reopened.spec.raw_snippet, stored.as_str());
}

#[test]
fn schedule_classification() {
    assert!(matches!(
        "*/5 * * * *".parse::<Schedule>(),
        Ok(Schedule::Cron { .. })
    ));
    assert_eq!(
        "10 seconds".parse::<Schedule>(),
        Ok(Schedule::Seconds { every: 10 })
    );
    assert_eq!(
        "not a schedule".parse::<Schedule>(),
        Err(ScheduleError::Unrecognised)
    );
}

#[test]
fn dollar_quotes_in_a_request_body_use_a_tagged_statement() {
    let command = JobCommand::HttpRequest(
        HttpRequest::new(HttpMethod::Post, "https://api.example.com/hook")
            .with_body(r#"{"note":"$$"}"#),
    );
    let draft = CronJobDraft::new("notes", "*/5 * * * *", command.clone().into());
    let statement = draft
        .to_statement(&ctx(), ValidationOptions::default())
        .unwrap();
    assert!(statement.starts_with("select cron.schedule('notes', '*/5 * * * *', $cmd$select net.http_post("));
    assert!(statement.ends_with(")$cmd$);"));
    assert_eq!(round_trip(&command), command);
}
