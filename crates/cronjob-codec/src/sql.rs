//! Small lexical helpers for the handful of SQL shapes the codec reads and
//! writes. None of this is a SQL parser: it only knows about single-quoted
//! literals, dollar-quoted bodies, parentheses and commas.

use std::sync::LazyLock;

use regex::Regex;

/// Opening dollar-quote delimiter: `$$` or `$tag$`.
static DOLLAR_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$([A-Za-z_][A-Za-z0-9_]*)?\$").expect("valid regex"));

/// Double every single quote so `s` can sit inside `'...'`.
pub fn escape_literal(s: &str) -> String {
    s.replace('\'', "''")
}

/// `s` as a single-quoted SQL literal.
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", escape_literal(s))
}

/// Wrap `s` in `$$...$$`, or `None` when the closing `$$` would end up
/// somewhere other than after `s` (it contains `$$` or ends in `$`).
pub fn dollar_quote(s: &str) -> Option<String> {
    closes_cleanly(s, "$$").then(|| format!("$${s}$$"))
}

/// True when the first `tag` in `s` followed by `tag` is the appended one.
fn closes_cleanly(s: &str, tag: &str) -> bool {
    format!("{s}{tag}").find(tag) == Some(s.len())
}

/// Wrap `s` in the first dollar-quote tag that does not occur inside it.
pub fn dollar_quote_tagged(s: &str) -> String {
    if let Some(quoted) = dollar_quote(s) {
        return quoted;
    }
    let mut n = 0usize;
    loop {
        let tag = if n == 0 {
            "$cmd$".to_string()
        } else {
            format!("$cmd{n}$")
        };
        if closes_cleanly(s, &tag) {
            return format!("{tag}{s}{tag}");
        }
        n += 1;
    }
}

/// The body of `s` when the whole (trimmed) text is one dollar-quoted
/// string, e.g. `$$select 1$$` or `$job$select 1$job$`.
pub fn unwrap_dollar_quoted(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    let open = DOLLAR_TAG.find(trimmed)?.as_str();
    let rest = &trimmed[open.len()..];
    let body = rest.strip_suffix(open)?;
    // The delimiter must not reappear inside the body, otherwise this is
    // two adjacent strings (or an expression), not one.
    if body.contains(open) {
        return None;
    }
    Some(body)
}

/// `s` without its enclosing dollar quotes, if it had any.
pub fn strip_dollar_quotes(s: &str) -> &str {
    unwrap_dollar_quoted(s).unwrap_or(s)
}

/// Canonical form used for shape matching: dollar quotes stripped, every
/// run of whitespace outside single-quoted literals collapsed to a single
/// space, ends trimmed. Literal contents are left untouched.
pub fn normalize(s: &str) -> String {
    let body = strip_dollar_quotes(s);
    let mut out = String::with_capacity(body.len());
    let mut in_literal = false;
    let mut pending_space = false;

    for c in body.chars() {
        if !in_literal && c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            if !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
        }
        if c == '\'' {
            // A doubled quote toggles twice, which keeps us inside the literal.
            in_literal = !in_literal;
        }
        out.push(c);
    }
    out
}

/// Byte index of the `)` matching the `(` at `open`, skipping literals and
/// nested parentheses.
pub fn find_closing_paren(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_literal = false;
    for (i, c) in s[open..].char_indices() {
        match c {
            '\'' => in_literal = !in_literal,
            '(' if !in_literal => depth += 1,
            ')' if !in_literal => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split `s` on commas that are outside literals and parentheses. Each
/// piece is trimmed. An empty input yields no pieces.
pub fn split_top_level(s: &str) -> Vec<&str> {
    if s.trim().is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_literal = false;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '\'' => in_literal = !in_literal,
            '(' if !in_literal => depth += 1,
            ')' if !in_literal => depth -= 1,
            ',' if !in_literal && depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(s[start..].trim());
    parts
}

/// Split a named argument `name := value` (or `name => value`) into its
/// lowercased name and value. Positional arguments yield `None`.
pub fn split_named_arg(arg: &str) -> Option<(String, &str)> {
    let mut in_literal = false;
    for (i, c) in arg.char_indices() {
        match c {
            '\'' => in_literal = !in_literal,
            ':' | '=' if !in_literal => {
                let rest = &arg[i..];
                if rest.starts_with(":=") || rest.starts_with("=>") {
                    let name = arg[..i].trim();
                    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_')
                    {
                        return None;
                    }
                    return Some((name.to_ascii_lowercase(), rest[2..].trim()));
                }
                return None;
            }
            _ => {}
        }
    }
    None
}

/// Contents of a single-quoted literal, with an optional trailing
/// `::type` cast. Returns `None` for anything that is not one literal.
pub fn parse_literal(token: &str) -> Option<String> {
    let token = strip_cast(token.trim());
    let inner = token.strip_prefix('\'')?.strip_suffix('\'')?;
    // Any lone quote left inside means this was more than one literal,
    // e.g. `'a' || 'b'`.
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
            } else {
                return None;
            }
        }
    }
    Some(inner.replace("''", "'"))
}

/// Lenient header token reading: trim, drop one leading and one trailing
/// quote, undo doubled quotes.
pub fn strip_token_quotes(token: &str) -> String {
    let t = strip_cast(token.trim());
    let t = t.strip_prefix('\'').unwrap_or(t);
    let t = t.strip_suffix('\'').unwrap_or(t);
    t.replace("''", "'")
}

/// `token` without a trailing `::type` cast outside of literals.
fn strip_cast(token: &str) -> &str {
    let mut in_literal = false;
    let mut cut = None;
    for (i, c) in token.char_indices() {
        match c {
            '\'' => in_literal = !in_literal,
            ':' if !in_literal && token[i..].starts_with("::") => {
                cut = Some(i);
                break;
            }
            _ => {}
        }
    }
    match cut {
        Some(i) => {
            let ty = token[i + 2..].trim();
            if !ty.is_empty() && ty.chars().all(|c| c.is_alphanumeric() || c == '_' || c == ' ') {
                token[..i].trim_end()
            } else {
                token
            }
        }
        None => token,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_doubles_quotes() {
        assert_eq!(escape_literal("it's"), "it''s");
        assert_eq!(quote_literal("o'clock"), "'o''clock'");
    }

    #[test]
    fn dollar_quote_refuses_embedded_delimiter() {
        assert_eq!(dollar_quote("select 1").as_deref(), Some("$$select 1$$"));
        assert_eq!(dollar_quote("select $$x$$"), None);
        assert_eq!(dollar_quote_tagged("select $$x$$"), "$cmd$select $$x$$$cmd$");
        assert_eq!(
            dollar_quote_tagged("$$ $cmd$"),
            "$cmd1$$$ $cmd$$cmd1$"
        );
    }

    #[test]
    fn trailing_dollar_cannot_close_early() {
        assert_eq!(dollar_quote("select 1 -- costs $"), None);
        assert_eq!(
            dollar_quote_tagged("select 1 -- costs $"),
            "$cmd$select 1 -- costs $$cmd$"
        );
        assert_eq!(dollar_quote_tagged("x $cmd"), "$cmd1$x $cmd$cmd1$");
        assert_eq!(dollar_quote("$1"), Some("$$$1$$".to_string()));
    }

    #[test]
    fn unwrap_handles_plain_and_tagged() {
        assert_eq!(unwrap_dollar_quoted("$$select 1$$"), Some("select 1"));
        assert_eq!(unwrap_dollar_quoted("  $job$ select 1 $job$ "), Some(" select 1 "));
        assert_eq!(unwrap_dollar_quoted("$$a$$ || $$b$$"), None);
        assert_eq!(unwrap_dollar_quoted("select 1"), None);
        assert_eq!(unwrap_dollar_quoted("$$"), None);
        assert_eq!(unwrap_dollar_quoted("$$$$"), Some(""));
    }

    #[test]
    fn normalize_collapses_outside_literals_only() {
        let input = "$$\n  select\tnet.http_post(\n    url:='https://a',\n    body:='{\"a\":  1}'\n  )\n$$";
        assert_eq!(
            normalize(input),
            "select net.http_post( url:='https://a', body:='{\"a\":  1}' )"
        );
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("select 'it''s   here'"), "select 'it''s   here'");
    }

    #[test]
    fn closing_paren_skips_literals_and_nesting() {
        let s = "f(a, g(b), ')')";
        assert_eq!(find_closing_paren(s, 1), Some(s.len() - 1));
        assert_eq!(find_closing_paren("f(a", 1), None);
    }

    #[test]
    fn split_respects_literals_and_parens() {
        let parts = split_top_level("url:='a,b', headers:=f('x', 'y'), 5");
        assert_eq!(parts, vec!["url:='a,b'", "headers:=f('x', 'y')", "5"]);
        assert!(split_top_level("  ").is_empty());
    }

    #[test]
    fn named_args() {
        assert_eq!(
            split_named_arg("url := 'https://a'"),
            Some(("url".to_string(), "'https://a'"))
        );
        assert_eq!(
            split_named_arg("Timeout_Milliseconds=>1000"),
            Some(("timeout_milliseconds".to_string(), "1000"))
        );
        assert_eq!(split_named_arg("'a:=b'"), None);
        assert_eq!(split_named_arg("'https://a'"), None);
    }

    #[test]
    fn literal_parsing() {
        assert_eq!(parse_literal("'abc'").as_deref(), Some("abc"));
        assert_eq!(parse_literal("'{}'::jsonb").as_deref(), Some("{}"));
        assert_eq!(parse_literal("'it''s'").as_deref(), Some("it's"));
        assert_eq!(parse_literal("'a' || 'b'"), None);
        assert_eq!(parse_literal("now()"), None);
        assert_eq!(parse_literal("'a::b'").as_deref(), Some("a::b"));
    }

    #[test]
    fn token_quote_stripping_is_lenient() {
        assert_eq!(strip_token_quotes(" 'X-Key' "), "X-Key");
        assert_eq!(strip_token_quotes("abc"), "abc");
        assert_eq!(strip_token_quotes("'abc"), "abc");
    }
}
