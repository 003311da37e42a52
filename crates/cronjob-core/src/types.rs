use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CoreError, Result};

/// Path under which a deployment serves its edge functions.
pub const FUNCTIONS_PATH: &str = "/functions/v1";

/// Identity of the deployment a command is decoded against.
///
/// Passed explicitly into the decoder so that recognising an edge-function
/// URL never depends on ambient configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentContext {
    functions_url: Url,
}

impl DeploymentContext {
    /// Build a context from an explicit invocation prefix, e.g.
    /// `http://localhost:54321/functions/v1`.
    pub fn new(functions_url: &str) -> Result<Self> {
        let parsed = Url::parse(functions_url).map_err(|e| CoreError::InvalidFunctionsUrl {
            url: functions_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(CoreError::InvalidFunctionsUrl {
                url: functions_url.to_string(),
                reason: "expected an http(s) URL with a host".to_string(),
            });
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(CoreError::InvalidFunctionsUrl {
                url: functions_url.to_string(),
                reason: "query strings and fragments are not allowed".to_string(),
            });
        }
        Ok(Self {
            functions_url: parsed,
        })
    }

    /// Hosted deployments serve functions at `https://<ref>.<domain>/functions/v1`.
    pub fn for_project(project_ref: &str, domain: &str) -> Result<Self> {
        Self::new(&format!("https://{project_ref}.{domain}{FUNCTIONS_PATH}"))
    }

    /// The invocation prefix without a trailing slash.
    pub fn functions_url(&self) -> &str {
        self.functions_url.as_str().trim_end_matches('/')
    }

    /// Invocation URL for the function called `name`.
    pub fn function_url(&self, name: &str) -> String {
        format!("{}/{}", self.functions_url(), name)
    }

    /// Name of the function `url` invokes, if it is one of this deployment's
    /// function URLs.
    pub fn function_name(&self, url: &str) -> Option<String> {
        let candidate = Url::parse(url).ok()?;
        if candidate.query().is_some() || candidate.fragment().is_some() {
            return None;
        }
        if candidate.scheme() != self.functions_url.scheme()
            || candidate.host_str() != self.functions_url.host_str()
            || candidate.port_or_known_default() != self.functions_url.port_or_known_default()
        {
            return None;
        }

        let prefix = self.functions_url.path().trim_end_matches('/');
        let name = candidate.path().strip_prefix(prefix)?.strip_prefix('/')?;
        if name.is_empty() || name.contains('/') {
            return None;
        }
        Some(name.to_string())
    }

    /// True when `url` invokes one of this deployment's functions.
    ///
    /// A query string or fragment (even an empty one) disqualifies the URL so
    /// that it is treated as a generic HTTP request and kept intact.
    pub fn matches_function_url(&self, url: &str) -> bool {
        self.function_name(url).is_some()
    }
}

/// Installed version of the job store extension (`major.minor[.patch]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PgCronVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl PgCronVersion {
    /// First release that accepts `"<N> seconds"` schedules.
    pub const SECONDS_SUPPORT: PgCronVersion = PgCronVersion {
        major: 1,
        minor: 5,
        patch: 0,
    };

    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn supports_seconds(&self) -> bool {
        *self >= Self::SECONDS_SUPPORT
    }
}

impl fmt::Display for PgCronVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl std::str::FromStr for PgCronVersion {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let invalid = || CoreError::InvalidVersion(s.to_string());

        let mut parts = trimmed.split('.');
        let major = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        let minor = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        let patch = match parts.next() {
            // Strip pre-release suffix: "4-beta" -> "4"
            Some(p) => {
                let numeric: String = p.chars().take_while(|c| c.is_ascii_digit()).collect();
                numeric.parse().map_err(|_| invalid())?
            }
            None => 0,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self::new(major, minor, patch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> DeploymentContext {
        DeploymentContext::for_project("abcdefgh", "supabase.co").unwrap()
    }

    #[test]
    fn for_project_builds_hosted_prefix() {
        assert_eq!(
            ctx().functions_url(),
            "https://abcdefgh.supabase.co/functions/v1"
        );
        assert_eq!(
            ctx().function_url("hello-world"),
            "https://abcdefgh.supabase.co/functions/v1/hello-world"
        );
    }

    #[test]
    fn function_urls_are_recognised() {
        let ctx = ctx();
        assert_eq!(
            ctx.function_name("https://abcdefgh.supabase.co/functions/v1/hello-world"),
            Some("hello-world".to_string())
        );
        assert!(!ctx.matches_function_url("https://other.supabase.co/functions/v1/hello"));
        assert!(!ctx.matches_function_url("http://abcdefgh.supabase.co/functions/v1/hello"));
        assert!(!ctx.matches_function_url("https://abcdefgh.supabase.co/functions/v1/"));
        assert!(!ctx.matches_function_url("https://abcdefgh.supabase.co/functions/v1/a/b"));
        assert!(!ctx.matches_function_url("https://abcdefgh.supabase.co/rest/v1/hello"));
        assert!(!ctx.matches_function_url("not a url"));
    }

    #[test]
    fn query_and_fragment_disqualify_function_urls() {
        let ctx = ctx();
        let base = "https://abcdefgh.supabase.co/functions/v1/hello";
        assert!(!ctx.matches_function_url(&format!("{base}?debug=1")));
        assert!(!ctx.matches_function_url(&format!("{base}?")));
        assert!(!ctx.matches_function_url(&format!("{base}#top")));
    }

    #[test]
    fn local_stack_prefix_with_port() {
        let ctx = DeploymentContext::new("http://localhost:54321/functions/v1/").unwrap();
        assert_eq!(ctx.functions_url(), "http://localhost:54321/functions/v1");
        assert!(ctx.matches_function_url("http://localhost:54321/functions/v1/cleanup"));
        assert!(!ctx.matches_function_url("http://localhost:8000/functions/v1/cleanup"));
    }

    #[test]
    fn rejects_non_http_prefix() {
        assert!(DeploymentContext::new("ftp://example.com/functions/v1").is_err());
        assert!(DeploymentContext::new("nope").is_err());
        assert!(DeploymentContext::new("https://example.com/functions/v1?x=1").is_err());
    }

    #[test]
    fn version_parsing_and_seconds_support() {
        let v: PgCronVersion = "1.6.4".parse().unwrap();
        assert_eq!(v, PgCronVersion::new(1, 6, 4));
        assert!(v.supports_seconds());

        let v: PgCronVersion = "1.4".parse().unwrap();
        assert_eq!(v, PgCronVersion::new(1, 4, 0));
        assert!(!v.supports_seconds());

        assert!("v1.5.0".parse::<PgCronVersion>().unwrap().supports_seconds());
        assert!("".parse::<PgCronVersion>().is_err());
        assert!("1".parse::<PgCronVersion>().is_err());
        assert!("1.x.0".parse::<PgCronVersion>().is_err());
    }
}
