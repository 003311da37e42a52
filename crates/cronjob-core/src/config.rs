use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::{DeploymentContext, PgCronVersion};

pub const DEFAULT_FUNCTIONS_DOMAIN: &str = "supabase.co";
pub const DEFAULT_SCHEDULE: &str = "*/5 * * * *";
pub const DEFAULT_TIMEOUT_MS: u32 = 1000;

/// Top-level config (cronjob.toml + CRONJOB_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CronjobConfig {
    #[serde(default)]
    pub deployment: DeploymentConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Which deployment edge-function URLs are recognised against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Project reference, used as the subdomain of the functions host.
    pub project_ref: Option<String>,
    #[serde(default = "default_functions_domain")]
    pub functions_domain: String,
    /// Explicit invocation prefix, e.g. `http://localhost:54321/functions/v1`.
    /// Takes precedence over `project_ref`.
    pub functions_url: Option<String>,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            project_ref: None,
            functions_domain: default_functions_domain(),
            functions_url: None,
        }
    }
}

/// Job store capabilities and form defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Installed pg_cron version. When unset, seconds schedules are allowed.
    pub pg_cron_version: Option<String>,
    #[serde(default = "default_schedule")]
    pub default_schedule: String,
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            pg_cron_version: None,
            default_schedule: default_schedule(),
            default_timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_functions_domain() -> String {
    DEFAULT_FUNCTIONS_DOMAIN.to_string()
}
fn default_schedule() -> String {
    DEFAULT_SCHEDULE.to_string()
}
fn default_timeout_ms() -> u32 {
    DEFAULT_TIMEOUT_MS
}

impl CronjobConfig {
    /// Load config from a TOML file with CRONJOB_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.cronjob/cronjob.toml
    ///
    /// A missing file is not an error; defaults and env vars still apply.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: CronjobConfig = Figment::from(Serialized::defaults(CronjobConfig::default()))
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CRONJOB_").split("__"))
            .extract()
            .map_err(|e| CoreError::Config(e.to_string()))?;

        tracing::debug!(path = %path, "configuration loaded");
        Ok(config)
    }

    /// The deployment edge-function URLs are matched against.
    pub fn deployment_context(&self) -> Result<DeploymentContext> {
        let deployment = &self.deployment;
        if let Some(url) = deployment.functions_url.as_deref() {
            return DeploymentContext::new(url);
        }
        match deployment.project_ref.as_deref() {
            Some(project_ref) if !project_ref.trim().is_empty() => {
                DeploymentContext::for_project(project_ref.trim(), &deployment.functions_domain)
            }
            _ => Err(CoreError::Config(
                "either deployment.functions_url or deployment.project_ref must be set"
                    .to_string(),
            )),
        }
    }

    /// Parsed pg_cron version, if one is configured.
    pub fn pg_cron_version(&self) -> Result<Option<PgCronVersion>> {
        self.scheduler
            .pg_cron_version
            .as_deref()
            .map(str::parse)
            .transpose()
    }

    /// Whether `"<N> seconds"` schedules may be saved.
    pub fn supports_seconds(&self) -> Result<bool> {
        Ok(self
            .pg_cron_version()?
            .map_or(true, |v| v.supports_seconds()))
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cronjob/cronjob.toml", home)
}
