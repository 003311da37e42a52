//! Statements sent to the job store, and the form-level draft that
//! produces them.

use cronjob_core::DeploymentContext;
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result, ValidationErrors};
use crate::schedule::{validate_schedule, Schedule};
use crate::sql::{dollar_quote_tagged, quote_literal, unwrap_dollar_quoted};
use crate::types::{CommandText, JobSpec};
use crate::validate::validate_command;

/// `select cron.schedule('<name>', '<schedule>', <command>);`
///
/// `command` is embedded as-is when it is already dollar-quoted, otherwise
/// it is dollar-quoted with a tag that does not occur inside it.
pub fn schedule_statement(name: &str, schedule: &Schedule, command: &CommandText) -> String {
    format!(
        "select cron.schedule({}, {}, {});",
        quote_literal(name),
        quote_literal(&schedule.to_string()),
        command_argument(command)
    )
}

/// `select cron.unschedule('<name>');`
pub fn unschedule_statement(name: &str) -> String {
    format!("select cron.unschedule({});", quote_literal(name))
}

fn command_argument(command: &CommandText) -> String {
    let text = command.as_str();
    if unwrap_dollar_quoted(text).is_some() {
        text.trim().to_string()
    } else {
        dollar_quote_tagged(text)
    }
}

/// Capabilities of the job store that affect what a draft may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Whether `"<N> seconds"` schedules are accepted.
    pub supports_seconds: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            supports_seconds: true,
        }
    }
}

/// Everything the create/edit form submits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronJobDraft {
    pub name: String,
    pub schedule: String,
    pub spec: JobSpec,
}

impl CronJobDraft {
    pub fn new(name: impl Into<String>, schedule: impl Into<String>, spec: JobSpec) -> Self {
        Self {
            name: name.into(),
            schedule: schedule.into(),
            spec,
        }
    }

    /// Re-open a stored job for editing.
    pub fn from_stored(
        name: impl Into<String>,
        schedule: impl Into<String>,
        command: &str,
        ctx: &DeploymentContext,
    ) -> Self {
        Self::new(name, schedule, crate::decode::decode(command, ctx))
    }

    /// Check name, schedule and spec fields together. Spec field names are
    /// prefixed with `values.`.
    pub fn validate(
        &self,
        ctx: &DeploymentContext,
        options: ValidationOptions,
    ) -> std::result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.name.trim().is_empty() {
            errors.push("name", "Please provide a name for your cron job");
        }
        if let Err(e) = validate_schedule(&self.schedule, options.supports_seconds) {
            errors.push("schedule", e.to_string());
        }
        if let Err(spec_errors) = validate_command(&self.spec.command, ctx) {
            errors.extend_prefixed("values", spec_errors);
        }
        errors.into_result()
    }

    /// Validate, encode and wrap in a registration statement.
    pub fn to_statement(
        &self,
        ctx: &DeploymentContext,
        options: ValidationOptions,
    ) -> Result<String> {
        self.validate(ctx, options).map_err(CodecError::Validation)?;
        let schedule: Schedule = self.schedule.parse()?;
        let command = self.spec.encode()?;
        Ok(schedule_statement(self.name.trim(), &schedule, &command))
    }
}
