//! `cronjob-codec` — translates between structured scheduled-job
//! descriptions and the SQL command text a pg_cron job store persists.
//!
//! # Overview
//!
//! [`encode()`] turns a validated [`JobSpec`] into [`CommandText`];
//! [`decode()`] recovers a best-effort [`JobSpec`] from any stored text and
//! never fails. [`Schedule`] validates and describes the job's schedule, and
//! [`CronJobDraft`] ties name, schedule and spec into a registration
//! statement.
//!
//! # Job variants
//!
//! | Variant            | Stored as                                         |
//! |--------------------|---------------------------------------------------|
//! | `SqlSnippet`       | The SQL itself                                    |
//! | `SqlFunctionCall`  | `SELECT <schema>.<function>()`                    |
//! | `HttpRequest`      | `select net.http_get(...)` / `net.http_post(...)` |
//! | `EdgeFunctionCall` | Same as `HttpRequest`, URL on the deployment      |

pub mod decode;
pub mod encode;
pub mod error;
pub mod schedule;
pub mod sql;
pub mod statement;
pub mod types;
pub mod validate;

pub use cronjob_core::DeploymentContext;
pub use decode::decode;
pub use encode::encode;
pub use error::{CodecError, FieldError, Result, ScheduleError, ValidationErrors};
pub use schedule::{describe_schedule, validate_schedule, Schedule};
pub use statement::{schedule_statement, unschedule_statement, CronJobDraft, ValidationOptions};
pub use types::{CommandText, HttpHeader, HttpMethod, HttpRequest, JobCommand, JobKind, JobSpec};
pub use validate::validate_command;
