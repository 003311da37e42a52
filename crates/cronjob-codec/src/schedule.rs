use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use cron_descriptor::cronparser::cron_expression_descriptor;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ScheduleError;

static CRON_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+\s+\S+\s+\S+\s+\S+\s+\S+$").expect("valid regex"));

static SECONDS_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+seconds$").expect("valid regex"));

/// When a job fires: a five-field cron expression or a sub-minute interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    /// Minute, hour, day-of-month, month, day-of-week.
    Cron { expression: String },

    /// Every N seconds (`"<N> seconds"`), 1 to 59.
    Seconds { every: u32 },
}

impl Schedule {
    /// Human-readable sentence, e.g. "Every 5 minutes".
    pub fn describe(&self) -> std::result::Result<String, ScheduleError> {
        match self {
            Schedule::Cron { expression } => describe_cron(expression),
            Schedule::Seconds { every } => Ok(format!("Runs every {every} seconds")),
        }
    }

    pub fn is_seconds(&self) -> bool {
        matches!(self, Schedule::Seconds { .. })
    }

    /// The next `n` fire times strictly after `from` (UTC).
    pub fn upcoming(&self, from: DateTime<Utc>, n: usize) -> Vec<DateTime<Utc>> {
        match self {
            Schedule::Cron { expression } => match cron_schedule(expression) {
                Ok(schedule) => schedule.after(&from).take(n).collect(),
                Err(e) => {
                    warn!(%expression, "cron expression stopped parsing: {e}");
                    Vec::new()
                }
            },
            Schedule::Seconds { every } => (1_i64..)
                .take(n)
                .map_while(|k| {
                    let offset = k.checked_mul(i64::from(*every))?;
                    from.checked_add_signed(Duration::try_seconds(offset)?)
                })
                .collect(),
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Cron { expression } => write!(f, "{expression}"),
            Schedule::Seconds { every } => write!(f, "{every} seconds"),
        }
    }
}

impl FromStr for Schedule {
    type Err = ScheduleError;

    /// Accepts exactly the two shapes the job store understands. Cron
    /// expressions must satisfy both the `cron` parser and the describer;
    /// either one's message is passed through.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(caps) = SECONDS_SHAPE.captures(s) {
            let every: u64 = caps[1]
                .parse()
                .map_err(|_| ScheduleError::SecondsOutOfRange(u64::MAX))?;
            if !(1..=59).contains(&every) {
                return Err(ScheduleError::SecondsOutOfRange(every));
            }
            return Ok(Schedule::Seconds {
                every: every as u32,
            });
        }

        if CRON_SHAPE.is_match(s) {
            cron_schedule(s).map_err(|e| ScheduleError::InvalidCron(e.to_string()))?;
            let expression = s.split_whitespace().collect::<Vec<_>>().join(" ");
            describe_cron(&expression)?;
            return Ok(Schedule::Cron { expression });
        }

        Err(ScheduleError::Unrecognised)
    }
}

/// Parse and check `input`, rejecting seconds schedules when the installed
/// job store is too old for them.
pub fn validate_schedule(
    input: &str,
    supports_seconds: bool,
) -> std::result::Result<Schedule, ScheduleError> {
    let schedule: Schedule = input.parse()?;
    if schedule.is_seconds() && !supports_seconds {
        return Err(ScheduleError::SecondsUnsupported);
    }
    Ok(schedule)
}

/// Parse `input` and describe it in one step.
pub fn describe_schedule(input: &str) -> std::result::Result<String, ScheduleError> {
    input.parse::<Schedule>()?.describe()
}

fn describe_cron(expression: &str) -> std::result::Result<String, ScheduleError> {
    cron_expression_descriptor::get_description_cron(expression).map_err(|e| {
        ScheduleError::Undescribable(format!(
            "\"{}\" cannot be described (field {})",
            e.s, e.error_offset
        ))
    })
}

/// Build a `cron::Schedule` from a five-field expression.
///
/// The `cron` crate wants a leading seconds field and numbers weekdays
/// 1 (Sunday) to 7, whereas the job store uses 0 or 7 for Sunday.
fn cron_schedule(expression: &str) -> std::result::Result<cron::Schedule, cron::error::Error> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    let rewritten = match fields.as_slice() {
        [minute, hour, dom, month, dow] => {
            format!("0 {minute} {hour} {dom} {month} {}", rewrite_weekdays(dow))
        }
        _ => expression.to_string(),
    };
    cron::Schedule::from_str(&rewritten)
}

fn rewrite_weekdays(field: &str) -> String {
    field
        .split(',')
        .map(rewrite_weekday_part)
        .collect::<Vec<_>>()
        .join(",")
}

/// Numeric ranges are spelled out as lists, since 0 and 7 both map to
/// Sunday and a range like `0-7` or `5-7` would otherwise fold or wrap.
fn rewrite_weekday_part(part: &str) -> String {
    let (base, step) = match part.split_once('/') {
        Some((base, step)) => (base, Some(step)),
        None => (part, None),
    };

    if let Some((from, to)) = base.split_once('-') {
        let (Ok(from), Ok(to)) = (from.parse::<u32>(), to.parse::<u32>()) else {
            return part.to_string();
        };
        let step = match step.map(str::parse::<usize>) {
            None => 1,
            Some(Ok(step)) if step > 0 => step,
            Some(_) => return part.to_string(),
        };
        if from > to || to > 7 {
            return part.to_string();
        }
        let mut days: Vec<u32> = (from..=to).step_by(step).map(|n| n % 7 + 1).collect();
        days.sort_unstable();
        days.dedup();
        return days
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
    }

    let base = weekday_ordinal(base)
        .map(|o| o.to_string())
        .unwrap_or_else(|| base.to_string());
    match step {
        Some(step) => format!("{base}/{step}"),
        None => base,
    }
}

/// Job-store weekday number (0-7, Sunday = 0 or 7) to `cron` crate ordinal.
fn weekday_ordinal(token: &str) -> Option<u32> {
    let n: u32 = token.parse().ok()?;
    (n <= 7).then_some(n % 7 + 1)
}
