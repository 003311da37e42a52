use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur within the codec.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The schedule string is not a usable cron or seconds expression.
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(#[from] ScheduleError),

    /// One or more user-correctable field checks failed.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Encode was handed a spec that breaks its own invariants. This is a
    /// caller bug: specs must be validated before they are encoded.
    #[error("Internal invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// Why a schedule string was rejected. The `Display` text is shown to the
/// user next to the schedule field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// Neither the five-field cron shape nor the `"<N> seconds"` shape.
    #[error("Invalid Cron format")]
    Unrecognised,

    /// Five fields, but the cron parser rejected them.
    #[error("Invalid Cron format: {0}")]
    InvalidCron(String),

    /// The cron describer could not read the expression.
    #[error("Invalid Cron format: {0}")]
    Undescribable(String),

    #[error("Seconds must be between 1 and 59, got {0}")]
    SecondsOutOfRange(u64),

    #[error("Seconds are supported only in pg_cron v1.5.0+. Please use a valid Cron format.")]
    SecondsUnsupported,
}

/// A single user-facing message attached to a form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every field error found in one validation pass, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Append `other`, prefixing each field with `prefix.`.
    pub fn extend_prefixed(&mut self, prefix: &str, other: ValidationErrors) {
        for e in other.errors {
            self.push(format!("{prefix}.{}", e.field), e.message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// First message recorded for `field`, if any.
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> std::result::Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl From<ValidationErrors> for CodecError {
    fn from(errors: ValidationErrors) -> Self {
        CodecError::Validation(errors)
    }
}
