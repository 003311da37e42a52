//! `cronjob-core` — configuration, errors and deployment identity shared by
//! the codec and the CLI.

pub mod config;
pub mod error;
pub mod types;

pub use config::CronjobConfig;
pub use error::{CoreError, Result};
pub use types::{DeploymentContext, PgCronVersion};
