//! Typed error hierarchy for the install pipeline.
//!
//! Failures fall into three classes with distinct exit behavior:
//! - validation failures (bad release, bad variant, bad cursor) exit with
//!   the sentinel code 3 before any build work starts
//! - external tool failures propagate the tool's own exit status
//! - everything else (IO, git, HTTP) exits with 1

use std::path::PathBuf;

use thiserror::Error;

use crate::step::Step;

/// Exit code for input validation failures.
pub const VALIDATION_EXIT_CODE: i32 = 3;

/// Errors from the install pipeline and its collaborators.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Unknown release '{target}': no matching tag upstream")]
    UnknownRelease { target: String },

    #[error("Unknown variant '{name}': not defined in configuration")]
    UnknownVariant { name: String },

    #[error("Continuation step {given} is out of range (last step is {max})")]
    ResumeOutOfRange { given: usize, max: usize },

    #[error("Another install for '{target}' is already running")]
    InstallBusy { target: String },

    #[error("{program} failed with exit code {code} during {step}")]
    ToolFailed {
        step: Step,
        program: String,
        code: i32,
    },

    #[error("Missing {what} at {path} during {step}")]
    MissingEnvironment {
        step: Step,
        what: &'static str,
        path: PathBuf,
    },

    #[error(transparent)]
    Git(#[from] git2::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl InstallError {
    /// True for errors caused by bad user input rather than a failed build.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            InstallError::UnknownRelease { .. }
                | InstallError::UnknownVariant { .. }
                | InstallError::ResumeOutOfRange { .. }
                | InstallError::InstallBusy { .. }
        )
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            e if e.is_validation() => VALIDATION_EXIT_CODE,
            InstallError::ToolFailed { code, .. } => *code,
            _ => 1,
        }
    }
}
