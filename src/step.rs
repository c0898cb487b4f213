//! The ordered steps of an install run.
//!
//! Steps run strictly in index order. The continuation cursor from
//! `--continue <c>` marks every step with index `<= c` as already done,
//! so a resumed run picks up at `c + 1`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single stage of the install pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Fetch,
    Branch,
    Patch,
    Configure,
    Compile,
    WriteConfig,
    BootstrapPear,
    BuildExtensions,
}

impl Step {
    /// All steps in execution order.
    pub const ALL: [Step; 8] = [
        Step::Fetch,
        Step::Branch,
        Step::Patch,
        Step::Configure,
        Step::Compile,
        Step::WriteConfig,
        Step::BootstrapPear,
        Step::BuildExtensions,
    ];

    /// Total number of steps.
    pub const COUNT: usize = Self::ALL.len();

    /// Zero-based position of this step in the run order.
    pub fn index(self) -> usize {
        match self {
            Step::Fetch => 0,
            Step::Branch => 1,
            Step::Patch => 2,
            Step::Configure => 3,
            Step::Compile => 4,
            Step::WriteConfig => 5,
            Step::BootstrapPear => 6,
            Step::BuildExtensions => 7,
        }
    }

    /// Step at the given index, if any.
    pub fn from_index(index: usize) -> Option<Step> {
        Self::ALL.get(index).copied()
    }

    /// Short human-readable label used in log lines and progress output.
    pub fn label(self) -> &'static str {
        match self {
            Step::Fetch => "fetch sources",
            Step::Branch => "branch release",
            Step::Patch => "apply patches",
            Step::Configure => "configure",
            Step::Compile => "compile and install",
            Step::WriteConfig => "write php.ini",
            Step::BootstrapPear => "bootstrap pear",
            Step::BuildExtensions => "build extensions",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
