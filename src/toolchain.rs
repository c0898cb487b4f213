//! Build toolchain invocation.
//!
//! All external tools run through one spawn path: stdin closed, stdout
//! wired to the full log, stderr to the error log, non-zero exit mapped
//! to the tool's own status code.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::buildlog::BuildLog;
use crate::errors::InstallError;
use crate::step::Step;
use crate::workflow::BuildDriver;

/// Spawn a tool with its output wired into the build log and wait for it.
pub(crate) async fn run_logged(
    step: Step,
    log: &BuildLog,
    cwd: &Path,
    program: &str,
    args: &[&str],
) -> Result<(), InstallError> {
    log.line(step.label(), &format!("running {} {}", program, args.join(" ")))?;
    debug!(%step, program, ?args, cwd = %cwd.display(), "spawning tool");
    let status = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(log.stdout_sink()?)
        .stderr(log.stderr_sink()?)
        .status()
        .await?;
    if status.success() {
        Ok(())
    } else {
        Err(InstallError::ToolFailed {
            step,
            program: program.to_string(),
            code: status.code().unwrap_or(1),
        })
    }
}

/// The autotools build driver for the source checkout.
pub struct Toolchain {
    work_tree: PathBuf,
    jobs: u32,
}

impl Toolchain {
    pub fn new(work_tree: PathBuf, jobs: u32) -> Self {
        Self { work_tree, jobs }
    }
}

#[async_trait]
impl BuildDriver for Toolchain {
    /// Regenerate the configure script, then run it with the composed flags.
    async fn configure(&self, log: &BuildLog, args: &[String]) -> Result<(), InstallError> {
        run_logged(
            Step::Configure,
            log,
            &self.work_tree,
            "./buildconf",
            &["--force"],
        )
        .await?;
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        run_logged(Step::Configure, log, &self.work_tree, "./configure", &arg_refs).await
    }

    /// Run make, then install into the configured prefix.
    async fn compile_and_install(&self, log: &BuildLog) -> Result<(), InstallError> {
        let jobs = format!("-j{}", self.jobs);
        run_logged(Step::Compile, log, &self.work_tree, "make", &[&jobs]).await?;
        run_logged(Step::Compile, log, &self.work_tree, "make", &["install"]).await
    }

    /// Drop generated build artifacts from the checkout.
    async fn clean_artifacts(&self, log: &BuildLog) -> Result<(), InstallError> {
        run_logged(Step::Compile, log, &self.work_tree, "make", &["distclean"]).await
    }
}
