//! The resumable install workflow.
//!
//! A run walks the steps of [`Step::ALL`] strictly in order. Each step is
//! dispatched to a collaborator behind a trait seam, so the run loop owns
//! only the sequencing rules: skip steps at or below the continuation
//! cursor, stop at the first failure, record the last completed index for
//! the resume hint.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::buildlog::BuildLog;
use crate::errors::InstallError;
use crate::options::ConfigureOptionSet;
use crate::release::Release;
use crate::reporter::StepReporter;
use crate::step::Step;

/// Source checkout operations used by the Fetch and Branch steps.
#[async_trait]
pub trait SourceControl: Send + Sync {
    async fn fetch_latest(&self) -> Result<(), InstallError>;
    async fn reset_and_clean(&self) -> Result<(), InstallError>;
    async fn checkout_branch(&self, branch: &str, tag: &str) -> Result<(), InstallError>;
}

/// Source patch application for the Patch step.
#[async_trait]
pub trait PatchSet: Send + Sync {
    /// Apply every patch matching the release; returns how many applied.
    async fn apply_applicable(
        &self,
        log: &BuildLog,
        release: &Release,
    ) -> Result<usize, InstallError>;
}

/// Build toolchain operations for the Configure and Compile steps.
#[async_trait]
pub trait BuildDriver: Send + Sync {
    async fn configure(&self, log: &BuildLog, args: &[String]) -> Result<(), InstallError>;
    async fn compile_and_install(&self, log: &BuildLog) -> Result<(), InstallError>;
    async fn clean_artifacts(&self, log: &BuildLog) -> Result<(), InstallError>;
}

/// php.ini installation for the WriteConfig step.
#[async_trait]
pub trait IniWriter: Send + Sync {
    /// Install the configuration file; returns the written path.
    async fn write_config(
        &self,
        log: &BuildLog,
        selector: Option<&str>,
    ) -> Result<PathBuf, InstallError>;
}

/// Package manager bootstrap for the BootstrapPear step.
#[async_trait]
pub trait Bootstrap: Send + Sync {
    /// Install the package manager when the release supports it; returns
    /// false when the release is too old and the step was a no-op.
    async fn install_if_compatible(
        &self,
        log: &BuildLog,
        release: &Release,
    ) -> Result<bool, InstallError>;
}

/// Extension builds for the BuildExtensions step.
#[async_trait]
pub trait ExtensionSet: Send + Sync {
    async fn build_all(
        &self,
        log: &BuildLog,
        extensions: &[String],
    ) -> Result<usize, InstallError>;
}

/// The collaborators one run dispatches to.
pub struct Collaborators<'a> {
    pub source: &'a dyn SourceControl,
    pub patches: &'a dyn PatchSet,
    pub driver: &'a dyn BuildDriver,
    pub ini: &'a dyn IniWriter,
    pub bootstrap: &'a dyn Bootstrap,
    pub extensions: &'a dyn ExtensionSet,
}

/// What to build: composed configure flags, ini selector, extensions.
pub struct InstallPlan {
    pub options: ConfigureOptionSet,
    pub ini: Option<String>,
    pub extensions: Vec<String>,
}

/// Bookkeeping for one run: the target release, its install prefix, the
/// continuation cursor, and the highest completed step index.
#[derive(Debug)]
pub struct WorkflowState {
    release: Release,
    install_prefix: PathBuf,
    resume_from: Option<usize>,
    completed: Option<usize>,
}

impl WorkflowState {
    /// Validate the continuation cursor against the step range.
    pub fn new(
        release: Release,
        install_prefix: PathBuf,
        resume_from: Option<usize>,
    ) -> Result<Self, InstallError> {
        if let Some(cursor) = resume_from
            && cursor >= Step::COUNT
        {
            return Err(InstallError::ResumeOutOfRange {
                given: cursor,
                max: Step::COUNT - 1,
            });
        }
        Ok(Self {
            release,
            install_prefix,
            resume_from,
            completed: resume_from,
        })
    }

    pub fn release(&self) -> &Release {
        &self.release
    }

    /// Destination directory for the completed build.
    pub fn install_prefix(&self) -> &std::path::Path {
        &self.install_prefix
    }

    /// True for steps the continuation cursor marks as already done.
    pub fn should_skip(&self, step: Step) -> bool {
        matches!(self.resume_from, Some(cursor) if step.index() <= cursor)
    }

    fn mark_done(&mut self, step: Step) {
        self.completed = Some(step.index());
    }

    /// Index of the last completed step, counting skipped ones.
    pub fn completed(&self) -> Option<usize> {
        self.completed
    }

    /// The working branch name for this release.
    pub fn branch_name(&self) -> String {
        format!("build-{}", self.release.raw())
    }
}

/// Run the pipeline from the state's cursor to the end.
pub async fn run(
    state: &mut WorkflowState,
    plan: &InstallPlan,
    collab: &Collaborators<'_>,
    log: &BuildLog,
    reporter: &StepReporter,
) -> Result<(), InstallError> {
    for step in Step::ALL {
        if state.should_skip(step) {
            debug!(%step, "step below continuation cursor");
            log.line(step.label(), "omitted")?;
            reporter.step_omitted(step);
            continue;
        }
        info!(%step, "running step");
        log.line(step.label(), "starting")?;
        reporter.report(step, "running");
        execute(step, state, plan, collab, log, reporter).await?;
        state.mark_done(step);
        log.line(step.label(), "done")?;
        reporter.step_done(step);
    }
    Ok(())
}

async fn execute(
    step: Step,
    state: &WorkflowState,
    plan: &InstallPlan,
    collab: &Collaborators<'_>,
    log: &BuildLog,
    reporter: &StepReporter,
) -> Result<(), InstallError> {
    match step {
        Step::Fetch => {
            collab.source.fetch_latest().await?;
            collab.source.reset_and_clean().await?;
        }
        Step::Branch => {
            let tag = state.release().tag();
            collab
                .source
                .checkout_branch(&state.branch_name(), &tag)
                .await?;
        }
        Step::Patch => {
            let applied = collab.patches.apply_applicable(log, state.release()).await?;
            if applied == 0 {
                reporter.report(step, "no patches for this release");
            }
        }
        Step::Configure => {
            let args = plan.options.to_args();
            collab.driver.configure(log, &args).await?;
        }
        Step::Compile => {
            collab.driver.compile_and_install(log).await?;
        }
        Step::WriteConfig => {
            let path = collab.ini.write_config(log, plan.ini.as_deref()).await?;
            reporter.report(step, &format!("wrote {}", path.display()));
        }
        Step::BootstrapPear => {
            let installed = collab
                .bootstrap
                .install_if_compatible(log, state.release())
                .await?;
            if !installed {
                reporter.report(step, "not supported by this release, skipping");
            }
        }
        Step::BuildExtensions => {
            let built = collab.extensions.build_all(log, &plan.extensions).await?;
            reporter.report(step, &format!("{built} extensions built"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct Recorder {
        calls: Mutex<Vec<String>>,
        fail_at: Option<(Step, i32)>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_at: None,
            }
        }

        fn failing_at(step: Step, code: i32) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_at: Some((step, code)),
            }
        }

        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }

        fn check(&self, step: Step) -> Result<(), InstallError> {
            if let Some((fail_step, code)) = self.fail_at
                && fail_step == step
            {
                return Err(InstallError::ToolFailed {
                    step,
                    program: "make".to_string(),
                    code,
                });
            }
            Ok(())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SourceControl for Recorder {
        async fn fetch_latest(&self) -> Result<(), InstallError> {
            self.record("fetch_latest");
            self.check(Step::Fetch)
        }

        async fn reset_and_clean(&self) -> Result<(), InstallError> {
            self.record("reset_and_clean");
            Ok(())
        }

        async fn checkout_branch(&self, branch: &str, tag: &str) -> Result<(), InstallError> {
            self.record(&format!("checkout_branch {branch} {tag}"));
            self.check(Step::Branch)
        }
    }

    #[async_trait]
    impl PatchSet for Recorder {
        async fn apply_applicable(
            &self,
            _log: &BuildLog,
            _release: &Release,
        ) -> Result<usize, InstallError> {
            self.record("apply_applicable");
            self.check(Step::Patch)?;
            Ok(0)
        }
    }

    #[async_trait]
    impl BuildDriver for Recorder {
        async fn configure(&self, _log: &BuildLog, args: &[String]) -> Result<(), InstallError> {
            self.record(&format!("configure [{}]", args.len()));
            self.check(Step::Configure)
        }

        async fn compile_and_install(&self, _log: &BuildLog) -> Result<(), InstallError> {
            self.record("compile_and_install");
            self.check(Step::Compile)
        }

        async fn clean_artifacts(&self, _log: &BuildLog) -> Result<(), InstallError> {
            self.record("clean_artifacts");
            Ok(())
        }
    }

    #[async_trait]
    impl IniWriter for Recorder {
        async fn write_config(
            &self,
            _log: &BuildLog,
            _selector: Option<&str>,
        ) -> Result<PathBuf, InstallError> {
            self.record("write_config");
            self.check(Step::WriteConfig)?;
            Ok(PathBuf::from("/tmp/php.ini"))
        }
    }

    #[async_trait]
    impl Bootstrap for Recorder {
        async fn install_if_compatible(
            &self,
            _log: &BuildLog,
            _release: &Release,
        ) -> Result<bool, InstallError> {
            self.record("install_if_compatible");
            self.check(Step::BootstrapPear)?;
            Ok(true)
        }
    }

    #[async_trait]
    impl ExtensionSet for Recorder {
        async fn build_all(
            &self,
            _log: &BuildLog,
            extensions: &[String],
        ) -> Result<usize, InstallError> {
            self.record("build_all");
            self.check(Step::BuildExtensions)?;
            Ok(extensions.len())
        }
    }

    fn collaborators(recorder: &Recorder) -> Collaborators<'_> {
        Collaborators {
            source: recorder,
            patches: recorder,
            driver: recorder,
            ini: recorder,
            bootstrap: recorder,
            extensions: recorder,
        }
    }

    fn plan() -> InstallPlan {
        InstallPlan {
            options: ConfigureOptionSet::new(),
            ini: None,
            extensions: Vec::new(),
        }
    }

    fn release() -> Release {
        Release::parse("8.3.7").unwrap()
    }

    fn prefix() -> PathBuf {
        PathBuf::from("/opt/php/versions/8.3.7")
    }

    #[tokio::test]
    async fn full_run_dispatches_every_step_in_order() {
        let dir = tempdir().unwrap();
        let log = BuildLog::open(dir.path(), "8.3.7").unwrap();
        let reporter = StepReporter::new(false);
        let recorder = Recorder::new();
        let collab = collaborators(&recorder);
        let mut state = WorkflowState::new(release(), prefix(), None).unwrap();

        run(&mut state, &plan(), &collab, &log, &reporter).await.unwrap();

        assert_eq!(
            recorder.calls(),
            vec![
                "fetch_latest",
                "reset_and_clean",
                "checkout_branch build-8.3.7 php-8.3.7",
                "apply_applicable",
                "configure [0]",
                "compile_and_install",
                "write_config",
                "install_if_compatible",
                "build_all",
            ]
        );
        assert_eq!(state.completed(), Some(Step::COUNT - 1));
        assert_eq!(reporter.steps_done(), Step::COUNT);
    }

    #[tokio::test]
    async fn continuation_skips_steps_at_or_below_the_cursor() {
        let dir = tempdir().unwrap();
        let log = BuildLog::open(dir.path(), "8.3.7").unwrap();

        for cursor in 0..Step::COUNT {
            let reporter = StepReporter::new(false);
            let recorder = Recorder::new();
            let collab = collaborators(&recorder);
            let mut state = WorkflowState::new(release(), prefix(), Some(cursor)).unwrap();

            run(&mut state, &plan(), &collab, &log, &reporter).await.unwrap();

            let calls = recorder.calls();
            if cursor == Step::COUNT - 1 {
                assert!(calls.is_empty());
            } else {
                // the cursor always covers Fetch, so it must never dispatch
                assert!(!calls.iter().any(|c| c == "fetch_latest"));
                let first_expected = match Step::from_index(cursor + 1).unwrap() {
                    Step::Branch => "checkout_branch build-8.3.7 php-8.3.7",
                    Step::Patch => "apply_applicable",
                    Step::Configure => "configure [0]",
                    Step::Compile => "compile_and_install",
                    Step::WriteConfig => "write_config",
                    Step::BootstrapPear => "install_if_compatible",
                    Step::BuildExtensions => "build_all",
                    Step::Fetch => "fetch_latest",
                };
                assert_eq!(calls.first().map(String::as_str), Some(first_expected));
            }
            assert_eq!(state.completed(), Some(Step::COUNT - 1));
            assert_eq!(reporter.steps_done(), Step::COUNT);
        }
    }

    #[test]
    fn out_of_range_cursor_is_rejected_up_front() {
        let err = WorkflowState::new(release(), prefix(), Some(Step::COUNT)).unwrap_err();
        assert!(matches!(
            err,
            InstallError::ResumeOutOfRange { given: 8, max: 7 }
        ));
        assert!(err.is_validation());
    }

    #[test]
    fn last_valid_cursor_is_accepted() {
        let state = WorkflowState::new(release(), prefix(), Some(Step::COUNT - 1)).unwrap();
        assert!(state.should_skip(Step::BuildExtensions));
    }

    #[test]
    fn skip_rule_is_inclusive_of_the_cursor() {
        let state = WorkflowState::new(release(), prefix(), Some(3)).unwrap();
        assert!(state.should_skip(Step::Fetch));
        assert!(state.should_skip(Step::Configure));
        assert!(!state.should_skip(Step::Compile));
    }

    #[test]
    fn fresh_state_skips_nothing() {
        let state = WorkflowState::new(release(), prefix(), None).unwrap();
        for step in Step::ALL {
            assert!(!state.should_skip(step));
        }
        assert_eq!(state.completed(), None);
        assert_eq!(state.install_prefix(), prefix().as_path());
    }

    #[tokio::test]
    async fn compile_failure_stops_the_run_and_keeps_the_cursor() {
        let dir = tempdir().unwrap();
        let log = BuildLog::open(dir.path(), "8.3.7").unwrap();
        let reporter = StepReporter::new(false);
        let recorder = Recorder::failing_at(Step::Compile, 2);
        let collab = collaborators(&recorder);
        let mut state = WorkflowState::new(release(), prefix(), None).unwrap();

        let err = run(&mut state, &plan(), &collab, &log, &reporter)
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), 2);
        assert_eq!(state.completed(), Some(Step::Configure.index()));
        assert_eq!(reporter.steps_done(), 4);
        assert!(!recorder.calls().iter().any(|c| c == "write_config"));
    }

    #[tokio::test]
    async fn resumed_run_failure_still_points_at_the_real_cursor() {
        let dir = tempdir().unwrap();
        let log = BuildLog::open(dir.path(), "8.3.7").unwrap();
        let reporter = StepReporter::new(false);
        let recorder = Recorder::failing_at(Step::Compile, 2);
        let collab = collaborators(&recorder);
        let mut state = WorkflowState::new(release(), prefix(), Some(3)).unwrap();

        let err = run(&mut state, &plan(), &collab, &log, &reporter)
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), 2);
        assert_eq!(state.completed(), Some(3));
        assert_eq!(reporter.steps_done(), 4);
    }
}
