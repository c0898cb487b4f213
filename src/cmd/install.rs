//! The `install` command: run the full pipeline for one release.

use std::time::Duration;

use dialoguer::Confirm;
use tracing::warn;

use super::super::Cli;
use ingot::buildlog::BuildLog;
use ingot::errors::InstallError;
use ingot::extensions::ExtensionBuilder;
use ingot::inifile::IniFileWriter;
use ingot::lock::TargetLock;
use ingot::options;
use ingot::patches::PatchApplier;
use ingot::pear::PearBootstrap;
use ingot::release::Release;
use ingot::reporter::StepReporter;
use ingot::source::SourceRepository;
use ingot::toolchain::Toolchain;
use ingot::workflow::{self, Collaborators, InstallPlan, SourceControl, WorkflowState};

const PROMPT_TIMEOUT_SECS: u64 = 30;

enum RunOutcome {
    Finished(Result<(), InstallError>),
    Interrupted,
}

pub async fn cmd_install(
    cli: &Cli,
    target: &str,
    variant: Option<&str>,
    continue_from: Option<usize>,
    ini: Option<&str>,
) -> Result<(), InstallError> {
    let release = Release::parse(target)?;
    let (config, paths) = super::load_environment(cli)?;
    let mut state = WorkflowState::new(
        release.clone(),
        paths.prefix(release.raw()),
        continue_from,
    )?;
    let variant_config = match variant {
        Some(name) => config.variant(name)?.clone(),
        None => Default::default(),
    };

    let _lock = TargetLock::acquire(&paths.locks_dir(), release.raw())?;

    let source = SourceRepository::new(paths.work_tree(), config.project.upstream.clone());
    source.ensure_cloned()?;
    let mut known = source.list_releases()?;
    if release.validate(&known).is_err() {
        warn!(release = release.raw(), "release not in local tags, refetching");
        source.fetch_latest().await?;
        known = source.list_releases()?;
    }
    release.validate(&known)?;

    let prefix = state.install_prefix().to_path_buf();
    if prefix.exists() && continue_from.is_none() && !cli.yes && !confirm_reinstall(&release, &prefix).await {
        println!("Install cancelled");
        return Ok(());
    }

    let log = BuildLog::open(&paths.log_dir(), release.raw())?;
    let reporter = StepReporter::new(cli.verbose);
    reporter.print_plain(&format!(
        "Installing {} into {}",
        release.raw(),
        prefix.display()
    ));

    let patches = PatchApplier::new(paths.work_tree(), paths.patches_dir());
    let driver = Toolchain::new(paths.work_tree(), config.project.make_jobs);
    let ini_writer = IniFileWriter::new(paths.work_tree(), prefix.clone());
    let bootstrap = PearBootstrap::new(prefix.clone(), paths.cache_dir());
    let extensions = ExtensionBuilder::new(paths.work_tree(), prefix.clone());
    let collab = Collaborators {
        source: &source,
        patches: &patches,
        driver: &driver,
        ini: &ini_writer,
        bootstrap: &bootstrap,
        extensions: &extensions,
    };

    let plan = InstallPlan {
        options: options::compose(&config.defaults.options, &variant_config.options, &prefix),
        ini: ini.map(str::to_string),
        extensions: variant_config.extensions.clone(),
    };

    let outcome = tokio::select! {
        result = workflow::run(&mut state, &plan, &collab, &log, &reporter) => {
            RunOutcome::Finished(result)
        }
        _ = tokio::signal::ctrl_c() => RunOutcome::Interrupted,
    };

    match outcome {
        RunOutcome::Finished(Ok(())) => {
            reporter.success_summary(release.raw(), state.install_prefix());
            Ok(())
        }
        RunOutcome::Finished(Err(err)) => {
            let mut tail = Vec::new();
            if log.summarize(&mut tail).is_ok() {
                for line in String::from_utf8_lossy(&tail).lines() {
                    reporter.print_plain(line);
                }
            }
            reporter.failure_summary(&err.to_string(), state.completed());
            Err(err)
        }
        RunOutcome::Interrupted => {
            reporter.failure_summary("interrupted", state.completed());
            drop(log);
            std::process::exit(130);
        }
    }
}

/// Ask whether to install over an existing prefix. The prompt is
/// time-boxed and falls back to its default answer, continue, when the
/// operator stays silent or no terminal is attached.
async fn confirm_reinstall(release: &Release, prefix: &std::path::Path) -> bool {
    let prompt = format!(
        "{} is already installed at {}. Reinstall?",
        release.raw(),
        prefix.display()
    );
    let answer = tokio::time::timeout(
        Duration::from_secs(PROMPT_TIMEOUT_SECS),
        tokio::task::spawn_blocking(move || {
            Confirm::new()
                .with_prompt(prompt)
                .default(true)
                .interact()
                .unwrap_or(true)
        }),
    )
    .await;
    match answer {
        Ok(Ok(choice)) => choice,
        _ => true,
    }
}
