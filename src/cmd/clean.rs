//! The `clean` command: drop build artifacts from the checkout.

use super::super::Cli;
use ingot::buildlog::BuildLog;
use ingot::errors::InstallError;
use ingot::source::SourceRepository;
use ingot::toolchain::Toolchain;
use ingot::workflow::BuildDriver;

pub async fn cmd_clean(cli: &Cli, deep: bool) -> Result<(), InstallError> {
    let (config, paths) = super::load_environment(cli)?;
    let source = SourceRepository::new(paths.work_tree(), config.project.upstream.clone());
    if !source.is_cloned() {
        println!("Nothing to clean");
        return Ok(());
    }

    // distclean needs a generated Makefile; a never-configured tree has none
    if paths.work_tree().join("Makefile").exists() {
        let log = BuildLog::open(&paths.log_dir(), "clean")?;
        let driver = Toolchain::new(paths.work_tree(), config.project.make_jobs);
        driver.clean_artifacts(&log).await?;
    }

    if deep {
        source.purge_ignored()?;
        let cache = paths.cache_dir();
        if cache.exists() {
            std::fs::remove_dir_all(&cache)?;
        }
    }

    println!("Clean complete");
    Ok(())
}
