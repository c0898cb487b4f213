//! The `releases` command: list installable versions from upstream tags.

use console::style;

use super::super::Cli;
use ingot::errors::InstallError;
use ingot::source::SourceRepository;
use ingot::workflow::SourceControl;

pub async fn cmd_releases(cli: &Cli) -> Result<(), InstallError> {
    let (config, paths) = super::load_environment(cli)?;
    let source = SourceRepository::new(paths.work_tree(), config.project.upstream.clone());
    source.ensure_cloned()?;
    source.fetch_latest().await?;

    let releases = source.list_releases()?;
    if releases.is_empty() {
        println!("No release tags found in {}", config.project.upstream);
        return Ok(());
    }

    println!("{} releases available:", releases.len());
    for release in &releases {
        let installed = paths.prefix(release).join("bin").join("php").exists();
        if installed {
            println!("  {} {release}", style("*").green().bold());
        } else {
            println!("    {release}");
        }
    }
    println!();
    println!("  {} installed", style("*").green().bold());
    Ok(())
}
