//! php.ini installation.
//!
//! The source tree ships ini templates; one is selected, amended with the
//! prefix-local paths, and written to `<prefix>/etc/php.ini`. The selector
//! is either an explicit file path or a template suffix ("development"
//! selects `php.ini-development`). Without a selector the production
//! template is used, falling back to the `php.ini-dist` name older
//! releases shipped.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::buildlog::BuildLog;
use crate::errors::InstallError;
use crate::step::Step;
use crate::workflow::IniWriter;

const DEFAULT_TEMPLATES: [&str; 2] = ["php.ini-production", "php.ini-dist"];

/// Selects and installs the ini template for one prefix.
pub struct IniFileWriter {
    work_tree: PathBuf,
    prefix: PathBuf,
}

impl IniFileWriter {
    pub fn new(work_tree: PathBuf, prefix: PathBuf) -> Self {
        Self { work_tree, prefix }
    }

    /// Resolve the selector to a template file.
    fn template(&self, selector: Option<&str>) -> Result<PathBuf, InstallError> {
        match selector {
            Some(selector) => {
                let as_path = Path::new(selector);
                if as_path.is_file() {
                    return Ok(as_path.to_path_buf());
                }
                let suffixed = self.work_tree.join(format!("php.ini-{selector}"));
                if suffixed.is_file() {
                    return Ok(suffixed);
                }
                Err(InstallError::MissingEnvironment {
                    step: Step::WriteConfig,
                    what: "ini template",
                    path: suffixed,
                })
            }
            None => {
                for name in DEFAULT_TEMPLATES {
                    let candidate = self.work_tree.join(name);
                    if candidate.is_file() {
                        return Ok(candidate);
                    }
                }
                Err(InstallError::MissingEnvironment {
                    step: Step::WriteConfig,
                    what: "ini template",
                    path: self.work_tree.join(DEFAULT_TEMPLATES[0]),
                })
            }
        }
    }
}

#[async_trait]
impl IniWriter for IniFileWriter {
    async fn write_config(
        &self,
        log: &BuildLog,
        selector: Option<&str>,
    ) -> Result<PathBuf, InstallError> {
        let template = self.template(selector)?;
        info!(template = %template.display(), "installing php.ini");
        log.line(
            Step::WriteConfig.label(),
            &format!("using template {}", template.display()),
        )?;

        let mut contents = std::fs::read_to_string(&template)?;
        if !contents.ends_with('\n') {
            contents.push('\n');
        }
        let lib = self.prefix.join("lib").join("php");
        contents.push_str("\n; added by the installer\n");
        contents.push_str(&format!("include_path = \".:{}\"\n", lib.display()));
        contents.push_str(&format!(
            "extension_dir = \"{}\"\n",
            lib.join("extensions").display()
        ));

        let etc = self.prefix.join("etc");
        std::fs::create_dir_all(etc.join("conf.d"))?;
        let target = etc.join("php.ini");
        std::fs::write(&target, contents)?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn writer(dir: &Path) -> IniFileWriter {
        IniFileWriter::new(dir.join("php-src"), dir.join("prefix"))
    }

    fn seed_template(dir: &Path, name: &str) {
        let work = dir.join("php-src");
        std::fs::create_dir_all(&work).unwrap();
        std::fs::write(work.join(name), "memory_limit = 128M\n").unwrap();
    }

    #[tokio::test]
    async fn default_selector_installs_the_production_template() {
        let dir = tempdir().unwrap();
        seed_template(dir.path(), "php.ini-production");
        let log = BuildLog::open(dir.path(), "8.3.7").unwrap();

        let target = writer(dir.path()).write_config(&log, None).await.unwrap();

        assert_eq!(target, dir.path().join("prefix/etc/php.ini"));
        let contents = std::fs::read_to_string(&target).unwrap();
        assert!(contents.starts_with("memory_limit = 128M\n"));
        assert!(contents.contains("include_path"));
        assert!(contents.contains("extension_dir"));
        assert!(dir.path().join("prefix/etc/conf.d").is_dir());
    }

    #[tokio::test]
    async fn old_releases_fall_back_to_the_dist_template() {
        let dir = tempdir().unwrap();
        seed_template(dir.path(), "php.ini-dist");
        let log = BuildLog::open(dir.path(), "5.2.17").unwrap();

        let target = writer(dir.path()).write_config(&log, None).await.unwrap();

        assert!(target.exists());
        let log_contents = std::fs::read_to_string(log.full_path()).unwrap();
        assert!(log_contents.contains("php.ini-dist"));
    }

    #[tokio::test]
    async fn suffix_selector_picks_the_named_template() {
        let dir = tempdir().unwrap();
        seed_template(dir.path(), "php.ini-production");
        seed_template(dir.path(), "php.ini-development");
        let log = BuildLog::open(dir.path(), "8.3.7").unwrap();

        writer(dir.path())
            .write_config(&log, Some("development"))
            .await
            .unwrap();

        let log_contents = std::fs::read_to_string(log.full_path()).unwrap();
        assert!(log_contents.contains("php.ini-development"));
    }

    #[tokio::test]
    async fn path_selector_uses_the_file_directly() {
        let dir = tempdir().unwrap();
        let custom = dir.path().join("custom.ini");
        std::fs::write(&custom, "error_reporting = E_ALL\n").unwrap();
        let log = BuildLog::open(dir.path(), "8.3.7").unwrap();

        let target = writer(dir.path())
            .write_config(&log, Some(custom.to_str().unwrap()))
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&target).unwrap();
        assert!(contents.starts_with("error_reporting = E_ALL\n"));
    }

    #[tokio::test]
    async fn missing_template_reports_the_expected_path() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("php-src")).unwrap();
        let log = BuildLog::open(dir.path(), "8.3.7").unwrap();

        let err = writer(dir.path())
            .write_config(&log, Some("hardened"))
            .await
            .unwrap_err();

        match err {
            InstallError::MissingEnvironment { step, path, .. } => {
                assert_eq!(step, Step::WriteConfig);
                assert!(path.ends_with("php.ini-hardened"));
            }
            other => panic!("Expected MissingEnvironment, got {other}"),
        }
    }
}
