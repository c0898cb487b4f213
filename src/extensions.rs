//! Bundled extension builds.
//!
//! Each requested extension is built from its directory under `ext/` in
//! the source checkout: phpize against the freshly installed toolchain,
//! configure, make, make install, then a conf.d snippet that loads the
//! shared object.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use crate::buildlog::BuildLog;
use crate::errors::InstallError;
use crate::step::Step;
use crate::toolchain::run_logged;
use crate::workflow::ExtensionSet;

/// Builds extensions from the source checkout into one install prefix.
pub struct ExtensionBuilder {
    work_tree: PathBuf,
    prefix: PathBuf,
}

impl ExtensionBuilder {
    pub fn new(work_tree: PathBuf, prefix: PathBuf) -> Self {
        Self { work_tree, prefix }
    }

    async fn build_one(&self, log: &BuildLog, name: &str) -> Result<(), InstallError> {
        let ext_dir = self.work_tree.join("ext").join(name);
        if !ext_dir.is_dir() {
            return Err(InstallError::MissingEnvironment {
                step: Step::BuildExtensions,
                what: "extension source directory",
                path: ext_dir,
            });
        }

        info!(extension = name, "building extension");
        log.line(Step::BuildExtensions.label(), &format!("building {name}"))?;

        let phpize = self.prefix.join("bin").join("phpize").display().to_string();
        run_logged(Step::BuildExtensions, log, &ext_dir, &phpize, &[]).await?;

        let php_config = format!(
            "--with-php-config={}",
            self.prefix.join("bin").join("php-config").display()
        );
        run_logged(
            Step::BuildExtensions,
            log,
            &ext_dir,
            "./configure",
            &[&php_config],
        )
        .await?;
        run_logged(Step::BuildExtensions, log, &ext_dir, "make", &[]).await?;
        run_logged(Step::BuildExtensions, log, &ext_dir, "make", &["install"]).await?;

        let conf_dir = self.prefix.join("etc").join("conf.d");
        std::fs::create_dir_all(&conf_dir)?;
        std::fs::write(
            conf_dir.join(format!("{name}.ini")),
            format!("extension={name}.so\n"),
        )?;
        Ok(())
    }
}

#[async_trait]
impl ExtensionSet for ExtensionBuilder {
    async fn build_all(
        &self,
        log: &BuildLog,
        extensions: &[String],
    ) -> Result<usize, InstallError> {
        if extensions.is_empty() {
            log.line(Step::BuildExtensions.label(), "no extensions requested")?;
            return Ok(0);
        }
        for name in extensions {
            self.build_one(log, name).await?;
        }
        Ok(extensions.len())
    }
}
