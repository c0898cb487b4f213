//! PEAR bootstrap.
//!
//! Releases since 5.1 ship without a usable PEAR, so the installer phar is
//! downloaded once into `<root>/cache/` and run against the freshly
//! installed php binary. Older releases bundle their own PEAR and the
//! step reports itself as skipped.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::buildlog::BuildLog;
use crate::errors::InstallError;
use crate::release::Release;
use crate::step::Step;
use crate::toolchain::run_logged;
use crate::workflow::Bootstrap;

/// First release series that needs the standalone installer.
pub const PEAR_MIN_VERSION: (u32, u32) = (5, 1);

const PEAR_INSTALLER_URL: &str = "https://pear.php.net/install-pear-nozlib.phar";
const PEAR_INSTALLER_FILE: &str = "install-pear-nozlib.phar";

/// True when the release expects the standalone PEAR installer.
pub fn supports_pear_bootstrap(release: &Release) -> bool {
    (release.major(), release.minor()) >= PEAR_MIN_VERSION
}

/// Downloads and runs the PEAR installer against one install prefix.
pub struct PearBootstrap {
    prefix: PathBuf,
    cache_dir: PathBuf,
    client: reqwest::Client,
}

impl PearBootstrap {
    pub fn new(prefix: PathBuf, cache_dir: PathBuf) -> Self {
        Self {
            prefix,
            cache_dir,
            client: reqwest::Client::new(),
        }
    }

    /// Fetch the installer phar unless a cached copy exists.
    async fn ensure_installer(&self) -> Result<PathBuf, InstallError> {
        let path = self.cache_dir.join(PEAR_INSTALLER_FILE);
        if path.exists() {
            debug!(path = %path.display(), "using cached pear installer");
            return Ok(path);
        }
        std::fs::create_dir_all(&self.cache_dir)?;
        info!(url = PEAR_INSTALLER_URL, "downloading pear installer");
        let response = self
            .client
            .get(PEAR_INSTALLER_URL)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;
        std::fs::write(&path, &bytes)?;
        Ok(path)
    }
}

#[async_trait]
impl Bootstrap for PearBootstrap {
    async fn install_if_compatible(
        &self,
        log: &BuildLog,
        release: &Release,
    ) -> Result<bool, InstallError> {
        if !supports_pear_bootstrap(release) {
            log.line(
                Step::BootstrapPear.label(),
                "release bundles its own pear, skipping",
            )?;
            return Ok(false);
        }

        let installer = self.ensure_installer().await?;
        let php = self.prefix.join("bin").join("php");
        if !php.exists() {
            return Err(InstallError::MissingEnvironment {
                step: Step::BootstrapPear,
                what: "php binary",
                path: php,
            });
        }

        let php_arg = php.display().to_string();
        let installer_arg = installer.display().to_string();
        let lib_arg = self.prefix.join("lib").join("php").display().to_string();
        let bin_arg = self.prefix.join("bin").display().to_string();
        run_logged(
            Step::BootstrapPear,
            log,
            &self.prefix,
            &php_arg,
            &[&installer_arg, "-d", &lib_arg, "-b", &bin_arg],
        )
        .await?;

        let pear_arg = self.prefix.join("bin").join("pear").display().to_string();
        let ini_arg = self
            .prefix
            .join("etc")
            .join("php.ini")
            .display()
            .to_string();
        run_logged(
            Step::BootstrapPear,
            log,
            &self.prefix,
            &pear_arg,
            &["config-set", "php_ini", &ini_arg],
        )
        .await?;

        Ok(true)
    }
}
