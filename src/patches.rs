//! Source patches for releases that no longer build cleanly.
//!
//! Patches are declared in a static table keyed by release series and
//! optionally by platform. The files themselves live under
//! `<root>/patches/` and are applied with `patch -p0` from the checkout
//! root. Most releases match no rule and the step is a no-op.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::buildlog::BuildLog;
use crate::errors::InstallError;
use crate::release::Release;
use crate::step::Step;
use crate::toolchain::run_logged;
use crate::workflow::PatchSet;

/// One patch rule: which release series it targets, on which platform,
/// and the patch files to apply in order.
#[derive(Debug)]
pub struct PatchRule {
    major: u32,
    minor: u32,
    platform: Option<&'static str>,
    files: &'static [&'static str],
}

impl PatchRule {
    fn matches(&self, major: u32, minor: u32, platform: &str) -> bool {
        self.major == major
            && self.minor == minor
            && self.platform.is_none_or(|p| p == platform)
    }
}

/// Known build fixes, oldest series first.
const PATCH_TABLE: &[PatchRule] = &[
    PatchRule {
        major: 5,
        minor: 3,
        platform: None,
        files: &["bison-compat-5.3.patch"],
    },
    PatchRule {
        major: 5,
        minor: 4,
        platform: Some("macos"),
        files: &["readline-libedit-5.4.patch"],
    },
    PatchRule {
        major: 7,
        minor: 0,
        platform: Some("macos"),
        files: &["openssl-deprecations-7.0.patch"],
    },
];

/// Patch files applicable to a release series on a platform.
fn files_for(major: u32, minor: u32, platform: &str) -> Vec<&'static str> {
    PATCH_TABLE
        .iter()
        .filter(|rule| rule.matches(major, minor, platform))
        .flat_map(|rule| rule.files.iter().copied())
        .collect()
}

fn current_platform() -> &'static str {
    if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else {
        "other"
    }
}

/// Applies table-matched patches to the checkout.
pub struct PatchApplier {
    work_tree: PathBuf,
    patches_dir: PathBuf,
}

impl PatchApplier {
    pub fn new(work_tree: PathBuf, patches_dir: PathBuf) -> Self {
        Self {
            work_tree,
            patches_dir,
        }
    }
}

#[async_trait]
impl PatchSet for PatchApplier {
    async fn apply_applicable(
        &self,
        log: &BuildLog,
        release: &Release,
    ) -> Result<usize, InstallError> {
        let platform = current_platform();
        let files = files_for(release.major(), release.minor(), platform);
        if files.is_empty() {
            debug!(release = release.raw(), platform, "no patch rules match");
            log.line(Step::Patch.label(), "no patches for this release")?;
            return Ok(0);
        }
        let mut applied = 0;
        for file in files {
            let path = self.patches_dir.join(file);
            if !path.exists() {
                return Err(InstallError::MissingEnvironment {
                    step: Step::Patch,
                    what: "patch file",
                    path,
                });
            }
            let path_arg = path.display().to_string();
            run_logged(
                Step::Patch,
                log,
                &self.work_tree,
                "patch",
                &["-p0", "-i", &path_arg],
            )
            .await?;
            applied += 1;
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn platform_free_rules_match_everywhere() {
        assert_eq!(files_for(5, 3, "linux"), vec!["bison-compat-5.3.patch"]);
        assert_eq!(files_for(5, 3, "macos"), vec!["bison-compat-5.3.patch"]);
    }

    #[test]
    fn platform_bound_rules_match_only_their_platform() {
        assert_eq!(files_for(5, 4, "macos"), vec!["readline-libedit-5.4.patch"]);
        assert!(files_for(5, 4, "linux").is_empty());
    }

    #[test]
    fn modern_releases_match_no_rule() {
        assert!(files_for(8, 3, "linux").is_empty());
        assert!(files_for(8, 3, "macos").is_empty());
    }

    #[tokio::test]
    async fn no_matching_rule_is_a_logged_no_op() {
        let dir = tempdir().unwrap();
        let log = BuildLog::open(dir.path(), "8.3.7").unwrap();
        let applier = PatchApplier::new(dir.path().to_path_buf(), dir.path().join("patches"));
        let release = Release::parse("8.3.7").unwrap();

        let applied = applier.apply_applicable(&log, &release).await.unwrap();

        assert_eq!(applied, 0);
        let contents = std::fs::read_to_string(log.full_path()).unwrap();
        assert!(contents.contains("no patches for this release"));
    }

    #[tokio::test]
    async fn missing_patch_file_fails_before_spawning() {
        let dir = tempdir().unwrap();
        let log = BuildLog::open(dir.path(), "5.3.29").unwrap();
        let applier = PatchApplier::new(dir.path().to_path_buf(), dir.path().join("patches"));
        let release = Release::parse("5.3.29").unwrap();

        let err = applier.apply_applicable(&log, &release).await.unwrap_err();

        match err {
            InstallError::MissingEnvironment { step, path, .. } => {
                assert_eq!(step, Step::Patch);
                assert!(path.ends_with("bison-compat-5.3.patch"));
            }
            other => panic!("Expected MissingEnvironment, got {other}"),
        }
    }
}
