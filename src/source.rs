//! The shared source checkout.
//!
//! One clone under `<root>/php-src` serves every release build. The Fetch
//! step refreshes it and throws away local debris; the Branch step forces
//! a `build-<release>` branch onto the release tag. All operations go
//! through libgit2, no shelling out to git.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use git2::build::CheckoutBuilder;
use git2::{ObjectType, Repository, ResetType};
use tracing::{debug, info};

use crate::errors::InstallError;
use crate::release::sort_versions;
use crate::workflow::SourceControl;

const TAG_PREFIX: &str = "php-";

/// Handle on the shared checkout.
pub struct SourceRepository {
    path: PathBuf,
    upstream: String,
}

impl SourceRepository {
    pub fn new(path: PathBuf, upstream: String) -> Self {
        Self { path, upstream }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Repository, InstallError> {
        Ok(Repository::open(&self.path)?)
    }

    /// True when the checkout exists on disk.
    pub fn is_cloned(&self) -> bool {
        self.path.join(".git").exists()
    }

    /// Clone the upstream repository if the checkout is missing.
    pub fn ensure_cloned(&self) -> Result<(), InstallError> {
        if self.is_cloned() {
            return Ok(());
        }
        info!(upstream = %self.upstream, path = %self.path.display(), "cloning source repository");
        Repository::clone(&self.upstream, &self.path)?;
        Ok(())
    }

    /// Release versions known locally, ascending. Tags without the
    /// release prefix are ignored.
    pub fn list_releases(&self) -> Result<Vec<String>, InstallError> {
        let repo = self.open()?;
        let mut versions: Vec<String> = repo
            .tag_names(Some(&format!("{TAG_PREFIX}*")))?
            .iter()
            .flatten()
            .filter_map(|tag| tag.strip_prefix(TAG_PREFIX))
            .map(str::to_string)
            .collect();
        sort_versions(&mut versions);
        Ok(versions)
    }

    /// Delete ignored build artifacts from the checkout.
    pub fn purge_ignored(&self) -> Result<(), InstallError> {
        let repo = self.open()?;
        let mut checkout = CheckoutBuilder::new();
        checkout.force().remove_untracked(true).remove_ignored(true);
        repo.checkout_head(Some(&mut checkout))?;
        Ok(())
    }
}

#[async_trait]
impl SourceControl for SourceRepository {
    async fn fetch_latest(&self) -> Result<(), InstallError> {
        self.ensure_cloned()?;
        let repo = self.open()?;
        let mut remote = repo.find_remote("origin")?;
        debug!(upstream = %self.upstream, "fetching heads and tags");
        remote.fetch(
            &[
                "+refs/heads/*:refs/remotes/origin/*",
                "+refs/tags/*:refs/tags/*",
            ],
            None,
            None,
        )?;
        Ok(())
    }

    async fn reset_and_clean(&self) -> Result<(), InstallError> {
        let repo = self.open()?;
        let head = repo.head()?.peel_to_commit()?;
        repo.reset(head.as_object(), ResetType::Hard, None)?;
        let mut checkout = CheckoutBuilder::new();
        checkout.force().remove_untracked(true);
        repo.checkout_head(Some(&mut checkout))?;
        Ok(())
    }

    async fn checkout_branch(&self, branch: &str, tag: &str) -> Result<(), InstallError> {
        let repo = self.open()?;
        let target = repo.revparse_single(tag)?;
        let commit_id = target.peel(ObjectType::Commit)?.id();
        let commit = repo.find_commit(commit_id)?;
        info!(%branch, %tag, "branching release");
        repo.branch(branch, &commit, true)?;
        repo.set_head(&format!("refs/heads/{branch}"))?;
        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        repo.checkout_head(Some(&mut checkout))?;
        Ok(())
    }
}
