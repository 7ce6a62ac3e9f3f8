use git2::build::CheckoutBuilder;
use git2::{BranchType, ErrorCode};
use tracing::info;

use super::Repository;
use crate::{Error, Result};

impl Repository {
    /// Check out the environment branch `name`, creating it at `HEAD` when
    /// missing and `create_if_missing` is set
    ///
    /// The checkout is forced: uncommitted changes in the working tree are
    /// overwritten by the branch's contents.
    pub fn switch_environment(&self, name: &str, create_if_missing: bool) -> Result<()> {
        let branch = match self.git.find_branch(name, BranchType::Local) {
            Ok(branch) => branch,
            Err(err) if err.code() == ErrorCode::NotFound => {
                if !create_if_missing {
                    return Err(Error::BranchNotFound {
                        name: name.to_string(),
                    });
                }
                let head = self.head_git_commit()?.ok_or_else(|| Error::BranchNotFound {
                    name: name.to_string(),
                })?;
                info!(branch = name, "creating environment");
                self.git.branch(name, &head, false)?
            }
            Err(err) => return Err(err.into()),
        };

        let reference = branch.into_reference();
        let refname = reference
            .name()
            .ok_or_else(|| git2::Error::from_str("branch name is not valid UTF-8"))?
            .to_string();
        let tree = reference.peel_to_tree()?;

        self.git
            .checkout_tree(tree.as_object(), Some(CheckoutBuilder::new().force()))?;
        self.git.set_head(&refname)?;
        info!(branch = name, "switched environment");
        Ok(())
    }

    /// Short name of the branch `HEAD` points at, `None` when detached
    pub fn current_branch(&self) -> Result<Option<String>> {
        let head = match self.git.head() {
            Ok(head) => head,
            Err(err) if err.code() == ErrorCode::UnbornBranch => {
                let head = self.git.find_reference("HEAD")?;
                return Ok(head
                    .symbolic_target()
                    .and_then(|target| target.strip_prefix("refs/heads/"))
                    .map(str::to_string));
            }
            Err(err) => return Err(err.into()),
        };

        if head.is_branch() {
            Ok(head.shorthand().map(str::to_string))
        } else {
            Ok(None)
        }
    }
}
