//! Version-control handle
//!
//! Generated files and session edits are committed through an explicit
//! [`Vcs`] handle passed to whichever component needs it. The default
//! implementation shells out to `git`; anything else (including the test
//! suite's in-memory recorder) can stand in behind the trait.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Errors from the version-control handle
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    /// The directory is not inside a repository
    #[error("{0} is not inside a version-controlled tree")]
    NotARepository(PathBuf),

    /// A git invocation failed
    #[error("git {args} failed: {stderr}")]
    CommandFailed { args: String, stderr: String },

    /// git itself could not be spawned
    #[error("failed to run git: {0}")]
    Io(#[from] std::io::Error),
}

/// The operations Tally needs from version control
pub trait Vcs {
    /// Stage a file for the next commit
    fn stage(&self, path: &Path) -> Result<(), VcsError>;

    /// Commit everything staged
    fn commit(&self, message: &str) -> Result<(), VcsError>;

    /// Whether the working tree has uncommitted changes
    fn is_dirty(&self) -> Result<bool, VcsError>;
}

/// A repository driven through the `git` binary
#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
}

impl GitCli {
    /// Find the repository containing `dir`.
    ///
    /// # Errors
    /// `NotARepository` when `dir` is outside any git work tree.
    pub fn discover(dir: &Path) -> Result<Self, VcsError> {
        let root = run_git(dir, &["rev-parse", "--show-toplevel"])
            .map_err(|_| VcsError::NotARepository(dir.to_path_buf()))?;
        Ok(Self {
            root: PathBuf::from(root.trim_end()),
        })
    }

    /// Initialize a new repository at `dir`.
    ///
    /// # Errors
    /// Any git failure.
    pub fn init(dir: &Path) -> Result<Self, VcsError> {
        run_git(dir, &["init", "-q"])?;
        Ok(Self {
            root: dir.to_path_buf(),
        })
    }

    /// Repository root
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Vcs for GitCli {
    fn stage(&self, path: &Path) -> Result<(), VcsError> {
        let path = path.to_string_lossy().into_owned();
        run_git(&self.root, &["add", "--", &path])?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<(), VcsError> {
        run_git(
            &self.root,
            &["-c", "commit.gpgsign=false", "commit", "-q", "-m", message],
        )?;
        Ok(())
    }

    fn is_dirty(&self) -> Result<bool, VcsError> {
        let status = run_git(&self.root, &["status", "--porcelain"])?;
        Ok(!status.trim().is_empty())
    }
}

fn run_git(cwd: &Path, args: &[&str]) -> Result<String, VcsError> {
    let output = Command::new("git").args(args).current_dir(cwd).output()?;
    if !output.status.success() {
        return Err(VcsError::CommandFailed {
            args: args.join(" "),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_test_utils::TempRepo;

    #[test]
    fn discover_finds_the_repository_root() {
        let repo = TempRepo::init();
        let nested = repo.path().join("some/nested/dir");
        std::fs::create_dir_all(&nested).unwrap();

        let git = GitCli::discover(&nested).unwrap();
        assert_eq!(
            git.root().canonicalize().unwrap(),
            repo.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn discover_outside_a_repository_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = GitCli::discover(dir.path()).unwrap_err();
        assert!(matches!(err, VcsError::NotARepository(_)));
    }

    #[test]
    fn stage_commit_cycle_works() {
        let repo = TempRepo::init();
        let git = GitCli::discover(repo.path()).unwrap();

        let file = repo.path().join("note.txt");
        std::fs::write(&file, "hello").unwrap();
        assert!(git.is_dirty().unwrap());

        git.stage(&file).unwrap();
        git.commit("add note").unwrap();
        assert!(!git.is_dirty().unwrap());

        let log = repo.git_stdout(&["log", "--oneline"]);
        assert!(log.contains("add note"));
    }
}
