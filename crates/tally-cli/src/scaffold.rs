//! First-time setup
//!
//! Creates a fresh checklist repository: directory, README, a starter
//! template to edit, and an initial commit.

use crate::vcs::{GitCli, Vcs};
use anyhow::{bail, Context};
use std::fs;
use std::path::{Path, PathBuf};

const README: &str = "# Test checklist repository\n\nPlease fill me in\n";

const STARTER_TEMPLATE: &str = "\
# Minimal template. Please edit.

version: 1
file:
  {template}: |
    This is a minimal example generated by tally setup. Please edit
    accordingly to add your tests.

actor1:
  type: actor
  name: Some piece of hardware
  tags:
    tag1: value1

test1:
  type: test
  filter:
    tag1: [value1]
  tests:
  - add the test cases
";

/// Set up `directory` as a new checklist repository.
///
/// Returns the path of the starter template.
///
/// # Errors
/// When the directory already exists, and on IO or git failures.
pub fn run(directory: &Path) -> anyhow::Result<PathBuf> {
    if directory.exists() {
        bail!("directory {} already exists", directory.display());
    }
    fs::create_dir_all(directory)
        .with_context(|| format!("cannot create {}", directory.display()))?;

    let name = directory
        .file_name()
        .context("directory has no name")?
        .to_string_lossy()
        .into_owned();

    let readme = directory.join("README.md");
    fs::write(&readme, README)?;

    let template_name = format!("{name}.yaml");
    let template = directory.join(&template_name);
    fs::write(&template, STARTER_TEMPLATE.replace("{template}", &template_name))?;

    let repo = GitCli::init(directory)?;
    repo.stage(&readme)?;
    repo.stage(&template)?;
    repo.commit(&format!("Initial setup for {name}"))?;

    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_template::Template;

    #[test]
    fn setup_creates_a_committed_starter_repo() {
        tally_test_utils::ensure_git_identity();
        let base = tempfile::tempdir().unwrap();
        let dir = base.path().join("checks");

        let template = run(&dir).unwrap();
        assert!(dir.join("README.md").exists());
        assert!(template.exists());

        // The starter template must itself load.
        let loaded = Template::from_file(&template).unwrap();
        assert_eq!(loaded.actors.len(), 1);
        assert_eq!(loaded.tests.len(), 1);

        let status = std::process::Command::new("git")
            .args(["status", "--porcelain"])
            .current_dir(&dir)
            .output()
            .unwrap();
        assert!(String::from_utf8_lossy(&status.stdout).trim().is_empty());
    }

    #[test]
    fn setup_refuses_an_existing_directory() {
        let base = tempfile::tempdir().unwrap();
        let dir = base.path().join("checks");
        fs::create_dir(&dir).unwrap();
        assert!(run(&dir).is_err());
    }
}
