//! Testing utilities for the Tally workspace
//!
//! Shared template fixtures and a temporary git repository helper.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A small device matrix: two actors, one generic test, filtered tests
/// with files and an attached command.
pub const BASIC_TEMPLATE: &str = "\
version: 1
file:
  basic.yaml: |
    Example checklist for the basic device matrix.

actor1:
  type: actor
  tags:
    device: keyboard
    bus: USB

actor2:
  type: actor
  tags:
    device: mouse

test1:
  type: test
  tests:
  - testcase1
  logs:
    files: [file01]

test3:
  type: test
  filter:
    device: [__any__]
  tests:
  - testcase3

test4:
  type: test
  filter:
    device: [keyboard]
  tests:
  - testcase4
  logs:
    files: [file04]

test5:
  type: test
  name: Mouse deep dive
  description: Mouse-only checks.
  filter:
    device: [mouse]
  tests:
  - testcase5
  logs:
    commands:
    - run: libinput record
      output: attach
";

/// Write a template file into `dir` and return its path.
pub fn write_template(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Make sure `git commit` works even where no identity is configured.
pub fn ensure_git_identity() {
    for (key, value) in [
        ("GIT_AUTHOR_NAME", "Tally Tests"),
        ("GIT_AUTHOR_EMAIL", "tests@example.com"),
        ("GIT_COMMITTER_NAME", "Tally Tests"),
        ("GIT_COMMITTER_EMAIL", "tests@example.com"),
    ] {
        if std::env::var_os(key).is_none() {
            std::env::set_var(key, value);
        }
    }
}

/// A temporary directory with an initialized git repository.
pub struct TempRepo {
    dir: TempDir,
}

impl TempRepo {
    /// Create the repository and configure a local identity.
    pub fn init() -> Self {
        ensure_git_identity();
        let dir = TempDir::new().unwrap();
        let repo = Self { dir };
        repo.git(&["init", "-q"]);
        repo.git(&["config", "user.name", "Tally Tests"]);
        repo.git(&["config", "user.email", "tests@example.com"]);
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Run a git command in the repository, asserting success.
    pub fn git(&self, args: &[&str]) -> Output {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.dir.path())
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        output
    }

    /// Stdout of a git command as a string.
    pub fn git_stdout(&self, args: &[&str]) -> String {
        String::from_utf8(self.git(args).stdout).unwrap()
    }
}
