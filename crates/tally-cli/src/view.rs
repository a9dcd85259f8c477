//! Viewing sessions
//!
//! One session owns one in-memory checklist document and mutates it
//! through discrete, serialized commands: move between checkboxes,
//! toggle, upload an attachment, hand the file to `$EDITOR`, quit.
//! Every mutation is written back losslessly and staged; quitting
//! commits when the tree is dirty. Raw-terminal key handling is out of
//! scope - the bundled driver reads whole-line commands from stdin.

use crate::generate::{LATEST_LINK, MARKER_FILE};
use crate::vcs::Vcs;
use anyhow::{bail, Context};
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tally_checklist::{ChecklistDocument, Line};

/// Pick the checklist directory to view.
///
/// Explicit argument first, then the `tally-latest` symlink, then the
/// most recently modified marker directory under `base`.
///
/// # Errors
/// When nothing matches.
pub fn locate_directory(base: &Path, directory: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(dir) = directory {
        let dir = base.join(dir);
        if !dir.is_dir() {
            bail!("{} is not a directory", dir.display());
        }
        return Ok(dir);
    }

    let latest = base.join(LATEST_LINK);
    if latest.is_dir() {
        return Ok(latest);
    }

    let mut candidates: Vec<(std::time::SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(base)?.flatten() {
        let path = entry.path();
        if path.is_dir() && path.join(MARKER_FILE).exists() {
            let modified = entry.metadata()?.modified()?;
            candidates.push((modified, path));
        }
    }
    candidates.sort();
    candidates
        .pop()
        .map(|(_, path)| path)
        .context("unable to find a checklist directory")
}

/// Find the checklist file in `dir`.
///
/// # Errors
/// When no markdown file exists. Multiple candidates are a warning; the
/// lexicographically first one wins.
pub fn find_checklist(dir: &Path) -> anyhow::Result<PathBuf> {
    let mut markdown: Vec<PathBuf> = fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
        .collect();
    markdown.sort();

    if markdown.len() > 1 {
        tracing::warn!(
            "multiple markdown files in {}, using {}",
            dir.display(),
            markdown[0].display()
        );
    }
    markdown
        .into_iter()
        .next()
        .with_context(|| format!("no markdown file in {}", dir.display()))
}

/// One interactive editing session over one checklist
pub struct Session<'a, V: Vcs> {
    doc: ChecklistDocument,
    file: PathBuf,
    dir: PathBuf,
    cursor: usize,
    vcs: &'a V,
}

impl<'a, V: Vcs> Session<'a, V> {
    /// Open the checklist in `dir` for editing.
    ///
    /// # Errors
    /// IO while reading the file.
    pub fn open(dir: &Path, file: &Path, vcs: &'a V) -> anyhow::Result<Self> {
        let doc = ChecklistDocument::from_file(file)?;
        if !doc.has_managed_region() {
            tracing::warn!("{} has no managed region, nothing to toggle", file.display());
        }
        let cursor = doc.next_checkbox(0).unwrap_or(0);
        Ok(Self {
            doc,
            file: file.to_path_buf(),
            dir: dir.to_path_buf(),
            cursor,
            vcs,
        })
    }

    /// Line under the cursor
    #[must_use]
    pub fn current_line(&self) -> Option<&Line> {
        self.doc.line(self.cursor)
    }

    /// Cursor position, an index into the managed region's lines
    #[inline]
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move to the next checkbox, if any
    pub fn next(&mut self) {
        if let Some(idx) = self.doc.next_checkbox(self.cursor) {
            self.cursor = idx;
        }
    }

    /// Move to the previous checkbox, if any
    pub fn prev(&mut self) {
        if let Some(idx) = self.doc.prev_checkbox(self.cursor) {
            self.cursor = idx;
        }
    }

    /// Toggle the checkbox under the cursor and write the file back.
    ///
    /// # Errors
    /// Read-only lines, and IO on write-back.
    pub fn toggle(&mut self) -> anyhow::Result<()> {
        self.doc.toggle(self.cursor)?;
        self.save_and_stage()
    }

    /// Copy `local` to the cursor line's attachment target, mark it
    /// checked, and write the file back.
    ///
    /// # Errors
    /// Lines without an attachment target, and IO.
    pub fn upload(&mut self, local: &Path) -> anyhow::Result<()> {
        self.doc.upload(self.cursor, local, &self.dir)?;
        if let Some(line) = self.doc.line(self.cursor) {
            if let Some(target) = line.target() {
                self.vcs.stage(&self.dir.join(target))?;
            }
        }
        self.save_and_stage()
    }

    /// Hand the checklist to `$EDITOR`, block until it returns, then
    /// re-read the file.
    ///
    /// # Errors
    /// Spawn failures and IO on re-read.
    pub fn edit(&mut self) -> anyhow::Result<()> {
        let Some(editor) = std::env::var_os("EDITOR") else {
            tracing::warn!("EDITOR is not set");
            return Ok(());
        };
        let status = std::process::Command::new(&editor)
            .arg(&self.file)
            .status()
            .with_context(|| format!("failed to launch {}", editor.to_string_lossy()))?;
        if !status.success() {
            tracing::warn!("editor exited with {status}");
        }
        self.doc = ChecklistDocument::from_file(&self.file)?;
        self.cursor = self.cursor.min(self.doc.lines().len().saturating_sub(1));
        Ok(())
    }

    /// Write back, stage, and commit the session's changes.
    ///
    /// # Errors
    /// IO and version-control failures.
    pub fn finish(self) -> anyhow::Result<()> {
        self.save_and_stage()?;
        if self.vcs.is_dirty()? {
            self.vcs.commit("checklist viewer changes")?;
        }
        Ok(())
    }

    fn save_and_stage(&self) -> anyhow::Result<()> {
        self.doc.save(&self.file)?;
        self.vcs.stage(&self.file)?;
        Ok(())
    }
}

/// Drive a session with whole-line commands from `input`.
///
/// Commands: `n` next, `p` previous, `t` toggle, `u <path>` upload,
/// `e` editor, `q` quit. Command errors are reported and the session
/// continues; quitting (or end of input) commits.
///
/// # Errors
/// IO on the command streams and a failing final commit.
pub fn run_session<V: Vcs>(
    mut session: Session<'_, V>,
    input: impl BufRead,
    mut output: impl Write,
) -> anyhow::Result<()> {
    for line in input.lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        let result = match parts.next() {
            Some("n") => {
                session.next();
                Ok(())
            }
            Some("p") => {
                session.prev();
                Ok(())
            }
            Some("t") => session.toggle(),
            Some("u") => match parts.next() {
                Some(local) => session.upload(Path::new(local)),
                None => {
                    writeln!(output, "usage: u <path>")?;
                    Ok(())
                }
            },
            Some("e") => session.edit(),
            Some("q") => break,
            Some(other) => {
                writeln!(output, "unknown command '{other}' (n p t u e q)")?;
                Ok(())
            }
            None => Ok(()),
        };
        if let Err(e) = result {
            writeln!(output, "{e}")?;
        }
        if let Some(line) = session.current_line() {
            writeln!(output, "{}", line.raw().trim_end())?;
        }
    }
    session.finish()
}
