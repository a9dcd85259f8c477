//! Checklist generation
//!
//! Loads a template, compiles it, and materializes one generation
//! directory: the rendered checklist, a normalized copy of the combined
//! template, the attachment tree with one placeholder file per target,
//! a marker file, a check-script stub, and a `tally-latest` symlink.
//! Everything is staged and committed through the [`Vcs`] handle before
//! the function returns.
//!
//! Generation is idempotent and safely re-runnable: an IO error aborts
//! the current operation and leaves already-written files in place.

use crate::vcs::{GitCli, Vcs};
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tally_compile::{build_plan, compile, render, Item};
use tally_template::Template;

/// Marker file identifying a generation directory
pub const MARKER_FILE: &str = ".tally";

/// Symlink pointing at the most recent generation directory
pub const LATEST_LINK: &str = "tally-latest";

/// Check-script run before a viewing session
pub const CHECK_SCRIPT: &str = "tally-check";

const CHECK_SCRIPT_STUB: &str = "\
#!/bin/sh
#
# This file is executed before a viewing session starts.
# Return a nonzero exit code if any requirements fail.

exit 0
";

/// Generate a new checklist directory under `base`.
///
/// Returns the created directory. `directory` overrides the
/// date-stamped default name.
///
/// # Errors
/// Template/compile errors, a missing repository, and IO failures.
pub fn run(
    base: &Path,
    template_arg: &Path,
    directory: Option<&Path>,
) -> anyhow::Result<PathBuf> {
    let template_path = resolve_template_path(base, template_arg);
    let repo = GitCli::discover(base)
        .context("tally must be run from within a version-controlled tree")?;

    tracing::debug!(template = %template_path.display(), "loading template");
    let template = Template::from_file(&template_path)?;
    let doc = compile(&template);
    let plan = build_plan(&doc)?;
    let text = render(&doc);

    let stem = template_path
        .file_stem()
        .context("template path has no file name")?
        .to_string_lossy()
        .into_owned();
    let target = match directory {
        Some(dir) => base.join(dir),
        None => base.join(unique_dirname(base, &stem)),
    };
    tracing::debug!(target = %target.display(), "generation directory");

    fs::create_dir(&target)
        .with_context(|| format!("cannot create {}", target.display()))?;
    write_and_stage(&repo, &target.join(MARKER_FILE), "")?;

    for dir in plan.directories() {
        fs::create_dir_all(target.join(&dir))
            .with_context(|| format!("cannot create {}", dir.display()))?;
    }
    write_placeholders(&repo, &target, &doc)?;

    let checklist = target.join(format!("{stem}.md"));
    write_and_stage(&repo, &checklist, &text)?;

    let template_copy = target.join(
        template_path
            .file_name()
            .context("template path has no file name")?,
    );
    write_and_stage(&repo, &template_copy, &template.combined)?;

    let check_script = target.join(CHECK_SCRIPT);
    write_and_stage(&repo, &check_script, CHECK_SCRIPT_STUB)?;
    make_executable(&check_script)?;

    repoint_latest_link(&repo, base, &target)?;

    repo.commit(&format!(
        "New test run - {}",
        target.file_name().unwrap_or_default().to_string_lossy()
    ))?;

    Ok(target)
}

/// Accept `template`, `template.yaml`, or `template.yml`
fn resolve_template_path(base: &Path, arg: &Path) -> PathBuf {
    let direct = base.join(arg);
    if direct.exists() {
        return direct;
    }
    for suffix in ["yaml", "yml"] {
        let alternative = direct.with_extension(suffix);
        if alternative.exists() {
            return alternative;
        }
    }
    direct
}

/// First unused `{stem}-{date}.{n}` name under `base`
fn unique_dirname(base: &Path, stem: &str) -> String {
    let date = chrono::Local::now().format("%Y-%m-%d");
    let mut postfix = 0;
    loop {
        let name = format!("{stem}-{date}.{postfix}");
        if !base.join(&name).exists() {
            return name;
        }
        postfix += 1;
    }
}

/// One placeholder per attachment target, with a provenance header
fn write_placeholders(
    repo: &impl Vcs,
    target_dir: &Path,
    doc: &tally_compile::CompiledDocument,
) -> anyhow::Result<()> {
    for section in &doc.sections {
        for item in section.items() {
            match item {
                Item::Statement(_) => {}
                Item::File { name, target } => {
                    let path = target_dir.join(target.to_path());
                    write_and_stage(repo, &path, &format!("file: {name}\n"))?;
                }
                Item::Command { run, target, .. } => {
                    if let Some(target) = target {
                        let path = target_dir.join(target.to_path());
                        write_and_stage(repo, &path, &format!("run: {run}\n"))?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn write_and_stage(repo: &impl Vcs, path: &Path, content: &str) -> anyhow::Result<()> {
    fs::write(path, content).with_context(|| format!("cannot write {}", path.display()))?;
    repo.stage(path)?;
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn repoint_latest_link(repo: &impl Vcs, base: &Path, target: &Path) -> anyhow::Result<()> {
    let link = base.join(LATEST_LINK);
    match fs::symlink_metadata(&link) {
        Ok(meta) if meta.file_type().is_symlink() => fs::remove_file(&link)?,
        Ok(_) => {
            // A real file or directory squatting on the name; leave it be.
            tracing::warn!("{LATEST_LINK} exists and is not a symlink, not updating it");
            return Ok(());
        }
        Err(_) => {}
    }
    let relative = target.strip_prefix(base).unwrap_or(target);
    std::os::unix::fs::symlink(relative, &link)?;
    repo.stage(&link)?;
    Ok(())
}

#[cfg(not(unix))]
fn repoint_latest_link(_repo: &impl Vcs, _base: &Path, _target: &Path) -> anyhow::Result<()> {
    Ok(())
}

/// Files under `dir`, sorted, for the post-generation summary
#[must_use]
pub fn list_tree(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    collect_files(dir, &mut files);
    files.sort();
    files
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out);
        } else {
            out.push(path);
        }
    }
}
