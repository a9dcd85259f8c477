//! The pre-view check hook
//!
//! A generation directory carries an executable `tally-check` script.
//! It runs before a viewing session starts; a nonzero exit code aborts
//! the session and surfaces the script's output.

use crate::generate::CHECK_SCRIPT;
use anyhow::{bail, Context};
use std::path::Path;
use std::process::Command;

/// Run `<dir>/tally-check` if it exists.
///
/// # Errors
/// When the script cannot be spawned or exits nonzero.
pub fn run(dir: &Path) -> anyhow::Result<()> {
    let script = dir.join(CHECK_SCRIPT);
    if !script.exists() {
        return Ok(());
    }

    let output = Command::new(&script)
        .current_dir(dir)
        .output()
        .with_context(|| format!("failed to run {}", script.display()))?;

    if !output.status.success() {
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        bail!(
            "{CHECK_SCRIPT} failed with {}:\n{}",
            output.status,
            text.trim_end()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[cfg(unix)]
    fn write_script(dir: &Path, body: &str) {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(CHECK_SCRIPT);
        fs::write(&path, body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn missing_script_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(dir.path()).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn passing_script_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "#!/bin/sh\nexit 0\n");
        assert!(run(dir.path()).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn failing_script_surfaces_its_output() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "#!/bin/sh\necho broken setup\nexit 1\n");
        let err = run(dir.path()).unwrap_err();
        assert!(err.to_string().contains("broken setup"));
    }
}
