//! Include expansion and version handling for template sources
//!
//! Templates may pull other files in with `include: <relative path>`
//! directives and declare a format version with `version: <int>`. Both are
//! line-oriented preprocessor features resolved before the YAML parser
//! ever sees the text: includes are expanded in place and version lines
//! are consumed, with every included file required to declare the same
//! version as the first one seen.

use crate::error::TemplateError;
use std::fs;
use std::path::{Path, PathBuf};

/// Maximum include nesting depth. Deeper chains are cut off.
const MAX_INCLUDE_DEPTH: u32 = 10;

/// A template source after include expansion
///
/// `text` is plain YAML ready for parsing; `version` is the format
/// version extracted from the `version:` lines, if any file declared one.
#[derive(Debug, Clone)]
pub struct ExpandedSource {
    /// Include-expanded YAML text, version lines stripped
    pub text: String,
    /// Format version shared by all processed files
    pub version: Option<u64>,
}

impl ExpandedSource {
    /// Expand a template file, resolving includes relative to its parent
    /// directory.
    ///
    /// # Errors
    /// Fails on unreadable files, non-integer version lines, and version
    /// mismatches between included files.
    pub fn from_file(path: &Path) -> Result<Self, TemplateError> {
        let mut expanded = Self {
            text: String::new(),
            version: None,
        };
        let include_root = path.parent().map(Path::to_path_buf);
        expanded.process(path, include_root.as_deref(), 0)?;
        Ok(expanded)
    }

    /// Expand template text with no backing file.
    ///
    /// # Errors
    /// Fails on any `include:` directive: there is no directory to resolve
    /// the included path against.
    pub fn from_text(text: &str) -> Result<Self, TemplateError> {
        let mut expanded = Self {
            text: String::new(),
            version: None,
        };
        expanded.process_lines(text, None, None, 0)?;
        Ok(expanded)
    }

    fn process(
        &mut self,
        path: &Path,
        include_root: Option<&Path>,
        depth: u32,
    ) -> Result<(), TemplateError> {
        let content = fs::read_to_string(path).map_err(|e| TemplateError::io(path, e))?;
        self.process_lines(&content, Some(path), include_root, depth)
    }

    fn process_lines(
        &mut self,
        content: &str,
        path: Option<&Path>,
        include_root: Option<&Path>,
        depth: u32,
    ) -> Result<(), TemplateError> {
        if depth > MAX_INCLUDE_DEPTH {
            tracing::warn!(
                depth,
                "include depth limit reached, cutting the chain short"
            );
            return Ok(());
        }

        for line in content.split_inclusive('\n') {
            if let Some(rest) = line.strip_prefix("version:") {
                let value = rest.trim();
                let version: u64 = value
                    .parse()
                    .map_err(|_| TemplateError::InvalidVersion(value.to_string()))?;
                match self.version {
                    None => self.version = Some(version),
                    Some(expected) if expected != version => {
                        return Err(TemplateError::VersionMismatch {
                            path: path.map(Path::to_path_buf).unwrap_or_default(),
                            found: version,
                            expected,
                        });
                    }
                    Some(_) => {}
                }
                continue;
            }

            if let Some(rest) = line.strip_prefix("include:") {
                let filename = rest.trim();
                let Some(root) = include_root else {
                    return Err(TemplateError::IncludeWithoutPath(filename.to_string()));
                };
                let included: PathBuf = root.join(filename);
                self.process(&included, Some(root), depth + 1)?;
                continue;
            }

            self.text.push_str(line);
        }

        Ok(())
    }
}
