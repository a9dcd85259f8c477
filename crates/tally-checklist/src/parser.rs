//! Round-trip checklist parsing
//!
//! A rendered checklist is a two-region document: the span inside the
//! tool's top-level heading is parsed into editable [`Line`]s, everything
//! before and after is kept as verbatim byte spans. Concatenating
//! prefix, lines, and suffix always reproduces the input byte-for-byte,
//! so untouched documents round-trip exactly and edits show up as
//! minimal version-control diffs.
//!
//! Recognition is deliberately shallow: a fixed leading marker for
//! checkboxes, a fixed bracket pattern for attachment links. Anything
//! else - hand-edited lines, headings, paragraphs - degrades to a
//! read-only [`LineKind::Other`] line instead of raising.

use crate::error::ChecklistError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

/// The fixed top-level heading that opens the managed region
pub const MANAGED_HEADING: &str = "# Tally";

static CHECKBOX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*- \[( |x|X)\] ").unwrap());

static TARGET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]\(([^()]+)\)").unwrap());

/// What a parsed line is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// A checkbox that has not been ticked yet
    Unchecked,
    /// A ticked checkbox
    Checked,
    /// Anything else; preserved verbatim, read-only
    Other,
}

/// One line of the managed region
#[derive(Debug, Clone)]
pub struct Line {
    raw: String,
    number: usize,
    kind: LineKind,
    target: Option<String>,
}

impl Line {
    fn parse(raw: String, number: usize) -> Self {
        let (kind, target) = match CHECKBOX_RE.captures(&raw) {
            Some(caps) => {
                let kind = if caps.get(1).map(|m| m.as_str()) == Some(" ") {
                    LineKind::Unchecked
                } else {
                    LineKind::Checked
                };
                let target = TARGET_RE
                    .captures_iter(&raw)
                    .last()
                    .map(|caps| caps[1].to_string());
                (kind, target)
            }
            None => (LineKind::Other, None),
        };
        Self {
            raw,
            number,
            kind,
            target,
        }
    }

    /// Raw line text, terminator included
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// 1-based line number in the whole document
    #[inline]
    #[must_use]
    pub fn number(&self) -> usize {
        self.number
    }

    /// Line kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> LineKind {
        self.kind
    }

    /// Attachment target extracted from the trailing link, if any
    #[inline]
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Whether the line is a checkbox at all
    #[inline]
    #[must_use]
    pub fn is_checkbox(&self) -> bool {
        self.kind != LineKind::Other
    }

    /// Flip the checked-state marker, leaving every other byte intact.
    fn flip(&mut self) -> Result<(), ChecklistError> {
        let caps = CHECKBOX_RE
            .captures(&self.raw)
            .ok_or(ChecklistError::NotACheckbox(self.number))?;
        let state = caps.get(1).unwrap();
        let (start, end) = (state.start(), state.end());
        let replacement = match self.kind {
            LineKind::Unchecked => "x",
            LineKind::Checked => " ",
            LineKind::Other => return Err(ChecklistError::NotACheckbox(self.number)),
        };
        self.raw.replace_range(start..end, replacement);
        self.kind = match self.kind {
            LineKind::Unchecked => LineKind::Checked,
            _ => LineKind::Unchecked,
        };
        Ok(())
    }
}

/// A checklist split into verbatim spans and editable lines
#[derive(Debug, Clone)]
pub struct ChecklistDocument {
    prefix: String,
    lines: Vec<Line>,
    suffix: String,
}

impl ChecklistDocument {
    /// Parse checklist text.
    ///
    /// A document without the managed heading parses to an all-prefix
    /// document with no editable lines; that is a warning, not an error.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let segments: Vec<&str> = text.split_inclusive('\n').collect();

        let Some(start) = segments
            .iter()
            .position(|l| l.trim_end() == MANAGED_HEADING)
        else {
            tracing::warn!("no '{MANAGED_HEADING}' heading found, nothing is editable");
            return Self {
                prefix: text.to_string(),
                lines: Vec::new(),
                suffix: String::new(),
            };
        };

        let end = segments[start + 1..]
            .iter()
            .position(|l| l.starts_with("# "))
            .map_or(segments.len(), |off| start + 1 + off);

        let prefix: String = segments[..start].concat();
        let suffix: String = segments[end..].concat();
        let lines = segments[start..end]
            .iter()
            .enumerate()
            .map(|(idx, raw)| Line::parse((*raw).to_string(), start + idx + 1))
            .collect();

        Self {
            prefix,
            lines,
            suffix,
        }
    }

    /// Read and parse a checklist file.
    ///
    /// # Errors
    /// IO only; parsing itself never fails.
    pub fn from_file(path: &Path) -> Result<Self, ChecklistError> {
        let text = fs::read_to_string(path).map_err(|e| ChecklistError::io(path, e))?;
        Ok(Self::parse(&text))
    }

    /// Verbatim bytes before the managed region
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Verbatim bytes after the managed region
    #[inline]
    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Editable lines of the managed region
    #[inline]
    #[must_use]
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// One line by index
    #[inline]
    #[must_use]
    pub fn line(&self, idx: usize) -> Option<&Line> {
        self.lines.get(idx)
    }

    /// Whether the document contains a managed region at all
    #[inline]
    #[must_use]
    pub fn has_managed_region(&self) -> bool {
        !self.lines.is_empty()
    }

    /// Index of the first checkbox strictly after `idx`
    #[must_use]
    pub fn next_checkbox(&self, idx: usize) -> Option<usize> {
        self.lines
            .iter()
            .enumerate()
            .skip(idx + 1)
            .find(|(_, l)| l.is_checkbox())
            .map(|(i, _)| i)
    }

    /// Index of the last checkbox strictly before `idx`
    #[must_use]
    pub fn prev_checkbox(&self, idx: usize) -> Option<usize> {
        self.lines[..idx]
            .iter()
            .enumerate()
            .rev()
            .find(|(_, l)| l.is_checkbox())
            .map(|(i, _)| i)
    }

    /// Flip the checked-state marker of the line at `idx`.
    ///
    /// # Errors
    /// `NotACheckbox` when the line is read-only.
    pub fn toggle(&mut self, idx: usize) -> Result<(), ChecklistError> {
        let line = self
            .lines
            .get_mut(idx)
            .ok_or(ChecklistError::NotACheckbox(idx + 1))?;
        line.flip()
    }

    /// Copy `local` to the line's attachment target under `base`, then
    /// mark the line checked.
    ///
    /// # Errors
    /// `NoAttachmentTarget` when the line has no link target; the
    /// document is left unmodified. IO errors surface before the line is
    /// marked.
    pub fn upload(
        &mut self,
        idx: usize,
        local: &Path,
        base: &Path,
    ) -> Result<(), ChecklistError> {
        let line = self
            .lines
            .get(idx)
            .ok_or(ChecklistError::NotACheckbox(idx + 1))?;
        let target = line
            .target()
            .ok_or(ChecklistError::NoAttachmentTarget(line.number()))?;

        let dest = base.join(target);
        fs::copy(local, &dest).map_err(|e| ChecklistError::io(&dest, e))?;

        let line = &mut self.lines[idx];
        if line.kind() == LineKind::Unchecked {
            line.flip()?;
        }
        Ok(())
    }

    /// Reassemble the document, byte-for-byte when nothing was toggled
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(
            self.prefix.len() + self.suffix.len() + self.lines.iter().map(|l| l.raw.len()).sum::<usize>(),
        );
        out.push_str(&self.prefix);
        for line in &self.lines {
            out.push_str(&line.raw);
        }
        out.push_str(&self.suffix);
        out
    }

    /// Write the document back to `path`.
    ///
    /// # Errors
    /// IO only.
    pub fn save(&self, path: &Path) -> Result<(), ChecklistError> {
        fs::write(path, self.render()).map_err(|e| ChecklistError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
notes the tool never touches
# Tally

## Generic

- [ ] first check
- [x] second check
- [ ] \u{1F4CE} [`file01`](generic/test1/file01)
not a checkbox
- [broken] almost a checkbox

# Appendix

hand-written epilogue
";

    #[test]
    fn zero_toggles_reproduce_input_bytes() {
        let doc = ChecklistDocument::parse(SAMPLE);
        assert_eq!(doc.render(), SAMPLE);
    }

    #[test]
    fn regions_are_split_at_the_managed_heading() {
        let doc = ChecklistDocument::parse(SAMPLE);
        assert_eq!(doc.prefix(), "notes the tool never touches\n");
        assert!(doc.suffix().starts_with("# Appendix"));
        assert!(doc.has_managed_region());
    }

    #[test]
    fn checkbox_kinds_are_recognized() {
        let doc = ChecklistDocument::parse(SAMPLE);
        let kinds: Vec<LineKind> = doc.lines().iter().map(Line::kind).collect();
        assert_eq!(kinds[4], LineKind::Unchecked);
        assert_eq!(kinds[5], LineKind::Checked);
        assert_eq!(kinds[6], LineKind::Unchecked);
        assert_eq!(kinds[7], LineKind::Other);
        assert_eq!(kinds[8], LineKind::Other);
    }

    #[test]
    fn capital_x_counts_as_checked() {
        let mut doc = ChecklistDocument::parse("# Tally\n- [X] shouty\n");
        assert_eq!(doc.lines()[1].kind(), LineKind::Checked);
        doc.toggle(1).unwrap();
        assert_eq!(doc.lines()[1].raw(), "- [ ] shouty\n");
    }

    #[test]
    fn attachment_target_is_extracted() {
        let doc = ChecklistDocument::parse(SAMPLE);
        assert_eq!(doc.lines()[6].target(), Some("generic/test1/file01"));
        assert_eq!(doc.lines()[4].target(), None);
    }

    #[test]
    fn toggle_changes_exactly_one_marker_byte() {
        let mut doc = ChecklistDocument::parse(SAMPLE);
        doc.toggle(4).unwrap();
        let rendered = doc.render();

        let changed: Vec<(&str, &str)> = SAMPLE
            .lines()
            .zip(rendered.lines())
            .filter(|(a, b)| a != b)
            .collect();
        assert_eq!(changed, vec![("- [ ] first check", "- [x] first check")]);
    }

    #[test]
    fn toggle_round_trips_to_original_bytes() {
        let mut doc = ChecklistDocument::parse(SAMPLE);
        doc.toggle(5).unwrap();
        doc.toggle(5).unwrap();
        assert_eq!(doc.render(), SAMPLE);
    }

    #[test]
    fn toggling_a_read_only_line_fails() {
        let mut doc = ChecklistDocument::parse(SAMPLE);
        let err = doc.toggle(7).unwrap_err();
        assert!(matches!(err, ChecklistError::NotACheckbox(_)));
        assert_eq!(doc.render(), SAMPLE);
    }

    #[test]
    fn upload_without_target_leaves_document_unchanged() {
        let mut doc = ChecklistDocument::parse(SAMPLE);
        let err = doc
            .upload(4, Path::new("/dev/null"), Path::new("/tmp"))
            .unwrap_err();
        assert!(matches!(err, ChecklistError::NoAttachmentTarget(_)));
        assert_eq!(doc.render(), SAMPLE);
    }

    #[test]
    fn upload_copies_and_marks_checked() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("generic/test1")).unwrap();
        let local = dir.path().join("local.log");
        std::fs::write(&local, b"log contents").unwrap();

        let mut doc = ChecklistDocument::parse(SAMPLE);
        doc.upload(6, &local, dir.path()).unwrap();

        let copied = std::fs::read(dir.path().join("generic/test1/file01")).unwrap();
        assert_eq!(copied, b"log contents");
        assert_eq!(doc.lines()[6].kind(), LineKind::Checked);
    }

    #[test]
    fn missing_heading_makes_everything_prefix() {
        let text = "just some notes\nno managed region here\n";
        let doc = ChecklistDocument::parse(text);
        assert!(!doc.has_managed_region());
        assert_eq!(doc.render(), text);
    }

    #[test]
    fn managed_region_runs_to_eof_without_a_next_heading() {
        let text = "# Tally\n\n- [ ] only check\n";
        let doc = ChecklistDocument::parse(text);
        assert_eq!(doc.suffix(), "");
        assert_eq!(doc.lines().len(), 3);
        assert_eq!(doc.render(), text);
    }

    #[test]
    fn checkbox_navigation_skips_read_only_lines() {
        let doc = ChecklistDocument::parse(SAMPLE);
        assert_eq!(doc.next_checkbox(0), Some(4));
        assert_eq!(doc.next_checkbox(4), Some(5));
        assert_eq!(doc.next_checkbox(6), None);
        assert_eq!(doc.prev_checkbox(6), Some(5));
        assert_eq!(doc.prev_checkbox(4), None);
    }

    #[test]
    fn line_numbers_count_from_the_document_start() {
        let doc = ChecklistDocument::parse(SAMPLE);
        // Line 1 is the prefix note, line 2 the heading.
        assert_eq!(doc.lines()[0].number(), 2);
        assert_eq!(doc.lines()[4].number(), 6);
    }

    #[test]
    fn file_without_trailing_newline_round_trips() {
        let text = "# Tally\n- [ ] last line no newline";
        let mut doc = ChecklistDocument::parse(text);
        assert_eq!(doc.render(), text);
        doc.toggle(1).unwrap();
        assert_eq!(doc.render(), "# Tally\n- [x] last line no newline");
    }
}
