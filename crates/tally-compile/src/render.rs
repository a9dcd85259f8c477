//! Markdown rendering
//!
//! Serializes a [`CompiledDocument`] into the checklist text format: one
//! fixed top-level heading opening the managed region, one second-level
//! heading per section, third-level headings for described tests, one
//! checkbox line per item. Attachment-backed items carry an inline link
//! whose target is the plan's path for the same triple, so the renderer
//! and the file plan always agree on the same string.

use crate::document::{CompiledDocument, DocSection, Item, Subgroup};
use tally_checklist::MANAGED_HEADING;
use tally_template::OutputMode;

/// Trailing annotation per output mode
fn annotation(mode: OutputMode) -> &'static str {
    match mode {
        OutputMode::Single => "(single line)",
        OutputMode::Multi => "(full output)",
        OutputMode::Attach => "(attach)",
        OutputMode::ExitCode => "(exit code)",
        OutputMode::Human => "(comments)",
    }
}

/// Render the document to checklist text
#[must_use]
pub fn render(doc: &CompiledDocument) -> String {
    let mut out = String::new();
    out.push_str(MANAGED_HEADING);
    out.push('\n');

    for paragraph in &doc.preamble {
        push_paragraph(&mut out, paragraph);
    }

    for section in &doc.sections {
        render_section(&mut out, section);
    }

    out
}

fn render_section(out: &mut String, section: &DocSection) {
    out.push('\n');
    out.push_str("## ");
    out.push_str(&section.title);
    out.push('\n');

    if let Some(description) = &section.description {
        push_paragraph(out, description);
    }

    if !section.lead.is_empty() {
        out.push('\n');
        for item in &section.lead {
            render_item(out, item);
        }
    }

    for subgroup in &section.subgroups {
        render_subgroup(out, subgroup);
    }
}

fn render_subgroup(out: &mut String, subgroup: &Subgroup) {
    out.push('\n');
    out.push_str("### ");
    out.push_str(&subgroup.title);
    out.push('\n');

    push_paragraph(out, &subgroup.description);

    if !subgroup.items.is_empty() {
        out.push('\n');
        for item in &subgroup.items {
            render_item(out, item);
        }
    }
}

fn render_item(out: &mut String, item: &Item) {
    match item {
        Item::Statement(text) => {
            out.push_str("- [ ] ");
            out.push_str(text);
            out.push('\n');
        }
        Item::File { name, target } => {
            out.push_str(&format!("- [ ] \u{1F4CE} [`{name}`]({})\n", target.path));
        }
        Item::Command {
            run,
            description,
            mode,
            target,
        } => {
            match target {
                Some(target) => out.push_str(&format!(
                    "- [ ] \u{2699} [`{run}`]({}) {}\n",
                    target.path,
                    annotation(*mode)
                )),
                None => {
                    out.push_str(&format!("- [ ] \u{2699} `{run}` {}\n", annotation(*mode)));
                }
            }
            if let Some(description) = description {
                out.push_str("  - ");
                out.push_str(description);
                out.push('\n');
            }
        }
    }
}

/// A paragraph: blank line, trimmed text, newline
fn push_paragraph(out: &mut String, text: &str) {
    out.push('\n');
    out.push_str(text.trim_end());
    out.push('\n');
}
