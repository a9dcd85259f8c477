//! Inheritance resolution
//!
//! Materializes `extends:` chains into flat, immutable actor and test
//! records. Resolution is a load-time-only pass: scalar fields overwrite,
//! restated collections replace the parent's wholesale (no deep merge),
//! and afterwards no dispatch mechanism remains - consumers only ever see
//! the flattened records.

use crate::error::TemplateError;
use crate::section::{CommandSpec, Section, SectionKind};
use crate::source::ExpandedSource;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::path::Path;

/// Wildcard filter value: the tag key must be present, any value matches
pub const FILTER_ANY: &str = "__any__";

/// Reserved key for the pseudo-actor holding filter-less tests
pub const GENERIC_KEY: &str = "generic";

/// Display name of the pseudo-actor
pub const GENERIC_NAME: &str = "Generic";

/// The format version this build understands
const SUPPORTED_VERSION: u64 = 1;

/// One accepted value in a test's applicability filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterValue {
    /// `__any__`: the key must exist on the actor, any value
    Any,
    /// Plain value: the actor's tag must equal it
    Is(String),
    /// `!value`: the actor's tag must not equal it
    Not(String),
}

impl FilterValue {
    /// Parse the template spelling of a filter value
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw == FILTER_ANY {
            Self::Any
        } else if let Some(negated) = raw.strip_prefix('!') {
            Self::Not(negated.to_string())
        } else {
            Self::Is(raw.to_string())
        }
    }
}

/// A flattened actor record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedActor {
    /// Section key
    pub key: String,
    /// Human name, defaults to the key with underscores dashed
    pub name: String,
    /// Optional description paragraph
    pub description: Option<String>,
    /// Tag mapping, scalar values only
    pub tags: IndexMap<String, String>,
}

/// A flattened test record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTest {
    /// Section key
    pub key: String,
    /// Human name, defaults to the key with underscores dashed
    pub name: String,
    /// Optional description; described tests get their own subsection
    pub description: Option<String>,
    /// Applicability filter, empty means the test runs once under Generic
    pub filter: IndexMap<String, Vec<FilterValue>>,
    /// Plain checklist statements, source order
    pub statements: Vec<String>,
    /// Files to collect, source order
    pub files: Vec<String>,
    /// Commands to run, source order
    pub commands: Vec<CommandSpec>,
}

impl ResolvedTest {
    /// Whether the test has an applicability filter
    #[inline]
    #[must_use]
    pub fn is_filtered(&self) -> bool {
        !self.filter.is_empty()
    }

    /// Whether the test renders as its own named subsection
    #[inline]
    #[must_use]
    pub fn is_described(&self) -> bool {
        self.description.is_some()
    }
}

/// A fully loaded and resolved template
///
/// Immutable after construction; every consumer works from these records.
#[derive(Debug, Clone)]
pub struct Template {
    /// Format version, defaulted to 1 when absent
    pub version: u64,
    /// Free-form preamble paragraphs from the `file:` section, source order
    pub preamble: Vec<(String, String)>,
    /// Actors in first-definition order
    pub actors: Vec<ResolvedActor>,
    /// Tests in first-definition order
    pub tests: Vec<ResolvedTest>,
    /// Include-expanded template text with the version line restored
    pub combined: String,
}

impl Template {
    /// Load a template file, expanding includes relative to its directory.
    ///
    /// # Errors
    /// All loading, validation, and resolution errors from
    /// [`TemplateError`].
    pub fn from_file(path: &Path) -> Result<Self, TemplateError> {
        Self::from_source(ExpandedSource::from_file(path)?)
    }

    /// Load a template from text; `include:` directives are rejected.
    ///
    /// # Errors
    /// Same as [`Template::from_file`], plus `IncludeWithoutPath`.
    pub fn from_text(text: &str) -> Result<Self, TemplateError> {
        Self::from_source(ExpandedSource::from_text(text)?)
    }

    fn from_source(source: ExpandedSource) -> Result<Self, TemplateError> {
        let version = source.version.unwrap_or(1);
        if version != SUPPORTED_VERSION {
            return Err(TemplateError::UnsupportedVersion(version));
        }

        let document: Value = serde_yaml::from_str(&source.text)?;
        let mapping = document.as_mapping().ok_or(TemplateError::NotAMapping)?;

        let mut preamble = Vec::new();
        let mut sections: IndexMap<String, Section> = IndexMap::new();

        for (key, value) in mapping {
            let Some(key) = key.as_str() else {
                return Err(TemplateError::NotAMapping);
            };
            match key {
                "extends" | GENERIC_KEY => {
                    return Err(TemplateError::ReservedSection(key.to_string()));
                }
                "file" => parse_preamble(value, &mut preamble)?,
                _ => {
                    let section = Section::from_yaml(key, value)?;
                    sections.insert(key.to_string(), section);
                }
            }
        }

        let resolved = resolve_sections(&sections)?;
        let (actors, tests) = split_records(&sections, &resolved)?;

        if tests.is_empty() {
            return Err(TemplateError::NoTests);
        }

        let combined = format!("version: {version}\n{}", source.text);

        Ok(Self {
            version,
            preamble,
            actors,
            tests,
            combined,
        })
    }
}

fn parse_preamble(
    value: &Value,
    out: &mut Vec<(String, String)>,
) -> Result<(), TemplateError> {
    let mapping = value.as_mapping().ok_or_else(|| TemplateError::InvalidField {
        section: "file".to_string(),
        key: "file".to_string(),
    })?;
    for (name, text) in mapping {
        let (Some(name), Some(text)) = (name.as_str(), text.as_str()) else {
            return Err(TemplateError::InvalidField {
                section: "file".to_string(),
                key: format!("{name:?}"),
            });
        };
        out.push((name.to_string(), text.to_string()));
    }
    Ok(())
}

/// Resolve every section's `extends` chain into a flat record
fn resolve_sections(
    sections: &IndexMap<String, Section>,
) -> Result<IndexMap<String, Section>, TemplateError> {
    let mut done: IndexMap<String, Section> = IndexMap::new();
    for key in sections.keys() {
        let mut stack: Vec<String> = Vec::new();
        resolve_one(key, sections, &mut done, &mut stack)?;
    }
    Ok(done)
}

fn resolve_one(
    key: &str,
    sections: &IndexMap<String, Section>,
    done: &mut IndexMap<String, Section>,
    stack: &mut Vec<String>,
) -> Result<Section, TemplateError> {
    if let Some(resolved) = done.get(key) {
        return Ok(resolved.clone());
    }
    if stack.iter().any(|s| s == key) {
        let mut chain = stack.clone();
        chain.push(key.to_string());
        return Err(TemplateError::Cycle { chain });
    }

    // Present by construction: roots come from sections.keys(), extends
    // targets are checked before recursing.
    let section = sections.get(key).cloned().unwrap();

    let resolved = match section.extends.clone() {
        None => section,
        Some(target) => {
            if !sections.contains_key(&target) {
                return Err(TemplateError::unknown_reference(key, target));
            }
            stack.push(key.to_string());
            let parent = resolve_one(&target, sections, done, stack)?;
            stack.pop();
            overlay(parent, section)?
        }
    };

    done.insert(key.to_string(), resolved.clone());
    Ok(resolved)
}

/// Overlay a child section onto its resolved parent
///
/// Scalar fields overwrite; restated collections replace the parent's
/// wholesale.
fn overlay(parent: Section, child: Section) -> Result<Section, TemplateError> {
    let kind = match (parent.kind, child.kind) {
        (Some(p), Some(c)) if p != c => {
            return Err(TemplateError::type_mismatch(child.key, parent.key));
        }
        (p, c) => c.or(p),
    };

    Ok(Section {
        key: child.key,
        kind,
        name: child.name.or(parent.name),
        description: child.description.or(parent.description),
        extends: None,
        tags: child.tags.or(parent.tags),
        filter: child.filter.or(parent.filter),
        statements: child.statements.or(parent.statements),
        files: child.files.or(parent.files),
        commands: child.commands.or(parent.commands),
    })
}

/// Default human name: the key with underscores dashed
fn default_name(key: &str) -> String {
    key.replace('_', "-")
}

/// Turn resolved sections into typed records, in first-definition order
fn split_records(
    sections: &IndexMap<String, Section>,
    resolved: &IndexMap<String, Section>,
) -> Result<(Vec<ResolvedActor>, Vec<ResolvedTest>), TemplateError> {
    let mut actors = Vec::new();
    let mut tests = Vec::new();
    let mut actor_names: Vec<String> = Vec::new();

    for key in sections.keys() {
        let section = &resolved[key];
        let kind = section
            .kind
            .ok_or_else(|| TemplateError::MissingType(key.clone()))?;

        match kind {
            SectionKind::Actor => {
                for (field, present) in [
                    ("filter", section.filter.is_some()),
                    ("tests", section.statements.is_some()),
                    ("logs", section.files.is_some() || section.commands.is_some()),
                ] {
                    if present {
                        return Err(TemplateError::UnexpectedField {
                            section: key.clone(),
                            kind: kind.as_str(),
                            key: field.to_string(),
                        });
                    }
                }

                let name = section.name.clone().unwrap_or_else(|| default_name(key));
                if actor_names.iter().any(|n| n == &name) {
                    return Err(TemplateError::DuplicateActorName(name));
                }
                actor_names.push(name.clone());

                actors.push(ResolvedActor {
                    key: key.clone(),
                    name,
                    description: section.description.clone(),
                    tags: section.tags.clone().unwrap_or_default(),
                });
            }
            SectionKind::Test => {
                if section.tags.is_some() {
                    return Err(TemplateError::UnexpectedField {
                        section: key.clone(),
                        kind: kind.as_str(),
                        key: "tags".to_string(),
                    });
                }
                if section.statements.is_none()
                    && section.files.is_none()
                    && section.commands.is_none()
                {
                    return Err(TemplateError::EmptyTest(key.clone()));
                }

                let filter = section
                    .filter
                    .clone()
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(fkey, values)| {
                        let values = values.iter().map(|v| FilterValue::parse(v)).collect();
                        (fkey, values)
                    })
                    .collect();

                tests.push(ResolvedTest {
                    key: key.clone(),
                    name: section.name.clone().unwrap_or_else(|| default_name(key)),
                    description: section.description.clone(),
                    filter,
                    statements: section.statements.clone().unwrap_or_default(),
                    files: section.files.clone().unwrap_or_default(),
                    commands: section.commands.clone().unwrap_or_default(),
                });
            }
        }
    }

    Ok((actors, tests))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MINIMAL_TEST: &str = "t1:\n  type: test\n  tests: [do it]\n";

    fn template(yaml: &str) -> Result<Template, TemplateError> {
        Template::from_text(yaml)
    }

    #[test]
    fn minimal_template_loads() {
        let tpl = template(MINIMAL_TEST).unwrap();
        assert_eq!(tpl.version, 1);
        assert_eq!(tpl.tests.len(), 1);
        assert_eq!(tpl.tests[0].key, "t1");
        assert!(!tpl.tests[0].is_filtered());
    }

    #[test]
    fn scalar_document_is_rejected() {
        assert!(matches!(template("1"), Err(TemplateError::NotAMapping)));
        assert!(matches!(template("[1, 2]"), Err(TemplateError::NotAMapping)));
        assert!(matches!(template("foo"), Err(TemplateError::NotAMapping)));
    }

    #[test]
    fn missing_version_defaults_to_one() {
        let tpl = template(MINIMAL_TEST).unwrap();
        assert_eq!(tpl.version, 1);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let yaml = format!("version: 3\n{MINIMAL_TEST}");
        assert!(matches!(
            template(&yaml),
            Err(TemplateError::UnsupportedVersion(3))
        ));
    }

    #[test]
    fn reserved_names_are_rejected() {
        let yaml = format!("generic:\n  type: actor\n{MINIMAL_TEST}");
        assert!(matches!(
            template(&yaml),
            Err(TemplateError::ReservedSection(name)) if name == "generic"
        ));

        let yaml = format!("extends: t1\n{MINIMAL_TEST}");
        assert!(matches!(
            template(&yaml),
            Err(TemplateError::ReservedSection(name)) if name == "extends"
        ));
    }

    #[test]
    fn template_without_tests_is_rejected() {
        let yaml = "a1:\n  type: actor\n  tags:\n    bus: USB\n";
        assert!(matches!(template(yaml), Err(TemplateError::NoTests)));
    }

    #[test]
    fn child_overriding_name_keeps_parent_tags() {
        let yaml = format!(
            "base:\n  type: actor\n  tags:\n    device: keyboard\n    bus: USB\nchild:\n  extends: base\n  name: Wireless Keyboard\n{MINIMAL_TEST}"
        );
        let tpl = template(&yaml).unwrap();
        let child = &tpl.actors[1];
        assert_eq!(child.name, "Wireless Keyboard");
        assert_eq!(child.tags.get("device").map(String::as_str), Some("keyboard"));
        assert_eq!(child.tags.get("bus").map(String::as_str), Some("USB"));
    }

    #[test]
    fn restated_tags_replace_wholesale() {
        let yaml = format!(
            "base:\n  type: actor\n  name: Base\n  tags:\n    device: keyboard\n    bus: USB\nchild:\n  extends: base\n  name: Child\n  tags:\n    bus: bluetooth\n{MINIMAL_TEST}"
        );
        let tpl = template(&yaml).unwrap();
        let child = &tpl.actors[1];
        assert_eq!(child.tags.len(), 1);
        assert_eq!(child.tags.get("bus").map(String::as_str), Some("bluetooth"));
        assert!(!child.tags.contains_key("device"));
    }

    #[test]
    fn extends_chain_resolves_forward_references() {
        let yaml = "child:\n  extends: base\n  name: Child\nbase:\n  type: actor\n  tags:\n    bus: USB\nt1:\n  type: test\n  tests: [do it]\n";
        let tpl = template(yaml).unwrap();
        assert_eq!(tpl.actors[0].name, "Child");
        assert_eq!(tpl.actors[0].tags.get("bus").map(String::as_str), Some("USB"));
    }

    #[test]
    fn two_member_cycle_names_both() {
        let yaml = "a:\n  extends: b\nb:\n  extends: a\n";
        let err = template(yaml).unwrap_err();
        let TemplateError::Cycle { chain } = err else {
            panic!("expected cycle, got {err:?}");
        };
        assert!(chain.contains(&"a".to_string()));
        assert!(chain.contains(&"b".to_string()));
    }

    #[test]
    fn self_extends_is_a_cycle() {
        let yaml = "a:\n  extends: a\n";
        assert!(matches!(template(yaml), Err(TemplateError::Cycle { .. })));
    }

    #[test]
    fn unknown_extends_target_fails() {
        let yaml = "a:\n  type: actor\n  extends: ghost\n";
        assert!(matches!(
            template(yaml),
            Err(TemplateError::UnknownReference { section, target })
                if section == "a" && target == "ghost"
        ));
    }

    #[test]
    fn extends_across_types_fails() {
        let yaml = format!("a1:\n  type: actor\n  extends: t1\n  tags:\n    bus: USB\n{MINIMAL_TEST}");
        assert!(matches!(
            template(&yaml),
            Err(TemplateError::TypeMismatch { section, target })
                if section == "a1" && target == "t1"
        ));
    }

    #[test]
    fn type_is_inherited_through_extends() {
        let yaml = "base:\n  type: test\n  tests: [do it]\nmore:\n  extends: base\n  description: again\n";
        let tpl = template(yaml).unwrap();
        assert_eq!(tpl.tests.len(), 2);
        assert_eq!(tpl.tests[1].key, "more");
        assert!(tpl.tests[1].is_described());
    }

    #[test]
    fn duplicate_actor_names_fail() {
        let yaml = format!(
            "a1:\n  type: actor\n  name: Keyboard\na2:\n  type: actor\n  name: Keyboard\n{MINIMAL_TEST}"
        );
        assert!(matches!(
            template(&yaml),
            Err(TemplateError::DuplicateActorName(name)) if name == "Keyboard"
        ));
    }

    #[test]
    fn actor_name_defaults_to_dashed_key() {
        let yaml = format!("usb_keyboard:\n  type: actor\n{MINIMAL_TEST}");
        let tpl = template(&yaml).unwrap();
        assert_eq!(tpl.actors[0].name, "usb-keyboard");
    }

    #[test]
    fn filter_markers_are_parsed() {
        let yaml = "t1:\n  type: test\n  tests: [x]\n  filter:\n    bus: [USB, '!PS2', __any__]\n";
        let tpl = template(yaml).unwrap();
        let values = &tpl.tests[0].filter["bus"];
        assert_eq!(
            values,
            &vec![
                FilterValue::Is("USB".to_string()),
                FilterValue::Not("PS2".to_string()),
                FilterValue::Any,
            ]
        );
    }

    #[test]
    fn actor_with_test_fields_is_rejected() {
        let yaml = format!("a1:\n  type: actor\n  tests: [x]\n{MINIMAL_TEST}");
        assert!(matches!(
            template(&yaml),
            Err(TemplateError::UnexpectedField { key, .. }) if key == "tests"
        ));
    }

    #[test]
    fn test_without_content_is_rejected() {
        let yaml = "t1:\n  type: test\n  description: nothing here\n";
        assert!(matches!(
            template(yaml),
            Err(TemplateError::EmptyTest(key)) if key == "t1"
        ));
    }

    #[test]
    fn preamble_entries_are_collected_in_order() {
        let yaml = format!(
            "file:\n  notes.yaml: |\n    Fill me in.\n  more.yaml: second\n{MINIMAL_TEST}"
        );
        let tpl = template(&yaml).unwrap();
        assert_eq!(tpl.preamble.len(), 2);
        assert_eq!(tpl.preamble[0].0, "notes.yaml");
        assert!(tpl.preamble[0].1.contains("Fill me in."));
        assert_eq!(tpl.preamble[1].1, "second");
    }

    #[test]
    fn combined_text_restores_the_version_line() {
        let tpl = template(MINIMAL_TEST).unwrap();
        assert!(tpl.combined.starts_with("version: 1\n"));
        assert!(tpl.combined.contains("t1:"));
    }
}
