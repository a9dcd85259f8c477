//! Raw template sections
//!
//! One [`Section`] per top-level mapping entry, duck-typed YAML turned
//! into a validated record: tag and filter values must be scalars, lists
//! must be lists, commands must name the invocation to run. Anything that
//! would only blow up later during matching or rendering is rejected here
//! instead, with the section name in the error.

use crate::error::TemplateError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// What a section describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionKind {
    /// A tracked entity that tests are evaluated against
    Actor,
    /// A test definition with applicability filter and checklist content
    Test,
}

impl SectionKind {
    /// Lowercase name as written in templates
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Actor => "actor",
            Self::Test => "test",
        }
    }
}

/// How a command's output is recorded in the checklist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputMode {
    /// One line of output, filled into the checklist inline
    #[default]
    Single,
    /// Full output, stored as an attachment
    Multi,
    /// Output attached as a file
    Attach,
    /// Only the exit code matters
    ExitCode,
    /// A human writes up the result
    Human,
}

impl OutputMode {
    /// Parse the template spelling of an output mode
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "single" => Some(Self::Single),
            "multi" => Some(Self::Multi),
            "attach" => Some(Self::Attach),
            "exitcode" => Some(Self::ExitCode),
            "human" => Some(Self::Human),
            _ => None,
        }
    }

    /// Whether output in this mode is backed by an attachment file
    #[inline]
    #[must_use]
    pub fn wants_attachment(self) -> bool {
        matches!(self, Self::Attach | Self::Multi | Self::ExitCode)
    }
}

/// A command a checkbox asks the tester to run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Invocation text
    pub run: String,
    /// Optional human description
    pub description: Option<String>,
    /// How the output is recorded
    pub output: OutputMode,
}

/// One raw definition entry, before inheritance resolution
///
/// Every list/mapping field is an `Option` so the resolver can tell a
/// restated-empty field (replaces the parent's) from an absent one
/// (inherits the parent's).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Section key in the template mapping
    pub key: String,
    /// Declared type, possibly inherited via `extends`
    pub kind: Option<SectionKind>,
    /// Human name
    pub name: Option<String>,
    /// Free-form description
    pub description: Option<String>,
    /// Section this one inherits from
    pub extends: Option<String>,
    /// Actor tags, scalar values only
    pub tags: Option<IndexMap<String, String>>,
    /// Test applicability filter, raw marker strings
    pub filter: Option<IndexMap<String, Vec<String>>>,
    /// Plain checklist statements
    pub statements: Option<Vec<String>>,
    /// Files to collect
    pub files: Option<Vec<String>>,
    /// Commands to run
    pub commands: Option<Vec<CommandSpec>>,
}

impl Section {
    /// Parse one top-level mapping entry into a raw section.
    ///
    /// # Errors
    /// Fails when the entry is not a mapping, when a field has the wrong
    /// shape, or when tag/filter values are not scalars.
    pub fn from_yaml(key: &str, value: &Value) -> Result<Self, TemplateError> {
        let mapping = value.as_mapping().ok_or_else(|| TemplateError::InvalidField {
            section: key.to_string(),
            key: "type".to_string(),
        })?;

        let mut section = Self {
            key: key.to_string(),
            kind: None,
            name: None,
            description: None,
            extends: None,
            tags: None,
            filter: None,
            statements: None,
            files: None,
            commands: None,
        };

        for (field, fvalue) in mapping {
            let Some(field) = field.as_str() else {
                return Err(TemplateError::InvalidField {
                    section: key.to_string(),
                    key: format!("{field:?}"),
                });
            };
            match field {
                "type" => {
                    let value = expect_str(key, field, fvalue)?;
                    section.kind = Some(match value {
                        "actor" => SectionKind::Actor,
                        "test" => SectionKind::Test,
                        other => {
                            return Err(TemplateError::UnknownType {
                                section: key.to_string(),
                                value: other.to_string(),
                            });
                        }
                    });
                }
                "name" => section.name = Some(expect_str(key, field, fvalue)?.to_string()),
                "description" => {
                    section.description = Some(expect_str(key, field, fvalue)?.to_string());
                }
                "extends" => section.extends = Some(expect_str(key, field, fvalue)?.to_string()),
                "tags" => section.tags = Some(parse_tags(key, fvalue)?),
                "filter" => section.filter = Some(parse_filter(key, fvalue)?),
                "tests" => section.statements = Some(parse_string_list(key, field, fvalue)?),
                "logs" => parse_logs(key, fvalue, &mut section)?,
                other => {
                    return Err(TemplateError::InvalidField {
                        section: key.to_string(),
                        key: other.to_string(),
                    });
                }
            }
        }

        Ok(section)
    }
}

/// Stringify a YAML scalar, rejecting everything else
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn expect_str<'a>(section: &str, field: &str, value: &'a Value) -> Result<&'a str, TemplateError> {
    value.as_str().ok_or_else(|| TemplateError::InvalidField {
        section: section.to_string(),
        key: field.to_string(),
    })
}

fn parse_tags(section: &str, value: &Value) -> Result<IndexMap<String, String>, TemplateError> {
    let mapping = value.as_mapping().ok_or_else(|| TemplateError::InvalidField {
        section: section.to_string(),
        key: "tags".to_string(),
    })?;

    let mut tags = IndexMap::new();
    for (tag, tvalue) in mapping {
        let tag = scalar_to_string(tag).ok_or_else(|| TemplateError::NonScalarTag {
            section: section.to_string(),
            key: format!("{tag:?}"),
        })?;
        let tvalue = scalar_to_string(tvalue).ok_or_else(|| TemplateError::NonScalarTag {
            section: section.to_string(),
            key: tag.clone(),
        })?;
        tags.insert(tag, tvalue);
    }
    Ok(tags)
}

fn parse_filter(
    section: &str,
    value: &Value,
) -> Result<IndexMap<String, Vec<String>>, TemplateError> {
    let mapping = value.as_mapping().ok_or_else(|| TemplateError::InvalidField {
        section: section.to_string(),
        key: "filter".to_string(),
    })?;

    let mut filter = IndexMap::new();
    for (fkey, fvalues) in mapping {
        let fkey = scalar_to_string(fkey).ok_or_else(|| TemplateError::FilterShape {
            section: section.to_string(),
            key: format!("{fkey:?}"),
        })?;
        let list = fvalues.as_sequence().ok_or_else(|| TemplateError::FilterShape {
            section: section.to_string(),
            key: fkey.clone(),
        })?;
        let mut values = Vec::with_capacity(list.len());
        for v in list {
            let v = scalar_to_string(v).ok_or_else(|| TemplateError::FilterShape {
                section: section.to_string(),
                key: fkey.clone(),
            })?;
            values.push(v);
        }
        filter.insert(fkey, values);
    }
    Ok(filter)
}

fn parse_string_list(
    section: &str,
    field: &str,
    value: &Value,
) -> Result<Vec<String>, TemplateError> {
    let list = value.as_sequence().ok_or_else(|| TemplateError::InvalidField {
        section: section.to_string(),
        key: field.to_string(),
    })?;
    list.iter()
        .map(|v| {
            scalar_to_string(v).ok_or_else(|| TemplateError::InvalidField {
                section: section.to_string(),
                key: field.to_string(),
            })
        })
        .collect()
}

fn parse_logs(section: &str, value: &Value, out: &mut Section) -> Result<(), TemplateError> {
    let mapping = value.as_mapping().ok_or_else(|| TemplateError::InvalidField {
        section: section.to_string(),
        key: "logs".to_string(),
    })?;

    for (field, fvalue) in mapping {
        match field.as_str() {
            Some("files") => out.files = Some(parse_string_list(section, "files", fvalue)?),
            Some("commands") => {
                let list = fvalue.as_sequence().ok_or_else(|| TemplateError::InvalidField {
                    section: section.to_string(),
                    key: "commands".to_string(),
                })?;
                let mut commands = Vec::with_capacity(list.len());
                for entry in list {
                    commands.push(parse_command(section, entry)?);
                }
                out.commands = Some(commands);
            }
            _ => {
                return Err(TemplateError::InvalidField {
                    section: section.to_string(),
                    key: "logs".to_string(),
                });
            }
        }
    }
    Ok(())
}

fn parse_command(section: &str, value: &Value) -> Result<CommandSpec, TemplateError> {
    let mapping = value.as_mapping().ok_or_else(|| TemplateError::InvalidField {
        section: section.to_string(),
        key: "commands".to_string(),
    })?;

    let mut run = None;
    let mut description = None;
    let mut output = OutputMode::default();

    for (field, fvalue) in mapping {
        match field.as_str() {
            Some("run") => run = Some(expect_str(section, "run", fvalue)?.to_string()),
            Some("description") => {
                description = Some(expect_str(section, "description", fvalue)?.to_string());
            }
            Some("output") => {
                let value = expect_str(section, "output", fvalue)?;
                output = OutputMode::parse(value).ok_or_else(|| TemplateError::InvalidField {
                    section: section.to_string(),
                    key: "output".to_string(),
                })?;
            }
            _ => {
                return Err(TemplateError::InvalidField {
                    section: section.to_string(),
                    key: "commands".to_string(),
                });
            }
        }
    }

    let run = run.ok_or_else(|| TemplateError::InvalidField {
        section: section.to_string(),
        key: "run".to_string(),
    })?;

    Ok(CommandSpec {
        run,
        description,
        output,
    })
}
