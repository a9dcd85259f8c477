//! Checklist compilation
//!
//! Builds the full actor×test applicability matrix and groups it into a
//! [`CompiledDocument`]: Generic first with every filter-less test
//! exactly once, then each actor in first-definition order with the
//! filtered tests it matches. Within a section, description-less tests
//! contribute their items to one leading unlabeled group and described
//! tests each get their own subgroup, all in template source order.

use crate::document::{CompiledDocument, DocSection, Item, Subgroup};
use crate::matcher::matches;
use crate::plan::AttachmentTarget;
use tally_template::{ResolvedTest, Template, GENERIC_KEY, GENERIC_NAME};

/// Compile a resolved template into the document model.
///
/// Identical input always yields an identical document: every collection
/// iterated here preserves insertion order.
#[must_use]
pub fn compile(template: &Template) -> CompiledDocument {
    let mut sections = Vec::with_capacity(template.actors.len() + 1);
    sections.push(DocSection {
        key: GENERIC_KEY.to_string(),
        title: GENERIC_NAME.to_string(),
        description: None,
        lead: Vec::new(),
        subgroups: Vec::new(),
    });
    for actor in &template.actors {
        sections.push(DocSection {
            key: actor.key.clone(),
            title: actor.name.clone(),
            description: actor.description.clone(),
            lead: Vec::new(),
            subgroups: Vec::new(),
        });
    }

    let mut match_counts = vec![0usize; template.tests.len()];

    for (sidx, section) in sections.iter_mut().enumerate() {
        let actor = (sidx > 0).then(|| &template.actors[sidx - 1]);

        for (tidx, test) in template.tests.iter().enumerate() {
            let applies = match actor {
                // Filter-less tests run once under Generic.
                None => !test.is_filtered(),
                Some(actor) => test.is_filtered() && matches(&actor.tags, &test.filter),
            };
            if !applies {
                continue;
            }
            match_counts[tidx] += 1;

            let items = build_items(&section.key, test);
            if let Some(description) = &test.description {
                section.subgroups.push(Subgroup {
                    test_key: test.key.clone(),
                    title: test.name.clone(),
                    description: description.clone(),
                    items,
                });
            } else {
                section.lead.extend(items);
            }
        }
    }

    for (tidx, test) in template.tests.iter().enumerate() {
        if match_counts[tidx] == 0 {
            tracing::warn!(
                test = %test.key,
                "filter matches no actor, test is omitted from the checklist"
            );
        }
    }

    CompiledDocument {
        preamble: template
            .preamble
            .iter()
            .map(|(_, text)| text.clone())
            .collect(),
        sections,
    }
}

/// One test's checkbox items for one section: statements, then files,
/// then commands, each in source order
fn build_items(section_key: &str, test: &ResolvedTest) -> Vec<Item> {
    let mut items = Vec::new();

    for statement in &test.statements {
        items.push(Item::Statement(statement.clone()));
    }
    for file in &test.files {
        items.push(Item::File {
            name: file.clone(),
            target: AttachmentTarget::new(section_key, &test.key, file),
        });
    }
    for command in &test.commands {
        let target = command
            .output
            .wants_attachment()
            .then(|| AttachmentTarget::new(section_key, &test.key, &command.run));
        items.push(Item::Command {
            run: command.run.clone(),
            description: command.description.clone(),
            mode: command.output,
            target,
        });
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::build_plan;
    use pretty_assertions::assert_eq;

    fn compile_text(yaml: &str) -> CompiledDocument {
        compile(&Template::from_text(yaml).unwrap())
    }

    #[test]
    fn filterless_test_lands_under_generic_exactly_once() {
        let doc = compile_text(
            "a1:\n  type: actor\n  tags:\n    bus: USB\nt1:\n  type: test\n  tests: [always run me]\n",
        );

        let generic = &doc.sections[0];
        assert_eq!(generic.key, "generic");
        assert_eq!(
            generic.lead,
            vec![Item::Statement("always run me".to_string())]
        );

        let actor = &doc.sections[1];
        assert!(actor.is_empty());
    }

    #[test]
    fn filtered_tests_go_to_matching_actors_in_order() {
        let doc = compile_text(
            "\
kbd:
  type: actor
  tags:
    device: keyboard
mouse:
  type: actor
  tags:
    device: mouse
t1:
  type: test
  filter:
    device: [keyboard]
  tests: [kbd only]
t2:
  type: test
  filter:
    device: [__any__]
  tests: [any device]
",
        );

        assert!(doc.sections[0].is_empty());
        assert_eq!(
            doc.sections[1].lead,
            vec![
                Item::Statement("kbd only".to_string()),
                Item::Statement("any device".to_string()),
            ]
        );
        assert_eq!(
            doc.sections[2].lead,
            vec![Item::Statement("any device".to_string())]
        );
    }

    #[test]
    fn described_tests_become_subgroups_after_the_lead_group() {
        // T1 and T3 undescribed, T2 described "B", T4 described "A":
        // lead group keeps source order, subgroups keep source order,
        // nothing is alphabetized.
        let doc = compile_text(
            "\
t1:
  type: test
  tests: [one]
t2:
  type: test
  name: B
  description: described b
  tests: [two]
t3:
  type: test
  tests: [three]
t4:
  type: test
  name: A
  description: described a
  tests: [four]
",
        );

        let generic = &doc.sections[0];
        assert_eq!(
            generic.lead,
            vec![
                Item::Statement("one".to_string()),
                Item::Statement("three".to_string()),
            ]
        );
        let titles: Vec<&str> = generic.subgroups.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "A"]);
    }

    #[test]
    fn items_keep_statement_file_command_order() {
        let doc = compile_text(
            "\
t1:
  type: test
  tests: [check it]
  logs:
    files: [evdev.log]
    commands:
    - run: lsusb -v
      output: attach
    - run: uname -r
",
        );

        let lead = &doc.sections[0].lead;
        assert_eq!(lead.len(), 4);
        assert!(matches!(lead[0], Item::Statement(_)));
        assert!(matches!(lead[1], Item::File { .. }));
        let Item::Command { target, .. } = &lead[2] else {
            panic!("expected command");
        };
        assert_eq!(
            target.as_ref().unwrap().path,
            "generic/t1/lsusb\u{00A0}-v"
        );
        let Item::Command { target, .. } = &lead[3] else {
            panic!("expected command");
        };
        assert!(target.is_none());
    }

    #[test]
    fn compiling_twice_is_deterministic() {
        let yaml = "\
kbd:
  type: actor
  tags:
    device: keyboard
t1:
  type: test
  filter:
    device: [keyboard]
  tests: [press keys]
  logs:
    files: [evdev.log]
t2:
  type: test
  tests: [generic check]
";
        let template = Template::from_text(yaml).unwrap();
        let first = compile(&template);
        let second = compile(&template);
        assert_eq!(first, second);

        let paths = |doc: &CompiledDocument| -> Vec<String> {
            build_plan(doc)
                .unwrap()
                .targets()
                .iter()
                .map(|t| t.path.clone())
                .collect()
        };
        assert_eq!(paths(&first), paths(&second));
    }

    #[test]
    fn zero_match_filter_produces_an_empty_section_set() {
        let doc = compile_text(
            "a1:\n  type: actor\n  tags:\n    bus: USB\nt1:\n  type: test\n  filter:\n    bus: [PS2]\n  tests: [never runs]\n",
        );
        assert!(doc.sections.iter().all(DocSection::is_empty));
    }

    #[test]
    fn preamble_paragraphs_are_carried_over() {
        let doc = compile_text(
            "file:\n  notes: Checklist for the weekly run.\nt1:\n  type: test\n  tests: [x]\n",
        );
        assert_eq!(doc.preamble, vec!["Checklist for the weekly run.".to_string()]);
    }
}
