//! Decodes a posted draft form into draft actions.

use crate::draft::{DraftAction, Field, NodeId};
use std::collections::HashMap;

/// What the clicked button asked for, after field values are synced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormOp {
    /// Only store the typed values.
    Save,
    Edit(DraftAction),
    Submit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmission {
    pub fields: Vec<DraftAction>,
    pub op: FormOp,
}

impl FormSubmission {
    /// `is_program` decides whether top-level `type` belongs to the form.
    pub fn parse(form: &HashMap<String, String>, is_program: bool) -> Result<Self, String> {
        let mut fields = Vec::new();
        if let Some(name) = form.get("name") {
            fields.push(DraftAction::SetName { value: name.clone() });
        }
        if !is_program {
            if let Some(kind) = form.get("type") {
                fields.push(DraftAction::SetType { value: kind.clone() });
            }
        }

        let mut node_fields: Vec<(NodeId, Field, String)> = form
            .iter()
            .filter_map(|(key, value)| {
                let (node, field) = parse_field_key(key)?;
                Some((node, field, value.clone()))
            })
            .collect();
        node_fields.sort_by_key(|(node, field, _)| (node.0, field.as_str()));
        fields.extend(
            node_fields
                .into_iter()
                .map(|(node, field, value)| DraftAction::SetField { node, field, value }),
        );

        let op = match form.get("op").map(String::as_str) {
            None | Some("") | Some("save") => FormOp::Save,
            Some("submit") => FormOp::Submit,
            Some("resize") => {
                let raw = form.get("duration").map(String::as_str).unwrap_or("");
                let duration = raw
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| format!("Duration must be a whole number of weeks, got '{raw}'"))?;
                FormOp::Edit(DraftAction::Resize { duration })
            }
            Some("add_section") => FormOp::Edit(DraftAction::AddSection { kind: None }),
            Some(other) => FormOp::Edit(parse_targeted(other).ok_or_else(|| format!("Unknown form action '{other}'"))?),
        };

        Ok(Self { fields, op })
    }
}

fn parse_field_key(key: &str) -> Option<(NodeId, Field)> {
    let (node, field) = key.strip_prefix('n')?.split_once('.')?;
    Some((NodeId(node.parse().ok()?), Field::parse(field)?))
}

fn parse_targeted(op: &str) -> Option<DraftAction> {
    let (verb, target) = op.split_once(':')?;
    let target = NodeId(target.parse().ok()?);
    let action = match verb {
        "add_day" => DraftAction::AddDay { week: target },
        "remove_day" => DraftAction::RemoveDay { day: target },
        "remove_section" => DraftAction::RemoveSection { section: target },
        "add_exercise" => DraftAction::AddExercise { parent: target },
        "remove_exercise" => DraftAction::RemoveExercise { exercise: target },
        _ => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn parses_fields_and_targeted_op() {
        let parsed = FormSubmission::parse(
            &form(&[
                ("name", "Push"),
                ("type", "strength"),
                ("n4.reps", "30 sec"),
                ("n4.name", "Plank"),
                ("n9.bogus", "x"),
                ("op", "remove_exercise:4"),
            ]),
            false,
        )
        .unwrap();

        assert_eq!(
            parsed.fields,
            vec![
                DraftAction::SetName { value: "Push".to_string() },
                DraftAction::SetType { value: "strength".to_string() },
                DraftAction::SetField {
                    node: NodeId(4),
                    field: Field::Name,
                    value: "Plank".to_string(),
                },
                DraftAction::SetField {
                    node: NodeId(4),
                    field: Field::Reps,
                    value: "30 sec".to_string(),
                },
            ]
        );
        assert_eq!(
            parsed.op,
            FormOp::Edit(DraftAction::RemoveExercise { exercise: NodeId(4) })
        );
    }

    #[test]
    fn program_forms_ignore_type_and_resize_reads_duration() {
        let parsed = FormSubmission::parse(
            &form(&[("name", "Base"), ("type", "ignored"), ("duration", "6"), ("op", "resize")]),
            true,
        )
        .unwrap();
        assert_eq!(parsed.fields.len(), 1);
        assert_eq!(parsed.op, FormOp::Edit(DraftAction::Resize { duration: 6 }));
    }

    #[test]
    fn rejects_unknown_ops() {
        assert!(FormSubmission::parse(&form(&[("op", "explode:3")]), false).is_err());
        assert!(FormSubmission::parse(&form(&[("op", "resize"), ("duration", "four")]), true).is_err());
        assert_eq!(
            FormSubmission::parse(&form(&[]), true).unwrap().op,
            FormOp::Save
        );
    }
}
