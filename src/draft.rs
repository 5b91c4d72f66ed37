//! In-memory draft tree for program and workout forms.
//!
//! A draft is built empty or from an existing record, edited through
//! [`DraftAction`]s, and finally read back by [`crate::collect`]. Every
//! day, section and exercise carries a [`NodeId`] so form controls can
//! address it without reference to rendered markup.

use crate::models::{Amount, Day, Exercise, Program, Section, SectionType, Workout};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_WEEKS: u32 = 52;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseNode {
    pub id: NodeId,
    pub name: String,
    pub sets: String,
    pub reps: String,
    pub notes: String,
}

impl ExerciseNode {
    fn blank(id: NodeId) -> Self {
        Self {
            id,
            name: String::new(),
            sets: String::new(),
            reps: String::new(),
            notes: String::new(),
        }
    }

    fn from_exercise(id: NodeId, exercise: &Exercise) -> Self {
        Self {
            id,
            name: exercise.name.clone(),
            sets: amount_text(exercise.sets.as_ref()),
            reps: amount_text(exercise.reps.as_ref()),
            notes: exercise.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayNode {
    pub id: NodeId,
    pub workout_name: String,
    pub workout_type: String,
    pub exercises: Vec<ExerciseNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekNode {
    pub id: NodeId,
    pub days: Vec<DayNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionNode {
    pub id: NodeId,
    pub kind: SectionType,
    pub exercises: Vec<ExerciseNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramDraft {
    pub name: String,
    pub duration: u32,
    pub weeks: Vec<WeekNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutDraft {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sections: Vec<SectionNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "lowercase")]
pub enum DraftBody {
    Program(ProgramDraft),
    Workout(WorkoutDraft),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    /// Set when the draft edits an existing record.
    pub record_id: Option<String>,
    pub body: DraftBody,
    next_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Sets,
    Reps,
    Notes,
    WorkoutName,
    WorkoutType,
    SectionType,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Sets => "sets",
            Self::Reps => "reps",
            Self::Notes => "notes",
            Self::WorkoutName => "workout_name",
            Self::WorkoutType => "workout_type",
            Self::SectionType => "section_type",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        [
            Self::Name,
            Self::Sets,
            Self::Reps,
            Self::Notes,
            Self::WorkoutName,
            Self::WorkoutType,
            Self::SectionType,
        ]
        .into_iter()
        .find(|field| field.as_str() == raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DraftAction {
    SetName { value: String },
    SetType { value: String },
    Resize { duration: u32 },
    AddDay { week: NodeId },
    RemoveDay { day: NodeId },
    AddSection {
        #[serde(default)]
        kind: Option<SectionType>,
    },
    RemoveSection { section: NodeId },
    AddExercise { parent: NodeId },
    RemoveExercise { exercise: NodeId },
    SetField { node: NodeId, field: Field, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    UnknownNode(NodeId),
    InvalidDuration(u32),
    LastSection,
    NotApplicable(&'static str),
    InvalidValue { field: Field, value: String },
}

impl fmt::Display for DraftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNode(id) => write!(f, "no form element with id {id}"),
            Self::InvalidDuration(weeks) => {
                write!(f, "duration must be between 1 and {MAX_WEEKS} weeks, got {weeks}")
            }
            Self::LastSection => f.write_str("A workout must have at least one section"),
            Self::NotApplicable(what) => write!(f, "{what} is not available on this form"),
            Self::InvalidValue { field, value } => {
                write!(f, "invalid value '{value}' for {}", field.as_str())
            }
        }
    }
}

impl std::error::Error for DraftError {}

impl Draft {
    /// Empty program form with `duration` numbered weeks and no days.
    pub fn program(duration: u32) -> Result<Self, DraftError> {
        check_duration(duration)?;
        let mut draft = Self::with_body(DraftBody::Program(ProgramDraft {
            name: String::new(),
            duration: 0,
            weeks: Vec::new(),
        }));
        draft.apply(DraftAction::Resize { duration })?;
        Ok(draft)
    }

    /// Empty workout form holding a single main section.
    pub fn workout() -> Self {
        let mut draft = Self::with_body(DraftBody::Workout(WorkoutDraft {
            name: String::new(),
            kind: String::new(),
            sections: Vec::new(),
        }));
        let id = draft.next_node();
        if let DraftBody::Workout(workout) = &mut draft.body {
            workout.sections.push(SectionNode {
                id,
                kind: SectionType::Main,
                exercises: Vec::new(),
            });
        }
        draft
    }

    pub fn from_program(program: &Program) -> Self {
        let mut draft = Self::with_body(DraftBody::Program(ProgramDraft {
            name: program.name.clone(),
            duration: 0,
            weeks: Vec::new(),
        }));
        let mut weeks = Vec::with_capacity(program.weeks.len());
        for week in &program.weeks {
            let week_id = draft.next_node();
            let days = week.days.iter().map(|day| draft.day_node(day)).collect();
            weeks.push(WeekNode { id: week_id, days });
        }
        let duration = if program.duration == 0 {
            (weeks.len() as u32).max(1)
        } else {
            program.duration.min(MAX_WEEKS)
        };
        if let DraftBody::Program(body) = &mut draft.body {
            body.weeks = weeks;
            body.duration = body.weeks.len() as u32;
        }
        draft.record_id = Some(program.id.clone());
        // Stored records may disagree with their own duration.
        let _ = draft.apply(DraftAction::Resize { duration });
        draft
    }

    pub fn from_workout(workout: &Workout) -> Self {
        let mut draft = Self::with_body(DraftBody::Workout(WorkoutDraft {
            name: workout.name.clone(),
            kind: workout.kind.clone(),
            sections: Vec::new(),
        }));
        let mut sections: Vec<SectionNode> = workout
            .sections
            .iter()
            .map(|section| draft.section_node(section))
            .collect();
        if sections.is_empty() {
            sections.push(SectionNode {
                id: draft.next_node(),
                kind: SectionType::Main,
                exercises: Vec::new(),
            });
        }
        if let DraftBody::Workout(body) = &mut draft.body {
            body.sections = sections;
        }
        draft.record_id = Some(workout.id.clone());
        draft
    }

    pub fn is_program(&self) -> bool {
        matches!(self.body, DraftBody::Program(_))
    }

    /// Applies one edit. A failed action leaves the draft untouched.
    pub fn apply(&mut self, action: DraftAction) -> Result<(), DraftError> {
        match action {
            DraftAction::SetName { value } => {
                match &mut self.body {
                    DraftBody::Program(program) => program.name = value,
                    DraftBody::Workout(workout) => workout.name = value,
                }
                Ok(())
            }
            DraftAction::SetType { value } => {
                self.workout_mut("workout type")?.kind = value;
                Ok(())
            }
            DraftAction::Resize { duration } => self.resize(duration),
            DraftAction::AddDay { week } => {
                let id = self.peek_node();
                let program = self.program_mut("adding a day")?;
                let week = program
                    .weeks
                    .iter_mut()
                    .find(|candidate| candidate.id == week)
                    .ok_or(DraftError::UnknownNode(week))?;
                week.days.push(DayNode {
                    id,
                    workout_name: String::new(),
                    workout_type: String::new(),
                    exercises: Vec::new(),
                });
                self.next_id += 1;
                Ok(())
            }
            DraftAction::RemoveDay { day } => {
                let program = self.program_mut("removing a day")?;
                for week in &mut program.weeks {
                    if let Some(index) = week.days.iter().position(|d| d.id == day) {
                        week.days.remove(index);
                        return Ok(());
                    }
                }
                Err(DraftError::UnknownNode(day))
            }
            DraftAction::AddSection { kind } => {
                let id = self.peek_node();
                let workout = self.workout_mut("adding a section")?;
                workout.sections.push(SectionNode {
                    id,
                    kind: kind.unwrap_or(SectionType::Main),
                    exercises: Vec::new(),
                });
                self.next_id += 1;
                Ok(())
            }
            DraftAction::RemoveSection { section } => {
                let workout = self.workout_mut("removing a section")?;
                let index = workout
                    .sections
                    .iter()
                    .position(|s| s.id == section)
                    .ok_or(DraftError::UnknownNode(section))?;
                if workout.sections.len() == 1 {
                    return Err(DraftError::LastSection);
                }
                workout.sections.remove(index);
                Ok(())
            }
            DraftAction::AddExercise { parent } => {
                let id = self.peek_node();
                let exercises = self
                    .exercise_list_mut(parent)
                    .ok_or(DraftError::UnknownNode(parent))?;
                exercises.push(ExerciseNode::blank(id));
                self.next_id += 1;
                Ok(())
            }
            DraftAction::RemoveExercise { exercise } => {
                for list in self.exercise_lists_mut() {
                    if let Some(index) = list.iter().position(|e| e.id == exercise) {
                        list.remove(index);
                        return Ok(());
                    }
                }
                Err(DraftError::UnknownNode(exercise))
            }
            DraftAction::SetField { node, field, value } => self.set_field(node, field, value),
        }
    }

    fn resize(&mut self, duration: u32) -> Result<(), DraftError> {
        check_duration(duration)?;
        let first_id = self.next_id;
        let program = self.program_mut("changing the duration")?;
        let target = duration as usize;
        program.weeks.truncate(target);
        let mut next = first_id;
        while program.weeks.len() < target {
            program.weeks.push(WeekNode {
                id: NodeId(next),
                days: Vec::new(),
            });
            next += 1;
        }
        program.duration = duration;
        self.next_id = next;
        Ok(())
    }

    fn set_field(&mut self, node: NodeId, field: Field, value: String) -> Result<(), DraftError> {
        match field {
            Field::Name | Field::Sets | Field::Reps | Field::Notes => {
                let exercise = self
                    .exercise_lists_mut()
                    .into_iter()
                    .flatten()
                    .find(|exercise| exercise.id == node)
                    .ok_or(DraftError::UnknownNode(node))?;
                let slot = match field {
                    Field::Name => &mut exercise.name,
                    Field::Sets => &mut exercise.sets,
                    Field::Reps => &mut exercise.reps,
                    _ => &mut exercise.notes,
                };
                *slot = value;
                Ok(())
            }
            Field::WorkoutName | Field::WorkoutType => {
                let program = self.program_mut("a day workout")?;
                let day = program
                    .weeks
                    .iter_mut()
                    .flat_map(|week| week.days.iter_mut())
                    .find(|day| day.id == node)
                    .ok_or(DraftError::UnknownNode(node))?;
                if field == Field::WorkoutName {
                    day.workout_name = value;
                } else {
                    day.workout_type = value;
                }
                Ok(())
            }
            Field::SectionType => {
                let kind = SectionType::parse(&value)
                    .ok_or_else(|| DraftError::InvalidValue { field, value: value.clone() })?;
                let workout = self.workout_mut("a section type")?;
                let section = workout
                    .sections
                    .iter_mut()
                    .find(|section| section.id == node)
                    .ok_or(DraftError::UnknownNode(node))?;
                section.kind = kind;
                Ok(())
            }
        }
    }

    fn with_body(body: DraftBody) -> Self {
        Self {
            record_id: None,
            body,
            next_id: 1,
        }
    }

    fn peek_node(&self) -> NodeId {
        NodeId(self.next_id)
    }

    fn next_node(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn day_node(&mut self, day: &Day) -> DayNode {
        let id = self.next_node();
        let exercises = day
            .exercises
            .iter()
            .map(|exercise| ExerciseNode::from_exercise(self.next_node(), exercise))
            .collect();
        DayNode {
            id,
            workout_name: day.workout.name.clone(),
            workout_type: day.workout.kind.clone(),
            exercises,
        }
    }

    fn section_node(&mut self, section: &Section) -> SectionNode {
        let id = self.next_node();
        let exercises = section
            .exercises
            .iter()
            .map(|exercise| ExerciseNode::from_exercise(self.next_node(), exercise))
            .collect();
        SectionNode {
            id,
            kind: section.kind,
            exercises,
        }
    }

    fn program_mut(&mut self, what: &'static str) -> Result<&mut ProgramDraft, DraftError> {
        match &mut self.body {
            DraftBody::Program(program) => Ok(program),
            DraftBody::Workout(_) => Err(DraftError::NotApplicable(what)),
        }
    }

    fn workout_mut(&mut self, what: &'static str) -> Result<&mut WorkoutDraft, DraftError> {
        match &mut self.body {
            DraftBody::Workout(workout) => Ok(workout),
            DraftBody::Program(_) => Err(DraftError::NotApplicable(what)),
        }
    }

    fn exercise_lists_mut(&mut self) -> Vec<&mut Vec<ExerciseNode>> {
        match &mut self.body {
            DraftBody::Program(program) => program
                .weeks
                .iter_mut()
                .flat_map(|week| week.days.iter_mut())
                .map(|day| &mut day.exercises)
                .collect(),
            DraftBody::Workout(workout) => workout
                .sections
                .iter_mut()
                .map(|section| &mut section.exercises)
                .collect(),
        }
    }

    fn exercise_list_mut(&mut self, parent: NodeId) -> Option<&mut Vec<ExerciseNode>> {
        match &mut self.body {
            DraftBody::Program(program) => program
                .weeks
                .iter_mut()
                .flat_map(|week| week.days.iter_mut())
                .find(|day| day.id == parent)
                .map(|day| &mut day.exercises),
            DraftBody::Workout(workout) => workout
                .sections
                .iter_mut()
                .find(|section| section.id == parent)
                .map(|section| &mut section.exercises),
        }
    }
}

fn check_duration(duration: u32) -> Result<(), DraftError> {
    if duration == 0 || duration > MAX_WEEKS {
        return Err(DraftError::InvalidDuration(duration));
    }
    Ok(())
}

fn amount_text(amount: Option<&Amount>) -> String {
    amount.map(Amount::to_string).unwrap_or_default()
}
