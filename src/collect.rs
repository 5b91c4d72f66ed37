//! Reads a draft tree back into a persistable record.
//!
//! Traversal follows insertion order. Week and day numbers come from
//! position, never from node ids. Exercises with every field blank are
//! dropped; for workouts, sections left without exercises are dropped as
//! well. Program days are kept even when empty so validation can report
//! them.

use crate::draft::{Draft, DraftBody, ExerciseNode, ProgramDraft, WorkoutDraft};
use crate::models::{Amount, Day, DayWorkout, Exercise, NewProgram, NewWorkout, Section, Week};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq)]
pub enum Collected {
    Program(NewProgram),
    Workout(NewWorkout),
}

/// Collects and validates a draft. Nothing here touches storage.
pub fn submit(draft: &Draft) -> Result<Collected, ValidationError> {
    match &draft.body {
        DraftBody::Program(program) => {
            let collected = collect_program(program);
            validate_program(&collected)?;
            Ok(Collected::Program(collected))
        }
        DraftBody::Workout(workout) => {
            let collected = collect_workout(workout);
            validate_workout(&collected)?;
            Ok(Collected::Workout(collected))
        }
    }
}

pub fn collect_program(draft: &ProgramDraft) -> NewProgram {
    let weeks = draft
        .weeks
        .iter()
        .enumerate()
        .map(|(week_index, week)| Week {
            week_number: week_index as u32 + 1,
            days: week
                .days
                .iter()
                .enumerate()
                .map(|(day_index, day)| Day {
                    day_number: day_index as u32 + 1,
                    workout: DayWorkout {
                        name: day.workout_name.trim().to_string(),
                        kind: day.workout_type.trim().to_string(),
                    },
                    exercises: collect_exercises(&day.exercises),
                })
                .collect(),
        })
        .collect();

    NewProgram {
        name: draft.name.trim().to_string(),
        duration: draft.duration,
        weeks,
    }
}

pub fn collect_workout(draft: &WorkoutDraft) -> NewWorkout {
    let sections = draft
        .sections
        .iter()
        .map(|section| Section {
            kind: section.kind,
            exercises: collect_exercises(&section.exercises),
        })
        .filter(|section| !section.exercises.is_empty())
        .collect();

    NewWorkout {
        name: draft.name.trim().to_string(),
        kind: draft.kind.trim().to_string(),
        sections,
    }
}

pub fn validate_program(program: &NewProgram) -> Result<(), ValidationError> {
    if program.name.is_empty() || program.duration == 0 {
        return Err(ValidationError::new("Please fill in all required fields"));
    }
    if program.weeks.len() != program.duration as usize {
        return Err(ValidationError::new(format!(
            "Program must have exactly {} weeks",
            program.duration
        )));
    }
    if let Some(week) = program.weeks.iter().find(|week| week.days.is_empty()) {
        return Err(ValidationError::new(format!(
            "Each week must have at least one day (week {} has none)",
            week.week_number
        )));
    }
    for week in &program.weeks {
        for day in &week.days {
            if day.exercises.is_empty() {
                return Err(ValidationError::new(format!(
                    "Each day must have at least one exercise (week {}, day {})",
                    week.week_number, day.day_number
                )));
            }
            check_exercises(&day.exercises)?;
        }
    }
    Ok(())
}

pub fn validate_workout(workout: &NewWorkout) -> Result<(), ValidationError> {
    if workout.name.is_empty() || workout.kind.is_empty() {
        return Err(ValidationError::new("Please fill in workout name and type"));
    }
    if workout.sections.is_empty() {
        return Err(ValidationError::new(
            "A workout must have at least one section with an exercise",
        ));
    }
    for section in &workout.sections {
        check_exercises(&section.exercises)?;
    }
    Ok(())
}

fn check_exercises(exercises: &[Exercise]) -> Result<(), ValidationError> {
    if exercises.iter().any(|exercise| exercise.name.is_empty()) {
        return Err(ValidationError::new("Every exercise needs a name"));
    }
    if let Some(exercise) = exercises
        .iter()
        .find(|exercise| exercise.sets == Some(Amount::Count(0)))
    {
        return Err(ValidationError::new(format!(
            "Sets for {} must be at least 1",
            exercise.name
        )));
    }
    Ok(())
}

fn collect_exercises(nodes: &[ExerciseNode]) -> Vec<Exercise> {
    nodes.iter().filter_map(collect_exercise).collect()
}

fn collect_exercise(node: &ExerciseNode) -> Option<Exercise> {
    let blank = [&node.name, &node.sets, &node.reps, &node.notes]
        .iter()
        .all(|value| value.trim().is_empty());
    if blank {
        return None;
    }
    Some(Exercise {
        name: node.name.trim().to_string(),
        sets: Amount::parse(&node.sets),
        reps: Amount::parse(&node.reps),
        notes: node.notes.trim().to_string(),
    })
}
