use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A set/rep count. Numeric input is stored as a count, anything else
/// (e.g. "30 sec") is kept as free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Count(u32),
    Text(String),
}

impl Amount {
    /// Coerces raw form input. Blank input yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(count) = trimmed.parse::<u32>() {
                return Some(Self::Count(count));
            }
        }
        Some(Self::Text(trimmed.to_string()))
    }

    pub fn is_duration(&self) -> bool {
        match self {
            Self::Count(_) => false,
            Self::Text(text) => {
                let lower = text.to_lowercase();
                lower.contains("sec") || lower.contains("min")
            }
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(count) => write!(f, "{count}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    #[serde(default, alias = "rounds", skip_serializing_if = "Option::is_none")]
    pub sets: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<Amount>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DayWorkout {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Day {
    pub day_number: u32,
    #[serde(default)]
    pub workout: DayWorkout,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Week {
    pub week_number: u32,
    #[serde(default)]
    pub days: Vec<Day>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProgramStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl ProgramStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }

    /// Programs only move forward: not-started, in-progress, completed.
    pub fn can_move_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::InProgress) | (Self::InProgress, Self::Completed)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: String,
    pub name: String,
    pub duration: u32,
    pub weeks: Vec<Week>,
    pub user_id: String,
    #[serde(default)]
    pub status: ProgramStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Warmup,
    Main,
    Circuit,
    Cooldown,
}

impl SectionType {
    pub const ALL: [SectionType; 4] = [Self::Warmup, Self::Main, Self::Circuit, Self::Cooldown];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warmup => "warmup",
            Self::Main => "main",
            Self::Circuit => "circuit",
            Self::Cooldown => "cooldown",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Warmup => "Warm-up",
            Self::Main => "Main",
            Self::Circuit => "Circuit",
            Self::Cooldown => "Cool-down",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw.trim())
    }

    /// What an exercise's count means in this section: circuits repeat
    /// the whole block, so their count is rounds.
    pub fn count_unit(self) -> &'static str {
        match self {
            Self::Circuit => "rounds",
            Self::Warmup | Self::Main | Self::Cooldown => "sets",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    #[serde(rename = "type")]
    pub kind: SectionType,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    pub user_id: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Collected program content, before the gateway assigns identity and
/// timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProgram {
    pub name: String,
    pub duration: u32,
    pub weeks: Vec<Week>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWorkout {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramPatch {
    pub name: Option<String>,
    pub duration: Option<u32>,
    pub weeks: Option<Vec<Week>>,
    pub status: Option<ProgramStatus>,
}

impl From<NewProgram> for ProgramPatch {
    fn from(program: NewProgram) -> Self {
        Self {
            name: Some(program.name),
            duration: Some(program.duration),
            weeks: Some(program.weeks),
            status: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutPatch {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub sections: Option<Vec<Section>>,
    pub completed: Option<bool>,
    /// `Some(None)` clears the completion time.
    pub completed_at: Option<Option<DateTime<Utc>>>,
}

impl From<NewWorkout> for WorkoutPatch {
    fn from(workout: NewWorkout) -> Self {
        Self {
            name: Some(workout.name),
            kind: Some(workout.kind),
            sections: Some(workout.sections),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: String,
}
