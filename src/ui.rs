use crate::draft::{Draft, DraftBody, ExerciseNode, Field, NodeId, ProgramDraft, WorkoutDraft, MAX_WEEKS};
use crate::models::{Amount, Exercise, Program, ProgramStatus, SectionType, Workout};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Ok,
    Error,
}

/// One-line status message shown above the page body.
#[derive(Debug, Clone)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Ok,
            message: message.into(),
        }
    }
}

/// Name of the form input holding `field` of draft node `node`.
pub fn field_name(node: NodeId, field: Field) -> String {
    format!("n{node}.{}", field.as_str())
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            _ => out.push(ch),
        }
    }
    out
}

/// A count labelled with `unit` ("sets" or "rounds"); free text reads as-is.
pub fn sets_text(sets: &Amount, unit: &str) -> String {
    match sets {
        Amount::Count(count) => format!("{count} {unit}"),
        Amount::Text(text) => text.clone(),
    }
}

/// Durations ("30 sec") read as-is, bare counts get a "reps" suffix.
pub fn reps_text(reps: &Amount) -> String {
    match reps {
        Amount::Count(count) => format!("{count} reps"),
        Amount::Text(text) => text.clone(),
    }
}

pub fn render_sign_in(flash: Option<&Flash>) -> String {
    let body = r#"<form class="panel-form" method="post" action="/auth">
      <label>User name <input type="text" name="user" placeholder="you@example.com" required></label>
      <button class="btn-primary" type="submit">Sign In</button>
    </form>
    <p class="hint">Records are kept per signed-in user.</p>"#;
    page("Sign In", None, flash, body, "")
}

pub fn render_programs(user: &str, programs: &[Program], live: bool, flash: Option<&Flash>) -> String {
    let mut body = format!(
        r#"<section class="toolbar">
      <form method="get" action="/programs/new">
        <label>Weeks <input type="number" name="duration" min="1" max="{MAX_WEEKS}" value="4"></label>
        <button class="btn-primary" type="submit">Create Program</button>
      </form>
    </section>
    <section class="cards">"#
    );

    if programs.is_empty() {
        body.push_str(
            r#"<div class="empty-state">
        <p>No programs created yet.</p>
        <a href="/programs/new?duration=4" class="button btn-primary">Create Your First Program</a>
      </div>"#,
        );
    }
    for program in programs {
        let id = escape(&program.id);
        body.push_str(&format!(
            r#"<article class="card">
        <div class="card-info">
          <h2>{name}</h2>
          <p class="meta">{duration} weeks · {status}</p>
        </div>
        <div class="card-actions">
          <a class="button secondary" href="/programs/view?id={id}">View</a>
          <a class="button secondary" href="/programs/edit?id={id}">Edit</a>
          <a class="button danger" href="/programs/delete?id={id}">Delete</a>
        </div>
      </article>"#,
            name = escape(&program.name),
            duration = program.duration,
            status = program.status.label(),
        ));
    }
    body.push_str("</section>");

    let script = if live { watch_script("/api/programs/watch") } else { String::new() };
    page("Programs", Some(user), flash, &body, &script)
}

pub fn render_program_detail(user: &str, program: &Program, flash: Option<&Flash>) -> String {
    let id = escape(&program.id);
    let status_action = match program.status {
        ProgramStatus::NotStarted => format!(
            r#"<form method="post" action="/programs/start?id={id}"><button class="btn-primary" type="submit">Start Program</button></form>"#
        ),
        ProgramStatus::InProgress => format!(
            r#"<button type="button" disabled>Program In Progress</button>
        <form method="post" action="/programs/complete?id={id}"><button class="button secondary" type="submit">Mark Program Complete</button></form>"#
        ),
        ProgramStatus::Completed => r#"<button type="button" disabled>Program Completed</button>"#.to_string(),
    };

    let mut body = format!(
        r#"<section class="panel">
      <div class="stat"><span class="label">Duration</span><span class="value">{duration} weeks</span></div>
      <div class="stat"><span class="label">Status</span><span class="value">{status}</span></div>
    </section>
    <section class="card-actions">
      {status_action}
      <a class="button secondary" href="/programs/edit?id={id}">Edit</a>
    </section>"#,
        duration = program.duration,
        status = program.status.label(),
    );

    for week in &program.weeks {
        body.push_str(&format!(
            r#"<section class="week"><h2>Week {}</h2>"#,
            week.week_number
        ));
        if week.days.is_empty() {
            body.push_str(r#"<p class="hint">Rest week</p>"#);
        }
        for day in &week.days {
            let title = if day.workout.name.is_empty() {
                format!("Day {}", day.day_number)
            } else {
                format!("Day {} · {}", day.day_number, escape(&day.workout.name))
            };
            let kind = if day.workout.kind.is_empty() {
                String::new()
            } else {
                format!(r#" <span class="badge">{}</span>"#, escape(&day.workout.kind))
            };
            body.push_str(&format!(
                r#"<div class="day"><h3>{title}{kind}</h3>{}</div>"#,
                exercise_list(&day.exercises, "sets")
            ));
        }
        body.push_str("</section>");
    }

    page(&program.name, Some(user), flash, &body, "")
}

pub fn render_workouts(user: &str, workouts: &[Workout], live: bool, flash: Option<&Flash>) -> String {
    let mut body = String::from(
        r#"<section class="toolbar">
      <a class="button btn-primary" href="/workouts/new">Create Workout</a>
    </section>
    <section class="cards">"#,
    );

    if workouts.is_empty() {
        body.push_str(
            r#"<div class="empty-state">
        <p>No workouts created yet.</p>
        <a href="/workouts/new" class="button btn-primary">Create Your First Workout</a>
      </div>"#,
        );
    }
    for workout in workouts {
        body.push_str(&workout_card(workout));
    }
    body.push_str("</section>");

    let script = if live { watch_script("/api/workouts/watch") } else { String::new() };
    page("Workouts", Some(user), flash, &body, &script)
}

fn workout_card(workout: &Workout) -> String {
    let id = escape(&workout.id);
    let name = if workout.name.is_empty() {
        "Unnamed Workout".to_string()
    } else {
        escape(&workout.name)
    };
    let kind = if workout.kind.is_empty() {
        "No Type".to_string()
    } else {
        escape(&workout.kind)
    };
    let badge = if workout.completed {
        r#"<span class="completion-status">✓ Completed</span>"#
    } else {
        ""
    };
    let primary = if workout.completed {
        format!(
            r#"<form method="post" action="/workouts/incomplete?id={id}"><button class="button secondary" type="submit">Mark Incomplete</button></form>
          <a class="button secondary" href="/workouts/start?id={id}">Repeat</a>"#
        )
    } else {
        format!(r#"<a class="button btn-primary" href="/workouts/start?id={id}">Start Workout</a>"#)
    };

    format!(
        r#"<article class="card{completed}">
        <div class="card-info">
          <h2>{name}</h2>
          <p class="meta">{kind} {badge} <span class="last-updated">Updated: {updated}</span></p>
        </div>
        <div class="card-actions">
          {primary}
          <a class="button secondary" href="/workouts/edit?id={id}">Edit</a>
          <a class="button danger" href="/workouts/delete?id={id}">Delete</a>
        </div>
      </article>"#,
        completed = if workout.completed { " completed" } else { "" },
        updated = workout.updated_at.format("%Y-%m-%d"),
    )
}

pub fn render_workout_session(user: &str, workout: &Workout, flash: Option<&Flash>) -> String {
    let id = escape(&workout.id);
    let mut body = format!(
        r#"<p class="subtitle">{}</p>"#,
        escape(&workout.kind)
    );
    for section in &workout.sections {
        body.push_str(&format!(
            r#"<section class="week"><h2>{}</h2>{}</section>"#,
            section.kind.label(),
            exercise_list(&section.exercises, section.kind.count_unit())
        ));
    }
    if workout.completed {
        body.push_str(&format!(
            r#"<section class="card-actions">
      <button type="button" disabled>Completed</button>
      <form method="post" action="/workouts/incomplete?id={id}"><button class="button secondary" type="submit">Mark Incomplete</button></form>
    </section>"#
        ));
    } else {
        body.push_str(&format!(
            r#"<section class="card-actions">
      <form method="post" action="/workouts/complete?id={id}"><button class="btn-primary" type="submit">Complete Workout</button></form>
    </section>"#
        ));
    }
    page(&workout.name, Some(user), flash, &body, "")
}

pub fn render_confirm_delete(user: &str, what: &str, name: &str, action: &str, cancel: &str) -> String {
    let body = format!(
        r#"<p>Are you sure you want to delete the {what} <strong>{name}</strong>? This action cannot be undone.</p>
    <form class="card-actions" method="post" action="{action}">
      <button class="button danger" type="submit">Delete</button>
      <a class="button secondary" href="{cancel}">Cancel</a>
    </form>"#,
        name = escape(name),
        action = escape(action),
        cancel = escape(cancel),
    );
    page(&format!("Delete {what}"), Some(user), None, &body, "")
}

/// The editable form for a draft. Every button posts the whole form with
/// an `op` naming the edit to perform.
pub fn render_draft(user: &str, draft_id: Uuid, draft: &Draft, flash: Option<&Flash>) -> String {
    let editing = draft.record_id.is_some();
    let (title, fields, submit_label, cancel) = match &draft.body {
        DraftBody::Program(program) => (
            if editing { "Edit Program" } else { "Create Program" },
            program_fields(program),
            if editing { "Update Program" } else { "Create Program" },
            "/programs",
        ),
        DraftBody::Workout(workout) => (
            if editing { "Edit Workout" } else { "Create Workout" },
            workout_fields(workout),
            if editing { "Update Workout" } else { "Save Workout" },
            "/workouts",
        ),
    };

    let body = format!(
        r#"<form class="draft" method="post" action="/drafts/{draft_id}">
      <button class="sr-only" type="submit" name="op" value="save" tabindex="-1">Save</button>
      {fields}
      <div class="card-actions">
        <button class="btn-primary" type="submit" name="op" value="submit">{submit_label}</button>
        <a class="button secondary" href="{cancel}">Cancel</a>
      </div>
    </form>"#
    );
    page(title, Some(user), flash, &body, "")
}

fn program_fields(program: &ProgramDraft) -> String {
    let mut html = format!(
        r#"<div class="panel-form">
        <label>Program name <input type="text" name="name" value="{name}" placeholder="Program name" required></label>
        <label>Duration (weeks) <input type="number" name="duration" min="1" max="{MAX_WEEKS}" value="{duration}"></label>
        <button class="button secondary" type="submit" name="op" value="resize">Update Weeks</button>
      </div>"#,
        name = escape(&program.name),
        duration = program.duration,
    );

    for (week_index, week) in program.weeks.iter().enumerate() {
        html.push_str(&format!(
            r#"<section class="week">
        <div class="week-header">
          <h2>Week {number}</h2>
          <button class="button secondary" type="submit" name="op" value="add_day:{id}">Add Day</button>
        </div>"#,
            number = week_index + 1,
            id = week.id,
        ));
        for (day_index, day) in week.days.iter().enumerate() {
            html.push_str(&format!(
                r#"<div class="day">
          <div class="day-header">
            <h3>Day {number}</h3>
            <input type="text" name="{name_field}" value="{workout_name}" placeholder="Workout Name">
            <input type="text" name="{type_field}" value="{workout_type}" placeholder="Workout Type">
            <button class="remove" type="submit" name="op" value="remove_day:{id}" title="Remove day">×</button>
          </div>
          {exercises}
          <button class="button secondary" type="submit" name="op" value="add_exercise:{id}">Add Exercise</button>
        </div>"#,
                number = day_index + 1,
                id = day.id,
                name_field = field_name(day.id, Field::WorkoutName),
                type_field = field_name(day.id, Field::WorkoutType),
                workout_name = escape(&day.workout_name),
                workout_type = escape(&day.workout_type),
                exercises = exercise_rows(&day.exercises, "Sets"),
            ));
        }
        html.push_str("</section>");
    }
    html
}

fn workout_fields(workout: &WorkoutDraft) -> String {
    let mut html = format!(
        r#"<div class="panel-form">
        <label>Workout name <input type="text" name="name" value="{name}" placeholder="Workout name" required></label>
        <label>Type <input type="text" name="type" value="{kind}" placeholder="strength, cardio, ..." required></label>
      </div>"#,
        name = escape(&workout.name),
        kind = escape(&workout.kind),
    );

    for section in &workout.sections {
        let options: String = SectionType::ALL
            .into_iter()
            .map(|kind| {
                let selected = if kind == section.kind { " selected" } else { "" };
                format!(
                    r#"<option value="{}"{selected}>{}</option>"#,
                    kind.as_str(),
                    kind.label()
                )
            })
            .collect();
        html.push_str(&format!(
            r#"<section class="week">
        <div class="week-header">
          <select name="{type_field}">{options}</select>
          <button class="button secondary" type="submit" name="op" value="remove_section:{id}">Remove Section</button>
        </div>
        {exercises}
        <button class="button secondary" type="submit" name="op" value="add_exercise:{id}">Add Exercise</button>
      </section>"#,
            id = section.id,
            type_field = field_name(section.id, Field::SectionType),
            exercises = exercise_rows(
                &section.exercises,
                if section.kind == SectionType::Circuit { "Rounds" } else { "Sets" },
            ),
        ));
    }
    html.push_str(
        r#"<button class="button secondary" type="submit" name="op" value="add_section">Add Section</button>"#,
    );
    html
}

fn exercise_rows(exercises: &[ExerciseNode], sets_placeholder: &str) -> String {
    exercises
        .iter()
        .map(|exercise| {
            format!(
                r#"<div class="exercise-item">
            <input type="text" name="{name_field}" value="{name}" placeholder="Exercise name">
            <input type="text" name="{sets_field}" value="{sets}" placeholder="{sets_placeholder}">
            <input type="text" name="{reps_field}" value="{reps}" placeholder="Reps or duration">
            <input type="text" name="{notes_field}" value="{notes}" placeholder="Notes">
            <button class="remove" type="submit" name="op" value="remove_exercise:{id}" title="Remove exercise">×</button>
          </div>"#,
                id = exercise.id,
                name_field = field_name(exercise.id, Field::Name),
                sets_field = field_name(exercise.id, Field::Sets),
                reps_field = field_name(exercise.id, Field::Reps),
                notes_field = field_name(exercise.id, Field::Notes),
                name = escape(&exercise.name),
                sets = escape(&exercise.sets),
                reps = escape(&exercise.reps),
                notes = escape(&exercise.notes),
            )
        })
        .collect()
}

fn exercise_list(exercises: &[Exercise], count_unit: &str) -> String {
    let mut html = String::from(r#"<ul class="exercise-list">"#);
    for exercise in exercises {
        let notes = if exercise.notes.is_empty() {
            String::new()
        } else {
            format!(r#"<div class="exercise-notes">{}</div>"#, escape(&exercise.notes))
        };
        let mut details = String::new();
        if let Some(sets) = &exercise.sets {
            details.push_str(&format!(r#"<span>{}</span>"#, escape(&sets_text(sets, count_unit))));
        }
        if let Some(reps) = &exercise.reps {
            details.push_str(&format!(r#"<span>{}</span>"#, escape(&reps_text(reps))));
        }
        html.push_str(&format!(
            r#"<li class="exercise-item"><div class="exercise-name">{}{notes}</div><div class="exercise-details">{details}</div></li>"#,
            escape(&exercise.name)
        ));
    }
    html.push_str("</ul>");
    html
}

fn watch_script(url: &str) -> String {
    WATCH_JS.replace("{{URL}}", url)
}

fn page(title: &str, user: Option<&str>, flash: Option<&Flash>, body: &str, script: &str) -> String {
    let nav = match user {
        Some(user) => format!(
            r#"<nav>
        <a href="/programs">Programs</a>
        <a href="/workouts">Workouts</a>
        <span class="user">{}</span>
        <form method="post" action="/auth/sign-out"><button class="tab" type="submit">Sign out</button></form>
      </nav>"#,
            escape(user)
        ),
        None => String::new(),
    };
    let status = match flash {
        Some(flash) => format!(
            r#"<p class="status" data-type="{}">{}</p>"#,
            match flash.kind {
                FlashKind::Ok => "ok",
                FlashKind::Error => "error",
            },
            escape(&flash.message)
        ),
        None => String::new(),
    };

    LAYOUT_HTML
        .replace("{{SCRIPT}}", script)
        .replace("{{TITLE}}", &escape(title))
        .replace("{{NAV}}", &nav)
        .replace("{{STATUS}}", &status)
        .replace("{{BODY}}", body)
}

const WATCH_JS: &str = r#"<script>
    const watch = () => {
      fetch('{{URL}}')
        .then((res) => {
          if (res.ok) {
            window.location.reload();
          } else {
            setTimeout(watch, 5000);
          }
        })
        .catch(() => setTimeout(watch, 5000));
    };
    watch();
  </script>"#;

const LAYOUT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}} · Workout Tracker</title>
  <style>
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #f8f3e6;
      --bg-2: #f5d3a7;
      --ink: #2b2a28;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.86);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #ffe9d4 60%, #f9f2e9 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(960px, 100%);
      background: var(--card);
      backdrop-filter: blur(12px);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
      display: grid;
      gap: 24px;
    }

    header {
      display: flex;
      flex-direction: column;
      gap: 10px;
    }

    nav {
      display: flex;
      flex-wrap: wrap;
      align-items: center;
      gap: 16px;
    }

    nav a {
      color: var(--accent-2);
      font-weight: 600;
      text-decoration: none;
    }

    nav .user {
      margin-left: auto;
      color: #8b857d;
    }

    h1 {
      font-family: "Fraunces", "Georgia", serif;
      font-weight: 600;
      font-size: clamp(2rem, 4vw, 2.6rem);
      margin: 0;
    }

    .subtitle,
    .meta {
      margin: 0;
      color: #5f5c57;
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
      gap: 16px;
    }

    .stat,
    .card,
    .week {
      background: white;
      border-radius: 18px;
      padding: 18px;
      border: 1px solid rgba(47, 72, 88, 0.08);
      display: grid;
      gap: 10px;
    }

    .stat .label {
      font-size: 0.85rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: #8b857d;
    }

    .stat .value {
      font-size: 1.4rem;
      font-weight: 600;
      color: var(--accent-2);
    }

    .cards {
      display: grid;
      gap: 16px;
    }

    .card.completed {
      border-color: rgba(45, 122, 75, 0.4);
    }

    .card h2,
    .week h2,
    .day h3 {
      margin: 0;
    }

    .card-actions,
    .toolbar form,
    .panel-form,
    .week-header,
    .day-header,
    .exercise-item {
      display: flex;
      flex-wrap: wrap;
      align-items: center;
      gap: 10px;
    }

    .week-header {
      justify-content: space-between;
    }

    .day {
      border-left: 3px solid var(--bg-2);
      padding-left: 14px;
      display: grid;
      gap: 8px;
    }

    input,
    select {
      font: inherit;
      padding: 8px 12px;
      border-radius: 12px;
      border: 1px solid rgba(47, 72, 88, 0.2);
    }

    button,
    .button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 10px 18px;
      font: inherit;
      font-weight: 600;
      cursor: pointer;
      text-decoration: none;
      display: inline-flex;
      align-items: center;
      justify-content: center;
    }

    button:disabled {
      opacity: 0.6;
      cursor: default;
    }

    .btn-primary {
      background: var(--accent);
      color: white;
      box-shadow: 0 10px 24px rgba(255, 107, 74, 0.3);
    }

    .secondary {
      background: rgba(47, 72, 88, 0.08);
      color: var(--accent-2);
    }

    .danger {
      background: #c63b2b;
      color: white;
    }

    .remove {
      background: transparent;
      color: #c63b2b;
      padding: 6px 10px;
    }

    .tab {
      background: transparent;
      color: #6b645d;
      padding: 6px 12px;
    }

    .badge,
    .completion-status {
      font-size: 0.85rem;
      color: #2d7a4b;
    }

    .exercise-list {
      list-style: none;
      margin: 0;
      padding: 0;
      display: grid;
      gap: 6px;
    }

    .exercise-list .exercise-item {
      justify-content: space-between;
    }

    .exercise-details {
      display: flex;
      gap: 12px;
      color: var(--accent-2);
    }

    .exercise-notes,
    .hint,
    .empty-state {
      color: #6f6a65;
      font-size: 0.9rem;
    }

    .status {
      margin: 0;
      font-size: 0.95rem;
      color: #6b645d;
    }

    .status[data-type="error"] {
      color: #c63b2b;
    }

    .status[data-type="ok"] {
      color: #2d7a4b;
    }

    .sr-only {
      position: absolute;
      width: 1px;
      height: 1px;
      overflow: hidden;
      clip: rect(0 0 0 0);
    }

    @media (max-width: 600px) {
      .app {
        padding: 28px 22px;
      }
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      {{NAV}}
      <h1>{{TITLE}}</h1>
    </header>
    {{STATUS}}
    {{BODY}}
  </main>
  {{SCRIPT}}
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn workout(completed: bool) -> Workout {
        let at = Utc.with_ymd_and_hms(2026, 2, 3, 9, 0, 0).unwrap();
        Workout {
            id: "w-1".to_string(),
            name: "Legs <heavy>".to_string(),
            kind: "strength".to_string(),
            sections: Vec::new(),
            user_id: "ana".to_string(),
            completed,
            completed_at: completed.then_some(at),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn reps_text_formats_counts_and_durations() {
        assert_eq!(reps_text(&Amount::Count(12)), "12 reps");
        assert_eq!(reps_text(&Amount::Text("30 sec".to_string())), "30 sec");
        assert_eq!(sets_text(&Amount::Count(3), "sets"), "3 sets");
        assert_eq!(sets_text(&Amount::Text("AMRAP".to_string()), "rounds"), "AMRAP");
    }

    #[test]
    fn workout_card_actions_follow_completion() {
        let open = workout_card(&workout(false));
        assert!(open.contains("Start Workout"));
        assert!(!open.contains("Mark Incomplete"));
        assert!(open.contains("Legs &lt;heavy&gt;"));

        let done = workout_card(&workout(true));
        assert!(done.contains("Mark Incomplete"));
        assert!(done.contains("Repeat"));
        assert!(done.contains("✓ Completed"));
        assert!(done.contains("Updated: 2026-02-03"));
    }

    #[test]
    fn draft_form_names_fields_by_node() {
        let draft = Draft::workout();
        let html = render_draft("ana", Uuid::nil(), &draft, Some(&Flash::error("oops")));
        assert!(html.contains(r#"name="n1.section_type""#));
        assert!(html.contains(r#"value="remove_section:1""#));
        assert!(html.contains(r#"data-type="error">oops"#));
    }

    #[test]
    fn escape_neutralizes_template_markers() {
        assert_eq!(escape("{{BODY}}"), "&#123;&#123;BODY&#125;&#125;");
        assert_eq!(escape("a & \"b\""), "a &amp; &quot;b&quot;");
    }

    #[test]
    fn circuit_session_shows_rounds() {
        let mut circuit = workout(false);
        circuit.sections = serde_json::from_value(serde_json::json!([
            { "type": "circuit", "exercises": [{ "name": "Burpees", "rounds": 4, "reps": 10 }] },
            { "type": "main", "exercises": [{ "name": "Squat", "sets": 3, "reps": "45 sec" }] }
        ]))
        .unwrap();

        let html = render_workout_session("ana", &circuit, None);
        assert!(html.contains("<span>4 rounds</span><span>10 reps</span>"));
        assert!(html.contains("<span>3 sets</span><span>45 sec</span>"));
    }

    #[test]
    fn empty_program_list_links_to_create() {
        let html = render_programs("ana", &[], false, None);
        assert!(html.contains("Create Your First Program"));
        assert!(html.contains(r#"href="/programs/new?duration=4""#));
    }

    #[test]
    fn live_lists_embed_watch_script() {
        let html = render_workouts("ana", &[], true, None);
        assert!(html.contains("/api/workouts/watch"));
        assert!(html.contains("Create Your First Workout"));
        let html = render_workouts("ana", &[], false, None);
        assert!(!html.contains("/api/workouts/watch"));
    }
}
