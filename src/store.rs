use crate::models::{
    NewProgram, NewWorkout, Program, ProgramPatch, ProgramStatus, Workout, WorkoutPatch,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, path::PathBuf, sync::Arc};
use tokio::{
    fs,
    sync::{Mutex, broadcast, broadcast::error::RecvError},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// The whole document store. Each collection is a flat list that is
/// rewritten on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreData {
    #[serde(default)]
    pub programs: Vec<Program>,
    #[serde(default)]
    pub workouts: Vec<Workout>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Programs,
    Workouts,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Programs => "programs",
            Self::Workouts => "workouts",
        }
    }
}

#[derive(Debug)]
pub enum StoreError {
    NotFound { collection: Collection, id: String },
    /// The record's current state does not allow the requested change.
    Conflict { collection: Collection, id: String, reason: String },
    Io(std::io::Error),
    Serialize(serde_json::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { collection, id } => {
                write!(f, "{} record {id} not found", collection.as_str())
            }
            Self::Conflict { reason, .. } => f.write_str(reason),
            Self::Io(err) => write!(f, "storage write failed: {err}"),
            Self::Serialize(err) => write!(f, "storage encoding failed: {err}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialize(err)
    }
}

/// A document kind the gateway can store.
pub trait Record: Clone + Send + Sync + 'static {
    type New: Send;
    type Patch: Send;

    const COLLECTION: Collection;

    fn table(data: &StoreData) -> &Vec<Self>;
    fn table_mut(data: &mut StoreData) -> &mut Vec<Self>;
    fn id(&self) -> &str;
    fn user_id(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
    fn create(id: String, user_id: &str, new: Self::New, now: DateTime<Utc>) -> Self;
    fn apply(&mut self, patch: Self::Patch, now: DateTime<Utc>);
}

impl Record for Program {
    type New = NewProgram;
    type Patch = ProgramPatch;

    const COLLECTION: Collection = Collection::Programs;

    fn table(data: &StoreData) -> &Vec<Self> {
        &data.programs
    }

    fn table_mut(data: &mut StoreData) -> &mut Vec<Self> {
        &mut data.programs
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn create(id: String, user_id: &str, new: NewProgram, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            duration: new.duration,
            weeks: new.weeks,
            user_id: user_id.to_string(),
            status: ProgramStatus::NotStarted,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, patch: ProgramPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(duration) = patch.duration {
            self.duration = duration;
        }
        if let Some(weeks) = patch.weeks {
            self.weeks = weeks;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = now;
    }
}

impl Record for Workout {
    type New = NewWorkout;
    type Patch = WorkoutPatch;

    const COLLECTION: Collection = Collection::Workouts;

    fn table(data: &StoreData) -> &Vec<Self> {
        &data.workouts
    }

    fn table_mut(data: &mut StoreData) -> &mut Vec<Self> {
        &mut data.workouts
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn create(id: String, user_id: &str, new: NewWorkout, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            kind: new.kind,
            sections: new.sections,
            user_id: user_id.to_string(),
            completed: false,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, patch: WorkoutPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(sections) = patch.sections {
            self.sections = sections;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(completed_at) = patch.completed_at {
            self.completed_at = completed_at;
        }
        self.updated_at = now;
    }
}

#[derive(Debug, Clone)]
struct Change {
    collection: Collection,
    user_id: String,
}

/// Sole access point to stored programs and workouts. Every operation is
/// scoped to one user; records of other users behave as absent.
#[derive(Clone)]
pub struct Gateway {
    path: Option<PathBuf>,
    data: Arc<Mutex<StoreData>>,
    changes: broadcast::Sender<Change>,
}

impl Gateway {
    pub async fn open(path: PathBuf) -> Self {
        let data = load_data(&path).await;
        info!(
            programs = data.programs.len(),
            workouts = data.workouts.len(),
            "loaded store from {}",
            path.display()
        );
        Self::with_data(Some(path), data)
    }

    /// Store without a backing file, used by tests.
    pub fn in_memory() -> Self {
        Self::with_data(None, StoreData::default())
    }

    fn with_data(path: Option<PathBuf>, data: StoreData) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            path,
            data: Arc::new(Mutex::new(data)),
            changes,
        }
    }

    pub async fn create<R: Record>(&self, user_id: &str, new: R::New) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let record = R::create(id.clone(), user_id, new, Utc::now());
        self.write(user_id, R::COLLECTION, |data| {
            R::table_mut(data).push(record);
            Ok(())
        })
        .await?;
        info!(collection = R::COLLECTION.as_str(), %id, "record created");
        Ok(id)
    }

    pub async fn get<R: Record>(&self, user_id: &str, id: &str) -> Result<R, StoreError> {
        let data = self.data.lock().await;
        R::table(&data)
            .iter()
            .find(|record| record.id() == id && record.user_id() == user_id)
            .cloned()
            .ok_or_else(|| not_found::<R>(id))
    }

    pub async fn update<R: Record>(
        &self,
        user_id: &str,
        id: &str,
        patch: R::Patch,
    ) -> Result<(), StoreError> {
        self.modify::<R, _>(user_id, id, |_| Ok(patch)).await
    }

    /// Builds the patch from the record's current value while the store is
    /// locked. An `Err(reason)` from `decide` aborts the write with
    /// [`StoreError::Conflict`].
    pub async fn modify<R, F>(&self, user_id: &str, id: &str, decide: F) -> Result<(), StoreError>
    where
        R: Record,
        F: FnOnce(&R) -> Result<R::Patch, String>,
    {
        let now = Utc::now();
        self.write(user_id, R::COLLECTION, |data| {
            let record = R::table_mut(data)
                .iter_mut()
                .find(|record| record.id() == id && record.user_id() == user_id)
                .ok_or_else(|| not_found::<R>(id))?;
            let patch = decide(record).map_err(|reason| StoreError::Conflict {
                collection: R::COLLECTION,
                id: id.to_string(),
                reason,
            })?;
            record.apply(patch, now);
            Ok(())
        })
        .await?;
        info!(collection = R::COLLECTION.as_str(), %id, "record updated");
        Ok(())
    }

    pub async fn delete<R: Record>(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        self.write(user_id, R::COLLECTION, |data| {
            let table = R::table_mut(data);
            let index = table
                .iter()
                .position(|record| record.id() == id && record.user_id() == user_id)
                .ok_or_else(|| not_found::<R>(id))?;
            table.remove(index);
            Ok(())
        })
        .await?;
        info!(collection = R::COLLECTION.as_str(), %id, "record deleted");
        Ok(())
    }

    /// The user's records, newest `createdAt` first.
    pub async fn list<R: Record>(&self, user_id: &str) -> Vec<R> {
        let data = self.data.lock().await;
        // Reverse insertion order first so equal timestamps stay newest first.
        let mut records: Vec<R> = R::table(&data)
            .iter()
            .rev()
            .filter(|record| record.user_id() == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        records
    }

    /// Calls `on_change` with the current list now and again after every
    /// change to the user's collection, until the subscription is dropped.
    pub fn subscribe<R, F>(&self, user_id: &str, on_change: F) -> Subscription
    where
        R: Record,
        F: Fn(Vec<R>) + Send + 'static,
    {
        let mut receiver = self.changes.subscribe();
        let gateway = self.clone();
        let user_id = user_id.to_string();
        let handle = tokio::spawn(async move {
            let records = gateway.list::<R>(&user_id).await;
            on_change(records);
            loop {
                match receiver.recv().await {
                    Ok(change) if change.collection == R::COLLECTION && change.user_id == user_id => {}
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "subscriber lagged, re-reading list");
                    }
                    Err(RecvError::Closed) => break,
                }
                let records = gateway.list::<R>(&user_id).await;
                on_change(records);
            }
        });
        debug!(collection = R::COLLECTION.as_str(), "subscription opened");
        Subscription { handle }
    }

    /// Applies `mutate` to a copy of the store and commits it only once the
    /// copy is persisted, so a failed write leaves the store unchanged.
    async fn write<F>(&self, user_id: &str, collection: Collection, mutate: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut StoreData) -> Result<(), StoreError>,
    {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        mutate(&mut next)?;
        if let Some(path) = &self.path {
            persist_data(path, &next).await?;
        }
        *data = next;
        drop(data);

        let _ = self.changes.send(Change {
            collection,
            user_id: user_id.to_string(),
        });
        Ok(())
    }
}

/// Handle returned by [`Gateway::subscribe`]. Dropping it unsubscribes.
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn not_found<R: Record>(id: &str) -> StoreError {
    StoreError::NotFound {
        collection: R::COLLECTION,
        id: id.to_string(),
    }
}

pub async fn load_data(path: &Path) -> StoreData {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                error!("failed to parse data file: {err}");
                StoreData::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreData::default(),
        Err(err) => {
            error!("failed to read data file: {err}");
            StoreData::default()
        }
    }
}

pub async fn persist_data(path: &Path, data: &StoreData) -> Result<(), StoreError> {
    let payload = serde_json::to_vec_pretty(data)?;
    fs::write(path, payload).await?;
    Ok(())
}
