use crate::config::ListMode;
use crate::draft::Draft;
use crate::store::Gateway;
use chrono::{DateTime, Duration, Utc};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Drafts untouched for this long are discarded when another one opens.
const DRAFT_TTL_HOURS: i64 = 12;
/// Open drafts kept per user; opening one more evicts the least recently
/// touched.
const MAX_DRAFTS_PER_USER: usize = 32;

/// A draft being edited, owned by the user who opened it.
#[derive(Debug, Clone)]
pub struct DraftEntry {
    pub user_id: String,
    pub draft: Draft,
    pub touched_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
    pub list_mode: ListMode,
    drafts: Arc<Mutex<HashMap<Uuid, DraftEntry>>>,
}

impl AppState {
    pub fn new(gateway: Gateway, list_mode: ListMode) -> Self {
        Self {
            gateway,
            list_mode,
            drafts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn open_draft(&self, user_id: &str, draft: Draft) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let mut drafts = self.drafts.lock().await;
        evict_stale(&mut drafts, user_id, now);
        drafts.insert(
            id,
            DraftEntry {
                user_id: user_id.to_string(),
                draft,
                touched_at: now,
            },
        );
        id
    }

    /// A copy of the user's draft, or `None` if it is missing or belongs to
    /// someone else.
    pub async fn draft(&self, user_id: &str, id: Uuid) -> Option<Draft> {
        let drafts = self.drafts.lock().await;
        drafts
            .get(&id)
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.draft.clone())
    }

    /// Replaces the stored draft. Only the owner can do so.
    pub async fn store_draft(&self, user_id: &str, id: Uuid, draft: Draft) -> bool {
        let mut drafts = self.drafts.lock().await;
        match drafts.get_mut(&id) {
            Some(entry) if entry.user_id == user_id => {
                entry.draft = draft;
                entry.touched_at = Utc::now();
                true
            }
            _ => false,
        }
    }

    pub async fn close_draft(&self, user_id: &str, id: Uuid) {
        let mut drafts = self.drafts.lock().await;
        if drafts.get(&id).is_some_and(|entry| entry.user_id == user_id) {
            drafts.remove(&id);
        }
    }
}

/// Drops expired drafts of every user and makes room for one more draft
/// of `user_id`.
fn evict_stale(drafts: &mut HashMap<Uuid, DraftEntry>, user_id: &str, now: DateTime<Utc>) {
    let before = drafts.len();
    let cutoff = now - Duration::hours(DRAFT_TTL_HOURS);
    drafts.retain(|_, entry| entry.touched_at > cutoff);

    let mut owned: Vec<(Uuid, DateTime<Utc>)> = drafts
        .iter()
        .filter(|(_, entry)| entry.user_id == user_id)
        .map(|(id, entry)| (*id, entry.touched_at))
        .collect();
    if owned.len() >= MAX_DRAFTS_PER_USER {
        owned.sort_by_key(|(_, touched_at)| *touched_at);
        let excess = owned.len() + 1 - MAX_DRAFTS_PER_USER;
        for (id, _) in owned.into_iter().take(excess) {
            drafts.remove(&id);
        }
    }

    let evicted = before - drafts.len();
    if evicted > 0 {
        debug!(evicted, "discarded abandoned drafts");
    }
}
