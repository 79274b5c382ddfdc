use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::Result;
use crate::models::Trade;
use crate::stats::CalendarMonth;

/// Which view a cached snapshot belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Trades,
    TradesForMonth(CalendarMonth),
}

type Snapshot = Arc<Vec<Trade>>;

/// Month views kept per user; older months are dropped first
const MONTHS_KEPT: usize = 12;

#[derive(Default)]
struct Entries {
    snapshots: HashMap<(String, CacheKey), Snapshot>,
    /// Bumped by every invalidation, so loads that raced a mutation are discarded
    generations: HashMap<String, u64>,
    /// Month views per user, least recently loaded first
    months: HashMap<String, Vec<CalendarMonth>>,
}

impl Entries {
    fn generation(&self, user_id: &str) -> u64 {
        self.generations.get(user_id).copied().unwrap_or(0)
    }

    fn remember_month(&mut self, user_id: &str, month: CalendarMonth) {
        let months = self.months.entry(user_id.to_string()).or_default();
        months.retain(|m| *m != month);
        months.push(month);

        while months.len() > MONTHS_KEPT {
            let evicted = months.remove(0);
            self.snapshots
                .remove(&(user_id.to_string(), CacheKey::TradesForMonth(evicted)));
        }
    }
}

/// Per-user trade snapshots. Mutations drop every snapshot of the affected
/// user instead of patching them.
#[derive(Default)]
pub struct QueryCache {
    entries: RwLock<Entries>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: &str, key: &CacheKey) -> Option<Snapshot> {
        self.entries
            .read()
            .await
            .snapshots
            .get(&(user_id.to_string(), key.clone()))
            .cloned()
    }

    /// Returns the cached snapshot or runs `load` and caches its result.
    /// Failed loads are not cached, and neither are loads that an
    /// `invalidate_user` overtook while they ran.
    pub async fn get_or_load<F, Fut>(&self, user_id: &str, key: CacheKey, load: F) -> Result<Snapshot>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Trade>>>,
    {
        let generation = {
            let entries = self.entries.read().await;
            if let Some(hit) = entries.snapshots.get(&(user_id.to_string(), key.clone())) {
                return Ok(hit.clone());
            }
            entries.generation(user_id)
        };

        let snapshot = Arc::new(load().await?);

        let mut entries = self.entries.write().await;
        if entries.generation(user_id) != generation {
            log::debug!("Discarding {:?} snapshot for {}: invalidated during load", key, user_id);
            return Ok(snapshot);
        }

        if let CacheKey::TradesForMonth(month) = key {
            entries.remember_month(user_id, month);
        }
        entries.snapshots.insert((user_id.to_string(), key), snapshot.clone());
        Ok(snapshot)
    }

    pub async fn invalidate_user(&self, user_id: &str) {
        let mut entries = self.entries.write().await;
        *entries.generations.entry(user_id.to_string()).or_insert(0) += 1;
        entries.months.remove(user_id);

        let before = entries.snapshots.len();
        entries.snapshots.retain(|(owner, _), _| owner != user_id);
        log::debug!(
            "Invalidated {} cached views for {}",
            before - entries.snapshots.len(),
            user_id
        );
    }
}
