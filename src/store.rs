use crate::types::{RepositoryId, RepositoryRecord};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Immutable view of the repository list at one point in time
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub version: u64,
    pub records: Arc<[RepositoryRecord]>,
    pub taken_at: DateTime<Utc>,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            version: 0,
            records: Arc::from(Vec::new()),
            taken_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &RepositoryId) -> Option<&RepositoryRecord> {
        self.records.iter().find(|record| &record.id == id)
    }
}

/// Build a new sequence where the first record with `id` is swapped for `updated`.
///
/// Every other record keeps its position. A missing id yields an unchanged copy.
pub fn replaced(
    records: &[RepositoryRecord],
    id: &RepositoryId,
    updated: RepositoryRecord,
) -> Vec<RepositoryRecord> {
    let mut updated = Some(updated);
    records
        .iter()
        .map(|record| {
            if &record.id == id {
                if let Some(next) = updated.take() {
                    return next;
                }
            }
            record.clone()
        })
        .collect()
}

/// Holds the ordered repository list and publishes a snapshot on every change.
///
/// `load_all` and `replace_by_id` are the only mutators. Writers are expected to be
/// serialised by the owner (see `RepositoryListActor`).
pub struct RepositoryListStore {
    current: Snapshot,
    publisher: watch::Sender<Snapshot>,
}

impl Default for RepositoryListStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryListStore {
    pub fn new() -> Self {
        let current = Snapshot::empty();
        let (publisher, _) = watch::channel(current.clone());
        Self { current, publisher }
    }

    /// Replace the whole list, keeping the caller's order.
    pub fn load_all(&mut self, records: Vec<RepositoryRecord>) {
        debug!(count = records.len(), "Loading repository list");
        self.publish(records);
    }

    /// Replace the record whose id matches. Returns whether a record matched.
    pub fn replace_by_id(&mut self, id: &RepositoryId, updated: RepositoryRecord) -> bool {
        let matched = self.current.get(id).is_some();
        if !matched {
            debug!(%id, "No repository matched, list left unchanged");
        }
        let next = replaced(&self.current.records, id, updated);
        self.publish(next);
        matched
    }

    pub fn snapshot(&self) -> Snapshot {
        self.current.clone()
    }

    pub fn records(&self) -> &[RepositoryRecord] {
        &self.current.records
    }

    pub fn version(&self) -> u64 {
        self.current.version
    }

    /// Receiver that observes every published snapshot, starting with the current one.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.publisher.subscribe()
    }

    fn publish(&mut self, records: Vec<RepositoryRecord>) {
        self.current = Snapshot {
            version: self.current.version + 1,
            records: Arc::from(records),
            taken_at: Utc::now(),
        };
        // send_replace keeps the value even when nobody is subscribed yet
        self.publisher.send_replace(self.current.clone());
    }
}
