//! Ordered, observable record collections keyed by identity.
//!
//! A store holds at most one record per identity. Records keep the position
//! they were first inserted at; a later report for the same identity replaces
//! the record in place.

use dragonlink_cot::{StatusRecord, TelemetryRecord};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::trace;

/// A record that is merged under a stable identity.
pub trait Identified: Clone + Send + Sync + 'static {
    fn identity(&self) -> &str;
}

impl Identified for TelemetryRecord {
    fn identity(&self) -> &str {
        &self.uid
    }
}

impl Identified for StatusRecord {
    fn identity(&self) -> &str {
        &self.serial_number
    }
}

/// Result of an upsert, carrying the record's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Upserted {
    Inserted(usize),
    Updated(usize),
}

impl Upserted {
    pub fn index(&self) -> usize {
        match self {
            Upserted::Inserted(index) | Upserted::Updated(index) => *index,
        }
    }
}

/// Change notification sent to store observers
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent<R> {
    /// A new identity was appended at `index`
    Inserted { index: usize, record: R },
    /// The record at `index` was replaced
    Updated { index: usize, record: R },
    /// Every record was removed
    Cleared { removed: usize },
}

struct Entries<R> {
    records: Vec<R>,
    index: HashMap<String, usize>,
}

/// Keyed collection with upsert-by-identity
///
/// Reads may happen from any task. Mutations are crate-private and go
/// through the [`StoreCoordinator`](crate::StoreCoordinator).
pub struct Store<R> {
    name: &'static str,
    entries: RwLock<Entries<R>>,
    events: broadcast::Sender<StoreEvent<R>>,
}

/// Store of drone telemetry, keyed by `uid`
pub type TelemetryStore = Store<TelemetryRecord>;

/// Store of sensor kit status, keyed by serial number
pub type StatusStore = Store<StatusRecord>;

impl<R: Identified> Store<R> {
    pub fn new(name: &'static str, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            name,
            entries: RwLock::new(Entries {
                records: Vec::new(),
                index: HashMap::new(),
            }),
            events,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Replace the record with the same identity, or append it.
    ///
    /// The change event is sent while the write lock is held so observers see
    /// events in mutation order.
    pub(crate) fn upsert(&self, record: R) -> Upserted {
        let mut entries = self.entries.write();

        let outcome = match entries.index.get(record.identity()).copied() {
            Some(index) => {
                entries.records[index] = record.clone();
                let _ = self.events.send(StoreEvent::Updated { index, record });
                Upserted::Updated(index)
            }
            None => {
                let index = entries.records.len();
                entries.index.insert(record.identity().to_string(), index);
                entries.records.push(record.clone());
                let _ = self.events.send(StoreEvent::Inserted { index, record });
                Upserted::Inserted(index)
            }
        };

        trace!(store = self.name, ?outcome, "Record upserted");
        outcome
    }

    /// Remove every record, returning how many were removed.
    pub(crate) fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        let removed = entries.records.len();
        entries.records.clear();
        entries.index.clear();
        let _ = self.events.send(StoreEvent::Cleared { removed });
        removed
    }

    /// Ordered snapshot of every record.
    pub fn all(&self) -> Vec<R> {
        self.entries.read().records.clone()
    }

    pub fn get(&self, identity: &str) -> Option<R> {
        let entries = self.entries.read();
        entries
            .index
            .get(identity)
            .map(|&index| entries.records[index].clone())
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.entries.read().index.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.entries.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receive every change made after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent<R>> {
        self.events.subscribe()
    }
}

impl<R> std::fmt::Debug for Store<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.name)
            .field("len", &self.entries.read().records.len())
            .finish()
    }
}
