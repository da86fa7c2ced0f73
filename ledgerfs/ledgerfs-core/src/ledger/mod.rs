//! The object ledger the namespace runs on.
//!
//! Holds every live object keyed by id together with its single owner, hands
//! out identifiers and timestamps, and applies each [`Transaction`] all at
//! once or not at all. When a data directory is configured each record is
//! also written to disk as `<id>.json` and loaded back on open.

mod disk;
mod ids;
mod transaction;

pub use ids::{Clock, FixedClock, IdAllocator, RandomIds, SequentialIds, SystemClock};
pub use transaction::{Transaction, TxEffects};

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{NamespaceError, Result};
use crate::events::{Event, EventBus, DEFAULT_EVENT_CAPACITY};
use crate::model::{LedgerObject, Object, ObjectId, Root};
use disk::RecordDir;
use transaction::Changes;

#[derive(Clone, Debug)]
pub struct LedgerConfig {
    /// Where records are persisted. `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    /// Reject a second root for the same owner.
    pub unique_roots: bool,
    /// Buffered events per subscriber, and how many recent events the
    /// ledger keeps in its log.
    pub event_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            unique_roots: false,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// A live object with its owner. `version` is the sequence number of the
/// transaction that last wrote it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    pub id: ObjectId,
    pub owner: String,
    pub version: u64,
    pub object: Object,
}

pub struct Ledger {
    records: HashMap<ObjectId, Record>,
    disk: Option<RecordDir>,
    ids: Arc<dyn IdAllocator>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    log: VecDeque<Event>,
    log_capacity: usize,
    sequence: u64,
    unique_roots: bool,
}

impl Ledger {
    pub fn in_memory() -> Self {
        Self {
            records: HashMap::new(),
            disk: None,
            ids: Arc::new(RandomIds),
            clock: Arc::new(SystemClock),
            events: EventBus::default(),
            log: VecDeque::new(),
            log_capacity: DEFAULT_EVENT_CAPACITY,
            sequence: 0,
            unique_roots: false,
        }
    }

    pub fn open(config: LedgerConfig) -> Result<Self> {
        let mut ledger = Self::in_memory();
        ledger.events = EventBus::new(config.event_capacity);
        ledger.log_capacity = config.event_capacity.max(1);
        ledger.unique_roots = config.unique_roots;
        if let Some(dir) = config.data_dir {
            let disk = RecordDir::open(dir)?;
            ledger.records = disk.load_all()?;
            ledger.sequence = ledger.records.values().map(|r| r.version).max().unwrap_or(0);
            debug!(
                dir = %disk.dir().display(),
                objects = ledger.records.len(),
                sequence = ledger.sequence,
                "ledger loaded"
            );
            ledger.disk = Some(disk);
        }
        Ok(ledger)
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdAllocator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.disk.as_ref().map(|d| d.dir())
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// The most recent committed events, oldest first, bounded by
    /// `event_capacity`.
    pub fn event_log(&self) -> &VecDeque<Event> {
        &self.log
    }

    /// Sequence number of the last committed transaction.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: ObjectId) -> Option<&Record> {
        self.records.get(&id)
    }

    /// All live records in no particular order.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn owner_of(&self, id: ObjectId) -> Option<&str> {
        self.records.get(&id).map(|r| r.owner.as_str())
    }

    pub fn object<T: LedgerObject>(&self, id: ObjectId) -> Result<&T> {
        let record = self
            .records
            .get(&id)
            .ok_or(NamespaceError::ObjectNotFound(id))?;
        T::from_ref(&record.object).ok_or(NamespaceError::WrongObjectKind {
            id,
            expected: T::KIND,
            actual: record.object.kind(),
        })
    }

    /// Live roots held by `owner`, ordered by id.
    pub fn roots_of(&self, owner: &str) -> Vec<&Root> {
        let mut roots: Vec<&Root> = self
            .records
            .values()
            .filter(|r| r.owner == owner)
            .filter_map(|r| Root::from_ref(&r.object))
            .collect();
        roots.sort_by_key(|r| r.id());
        roots
    }

    /// Run `f` as one atomic transaction on behalf of `sender`.
    ///
    /// If `f` fails, nothing it staged is applied: no object changes, no
    /// events, no sequence bump.
    pub fn execute<T, F>(&mut self, sender: &str, f: F) -> Result<(T, TxEffects)>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T>,
    {
        let staged = {
            let mut tx = Transaction::new(
                &self.records,
                sender,
                self.ids.as_ref(),
                self.clock.now_ms(),
                self.unique_roots,
            );
            f(&mut tx).map(|value| (value, tx.into_changes()))
        };
        let (value, changes) = match staged {
            Ok(staged) => staged,
            Err(err) => {
                warn!(sender, code = err.code(), "transaction aborted: {}", err);
                return Err(err);
            }
        };
        let effects = self.commit(changes)?;
        Ok((value, effects))
    }

    fn commit(&mut self, changes: Changes) -> Result<TxEffects> {
        let sequence = self.sequence + 1;
        let mut effects = TxEffects {
            sequence,
            ..TxEffects::default()
        };
        let journaled = self.disk.is_some();
        let mut prior = Vec::new();
        let mut upserts = Vec::new();
        let mut removals = Vec::new();
        for (id, write) in changes.writes {
            if journaled && (write.is_some() || self.records.contains_key(&id)) {
                prior.push((id, self.records.get(&id).cloned()));
            }
            match write {
                Some(staged) => {
                    if self.records.contains_key(&id) {
                        effects.mutated.push(id);
                    } else {
                        effects.created.push(id);
                    }
                    upserts.push(Record {
                        id,
                        owner: staged.owner,
                        version: sequence,
                        object: staged.object,
                    });
                }
                None if self.records.contains_key(&id) => {
                    effects.deleted.push(id);
                    removals.push(id);
                }
                None => {}
            }
        }

        if let Some(disk) = &self.disk {
            if let Err(err) = disk.persist(sequence, prior, &upserts, &removals) {
                warn!(sequence, "failed to persist transaction: {}", err);
                return Err(err);
            }
        }
        for id in &removals {
            self.records.remove(id);
        }
        for record in upserts {
            self.records.insert(record.id, record);
        }
        self.sequence = sequence;

        debug!(
            sequence,
            created = effects.created.len(),
            mutated = effects.mutated.len(),
            deleted = effects.deleted.len(),
            "transaction committed"
        );
        for event in &changes.events {
            self.events.send(event.clone());
        }
        for event in &changes.events {
            if self.log.len() == self.log_capacity {
                self.log.pop_front();
            }
            self.log.push_back(event.clone());
        }
        effects.events = changes.events;
        Ok(effects)
    }
}
