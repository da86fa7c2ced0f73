use std::collections::HashMap;

use super::{IdAllocator, Record};
use crate::error::{NamespaceError, Result};
use crate::events::Event;
use crate::model::{LedgerObject, Object, ObjectId, ObjectKind, Root};

pub(crate) struct Staged {
    pub(crate) owner: String,
    pub(crate) object: Object,
}

/// Everything a transaction asked for, in the order it first touched each
/// object.
pub(crate) struct Changes {
    pub(crate) writes: Vec<(ObjectId, Option<Staged>)>,
    pub(crate) events: Vec<Event>,
}

/// Result of a committed transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxEffects {
    pub sequence: u64,
    pub created: Vec<ObjectId>,
    pub mutated: Vec<ObjectId>,
    pub deleted: Vec<ObjectId>,
    pub events: Vec<Event>,
}

/// A pending set of ledger changes made on behalf of one sender.
///
/// Reads see committed state overlaid with this transaction's own writes.
/// Nothing becomes visible to the ledger until the closure passed to
/// [`Ledger::execute`](super::Ledger::execute) returns `Ok`.
pub struct Transaction<'a> {
    base: &'a HashMap<ObjectId, Record>,
    sender: &'a str,
    ids: &'a dyn IdAllocator,
    timestamp: u64,
    unique_roots: bool,
    writes: HashMap<ObjectId, Option<Staged>>,
    order: Vec<ObjectId>,
    events: Vec<Event>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(
        base: &'a HashMap<ObjectId, Record>,
        sender: &'a str,
        ids: &'a dyn IdAllocator,
        timestamp: u64,
        unique_roots: bool,
    ) -> Self {
        Self {
            base,
            sender,
            ids,
            timestamp,
            unique_roots,
            writes: HashMap::new(),
            order: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn sender(&self) -> &str {
        self.sender
    }

    /// One timestamp per transaction.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn unique_roots(&self) -> bool {
        self.unique_roots
    }

    pub fn fresh_id(&self) -> ObjectId {
        self.ids.allocate()
    }

    fn current(&self, id: ObjectId) -> Option<(&str, &Object)> {
        match self.writes.get(&id) {
            Some(Some(staged)) => Some((staged.owner.as_str(), &staged.object)),
            Some(None) => None,
            None => self
                .base
                .get(&id)
                .map(|r| (r.owner.as_str(), &r.object)),
        }
    }

    fn typed<T: LedgerObject>(id: ObjectId, object: &Object) -> Result<&T> {
        T::from_ref(object).ok_or(NamespaceError::WrongObjectKind {
            id,
            expected: T::KIND,
            actual: object.kind(),
        })
    }

    /// Read any live object regardless of who owns it.
    pub fn read<T: LedgerObject>(&self, id: ObjectId) -> Result<&T> {
        let (_, object) = self
            .current(id)
            .ok_or(NamespaceError::ObjectNotFound(id))?;
        Self::typed(id, object)
    }

    /// Take a working copy of an object the sender owns. Changes to it only
    /// count once handed back through [`update`](Self::update),
    /// [`transfer`](Self::transfer) or [`destroy`](Self::destroy).
    pub fn take<T: LedgerObject>(&self, id: ObjectId) -> Result<T> {
        let (owner, object) = self
            .current(id)
            .ok_or(NamespaceError::ObjectNotFound(id))?;
        let typed = Self::typed::<T>(id, object)?;
        if owner != self.sender {
            return Err(NamespaceError::NotOwner {
                id,
                caller: self.sender.to_string(),
            });
        }
        Ok(typed.clone())
    }

    fn stage(&mut self, id: ObjectId, write: Option<Staged>) {
        if !self.writes.contains_key(&id) {
            self.order.push(id);
        }
        self.writes.insert(id, write);
    }

    /// Write back a modified object, keeping its current owner.
    pub fn update<T: LedgerObject>(&mut self, object: T) -> Result<()> {
        let id = object.object_id();
        let owner = self
            .current(id)
            .map(|(owner, _)| owner.to_string())
            .ok_or(NamespaceError::ObjectNotFound(id))?;
        self.stage(
            id,
            Some(Staged {
                owner,
                object: object.into(),
            }),
        );
        Ok(())
    }

    /// Hand an object to `recipient`. New objects enter the ledger this way.
    pub fn transfer<T: LedgerObject>(&mut self, object: T, recipient: &str) {
        let id = object.object_id();
        self.stage(
            id,
            Some(Staged {
                owner: recipient.to_string(),
                object: object.into(),
            }),
        );
    }

    /// Consume an object; its id stops resolving once the transaction commits.
    pub fn destroy<T: LedgerObject>(&mut self, object: T) -> Result<()> {
        let id = object.object_id();
        if self.current(id).is_none() {
            return Err(NamespaceError::ObjectNotFound(id));
        }
        self.stage(id, None);
        Ok(())
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Whether the sender already holds a live root, counting staged writes.
    pub fn sender_owns_root(&self) -> bool {
        let staged = self.writes.values().flatten().any(|s| {
            s.owner == self.sender && s.object.kind() == ObjectKind::Root
        });
        staged
            || self.base.values().any(|r| {
                r.owner == self.sender
                    && Root::from_ref(&r.object).is_some()
                    && !self.writes.contains_key(&r.id)
            })
    }

    pub(crate) fn into_changes(mut self) -> Changes {
        let writes = self
            .order
            .iter()
            .filter_map(|id| self.writes.remove(id).map(|w| (*id, w)))
            .collect();
        Changes {
            writes,
            events: self.events,
        }
    }
}
