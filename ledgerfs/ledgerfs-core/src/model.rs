//! Entities stored on the ledger: files, folders, links and the per-owner
//! roots that anchor each tree.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::table::EntryTable;

pub type ObjectId = Uuid;

/// Creation and modification times in milliseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Meta {
    pub created_at: u64,
    pub updated_at: u64,
}

impl Meta {
    pub fn new(now: u64) -> Self {
        Self {
            created_at: now,
            updated_at: now,
        }
    }
}

/// Kind tag of a directory entry.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntryType {
    File,
    Folder,
    Link,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::File => "File",
            EntryType::Folder => "Folder",
            EntryType::Link => "Link",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named child of a folder. The variant is the child's kind, so the kind
/// and the id are always stored together.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", content = "id")]
pub enum DirEntry {
    File(ObjectId),
    Folder(ObjectId),
    Link(ObjectId),
}

impl DirEntry {
    pub fn object_id(&self) -> ObjectId {
        match self {
            DirEntry::File(id) | DirEntry::Folder(id) | DirEntry::Link(id) => *id,
        }
    }

    pub fn entry_type(&self) -> EntryType {
        match self {
            DirEntry::File(_) => EntryType::File,
            DirEntry::Folder(_) => EntryType::Folder,
            DirEntry::Link(_) => EntryType::Link,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct File {
    id: ObjectId,
    meta: Meta,
    content: Vec<u8>,
}

impl File {
    pub(crate) fn new(id: ObjectId, meta: Meta, content: Vec<u8>) -> Self {
        Self { id, meta, content }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Folder {
    id: ObjectId,
    meta: Meta,
    entries: EntryTable,
}

impl Folder {
    pub(crate) fn new(id: ObjectId, meta: Meta) -> Self {
        Self {
            id,
            meta,
            entries: EntryTable::new(),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn entries(&self) -> &EntryTable {
        &self.entries
    }

    /// Only reachable from inside a transaction that holds the folder.
    pub(crate) fn entries_mut(&mut self) -> &mut EntryTable {
        &mut self.entries
    }
}

/// A named pointer at another object's id. The target is never followed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Link {
    id: ObjectId,
    meta: Meta,
    target_id: ObjectId,
}

impl Link {
    pub(crate) fn new(id: ObjectId, meta: Meta, target_id: ObjectId) -> Self {
        Self {
            id,
            meta,
            target_id,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn target_id(&self) -> ObjectId {
        self.target_id
    }
}

/// Anchor of one namespace tree. The backing folder id is fixed at creation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Root {
    id: ObjectId,
    name: String,
    folder_id: ObjectId,
}

impl Root {
    pub(crate) fn new(id: ObjectId, name: String, folder_id: ObjectId) -> Self {
        Self {
            id,
            name,
            folder_id,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn folder_id(&self) -> ObjectId {
        self.folder_id
    }
}

/// Kind of any object the ledger can hold.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    File,
    Folder,
    Link,
    Root,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ObjectKind::File => "File",
            ObjectKind::Folder => "Folder",
            ObjectKind::Link => "Link",
            ObjectKind::Root => "Root",
        };
        f.write_str(s)
    }
}

impl From<EntryType> for ObjectKind {
    fn from(t: EntryType) -> Self {
        match t {
            EntryType::File => ObjectKind::File,
            EntryType::Folder => ObjectKind::Folder,
            EntryType::Link => ObjectKind::Link,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind")]
pub enum Object {
    File(File),
    Folder(Folder),
    Link(Link),
    Root(Root),
}

impl Object {
    pub fn id(&self) -> ObjectId {
        match self {
            Object::File(o) => o.id(),
            Object::Folder(o) => o.id(),
            Object::Link(o) => o.id(),
            Object::Root(o) => o.id(),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::File(_) => ObjectKind::File,
            Object::Folder(_) => ObjectKind::Folder,
            Object::Link(_) => ObjectKind::Link,
            Object::Root(_) => ObjectKind::Root,
        }
    }
}

/// Typed access to the variants of [`Object`].
pub trait LedgerObject: Clone + Into<Object> {
    const KIND: ObjectKind;

    fn object_id(&self) -> ObjectId;

    fn from_ref(object: &Object) -> Option<&Self>;
}

macro_rules! ledger_object {
    ($ty:ident) => {
        impl From<$ty> for Object {
            fn from(o: $ty) -> Self {
                Object::$ty(o)
            }
        }

        impl LedgerObject for $ty {
            const KIND: ObjectKind = ObjectKind::$ty;

            fn object_id(&self) -> ObjectId {
                self.id
            }

            fn from_ref(object: &Object) -> Option<&Self> {
                match object {
                    Object::$ty(o) => Some(o),
                    _ => None,
                }
            }
        }
    };
}

ledger_object!(File);
ledger_object!(Folder);
ledger_object!(Link);
ledger_object!(Root);
