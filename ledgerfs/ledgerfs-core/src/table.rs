//! Per-folder table mapping child names to directory entries.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{NamespaceError, Result};
use crate::model::DirEntry;

/// Name-indexed children of a folder.
///
/// Iteration order is whatever the underlying hash map yields; callers must
/// not depend on it.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct EntryTable {
    entries: HashMap<String, DirEntry>,
}

impl EntryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `entry` under `name`. Fails if the name is occupied.
    pub fn add(&mut self, name: impl Into<String>, entry: DirEntry) -> Result<()> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(NamespaceError::NameCollision(name));
        }
        self.entries.insert(name, entry);
        Ok(())
    }

    /// Remove and return the entry under `name`. Fails if absent.
    pub fn remove(&mut self, name: &str) -> Result<DirEntry> {
        self.entries
            .remove(name)
            .ok_or_else(|| NamespaceError::EntryNotFound(name.to_string()))
    }

    /// Move the entry under `old` to `new` in one step.
    ///
    /// Both keys are checked before anything changes, so on failure the
    /// entry is still under `old` and `new` is untouched.
    pub fn rekey(&mut self, old: &str, new: impl Into<String>) -> Result<DirEntry> {
        let new = new.into();
        if !self.entries.contains_key(old) {
            return Err(NamespaceError::EntryNotFound(old.to_string()));
        }
        if self.entries.contains_key(&new) {
            return Err(NamespaceError::NameCollision(new));
        }
        let entry = self.remove(old)?;
        self.entries.insert(new, entry);
        Ok(entry)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<DirEntry> {
        self.entries.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, DirEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn add_and_get() {
        let mut table = EntryTable::new();
        let id = Uuid::new_v4();
        table.add("notes.txt", DirEntry::File(id)).unwrap();
        assert!(table.contains("notes.txt"));
        assert_eq!(table.get("notes.txt"), Some(DirEntry::File(id)));
        assert_eq!(table.len(), 1);
        assert!(!table.is_empty());
    }

    #[test]
    fn duplicate_add_keeps_first_entry() {
        let mut table = EntryTable::new();
        let first = Uuid::new_v4();
        table.add("a", DirEntry::File(first)).unwrap();
        let err = table.add("a", DirEntry::Folder(Uuid::new_v4())).unwrap_err();
        assert!(matches!(err, NamespaceError::NameCollision(n) if n == "a"));
        assert_eq!(table.get("a"), Some(DirEntry::File(first)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn remove_missing_entry() {
        let mut table = EntryTable::new();
        let err = table.remove("ghost").unwrap_err();
        assert!(matches!(err, NamespaceError::EntryNotFound(n) if n == "ghost"));
    }

    #[test]
    fn remove_returns_entry() {
        let mut table = EntryTable::new();
        let id = Uuid::new_v4();
        table.add("dir", DirEntry::Folder(id)).unwrap();
        assert_eq!(table.remove("dir").unwrap(), DirEntry::Folder(id));
        assert!(table.is_empty());
    }

    #[test]
    fn rekey_moves_entry() {
        let mut table = EntryTable::new();
        let id = Uuid::new_v4();
        table.add("old", DirEntry::Link(id)).unwrap();
        table.rekey("old", "new").unwrap();
        assert!(!table.contains("old"));
        assert_eq!(table.get("new"), Some(DirEntry::Link(id)));
    }

    #[test]
    fn rekey_onto_occupied_name_changes_nothing() {
        let mut table = EntryTable::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        table.add("a", DirEntry::File(a)).unwrap();
        table.add("b", DirEntry::File(b)).unwrap();
        let before = table.clone();
        assert!(matches!(
            table.rekey("a", "b"),
            Err(NamespaceError::NameCollision(_))
        ));
        assert!(matches!(
            table.rekey("missing", "c"),
            Err(NamespaceError::EntryNotFound(_))
        ));
        assert_eq!(table, before);
    }

    #[test]
    fn serializes_as_plain_map() {
        let mut table = EntryTable::new();
        let id = Uuid::new_v4();
        table.add("x", DirEntry::Folder(id)).unwrap();
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["x"]["type"], "Folder");
        assert_eq!(json["x"]["id"], id.to_string());
    }
}
