//! Checks consulted before any entry table is mutated.
//!
//! The predicates are pure. The `require_*` forms turn a failed predicate into
//! the error that aborts the enclosing transaction; undoing any staged work is
//! left to the ledger.

use crate::error::{NamespaceError, Result};
use crate::model::{DirEntry, EntryType, ObjectId};
use crate::table::EntryTable;

pub fn name_available(table: &EntryTable, name: &str) -> bool {
    !table.contains(name)
}

pub fn name_exists(table: &EntryTable, name: &str) -> bool {
    table.contains(name)
}

pub fn type_matches(entry: &DirEntry, expected: EntryType) -> bool {
    entry.entry_type() == expected
}

pub fn is_empty(table: &EntryTable) -> bool {
    table.is_empty()
}

pub fn identity_matches(entry_object_id: ObjectId, presented_id: ObjectId) -> bool {
    entry_object_id == presented_id
}

pub fn require_name_available(table: &EntryTable, name: &str) -> Result<()> {
    if name_available(table, name) {
        Ok(())
    } else {
        Err(NamespaceError::NameCollision(name.to_string()))
    }
}

/// Returns the entry stored under `name`.
pub fn require_name_exists(table: &EntryTable, name: &str) -> Result<DirEntry> {
    table
        .get(name)
        .ok_or_else(|| NamespaceError::EntryNotFound(name.to_string()))
}

pub fn require_type(name: &str, entry: &DirEntry, expected: EntryType) -> Result<()> {
    if type_matches(entry, expected) {
        Ok(())
    } else {
        Err(NamespaceError::TypeMismatch {
            name: name.to_string(),
            expected,
            actual: entry.entry_type(),
        })
    }
}

pub fn require_identity(name: &str, entry: &DirEntry, presented_id: ObjectId) -> Result<()> {
    if identity_matches(entry.object_id(), presented_id) {
        Ok(())
    } else {
        Err(NamespaceError::IdentityMismatch {
            name: name.to_string(),
            expected: entry.object_id(),
            presented: presented_id,
        })
    }
}

pub fn require_empty(folder_id: ObjectId, table: &EntryTable) -> Result<()> {
    if is_empty(table) {
        Ok(())
    } else {
        Err(NamespaceError::FolderNotEmpty(folder_id))
    }
}

/// Entry names must stay usable as a single path component.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('/') && !name.contains('\0')
}

pub fn require_valid_name(name: &str) -> Result<()> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(NamespaceError::InvalidName(name.to_string()))
    }
}
