//! Lifecycle of namespace entities.
//!
//! Every mutating call here runs as one ledger transaction. The invariant
//! checks run against the folder's staged copy before anything is written,
//! and a failure at any point drops the whole transaction.

use tracing::debug;

use crate::error::{NamespaceError, Result};
use crate::events::Event;
use crate::invariants;
use crate::ledger::{Ledger, Transaction};
use crate::model::{DirEntry, EntryType, File, Folder, Link, Meta, ObjectId, Root};

pub struct Namespace {
    ledger: Ledger,
}

impl Namespace {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Create a root and its empty backing folder, both owned by `caller`.
    pub fn create_root(&mut self, caller: &str, name: &str) -> Result<Root> {
        let (root, _) = self.ledger.execute(caller, |tx| {
            if tx.unique_roots() && tx.sender_owns_root() {
                return Err(NamespaceError::RootAlreadyExists(caller.to_string()));
            }
            let now = tx.timestamp();
            let folder = Folder::new(tx.fresh_id(), Meta::new(now));
            let root = Root::new(tx.fresh_id(), name.to_string(), folder.id());
            let folder_id = folder.id();
            tx.transfer(folder, caller);
            tx.transfer(root.clone(), caller);
            tx.emit(Event::RootCreated {
                root_id: root.id(),
                root_folder_id: folder_id,
                owner: caller.to_string(),
            });
            Ok(root)
        })?;
        debug!(owner = caller, root = %root.id(), folder = %root.folder_id(), "root created");
        Ok(root)
    }

    pub fn create_file(
        &mut self,
        caller: &str,
        parent_id: ObjectId,
        name: &str,
        content: Vec<u8>,
    ) -> Result<File> {
        let (file, _) = self.ledger.execute(caller, |tx| {
            let file = File::new(tx.fresh_id(), Meta::new(tx.timestamp()), content);
            insert_child(tx, parent_id, name, DirEntry::File(file.id()))?;
            tx.transfer(file.clone(), caller);
            tx.emit(Event::FileCreated {
                file_id: file.id(),
                folder_id: parent_id,
                name: name.to_string(),
                owner: caller.to_string(),
            });
            Ok(file)
        })?;
        debug!(parent = %parent_id, name, file = %file.id(), "file created");
        Ok(file)
    }

    pub fn create_folder(&mut self, caller: &str, parent_id: ObjectId, name: &str) -> Result<Folder> {
        let (folder, _) = self.ledger.execute(caller, |tx| {
            let folder = Folder::new(tx.fresh_id(), Meta::new(tx.timestamp()));
            insert_child(tx, parent_id, name, DirEntry::Folder(folder.id()))?;
            tx.transfer(folder.clone(), caller);
            tx.emit(Event::FolderCreated {
                folder_id: folder.id(),
                parent_id: Some(parent_id),
                name: name.to_string(),
                owner: caller.to_string(),
            });
            Ok(folder)
        })?;
        debug!(parent = %parent_id, name, folder = %folder.id(), "folder created");
        Ok(folder)
    }

    /// The target is recorded as given; it need not exist.
    pub fn create_link(
        &mut self,
        caller: &str,
        parent_id: ObjectId,
        name: &str,
        target_id: ObjectId,
    ) -> Result<Link> {
        let (link, _) = self.ledger.execute(caller, |tx| {
            let link = Link::new(tx.fresh_id(), Meta::new(tx.timestamp()), target_id);
            insert_child(tx, parent_id, name, DirEntry::Link(link.id()))?;
            tx.transfer(link.clone(), caller);
            tx.emit(Event::LinkCreated {
                link_id: link.id(),
                folder_id: parent_id,
                name: name.to_string(),
                target_id,
                owner: caller.to_string(),
            });
            Ok(link)
        })?;
        debug!(parent = %parent_id, name, link = %link.id(), target = %target_id, "link created");
        Ok(link)
    }

    pub fn delete_file(
        &mut self,
        caller: &str,
        parent_id: ObjectId,
        name: &str,
        file_id: ObjectId,
    ) -> Result<()> {
        self.delete_entry(caller, parent_id, name, EntryType::File, file_id)
    }

    /// The folder must be empty.
    pub fn delete_folder(
        &mut self,
        caller: &str,
        parent_id: ObjectId,
        name: &str,
        folder_id: ObjectId,
    ) -> Result<()> {
        self.delete_entry(caller, parent_id, name, EntryType::Folder, folder_id)
    }

    pub fn delete_link(
        &mut self,
        caller: &str,
        parent_id: ObjectId,
        name: &str,
        link_id: ObjectId,
    ) -> Result<()> {
        self.delete_entry(caller, parent_id, name, EntryType::Link, link_id)
    }

    /// Remove `name` from the parent and destroy the presented entity.
    ///
    /// Checks run in a fixed order: the name must exist, its stored type must
    /// be `kind`, the stored id must be `presented_id`, and a folder must be
    /// empty.
    pub fn delete_entry(
        &mut self,
        caller: &str,
        parent_id: ObjectId,
        name: &str,
        kind: EntryType,
        presented_id: ObjectId,
    ) -> Result<()> {
        self.ledger.execute(caller, |tx| {
            let mut parent = tx.take::<Folder>(parent_id)?;
            let entry = invariants::require_name_exists(parent.entries(), name)?;
            invariants::require_type(name, &entry, kind)?;
            invariants::require_identity(name, &entry, presented_id)?;
            match kind {
                EntryType::File => {
                    let file = tx.take::<File>(presented_id)?;
                    tx.destroy(file)?;
                }
                EntryType::Folder => {
                    let folder = tx.take::<Folder>(presented_id)?;
                    invariants::require_empty(presented_id, folder.entries())?;
                    tx.destroy(folder)?;
                }
                EntryType::Link => {
                    let link = tx.take::<Link>(presented_id)?;
                    tx.destroy(link)?;
                }
            }
            parent.entries_mut().remove(name)?;
            tx.update(parent)?;
            tx.emit(Event::EntryDeleted {
                parent_id,
                name: name.to_string(),
                entry_type: kind,
            });
            Ok(())
        })?;
        debug!(parent = %parent_id, name, kind = %kind, id = %presented_id, "entry deleted");
        Ok(())
    }

    /// Move the entry under `old_name` to `new_name` within one folder.
    pub fn rename_entry(
        &mut self,
        caller: &str,
        folder_id: ObjectId,
        old_name: &str,
        new_name: &str,
    ) -> Result<DirEntry> {
        let (entry, _) = self.ledger.execute(caller, |tx| {
            let mut folder = tx.take::<Folder>(folder_id)?;
            invariants::require_name_exists(folder.entries(), old_name)?;
            invariants::require_valid_name(new_name)?;
            invariants::require_name_available(folder.entries(), new_name)?;
            let entry = folder.entries_mut().rekey(old_name, new_name)?;
            tx.update(folder)?;
            tx.emit(Event::EntryRenamed {
                parent_id: folder_id,
                old_name: old_name.to_string(),
                new_name: new_name.to_string(),
            });
            Ok(entry)
        })?;
        debug!(folder = %folder_id, old_name, new_name, "entry renamed");
        Ok(entry)
    }

    pub fn folder(&self, folder_id: ObjectId) -> Result<&Folder> {
        self.ledger.object::<Folder>(folder_id)
    }

    /// Entries of a folder in no particular order.
    pub fn list(&self, folder_id: ObjectId) -> Result<Vec<(String, DirEntry)>> {
        let folder = self.folder(folder_id)?;
        Ok(folder
            .entries()
            .iter()
            .map(|(name, entry)| (name.to_string(), entry))
            .collect())
    }

    pub fn lookup(&self, folder_id: ObjectId, name: &str) -> Result<Option<DirEntry>> {
        Ok(self.folder(folder_id)?.entries().get(name))
    }

    /// Walk `path` from `folder_id` and return the entry it names.
    ///
    /// Links are returned as entries, never followed.
    pub fn resolve_path(&self, folder_id: ObjectId, path: &str) -> Result<DirEntry> {
        let components = split_path(path)?;
        let (last, walk) = components
            .split_last()
            .ok_or_else(|| NamespaceError::InvalidPath(path.to_string()))?;
        let mut current = self.folder(folder_id)?;
        for component in walk {
            let entry = current
                .entries()
                .get(component)
                .ok_or_else(|| NamespaceError::EntryNotFound(component.to_string()))?;
            match entry {
                DirEntry::Folder(id) => current = self.folder(id)?,
                _ => return Err(NamespaceError::NotAFolder(component.to_string())),
            }
        }
        current
            .entries()
            .get(last)
            .ok_or_else(|| NamespaceError::EntryNotFound(last.to_string()))
    }
}

/// Validate `name`, claim it in the parent and write the parent back.
fn insert_child(
    tx: &mut Transaction<'_>,
    parent_id: ObjectId,
    name: &str,
    entry: DirEntry,
) -> Result<()> {
    let mut parent = tx.take::<Folder>(parent_id)?;
    invariants::require_valid_name(name)?;
    invariants::require_name_available(parent.entries(), name)?;
    parent.entries_mut().add(name, entry)?;
    tx.update(parent)
}

fn split_path(path: &str) -> Result<Vec<&str>> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(NamespaceError::InvalidPath(path.to_string()));
    }
    trimmed
        .split('/')
        .map(|c| {
            if invariants::is_valid_name(c) {
                Ok(c)
            } else {
                Err(NamespaceError::InvalidPath(path.to_string()))
            }
        })
        .collect()
}
