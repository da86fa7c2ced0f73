//! Hierarchical file namespace kept on an ownership ledger.
//!
//! Folders hold name-indexed tables of files, subfolders and links. Each
//! owner anchors one or more trees with a [`Root`]. Every mutation is a
//! single atomic ledger transaction that either commits with its event or
//! leaves no trace.

pub mod error;
pub mod events;
pub mod invariants;
pub mod ledger;
pub mod model;
pub mod namespace;
pub mod table;

pub use error::{NamespaceError, Result};
pub use events::{Event, EventBus};
pub use ledger::{Ledger, LedgerConfig, Record, TxEffects};
pub use model::{DirEntry, EntryType, File, Folder, Link, Meta, Object, ObjectId, ObjectKind, Root};
pub use namespace::Namespace;
pub use table::EntryTable;
