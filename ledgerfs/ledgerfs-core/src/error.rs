use thiserror::Error;

use crate::model::{EntryType, ObjectId, ObjectKind};

pub type Result<T> = std::result::Result<T, NamespaceError>;

/// Reasons a namespace transaction aborts.
///
/// The first six variants are the structural checks made against a folder's
/// entry table; the rest come from the ledger itself (unknown ids, ownership,
/// persistence) or from name and path validation.
#[derive(Debug, Error)]
pub enum NamespaceError {
    #[error("entry {name:?} refers to {expected}, but {presented} was presented")]
    IdentityMismatch {
        name: String,
        expected: ObjectId,
        presented: ObjectId,
    },
    #[error("name {0:?} is already taken")]
    NameCollision(String),
    #[error("no entry named {0:?}")]
    EntryNotFound(String),
    #[error("entry {name:?} is a {actual}, expected a {expected}")]
    TypeMismatch {
        name: String,
        expected: EntryType,
        actual: EntryType,
    },
    #[error("folder {0} is not empty")]
    FolderNotEmpty(ObjectId),
    #[error("{0} already owns a root")]
    RootAlreadyExists(String),
    #[error("invalid entry name {0:?}")]
    InvalidName(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("{0:?} is not a folder")]
    NotAFolder(String),
    #[error("object {0} does not exist")]
    ObjectNotFound(ObjectId),
    #[error("object {id} is a {actual}, expected a {expected}")]
    WrongObjectKind {
        id: ObjectId,
        expected: ObjectKind,
        actual: ObjectKind,
    },
    #[error("object {id} is not owned by {caller}")]
    NotOwner { id: ObjectId, caller: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NamespaceError {
    /// Stable machine-readable name of the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            NamespaceError::IdentityMismatch { .. } => "identity_mismatch",
            NamespaceError::NameCollision(_) => "name_collision",
            NamespaceError::EntryNotFound(_) => "entry_not_found",
            NamespaceError::TypeMismatch { .. } => "type_mismatch",
            NamespaceError::FolderNotEmpty(_) => "folder_not_empty",
            NamespaceError::RootAlreadyExists(_) => "root_already_exists",
            NamespaceError::InvalidName(_) => "invalid_name",
            NamespaceError::InvalidPath(_) => "invalid_path",
            NamespaceError::NotAFolder(_) => "not_a_folder",
            NamespaceError::ObjectNotFound(_) => "object_not_found",
            NamespaceError::WrongObjectKind { .. } => "wrong_object_kind",
            NamespaceError::NotOwner { .. } => "not_owner",
            NamespaceError::Io(_) => "io",
            NamespaceError::Serialization(_) => "serialization",
        }
    }
}
