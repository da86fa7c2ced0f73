//! End-to-end tests for namespace operations on an in-memory ledger.

use anyhow::Result;
use ledgerfs_core::ledger::{FixedClock, SequentialIds};
use ledgerfs_core::{
    DirEntry, EntryType, Event, Ledger, LedgerConfig, Link, Namespace, NamespaceError, ObjectId,
    Record,
};
use std::sync::Arc;

fn namespace() -> Namespace {
    Namespace::new(
        Ledger::in_memory()
            .with_ids(Arc::new(SequentialIds::default()))
            .with_clock(Arc::new(FixedClock(1_700_000_000_000))),
    )
}

fn entries(ns: &Namespace, folder: ObjectId) -> Vec<(String, DirEntry)> {
    let mut list = ns.list(folder).unwrap();
    list.sort_by(|a, b| a.0.cmp(&b.0));
    list
}

/// Everything a failed operation must leave untouched.
#[derive(Debug, PartialEq)]
struct Snapshot {
    records: Vec<Record>,
    events: Vec<Event>,
    sequence: u64,
}

fn snapshot(ns: &Namespace) -> Snapshot {
    let mut records: Vec<Record> = ns.ledger().records().cloned().collect();
    records.sort_by_key(|r| r.id);
    Snapshot {
        records,
        events: ns.ledger().event_log().iter().cloned().collect(),
        sequence: ns.ledger().sequence(),
    }
}

#[test]
fn test_file_lifecycle_scenario() -> Result<()> {
    let mut ns = namespace();
    let root = ns.create_root("alice", "home")?;
    let r = root.folder_id();
    assert!(entries(&ns, r).is_empty());

    let f1 = ns.create_file("alice", r, "a.txt", vec![1, 2, 3])?;
    assert_eq!(ns.ledger().owner_of(f1.id()), Some("alice"));
    assert_eq!(entries(&ns, r), vec![("a.txt".to_string(), DirEntry::File(f1.id()))]);

    let err = ns.create_file("alice", r, "a.txt", vec![9]).unwrap_err();
    assert!(matches!(err, NamespaceError::NameCollision(ref n) if n == "a.txt"));

    ns.rename_entry("alice", r, "a.txt", "b.txt")?;
    assert_eq!(entries(&ns, r), vec![("b.txt".to_string(), DirEntry::File(f1.id()))]);

    ns.delete_file("alice", r, "b.txt", f1.id())?;
    assert!(entries(&ns, r).is_empty());
    assert!(!ns.ledger().contains(f1.id()));

    let log = ns.ledger().event_log();
    assert_eq!(log.len(), 4);
    assert_eq!(
        log[1],
        Event::FileCreated {
            file_id: f1.id(),
            folder_id: r,
            name: "a.txt".into(),
            owner: "alice".into(),
        }
    );
    assert_eq!(
        log[2],
        Event::EntryRenamed {
            parent_id: r,
            old_name: "a.txt".into(),
            new_name: "b.txt".into(),
        }
    );
    assert_eq!(
        log[3],
        Event::EntryDeleted {
            parent_id: r,
            name: "b.txt".into(),
            entry_type: EntryType::File,
        }
    );
    Ok(())
}

#[test]
fn test_second_create_with_any_kind_collides() -> Result<()> {
    let mut ns = namespace();
    let r = ns.create_root("alice", "home")?.folder_id();
    let folder = ns.create_folder("alice", r, "taken")?;
    let before = snapshot(&ns);

    let attempts = [
        ns.create_file("alice", r, "taken", vec![]).unwrap_err(),
        ns.create_folder("alice", r, "taken").unwrap_err(),
        ns.create_link("alice", r, "taken", folder.id()).unwrap_err(),
    ];
    for err in attempts {
        assert!(matches!(err, NamespaceError::NameCollision(_)));
    }
    assert_eq!(snapshot(&ns), before);
    assert_eq!(ns.lookup(r, "taken")?, Some(DirEntry::Folder(folder.id())));
    Ok(())
}

#[test]
fn test_delete_with_wrong_kind_keeps_entry() -> Result<()> {
    let mut ns = namespace();
    let r = ns.create_root("alice", "home")?.folder_id();
    let file = ns.create_file("alice", r, "f", vec![1])?;
    let folder = ns.create_folder("alice", r, "d")?;
    let link = ns.create_link("alice", r, "l", file.id())?;

    let cases = [
        ns.delete_folder("alice", r, "f", file.id()).unwrap_err(),
        ns.delete_link("alice", r, "f", file.id()).unwrap_err(),
        ns.delete_file("alice", r, "d", folder.id()).unwrap_err(),
        ns.delete_link("alice", r, "d", folder.id()).unwrap_err(),
        ns.delete_file("alice", r, "l", link.id()).unwrap_err(),
        ns.delete_folder("alice", r, "l", link.id()).unwrap_err(),
    ];
    for err in cases {
        assert!(matches!(err, NamespaceError::TypeMismatch { .. }), "{err:?}");
    }
    assert_eq!(entries(&ns, r).len(), 3);
    Ok(())
}

#[test]
fn test_identity_binding() -> Result<()> {
    let mut ns = namespace();
    let r = ns.create_root("alice", "home")?.folder_id();
    let a = ns.create_file("alice", r, "a", vec![])?;
    let b = ns.create_file("alice", r, "b", vec![])?;

    let err = ns.delete_file("alice", r, "a", b.id()).unwrap_err();
    match err {
        NamespaceError::IdentityMismatch {
            expected,
            presented,
            ..
        } => {
            assert_eq!(expected, a.id());
            assert_eq!(presented, b.id());
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(ns.lookup(r, "a")?, Some(DirEntry::File(a.id())));
    assert!(ns.ledger().contains(a.id()));
    assert!(ns.ledger().contains(b.id()));
    Ok(())
}

#[test]
fn test_non_empty_folder_guard() -> Result<()> {
    let mut ns = namespace();
    let r = ns.create_root("alice", "home")?.folder_id();
    let docs = ns.create_folder("alice", r, "docs")?;
    let inner = ns.create_link("alice", docs.id(), "ref", r)?;

    let err = ns.delete_folder("alice", r, "docs", docs.id()).unwrap_err();
    assert!(matches!(err, NamespaceError::FolderNotEmpty(id) if id == docs.id()));
    assert!(ns.lookup(r, "docs")?.is_some());

    ns.delete_link("alice", docs.id(), "ref", inner.id())?;
    ns.delete_folder("alice", r, "docs", docs.id())?;
    assert!(ns.lookup(r, "docs")?.is_none());
    assert!(matches!(
        ns.list(docs.id()),
        Err(NamespaceError::ObjectNotFound(_))
    ));
    Ok(())
}

#[test]
fn test_rename_preserves_identity() -> Result<()> {
    let mut ns = namespace();
    let r = ns.create_root("alice", "home")?.folder_id();
    let link = ns.create_link("alice", r, "old", ObjectId::from_u128(77))?;
    let before = ns.lookup(r, "old")?;

    let moved = ns.rename_entry("alice", r, "old", "new")?;
    assert_eq!(Some(moved), before);
    assert_eq!(ns.lookup(r, "old")?, None);
    assert_eq!(ns.lookup(r, "new")?, Some(DirEntry::Link(link.id())));
    assert_eq!(
        ns.ledger().object::<Link>(link.id())?.target_id(),
        ObjectId::from_u128(77)
    );
    Ok(())
}

#[test]
fn test_rename_onto_occupied_name_changes_nothing() -> Result<()> {
    let mut ns = namespace();
    let r = ns.create_root("alice", "home")?.folder_id();
    ns.create_file("alice", r, "a", vec![])?;
    ns.create_file("alice", r, "b", vec![])?;
    let before = snapshot(&ns);

    let err = ns.rename_entry("alice", r, "a", "b").unwrap_err();
    assert!(matches!(err, NamespaceError::NameCollision(_)));
    let err = ns.rename_entry("alice", r, "zzz", "c").unwrap_err();
    assert!(matches!(err, NamespaceError::EntryNotFound(_)));
    assert_eq!(snapshot(&ns), before);
    Ok(())
}

#[test]
fn test_create_then_delete_folder_round_trip() -> Result<()> {
    let mut ns = namespace();
    let r = ns.create_root("alice", "home")?.folder_id();
    ns.create_file("alice", r, "keep", vec![5])?;
    let before = entries(&ns, r);

    let x = ns.create_folder("alice", r, "x")?;
    assert_eq!(entries(&ns, r).len(), before.len() + 1);
    ns.delete_folder("alice", r, "x", x.id())?;
    assert_eq!(entries(&ns, r), before);
    Ok(())
}

#[test]
fn test_failed_operations_are_atomic() -> Result<()> {
    let mut ns = namespace();
    let r = ns.create_root("alice", "home")?.folder_id();
    let sub = ns.create_folder("alice", r, "sub")?;
    let file = ns.create_file("alice", sub.id(), "f", vec![1])?;
    let mut rx = ns.ledger().events().subscribe();
    let before = snapshot(&ns);

    let failures = vec![
        ns.create_file("alice", r, "sub", vec![]).unwrap_err(),
        ns.delete_file("alice", r, "missing", file.id()).unwrap_err(),
        ns.delete_file("alice", r, "sub", file.id()).unwrap_err(),
        ns.delete_folder("alice", r, "sub", file.id()).unwrap_err(),
        ns.delete_folder("alice", r, "sub", sub.id()).unwrap_err(),
        ns.rename_entry("alice", sub.id(), "f", "f").unwrap_err(),
        ns.create_folder("bob", r, "intruder").unwrap_err(),
        ns.create_file("alice", file.id(), "inside-a-file", vec![]).unwrap_err(),
    ];
    let codes: Vec<&str> = failures.iter().map(|e| e.code()).collect();
    assert_eq!(
        codes,
        vec![
            "name_collision",
            "entry_not_found",
            "type_mismatch",
            "identity_mismatch",
            "folder_not_empty",
            "name_collision",
            "not_owner",
            "wrong_object_kind",
        ]
    );
    assert_eq!(snapshot(&ns), before);
    assert!(rx.try_recv().is_err());
    Ok(())
}

#[test]
fn test_roots_per_owner() -> Result<()> {
    let mut ns = namespace();
    let first = ns.create_root("alice", "home")?;
    let second = ns.create_root("alice", "work")?;
    ns.create_root("bob", "home")?;
    assert_ne!(first.folder_id(), second.folder_id());

    let names: Vec<&str> = ns.ledger().roots_of("alice").iter().map(|r| r.name()).collect();
    assert_eq!(names, vec!["home", "work"]);
    assert_eq!(ns.ledger().roots_of("bob").len(), 1);
    assert!(ns.ledger().roots_of("carol").is_empty());
    Ok(())
}

#[test]
fn test_unique_roots_guard() -> Result<()> {
    let ledger = Ledger::open(LedgerConfig {
        unique_roots: true,
        ..LedgerConfig::default()
    })?;
    let mut ns = Namespace::new(ledger);
    ns.create_root("alice", "home")?;
    let before = snapshot(&ns);

    let err = ns.create_root("alice", "again").unwrap_err();
    assert!(matches!(err, NamespaceError::RootAlreadyExists(ref o) if o == "alice"));
    assert_eq!(snapshot(&ns), before);
    ns.create_root("bob", "home")?;
    Ok(())
}

#[test]
fn test_each_operation_emits_one_event() -> Result<()> {
    let mut ns = namespace();
    let root = ns.create_root("alice", "home")?;
    let r = root.folder_id();
    let docs = ns.create_folder("alice", r, "docs")?;
    let link = ns.create_link("alice", r, "to-docs", docs.id())?;
    ns.delete_link("alice", r, "to-docs", link.id())?;

    assert_eq!(
        ns.ledger().event_log(),
        &[
            Event::RootCreated {
                root_id: root.id(),
                root_folder_id: r,
                owner: "alice".into(),
            },
            Event::FolderCreated {
                folder_id: docs.id(),
                parent_id: Some(r),
                name: "docs".into(),
                owner: "alice".into(),
            },
            Event::LinkCreated {
                link_id: link.id(),
                folder_id: r,
                name: "to-docs".into(),
                target_id: docs.id(),
                owner: "alice".into(),
            },
            Event::EntryDeleted {
                parent_id: r,
                name: "to-docs".into(),
                entry_type: EntryType::Link,
            },
        ]
    );
    assert_eq!(ns.ledger().sequence(), 4);
    Ok(())
}
