/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use crate::stubs::*;
use ahash::AHashSet;
use std::sync::Arc;

#[test]
fn mixed_local_and_unresolvable_recipients() {
    let store = Arc::new(
        MemoryStore::default()
            .with_collection("/carol/cal/personal")
            .with_collection("/carol/inbox"),
    );
    let acl = Arc::new(StaticAcl::default());
    let scheduler = scheduler(
        MemoryDirectory::default()
            .with_principal(local_principal("alice"))
            .with_principal(local_principal("carol")),
        store.clone(),
        acl,
    );

    let event = event(
        "uid-mixed",
        "alice@example.com",
        &["carol@example.com", "bob@nowhere.invalid"],
    );
    let acting = AHashSet::from_iter(["alice@example.com".to_string()]);
    let processed = scheduler.process_change(None, &event, &acting, &AHashSet::new());

    assert!(processed.modified);
    assert_eq!(
        schedule_status_of(&processed.ical, "carol@example.com").as_deref(),
        Some("1.2;Message delivered locally")
    );
    assert_eq!(
        schedule_status_of(&processed.ical, "bob@nowhere.invalid").as_deref(),
        Some("3.7;Could not find principal with email bob@nowhere.invalid")
    );
    // The organizer never receives their own invitation
    assert_eq!(schedule_status_of(&processed.ical, "alice@example.com"), None);

    // Carol got a filed inbox copy plus a merged calendar copy; the
    // unresolvable recipient caused no writes at all.
    assert_eq!(store.entries_under("/carol/inbox").len(), 1);
    assert_eq!(store.entries_under("/carol/cal/personal").len(), 1);
    assert_eq!(store.write_count(), 2);
}

#[test]
fn ignored_recipients_are_skipped() {
    let store = Arc::new(
        MemoryStore::default()
            .with_collection("/carol/cal/personal")
            .with_collection("/carol/inbox"),
    );
    let scheduler = scheduler(
        MemoryDirectory::default()
            .with_principal(local_principal("alice"))
            .with_principal(local_principal("carol")),
        store.clone(),
        Arc::new(StaticAcl::default()),
    );

    let event = event("uid-skip", "alice@example.com", &["carol@example.com"]);
    let acting = AHashSet::from_iter(["alice@example.com".to_string()]);
    let ignore = AHashSet::from_iter(["carol@example.com".to_string()]);
    let processed = scheduler.process_change(None, &event, &acting, &ignore);

    assert!(!processed.modified);
    assert_eq!(schedule_status_of(&processed.ical, "carol@example.com"), None);
    assert_eq!(store.write_count(), 0);
}

#[test]
fn attendee_reply_updates_organizer_copy() {
    let store = Arc::new(
        MemoryStore::default()
            .with_collection("/alice/cal/personal")
            .with_collection("/alice/inbox"),
    );
    let scheduler = scheduler(
        MemoryDirectory::default()
            .with_principal(local_principal("alice"))
            .with_principal(local_principal("carol")),
        store.clone(),
        Arc::new(StaticAcl::default()),
    );

    // Alice already holds her organizer copy of the event
    let organizer_copy = event("uid-reply", "alice@example.com", &["carol@example.com"]);
    store.insert("/alice/cal/personal/evt.ics", &organizer_copy.to_string());

    // Carol accepts on her own copy
    let carol_copy = event_with_partstat(
        "uid-reply",
        "alice@example.com",
        &["carol@example.com"],
        "ACCEPTED",
    );
    let acting = AHashSet::from_iter(["carol@example.com".to_string()]);
    let processed = scheduler.process_change(
        Some(&organizer_copy),
        &carol_copy,
        &acting,
        &AHashSet::new(),
    );

    assert!(processed.modified);
    assert_eq!(
        schedule_status_of(&processed.ical, "alice@example.com").as_deref(),
        Some("1.2;Message delivered locally")
    );

    let updated = store
        .content_of("/alice/cal/personal/evt.ics")
        .expect("organizer copy still present");
    assert!(updated.contains("PARTSTAT=ACCEPTED"), "{updated}");
    assert_eq!(store.entries_under("/alice/inbox").len(), 1);
}

#[test]
fn removal_sends_cancellations() {
    let store = Arc::new(
        MemoryStore::default()
            .with_collection("/carol/cal/personal")
            .with_collection("/carol/inbox"),
    );
    let scheduler = scheduler(
        MemoryDirectory::default()
            .with_principal(local_principal("alice"))
            .with_principal(local_principal("carol")),
        store.clone(),
        Arc::new(StaticAcl::default()),
    );

    let event = event("uid-cancel", "alice@example.com", &["carol@example.com"]);
    let acting = AHashSet::from_iter(["alice@example.com".to_string()]);
    scheduler.process_removal(&event, &acting);

    let inbox = store.entries_under("/carol/inbox");
    assert_eq!(inbox.len(), 1);
    assert!(inbox[0].1.contains("METHOD:CANCEL"), "{}", inbox[0].1);
}
