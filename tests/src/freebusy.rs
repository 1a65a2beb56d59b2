/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use crate::stubs::*;
use calcard::icalendar::{ICalendarEntry, ICalendarProperty, ICalendarValue};
use scheduling::{Principal, TimeWindow, freebusy::FreeBusyRequest};
use std::sync::Arc;

fn request_for(attendees: &[&str]) -> FreeBusyRequest {
    FreeBusyRequest {
        organizer: ICalendarEntry {
            name: ICalendarProperty::Organizer,
            params: vec![],
            values: vec![ICalendarValue::Text("mailto:alice@example.com".to_string())],
        },
        uid: Some(ICalendarEntry {
            name: ICalendarProperty::Uid,
            params: vec![],
            values: vec![ICalendarValue::Text("fb-query-1".to_string())],
        }),
        attendees: attendees.iter().map(|email| email.to_string()).collect(),
        window: TimeWindow {
            start: utc("20250101T090000Z"),
            end: utc("20250101T120000Z"),
        },
    }
}

#[test]
fn busy_event_is_reported_in_reply() {
    let store = Arc::new(MemoryStore::default().with_collection("/carol/cal/personal"));
    store.insert(
        "/carol/cal/personal/busy.ics",
        &event("uid-busy", "carol@example.com", &[]).to_string(),
    );
    let scheduler = scheduler(
        MemoryDirectory::default().with_principal(local_principal("carol")),
        store,
        Arc::new(StaticAcl::default()),
    );

    let result = scheduler.query_free_busy("carol@example.com", &request_for(&["carol@example.com"]));

    assert_eq!(result.recipient, "mailto:carol@example.com");
    assert_eq!(result.request_status, "2.0;Success");
    let reply = result.calendar_data.expect("availability data").to_string();
    assert!(
        reply.contains("FREEBUSY:20250101T100000Z/20250101T110000Z"),
        "{reply}"
    );
    assert!(reply.contains("METHOD:REPLY"), "{reply}");
    assert!(reply.contains("ATTENDEE:mailto:carol@example.com"), "{reply}");
    assert!(reply.contains("ORGANIZER:mailto:alice@example.com"), "{reply}");
    assert!(reply.contains("UID:fb-query-1"), "{reply}");
}

#[test]
fn unknown_attendee_yields_no_principal_status() {
    let scheduler = scheduler(
        MemoryDirectory::default(),
        Arc::new(MemoryStore::default()),
        Arc::new(StaticAcl::default()),
    );

    let result = scheduler.query_free_busy("dave@example.com", &request_for(&["dave@example.com"]));

    assert_eq!(
        result.request_status,
        "3.7;No principal found for address dave@example.com"
    );
    assert!(result.calendar_data.is_none());
}

#[test]
fn principal_without_home_set_yields_status() {
    let scheduler = scheduler(
        MemoryDirectory::default().with_principal(Principal {
            email: "carol@example.com".to_string(),
            ..Principal::default()
        }),
        Arc::new(MemoryStore::default()),
        Arc::new(StaticAcl::default()),
    );

    let result = scheduler.query_free_busy("carol@example.com", &request_for(&["carol@example.com"]));

    assert_eq!(result.request_status, "3.7;No calendar-home-set property found");
    assert!(result.calendar_data.is_none());
}

#[test]
fn denied_calendar_is_excluded_from_aggregation() {
    let store = Arc::new(
        MemoryStore::default()
            .with_collection("/carol/cal/personal")
            .with_collection("/carol/cal/private"),
    );
    store.insert(
        "/carol/cal/private/secret.ics",
        &event("uid-secret", "carol@example.com", &[]).to_string(),
    );
    let scheduler = scheduler(
        MemoryDirectory::default().with_principal(local_principal("carol")),
        store,
        Arc::new(StaticAcl::default().deny("/carol/cal/private")),
    );

    let result = scheduler.query_free_busy("carol@example.com", &request_for(&["carol@example.com"]));

    // The request still succeeds; the hidden calendar simply contributes
    // no busy time.
    assert_eq!(result.request_status, "2.0;Success");
    let reply = result.calendar_data.expect("availability data").to_string();
    assert!(!reply.contains("FREEBUSY:"), "{reply}");
}
