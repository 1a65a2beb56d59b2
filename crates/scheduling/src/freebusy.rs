/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use crate::{FreeBusyResult, Privilege, Scheduler, TimeWindow, status};
use calcard::icalendar::{
    ICalendar, ICalendarComponentType, ICalendarEntry, ICalendarMethod, ICalendarProperty,
    ICalendarValue,
};

/// A validated free/busy request, one aggregation pass per attendee. Built
/// by the boundary layer after request-shape validation.
#[derive(Debug)]
pub struct FreeBusyRequest {
    pub organizer: ICalendarEntry,
    pub uid: Option<ICalendarEntry>,
    pub attendees: Vec<String>,
    pub window: TimeWindow,
}

impl Scheduler {
    /// Aggregates availability for one requested attendee. Failures are
    /// always resolved to a status on the result, never raised, so sibling
    /// attendees in the same request are unaffected.
    pub fn query_free_busy(&self, email: &str, request: &FreeBusyRequest) -> FreeBusyResult {
        let recipient = format!("mailto:{email}");

        let Some(principal) = self.directory.principal_by_address(email) else {
            return FreeBusyResult {
                recipient,
                request_status: status::no_principal_address(email),
                calendar_data: None,
            };
        };
        let Some(home_set) = principal.home_set.as_deref() else {
            return FreeBusyResult {
                recipient,
                request_status: status::NO_HOME_SET.to_string(),
                calendar_data: None,
            };
        };

        let calendars = match self.store.calendars_in(home_set) {
            Ok(calendars) => calendars,
            Err(err) => {
                return FreeBusyResult {
                    recipient,
                    request_status: status::failure(&err),
                    calendar_data: None,
                };
            }
        };

        let mut objects = Vec::new();
        for calendar in calendars {
            // A calendar the requester may not see is skipped rather than
            // failing the whole request.
            if !self.privileges.is_granted(&calendar, Privilege::ReadFreeBusy) {
                tracing::debug!(
                    calendar = %calendar,
                    attendee = %email,
                    "skipping calendar without read-free-busy privilege"
                );
                continue;
            }

            match self.store.query_time_range(&calendar, &request.window) {
                Ok(entries) => {
                    for entry in entries {
                        if let Ok(ical) = ICalendar::parse(&entry.content) {
                            objects.push(ical);
                        } else {
                            tracing::debug!(path = %entry.path, "ignoring unparsable calendar object");
                        }
                    }
                }
                Err(err) => {
                    return FreeBusyResult {
                        recipient,
                        request_status: status::failure(&err),
                        calendar_data: None,
                    };
                }
            }
        }

        let mut availability = self.availability.generate(objects, &request.window);
        stamp_reply(&mut availability, &recipient, request);

        FreeBusyResult {
            recipient,
            request_status: status::SUCCESS.to_string(),
            calendar_data: Some(availability),
        }
    }
}

/// Stamps the aggregated document with the requested attendee, the original
/// request's UID and a copy of its organizer, plus METHOD:REPLY on the
/// envelope.
fn stamp_reply(availability: &mut ICalendar, recipient: &str, request: &FreeBusyRequest) {
    if let Some(root) = availability
        .components
        .first_mut()
        .filter(|comp| comp.component_type == ICalendarComponentType::VCalendar)
    {
        root.entries.retain(|entry| !matches!(entry.name, ICalendarProperty::Method));
        root.entries.push(ICalendarEntry {
            name: ICalendarProperty::Method,
            params: vec![],
            values: vec![ICalendarValue::Method(ICalendarMethod::Reply)],
        });
    }

    for comp in availability.components.iter_mut() {
        if comp.component_type == ICalendarComponentType::VFreebusy {
            comp.entries.retain(|entry| {
                !matches!(
                    entry.name,
                    ICalendarProperty::Attendee
                        | ICalendarProperty::Organizer
                        | ICalendarProperty::Uid
                )
            });
            comp.entries.push(ICalendarEntry {
                name: ICalendarProperty::Attendee,
                params: vec![],
                values: vec![ICalendarValue::Text(recipient.to_string())],
            });
            comp.entries.push(request.organizer.clone());
            if let Some(uid) = &request.uid {
                comp.entries.push(uid.clone());
            }
            break;
        }
    }
}
