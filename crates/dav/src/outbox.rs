/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use crate::{
    DavError,
    response::{Href, ScheduleResponse, ScheduleResponseItem},
};
use calcard::{
    Entry, Parser,
    icalendar::{ICalendarComponentType, ICalendarProperty, ICalendarValue, Uri},
};
use scheduling::{Scheduler, TimeWindow, freebusy::FreeBusyRequest, sanitize_address};

/// POST handler for an outbox collection: accepts a calendar-format body,
/// dispatches free/busy requests to the aggregator and rejects any other
/// scheduling method.
pub fn handle_outbox_post(
    scheduler: &Scheduler,
    owner_addresses: &[String],
    body: &[u8],
) -> crate::Result<ScheduleResponse> {
    if body.len() > scheduler.config.max_itip_size {
        return Err(DavError::PayloadTooLarge(scheduler.config.max_itip_size));
    }
    let itip_raw = std::str::from_utf8(body)
        .map_err(|_| DavError::BadRequest("Invalid UTF-8 in iCalendar data".to_string()))?;
    let itip = match Parser::new(itip_raw).entry() {
        Entry::ICalendar(ical) if ical.components.len() > 1 => ical,
        _ => {
            return Err(DavError::BadRequest(
                "Failed to parse iCalendar data".to_string(),
            ));
        }
    };

    // Extract the request parameters from the single VFREEBUSY component
    let mut from_date = None;
    let mut to_date = None;
    let mut organizer = None;
    let mut attendees = Vec::new();
    let mut uid = None;
    let tz_resolver = itip.build_tz_resolver();
    let mut found_freebusy = false;
    let mut found_other = false;

    for component in &itip.components {
        if component.component_type != ICalendarComponentType::VFreebusy {
            found_other = found_other || component.component_type.is_scheduling_object();
            continue;
        } else if !found_freebusy {
            found_freebusy = true;
        } else {
            return Err(DavError::BadRequest(
                "Multiple VFREEBUSY components found".to_string(),
            ));
        }

        for entry in &component.entries {
            let tz_id = entry.tz_id();
            match (&entry.name, entry.values.first()) {
                (ICalendarProperty::Dtstart, Some(ICalendarValue::PartialDateTime(dt))) => {
                    from_date = dt.to_date_time_with_tz(tz_resolver.resolve_or_default(tz_id));
                }
                (ICalendarProperty::Dtend, Some(ICalendarValue::PartialDateTime(dt))) => {
                    to_date = dt.to_date_time_with_tz(tz_resolver.resolve_or_default(tz_id));
                }
                (ICalendarProperty::Uid, Some(ICalendarValue::Text(_))) => {
                    uid = Some(entry);
                }
                (
                    ICalendarProperty::Organizer,
                    Some(ICalendarValue::Text(_) | ICalendarValue::Uri(Uri::Location(_))),
                ) => {
                    organizer = Some(entry);
                }
                (
                    ICalendarProperty::Attendee,
                    Some(ICalendarValue::Text(value) | ICalendarValue::Uri(Uri::Location(value))),
                ) => {
                    attendees.push(
                        sanitize_address(value)
                            .unwrap_or_else(|| value.trim().to_lowercase()),
                    );
                }
                _ => {}
            }
        }
    }

    if !found_freebusy {
        return Err(if found_other {
            DavError::NotImplemented(
                "Only VFREEBUSY requests are supported on this collection".to_string(),
            )
        } else {
            DavError::BadRequest("No scheduling component found".to_string())
        });
    }

    // The organizer must be one of the outbox owner's addresses
    let Some(organizer) = organizer else {
        return Err(DavError::BadRequest(
            "Missing ORGANIZER in VFREEBUSY component".to_string(),
        ));
    };
    let organizer_email = organizer
        .values
        .first()
        .and_then(|value| value.as_text())
        .and_then(sanitize_address);
    if !organizer_email.is_some_and(|email| {
        owner_addresses
            .iter()
            .any(|address| sanitize_address(address).is_some_and(|owner| owner == email))
    }) {
        return Err(DavError::Forbidden(
            "The organizer of this request is not the owner of this outbox".to_string(),
        ));
    }

    if attendees.is_empty() {
        return Err(DavError::BadRequest(
            "Missing ATTENDEE in VFREEBUSY component".to_string(),
        ));
    }
    let (Some(from_date), Some(to_date)) = (from_date, to_date) else {
        return Err(DavError::BadRequest(
            "Missing DTSTART or DTEND in VFREEBUSY component".to_string(),
        ));
    };

    let request = FreeBusyRequest {
        organizer: organizer.clone(),
        uid: uid.cloned(),
        attendees,
        window: TimeWindow {
            start: from_date.timestamp(),
            end: to_date.timestamp(),
        },
    };

    // One result per requested attendee, in request order
    let mut response = ScheduleResponse::default();
    for email in &request.attendees {
        let result = scheduler.query_free_busy(email, &request);
        response.items.push(ScheduleResponseItem {
            recipient: Href(result.recipient),
            request_status: result.request_status,
            calendar_data: result.calendar_data.map(|ical| ical.to_string()),
        });
    }

    Ok(response)
}
