/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use crate::{
    DeliveryError, DeliveryHandler, Privilege, Scheduler, SchedulingMessage, status,
};
use ahash::AHashSet;
use calcard::icalendar::{ICalendar, ICalendarMethod};

/// Local delivery transport: resolves the recipient's collections, merges
/// the message into any existing copy of the event and files the raw
/// message into the recipient's inbox.
pub struct LocalDelivery;

impl DeliveryHandler for LocalDelivery {
    fn deliver(
        &self,
        scheduler: &Scheduler,
        message: &mut SchedulingMessage,
    ) -> Result<(), DeliveryError> {
        message.schedule_status = Some(deliver_local(scheduler, message)?);
        Ok(())
    }
}

fn deliver_local(
    scheduler: &Scheduler,
    message: &SchedulingMessage,
) -> Result<String, DeliveryError> {
    // Resolve the recipient; an unknown address must not touch storage or
    // the privilege checker.
    let Some(principal) = scheduler.directory.principal_by_address(&message.recipient) else {
        return Ok(status::no_principal(&message.recipient));
    };

    let Some(inbox) = principal.inbox.as_deref() else {
        return Ok(status::missing_property("schedule-inbox"));
    };
    let Some(home_set) = principal.home_set.as_deref() else {
        return Ok(status::missing_property("calendar-home-set"));
    };
    let Some(default_calendar) = principal.default_calendar.as_deref() else {
        return Ok(status::missing_property("default-calendar"));
    };

    // Delivery is system initiated and bypasses the regular ACL layering,
    // so the inbox privilege is checked directly.
    if !scheduler
        .privileges
        .is_granted(inbox, Privilege::ScheduleDeliverInvite)
    {
        return Ok(status::PRIVILEGE_DENIED.to_string());
    }

    // Locate an existing copy of this event in the recipient's home set
    // and merge the message into it, or into a fresh copy.
    let existing = scheduler.store.entry_by_uid(home_set, &message.uid)?;
    let existing_ical = existing
        .as_ref()
        .and_then(|entry| ICalendar::parse(&entry.content).ok());
    let merged = if existing.is_some() && existing_ical.is_none() {
        // The stored copy did not parse; file the message below but leave
        // the recipient's calendar untouched.
        None
    } else {
        scheduler.broker.apply_message(existing_ical.as_ref(), message)
    };

    // File an unmodified copy of the message in the inbox
    scheduler.store.create_entry(
        inbox,
        &filed_name(scheduler),
        &message.message.to_string(),
    )?;

    let Some(merged) = merged else {
        return Ok(status::NOT_PROCESSED.to_string());
    };

    match (existing, existing_ical) {
        (Some(entry), Some(previous)) => {
            let content = if message.method == ICalendarMethod::Reply {
                // Propagate the reply to the remaining participants before
                // persisting, so the organizer's annotations stay current.
                // This is a synchronous nested pass; it completes before
                // the delivery does.
                let acting = AHashSet::from_iter([message.recipient.clone()]);
                let ignore = AHashSet::from_iter([message.sender.clone()]);
                scheduler
                    .process_change(Some(&previous), &merged, &acting, &ignore)
                    .ical
                    .to_string()
            } else {
                merged.to_string()
            };
            scheduler.store.update_entry(&entry.path, &content)?;
        }
        _ => {
            scheduler
                .store
                .create_entry(default_calendar, &filed_name(scheduler), &merged.to_string())?;
        }
    }

    Ok(status::DELIVERED_LOCALLY.to_string())
}

fn filed_name(scheduler: &Scheduler) -> String {
    format!(
        "{}-{}.ics",
        scheduler.config.filed_message_prefix,
        uuid::Uuid::new_v4()
    )
}
