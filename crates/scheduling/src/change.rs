/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use crate::{Scheduler, sanitize_address};
use ahash::AHashSet;
use calcard::icalendar::{
    ICalendar, ICalendarParameter, ICalendarParameterName, ICalendarProperty,
};

/// Outcome of a change-processing pass. The annotated document is a fresh
/// copy; the caller decides whether and where to persist it.
#[derive(Debug)]
pub struct ProcessedChange {
    pub ical: ICalendar,
    pub modified: bool,
}

impl Scheduler {
    /// Computes and dispatches the scheduling messages implied by a change
    /// from `old` to `new`, then returns `new` with a `SCHEDULE-STATUS`
    /// annotation per dispatched recipient. Recipients in `ignore` are
    /// skipped entirely. One recipient's delivery outcome never affects
    /// the others.
    pub fn process_change(
        &self,
        old: Option<&ICalendar>,
        new: &ICalendar,
        acting: &AHashSet<String>,
        ignore: &AHashSet<String>,
    ) -> ProcessedChange {
        let mut annotated = new.clone();
        let mut modified = false;

        for mut message in self.broker.schedule_changes(Some(new), old, acting) {
            if ignore.contains(&message.recipient) {
                tracing::trace!(
                    recipient = %message.recipient,
                    uid = %message.uid,
                    "skipping ignored recipient"
                );
                continue;
            }

            self.dispatch(&mut message);

            if let Some(status) = &message.schedule_status {
                if annotate_participant(&mut annotated, &message.recipient, status) {
                    modified = true;
                } else {
                    // No surviving participant entry to annotate; the
                    // delivery outcome is dropped rather than failing the
                    // change.
                    tracing::debug!(
                        recipient = %message.recipient,
                        uid = %message.uid,
                        status = %status,
                        "no participant entry found for delivery status"
                    );
                }
            }
        }

        ProcessedChange {
            ical: annotated,
            modified,
        }
    }

    /// Cancellation fan-out for a deleted entry. There is no surviving
    /// copy, so outcomes are not annotated anywhere.
    pub fn process_removal(&self, old: &ICalendar, acting: &AHashSet<String>) {
        for mut message in self.broker.schedule_changes(None, Some(old), acting) {
            self.dispatch(&mut message);
        }
    }
}

/// Replaces the `SCHEDULE-STATUS` parameter on every ORGANIZER or ATTENDEE
/// entry whose address matches `recipient`. Returns whether any entry was
/// tagged.
pub(crate) fn annotate_participant(ical: &mut ICalendar, recipient: &str, status: &str) -> bool {
    let mut found = false;

    for comp in ical.components.iter_mut() {
        if !comp.component_type.is_scheduling_object() {
            continue;
        }

        for entry in comp.entries.iter_mut() {
            if !matches!(
                entry.name,
                ICalendarProperty::Organizer | ICalendarProperty::Attendee
            ) {
                continue;
            }

            if entry
                .values
                .first()
                .and_then(|value| value.as_text())
                .and_then(sanitize_address)
                .is_some_and(|email| email == recipient)
            {
                entry.params.retain(|param| {
                    !matches!(param.name, ICalendarParameterName::ScheduleStatus)
                });
                entry
                    .params
                    .push(ICalendarParameter::schedule_status(status.to_string()));
                found = true;
            }
        }
    }

    found
}
