/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use ahash::AHashSet;
use calcard::icalendar::ICalendar;
use scheduling::{Principal, Scheduler, sanitize_address};

/// Result of a pre-write hook: the (possibly rewritten) document text and
/// whether the hosting service must persist the rewritten form.
#[derive(Debug)]
pub struct HookOutcome {
    pub content: String,
    pub modified: bool,
}

/// Scheduling URLs and user type advertised on a principal resource.
#[derive(Debug)]
pub struct PrincipalProperties {
    pub inbox_url: Option<String>,
    pub outbox_url: Option<String>,
    pub default_calendar_url: Option<String>,
    pub user_type: &'static str,
}

/// Event-hook surface the hosting service invokes synchronously around
/// calendar-entry writes. The host is responsible for honoring the
/// modified-flag / rewritten-content contract.
pub trait SchedulingObjectHooks: Sync + Send {
    fn on_before_create(&self, owner_addresses: &[String], content: &str) -> HookOutcome;
    fn on_before_update(
        &self,
        owner_addresses: &[String],
        old_content: &str,
        new_content: &str,
    ) -> HookOutcome;
    fn on_before_delete(&self, owner_addresses: &[String], old_content: &str);
    fn principal_properties(&self, principal: &Principal) -> PrincipalProperties;
}

impl SchedulingObjectHooks for Scheduler {
    fn on_before_create(&self, owner_addresses: &[String], content: &str) -> HookOutcome {
        let Some((acting, ical)) = scheduling_input(owner_addresses, content) else {
            return unmodified(content);
        };

        let processed = self.process_change(None, &ical, &acting, &AHashSet::new());
        if processed.modified {
            HookOutcome {
                content: processed.ical.to_string(),
                modified: true,
            }
        } else {
            unmodified(content)
        }
    }

    fn on_before_update(
        &self,
        owner_addresses: &[String],
        old_content: &str,
        new_content: &str,
    ) -> HookOutcome {
        let Some((acting, new_ical)) = scheduling_input(owner_addresses, new_content) else {
            return unmodified(new_content);
        };
        let old_ical = ICalendar::parse(old_content).ok();

        let processed = self.process_change(old_ical.as_ref(), &new_ical, &acting, &AHashSet::new());
        if processed.modified {
            HookOutcome {
                content: processed.ical.to_string(),
                modified: true,
            }
        } else {
            unmodified(new_content)
        }
    }

    fn on_before_delete(&self, owner_addresses: &[String], old_content: &str) {
        if let Some((acting, old_ical)) = scheduling_input(owner_addresses, old_content) {
            self.process_removal(&old_ical, &acting);
        }
    }

    fn principal_properties(&self, principal: &Principal) -> PrincipalProperties {
        PrincipalProperties {
            inbox_url: principal.inbox.clone(),
            outbox_url: principal.outbox.clone(),
            default_calendar_url: principal.default_calendar.clone(),
            user_type: "INDIVIDUAL",
        }
    }
}

/// An owner without addresses has nobody to notify, and a document that is
/// not calendar data is none of this layer's business; both degrade to a
/// no-op rather than an error.
fn scheduling_input(
    owner_addresses: &[String],
    content: &str,
) -> Option<(AHashSet<String>, ICalendar)> {
    let acting = owner_addresses
        .iter()
        .filter_map(|address| sanitize_address(address))
        .collect::<AHashSet<_>>();
    if acting.is_empty() {
        tracing::trace!("no scheduling addresses for owner, nothing to notify");
        return None;
    }

    ICalendar::parse(content).ok().map(|ical| (acting, ical))
}

fn unmodified(content: &str) -> HookOutcome {
    HookOutcome {
        content: content.to_string(),
        modified: false,
    }
}
