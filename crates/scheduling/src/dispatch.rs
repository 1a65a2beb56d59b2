/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use crate::{DeliveryError, Scheduler, SchedulingMessage, status};

/// One delivery transport capability. A handler that cannot deliver the
/// message leaves `schedule_status` unset and returns `Ok(())` so the next
/// handler can claim it.
pub trait DeliveryHandler: Sync + Send {
    fn deliver(
        &self,
        scheduler: &Scheduler,
        message: &mut SchedulingMessage,
    ) -> Result<(), DeliveryError>;
}

impl Scheduler {
    /// Offers the message to each registered transport in order and records
    /// the outcome on the message. A transport failure is converted into a
    /// 5.2-class status; it never aborts the surrounding change.
    pub fn dispatch(&self, message: &mut SchedulingMessage) {
        for handler in &self.handlers {
            match handler.deliver(self, message) {
                Ok(()) => {
                    if message
                        .schedule_status
                        .as_deref()
                        .is_some_and(|value| !value.is_empty())
                    {
                        return;
                    }
                }
                Err(err) => {
                    tracing::debug!(
                        recipient = %message.recipient,
                        uid = %message.uid,
                        error = %err,
                        "delivery transport failed"
                    );
                    message.schedule_status = Some(status::failure(&err));
                    return;
                }
            }
        }

        // No transport claimed the message
        message.schedule_status = Some(status::NO_TRANSPORT.to_string());
    }
}
