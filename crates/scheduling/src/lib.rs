/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use ahash::AHashSet;
use calcard::icalendar::{ICalendar, ICalendarMethod};
use std::{fmt::Display, sync::Arc};

pub mod change;
pub mod dispatch;
pub mod freebusy;
pub mod inbound;

pub use dispatch::DeliveryHandler;

/// One outbound scheduling communication tied to a calendar entry change.
///
/// Produced by the iTIP broker, dispatched to exactly one recipient, and
/// discarded afterwards; a serialized copy is filed into the recipient's
/// inbox collection during local delivery.
#[derive(Debug, Clone)]
pub struct SchedulingMessage {
    pub sender: String,
    pub recipient: String,
    pub method: ICalendarMethod,
    pub uid: String,
    pub message: ICalendar,
    pub schedule_status: Option<String>,
}

/// A directory identity with its scheduling collections.
#[derive(Debug, Clone, Default)]
pub struct Principal {
    pub email: String,
    pub home_set: Option<String>,
    pub inbox: Option<String>,
    pub outbox: Option<String>,
    pub default_calendar: Option<String>,
}

/// Per-requested-attendee outcome of a free/busy query.
#[derive(Debug)]
pub struct FreeBusyResult {
    pub recipient: String,
    pub request_status: String,
    pub calendar_data: Option<ICalendar>,
}

/// Half-open UTC window in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Privilege {
    ScheduleDeliverInvite,
    ReadFreeBusy,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    pub max_itip_size: usize,
    pub filed_message_prefix: String,
}

#[derive(Debug)]
pub enum StoreError {
    NotFound,
    Backend(String),
}

#[derive(Debug)]
pub enum DeliveryError {
    Store(StoreError),
    Transport(String),
}

/// The message-diff engine: computes outbound message sets from entry
/// changes and merges inbound messages into stored entries. The actual
/// diffing semantics live behind this interface.
pub trait ItipBroker: Sync + Send {
    fn schedule_changes(
        &self,
        new: Option<&ICalendar>,
        old: Option<&ICalendar>,
        acting: &AHashSet<String>,
    ) -> Vec<SchedulingMessage>;

    fn apply_message(
        &self,
        existing: Option<&ICalendar>,
        message: &SchedulingMessage,
    ) -> Option<ICalendar>;
}

pub trait Directory: Sync + Send {
    fn principal_by_address(&self, email: &str) -> Option<Principal>;
}

pub trait CalendarStore: Sync + Send {
    fn calendars_in(&self, home_set: &str) -> Result<Vec<String>, StoreError>;
    fn entry_by_uid(&self, home_set: &str, uid: &str) -> Result<Option<StoredEntry>, StoreError>;
    fn create_entry(&self, collection: &str, name: &str, content: &str)
    -> Result<(), StoreError>;
    fn update_entry(&self, path: &str, content: &str) -> Result<(), StoreError>;
    fn query_time_range(
        &self,
        calendar: &str,
        window: &TimeWindow,
    ) -> Result<Vec<StoredEntry>, StoreError>;
}

pub trait PrivilegeChecker: Sync + Send {
    fn is_granted(&self, path: &str, privilege: Privilege) -> bool;
}

/// Builds one consolidated availability document from a set of calendar
/// objects inside a window. Interval merging is this collaborator's
/// concern, not the scheduler's.
pub trait FreeBusyGenerator: Sync + Send {
    fn generate(&self, objects: Vec<ICalendar>, window: &TimeWindow) -> ICalendar;
}

/// Scheduling core with explicitly injected collaborators. Delivery
/// transports are tried in registration order.
pub struct Scheduler {
    pub broker: Arc<dyn ItipBroker>,
    pub directory: Arc<dyn Directory>,
    pub store: Arc<dyn CalendarStore>,
    pub privileges: Arc<dyn PrivilegeChecker>,
    pub availability: Arc<dyn FreeBusyGenerator>,
    pub handlers: Vec<Arc<dyn DeliveryHandler>>,
    pub config: SchedulingConfig,
}

/// Status vocabulary recorded on messages and free/busy results. The
/// numeric prefix is the observable contract; the description is
/// informational.
pub mod status {
    use std::fmt::Display;

    pub const DELIVERED_LOCALLY: &str = "1.2;Message delivered locally";
    pub const SUCCESS: &str = "2.0;Success";
    pub const NO_HOME_SET: &str = "3.7;No calendar-home-set property found";
    pub const PRIVILEGE_DENIED: &str =
        "3.8;Organizer did not have the schedule-deliver privilege on the attendee's inbox";
    pub const NOT_PROCESSED: &str = "5.0;Message could not be processed";
    pub const NO_TRANSPORT: &str = "5.2;There was no system capable of delivering this message";

    pub fn no_principal(email: &str) -> String {
        format!("3.7;Could not find principal with email {email}")
    }

    pub fn no_principal_address(email: &str) -> String {
        format!("3.7;No principal found for address {email}")
    }

    pub fn missing_property(property: &str) -> String {
        format!("5.2;Principal is missing the {property} property")
    }

    pub fn failure(err: impl Display) -> String {
        format!("5.2;{err}")
    }
}

impl SchedulingMessage {
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        method: ICalendarMethod,
        uid: impl Into<String>,
        message: ICalendar,
    ) -> Self {
        SchedulingMessage {
            sender: sender.into(),
            recipient: recipient.into(),
            method,
            uid: uid.into(),
            message,
            schedule_status: None,
        }
    }

    /// Numeric prefix of the recorded status, if any.
    pub fn status_code(&self) -> Option<&str> {
        self.schedule_status
            .as_deref()
            .and_then(|status| status.split(';').next())
    }
}

impl Scheduler {
    pub fn new(
        broker: Arc<dyn ItipBroker>,
        directory: Arc<dyn Directory>,
        store: Arc<dyn CalendarStore>,
        privileges: Arc<dyn PrivilegeChecker>,
        availability: Arc<dyn FreeBusyGenerator>,
    ) -> Self {
        Scheduler {
            broker,
            directory,
            store,
            privileges,
            availability,
            handlers: Vec::new(),
            config: SchedulingConfig::default(),
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn DeliveryHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn with_config(mut self, config: SchedulingConfig) -> Self {
        self.config = config;
        self
    }
}

/// Normalizes a calendar user address to a bare lowercase email.
pub fn sanitize_address(value: &str) -> Option<String> {
    let value = value.trim();
    let value = value
        .get(..7)
        .filter(|prefix| prefix.eq_ignore_ascii_case("mailto:"))
        .map_or(value, |_| &value[7..]);
    value.contains('@').then(|| value.to_lowercase())
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        SchedulingConfig {
            max_itip_size: 512 * 1024,
            filed_message_prefix: "itip".to_string(),
        }
    }
}

impl From<StoreError> for DeliveryError {
    fn from(err: StoreError) -> Self {
        DeliveryError::Store(err)
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "Resource not found"),
            StoreError::Backend(err) => write!(f, "Storage failure: {err}"),
        }
    }
}

impl Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryError::Store(err) => err.fmt(f),
            DeliveryError::Transport(err) => write!(f, "Delivery failure: {err}"),
        }
    }
}

impl std::error::Error for StoreError {}
impl std::error::Error for DeliveryError {}
