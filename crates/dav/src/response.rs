/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use std::fmt::{self, Display, Write};

/// CalDAV `schedule-response` envelope, one item per requested recipient in
/// request order.
#[derive(Debug, Default)]
pub struct ScheduleResponse {
    pub items: Vec<ScheduleResponseItem>,
}

#[derive(Debug)]
pub struct ScheduleResponseItem {
    pub recipient: Href,
    pub request_status: String,
    pub calendar_data: Option<String>,
}

#[derive(Debug)]
pub struct Href(pub String);

impl Display for ScheduleResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        write!(
            f,
            "<A:schedule-response xmlns:D=\"DAV:\" xmlns:A=\"urn:ietf:params:xml:ns:caldav\">"
        )?;
        for item in &self.items {
            item.fmt(f)?;
        }
        write!(f, "</A:schedule-response>")
    }
}

impl Display for ScheduleResponseItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<A:response>")?;
        write!(f, "<A:recipient>{}</A:recipient>", self.recipient)?;

        write!(f, "<A:request-status>")?;
        self.request_status.write_escaped_to(f)?;
        write!(f, "</A:request-status>")?;

        if let Some(calendar_data) = &self.calendar_data {
            write!(f, "<A:calendar-data>")?;
            calendar_data.write_cdata_escaped_to(f)?;
            write!(f, "</A:calendar-data>")?;
        }
        write!(f, "</A:response>")
    }
}

impl Display for Href {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<D:href>")?;
        self.0.write_escaped_to(f)?;
        write!(f, "</D:href>")
    }
}

pub(crate) trait XmlEscape: AsRef<str> {
    fn write_escaped_to(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ch in self.as_ref().chars() {
            match ch {
                '&' => f.write_str("&amp;")?,
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                '"' => f.write_str("&quot;")?,
                '\'' => f.write_str("&apos;")?,
                _ => f.write_char(ch)?,
            }
        }
        Ok(())
    }

    fn write_cdata_escaped_to(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<![CDATA[")?;
        let mut rest = self.as_ref();
        while let Some(pos) = rest.find("]]>") {
            f.write_str(&rest[..pos])?;
            f.write_str("]]]]><![CDATA[>")?;
            rest = &rest[pos + 3..];
        }
        f.write_str(rest)?;
        f.write_str("]]>")
    }
}

impl<T: AsRef<str>> XmlEscape for T {}
