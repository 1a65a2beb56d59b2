/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use std::fmt::Display;

pub mod hooks;
pub mod outbox;
pub mod response;

pub type Result<T> = std::result::Result<T, DavError>;

/// Request-boundary failures. These abort the whole request before any
/// delivery or aggregation logic runs; per-recipient outcomes never take
/// this form.
#[derive(Debug, PartialEq, Eq)]
pub enum DavError {
    Forbidden(String),
    BadRequest(String),
    NotImplemented(String),
    PayloadTooLarge(usize),
}

impl Display for DavError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DavError::Forbidden(details) => write!(f, "Forbidden: {details}"),
            DavError::BadRequest(details) => write!(f, "Bad request: {details}"),
            DavError::NotImplemented(details) => write!(f, "Not implemented: {details}"),
            DavError::PayloadTooLarge(max) => {
                write!(f, "Payload exceeds the maximum size of {max} bytes")
            }
        }
    }
}

impl std::error::Error for DavError {}
