/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Flat records handed back to callers, and the projections that build them
//! from response types.
//!
//! Every record id is `<Id>|<ChangeKey>`; the raw pair is kept under `meta`.

use std::fmt::Display;

use chrono::{DateTime, TimeZone};
use md5::{Digest, Md5};
use serde::Serialize;
use tracing::warn;

use crate::types::{
    response::{BaseFolder, CalendarItem, Mailbox, Message, Resolution, SingleRecipient},
    ItemId,
};

/// Format of [`Email::date_time_received`], e.g. `03/05/2024, 2:03:09 PM`.
pub const RECEIVED_FORMAT: &str = "%m/%d/%Y, %-I:%M:%S %p";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemMeta {
    pub item_id: ItemId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderMeta {
    pub folder_id: ItemId,
}

/// A message summary as listed by `FindItem`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    pub id: String,
    pub hash: String,
    pub subject: Option<String>,
    pub date_time_received: Option<String>,
    pub size: Option<u64>,
    pub importance: Option<String>,
    pub has_attachments: bool,
    pub from: Option<String>,
    pub is_read: bool,
    pub meta: ItemMeta,
}

impl Email {
    /// Projects a listed message, rendering the receipt time in `tz`.
    pub fn from_message<Tz>(message: Message, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let hash = content_hash(
            message.subject.as_deref(),
            message.date_time_sent.as_deref(),
        );
        let date_time_received = message
            .date_time_received
            .as_deref()
            .map(|received| format_timestamp(received, tz));

        Self {
            id: message.item_id.composite(),
            hash,
            subject: message.subject,
            date_time_received,
            size: parse_size(message.size.as_deref()),
            importance: message.importance,
            has_attachments: parse_flag(message.has_attachments.as_deref()),
            from: sender_name(message.from),
            is_read: parse_flag(message.is_read.as_deref()),
            meta: ItemMeta {
                item_id: message.item_id,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub name: Option<String>,
    pub email_address: Option<String>,
}

impl From<Mailbox> for Recipient {
    fn from(mailbox: Mailbox) -> Self {
        Self {
            name: mailbox.name,
            email_address: mailbox.email_address,
        }
    }
}

/// A full message as returned by `GetItem`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailDetail {
    pub id: String,
    pub subject: Option<String>,
    pub body_type: Option<String>,
    pub body: Option<String>,
    pub size: Option<u64>,
    pub date_time_sent: Option<String>,
    pub date_time_created: Option<String>,
    pub to_recipients: Vec<Recipient>,
    pub cc_recipients: Vec<Recipient>,
    pub from: Vec<Recipient>,
    pub is_read: bool,

    /// The base64 MIME rendering of the message, when the server sent one.
    pub mime_content: Option<String>,

    pub meta: ItemMeta,
}

impl From<Message> for EmailDetail {
    fn from(message: Message) -> Self {
        let recipients = |list: Option<crate::types::response::ArrayOfRecipients>| -> Vec<Recipient> {
            list.map(|list| list.mailboxes.into_iter().map(Recipient::from).collect())
                .unwrap_or_default()
        };
        let (body_type, body) = match message.body {
            Some(body) => (Some(body.body_type), Some(body.content)),
            None => (None, None),
        };

        Self {
            id: message.item_id.composite(),
            subject: message.subject,
            body_type,
            body,
            size: parse_size(message.size.as_deref()),
            date_time_sent: message.date_time_sent,
            date_time_created: message.date_time_created,
            to_recipients: recipients(message.to_recipients),
            cc_recipients: recipients(message.cc_recipients),
            from: message
                .from
                .map(|from| vec![Recipient::from(from.mailbox)])
                .unwrap_or_default(),
            is_read: parse_flag(message.is_read.as_deref()),
            mime_content: message.mime_content.map(|mime| mime.content),
            meta: ItemMeta {
                item_id: message.item_id,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Contact {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl From<Resolution> for Contact {
    fn from(resolution: Resolution) -> Self {
        Self {
            name: resolution.mailbox.name,
            email: resolution.mailbox.email_address,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Calendar {
    pub id: String,
    pub name: Option<String>,
    pub meta: FolderMeta,
}

impl From<BaseFolder> for Calendar {
    fn from(folder: BaseFolder) -> Self {
        Self {
            id: folder.folder_id.composite(),
            name: folder.display_name,
            meta: FolderMeta {
                folder_id: folder.folder_id,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub hash: String,
    pub subject: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub location: Option<String>,
    pub organizer: Option<String>,
    pub duration: Option<String>,
    pub all_day: bool,
    pub meta: ItemMeta,
}

impl From<CalendarItem> for CalendarEvent {
    fn from(item: CalendarItem) -> Self {
        Self {
            id: item.item_id.composite(),
            hash: content_hash(item.subject.as_deref(), item.start.as_deref()),
            subject: item.subject,
            start: item.start,
            end: item.end,
            location: item.location,
            organizer: sender_name(item.organizer),
            duration: item.duration,
            all_day: parse_flag(item.is_all_day_event.as_deref()),
            meta: ItemMeta {
                item_id: item.item_id,
            },
        }
    }
}

/// Hex MD5 over `subject` followed by `timestamp`. Used to spot content
/// changes between listings, not for integrity.
pub fn content_hash(subject: Option<&str>, timestamp: Option<&str>) -> String {
    let mut hasher = Md5::new();
    hasher.update(subject.unwrap_or_default());
    hasher.update(timestamp.unwrap_or_default());

    format!("{:x}", hasher.finalize())
}

/// Renders an RFC 3339 timestamp in `tz` using [`RECEIVED_FORMAT`].
///
/// Values the server sent in another shape are returned unchanged.
pub fn format_timestamp<Tz>(value: &str, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match DateTime::parse_from_rfc3339(value) {
        Ok(timestamp) => timestamp
            .with_timezone(tz)
            .format(RECEIVED_FORMAT)
            .to_string(),
        Err(err) => {
            warn!("unable to parse timestamp `{value}`: {err}");
            value.to_string()
        }
    }
}

fn parse_flag(value: Option<&str>) -> bool {
    value == Some("true")
}

fn parse_size(value: Option<&str>) -> Option<u64> {
    value.and_then(|size| size.trim().parse().ok())
}

fn sender_name(recipient: Option<SingleRecipient>) -> Option<String> {
    recipient.and_then(|recipient| recipient.mailbox.name)
}
