/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use tracing::{debug, trace, warn};

use crate::{
    config::{SecurityMode, Settings},
    error::{Error, Result},
    net::{endpoint_url, HttpTransport, Security, Transport},
    records::{Calendar, CalendarEvent, Contact, Email, EmailDetail},
    types::{
        request::{
            BasePoint, BaseShape, BodyContents, FieldUri, FindFolder, FindItem, FolderId,
            FolderShape, GetFolder, GetItem, ItemShape, ResolveNames, Traversal, View,
        },
        response::{self, BaseFolder, Envelope, EwsFolder, EwsItem, ResponseMessage, NO_ERROR},
        ItemId, Operation,
    },
    xml::write_request,
};

const DEFAULT_EMAIL_FOLDER: &str = "inbox";
const DEFAULT_EMAIL_LIMIT: u32 = 10;
const DEFAULT_CALENDAR_FOLDER: &str = "calendar";

const EMAIL_PROPERTIES: &[FieldUri] = &[
    FieldUri("item:ItemId"),
    FieldUri("item:DateTimeCreated"),
    FieldUri("item:DateTimeSent"),
    FieldUri("item:HasAttachments"),
    FieldUri("item:Size"),
    FieldUri("message:From"),
    FieldUri("message:IsRead"),
    FieldUri("item:Importance"),
    FieldUri("item:Subject"),
    FieldUri("item:DateTimeReceived"),
];

const EMAIL_DETAIL_PROPERTIES: &[FieldUri] = &[
    FieldUri("item:DateTimeCreated"),
    FieldUri("item:DateTimeSent"),
    FieldUri("item:Size"),
    FieldUri("message:CcRecipients"),
    FieldUri("message:IsRead"),
];

const CALENDAR_ITEM_PROPERTIES: &[FieldUri] = &[
    FieldUri("item:Subject"),
    FieldUri("calendar:Start"),
    FieldUri("calendar:End"),
    FieldUri("calendar:Duration"),
    FieldUri("calendar:Location"),
    FieldUri("calendar:Organizer"),
    FieldUri("calendar:IsAllDayEvent"),
];

/// Pulls the expected operation response out of a response body.
macro_rules! expect_response {
    ($contents:expr, $variant:ident) => {
        match $contents {
            response::BodyContents::$variant(response) => response,
            _ => return Err(Error::UnexpectedResponse(stringify!($variant))),
        }
    };
}

struct Connection {
    transport: Box<dyn Transport>,
    security: Security,
}

/// A client bound to a single Exchange server and account.
///
/// Every operation fails with [`Error::NoClient`] until the client has been
/// initialized.
#[derive(Default)]
pub struct ExchangeClient {
    connection: Option<Connection>,
}

impl ExchangeClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects the client to `https://<settings.url>/EWS/Exchange.asmx`.
    pub fn initialize(&mut self, settings: Settings) -> Result<()> {
        let endpoint = endpoint_url(&settings.url).map_err(|source| Error::InvalidEndpoint {
            url: settings.url.clone(),
            source,
        })?;
        let timeout = settings.timeout_secs.map(Duration::from_secs);
        let transport = HttpTransport::new(endpoint, timeout)?;

        debug!(endpoint = %transport.endpoint(), "initializing client");
        self.initialize_with(settings, transport);

        Ok(())
    }

    /// Connects the client through a caller-provided transport. `settings.url`
    /// is not used.
    pub fn initialize_with<T: Transport + 'static>(&mut self, settings: Settings, transport: T) {
        self.connection = Some(Connection {
            transport: Box::new(transport),
            security: Security {
                username: settings.username,
                password: settings.password,
                mode: settings.security,
            },
        });
    }

    pub fn is_initialized(&self) -> bool {
        self.connection.is_some()
    }

    pub fn security_mode(&self) -> Option<SecurityMode> {
        self.connection
            .as_ref()
            .map(|connection| connection.security.mode)
    }

    /// Switches the credential scheme for later requests. Unknown modes are
    /// ignored.
    pub fn set_security(&mut self, mode: &str) -> Result<()> {
        if self.connection.is_none() {
            return Err(Error::NoClient);
        }

        match mode.parse() {
            Ok(mode) => self.set_security_mode(mode),
            Err(err) => {
                debug!("keeping current security mode: {err}");
                Ok(())
            }
        }
    }

    pub fn set_security_mode(&mut self, mode: SecurityMode) -> Result<()> {
        let connection = self.connection.as_mut().ok_or(Error::NoClient)?;

        debug!(from = %connection.security.mode, to = %mode, "switching security mode");
        connection.security.mode = mode;

        Ok(())
    }

    /// Lists the first `limit` messages (default 10) of a distinguished
    /// folder (default `inbox`).
    pub async fn get_emails(
        &self,
        folder_name: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Email>> {
        let body = BodyContents::FindItem(FindItem {
            traversal: Traversal::Shallow,
            item_shape: ItemShape {
                base_shape: BaseShape::IdOnly,
                include_mime_content: false,
                additional_properties: EMAIL_PROPERTIES.to_vec(),
            },
            view: Some(View::IndexedPageItemView {
                max_entries_returned: limit.unwrap_or(DEFAULT_EMAIL_LIMIT),
                offset: 0,
                base_point: BasePoint::Beginning,
            }),
            parent_folder_ids: vec![FolderId::distinguished(
                folder_name.unwrap_or(DEFAULT_EMAIL_FOLDER),
            )],
        });

        let response = expect_response!(self.call(body).await?, FindItemResponse);
        let message = response.response_messages.find_item_response_message;
        check_response(Operation::FindItem, &message)?;

        // TotalItemsInView counts the whole folder here, not the page. Items
        // other than messages are skipped.
        let items = message
            .root_folder
            .map(|root| root.items.items)
            .unwrap_or_default();

        Ok(items
            .into_iter()
            .filter_map(|item| match item {
                EwsItem::Message(message) => Some(Email::from_message(message, &Local)),
                _ => None,
            })
            .collect())
    }

    /// Fetches a single message by its `<id>|<change key>` identifier.
    pub async fn get_email(&self, id: &str) -> Result<EmailDetail> {
        let item_id =
            ItemId::from_composite(id).ok_or_else(|| Error::InvalidItemId(id.to_string()))?;

        let body = BodyContents::GetItem(GetItem {
            item_shape: ItemShape {
                base_shape: BaseShape::Default,
                include_mime_content: true,
                additional_properties: EMAIL_DETAIL_PROPERTIES.to_vec(),
            },
            item_ids: vec![item_id],
        });

        let response = expect_response!(self.call(body).await?, GetItemResponse);
        let message = response.response_messages.get_item_response_message;
        check_response(Operation::GetItem, &message)?;

        message
            .items
            .unwrap_or_default()
            .items
            .into_iter()
            .find_map(|item| match item {
                EwsItem::Message(message)
                | EwsItem::MeetingRequest(message)
                | EwsItem::MeetingResponse(message)
                | EwsItem::MeetingCancellation(message)
                | EwsItem::MeetingMessage(message) => Some(EmailDetail::from(message)),
                _ => None,
            })
            .ok_or(Error::UnexpectedResponse("Message"))
    }

    /// Matches `name` against the directory and the user's contacts.
    pub async fn resolve_names(&self, name: &str) -> Result<Vec<Contact>> {
        if name.trim().is_empty() {
            return Err(Error::NoName);
        }

        let body = BodyContents::ResolveNames(ResolveNames {
            return_full_contact_data: false,
            unresolved_entry: name.to_string(),
        });

        let response = expect_response!(self.call(body).await?, ResolveNamesResponse);
        let message = response.response_messages.resolve_names_response_message;
        check_response(Operation::ResolveNames, &message)?;

        let Some(set) = message.resolution_set else {
            return Ok(Vec::new());
        };
        check_count(
            Operation::ResolveNames,
            set.total_items_in_view,
            set.resolutions.len(),
        );

        Ok(set.resolutions.into_iter().map(Contact::from).collect())
    }

    /// Verifies the credentials by resolving `name`.
    pub async fn check_login(&self, name: &str) -> Result<Vec<Contact>> {
        self.resolve_names(name).await
    }

    /// The root calendar followed by the calendars below it.
    pub async fn get_calendars(&self) -> Result<Vec<Calendar>> {
        self.connection()?;

        let (mut calendars, user_calendars) =
            futures::try_join!(self.get_root_calendar(), self.get_user_calendars(None))?;
        calendars.extend(user_calendars);

        Ok(calendars)
    }

    /// Lists the calendar folders directly below a distinguished folder
    /// (default `calendar`).
    pub async fn get_user_calendars(&self, folder: Option<&str>) -> Result<Vec<Calendar>> {
        let body = BodyContents::FindFolder(FindFolder {
            traversal: Traversal::Shallow,
            folder_shape: FolderShape {
                base_shape: BaseShape::Default,
            },
            parent_folder_ids: vec![FolderId::distinguished(
                folder.unwrap_or(DEFAULT_CALENDAR_FOLDER),
            )],
        });

        let response = expect_response!(self.call(body).await?, FindFolderResponse);
        let message = response.response_messages.find_folder_response_message;
        check_response(Operation::FindFolder, &message)?;

        let Some(root) = message.root_folder else {
            return Ok(Vec::new());
        };

        Ok(root
            .folders
            .folders
            .into_iter()
            .filter_map(|folder| match folder {
                EwsFolder::CalendarFolder(folder) => Some(Calendar::from(folder)),
                _ => None,
            })
            .collect())
    }

    pub async fn get_root_calendar(&self) -> Result<Vec<Calendar>> {
        let body = BodyContents::GetFolder(GetFolder {
            folder_shape: FolderShape {
                base_shape: BaseShape::Default,
            },
            folder_ids: vec![FolderId::distinguished(DEFAULT_CALENDAR_FOLDER)],
        });

        let response = expect_response!(self.call(body).await?, GetFolderResponse);
        let message = response.response_messages.get_folder_response_message;
        check_response(Operation::GetFolder, &message)?;

        Ok(message
            .folders
            .unwrap_or_default()
            .folders
            .into_iter()
            .map(|folder| Calendar::from(base_folder(folder)))
            .collect())
    }

    /// Lists the events of `calendar` (the default calendar when `None`)
    /// overlapping `start..end`, with recurrences expanded.
    pub async fn get_calendar_items(
        &self,
        calendar: Option<&Calendar>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>> {
        if start > end {
            return Err(Error::InvalidRange);
        }

        let parent = match calendar {
            Some(calendar) => FolderId::from(&calendar.meta.folder_id),
            None => FolderId::distinguished(DEFAULT_CALENDAR_FOLDER),
        };

        let body = BodyContents::FindItem(FindItem {
            traversal: Traversal::Shallow,
            item_shape: ItemShape {
                base_shape: BaseShape::IdOnly,
                include_mime_content: false,
                additional_properties: CALENDAR_ITEM_PROPERTIES.to_vec(),
            },
            view: Some(View::CalendarView {
                start_date: start,
                end_date: end,
            }),
            parent_folder_ids: vec![parent],
        });

        let response = expect_response!(self.call(body).await?, FindItemResponse);
        let message = response.response_messages.find_item_response_message;
        check_response(Operation::FindItem, &message)?;

        let Some(root) = message.root_folder else {
            return Ok(Vec::new());
        };
        check_count(
            Operation::FindItem,
            root.total_items_in_view,
            root.items.items.len(),
        );

        Ok(root
            .items
            .items
            .into_iter()
            .filter_map(|item| match item {
                EwsItem::CalendarItem(item) => Some(CalendarEvent::from(item)),
                _ => None,
            })
            .collect())
    }

    fn connection(&self) -> Result<&Connection> {
        self.connection.as_ref().ok_or(Error::NoClient)
    }

    /// Sends a single request and parses the SOAP body of the response.
    async fn call(&self, body: BodyContents) -> Result<response::BodyContents> {
        let connection = self.connection()?;
        let operation = body.operation();
        let token = connection.security.username_token();

        let mut envelope = Vec::new();
        write_request(&mut envelope, &body, token.as_ref())?;

        if token.is_none() {
            trace!(
                operation = operation.name(),
                "request body: {}",
                String::from_utf8_lossy(&envelope)
            );
        }

        debug!(
            operation = operation.name(),
            security = %connection.security.mode,
            "calling operation"
        );
        let response = connection
            .transport
            .send(operation, &connection.security, envelope)
            .await?;

        let envelope: Envelope = serde_xml_rs::from_str(&response)?;

        Ok(envelope.body.contents)
    }
}

fn check_response<M: ResponseMessage>(operation: Operation, message: &M) -> Result<()> {
    let code = message.response_code();
    if code == NO_ERROR {
        return Ok(());
    }

    warn!(
        operation = operation.name(),
        "server returned {code}: {}",
        message.message_text().unwrap_or_default()
    );

    Err(Error::Response(code.to_string()))
}

fn check_count(operation: Operation, total_items_in_view: Option<usize>, actual: usize) {
    if let Some(total) = total_items_in_view {
        if total != actual {
            warn!(
                operation = operation.name(),
                "TotalItemsInView is {total} but the response holds {actual} items"
            );
        }
    }
}

fn base_folder(folder: EwsFolder) -> BaseFolder {
    match folder {
        EwsFolder::Folder(folder)
        | EwsFolder::CalendarFolder(folder)
        | EwsFolder::ContactsFolder(folder)
        | EwsFolder::SearchFolder(folder)
        | EwsFolder::TasksFolder(folder) => folder,
    }
}
