/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Response shapes. Element and attribute names are matched by local name,
//! so the `s:`/`m:`/`t:` prefixes used by the server do not matter.

use serde::Deserialize;

use super::ItemId;

/// The response code EWS uses to signal success.
pub const NO_ERROR: &str = "NoError";

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Envelope {
    pub body: SoapBody,
}

#[derive(Deserialize)]
pub struct SoapBody {
    #[serde(rename = "$value")]
    pub contents: BodyContents,
}

#[derive(Deserialize)]
pub enum BodyContents {
    FindFolderResponse(FindFolderResponse),
    FindItemResponse(FindItemResponse),
    GetFolderResponse(GetFolderResponse),
    GetItemResponse(GetItemResponse),
    ResolveNamesResponse(ResolveNamesResponse),
}

/// Common accessors for the per-operation response message.
pub trait ResponseMessage {
    fn response_code(&self) -> &str;

    fn message_text(&self) -> Option<&str>;
}

macro_rules! response_message {
    ($name:ident { $($field:ident: $ty:ty),* $(,)? }) => {
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        pub struct $name {
            pub response_code: String,

            #[serde(default)]
            pub message_text: Option<String>,

            $(
                #[serde(default)]
                pub $field: $ty,
            )*
        }

        impl ResponseMessage for $name {
            fn response_code(&self) -> &str {
                &self.response_code
            }

            fn message_text(&self) -> Option<&str> {
                self.message_text.as_deref()
            }
        }
    };
}

response_message!(FindItemResponseMessage {
    root_folder: Option<ItemRootFolder>
});
response_message!(GetItemResponseMessage {
    items: Option<Items>
});
response_message!(FindFolderResponseMessage {
    root_folder: Option<FolderRootFolder>
});
response_message!(GetFolderResponseMessage {
    folders: Option<Folders>
});
response_message!(ResolveNamesResponseMessage {
    resolution_set: Option<ResolutionSet>
});

/// The response to a `FindItem` request.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/finditemresponse>.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FindItemResponse {
    pub response_messages: FindItemResponseMessages,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FindItemResponseMessages {
    pub find_item_response_message: FindItemResponseMessage,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemResponse {
    pub response_messages: GetItemResponseMessages,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemResponseMessages {
    pub get_item_response_message: GetItemResponseMessage,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FindFolderResponse {
    pub response_messages: FindFolderResponseMessages,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FindFolderResponseMessages {
    pub find_folder_response_message: FindFolderResponseMessage,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetFolderResponse {
    pub response_messages: GetFolderResponseMessages,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetFolderResponseMessages {
    pub get_folder_response_message: GetFolderResponseMessage,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResolveNamesResponse {
    pub response_messages: ResolveNamesResponseMessages,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResolveNamesResponseMessages {
    pub resolve_names_response_message: ResolveNamesResponseMessage,
}

/// The `m:RootFolder` of a `FindItem` response.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemRootFolder {
    #[serde(default)]
    pub total_items_in_view: Option<usize>,

    #[serde(default)]
    pub includes_last_item_in_range: Option<bool>,

    #[serde(default)]
    pub items: Items,
}

#[derive(Default, Deserialize)]
pub struct Items {
    #[serde(rename = "$value", default)]
    pub items: Vec<EwsItem>,
}

/// Every item kind EWS can return in an `Items` list. Only messages and
/// calendar items are projected; the other kinds are read as [`OtherItem`]
/// so that a folder holding them still parses.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/items>.
#[derive(Deserialize)]
pub enum EwsItem {
    Message(Message),
    CalendarItem(CalendarItem),
    MeetingRequest(Message),
    MeetingResponse(Message),
    MeetingCancellation(Message),
    MeetingMessage(Message),
    Item(OtherItem),
    PostItem(OtherItem),
    Task(OtherItem),
    Contact(OtherItem),
    DistributionList(OtherItem),
}

/// An item of a kind this crate does not project.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OtherItem {
    #[serde(default)]
    pub item_id: Option<ItemId>,

    #[serde(default)]
    pub subject: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Mailbox {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub email_address: Option<String>,

    #[serde(default)]
    pub routing_type: Option<String>,
}

/// A single mailbox wrapper such as `t:From` or `t:Organizer`.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SingleRecipient {
    pub mailbox: Mailbox,
}

/// A list of mailboxes such as `t:ToRecipients`.
#[derive(Default, Deserialize)]
pub struct ArrayOfRecipients {
    #[serde(rename = "Mailbox", default)]
    pub mailboxes: Vec<Mailbox>,
}

/// The base64 MIME rendering of an item, present when the request asked
/// for `IncludeMimeContent`.
#[derive(Deserialize)]
pub struct MimeContent {
    #[serde(rename = "CharacterSet", default)]
    pub character_set: Option<String>,

    #[serde(rename = "$value", default)]
    pub content: String,
}

#[derive(Deserialize)]
pub struct ItemBody {
    #[serde(rename = "BodyType", default)]
    pub body_type: String,

    #[serde(rename = "$value", default)]
    pub content: String,
}

/// An email message.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/message-ex15websvcsotherref>.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Message {
    pub item_id: ItemId,

    #[serde(default)]
    pub mime_content: Option<MimeContent>,

    #[serde(default)]
    pub subject: Option<String>,

    #[serde(default)]
    pub body: Option<ItemBody>,

    #[serde(default)]
    pub date_time_received: Option<String>,

    #[serde(default)]
    pub date_time_sent: Option<String>,

    #[serde(default)]
    pub date_time_created: Option<String>,

    #[serde(default)]
    pub size: Option<String>,

    #[serde(default)]
    pub importance: Option<String>,

    #[serde(default)]
    pub has_attachments: Option<String>,

    #[serde(default)]
    pub to_recipients: Option<ArrayOfRecipients>,

    #[serde(default)]
    pub cc_recipients: Option<ArrayOfRecipients>,

    #[serde(default)]
    pub from: Option<SingleRecipient>,

    #[serde(default)]
    pub is_read: Option<String>,
}

/// An appointment or meeting in a calendar folder.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/calendaritem>.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CalendarItem {
    pub item_id: ItemId,

    #[serde(default)]
    pub subject: Option<String>,

    #[serde(default)]
    pub start: Option<String>,

    #[serde(default)]
    pub end: Option<String>,

    #[serde(default)]
    pub is_all_day_event: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub organizer: Option<SingleRecipient>,

    #[serde(default)]
    pub duration: Option<String>,
}

/// The `m:RootFolder` of a `FindFolder` response.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FolderRootFolder {
    #[serde(default)]
    pub total_items_in_view: Option<usize>,

    #[serde(default)]
    pub folders: Folders,
}

#[derive(Default, Deserialize)]
pub struct Folders {
    #[serde(rename = "$value", default)]
    pub folders: Vec<EwsFolder>,
}

/// Every folder kind EWS can return in a `Folders` list.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/folders-ex15websvcsotherref>.
#[derive(Deserialize)]
pub enum EwsFolder {
    Folder(BaseFolder),
    CalendarFolder(BaseFolder),
    ContactsFolder(BaseFolder),
    SearchFolder(BaseFolder),
    TasksFolder(BaseFolder),
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BaseFolder {
    pub folder_id: ItemId,

    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResolutionSet {
    #[serde(default)]
    pub total_items_in_view: Option<usize>,

    #[serde(rename = "Resolution", default)]
    pub resolutions: Vec<Resolution>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resolution {
    pub mailbox: Mailbox,
}
