/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use chrono::{DateTime, SecondsFormat, Utc};
use xml::writer::XmlEvent;

use super::{ItemId, Operation};

pub trait EwsWrite<W> {
    /// Writes the struct as XML using the provided writer.
    fn write(&self, writer: &mut xml::EventWriter<W>) -> Result<(), xml::writer::Error>;
}

/// An identifier for a remote folder.
#[derive(Clone, Debug)]
pub enum FolderId {
    /// An identifier for an arbitrary folder.
    ///
    /// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/folderid>.
    FolderId {
        id: String,
        change_key: Option<String>,
    },

    /// An identifier for referencing a folder by name, e.g. "inbox" or
    /// "junkemail".
    ///
    /// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/distinguishedfolderid>.
    DistinguishedFolderId {
        id: String,
        change_key: Option<String>,
    },
}

impl FolderId {
    pub fn distinguished(id: impl Into<String>) -> Self {
        FolderId::DistinguishedFolderId {
            id: id.into(),
            change_key: None,
        }
    }
}

impl From<&ItemId> for FolderId {
    fn from(value: &ItemId) -> Self {
        let change_key = Some(value.change_key.clone()).filter(|key| !key.is_empty());

        FolderId::FolderId {
            id: value.id.clone(),
            change_key,
        }
    }
}

impl<W: std::io::Write> EwsWrite<W> for FolderId {
    fn write(&self, writer: &mut xml::EventWriter<W>) -> Result<(), xml::writer::Error> {
        let (name, id, change_key) = match self {
            FolderId::FolderId { id, change_key } => ("t:FolderId", id, change_key),
            FolderId::DistinguishedFolderId { id, change_key } => {
                ("t:DistinguishedFolderId", id, change_key)
            }
        };

        let mut builder = XmlEvent::start_element(name).attr("Id", id);
        if let Some(change_key) = change_key {
            builder = builder.attr("ChangeKey", change_key);
        }

        writer.write(builder)?;
        writer.write(XmlEvent::end_element())
    }
}

impl<W: std::io::Write> EwsWrite<W> for ItemId {
    fn write(&self, writer: &mut xml::EventWriter<W>) -> Result<(), xml::writer::Error> {
        writer.write(
            XmlEvent::start_element("t:ItemId")
                .attr("Id", &self.id)
                .attr("ChangeKey", &self.change_key),
        )?;
        writer.write(XmlEvent::end_element())
    }
}

/// The base set of properties to be returned in response to our request, which
/// can be modified by the parent.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/baseshape>.
#[derive(Clone, Copy, Debug)]
pub enum BaseShape {
    IdOnly,
    Default,
    AllProperties,
}

impl<W: std::io::Write> EwsWrite<W> for BaseShape {
    fn write(&self, writer: &mut xml::EventWriter<W>) -> Result<(), xml::writer::Error> {
        writer.write(XmlEvent::start_element("t:BaseShape"))?;

        let value = match self {
            BaseShape::IdOnly => "IdOnly",
            BaseShape::Default => "Default",
            BaseShape::AllProperties => "AllProperties",
        };

        writer.write(XmlEvent::characters(value))?;
        writer.write(XmlEvent::end_element())
    }
}

/// A property path such as `item:Subject`, requested on top of the base
/// shape.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/fielduri>.
#[derive(Clone, Copy, Debug)]
pub struct FieldUri(pub &'static str);

impl<W: std::io::Write> EwsWrite<W> for FieldUri {
    fn write(&self, writer: &mut xml::EventWriter<W>) -> Result<(), xml::writer::Error> {
        writer.write(XmlEvent::start_element("t:FieldURI").attr("FieldURI", self.0))?;
        writer.write(XmlEvent::end_element())
    }
}

fn write_additional_properties<W: std::io::Write>(
    writer: &mut xml::EventWriter<W>,
    properties: &[FieldUri],
) -> Result<(), xml::writer::Error> {
    if properties.is_empty() {
        return Ok(());
    }

    writer.write(XmlEvent::start_element("t:AdditionalProperties"))?;
    for property in properties {
        property.write(writer)?;
    }
    writer.write(XmlEvent::end_element())
}

/// The folder properties to include in the response.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/foldershape>.
#[derive(Clone, Debug)]
pub struct FolderShape {
    pub base_shape: BaseShape,
}

impl<W: std::io::Write> EwsWrite<W> for FolderShape {
    fn write(&self, writer: &mut xml::EventWriter<W>) -> Result<(), xml::writer::Error> {
        writer.write(XmlEvent::start_element("m:FolderShape"))?;

        self.base_shape.write(writer)?;

        writer.write(XmlEvent::end_element())
    }
}

/// The item properties to include in the response.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/itemshape>.
#[derive(Clone, Debug)]
pub struct ItemShape {
    pub base_shape: BaseShape,

    /// Whether to return the item's MIME rendering as base64.
    pub include_mime_content: bool,

    pub additional_properties: Vec<FieldUri>,
}

impl<W: std::io::Write> EwsWrite<W> for ItemShape {
    fn write(&self, writer: &mut xml::EventWriter<W>) -> Result<(), xml::writer::Error> {
        writer.write(XmlEvent::start_element("m:ItemShape"))?;

        self.base_shape.write(writer)?;
        if self.include_mime_content {
            writer.write(XmlEvent::start_element("t:IncludeMimeContent"))?;
            writer.write(XmlEvent::characters("true"))?;
            writer.write(XmlEvent::end_element())?;
        }
        write_additional_properties(writer, &self.additional_properties)?;

        writer.write(XmlEvent::end_element())
    }
}

#[derive(Clone, Copy, Debug)]
pub enum Traversal {
    Shallow,
    SoftDeleted,
    Associated,
}

impl From<Traversal> for &str {
    fn from(value: Traversal) -> Self {
        match value {
            Traversal::Shallow => "Shallow",
            Traversal::SoftDeleted => "SoftDeleted",
            Traversal::Associated => "Associated",
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum BasePoint {
    Beginning,
    End,
}

/// How much of a folder's content a `FindItem` should return.
#[derive(Clone, Debug)]
pub enum View {
    /// A page of items at a fixed offset.
    ///
    /// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/indexedpageitemview>.
    IndexedPageItemView {
        max_entries_returned: u32,
        offset: u32,
        base_point: BasePoint,
    },

    /// Calendar items (with recurrences expanded) overlapping a time range.
    ///
    /// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/calendarview>.
    CalendarView {
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    },
}

impl<W: std::io::Write> EwsWrite<W> for View {
    fn write(&self, writer: &mut xml::EventWriter<W>) -> Result<(), xml::writer::Error> {
        match self {
            View::IndexedPageItemView {
                max_entries_returned,
                offset,
                base_point,
            } => {
                let max_entries_returned = max_entries_returned.to_string();
                let offset = offset.to_string();
                let base_point = match base_point {
                    BasePoint::Beginning => "Beginning",
                    BasePoint::End => "End",
                };

                writer.write(
                    XmlEvent::start_element("m:IndexedPageItemView")
                        .attr("BasePoint", base_point)
                        .attr("Offset", &offset)
                        .attr("MaxEntriesReturned", &max_entries_returned),
                )?;
            }
            View::CalendarView {
                start_date,
                end_date,
            } => {
                let start_date = start_date.to_rfc3339_opts(SecondsFormat::Secs, true);
                let end_date = end_date.to_rfc3339_opts(SecondsFormat::Secs, true);

                writer.write(
                    XmlEvent::start_element("m:CalendarView")
                        .attr("StartDate", &start_date)
                        .attr("EndDate", &end_date),
                )?;
            }
        }

        writer.write(XmlEvent::end_element())
    }
}

fn write_folder_ids<W: std::io::Write>(
    writer: &mut xml::EventWriter<W>,
    element: &str,
    ids: &[FolderId],
) -> Result<(), xml::writer::Error> {
    writer.write(XmlEvent::start_element(element))?;
    for id in ids {
        id.write(writer)?;
    }
    writer.write(XmlEvent::end_element())
}

/// A request to list the items of one or more folders, either a page at a
/// time or as a calendar window. Restrictions and sort orders are not
/// supported.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/finditem>.
#[derive(Clone, Debug)]
pub struct FindItem {
    /// The manner in which to traverse nested folders.
    pub traversal: Traversal,

    /// The desired properties to include in the response.
    pub item_shape: ItemShape,

    /// Paging or calendar window applied to the results.
    pub view: Option<View>,

    /// Identifiers for the folders in which to locate items.
    pub parent_folder_ids: Vec<FolderId>,
}

impl<W: std::io::Write> EwsWrite<W> for FindItem {
    fn write(&self, writer: &mut xml::EventWriter<W>) -> Result<(), xml::writer::Error> {
        writer.write(XmlEvent::start_element("m:FindItem").attr("Traversal", self.traversal.into()))?;

        self.item_shape.write(writer)?;
        if let Some(view) = &self.view {
            view.write(writer)?;
        }
        write_folder_ids(writer, "m:ParentFolderIds", &self.parent_folder_ids)?;

        writer.write(XmlEvent::end_element())
    }
}

/// A request to list the subfolders of the given folders.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/findfolder>.
#[derive(Clone, Debug)]
pub struct FindFolder {
    pub traversal: Traversal,
    pub folder_shape: FolderShape,
    pub parent_folder_ids: Vec<FolderId>,
}

impl<W: std::io::Write> EwsWrite<W> for FindFolder {
    fn write(&self, writer: &mut xml::EventWriter<W>) -> Result<(), xml::writer::Error> {
        writer.write(
            XmlEvent::start_element("m:FindFolder").attr("Traversal", self.traversal.into()),
        )?;

        self.folder_shape.write(writer)?;
        write_folder_ids(writer, "m:ParentFolderIds", &self.parent_folder_ids)?;

        writer.write(XmlEvent::end_element())
    }
}

/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/getfolder>.
#[derive(Clone, Debug)]
pub struct GetFolder {
    pub folder_shape: FolderShape,
    pub folder_ids: Vec<FolderId>,
}

impl<W: std::io::Write> EwsWrite<W> for GetFolder {
    fn write(&self, writer: &mut xml::EventWriter<W>) -> Result<(), xml::writer::Error> {
        writer.write(XmlEvent::start_element("m:GetFolder"))?;

        self.folder_shape.write(writer)?;
        write_folder_ids(writer, "m:FolderIds", &self.folder_ids)?;

        writer.write(XmlEvent::end_element())
    }
}

/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/getitem>.
#[derive(Clone, Debug)]
pub struct GetItem {
    pub item_shape: ItemShape,
    pub item_ids: Vec<ItemId>,
}

impl<W: std::io::Write> EwsWrite<W> for GetItem {
    fn write(&self, writer: &mut xml::EventWriter<W>) -> Result<(), xml::writer::Error> {
        writer.write(XmlEvent::start_element("m:GetItem"))?;

        self.item_shape.write(writer)?;

        writer.write(XmlEvent::start_element("m:ItemIds"))?;
        for id in self.item_ids.iter() {
            id.write(writer)?;
        }
        writer.write(XmlEvent::end_element())?;

        writer.write(XmlEvent::end_element())
    }
}

/// A request to match an ambiguous name against mailboxes and contacts.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/resolvenames>.
#[derive(Clone, Debug)]
pub struct ResolveNames {
    pub return_full_contact_data: bool,
    pub unresolved_entry: String,
}

impl<W: std::io::Write> EwsWrite<W> for ResolveNames {
    fn write(&self, writer: &mut xml::EventWriter<W>) -> Result<(), xml::writer::Error> {
        let return_full_contact_data = if self.return_full_contact_data {
            "true"
        } else {
            "false"
        };

        writer.write(
            XmlEvent::start_element("m:ResolveNames")
                .attr("ReturnFullContactData", return_full_contact_data),
        )?;

        writer.write(XmlEvent::start_element("m:UnresolvedEntry"))?;
        writer.write(XmlEvent::characters(&self.unresolved_entry))?;
        writer.write(XmlEvent::end_element())?;

        writer.write(XmlEvent::end_element())
    }
}

/// The operation carried in a SOAP request body.
#[derive(Clone, Debug)]
pub enum BodyContents {
    FindFolder(FindFolder),
    FindItem(FindItem),
    GetFolder(GetFolder),
    GetItem(GetItem),
    ResolveNames(ResolveNames),
}

impl BodyContents {
    pub fn operation(&self) -> Operation {
        match self {
            BodyContents::FindFolder(_) => Operation::FindFolder,
            BodyContents::FindItem(_) => Operation::FindItem,
            BodyContents::GetFolder(_) => Operation::GetFolder,
            BodyContents::GetItem(_) => Operation::GetItem,
            BodyContents::ResolveNames(_) => Operation::ResolveNames,
        }
    }
}

impl<W: std::io::Write> EwsWrite<W> for BodyContents {
    fn write(&self, writer: &mut xml::EventWriter<W>) -> Result<(), xml::writer::Error> {
        match self {
            BodyContents::FindFolder(body) => body.write(writer),
            BodyContents::FindItem(body) => body.write(writer),
            BodyContents::GetFolder(body) => body.write(writer),
            BodyContents::GetItem(body) => body.write(writer),
            BodyContents::ResolveNames(body) => body.write(writer),
        }
    }
}
