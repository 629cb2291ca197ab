/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use const_format::concatcp;
use serde::{Deserialize, Serialize};

pub mod request;
pub mod response;

pub const MESSAGES_NS_URI: &str = "http://schemas.microsoft.com/exchange/services/2006/messages";
pub const SOAP_NS_URI: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const TYPES_NS_URI: &str = "http://schemas.microsoft.com/exchange/services/2006/types";
pub const WSSE_NS_URI: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
pub const WSU_NS_URI: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";
pub const PASSWORD_TEXT_URI: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordText";

/// The EWS operations this crate knows how to call. This stands in for the
/// service description: each operation maps to its `SOAPAction` header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    FindFolder,
    FindItem,
    GetFolder,
    GetItem,
    ResolveNames,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::FindFolder => "FindFolder",
            Operation::FindItem => "FindItem",
            Operation::GetFolder => "GetFolder",
            Operation::GetItem => "GetItem",
            Operation::ResolveNames => "ResolveNames",
        }
    }

    pub fn soap_action(&self) -> &'static str {
        match self {
            Operation::FindFolder => concatcp!(MESSAGES_NS_URI, "/FindFolder"),
            Operation::FindItem => concatcp!(MESSAGES_NS_URI, "/FindItem"),
            Operation::GetFolder => concatcp!(MESSAGES_NS_URI, "/GetFolder"),
            Operation::GetItem => concatcp!(MESSAGES_NS_URI, "/GetItem"),
            Operation::ResolveNames => concatcp!(MESSAGES_NS_URI, "/ResolveNames"),
        }
    }
}

/// An identifier paired with the change key of the revision it refers to.
///
/// This is the shape of both `t:ItemId` and `t:FolderId`, whose `Id` and
/// `ChangeKey` are attributes.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all(deserialize = "PascalCase", serialize = "camelCase"))]
pub struct ItemId {
    pub id: String,

    #[serde(default)]
    pub change_key: String,
}

impl ItemId {
    pub fn new(id: impl Into<String>, change_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            change_key: change_key.into(),
        }
    }

    /// Splits a composite `<id>|<change key>` string.
    pub fn from_composite(composite: &str) -> Option<Self> {
        let (id, change_key) = composite.split_once('|')?;
        if id.is_empty() || change_key.is_empty() {
            return None;
        }

        Some(Self::new(id, change_key))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn change_key(&self) -> &str {
        &self.change_key
    }

    /// Joins id and change key as `<id>|<change key>`.
    pub fn composite(&self) -> String {
        format!("{}|{}", self.id, self.change_key)
    }
}
