/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use crate::net::TransportError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Must initialize client first")]
    NoClient,

    #[error("No name provided.")]
    NoName,

    /// The server answered with a response code other than `NoError`.
    #[error("{0}")]
    Response(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not Found")]
    NotFound,

    #[error("No NTLM response from server")]
    NoNtlm,

    #[error("invalid item id `{0}`, expected `<id>|<change key>`")]
    InvalidItemId(String),

    #[error("calendar view starts after it ends")]
    InvalidRange,

    #[error("unable to build endpoint from `{url}`: {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    Transport(TransportError),

    /// The response body held a different operation's response.
    #[error("expected {0} in response")]
    UnexpectedResponse(&'static str),

    #[error("unable to parse response: {0}")]
    Parse(#[from] serde_xml_rs::Error),

    #[error("unable to write request: {0}")]
    Write(#[from] xml::writer::Error),

    #[error("invalid settings: {0}")]
    Config(String),
}

impl Error {
    /// Returns the stable code callers can match on, if the error has one.
    ///
    /// Server faults carry the EWS response code verbatim, e.g.
    /// `ErrorAccessDenied`.
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::NoClient => Some("NOCLIENT"),
            Error::NoName => Some("NONAME"),
            Error::Response(code) => Some(code),
            Error::Unauthorized => Some("401"),
            Error::NotFound => Some("404"),
            Error::NoNtlm => Some("NONTLM"),
            Error::InvalidItemId(_) => Some("BADID"),
            Error::InvalidRange => Some("BADRANGE"),
            Error::InvalidEndpoint { .. } => Some("BADURL"),
            Error::Transport(_)
            | Error::UnexpectedResponse(_)
            | Error::Parse(_)
            | Error::Write(_)
            | Error::Config(_) => None,
        }
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Status { status, .. } if status == 401 => Error::Unauthorized,
            TransportError::Status { status, .. } if status == 404 => Error::NotFound,
            TransportError::HostNotFound { .. } => Error::NotFound,
            TransportError::NoNtlm => Error::NoNtlm,
            err => Error::Transport(err),
        }
    }
}
