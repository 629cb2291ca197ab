/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use chrono::{DateTime, SecondsFormat, Utc};
use xml::writer::XmlEvent;

use crate::types::{
    request::EwsWrite, MESSAGES_NS_URI, PASSWORD_TEXT_URI, SOAP_NS_URI, TYPES_NS_URI, WSSE_NS_URI,
    WSU_NS_URI,
};

/// The schema version requested from the server.
pub const SERVER_VERSION: &str = "Exchange2010";

/// A WS-Security `UsernameToken`, sent in the SOAP header when the client
/// uses WS-Security.
pub struct UsernameToken<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub created: DateTime<Utc>,
}

impl<W: std::io::Write> EwsWrite<W> for UsernameToken<'_> {
    fn write(&self, writer: &mut xml::EventWriter<W>) -> Result<(), xml::writer::Error> {
        let created = self.created.to_rfc3339_opts(SecondsFormat::Secs, true);

        writer.write(
            XmlEvent::start_element("wsse:Security")
                .ns("wsse", WSSE_NS_URI)
                .ns("wsu", WSU_NS_URI),
        )?;
        writer.write(XmlEvent::start_element("wsse:UsernameToken"))?;

        writer.write(XmlEvent::start_element("wsse:Username"))?;
        writer.write(XmlEvent::characters(self.username))?;
        writer.write(XmlEvent::end_element())?;

        writer.write(XmlEvent::start_element("wsse:Password").attr("Type", PASSWORD_TEXT_URI))?;
        writer.write(XmlEvent::characters(self.password))?;
        writer.write(XmlEvent::end_element())?;

        writer.write(XmlEvent::start_element("wsu:Created"))?;
        writer.write(XmlEvent::characters(&created))?;
        writer.write(XmlEvent::end_element())?;

        writer.write(XmlEvent::end_element())?;
        writer.write(XmlEvent::end_element())
    }
}

/// Writes a struct as the body of a SOAP request.
pub fn write_request<W: std::io::Write, X: EwsWrite<W>>(
    sink: W,
    body: &X,
    security: Option<&UsernameToken<'_>>,
) -> Result<(), xml::writer::Error> {
    let mut writer = xml::EmitterConfig::new().create_writer(sink);

    writer.write(
        XmlEvent::start_element("soap:Envelope")
            .ns("soap", SOAP_NS_URI)
            .ns("t", TYPES_NS_URI)
            .ns("m", MESSAGES_NS_URI),
    )?;

    writer.write(XmlEvent::start_element("soap:Header"))?;
    writer.write(XmlEvent::start_element("t:RequestServerVersion").attr("Version", SERVER_VERSION))?;
    writer.write(XmlEvent::end_element())?;
    if let Some(token) = security {
        token.write(&mut writer)?;
    }
    writer.write(XmlEvent::end_element())?;

    writer.write(XmlEvent::start_element("soap:Body"))?;
    body.write(&mut writer)?;
    writer.write(XmlEvent::end_element())?;

    writer.write(XmlEvent::end_element())
}
