/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use ews_client::{
    net::{Security, Transport, TransportError},
    records::content_hash,
    types::Operation,
    Error, ExchangeClient, SecurityMode, Settings,
};

const FIND_ITEM_MESSAGES: &str = include_str!("fixtures/find_item_messages.xml");
const FIND_ITEM_MIXED: &str = include_str!("fixtures/find_item_mixed.xml");
const GET_ITEM_MESSAGE: &str = include_str!("fixtures/get_item_message.xml");
const RESOLVE_NAMES_SINGLE: &str = include_str!("fixtures/resolve_names_single.xml");
const RESOLVE_NAMES_MULTIPLE: &str = include_str!("fixtures/resolve_names_multiple.xml");
const GET_FOLDER_CALENDAR: &str = include_str!("fixtures/get_folder_calendar.xml");
const FIND_FOLDER_CALENDARS: &str = include_str!("fixtures/find_folder_calendars.xml");
const FIND_ITEM_CALENDAR_SINGLE: &str = include_str!("fixtures/find_item_calendar_single.xml");
const FIND_ITEM_CALENDAR_MULTIPLE: &str =
    include_str!("fixtures/find_item_calendar_multiple.xml");

#[derive(Clone)]
enum Reply {
    Body(String),
    Status(u16),
    HostNotFound,
}

#[derive(Clone, Debug)]
struct SentRequest {
    operation: Operation,
    mode: SecurityMode,
    body: String,
}

/// Answers each operation with a canned reply and records what was sent.
#[derive(Default)]
struct MockTransport {
    replies: HashMap<Operation, Reply>,
    sent: Mutex<Vec<SentRequest>>,
}

impl MockTransport {
    fn with(mut self, operation: Operation, reply: Reply) -> Self {
        self.replies.insert(operation, reply);
        self
    }

    fn with_body(self, operation: Operation, body: &str) -> Self {
        self.with(operation, Reply::Body(body.to_string()))
    }

    fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        operation: Operation,
        security: &Security,
        envelope: Vec<u8>,
    ) -> Result<String, TransportError> {
        self.sent.lock().unwrap().push(SentRequest {
            operation,
            mode: security.mode,
            body: String::from_utf8(envelope).unwrap(),
        });

        match self.replies.get(&operation) {
            Some(Reply::Body(body)) => Ok(body.clone()),
            Some(Reply::Status(status)) => Err(TransportError::Status {
                status: *status,
                body: String::new(),
            }),
            Some(Reply::HostNotFound) => Err(TransportError::HostNotFound {
                host: "mail.invalid".to_string(),
            }),
            None => panic!("unexpected {operation:?} request"),
        }
    }
}

fn settings() -> Settings {
    Settings::new("jdoe", "hunter2", "mail.example.com")
}

fn connect(transport: MockTransport) -> (ExchangeClient, Arc<MockTransport>) {
    let transport = Arc::new(transport);
    let mut client = ExchangeClient::new();
    client.initialize_with(settings(), transport.clone());

    (client, transport)
}

/// A response for `operation` carrying `code` and no payload.
fn error_response(operation: Operation, code: &str) -> String {
    let name = operation.name();

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <m:{name}Response xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages" xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types">
      <m:ResponseMessages>
        <m:{name}ResponseMessage ResponseClass="Error">
          <m:MessageText>Something went wrong.</m:MessageText>
          <m:ResponseCode>{code}</m:ResponseCode>
          <m:DescriptiveLinkKey>0</m:DescriptiveLinkKey>
        </m:{name}ResponseMessage>
      </m:ResponseMessages>
    </m:{name}Response>
  </s:Body>
</s:Envelope>"#
    )
}

fn march() -> (chrono::DateTime<Utc>, chrono::DateTime<Utc>) {
    (
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap(),
    )
}

fn assert_code<T: std::fmt::Debug>(result: Result<T, Error>, code: &str) {
    let err = result.expect_err("operation should fail");
    assert_eq!(err.code(), Some(code), "unexpected error: {err:?}");
}

#[test_log::test(tokio::test)]
async fn operations_require_initialize() {
    let mut client = ExchangeClient::new();
    let (start, end) = march();

    assert!(!client.is_initialized());
    assert_code(client.get_emails(None, None).await, "NOCLIENT");
    assert_code(client.get_email("AAMkAD|CQAAAB").await, "NOCLIENT");
    assert_code(client.resolve_names("jdoe").await, "NOCLIENT");
    assert_code(client.check_login("jdoe").await, "NOCLIENT");
    assert_code(client.get_calendars().await, "NOCLIENT");
    assert_code(client.get_user_calendars(None).await, "NOCLIENT");
    assert_code(client.get_root_calendar().await, "NOCLIENT");
    assert_code(client.get_calendar_items(None, start, end).await, "NOCLIENT");
    assert_code(client.set_security("ws"), "NOCLIENT");

    let err = client.get_emails(None, None).await.unwrap_err();
    assert_eq!(err.to_string(), "Must initialize client first");
}

#[test_log::test(tokio::test)]
async fn resolve_names_requires_name() {
    // The name is checked before the client state.
    let uninitialized = ExchangeClient::new();
    assert_code(uninitialized.resolve_names("").await, "NONAME");

    let (client, transport) = connect(MockTransport::default());
    assert_code(client.resolve_names("").await, "NONAME");
    assert_code(client.resolve_names("   ").await, "NONAME");
    assert!(transport.sent().is_empty());
}

#[test_log::test(tokio::test)]
async fn initialize_rejects_empty_url() {
    let mut client = ExchangeClient::new();
    assert_code(
        client.initialize(Settings::new("jdoe", "hunter2", "")),
        "BADURL",
    );
    assert!(!client.is_initialized());

    client
        .initialize(settings().with_security(SecurityMode::Ntlm))
        .unwrap();
    assert!(client.is_initialized());
    assert_eq!(client.security_mode(), Some(SecurityMode::Ntlm));
}

#[test_log::test(tokio::test)]
async fn get_emails_maps_messages() {
    let (client, transport) =
        connect(MockTransport::default().with_body(Operation::FindItem, FIND_ITEM_MESSAGES));

    let emails = client.get_emails(None, None).await.unwrap();
    assert_eq!(emails.len(), 2);

    let first = &emails[0];
    assert_eq!(first.id, "AAMkAGI2TG93AAA=|CQAAABYAAAD2");
    assert_eq!(
        first.hash,
        content_hash(Some("Quarterly report"), Some("2024-03-05T14:02:58Z"))
    );
    assert_eq!(first.subject.as_deref(), Some("Quarterly report"));
    assert_eq!(first.size, Some(10422));
    assert_eq!(first.importance.as_deref(), Some("High"));
    assert!(first.has_attachments);
    assert!(!first.is_read);
    assert_eq!(first.from.as_deref(), Some("Alice Example"));
    assert_eq!(first.meta.item_id.id(), "AAMkAGI2TG93AAA=");
    assert_eq!(first.meta.item_id.change_key(), "CQAAABYAAAD2");

    // Rendered in local time, so only the shape is stable.
    let received = first.date_time_received.as_deref().unwrap();
    assert!(received.contains("/2024, "), "{received}");
    assert!(received.ends_with(" AM") || received.ends_with(" PM"));

    let second = &emails[1];
    assert_eq!(second.id, "AAMkAGI2TG94AAA=|CQAAABYAAAD3");
    assert!(second.is_read);
    assert!(!second.has_attachments);

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].operation, Operation::FindItem);

    let body = &sent[0].body;
    assert!(body.contains(r#"<m:FindItem Traversal="Shallow">"#));
    assert!(body.contains("<t:BaseShape>IdOnly</t:BaseShape>"));
    assert!(body.contains(r#"<t:FieldURI FieldURI="message:IsRead" />"#));
    assert!(body.contains(r#"<t:FieldURI FieldURI="item:DateTimeReceived" />"#));
    assert!(body.contains(r#"BasePoint="Beginning" Offset="0" MaxEntriesReturned="10""#));
    assert!(body.contains(r#"<t:DistinguishedFolderId Id="inbox" />"#));
}

#[test_log::test(tokio::test)]
async fn get_emails_honors_folder_and_limit() {
    let (client, transport) =
        connect(MockTransport::default().with_body(Operation::FindItem, FIND_ITEM_MESSAGES));

    client.get_emails(Some("sentitems"), Some(25)).await.unwrap();

    let body = &transport.sent()[0].body;
    assert!(body.contains(r#"MaxEntriesReturned="25""#));
    assert!(body.contains(r#"<t:DistinguishedFolderId Id="sentitems" />"#));
    assert!(!body.contains(r#"Id="inbox""#));
}

#[test_log::test(tokio::test)]
async fn get_emails_skips_other_item_kinds() {
    let (client, _) =
        connect(MockTransport::default().with_body(Operation::FindItem, FIND_ITEM_MIXED));

    let emails = client.get_emails(None, Some(5)).await.unwrap();

    let ids: Vec<_> = emails.iter().map(|email| email.id.as_str()).collect();
    assert_eq!(
        ids,
        ["AAMkAGI2TG93AAA=|CQAAABYAAAD2", "AAMkAGI2TG94AAA=|CQAAABYAAAD3"]
    );
    assert_eq!(emails[1].subject.as_deref(), Some("Lunch?"));
}

#[test_log::test(tokio::test)]
async fn get_email_returns_detail() {
    let (client, transport) =
        connect(MockTransport::default().with_body(Operation::GetItem, GET_ITEM_MESSAGE));

    let email = client
        .get_email("AAMkAGI2TG93AAA=|CQAAABYAAAD2")
        .await
        .unwrap();
    assert_eq!(email.id, "AAMkAGI2TG93AAA=|CQAAABYAAAD2");
    assert_eq!(email.body_type.as_deref(), Some("Text"));
    assert_eq!(email.body.as_deref(), Some("Numbers attached."));
    assert_eq!(email.to_recipients.len(), 2);
    assert_eq!(
        email.to_recipients[1].email_address.as_deref(),
        Some("john.doe@example.com")
    );
    assert!(email.cc_recipients.is_empty());
    assert_eq!(email.from.len(), 1);
    assert_eq!(email.from[0].name.as_deref(), Some("Alice Example"));
    assert!(email.is_read);
    assert_eq!(
        email.mime_content.as_deref(),
        Some("U3ViamVjdDogUXVhcnRlcmx5IHJlcG9ydA0KDQpOdW1iZXJzIGF0dGFjaGVkLg0K")
    );

    let body = &transport.sent()[0].body;
    assert!(body.contains("<m:GetItem>"));
    assert!(body.contains("<t:IncludeMimeContent>true</t:IncludeMimeContent>"));
    assert!(body.contains(r#"<t:ItemId Id="AAMkAGI2TG93AAA=" ChangeKey="CQAAABYAAAD2" />"#));
}

#[test_log::test(tokio::test)]
async fn get_email_rejects_malformed_id() {
    let (client, transport) = connect(MockTransport::default());

    assert_code(client.get_email("AAMkAGI2TG93AAA=").await, "BADID");
    assert_code(client.get_email("|CQAAABYAAAD2").await, "BADID");
    assert!(transport.sent().is_empty());
}

#[test_log::test(tokio::test)]
async fn resolve_names_single_and_multiple() {
    let (client, _) = connect(
        MockTransport::default().with_body(Operation::ResolveNames, RESOLVE_NAMES_SINGLE),
    );
    let contacts = client.resolve_names("jdoe").await.unwrap();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].name.as_deref(), Some("Jane Doe"));
    assert_eq!(contacts[0].email.as_deref(), Some("jdoe@example.com"));

    let (client, _) = connect(
        MockTransport::default().with_body(Operation::ResolveNames, RESOLVE_NAMES_MULTIPLE),
    );
    let contacts = client.check_login("doe").await.unwrap();
    let names: Vec<_> = contacts
        .iter()
        .map(|contact| contact.name.as_deref().unwrap())
        .collect();
    assert_eq!(names, ["Jane Doe", "John Doe"]);
}

#[test_log::test(tokio::test)]
async fn resolve_names_escapes_entry() {
    let (client, transport) = connect(
        MockTransport::default().with_body(Operation::ResolveNames, RESOLVE_NAMES_SINGLE),
    );

    client.resolve_names("Smith & <Sons>").await.unwrap();

    let body = &transport.sent()[0].body;
    assert!(body.contains(r#"<m:ResolveNames ReturnFullContactData="false">"#));
    assert!(body.contains("Smith &amp; &lt;Sons"));
    assert!(!body.contains("<Sons>"));
}

#[test_log::test(tokio::test)]
async fn get_calendars_lists_root_then_user_calendars() {
    let (client, transport) = connect(
        MockTransport::default()
            .with_body(Operation::GetFolder, GET_FOLDER_CALENDAR)
            .with_body(Operation::FindFolder, FIND_FOLDER_CALENDARS),
    );

    let calendars = client.get_calendars().await.unwrap();
    let names: Vec<_> = calendars
        .iter()
        .map(|calendar| calendar.name.as_deref().unwrap())
        .collect();
    assert_eq!(names, ["Calendar", "Team", "Holidays"]);
    assert_eq!(calendars[0].id, "AQMkADAwATM0MDAAMS1iNQ==|AgAAABQAAAA");
    assert_eq!(calendars[2].meta.folder_id.change_key(), "AgAAABQAAAC");

    let root = client.get_root_calendar().await.unwrap();
    let user = client.get_user_calendars(None).await.unwrap();
    assert_eq!(
        calendars,
        root.into_iter().chain(user).collect::<Vec<_>>()
    );

    let find_folder = transport
        .sent()
        .into_iter()
        .find(|request| request.operation == Operation::FindFolder)
        .unwrap();
    assert!(find_folder
        .body
        .contains(r#"<t:DistinguishedFolderId Id="calendar" />"#));
}

#[test_log::test(tokio::test)]
async fn get_user_calendars_honors_folder() {
    let (client, transport) = connect(
        MockTransport::default().with_body(Operation::FindFolder, FIND_FOLDER_CALENDARS),
    );

    client.get_user_calendars(Some("msgfolderroot")).await.unwrap();

    let body = &transport.sent()[0].body;
    assert!(body.contains(r#"<m:FindFolder Traversal="Shallow">"#));
    assert!(body.contains(r#"<t:DistinguishedFolderId Id="msgfolderroot" />"#));
}

#[test_log::test(tokio::test)]
async fn get_calendar_items_single_and_multiple() {
    let (start, end) = march();

    let (client, transport) = connect(
        MockTransport::default().with_body(Operation::FindItem, FIND_ITEM_CALENDAR_SINGLE),
    );
    let events = client.get_calendar_items(None, start, end).await.unwrap();
    assert_eq!(events.len(), 1);

    let event = &events[0];
    assert_eq!(event.id, "AAMkADc3MWUyMGQ5AAA=|DwAAABYAAAA");
    assert_eq!(event.subject.as_deref(), Some("Planning"));
    assert_eq!(event.location.as_deref(), Some("Room 4"));
    assert_eq!(event.organizer.as_deref(), Some("Carol Example"));
    assert_eq!(event.duration.as_deref(), Some("PT1H"));
    assert!(!event.all_day);

    let body = &transport.sent()[0].body;
    assert!(body.contains(
        r#"<m:CalendarView StartDate="2024-03-01T00:00:00Z" EndDate="2024-03-31T23:59:59Z" />"#
    ));
    assert!(body.contains(r#"<t:FieldURI FieldURI="calendar:IsAllDayEvent" />"#));
    assert!(body.contains(r#"<t:DistinguishedFolderId Id="calendar" />"#));

    let (client, _) = connect(
        MockTransport::default().with_body(Operation::FindItem, FIND_ITEM_CALENDAR_MULTIPLE),
    );
    let events = client.get_calendar_items(None, start, end).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].subject.as_deref(), Some("Company holiday"));
    assert!(events[1].all_day);
    assert_eq!(events[1].location, None);
}

#[test_log::test(tokio::test)]
async fn get_calendar_items_targets_given_calendar() {
    let (start, end) = march();
    let (client, transport) = connect(
        MockTransport::default()
            .with_body(Operation::FindFolder, FIND_FOLDER_CALENDARS)
            .with_body(Operation::FindItem, FIND_ITEM_CALENDAR_SINGLE),
    );

    let calendars = client.get_user_calendars(None).await.unwrap();
    client
        .get_calendar_items(Some(&calendars[0]), start, end)
        .await
        .unwrap();

    let body = &transport.sent()[1].body;
    assert!(body.contains(r#"<t:FolderId Id="AQMkADAwATM0MDAAMS1iNR==" ChangeKey="AgAAABQAAAB" />"#));
    assert!(!body.contains("DistinguishedFolderId"));
}

#[test_log::test(tokio::test)]
async fn get_calendar_items_rejects_inverted_range() {
    let (start, end) = march();
    let (client, transport) = connect(MockTransport::default());

    assert_code(client.get_calendar_items(None, end, start).await, "BADRANGE");
    assert!(transport.sent().is_empty());
}

#[test_log::test(tokio::test)]
async fn response_codes_fail_every_operation() {
    const CODE: &str = "ErrorAccessDenied";
    let (start, end) = march();

    let transport = [
        Operation::FindFolder,
        Operation::FindItem,
        Operation::GetFolder,
        Operation::GetItem,
        Operation::ResolveNames,
    ]
    .into_iter()
    .fold(MockTransport::default(), |transport, operation| {
        transport.with(operation, Reply::Body(error_response(operation, CODE)))
    });
    let (client, _) = connect(transport);

    let err = client.get_emails(None, None).await.unwrap_err();
    assert_eq!(err.to_string(), CODE);
    assert_eq!(err.code(), Some(CODE));

    assert_code(client.get_email("AAMkAD|CQAAAB").await, CODE);
    assert_code(client.resolve_names("jdoe").await, CODE);
    assert_code(client.get_calendars().await, CODE);
    assert_code(client.get_user_calendars(None).await, CODE);
    assert_code(client.get_root_calendar().await, CODE);
    assert_code(client.get_calendar_items(None, start, end).await, CODE);
}

#[test_log::test(tokio::test)]
async fn access_denied_fixture() {
    let (client, _) = connect(MockTransport::default().with_body(
        Operation::FindFolder,
        include_str!("fixtures/error_access_denied.xml"),
    ));

    assert_code(client.get_user_calendars(None).await, "ErrorAccessDenied");
}

#[test_log::test(tokio::test)]
async fn transport_failures_are_translated() {
    let (client, _) = connect(
        MockTransport::default()
            .with(Operation::ResolveNames, Reply::Status(401))
            .with(Operation::FindItem, Reply::HostNotFound)
            .with(Operation::GetFolder, Reply::Status(404)),
    );

    let err = client.resolve_names("jdoe").await.unwrap_err();
    assert_eq!(err.code(), Some("401"));
    assert_eq!(err.to_string(), "Unauthorized");

    let err = client.get_emails(None, None).await.unwrap_err();
    assert_eq!(err.code(), Some("404"));
    assert_eq!(err.to_string(), "Not Found");

    assert_code(client.get_root_calendar().await, "404");
}

#[test_log::test(tokio::test)]
async fn unknown_transport_failures_propagate() {
    let (client, _) =
        connect(MockTransport::default().with(Operation::ResolveNames, Reply::Status(500)));

    let err = client.resolve_names("jdoe").await.unwrap_err();
    assert!(matches!(
        err,
        Error::Transport(TransportError::Status { status: 500, .. })
    ));
    assert_eq!(err.code(), None);
}

#[test_log::test(tokio::test)]
async fn unparseable_response_is_an_error() {
    let (client, _) = connect(
        MockTransport::default().with_body(Operation::ResolveNames, "<html>oops</html>"),
    );

    let err = client.resolve_names("jdoe").await.unwrap_err();
    assert_eq!(err.code(), None);
}

#[test_log::test(tokio::test)]
async fn set_security_switches_credentials() {
    let (mut client, transport) = connect(
        MockTransport::default().with_body(Operation::ResolveNames, RESOLVE_NAMES_SINGLE),
    );
    assert_eq!(client.security_mode(), Some(SecurityMode::Basic));

    client.resolve_names("jdoe").await.unwrap();

    client.set_security("ws").unwrap();
    assert_eq!(client.security_mode(), Some(SecurityMode::Ws));
    client.resolve_names("jdoe").await.unwrap();

    // Unknown modes leave the current one in place.
    client.set_security("kerberos").unwrap();
    assert_eq!(client.security_mode(), Some(SecurityMode::Ws));

    client.set_security_mode(SecurityMode::Ntlm).unwrap();
    client.resolve_names("jdoe").await.unwrap();

    let sent = transport.sent();
    let modes: Vec<_> = sent.iter().map(|request| request.mode).collect();
    assert_eq!(
        modes,
        [SecurityMode::Basic, SecurityMode::Ws, SecurityMode::Ntlm]
    );

    assert!(!sent[0].body.contains("wsse:Security"));
    assert!(sent[1].body.contains("<wsse:Username>jdoe</wsse:Username>"));
    assert!(sent[1].body.contains("hunter2</wsse:Password>"));
    assert!(!sent[2].body.contains("wsse:Security"));
}
