/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use chrono::{Duration, Utc};
use ews_client::{ExchangeClient, Settings};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let settings = Settings::from_path("config.toml").expect("Unable to read config.toml");

    let mut client = ExchangeClient::new();
    client
        .initialize(settings)
        .expect("Unable to initialize client");

    // List the most recent messages in the inbox.
    let emails = client
        .get_emails(None, Some(20))
        .await
        .expect("Unable to list inbox");

    for email in emails {
        let id_short = email.meta.item_id.id().get(0..10).unwrap_or(email.meta.item_id.id());

        println!(
            "{}...: {} [{}] {}",
            id_short,
            email.date_time_received.as_deref().unwrap_or("-"),
            email.from.as_deref().unwrap_or("unknown sender"),
            email.subject.as_deref().unwrap_or("(no subject)"),
        );
    }

    let calendars = client
        .get_calendars()
        .await
        .expect("Unable to list calendars");

    // Then the coming week of each calendar.
    let start = Utc::now();
    let end = start + Duration::days(7);
    for calendar in &calendars {
        println!("{}", calendar.name.as_deref().unwrap_or("(unnamed calendar)"));

        let events = client
            .get_calendar_items(Some(calendar), start, end)
            .await
            .expect("Unable to list calendar items");

        for event in events {
            println!(
                "  {} - {}: {}",
                event.start.as_deref().unwrap_or("?"),
                event.end.as_deref().unwrap_or("?"),
                event.subject.as_deref().unwrap_or("(no subject)"),
            );
        }
    }
}
