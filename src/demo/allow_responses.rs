// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{sync::Arc, time::Duration};

use async_nats::Subscriber;

use crate::{
    connection::{self, payload_text, Connection, Credentials, Settings},
    error::Result,
    report::{self, Check, Report},
};

use super::{connect, join_checks};

pub(super) const PORT: u16 = 4224;
pub(super) const CONFIG_FILE: &str = "allow-responses.conf";

/// `allow_responses` limit configured for `service_stream`.
const MAX_STREAM_RESPONSES: usize = 5;

/// The reply subject of the next request on `subscriber`, or a failed check
/// explaining why there is none.
async fn next_request(
    report: &mut Report,
    subscriber: &mut Subscriber,
    subject: &str,
    wait: Duration,
) -> Option<String> {
    let label = format!("Service received request on '{subject}'");
    let Some(request) = connection::next_message(subscriber, wait).await else {
        report.expect_true(&label, false, "no request arrived".to_owned());
        return None;
    };
    println!("  Service received request on '{subject}': {}", payload_text(&request));
    match request.reply {
        Some(reply) => Some(reply.to_string()),
        None => {
            report.expect_true(&label, false, "request had no reply subject".to_owned());
            None
        }
    }
}

async fn respond_single(conn: Arc<Connection>, mut subscriber: Subscriber, wait: Duration) -> Vec<Check> {
    let mut report = report::task_report(conn.label());
    if let Some(reply) = next_request(&mut report, &mut subscriber, "requests.single", wait).await {
        _ = report.expect_allowed(
            "Service sent single response",
            conn.publish(&reply, "Single response").await,
        );
        report.expect_denied(
            "Service denied a second response",
            conn.publish(&reply, "Second response").await,
        );
    }
    connection::close(&mut subscriber).await;
    report.into_checks()
}

async fn respond_stream(conn: Arc<Connection>, mut subscriber: Subscriber, wait: Duration) -> Vec<Check> {
    let mut report = report::task_report(conn.label());
    if let Some(reply) = next_request(&mut report, &mut subscriber, "requests.stream", wait).await {
        for i in 1..=MAX_STREAM_RESPONSES {
            _ = report.expect_allowed(
                &format!("Service sent response {i}"),
                conn.publish(&reply, &format!("Response {i}")).await,
            );
        }
        let over = MAX_STREAM_RESPONSES + 1;
        report.expect_denied(
            &format!("Service denied response {over} (limit is {MAX_STREAM_RESPONSES})"),
            conn.publish(&reply, &format!("Response {over}")).await,
        );
    }
    connection::close(&mut subscriber).await;
    report.into_checks()
}

async fn respond_mixed(conn: Arc<Connection>, mut subscriber: Subscriber, wait: Duration) -> Vec<Check> {
    let mut report = report::task_report(conn.label());
    if let Some(reply) = next_request(&mut report, &mut subscriber, "requests.mixed", wait).await {
        _ = report.expect_allowed(
            "Service published to 'logs.service'",
            conn.publish("logs.service", "Log entry").await,
        );
        _ = report.expect_allowed(
            "Service sent response",
            conn.publish(&reply, "Mixed response").await,
        );
    }
    connection::close(&mut subscriber).await;
    report.into_checks()
}

pub(super) async fn run(settings: &Settings) -> Result<Report> {
    let mut report = Report::new("Allow Responses");
    // Responders get the whole request timeout plus time to send their
    // answers before they are given up on.
    let task_wait = settings.timeout + settings.settle * 10;

    let Some(client) = connect(
        &mut report,
        settings,
        "client",
        PORT,
        Credentials::user_password("client", "client123"),
    )
    .await
    else {
        return Ok(report);
    };

    report.section("1. Testing Service with Single Response Permission:");
    let Some(single) = connect(
        &mut report,
        settings,
        "service_single",
        PORT,
        Credentials::user_password("service_single", "service123"),
    )
    .await
    else {
        return Ok(report);
    };
    let single = Arc::new(single);
    let Some(requests) = report.expect_allowed(
        "Service subscribed to 'requests.single'",
        single.subscribe("requests.single").await,
    ) else {
        return Ok(report);
    };
    let responder = tokio::spawn(respond_single(Arc::clone(&single), requests, settings.timeout));
    println!("  Client making request to 'requests.single'...");
    if let Some(response) = report.expect_allowed(
        "Client received response from 'requests.single'",
        client.request("requests.single", "Request 1").await,
    ) {
        println!("  Client received: {}", payload_text(&response));
    }
    report.extend(join_checks(responder, task_wait, "service_single responder").await?);

    report.section(&format!(
        "2. Testing Service with Stream Response Permission (max {MAX_STREAM_RESPONSES}, 1m expiry):"
    ));
    let Some(stream) = connect(
        &mut report,
        settings,
        "service_stream",
        PORT,
        Credentials::user_password("service_stream", "service456"),
    )
    .await
    else {
        return Ok(report);
    };
    let stream = Arc::new(stream);
    let Some(requests) = report.expect_allowed(
        "Service subscribed to 'requests.stream'",
        stream.subscribe("requests.stream").await,
    ) else {
        return Ok(report);
    };
    let responder = tokio::spawn(respond_stream(Arc::clone(&stream), requests, settings.timeout));

    println!("  Client making request to 'requests.stream'...");
    let inbox = client.new_inbox();
    if let Some(mut responses) = report.expect_allowed(
        "Client subscribed to its inbox",
        client.subscribe(&inbox).await,
    ) {
        let sent = report.expect_allowed(
            "Client sent stream request",
            client
                .publish_with_reply("requests.stream", &inbox, "Stream request")
                .await,
        );
        report.extend(join_checks(responder, task_wait, "service_stream responder").await?);

        if sent.is_some() {
            println!("  Client checking for responses...");
            let mut received = 0_usize;
            while let Some(message) = connection::next_message(&mut responses, settings.quiet_period()).await {
                received += 1;
                println!("  Client received: {}", payload_text(&message));
            }
            report.expect_true(
                &format!("Client received {MAX_STREAM_RESPONSES} streamed responses"),
                received == MAX_STREAM_RESPONSES,
                format!("{received} received"),
            );
        }
        connection::close(&mut responses).await;
    } else {
        report.extend(join_checks(responder, task_wait, "service_stream responder").await?);
    }

    report.section("3. Testing Service with Mixed Permissions:");
    let Some(mixed) = connect(
        &mut report,
        settings,
        "service_mixed",
        PORT,
        Credentials::user_password("service_mixed", "service789"),
    )
    .await
    else {
        return Ok(report);
    };
    let mixed = Arc::new(mixed);
    let Some(requests) = report.expect_allowed(
        "Service subscribed to 'requests.mixed'",
        mixed.subscribe("requests.mixed").await,
    ) else {
        return Ok(report);
    };
    let responder = tokio::spawn(respond_mixed(Arc::clone(&mixed), requests, settings.timeout));
    println!("  Client making request to 'requests.mixed'...");
    if let Some(response) = report.expect_allowed(
        "Client received response from 'requests.mixed'",
        client.request("requests.mixed", "Mixed request").await,
    ) {
        println!("  Client received: {}", payload_text(&response));
    }
    report.extend(join_checks(responder, task_wait, "service_mixed responder").await?);

    report.finish();
    Ok(report)
}
