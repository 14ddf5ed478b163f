// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

//! Account demos. All three run against the same server: accounts `A`, `B`,
//! and `C`, with `A` exporting streams and services that the others import,
//! and `user_a` as the identity for clients that present no credentials.

use std::sync::Arc;

use crate::{
    connection::{self, payload_text, Connection, Credentials, Settings},
    error::Result,
    report::Report,
};

use super::{connect, join_checks, spawn_responder};

pub(super) const PORT: u16 = 4226;
pub(super) const CONFIG_FILE: &str = "accounts.conf";

async fn connect_account(report: &mut Report, settings: &Settings, account: char) -> Option<Connection> {
    let user = format!("user_{}", account.to_ascii_lowercase());
    let password = format!("pass_{}", account.to_ascii_lowercase());
    connect(
        report,
        settings,
        &format!("Account {account}"),
        PORT,
        Credentials::user_password(&user, &password),
    )
    .await
}

/// Publishes from `publisher` and records whether the message reached the
/// already-subscribed `subscriber` within the timeout.
async fn expect_delivery(
    report: &mut Report,
    settings: &Settings,
    label: &str,
    publisher: &Connection,
    subscriber: &mut async_nats::Subscriber,
    subject: &str,
    payload: &str,
) {
    println!("  {} publishing to '{subject}'...", publisher.label());
    if report
        .expect_allowed(
            &format!("{} published to '{subject}'", publisher.label()),
            publisher.publish(subject, payload).await,
        )
        .is_none()
    {
        return;
    }
    match connection::next_message(subscriber, settings.timeout).await {
        Some(message) => {
            println!("  Received: {}", payload_text(&message));
            report.expect_true(label, true, String::new());
        }
        None => report.expect_true(label, false, "no message arrived".to_owned()),
    }
}

pub(super) async fn run_isolation(settings: &Settings) -> Result<Report> {
    let mut report = Report::new("Account Isolation");

    let Some(a) = connect_account(&mut report, settings, 'A').await else {
        return Ok(report);
    };
    let Some(b) = connect_account(&mut report, settings, 'B').await else {
        return Ok(report);
    };
    let Some(_c) = connect_account(&mut report, settings, 'C').await else {
        return Ok(report);
    };

    report.section("1. Testing Account Isolation:");
    let Some(mut private) = report.expect_allowed(
        "Account B subscribed to 'private.data'",
        b.subscribe("private.data").await,
    ) else {
        return Ok(report);
    };

    println!("  Account A publishing to 'private.data'...");
    if report
        .expect_allowed(
            "Account A published to 'private.data'",
            a.publish("private.data", "Secret from A").await,
        )
        .is_some()
    {
        let leaked = connection::next_message(&mut private, settings.quiet_period()).await;
        report.expect_silent(
            "Account B did not receive the message from Account A (accounts are isolated)",
            leaked.as_ref(),
        );
    }

    expect_delivery(
        &mut report,
        settings,
        "Account B received its own message",
        &b,
        &mut private,
        "private.data",
        "Message from B",
    )
    .await;
    connection::close(&mut private).await;

    report.finish();
    Ok(report)
}

pub(super) async fn run_exports(settings: &Settings) -> Result<Report> {
    let mut report = Report::new("Account Export/Import");

    let Some(a) = connect_account(&mut report, settings, 'A').await else {
        return Ok(report);
    };
    let a = Arc::new(a);
    let Some(b) = connect_account(&mut report, settings, 'B').await else {
        return Ok(report);
    };
    let Some(c) = connect_account(&mut report, settings, 'C').await else {
        return Ok(report);
    };
    let task_wait = settings.timeout + settings.settle * 10;

    report.section("1. Testing Public Stream Export (puba.>):");
    if let Some(mut imported) = report.expect_allowed(
        "Account C subscribed to 'from_a.puba.events'",
        c.subscribe("from_a.puba.events").await,
    ) {
        expect_delivery(
            &mut report,
            settings,
            "Account C received the public stream as 'from_a.puba.events'",
            &a,
            &mut imported,
            "puba.events",
            "Public event from A",
        )
        .await;
        connection::close(&mut imported).await;
    }

    report.section("2. Testing Private Stream Export (b.> - only for Account B):");
    if let Some(mut imported) = report.expect_allowed(
        "Account B subscribed to 'b.data'",
        b.subscribe("b.data").await,
    ) {
        expect_delivery(
            &mut report,
            settings,
            "Account B received the private stream",
            &a,
            &mut imported,
            "b.data",
            "Private data for B",
        )
        .await;
        connection::close(&mut imported).await;
    }
    if let Some(mut outsider) = report.expect_allowed(
        "Account C subscribed to 'b.data'",
        c.subscribe("b.data").await,
    ) {
        if report
            .expect_allowed(
                "Account A published to 'b.data'",
                a.publish("b.data", "Should not reach C").await,
            )
            .is_some()
        {
            let leaked = connection::next_message(&mut outsider, settings.quiet_period()).await;
            report.expect_silent(
                "Account C cannot see the private stream for Account B",
                leaked.as_ref(),
            );
        }
        connection::close(&mut outsider).await;
    }

    report.section("3. Testing Public Service Export with Remapping:");
    if let Some(requests) = report.expect_allowed(
        "Account A serving 'pubq.C'",
        a.subscribe("pubq.C").await,
    ) {
        let responder = spawn_responder(Arc::clone(&a), requests, settings.timeout, |_| {
            "Response from A's service".to_owned()
        });
        println!("  Account C making request to 'Q' (remapped to 'pubq.C')...");
        if let Some(response) = report.expect_allowed(
            "Account C received a response through the remapped subject 'Q'",
            c.request("Q", "Request from C").await,
        ) {
            println!("  Account C received response: {}", payload_text(&response));
        }
        report.extend(join_checks(responder, task_wait, "Account A public service").await?);
    }

    report.section("4. Testing Private Service Export (q.b - only for Account B):");
    if let Some(requests) = report.expect_allowed("Account A serving 'q.b'", a.subscribe("q.b").await) {
        let responder = spawn_responder(Arc::clone(&a), requests, settings.timeout, |_| {
            "Private response for B".to_owned()
        });
        println!("  Account B making request to 'q.b'...");
        if let Some(response) = report.expect_allowed(
            "Account B received a response from the private service",
            b.request("q.b", "Request from B").await,
        ) {
            println!("  Account B received response: {}", payload_text(&response));
        }
        report.extend(join_checks(responder, task_wait, "Account A private service").await?);
    }

    report.finish();
    Ok(report)
}

pub(super) async fn run_no_auth_user(settings: &Settings) -> Result<Report> {
    let mut report = Report::new("No Auth User");

    report.section("1. Connecting without credentials (uses no_auth_user):");
    let Some(anonymous) = connect(&mut report, settings, "no-auth user", PORT, Credentials::Anonymous).await
    else {
        return Ok(report);
    };
    println!("  (Automatically assigned to user_a in Account A)");

    report.section("2. Testing access as Account A user:");
    _ = report.expect_allowed(
        "No-auth user published to 'puba.test'",
        anonymous.publish("puba.test", "Message from no-auth user").await,
    );

    report.finish();
    Ok(report)
}
