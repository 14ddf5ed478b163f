// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use crate::{
    connection::{Credentials, Settings},
    error::Result,
    report::Report,
};

use super::{check_subscribe, connect};

pub(super) const PORT: u16 = 4222;
pub(super) const CONFIG_FILE: &str = "basic-auth.conf";

pub(super) async fn run(settings: &Settings) -> Result<Report> {
    let mut report = Report::new("Basic Authorization");

    report.section("1. Testing Admin User (full access):");
    let Some(admin) = connect(
        &mut report,
        settings,
        "admin",
        PORT,
        Credentials::user_password("admin", "admin123"),
    )
    .await
    else {
        return Ok(report);
    };
    _ = report.expect_allowed(
        "Admin published to 'any.subject'",
        admin.publish("any.subject", "Admin message").await,
    );
    check_subscribe(
        &mut report,
        "Admin subscribed to 'any.subject'",
        admin.subscribe("any.subject").await,
    )
    .await;

    report.section("2. Testing Client User (requestor role):");
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
    _ = report.expect_allowed(
        "Client published to 'req.a'",
        client.publish("req.a", "Request message").await,
    );
    report.expect_denied(
        "Client denied publishing to 'other.subject'",
        client.publish("other.subject", "Should fail").await,
    );
    check_subscribe(
        &mut report,
        "Client subscribed to '_INBOX.>'",
        client.subscribe("_INBOX.>").await,
    )
    .await;

    report.section("3. Testing Service User (responder role):");
    let Some(service) = connect(
        &mut report,
        settings,
        "service",
        PORT,
        Credentials::user_password("service", "service123"),
    )
    .await
    else {
        return Ok(report);
    };
    check_subscribe(
        &mut report,
        "Service subscribed to 'req.a'",
        service.subscribe("req.a").await,
    )
    .await;
    _ = report.expect_allowed(
        "Service published to '_INBOX.test123'",
        service.publish("_INBOX.test123", "Response message").await,
    );

    report.section("4. Testing Other User (default permissions):");
    let Some(other) = connect(
        &mut report,
        settings,
        "other",
        PORT,
        Credentials::user_password("other", "other123"),
    )
    .await
    else {
        return Ok(report);
    };
    _ = report.expect_allowed(
        "Other published to 'SANDBOX.test'",
        other.publish("SANDBOX.test", "Sandbox message").await,
    );
    check_subscribe(
        &mut report,
        "Other subscribed to 'PUBLIC.announcements'",
        other.subscribe("PUBLIC.announcements").await,
    )
    .await;

    report.finish();
    Ok(report)
}
