// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use crate::{
    connection::{Credentials, Settings},
    error::Result,
    report::Report,
};

use super::{check_subscribe, connect};

pub(super) const PORT: u16 = 4223;
pub(super) const CONFIG_FILE: &str = "allow-deny.conf";

pub(super) async fn run(settings: &Settings) -> Result<Report> {
    let mut report = Report::new("Allow/Deny Authorization");

    // `events.>` is allowed, but `events.private` is carved out by a deny
    // rule, which takes precedence.
    report.section("1. Testing Limited User:");
    let Some(limited) = connect(
        &mut report,
        settings,
        "limited",
        PORT,
        Credentials::user_password("limited", "limited123"),
    )
    .await
    else {
        return Ok(report);
    };
    _ = report.expect_allowed(
        "Limited published to 'public.news'",
        limited.publish("public.news", "Public message").await,
    );
    _ = report.expect_allowed(
        "Limited published to 'events.user.login'",
        limited.publish("events.user.login", "Event message").await,
    );
    report.expect_denied(
        "Limited denied publishing to 'events.private'",
        limited.publish("events.private", "Should fail").await,
    );
    check_subscribe(
        &mut report,
        "Limited subscribed to 'client.notifications'",
        limited.subscribe("client.notifications").await,
    )
    .await;
    report.expect_denied(
        "Limited denied subscribing to 'admin.commands'",
        limited.subscribe("admin.commands").await,
    );

    report.section("2. Testing Read-Only User:");
    let Some(readonly) = connect(
        &mut report,
        settings,
        "readonly",
        PORT,
        Credentials::user_password("readonly", "readonly123"),
    )
    .await
    else {
        return Ok(report);
    };
    check_subscribe(
        &mut report,
        "Readonly subscribed to 'any.subject.here'",
        readonly.subscribe("any.subject.here").await,
    )
    .await;
    report.expect_denied(
        "Readonly denied publishing to 'any.subject'",
        readonly.publish("any.subject", "Should fail").await,
    );

    report.section("3. Testing Admin User:");
    if connect(
        &mut report,
        settings,
        "admin",
        PORT,
        Credentials::user_password("admin", "admin123"),
    )
    .await
    .is_some()
    {
        println!("  Admin has full publish/subscribe access to all subjects");
    }

    report.finish();
    Ok(report)
}
