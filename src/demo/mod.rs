// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

mod accounts;
mod allow_deny;
mod allow_responses;
mod basic_auth;
mod nkey_signature;
mod nkeys_auth;
mod queue_permissions;

use std::{path::PathBuf, sync::Arc, time::Duration};

use async_nats::Subscriber;
use clap::ValueEnum;
use tokio::{task::JoinHandle, time};

use crate::{
    connection::{self, Connection, Credentials, Endpoint, Settings},
    error::Result,
    keygen,
    report::{self, Check, Report},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum DemoKind {
    /// Admin, client, service, and default permissions.
    BasicAuth,
    /// Explicit allow and deny lists, and a read-only user.
    AllowDeny,
    /// Service responders with temporary reply permissions.
    AllowResponses,
    /// Queue-specific authorization and load balancing.
    QueuePermissions,
    /// Isolated communication contexts per account.
    Accounts,
    /// Public and private streams and services between accounts.
    AccountExports,
    /// Connecting without credentials.
    NoAuthUser,
    /// Ed25519 challenge-response authentication with generated keys.
    NkeysAuth,
    /// Key generation and signature verification, without a server.
    NkeySignature,
}

impl DemoKind {
    /// The demos offered by the interactive menu, in menu order.
    pub(crate) const MENU: [Self; 7] = [
        Self::BasicAuth,
        Self::AllowDeny,
        Self::AllowResponses,
        Self::QueuePermissions,
        Self::Accounts,
        Self::AccountExports,
        Self::NoAuthUser,
    ];

    pub(crate) const fn title(self) -> &'static str {
        match self {
            Self::BasicAuth => "Basic Authorization",
            Self::AllowDeny => "Allow/Deny Rules",
            Self::AllowResponses => "Allow Responses",
            Self::QueuePermissions => "Queue Permissions",
            Self::Accounts => "Account Isolation",
            Self::AccountExports => "Account Exports/Imports",
            Self::NoAuthUser => "No Auth User",
            Self::NkeysAuth => "NKeys Authentication",
            Self::NkeySignature => "NKey Generation",
        }
    }

    pub(crate) const fn highlights(self) -> &'static [&'static str] {
        match self {
            Self::BasicAuth => &["Admin, Client, Service, and Default permissions"],
            Self::AllowDeny => &["Explicit allow and deny lists", "Read-only user example"],
            Self::AllowResponses => &[
                "Service responders with reply permissions",
                "Single vs streaming responses",
            ],
            Self::QueuePermissions => &[
                "Queue-specific authorization",
                "Load balancing across queue members",
            ],
            Self::Accounts => &["Multi-tenancy with accounts", "Isolated communication contexts"],
            Self::AccountExports => &[
                "Public and private streams",
                "Public and private services",
                "Subject remapping",
            ],
            Self::NoAuthUser => &["Connecting without credentials", "Default account assignment"],
            Self::NkeysAuth => &["Ed25519 signature-based authentication"],
            Self::NkeySignature => &["Challenge signing and verification"],
        }
    }

    pub(crate) const fn port(self) -> Option<u16> {
        match self {
            Self::BasicAuth => Some(basic_auth::PORT),
            Self::AllowDeny => Some(allow_deny::PORT),
            Self::AllowResponses => Some(allow_responses::PORT),
            Self::QueuePermissions => Some(queue_permissions::PORT),
            Self::Accounts | Self::AccountExports | Self::NoAuthUser => Some(accounts::PORT),
            Self::NkeysAuth => Some(nkeys_auth::PORT),
            Self::NkeySignature => None,
        }
    }

    /// The `nats-server` configuration this demo expects to be running.
    pub(crate) fn server_config(self, settings: &Settings) -> Option<PathBuf> {
        let in_config_dir = |file: &str| Some(settings.config_dir.join(file));
        match self {
            Self::BasicAuth => in_config_dir(basic_auth::CONFIG_FILE),
            Self::AllowDeny => in_config_dir(allow_deny::CONFIG_FILE),
            Self::AllowResponses => in_config_dir(allow_responses::CONFIG_FILE),
            Self::QueuePermissions => in_config_dir(queue_permissions::CONFIG_FILE),
            Self::Accounts | Self::AccountExports | Self::NoAuthUser => {
                in_config_dir(accounts::CONFIG_FILE)
            }
            Self::NkeysAuth => Some(settings.key_dir.join(keygen::SERVER_CONFIG_FILE)),
            Self::NkeySignature => None,
        }
    }

    pub(crate) async fn run(self, settings: &Settings) -> Result<Report> {
        match self {
            Self::BasicAuth => basic_auth::run(settings).await,
            Self::AllowDeny => allow_deny::run(settings).await,
            Self::AllowResponses => allow_responses::run(settings).await,
            Self::QueuePermissions => queue_permissions::run(settings).await,
            Self::Accounts => accounts::run_isolation(settings).await,
            Self::AccountExports => accounts::run_exports(settings).await,
            Self::NoAuthUser => accounts::run_no_auth_user(settings).await,
            Self::NkeysAuth => nkeys_auth::run(settings).await,
            Self::NkeySignature => nkey_signature::run(),
        }
    }
}

/// Opens a connection for a demo step. A failure is recorded and `None` tells
/// the demo to stop.
async fn connect(
    report: &mut Report,
    settings: &Settings,
    label: &str,
    port: u16,
    credentials: Credentials,
) -> Option<Connection> {
    let endpoint = Endpoint::new(settings, port, credentials);
    report.expect_allowed(
        &format!("{label} connected"),
        Connection::connect(settings, label, &endpoint).await,
    )
}

async fn check_subscribe(report: &mut Report, label: &str, result: Result<Subscriber>) {
    if let Some(mut subscriber) = report.expect_allowed(label, result) {
        connection::close(&mut subscriber).await;
    }
}

/// Answers exactly one request arriving on `subscriber` with the text
/// produced by `respond`.
fn spawn_responder(
    conn: Arc<Connection>,
    mut subscriber: Subscriber,
    wait: Duration,
    respond: fn(&str) -> String,
) -> JoinHandle<Vec<Check>> {
    tokio::spawn(async move {
        let mut report = report::task_report(conn.label());
        let label = format!("{} answered a request", conn.label());
        match connection::next_message(&mut subscriber, wait).await {
            Some(request) => {
                let body = connection::payload_text(&request);
                println!("  {} received request: {body}", conn.label());
                match request.reply.as_ref().map(ToString::to_string) {
                    Some(reply) => {
                        _ = report.expect_allowed(&label, conn.publish(&reply, &respond(&body)).await);
                    }
                    None => report.expect_true(&label, false, "request had no reply subject".to_owned()),
                }
            }
            None => report.expect_true(&label, false, "no request arrived".to_owned()),
        }
        connection::close(&mut subscriber).await;
        report.into_checks()
    })
}

/// Collects the checks a background task recorded. A task that does not
/// finish in time is cancelled and counted as a failed check.
async fn join_checks(mut handle: JoinHandle<Vec<Check>>, wait: Duration, label: &str) -> Result<Vec<Check>> {
    match time::timeout(wait, &mut handle).await {
        Ok(joined) => Ok(joined?),
        Err(_) => {
            handle.abort();
            let mut report = report::task_report(label);
            report.expect_true(label, false, "background task did not finish in time".to_owned());
            Ok(report.into_checks())
        }
    }
}
