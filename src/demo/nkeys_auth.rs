// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use log::info;
use tabled::{settings::Style, Table};

use crate::{
    connection::{payload_text, Connection, Credentials, Settings},
    console,
    error::{Error, Result},
    keygen::{self, KeyRecord, Role, RolePermissions, KEY_SET_FILE},
    nkey::NKeyPair,
    report::Report,
    storage::{self, Storage as _},
};

use super::{check_subscribe, connect, join_checks, spawn_responder};

pub(super) const PORT: u16 = keygen::DEFAULT_PORT;

const UNAUTHORIZED_SUBJECT: &str = "unauthorized.subject";

/// Loads the key set written by `keygen`, checking that every seed still
/// produces the public key the server was configured with.
async fn load_keys(settings: &Settings) -> Result<Vec<KeyRecord>> {
    let mut store = storage::File::new(settings.key_dir.join(KEY_SET_FILE));
    let keys: Vec<KeyRecord> = store
        .get()
        .await?
        .ok_or_else(|| Error::MissingKeySet(store.path().to_owned()))?;
    info!("loaded {} keys from {}", keys.len(), store.path().display());

    for key in &keys {
        let pair = NKeyPair::from_seed(&key.seed)?;
        if pair.public_key() != key.public_key {
            return Err(Error::KeyMismatch(key.role.to_string()));
        }
    }
    Ok(keys)
}

fn key_for(keys: &[KeyRecord], role: Role) -> Result<&KeyRecord> {
    keys.iter()
        .find(|key| key.role == role)
        .ok_or_else(|| Error::MissingRole(role.to_string()))
}

async fn connect_as(report: &mut Report, settings: &Settings, key: &KeyRecord) -> Option<Connection> {
    connect(
        report,
        settings,
        &format!("{} (NKey)", key.role),
        PORT,
        Credentials::NKey {
            seed: key.seed.clone(),
        },
    )
    .await
}

async fn exercise_role(report: &mut Report, settings: &Settings, key: &KeyRecord) {
    let role = key.role;
    println!("\nTesting {role} User:");
    let Some(conn) = connect_as(report, settings, key).await else {
        return;
    };

    let subject = role.sample_publish_subject();
    _ = report.expect_allowed(
        &format!("{role} published to '{subject}'"),
        conn.publish(subject, &format!("Test from {role}")).await,
    );

    let subject = role.sample_subscribe_subject();
    check_subscribe(
        report,
        &format!("{role} subscribed to '{subject}'"),
        conn.subscribe(subject).await,
    )
    .await;

    let result = conn.publish(UNAUTHORIZED_SUBJECT, "Should fail").await;
    if role.publishes_anywhere() {
        _ = report.expect_allowed(
            &format!("{role} published to '{UNAUTHORIZED_SUBJECT}' (full access)"),
            result,
        );
    } else {
        report.expect_denied(
            &format!("{role} denied publishing to '{UNAUTHORIZED_SUBJECT}'"),
            result,
        );
    }
}

pub(super) async fn run(settings: &Settings) -> Result<Report> {
    let mut report = Report::new("NKeys Authentication");
    println!("Demonstrating Ed25519 signature-based authentication");

    let Some(keys) = report.expect_allowed("Generated key set loaded", load_keys(settings).await) else {
        return Ok(report);
    };

    println!("\nConfigured test users:");
    let permissions = keys.iter().map(|key| RolePermissions::from(key.role));
    println!("{}", Table::new(permissions).with(Style::rounded()));
    println!("{}", Table::new(&keys).with(Style::rounded()));
    println!("\n{}", console::rule());

    for key in &keys {
        exercise_role(&mut report, settings, key).await;
    }

    report.section("=== Request-Response Pattern with NKeys ===");
    let task_wait = settings.timeout + settings.settle * 10;
    let (Some(service_key), Some(client_key)) = (
        report.expect_allowed("Service key present", key_for(&keys, Role::Service)),
        report.expect_allowed("Client key present", key_for(&keys, Role::Client)),
    ) else {
        return Ok(report);
    };

    println!("\n1. Starting service responder...");
    let Some(service) = connect_as(&mut report, settings, service_key).await else {
        return Ok(report);
    };
    let service = Arc::new(service);
    let Some(requests) = report.expect_allowed("Service listening on 'req.a'", service.subscribe("req.a").await)
    else {
        return Ok(report);
    };
    let responder = spawn_responder(Arc::clone(&service), requests, settings.timeout, |body| {
        format!("Response to: {body}")
    });

    println!("\n2. Client making request...");
    if let Some(client) = connect_as(&mut report, settings, client_key).await {
        if let Some(response) = report.expect_allowed(
            "Client received response over NKey-authenticated connections",
            client.request("req.a", "Hello from client").await,
        ) {
            println!("  Client received response: {}", payload_text(&response));
        }
    }
    report.extend(join_checks(responder, task_wait, "Service responder").await?);

    report.finish();
    println!("\nKey Advantages of NKeys:");
    for advantage in [
        "Private keys never leave the client",
        "Server only stores public keys",
        "Each connection uses a unique challenge-response",
        "Immune to replay attacks",
        "Based on Ed25519 (faster and more secure than RSA)",
    ] {
        println!("  • {advantage}");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, time::Duration};

    use crate::error::Result;

    use super::*;

    fn settings(key_dir: PathBuf) -> Settings {
        Settings {
            host: "localhost".to_owned(),
            config_dir: PathBuf::from("config"),
            key_dir,
            settle: Duration::from_millis(100),
            timeout: Duration::from_secs(2),
        }
    }

    #[tokio::test]
    async fn missing_key_set_is_reported() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let settings = settings(dir.path().to_owned());
        assert!(matches!(load_keys(&settings).await, Err(Error::MissingKeySet(_))));
        Ok(())
    }

    #[tokio::test]
    async fn stored_key_set_loads() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let settings = settings(dir.path().to_owned());
        let keys = keygen::generate_for_roles(&Role::ALL)?;
        storage::File::new(dir.path().join(KEY_SET_FILE)).update(&keys).await?;

        let loaded = load_keys(&settings).await?;
        assert_eq!(loaded.len(), Role::ALL.len());
        assert_eq!(key_for(&loaded, Role::Client)?.public_key, keys[1].public_key);
        Ok(())
    }

    #[tokio::test]
    async fn mismatched_seed_is_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let settings = settings(dir.path().to_owned());
        let mut keys = keygen::generate_for_roles(&[Role::Admin, Role::Client])?;
        keys[0].public_key = keys[1].public_key.clone();
        storage::File::new(dir.path().join(KEY_SET_FILE)).update(&keys).await?;

        assert!(matches!(load_keys(&settings).await, Err(Error::KeyMismatch(_))));
        Ok(())
    }

    #[test]
    fn missing_role_is_an_error() {
        assert!(matches!(key_for(&[], Role::Service), Err(Error::MissingRole(_))));
    }
}
