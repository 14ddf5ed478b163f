// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use async_trait::async_trait;
use clap::Parser;
use log::info;
use tabled::{settings::Style, Table};

use crate::{
    connection::Settings,
    error::Result,
    keygen::{self, KeyRecord, Role, RolePermissions},
    metadata,
    storage::{self, IsPersistent as _, Storage},
};

/// Generate NKey pairs for every demo role, along with a `nats-server`
/// configuration that trusts them. The configuration listens on the port the
/// `nkeys-auth` demo connects to.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// Print the keys and configuration instead of writing them to the key
    /// directory.
    #[arg(long)]
    print_only: bool,
}

fn key_storage(settings: &Settings, print_only: bool) -> Box<dyn Storage<Vec<KeyRecord>>> {
    if print_only {
        Box::new(storage::Memory::new())
    } else {
        Box::new(storage::File::new(settings.key_dir.join(keygen::KEY_SET_FILE)))
    }
}

fn demo_command(settings: &Settings) -> String {
    let program = metadata::CLIENT_TYPE_ID.as_str();
    if settings.key_dir == Path::new(keygen::DEFAULT_KEY_DIR) {
        format!("{program} run nkeys-auth")
    } else {
        format!("{program} --key-dir {} run nkeys-auth", settings.key_dir.display())
    }
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, settings: &Settings) -> Result<()> {
        let keys = keygen::generate_for_roles(&Role::ALL)?;
        let mut storage = key_storage(settings, self.print_only);
        storage.update(&keys).await?;

        println!(
            "{}",
            Table::new(Role::ALL.map(RolePermissions::from)).with(Style::rounded())
        );
        println!("{}", Table::new(&keys).with(Style::rounded()));

        if !storage.is_persistent() {
            println!("\n{}", keygen::render_key_dump(&keys));
            println!("{}", keygen::render_server_config(&keys, keygen::DEFAULT_PORT));
            return Ok(());
        }

        let files = keygen::write_files(&keys, &settings.key_dir, keygen::DEFAULT_PORT)?;
        info!("stored key set for the nkeys-auth demo");
        println!("\nKeys written to {}", files.key_dump.display());
        println!("Server configuration written to {}", files.server_config.display());
        println!("\nNext steps:");
        println!("  1. Start the server: nats-server -c {}", files.server_config.display());
        println!("  2. Run the demo:     {}", demo_command(settings));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, time::Duration};

    use crate::{command::Command as _, error::Result};

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
    async fn writes_key_set_and_config() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let settings = settings(dir.path().join("generated"));
        Command { print_only: false }.execute(&settings).await?;

        let stored = key_storage(&settings, false).get().await?;
        assert_eq!(stored.map(|keys| keys.len()), Some(Role::ALL.len()));
        let config = std::fs::read_to_string(settings.key_dir.join(keygen::SERVER_CONFIG_FILE))?;
        assert!(config.contains("port: 4227\n"));
        assert!(settings.key_dir.join(keygen::KEY_DUMP_FILE).exists());
        Ok(())
    }

    #[tokio::test]
    async fn print_only_writes_nothing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let settings = settings(dir.path().join("generated"));
        Command { print_only: true }.execute(&settings).await?;

        assert!(!settings.key_dir.exists());
        Ok(())
    }

    #[test]
    fn demo_command_names_a_custom_key_dir() {
        let program = metadata::CLIENT_TYPE_ID.as_str();
        assert_eq!(
            demo_command(&settings(PathBuf::from(keygen::DEFAULT_KEY_DIR))),
            format!("{program} run nkeys-auth")
        );
        assert_eq!(
            demo_command(&settings(PathBuf::from("/tmp/keys"))),
            format!("{program} --key-dir /tmp/keys run nkeys-auth")
        );
    }
}
