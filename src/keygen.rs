// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    fmt::{self, Display, Formatter, Write as _},
    fs,
    path::{Path, PathBuf},
};

use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use tabled::Tabled;

use crate::{error::Result, nkey::NKeyPair};

pub(crate) const KEY_DUMP_FILE: &str = "nkeys.txt";
pub(crate) const SERVER_CONFIG_FILE: &str = "nkeys-server.conf";
pub(crate) const KEY_SET_FILE: &str = "nkeys.json";
pub(crate) const DEFAULT_KEY_DIR: &str = "generated";
/// Port of the broker started with the generated configuration.
pub(crate) const DEFAULT_PORT: u16 = 4227;

/// The user roles of the NKey demo, each bound to one permission template of
/// the generated server configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub(crate) enum Role {
    Admin,
    Client,
    Service,
    Other,
}

impl Role {
    pub(crate) const ALL: [Self; 4] = [Self::Admin, Self::Client, Self::Service, Self::Other];

    /// Name of the permission block in the server configuration. `Other`
    /// falls through to `default_permissions`.
    pub(crate) const fn template(self) -> Option<&'static str> {
        match self {
            Self::Admin => Some("ADMIN"),
            Self::Client => Some("REQUESTOR"),
            Self::Service => Some("RESPONDER"),
            Self::Other => None,
        }
    }

    pub(crate) const fn publish_permissions(self) -> &'static [&'static str] {
        match self {
            Self::Admin => &[">"],
            Self::Client => &["req.a", "req.b"],
            Self::Service => &["_INBOX.>"],
            Self::Other => &["SANDBOX.*"],
        }
    }

    pub(crate) const fn subscribe_permissions(self) -> &'static [&'static str] {
        match self {
            Self::Admin => &[">"],
            Self::Client => &["_INBOX.>"],
            Self::Service => &["req.a", "req.b"],
            Self::Other => &["PUBLIC.>", "_INBOX.>"],
        }
    }

    /// A concrete subject inside the role's publish permissions.
    pub(crate) const fn sample_publish_subject(self) -> &'static str {
        match self {
            Self::Admin => "admin.events",
            Self::Client => "req.a",
            Self::Service => "_INBOX.nkeys",
            Self::Other => "SANDBOX.test",
        }
    }

    /// A concrete subject inside the role's subscribe permissions.
    pub(crate) const fn sample_subscribe_subject(self) -> &'static str {
        match self {
            Self::Admin => "admin.>",
            Self::Client => "_INBOX.>",
            Self::Service => "req.a",
            Self::Other => "PUBLIC.>",
        }
    }

    pub(crate) const fn publishes_anywhere(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Admin => "Admin",
            Self::Client => "Client",
            Self::Service => "Service",
            Self::Other => "Other",
        };
        f.write_str(name)
    }
}

fn serialize_seed<S: Serializer>(seed: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(seed.expose_secret())
}

fn format_permissions(subjects: &[&str]) -> String {
    subjects.join(", ")
}

#[derive(Clone, Debug, Deserialize, Serialize, Tabled)]
pub(crate) struct KeyRecord {
    #[tabled(rename = "Role")]
    pub(crate) role: Role,
    #[tabled(rename = "Public Key")]
    pub(crate) public_key: String,
    #[serde(serialize_with = "serialize_seed")]
    #[tabled(rename = "Seed", display_with = "Self::format_seed")]
    pub(crate) seed: SecretString,
}

impl KeyRecord {
    pub(crate) fn generate(role: Role) -> Result<Self> {
        let pair = NKeyPair::generate()?;
        Ok(Self {
            role,
            public_key: pair.public_key().to_owned(),
            seed: pair.seed().clone(),
        })
    }

    // Enough of the seed to recognize it in the dump file.
    fn format_seed(seed: &SecretString) -> String {
        let exposed = seed.expose_secret();
        format!("{}… (secret)", exposed.get(..20).unwrap_or(exposed))
    }
}

/// A record of the permissions a role is granted, for display.
#[derive(Tabled)]
pub(crate) struct RolePermissions {
    #[tabled(rename = "Role")]
    role: Role,
    #[tabled(rename = "Template")]
    template: &'static str,
    #[tabled(rename = "Publish")]
    publish: String,
    #[tabled(rename = "Subscribe")]
    subscribe: String,
}

impl From<Role> for RolePermissions {
    fn from(role: Role) -> Self {
        Self {
            role,
            template: role.template().unwrap_or("default_permissions"),
            publish: format_permissions(role.publish_permissions()),
            subscribe: format_permissions(role.subscribe_permissions()),
        }
    }
}

pub(crate) fn generate_for_roles(roles: &[Role]) -> Result<Vec<KeyRecord>> {
    roles.iter().copied().map(KeyRecord::generate).collect()
}

pub(crate) fn render_key_dump(keys: &[KeyRecord]) -> String {
    let mut out = String::from(
        "# Generated NKeys for NATS Authentication\n\
         # Keep the seeds (private keys) secret!\n\
         # Only share the public keys with the NATS server\n\n",
    );
    // Writing to a String cannot fail.
    for key in keys {
        _ = writeln!(out, "# {} User", key.role);
        _ = writeln!(out, "Seed (Private Key):  {}", key.seed.expose_secret());
        _ = writeln!(out, "Public Key:          {}\n", key.public_key);
    }
    out
}

fn render_subjects(subjects: &[&str]) -> String {
    match subjects {
        [single] => format!("\"{single}\""),
        many => format!(
            "[{}]",
            many.iter()
                .map(|s| format!("\"{s}\""))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Renders an authorization block for `nats-server` that grants each key the
/// permissions of its role.
pub(crate) fn render_server_config(keys: &[KeyRecord], port: u16) -> String {
    let mut out = format!(
        "# Generated NKeys Authentication Configuration\n\
         # Auto-generated - modify as needed\n\n\
         port: {port}\n\n\
         authorization {{\n  \
           default_permissions = {{\n    \
             publish = {}\n    \
             subscribe = {}\n  \
           }}\n",
        render_subjects(Role::Other.publish_permissions()),
        render_subjects(Role::Other.subscribe_permissions()),
    );

    for role in Role::ALL {
        if let Some(template) = role.template() {
            _ = write!(
                out,
                "\n  {template} = {{\n    publish = {}\n    subscribe = {}\n  }}\n",
                render_subjects(role.publish_permissions()),
                render_subjects(role.subscribe_permissions()),
            );
        }
    }

    out.push_str("\n  users = [\n");
    let entries = keys
        .iter()
        .map(|key| {
            let entry = match key.role.template() {
                Some(template) => {
                    format!("{{nkey: \"{}\", permissions: ${template}}}", key.public_key)
                }
                None => format!("{{nkey: \"{}\"}}", key.public_key),
            };
            format!("    # {} User\n    {entry}", key.role)
        })
        .collect::<Vec<_>>();
    out.push_str(&entries.join(",\n"));
    out.push_str("\n  ]\n}\n");
    out
}

pub(crate) struct ExportedFiles {
    pub(crate) key_dump: PathBuf,
    pub(crate) server_config: PathBuf,
}

pub(crate) fn write_files(keys: &[KeyRecord], dir: &Path, port: u16) -> Result<ExportedFiles> {
    fs::create_dir_all(dir)?;

    let key_dump = dir.join(KEY_DUMP_FILE);
    fs::write(&key_dump, render_key_dump(keys))?;

    let server_config = dir.join(SERVER_CONFIG_FILE);
    fs::write(&server_config, render_server_config(keys, port))?;

    Ok(ExportedFiles {
        key_dump,
        server_config,
    })
}

#[cfg(test)]
mod tests {
    use serde_test::{assert_ser_tokens, Token};

    use crate::error::Result;

    use super::*;

    fn record(role: Role, public_key: &str) -> KeyRecord {
        KeyRecord {
            role,
            public_key: public_key.to_owned(),
            seed: SecretString::new(format!("SU{public_key}SEED")),
        }
    }

    #[test]
    fn key_record_serializes_seed_in_clear() {
        assert_ser_tokens(
            &record(Role::Client, "UCLIENT"),
            &[
                Token::Struct {
                    name: "KeyRecord",
                    len: 3,
                },
                Token::Str("role"),
                Token::UnitVariant {
                    name: "Role",
                    variant: "Client",
                },
                Token::Str("public_key"),
                Token::Str("UCLIENT"),
                Token::Str("seed"),
                Token::Str("SUUCLIENTSEED"),
                Token::StructEnd,
            ],
        );
    }

    #[test]
    fn key_record_round_trips_through_json() -> Result<()> {
        let json = serde_json::to_string(&record(Role::Service, "USERVICE"))?;
        let parsed: KeyRecord = serde_json::from_str(&json)?;
        assert_eq!(parsed.role, Role::Service);
        assert_eq!(parsed.public_key, "USERVICE");
        assert_eq!(parsed.seed.expose_secret(), "SUUSERVICESEED");
        Ok(())
    }

    #[test]
    fn generates_one_key_per_role() -> Result<()> {
        let keys = generate_for_roles(&Role::ALL)?;
        assert_eq!(
            keys.iter().map(|k| k.role).collect::<Vec<_>>(),
            Role::ALL.to_vec()
        );
        assert!(keys.iter().all(|k| k.public_key.starts_with('U')));
        Ok(())
    }

    /// Whether `permission` admits `subject` under NATS wildcard rules. A
    /// wildcard subscription is admitted when the permission covers all of it.
    fn admits(permission: &str, subject: &str) -> bool {
        let mut subject = subject.split('.');
        for token in permission.split('.') {
            match (token, subject.next()) {
                (">", Some(_)) => return true,
                ("*", Some(s)) if s != ">" => {}
                (p, Some(s)) if p == s => {}
                _ => return false,
            }
        }
        subject.next().is_none()
    }

    #[test]
    fn wildcard_admission() {
        assert!(admits(">", "admin.>"));
        assert!(admits("SANDBOX.*", "SANDBOX.test"));
        assert!(admits("PUBLIC.>", "PUBLIC.>"));
        assert!(!admits("SANDBOX.*", "SANDBOX.a.b"));
        assert!(!admits("SANDBOX.*", "SANDBOX.>"));
        assert!(!admits("req.a", "req.b"));
        assert!(!admits("_INBOX.>", "_INBOX"));
    }

    #[test]
    fn sample_subjects_fall_inside_role_permissions() {
        for role in Role::ALL {
            let publish = role.sample_publish_subject();
            assert!(
                role.publish_permissions().iter().any(|p| admits(p, publish)),
                "{role} may not publish to {publish}"
            );
            let subscribe = role.sample_subscribe_subject();
            assert!(
                role.subscribe_permissions().iter().any(|p| admits(p, subscribe)),
                "{role} may not subscribe to {subscribe}"
            );
        }
    }

    #[test]
    fn key_dump_lists_every_role() {
        let dump = render_key_dump(&[record(Role::Admin, "UADMIN"), record(Role::Other, "UOTHER")]);
        assert!(dump.starts_with("# Generated NKeys for NATS Authentication\n"));
        assert!(dump.contains("# Admin User\nSeed (Private Key):  SUUADMINSEED\nPublic Key:          UADMIN\n"));
        assert!(dump.contains("# Other User\n"));
    }

    #[test]
    fn server_config_maps_roles_to_templates() {
        let config = render_server_config(
            &[
                record(Role::Admin, "UADMIN"),
                record(Role::Client, "UCLIENT"),
                record(Role::Service, "USERVICE"),
                record(Role::Other, "UOTHER"),
            ],
            4227,
        );

        assert!(config.contains("port: 4227\n"));
        assert!(config.contains("publish = \"SANDBOX.*\""));
        assert!(config.contains("subscribe = [\"PUBLIC.>\", \"_INBOX.>\"]"));
        assert!(config.contains("  REQUESTOR = {\n    publish = [\"req.a\", \"req.b\"]\n    subscribe = \"_INBOX.>\"\n  }"));
        assert!(config.contains("{nkey: \"UADMIN\", permissions: $ADMIN},\n"));
        assert!(config.contains("{nkey: \"UCLIENT\", permissions: $REQUESTOR},\n"));
        assert!(config.contains("{nkey: \"USERVICE\", permissions: $RESPONDER},\n"));
        assert!(config.contains("{nkey: \"UOTHER\"}\n  ]\n}\n"));
    }

    #[test]
    fn server_config_has_balanced_braces() {
        let config = render_server_config(&[record(Role::Client, "UCLIENT")], 4227);
        let opened = config.matches('{').count();
        let closed = config.matches('}').count();
        assert_eq!(opened, closed);
    }

    #[test]
    fn write_files_creates_directory() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("generated");
        let files = write_files(&[record(Role::Admin, "UADMIN")], &target, 4227)?;

        assert_eq!(files.key_dump, target.join(KEY_DUMP_FILE));
        assert!(fs::read_to_string(&files.server_config)?.contains("UADMIN"));
        Ok(())
    }
}
