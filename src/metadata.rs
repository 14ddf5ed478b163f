// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use inflector::Inflector;
use once_cell::sync::Lazy;

pub(crate) static CLIENT_TYPE_ID: Lazy<String> =
    Lazy::new(|| option_env!("CARGO_PKG_NAME").unwrap_or("nats-auth-demo").to_owned());
pub(crate) static CLIENT_DISPLAY_NAME: Lazy<String> = Lazy::new(|| CLIENT_TYPE_ID.to_title_case());

/// The name a connection announces to the server, so connections from the
/// demos are easy to tell apart in `nats-server` monitoring output.
pub(crate) fn connection_name(label: &str) -> String {
    format!("{} ({})", *CLIENT_DISPLAY_NAME, label.to_title_case())
}
