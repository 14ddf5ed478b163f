// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{io, path::PathBuf, result};

use thiserror::Error;

pub(crate) type Result<T, E = Error> = result::Result<T, E>;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("IO operation failed: {0}")]
    Io(#[from] io::Error),
    #[error("JSON format error: {0}")]
    Json(serde_json::Error),
    #[error("invalid server URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("connection failed: {0}")]
    Connect(#[from] async_nats::ConnectError),
    #[error("publish failed: {0}")]
    Publish(#[from] async_nats::PublishError),
    #[error("subscribe failed: {0}")]
    Subscribe(#[from] async_nats::SubscribeError),
    #[error("request failed: {0}")]
    Request(#[from] async_nats::RequestError),
    #[error("flush failed: {0}")]
    Flush(#[from] async_nats::client::FlushError),
    #[error("NKey error: {0}")]
    NKey(#[from] nkeys::error::Error),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("no generated key set at {} (run the keygen command first)", .0.display())]
    MissingKeySet(PathBuf),
    #[error("key set does not contain a {0} key")]
    MissingRole(String),
    #[error("seed for the {0} key does not match its public key")]
    KeyMismatch(String),
    #[error("internal communication error: {0}")]
    Internal(#[from] Internal),
    #[error("{0} check(s) did not behave as expected")]
    ChecksFailed(usize),
}

impl Error {
    pub(crate) const fn is_denial(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(clippy::wildcard_enum_match_arm)]
        match value.classify() {
            serde_json::error::Category::Io => Self::Io(value.into()),
            _ => Self::Json(value),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        if value.is_cancelled() {
            Self::Internal(Internal::TaskCancelled)
        } else {
            Self::Io(value.into())
        }
    }
}

#[derive(Error, Debug)]
pub(crate) enum Internal {
    #[error("background task was cancelled")]
    TaskCancelled,
}

#[cfg(test)]
mod tests {
    use std::future;

    use super::*;

    #[test]
    fn json_syntax_errors_are_not_io() {
        let err = serde_json::from_str::<Vec<String>>("[").map_err(Error::from);
        assert!(matches!(err, Err(Error::Json(_))));
    }

    #[tokio::test]
    async fn cancelled_task_is_internal() {
        let task = tokio::spawn(future::pending::<()>());
        task.abort();
        let err = task.await.map_err(Error::from);
        assert!(matches!(err, Err(Error::Internal(Internal::TaskCancelled))));
    }

    #[test]
    fn only_permission_denials_are_denials() {
        assert!(Error::PermissionDenied("Permissions Violation".to_owned()).is_denial());
        assert!(!Error::ChecksFailed(1).is_denial());
    }
}
