// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Failures raised by the ledger, its aggregates and the instance registry.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Order {0} not found")]
    NotFound(i64),
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("Schema migration failed: {0}")]
    Migration(String),
    #[error("No ledger configured for entry '{0}'")]
    UnknownInstance(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Background task failed: {0}")]
    Background(#[from] tokio::task::JoinError),
    #[error("Ledger connection lock poisoned")]
    Poisoned,
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        LedgerError::Validation(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, LedgerError::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFound(_))
    }

    /// Anything that aborted an operation because the store could not be
    /// reached or written.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            LedgerError::Storage(_)
                | LedgerError::Io(_)
                | LedgerError::Background(_)
                | LedgerError::Poisoned
        )
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
