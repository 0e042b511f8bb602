// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Instance-keyed routing from an entry id to its ledger store.

use crate::db;
use crate::errors::{LedgerError, LedgerResult};
use crate::notify::{ChangeNotifier, LedgerChanged};
use crate::utils::validate_entry_id;
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

/// One configured ledger: its connection and its subscribers.
#[derive(Debug)]
pub struct LedgerHandle {
    entry_id: String,
    path: PathBuf,
    conn: Arc<Mutex<Connection>>,
    notifier: ChangeNotifier,
}

impl LedgerHandle {
    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn subscribe(&self) -> UnboundedReceiver<LedgerChanged> {
        self.notifier.subscribe()
    }

    pub fn notify(&self, event: LedgerChanged) -> usize {
        let delivered = self.notifier.publish(event);
        debug!(entry_id = %self.entry_id, delivered, "ledger change published");
        delivered
    }

    /// Runs `f` against the connection on the blocking pool. The connection
    /// lock serialises every caller of this instance.
    pub async fn run<T, F>(&self, f: F) -> LedgerResult<T>
    where
        F: FnOnce(&mut Connection) -> LedgerResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| LedgerError::Poisoned)?;
            f(&mut guard)
        })
        .await?
    }
}

#[derive(Debug)]
pub struct LedgerRegistry {
    storage_dir: PathBuf,
    entries: RwLock<BTreeMap<String, Arc<LedgerHandle>>>,
}

impl LedgerRegistry {
    pub fn new(storage_dir: PathBuf) -> Self {
        Self {
            storage_dir,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Opens (creating and migrating if needed) the ledger for `entry_id`.
    /// Setting up an instance twice returns the existing handle.
    pub async fn setup_entry(&self, entry_id: &str) -> LedgerResult<Arc<LedgerHandle>> {
        validate_entry_id(entry_id)?;
        if let Some(h) = self.lookup(entry_id) {
            return Ok(h);
        }
        let path = db::ledger_path(&self.storage_dir, entry_id);
        let open_path = path.clone();
        let conn = tokio::task::spawn_blocking(move || db::open_ledger(&open_path)).await??;
        let handle = Arc::new(LedgerHandle {
            entry_id: entry_id.to_string(),
            path,
            conn: Arc::new(Mutex::new(conn)),
            notifier: ChangeNotifier::new(),
        });

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let handle = Arc::clone(
            entries
                .entry(entry_id.to_string())
                .or_insert_with(|| Arc::clone(&handle)),
        );
        info!(entry_id, path = %handle.path.display(), "ledger instance ready");
        Ok(handle)
    }

    fn lookup(&self, entry_id: &str) -> Option<Arc<LedgerHandle>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entry_id)
            .cloned()
    }

    pub fn get(&self, entry_id: &str) -> LedgerResult<Arc<LedgerHandle>> {
        self.lookup(entry_id)
            .ok_or_else(|| LedgerError::UnknownInstance(entry_id.to_string()))
    }

    /// Forgets the instance and drops its subscribers. The ledger file stays.
    pub fn unload_entry(&self, entry_id: &str) -> bool {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(entry_id);
        match removed {
            Some(h) => {
                h.notifier.clear();
                info!(entry_id, "ledger instance unloaded");
                true
            }
            None => false,
        }
    }

    pub fn entry_ids(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}
