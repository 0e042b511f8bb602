// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db;
use crate::errors::{LedgerError, LedgerResult};
use crate::projection::DEFAULT_FRIENDLY_NAME;
use crate::utils::validate_entry_id;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_ENTRY_ID: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSettings {
    pub entry_id: String,
    #[serde(default = "default_friendly_name")]
    pub friendly_name: String,
}

fn default_friendly_name() -> String {
    DEFAULT_FRIENDLY_NAME.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,
    #[serde(default)]
    pub instances: Vec<InstanceSettings>,
}

impl Settings {
    /// A missing file is the default configuration.
    pub fn load(path: &Path) -> LedgerResult<Self> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let data = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&data)
            .map_err(|e| LedgerError::Config(format!("{}: {}", path.display(), e)))?;
        for inst in &settings.instances {
            validate_entry_id(&inst.entry_id)?;
        }
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> LedgerResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| LedgerError::Config(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)?;
        f.write_all(json.as_bytes())?;
        f.sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn storage_dir(&self) -> LedgerResult<PathBuf> {
        match &self.storage_dir {
            Some(dir) => Ok(dir.clone()),
            None => db::default_storage_dir(),
        }
    }

    pub fn instance(&self, entry_id: &str) -> Option<&InstanceSettings> {
        self.instances.iter().find(|i| i.entry_id == entry_id)
    }

    /// First configured instance, or `default` when none is configured.
    pub fn default_entry_id(&self) -> &str {
        self.instances
            .first()
            .map(|i| i.entry_id.as_str())
            .unwrap_or(DEFAULT_ENTRY_ID)
    }

    pub fn friendly_name(&self, entry_id: &str) -> &str {
        self.instance(entry_id)
            .map(|i| i.friendly_name.as_str())
            .unwrap_or(DEFAULT_FRIENDLY_NAME)
    }

    /// Adds or renames an instance.
    pub fn upsert_instance(&mut self, entry_id: &str, friendly_name: &str) -> LedgerResult<()> {
        validate_entry_id(entry_id)?;
        match self.instances.iter_mut().find(|i| i.entry_id == entry_id) {
            Some(i) => i.friendly_name = friendly_name.to_string(),
            None => self.instances.push(InstanceSettings {
                entry_id: entry_id.to_string(),
                friendly_name: friendly_name.to_string(),
            }),
        }
        Ok(())
    }

    pub fn remove_instance(&mut self, entry_id: &str) -> bool {
        let before = self.instances.len();
        self.instances.retain(|i| i.entry_id != entry_id);
        before != self.instances.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, Settings::default());
        assert_eq!(loaded.default_entry_id(), DEFAULT_ENTRY_ID);

        let mut s = Settings {
            storage_dir: Some(dir.path().join("data")),
            instances: Vec::new(),
        };
        s.upsert_instance("home", "Home Purchases").unwrap();
        s.save(&path).unwrap();

        let back = Settings::load(&path).unwrap();
        assert_eq!(back.default_entry_id(), "home");
        assert_eq!(back.friendly_name("home"), "Home Purchases");
        assert_eq!(back.friendly_name("other"), DEFAULT_FRIENDLY_NAME);
        assert_eq!(back.storage_dir().unwrap(), dir.path().join("data"));
    }

    #[test]
    fn rejects_bad_instance_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"instances":[{"entry_id":"../x"}]}"#).unwrap();
        assert!(Settings::load(&path).is_err());

        let mut s = Settings::default();
        assert!(s.upsert_instance("a/b", "x").is_err());
    }
}
