use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TableError};

/// Bounds applied while loading a table document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadLimits {
    /// Maximum bytes allowed in a table file.
    pub max_file_size: usize,
    /// Maximum entries per table (signals, groups, each whitelist).
    pub max_entries: usize,
}

impl Default for LoadLimits {
    fn default() -> Self {
        Self {
            max_file_size: 256 * 1024,
            max_entries: 4096,
        }
    }
}

fn active() -> bool {
    true
}

/// One signal definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignalEntry {
    pub id: u16,
    /// Width of the signal value in bits.
    pub len: u16,
    #[serde(default = "active")]
    pub active: bool,
}

impl SignalEntry {
    /// Bytes occupied by the value on the wire.
    pub fn byte_len(&self) -> usize {
        (self.len as usize).div_ceil(8)
    }
}

/// One signal group definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupEntry {
    pub id: u16,
    #[serde(default)]
    pub len: u16,
    #[serde(default = "active")]
    pub active: bool,
}

/// Whitelists; an absent list lets every id through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WhitelistConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signals: Option<Vec<u16>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<u16>>,
}

/// The static table document.
///
/// ```json
/// {
///   "signals": [{ "id": 16, "len": 12 }, { "id": 17, "len": 1, "active": false }],
///   "groups": [{ "id": 256 }],
///   "whitelist": { "signals": [16] }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    #[serde(default)]
    pub signals: Vec<SignalEntry>,
    #[serde(default)]
    pub groups: Vec<GroupEntry>,
    #[serde(default)]
    pub whitelist: WhitelistConfig,
}

impl TableConfig {
    /// Parse a table document with default limits.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_json_str_with_limits(json, LoadLimits::default())
    }

    /// Parse a table document with explicit limits.
    pub fn from_json_str_with_limits(json: &str, limits: LoadLimits) -> Result<Self> {
        if json.len() > limits.max_file_size {
            return Err(TableError::LoadFailed(format!(
                "table document too large ({} bytes)",
                json.len()
            )));
        }
        let config: TableConfig = serde_json::from_str(json)?;
        config.validate(limits)?;
        Ok(config)
    }

    /// Load a table document from a file with default limits.
    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_path_with_limits(path, LoadLimits::default())
    }

    /// Load a table document from a file with explicit limits.
    pub fn from_path_with_limits(path: &Path, limits: LoadLimits) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|err| {
            TableError::LoadFailed(format!("failed opening {}: {err}", path.display()))
        })?;
        let metadata = file
            .metadata()
            .map_err(|err| TableError::LoadFailed(err.to_string()))?;
        if metadata.len() > limits.max_file_size as u64 {
            return Err(TableError::LoadFailed(format!(
                "table file too large ({} bytes): {}",
                metadata.len(),
                path.display()
            )));
        }

        let read_limit = u64::try_from(limits.max_file_size.saturating_add(1)).unwrap_or(u64::MAX);
        let mut content = String::new();
        file.take(read_limit)
            .read_to_string(&mut content)
            .map_err(|err| {
                TableError::LoadFailed(format!("failed reading {}: {err}", path.display()))
            })?;

        Self::from_json_str_with_limits(&content, limits)
    }

    /// Reject duplicate ids and over-long tables.
    pub fn validate(&self, limits: LoadLimits) -> Result<()> {
        check_table("signal", self.signals.iter().map(|s| s.id), limits)?;
        check_table("group", self.groups.iter().map(|g| g.id), limits)?;
        if let Some(ids) = &self.whitelist.signals {
            check_table("signal whitelist", ids.iter().copied(), limits)?;
        }
        if let Some(ids) = &self.whitelist.groups {
            check_table("group whitelist", ids.iter().copied(), limits)?;
        }
        Ok(())
    }
}

fn check_table(
    table: &'static str,
    ids: impl ExactSizeIterator<Item = u16>,
    limits: LoadLimits,
) -> Result<()> {
    let count = ids.len();
    if count > limits.max_entries {
        return Err(TableError::TooManyEntries {
            table,
            count,
            max: limits.max_entries,
        });
    }
    let mut seen = HashSet::with_capacity(count);
    for id in ids {
        if !seen.insert(id) {
            return Err(TableError::DuplicateId { table, id });
        }
    }
    Ok(())
}
