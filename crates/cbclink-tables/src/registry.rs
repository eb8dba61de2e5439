use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::config::{GroupEntry, SignalEntry, TableConfig};
use crate::error::Result;
use crate::whitelist::Whitelist;

/// Runtime signal and group tables.
///
/// Activation flags are mutated by invalidation commands on the receive
/// path and read by the forwarding path, so each table sits behind its own
/// lock. Whitelists are fixed after construction.
#[derive(Debug, Default)]
pub struct SignalTables {
    signals: Mutex<Vec<SignalEntry>>,
    groups: Mutex<Vec<GroupEntry>>,
    signal_whitelist: Whitelist,
    group_whitelist: Whitelist,
}

fn lock<T>(table: &Mutex<T>) -> MutexGuard<'_, T> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SignalTables {
    /// Empty tables with no whitelist configured.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: TableConfig) -> Self {
        Self {
            signal_whitelist: config.whitelist.signals.into(),
            group_whitelist: config.whitelist.groups.into(),
            signals: Mutex::new(config.signals),
            groups: Mutex::new(config.groups),
        }
    }

    /// Load tables from a JSON document on disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        TableConfig::from_path(path).map(Self::from_config)
    }

    pub fn with_signal_whitelist(mut self, whitelist: Whitelist) -> Self {
        self.signal_whitelist = whitelist;
        self
    }

    pub fn with_group_whitelist(mut self, whitelist: Whitelist) -> Self {
        self.group_whitelist = whitelist;
        self
    }

    pub fn signal_count(&self) -> usize {
        lock(&self.signals).len()
    }

    pub fn group_count(&self) -> usize {
        lock(&self.groups).len()
    }

    /// Byte width of a signal value, or 0 for an unknown id.
    pub fn signal_len(&self, id: u16) -> usize {
        lock(&self.signals)
            .iter()
            .find(|entry| entry.id == id)
            .map_or(0, SignalEntry::byte_len)
    }

    /// Clears the active flag of a signal. Returns false for an unknown id.
    pub fn disable_signal(&self, id: u16) -> bool {
        let mut signals = lock(&self.signals);
        match signals.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.active = false;
                debug!(id, "signal invalidated");
                true
            }
            None => false,
        }
    }

    /// Clears the active flag of a group. Returns false for an unknown id.
    pub fn disable_group(&self, id: u16) -> bool {
        let mut groups = lock(&self.groups);
        match groups.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.active = false;
                debug!(id, "group invalidated");
                true
            }
            None => false,
        }
    }

    /// Unknown signals count as active.
    pub fn is_signal_active(&self, id: u16) -> bool {
        lock(&self.signals)
            .iter()
            .find(|entry| entry.id == id)
            .is_none_or(|entry| entry.active)
    }

    /// Unknown groups count as active.
    pub fn is_group_active(&self, id: u16) -> bool {
        lock(&self.groups)
            .iter()
            .find(|entry| entry.id == id)
            .is_none_or(|entry| entry.active)
    }

    pub fn verify_signal(&self, id: u16) -> bool {
        self.signal_whitelist.verify(id)
    }

    pub fn verify_group(&self, id: u16) -> bool {
        self.group_whitelist.verify(id)
    }

    /// Whitelisted and not invalidated.
    pub fn permits_signal(&self, id: u16) -> bool {
        self.verify_signal(id) && self.is_signal_active(id)
    }

    /// Whitelisted and not invalidated.
    pub fn permits_group(&self, id: u16) -> bool {
        self.verify_group(id) && self.is_group_active(id)
    }

    pub fn signal_whitelist(&self) -> &Whitelist {
        &self.signal_whitelist
    }

    pub fn group_whitelist(&self) -> &Whitelist {
        &self.group_whitelist
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn tables() -> SignalTables {
        let config = TableConfig::from_json_str(
            r#"{
                "signals": [
                    { "id": 1, "len": 8 },
                    { "id": 2, "len": 12 },
                    { "id": 3, "len": 1 }
                ],
                "groups": [{ "id": 100 }],
                "whitelist": { "signals": [1, 3] }
            }"#,
        )
        .unwrap();
        SignalTables::from_config(config)
    }

    #[test]
    fn signal_len_rounds_bits_up() {
        let tables = tables();
        assert_eq!(tables.signal_len(1), 1);
        assert_eq!(tables.signal_len(2), 2);
        assert_eq!(tables.signal_len(3), 1);
        assert_eq!(tables.signal_len(99), 0);
    }

    #[test]
    fn whitelists_follow_config() {
        let tables = tables();
        assert!(tables.verify_signal(1));
        assert!(!tables.verify_signal(2));
        assert!(tables.verify_group(100));
        assert!(tables.verify_group(7));
    }

    #[test]
    fn invalidation_clears_permission() {
        let tables = tables();
        assert!(tables.permits_signal(1));
        assert!(tables.disable_signal(1));
        assert!(!tables.is_signal_active(1));
        assert!(!tables.permits_signal(1));
        assert!(tables.permits_signal(3));
    }

    #[test]
    fn invalidating_unknown_id_is_reported() {
        let tables = tables();
        assert!(!tables.disable_signal(42));
        assert!(!tables.disable_group(42));
        assert!(tables.is_signal_active(42));
    }

    #[test]
    fn group_invalidation() {
        let tables = tables();
        assert!(tables.permits_group(100));
        assert!(tables.disable_group(100));
        assert!(!tables.permits_group(100));
    }

    #[test]
    fn builder_overrides_whitelist() {
        let tables = SignalTables::new().with_signal_whitelist(Whitelist::only([5]));
        assert!(tables.verify_signal(5));
        assert!(!tables.verify_signal(6));
        assert_eq!(tables.signal_count(), 0);
        assert_eq!(tables.group_count(), 0);
    }

    #[test]
    fn shared_across_threads() {
        let tables = Arc::new(tables());
        let writer = Arc::clone(&tables);
        std::thread::spawn(move || {
            writer.disable_signal(3);
        })
        .join()
        .unwrap();
        assert!(!tables.is_signal_active(3));
    }
}
