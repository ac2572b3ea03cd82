//! Persisted state.
//!
//! A key/value table stored either in a backup RAM region (primary) or
//! a named file (fallback). A magic word marks a valid header; anything
//! else means a cold start. The table carries the most recent state
//! path and the serialized settings.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::hal::FileSys;

/// Magic marking a valid persisted-state header.
pub const STATE_MAGIC: u32 = 0x0512_1968;

/// Fallback file name when no backup region is available.
pub const STATE_FILE: &str = "state.cfg";

/// Well-known keys.
pub mod keys {
    /// Path of the most recently loaded state file.
    pub const STATE_PATH: &str = "state_path";
    /// Serialized user settings.
    pub const SETTINGS: &str = "settings";
    /// Hash of the settings at last save.
    pub const SETTINGS_HASH: &str = "settings_hash";
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    magic: u32,
    entries: Vec<(String, Vec<u8>)>,
}

/// The in-memory key/value table.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StateStore {
    entries: HashMap<String, Vec<u8>>,
}

impl StateStore {
    /// Empty store.
    pub fn new() -> StateStore {
        StateStore::default()
    }

    /// Store raw bytes under a key.
    pub fn put(&mut self, key: &str, value: Vec<u8>) {
        self.entries.insert(key.to_owned(), value);
    }

    /// Raw bytes under a key.
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Serialize with the magic header.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut entries: Vec<(String, Vec<u8>)> = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort();
        let header = Header {
            magic: STATE_MAGIC,
            entries,
        };
        bincode::serialize(&header).expect("in-memory serialization")
    }

    /// Parse a serialized table; `None` when the magic is wrong or the
    /// bytes are malformed, meaning cold start.
    pub fn from_bytes(bytes: &[u8]) -> Option<StateStore> {
        let header: Header = bincode::deserialize(bytes).ok()?;
        if header.magic != STATE_MAGIC {
            return None;
        }
        Some(StateStore {
            entries: header.entries.into_iter().collect(),
        })
    }

    /// Serialize the user settings into the table.
    pub fn put_settings(&mut self, settings: &rpl_core::settings::Settings) {
        if let Ok(bytes) = bincode::serialize(settings) {
            self.put(keys::SETTINGS, bytes);
            self.put(
                keys::SETTINGS_HASH,
                settings.render_hash().to_le_bytes().to_vec(),
            );
        }
    }

    /// Recover the user settings, `None` on absence or format drift.
    pub fn settings(&self) -> Option<rpl_core::settings::Settings> {
        bincode::deserialize(self.get(keys::SETTINGS)?).ok()
    }

    /// Write to the fallback file through the filesystem contract.
    pub fn save_file(&self, fs: &mut dyn FileSys) -> Result<(), crate::hal::FileError> {
        fs.open(STATE_FILE, true)?;
        let bytes = self.to_bytes();
        let mut written = 0;
        while written < bytes.len() {
            written += fs.write(&bytes[written..])?;
        }
        fs.close();
        Ok(())
    }

    /// Load from the fallback file; `None` on absence or corruption.
    pub fn load_file(fs: &mut dyn FileSys) -> Option<StateStore> {
        if !fs.find(STATE_FILE) {
            return None;
        }
        fs.open(STATE_FILE, false).ok()?;
        let mut bytes = Vec::new();
        let mut buf = [0u8; 256];
        loop {
            match fs.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => bytes.extend_from_slice(&buf[..n]),
                Err(_) => {
                    fs.close();
                    return None;
                }
            }
        }
        fs.close();
        StateStore::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let mut store = StateStore::new();
        store.put(keys::STATE_PATH, b"home/main.rpl".to_vec());
        store.put(keys::SETTINGS_HASH, vec![1, 2, 3, 4]);
        let bytes = store.to_bytes();
        let back = StateStore::from_bytes(&bytes).unwrap();
        assert_eq!(back, store);
    }

    #[test]
    fn settings_round_trip_through_the_table() {
        let mut settings = rpl_core::settings::Settings::default();
        settings.precision = 34;
        settings.word_size = 16;
        let mut store = StateStore::new();
        store.put_settings(&settings);
        let back = store.settings().unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn wrong_magic_means_cold_start() {
        let mut store = StateStore::new();
        store.put("k", vec![0]);
        let mut bytes = store.to_bytes();
        // Corrupt the header.
        bytes[0] ^= 0xff;
        assert!(StateStore::from_bytes(&bytes).is_none());
        assert!(StateStore::from_bytes(&[]).is_none());
    }
}
