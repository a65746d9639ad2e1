use crate::{
    error::{
        Error,
        Result,
    },
    ledger::Address,
    skins::{
        SkinPreferences,
        SkinRepository,
        decode_preferences,
        encode_preferences,
    },
};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
    },
};

/// Keeps the encoded blobs in memory, so it goes through the same parse path
/// as the durable store.
#[derive(Clone, Default)]
pub struct InMemorySkinRepository {
    entries: Arc<Mutex<HashMap<Address, Vec<u8>>>>,
}

impl InMemorySkinRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Arc<Mutex<HashMap<Address, Vec<u8>>>> {
        self.entries.clone()
    }

    /// Stores bytes as-is, bypassing encoding.
    pub fn insert_raw(&self, account: &Address, bytes: Vec<u8>) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.insert(account.clone(), bytes);
        }
    }
}

impl SkinRepository for InMemorySkinRepository {
    fn load(&self, account: &Address) -> Result<Option<SkinPreferences>> {
        let guard = self
            .entries
            .lock()
            .map_err(|err| Error::Storage(err.to_string()))?;
        guard
            .get(account)
            .map(|bytes| decode_preferences(bytes))
            .transpose()
    }

    fn save(&mut self, account: &Address, preferences: &SkinPreferences) -> Result<()> {
        let bytes = encode_preferences(preferences)?;
        let mut guard = self
            .entries
            .lock()
            .map_err(|err| Error::Storage(err.to_string()))?;
        guard.insert(account.clone(), bytes);
        Ok(())
    }
}
