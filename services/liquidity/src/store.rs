//! In-memory store and the bincode codec layered over any [`KvStore`]

use crate::traits::KvStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use types::Result;

/// `BTreeMap`-backed store; iteration order is key order, like the host's
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.entries.insert(key.to_vec(), value);
    }

    fn delete(&mut self, key: &[u8]) {
        self.entries.remove(key);
    }

    fn prefix_iter<'a>(
        &'a self,
        prefix: &[u8],
    ) -> Box<dyn Iterator<Item = (&'a [u8], &'a [u8])> + 'a> {
        let prefix = prefix.to_vec();
        Box::new(
            self.entries
                .range(prefix.clone()..)
                .take_while(move |(key, _)| key.starts_with(&prefix))
                .map(|(key, value)| (key.as_slice(), value.as_slice())),
        )
    }
}

/// Decode the value at `key`
pub fn load<S, T>(store: &S, key: &[u8]) -> Result<Option<T>>
where
    S: KvStore + ?Sized,
    T: DeserializeOwned,
{
    store
        .get(key)
        .map(|bytes| bincode::deserialize(&bytes))
        .transpose()
        .map_err(Into::into)
}

pub fn save<S, T>(store: &mut S, key: &[u8], value: &T) -> Result<()>
where
    S: KvStore + ?Sized,
    T: Serialize,
{
    let bytes = bincode::serialize(value)?;
    store.set(key, bytes);
    Ok(())
}

/// Lazily decode every value under `prefix`, in key order
pub fn iter_decoded<'a, S, T>(store: &'a S, prefix: &[u8]) -> impl Iterator<Item = Result<T>> + 'a
where
    S: KvStore + ?Sized,
    T: DeserializeOwned + 'a,
{
    store
        .prefix_iter(prefix)
        .map(|(_, bytes)| bincode::deserialize(bytes).map_err(Into::into))
}

pub fn load_all<S, T>(store: &S, prefix: &[u8]) -> Result<Vec<T>>
where
    S: KvStore + ?Sized,
    T: DeserializeOwned,
{
    iter_decoded(store, prefix).collect()
}

/// Remove every entry under `prefix`; returns how many went
pub fn delete_prefix<S>(store: &mut S, prefix: &[u8]) -> usize
where
    S: KvStore + ?Sized,
{
    let keys: Vec<Vec<u8>> = store.prefix_iter(prefix).map(|(k, _)| k.to_vec()).collect();
    for key in &keys {
        store.delete(key);
    }
    keys.len()
}
