use std::collections::HashMap;

use async_trait::async_trait;
use tokio::{sync::Mutex, time::Instant};
use tracing::debug;

use super::{CacheBackend, CacheCommand, KeyType, Pipeline};
use crate::error::CacheResult;

#[derive(Clone, Debug)]
enum Value {
    Hash(HashMap<String, String>),
    Str(String),
}

/// Struct that describe a cached entity
#[derive(Clone, Debug)]
struct Entry {
    value: Value,
    /// Until when the data should be available. `None` never expires.
    exp_time: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.exp_time, Some(exp) if exp <= now)
    }
}

/// In-process cache backend. A single lock around the map makes every
/// pipeline atomic with respect to readers.
#[derive(Default)]
pub struct LocalCache {
    map: Mutex<HashMap<KeyType, Entry>>,
}

impl LocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.map
            .lock()
            .await
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub async fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut map = self.map.lock().await;
        live(&mut map, key, now).is_some()
    }

    fn apply(map: &mut HashMap<KeyType, Entry>, command: CacheCommand, now: Instant) {
        match command {
            CacheCommand::HSet(key, fields) => {
                let fields = fields.into_iter().map(|(f, v)| (f.to_string(), v));
                match live(map, &key, now) {
                    Some(Entry {
                        value: Value::Hash(hash),
                        ..
                    }) => hash.extend(fields),
                    _ => {
                        // Absent, expired or of another type: start a fresh hash
                        map.insert(
                            key,
                            Entry {
                                value: Value::Hash(fields.collect()),
                                exp_time: None,
                            },
                        );
                    }
                }
            }
            CacheCommand::Expire(key, ttl) => {
                if let Some(entry) = live(map, &key, now) {
                    entry.exp_time = Some(now + ttl);
                }
            }
            CacheCommand::Del(key) => {
                map.remove(&key);
            }
            CacheCommand::SetEx(key, value, ttl) => {
                map.insert(
                    key,
                    Entry {
                        value: Value::Str(value),
                        exp_time: Some(now + ttl),
                    },
                );
            }
        }
    }
}

/// Get the entry at `key`, removing it first if the expiration was reached
fn live<'a>(map: &'a mut HashMap<KeyType, Entry>, key: &str, now: Instant) -> Option<&'a mut Entry> {
    if map.get(key).is_some_and(|entry| entry.is_expired(now)) {
        map.remove(key);
        debug!(key, "key expired");
        return None;
    }
    map.get_mut(key)
}

#[async_trait]
impl CacheBackend for LocalCache {
    async fn hget_all(&self, key: &str) -> CacheResult<HashMap<String, String>> {
        let now = Instant::now();
        let mut map = self.map.lock().await;
        match live(&mut map, key, now) {
            Some(Entry {
                value: Value::Hash(hash),
                ..
            }) => Ok(hash.clone()),
            _ => Ok(HashMap::new()),
        }
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        let mut map = self.map.lock().await;
        match live(&mut map, key, now) {
            Some(Entry {
                value: Value::Str(value),
                ..
            }) => Ok(Some(value.clone())),
            _ => Ok(None),
        }
    }

    async fn exec(&self, pipeline: Pipeline) -> CacheResult<()> {
        let now = Instant::now();
        let mut map = self.map.lock().await;
        // Sweep keys that expired without being read again
        map.retain(|_, entry| !entry.is_expired(now));
        for command in pipeline.into_commands() {
            Self::apply(&mut map, command, now);
        }
        Ok(())
    }
}
