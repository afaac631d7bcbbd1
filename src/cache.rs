pub mod local;
pub mod redis;

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;

use crate::error::CacheResult;

/// Type of the key in the cache
pub type KeyType = String;
/// Field mapping stored under a hash key
pub type HashFields = Vec<(&'static str, String)>;

/// A single write command. Several of them form a [`Pipeline`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheCommand {
    /// Set the given fields of the hash at key
    HSet(KeyType, HashFields),
    /// Set the time to live of key
    Expire(KeyType, Duration),
    /// Remove key, whatever its type
    Del(KeyType),
    /// Store a whole string value with a time to live
    SetEx(KeyType, String, Duration),
}

/// Batch of commands applied atomically by a backend
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Pipeline {
    commands: Vec<CacheCommand>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hset(mut self, key: &str, fields: HashFields) -> Self {
        self.commands.push(CacheCommand::HSet(key.to_string(), fields));
        self
    }

    pub fn expire(mut self, key: &str, ttl: Duration) -> Self {
        self.commands.push(CacheCommand::Expire(key.to_string(), ttl));
        self
    }

    pub fn del(mut self, key: &str) -> Self {
        self.commands.push(CacheCommand::Del(key.to_string()));
        self
    }

    pub fn set_ex(mut self, key: &str, value: String, ttl: Duration) -> Self {
        self.commands
            .push(CacheCommand::SetEx(key.to_string(), value, ttl));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[CacheCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<CacheCommand> {
        self.commands
    }
}

#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get every field of the hash at `key`. Empty if absent or expired.
    async fn hget_all(&self, key: &str) -> CacheResult<HashMap<String, String>>;

    /// Get the string value at `key`, `None` if not present or expired
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Run every command of `pipeline` as one atomic unit
    async fn exec(&self, pipeline: Pipeline) -> CacheResult<()>;
}
