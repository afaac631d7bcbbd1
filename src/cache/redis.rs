use std::{
    collections::HashMap,
    sync::{Arc, Weak},
    time::Duration,
};

use ::redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands, Client,
};
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::{CacheBackend, CacheCommand, Pipeline};
use crate::error::{CacheError, CacheResult};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const CONNECT_RETRIES: usize = 2;
const RECONNECT_EVERY: Duration = Duration::from_secs(5);

/// Cache backend on a Redis server.
///
/// The connection is opened by a background task, so the server comes up
/// even while Redis is down; until then every call fails with
/// `CacheError::Unavailable`. Once open, the connection manager multiplexes
/// every request over one connection and reconnects on its own. Clones
/// share it.
#[derive(Clone)]
pub struct RedisCache {
    conn: Arc<OnceCell<ConnectionManager>>,
}

impl RedisCache {
    /// Only fails on a malformed url. Must run inside a tokio runtime.
    pub fn connect(url: &str) -> CacheResult<Self> {
        let client = Client::open(url)?;
        let conn = Arc::new(OnceCell::new());
        tokio::spawn(keep_connecting(
            client,
            url.to_string(),
            Arc::downgrade(&conn),
        ));
        Ok(Self { conn })
    }

    pub fn is_connected(&self) -> bool {
        self.conn.initialized()
    }

    fn handle(&self) -> CacheResult<ConnectionManager> {
        self.conn
            .get()
            .cloned()
            .ok_or_else(|| CacheError::Unavailable("redis not connected".into()))
    }
}

/// Retry until connected, or until every handle on the cache is gone
async fn keep_connecting(client: Client, url: String, cell: Weak<OnceCell<ConnectionManager>>) {
    let config = ConnectionManagerConfig::new()
        .set_connection_timeout(CONNECT_TIMEOUT)
        .set_number_of_retries(CONNECT_RETRIES);
    loop {
        if cell.strong_count() == 0 {
            return;
        }
        match client.get_connection_manager_with_config(config.clone()).await {
            Ok(manager) => {
                if let Some(cell) = cell.upgrade() {
                    let _ = cell.set(manager);
                    info!(url = %url, "connected to redis");
                }
                return;
            }
            Err(err) => {
                warn!(url = %url, error = %err, "redis unreachable, caching disabled");
                tokio::time::sleep(RECONNECT_EVERY).await;
            }
        }
    }
}

/// Redis rejects a zero expiry
fn secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

fn build(pipeline: Pipeline) -> ::redis::Pipeline {
    let mut pipe = ::redis::pipe();
    pipe.atomic();
    for command in pipeline.into_commands() {
        match command {
            CacheCommand::HSet(key, fields) => {
                pipe.hset_multiple(key, &fields).ignore();
            }
            CacheCommand::Expire(key, ttl) => {
                pipe.expire(key, secs(ttl) as i64).ignore();
            }
            CacheCommand::Del(key) => {
                pipe.del(key).ignore();
            }
            CacheCommand::SetEx(key, value, ttl) => {
                pipe.set_ex(key, value, secs(ttl)).ignore();
            }
        }
    }
    pipe
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn hget_all(&self, key: &str) -> CacheResult<HashMap<String, String>> {
        let mut conn = self.handle()?;
        let fields: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(fields)
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.handle()?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn exec(&self, pipeline: Pipeline) -> CacheResult<()> {
        if pipeline.is_empty() {
            return Ok(());
        }
        let mut conn = self.handle()?;
        let _: () = build(pipeline).query_async(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_ttl_is_clamped() {
        assert_eq!(secs(Duration::ZERO), 1);
        assert_eq!(secs(Duration::from_millis(1500)), 1);
        assert_eq!(secs(Duration::from_secs(600)), 600);
    }

    #[test]
    fn pipeline_is_atomic_and_ordered() {
        let pipe = build(
            Pipeline::new()
                .del("student:1")
                .hset("student:1", vec![("id", "1".to_string())])
                .expire("student:1", Duration::from_secs(60)),
        );
        let packed = String::from_utf8_lossy(&pipe.get_packed_pipeline()).to_string();

        let multi = packed.find("MULTI").unwrap();
        let del = packed.find("DEL").unwrap();
        let hset = packed.find("HMSET").unwrap();
        let expire = packed.find("EXPIRE").unwrap();
        let exec = packed.find("EXEC").unwrap();
        assert!(multi < del && del < hset && hset < expire && expire < exec);
    }

    #[tokio::test]
    async fn unreachable_server_reports_unavailable() {
        let cache = RedisCache::connect("redis://127.0.0.1:1").unwrap();
        assert!(!cache.is_connected());
        assert!(matches!(
            cache.get("students_list").await,
            Err(CacheError::Unavailable(_))
        ));
        assert!(matches!(
            cache.exec(Pipeline::new().del("student:1")).await,
            Err(CacheError::Unavailable(_))
        ));
    }

    #[test]
    fn malformed_url_is_rejected() {
        assert!(matches!(
            RedisCache::connect("not a url"),
            Err(CacheError::Redis(_))
        ));
    }
}
