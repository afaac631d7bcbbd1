use std::{net::ToSocketAddrs, sync::Arc};

use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::{Context, Result};
use tracing::info;

use crate::{
    api::{configure, ServerState},
    cache::{local::LocalCache, redis::RedisCache, CacheBackend},
    config::{CacheKind, Config, StorageKind},
    keys::CachePolicy,
    propagate::CachePropagator,
    service::StudentService,
    store::{memory::MemoryStore, sqlite::SqliteStore, StudentStore},
};

/// Wire store, cache and workers into a service.
/// Must run inside a tokio runtime since it starts the workers.
pub fn build_service<S, C>(store: Arc<S>, cache: Arc<C>, cfg: &Config) -> StudentService<S, C>
where
    S: StudentStore,
    C: CacheBackend + 'static,
{
    let propagator = CachePropagator::start(cfg.cache.workers, cfg.cache.queue_capacity);
    StudentService::new(store, cache, propagator, CachePolicy::new(cfg.cache.ttl))
}

pub fn start_server<S, C, A>(service: StudentService<S, C>, addrs: A) -> Result<Server>
where
    S: StudentStore + 'static,
    C: CacheBackend + 'static,
    A: ToSocketAddrs,
{
    let appstate = web::Data::new(ServerState::new(service));

    let server = HttpServer::new(move || {
        App::new()
            .app_data(appstate.clone())
            .wrap(Logger::default())
            .configure(configure::<S, C>)
    })
    .bind(addrs)?
    .run();

    Ok(server)
}

async fn serve<S, C>(store: Arc<S>, cache: Arc<C>, cfg: &Config) -> Result<()>
where
    S: StudentStore + 'static,
    C: CacheBackend + 'static,
{
    let service = build_service(store, cache, cfg);
    let server = start_server(service, cfg.http_server.address.as_str())
        .with_context(|| format!("failed to bind {}", cfg.http_server.address))?;

    info!(address = %cfg.http_server.address, env = %cfg.env, "server ready");
    server.await?;
    info!("server exiting");
    Ok(())
}

async fn serve_with_cache<S>(store: Arc<S>, cfg: &Config) -> Result<()>
where
    S: StudentStore + 'static,
{
    match cfg.cache.kind {
        CacheKind::Local => serve(store, Arc::new(LocalCache::new()), cfg).await,
        CacheKind::Redis => {
            // Connects in the background; an unreachable server only costs caching
            let cache = RedisCache::connect(&cfg.cache.redis_url).context("invalid redis url")?;
            serve(store, Arc::new(cache), cfg).await
        }
    }
}

/// Build the configured backends and serve until shutdown
pub async fn run(cfg: Config) -> Result<()> {
    match cfg.storage.kind {
        StorageKind::Memory => serve_with_cache(Arc::new(MemoryStore::new()), &cfg).await,
        StorageKind::Sqlite => {
            let store = SqliteStore::connect(&cfg.storage.url, cfg.storage.max_connections)
                .await
                .context("sqlite setup failed")?;
            serve_with_cache(Arc::new(store), &cfg).await
        }
    }
}
