use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use env_store_server::adapter::handler::{self, AppState};
use env_store_server::adapter::repository::{
    CachePolicy, CachedEnvVariableRepository, EnvVariablePostgresRepository,
    InMemoryEnvVariableRepository,
};
use env_store_server::domain::repository::EnvVariableRepository;
use env_store_server::infrastructure::cache::{
    EnvVariableCache, InMemoryEnvVariableCache, RedisEnvVariableCache,
};
use env_store_server::infrastructure::config::{CacheBackend, Config};
use env_store_server::infrastructure::database;
use env_store_server::infrastructure::logging::init_logger;
use env_store_server::infrastructure::reconciler::CacheReconciler;
use env_store_server::usecase::{ExportEnvFileUseCase, SeedEnvVariablesUseCase};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Config
    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/config.yaml".to_string());
    let mut cfg = Config::load(&config_path)?;
    cfg.apply_env_overrides();

    // Logger
    init_logger(&cfg.app.environment, &cfg.log.format);

    info!(
        app_name = %cfg.app.name,
        version = %cfg.app.version,
        environment = %cfg.app.environment,
        "starting env store server"
    );

    // Store: PostgreSQL if DATABASE_URL or database config is set, otherwise in-memory
    let database_url = std::env::var("DATABASE_URL")
        .ok()
        .filter(|url| !url.is_empty())
        .or_else(|| cfg.database.as_ref().map(|db| db.connection_url()));
    let store: Arc<dyn EnvVariableRepository> = if let Some(url) = database_url {
        info!("connecting to PostgreSQL...");
        let (max_connections, connect_timeout) = cfg.database.as_ref().map_or((10, 5), |db| {
            (db.max_open_conns, db.connect_timeout_secs)
        });
        let pool =
            database::connect(&url, max_connections, Duration::from_secs(connect_timeout)).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("connected to PostgreSQL, migrations applied");
        Arc::new(EnvVariablePostgresRepository::new(pool))
    } else {
        warn!("no database configured, using in-memory store (data is lost on restart)");
        Arc::new(InMemoryEnvVariableRepository::new())
    };

    // Cache: Redis if configured and reachable, otherwise in-process
    let cache = build_cache(&cfg).await;
    let policy = CachePolicy {
        store_timeout: Duration::from_millis(cfg.store.timeout_ms),
        cache_timeout: Duration::from_millis(cfg.cache.timeout_ms),
        read_retries: cfg.store.read_retries,
    };
    let repo = Arc::new(CachedEnvVariableRepository::with_policy(store, cache, policy));

    // Seed: .env ファイルと管理対象キーのうち未登録のものだけを登録する
    let seed_uc = Arc::new(SeedEnvVariablesUseCase::new(
        repo.clone(),
        &cfg.env_file.path,
        cfg.runtime_env.managed.clone(),
    ));
    if cfg.env_file.load_on_startup {
        let seeded = seed_uc.execute().await?;
        info!(
            from_env_file = seeded.from_env_file,
            managed = seeded.managed,
            "initial environment variables seeded"
        );
    } else {
        seed_uc.ensure_managed().await?;
    }

    // Store -> cache 同期（失敗してもキャッシュを迂回して起動する）
    match repo.sync_cache().await {
        Ok(count) => info!(count, "cache synchronized from store"),
        Err(e) => warn!(error = %e, "initial cache sync failed, serving from store"),
    }

    // Background reconciler
    let reconciler = cfg.reconcile.enabled.then(|| {
        let reconciler = CacheReconciler::new(
            repo.clone(),
            Duration::from_secs(cfg.reconcile.interval_secs),
        );
        let handle = reconciler.start();
        (reconciler, handle)
    });

    // HTTP server
    let state = AppState::new(repo.clone(), seed_uc);
    let mut app = handler::router(state);
    if let Some(cors) = handler::cors_layer(&cfg.server.cors_origins) {
        app = app.layer(cors);
    }

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!("REST server starting on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Shutdown
    if let Some((reconciler, handle)) = reconciler {
        reconciler.stop();
        if let Err(e) = handle.await {
            warn!(error = %e, "reconciler task ended abnormally");
        }
    }

    if cfg.env_file.export_on_shutdown {
        let export_uc = ExportEnvFileUseCase::new(repo, &cfg.env_file.path, cfg.env_file.backup);
        match export_uc.execute().await {
            Ok(result) => info!(
                count = result.count,
                backup = ?result.backup,
                "environment variables exported on shutdown"
            ),
            Err(e) => warn!(error = %e, "failed to export environment variables on shutdown"),
        }
    }

    info!("env store server stopped");
    Ok(())
}

async fn build_cache(cfg: &Config) -> Arc<dyn EnvVariableCache> {
    let in_process = || -> Arc<dyn EnvVariableCache> {
        info!(
            max_capacity = cfg.cache.max_capacity,
            ttl_secs = cfg.cache.ttl_secs,
            "in-process cache initialized"
        );
        Arc::new(InMemoryEnvVariableCache::new(
            cfg.cache.max_capacity,
            cfg.cache.ttl_secs,
        ))
    };

    if cfg.cache.backend != CacheBackend::Redis {
        return in_process();
    }
    let Some(url) = cfg.cache.redis_url.as_deref() else {
        warn!("redis cache selected but no redis_url configured, falling back to in-process cache");
        return in_process();
    };

    let ttl = Duration::from_secs(cfg.cache.ttl_secs);
    match tokio::time::timeout(Duration::from_secs(5), RedisEnvVariableCache::connect(url, ttl))
        .await
    {
        Ok(Ok(cache)) => {
            info!(ttl_secs = cfg.cache.ttl_secs, "redis cache connected");
            Arc::new(cache)
        }
        Ok(Err(e)) => {
            warn!(error = %e, "redis unreachable, falling back to in-process cache");
            in_process()
        }
        Err(_) => {
            warn!("redis connection timed out, falling back to in-process cache");
            in_process()
        }
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
