//! Wiring & DI. Entry point: load config, bootstrap the Telegram client and
//! the core components, serve the Tool Façade over stdio. No business logic
//! here; authentication itself is handled by the separate `tg-history-login`
//! binary before this process ever starts.

use std::path::PathBuf;
use std::sync::Arc;

use tg_history_mcp::adapters::telegram::client::GrammersTgGateway;
use tg_history_mcp::adapters::TgHistoryServer;
use tg_history_mcp::core::{ChatResolver, HistoryFetcher, ToolFacade};
use tg_history_mcp::ports::TgGateway;
use tg_history_mcp::resource::ResourceManager;
use tg_history_mcp::shared::AppConfig;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv::dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    let cfg = AppConfig::load().unwrap_or_default();

    let api_hash = cfg
        .api_hash
        .clone()
        .or_else(|| std::env::var("TG_HISTORY_API_HASH").ok())
        .unwrap_or_default();
    if api_hash.is_empty() {
        anyhow::bail!("Set TG_HISTORY_API_HASH (env or .env). Get from https://my.telegram.org");
    }

    let data_dir = cfg.data_dir.as_deref().unwrap_or("./data").to_string();
    let data_path = PathBuf::from(&data_dir);
    let session_path = cfg
        .session_path
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(|| data_path.join("session.db"));

    let tg_client = create_telegram_client(&cfg, &session_path).await?;
    let client = Arc::new(Mutex::new(tg_client));

    let authenticated = {
        let guard = client.lock().await;
        guard.is_authorized().await.unwrap_or(false)
    };
    if !authenticated {
        anyhow::bail!(
            "no authorized session at {}; run tg-history-login first",
            session_path.display()
        );
    }

    let gateway: Arc<dyn TgGateway> = Arc::new(GrammersTgGateway::new(Arc::clone(&client)));

    let resolver = Arc::new(ChatResolver::new(
        Arc::clone(&gateway),
        cfg.wait_config(),
        cfg.resolver_cache_enabled(),
    ));

    let artifacts_dir = data_path.join("artifacts");
    let resource_manager = Arc::new(ResourceManager::new(artifacts_dir, cfg.artifact_ttl()));

    let fetcher = Arc::new(HistoryFetcher::new(
        Arc::clone(&gateway),
        Arc::clone(&resource_manager),
        cfg.wait_config(),
        cfg.fetcher_config(),
    ));

    let facade = Arc::new(ToolFacade::new(resolver, fetcher));

    spawn_artifact_sweeper(Arc::clone(&resource_manager));

    let server = TgHistoryServer::new(facade, resource_manager);
    server.serve_stdio().await
}

/// Periodically reclaim expired export artifacts (spec.md §4.F). Runs for
/// the lifetime of the process; the server itself never blocks on it.
fn spawn_artifact_sweeper(resource_manager: Arc<ResourceManager>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(900));
        loop {
            interval.tick().await;
            resource_manager.sweep().await;
        }
    });
}

/// Create a grammers Client with persistent session storage, loading the
/// existing session at `session_path` (created by `tg-history-login`).
async fn create_telegram_client(
    cfg: &AppConfig,
    session_path: &std::path::Path,
) -> anyhow::Result<grammers_client::Client> {
    let api_id = cfg
        .api_id
        .or_else(|| {
            std::env::var("TG_HISTORY_API_ID")
                .ok()
                .and_then(|s| s.parse().ok())
        })
        .unwrap_or(0);

    if api_id == 0 {
        anyhow::bail!(
            "Set TG_HISTORY_API_ID (and TG_HISTORY_API_HASH) in .env. Get from https://my.telegram.org"
        );
    }

    let session = tg_history_mcp::adapters::telegram::session::open_file_session(session_path)
        .await?;
    let session = Arc::new(session);
    let pool = grammers_client::SenderPool::new(session, api_id);
    let handle = pool.handle.clone();
    tokio::spawn(async move {
        pool.runner.run().await;
    });
    let client = grammers_client::Client::new(handle);

    Ok(client)
}
