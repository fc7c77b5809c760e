//! One-time interactive login/2FA setup. Not part of the MCP tool surface
//! (spec.md §1: authentication is an external, out-of-band concern) — run
//! this once to populate the session file `tg-history-mcp` then reads on
//! every launch.
//!
//! Grounded on the teacher's `AuthService`/`GrammersAuthAdapter` split
//! (`usecases/auth_service.rs`, `adapters/telegram/auth_adapter.rs`): the
//! phone -> code -> optional 2FA password flow is driven through `AuthPort`
//! exactly as the teacher intended, with the interactive prompting that
//! repo's skeleton left unimplemented filled in here.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use tg_history_mcp::adapters::telegram::auth_adapter::GrammersAuthAdapter;
use tg_history_mcp::domain::SignInResult;
use tg_history_mcp::ports::AuthPort;
use tg_history_mcp::shared::AppConfig;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cfg = AppConfig::load().unwrap_or_default();

    let api_id = cfg
        .api_id
        .or_else(|| {
            std::env::var("TG_HISTORY_API_ID")
                .ok()
                .and_then(|s| s.parse().ok())
        })
        .unwrap_or(0);
    let api_hash = cfg
        .api_hash
        .clone()
        .or_else(|| std::env::var("TG_HISTORY_API_HASH").ok())
        .unwrap_or_default();
    if api_id == 0 || api_hash.is_empty() {
        anyhow::bail!(
            "Set TG_HISTORY_API_ID and TG_HISTORY_API_HASH (env or .env). Get from https://my.telegram.org"
        );
    }

    let data_dir = cfg.data_dir.as_deref().unwrap_or("./data").to_string();
    let data_path = PathBuf::from(&data_dir);
    let session_path = cfg
        .session_path
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(|| data_path.join("session.db"));

    let session = tg_history_mcp::adapters::telegram::session::open_file_session(&session_path)
        .await?;
    let session = Arc::new(session);
    let pool = grammers_client::SenderPool::new(session, api_id);
    let handle = pool.handle.clone();
    tokio::spawn(async move {
        pool.runner.run().await;
    });
    let client = Arc::new(Mutex::new(grammers_client::Client::new(handle)));

    let auth = GrammersAuthAdapter::new(Arc::clone(&client));

    if auth.is_authenticated().await? {
        info!(path = %session_path.display(), "already authorized, nothing to do");
        return Ok(());
    }

    let phone = prompt("Phone number (international format, e.g. +15551234567): ")?;
    auth.request_login_code(&phone, &api_hash).await?;

    let code = prompt("Login code (sent via Telegram/SMS): ")?;
    match auth.sign_in(&code).await? {
        SignInResult::Success => {}
        SignInResult::PasswordRequired { hint } => {
            if let Some(hint) = hint {
                println!("Two-factor password hint: {hint}");
            }
            let password = prompt("Two-factor password: ")?;
            auth.check_password(password.as_bytes()).await?;
        }
    }

    info!(path = %session_path.display(), "login complete, session saved");
    println!("Signed in. Session saved to {}", session_path.display());
    Ok(())
}

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
