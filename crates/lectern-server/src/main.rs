//! lectern server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store and serves the JSON API over HTTP. Subcommands cover account
//! administration:
//!
//! ```text
//! lectern create-superuser --email admin@example.com --username admin
//! lectern create-moderator --email mod@example.com --username mod
//! lectern hash-password
//! ```

mod gateway;
mod settings;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use lectern_api::{AppState, auth::hash_password};
use lectern_core::{account::NewUser, notify::LogNotifier, store::UserStore};
use lectern_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{gateway::HttpGateway, settings::ServerConfig};

#[derive(Parser)]
#[command(author, version, about = "Lectern learning-management server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the API (the default).
  Serve,
  /// Create an administrator account; the password is read from stdin.
  CreateSuperuser {
    #[arg(long)]
    email:    String,
    #[arg(long)]
    username: String,
  },
  /// Create an account in the moderators group; the password is read from
  /// stdin.
  CreateModerator {
    #[arg(long)]
    email:    String,
    #[arg(long)]
    username: String,
  },
  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(&cli.config).await,
    Command::CreateSuperuser { email, username } => {
      create_account(&cli.config, email, username, true).await
    }
    Command::CreateModerator { email, username } => {
      create_account(&cli.config, email, username, false).await
    }
    Command::HashPassword => {
      let password = read_password()?;
      let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
      println!("{hash}");
      Ok(())
    }
  }
}

async fn open_store(config: &ServerConfig) -> anyhow::Result<SqliteStore> {
  let store_path = expand_tilde(&config.store_path);
  SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))
}

async fn serve(config_path: &Path) -> anyhow::Result<()> {
  let config = ServerConfig::load(config_path).context("failed to load configuration")?;
  let store = open_store(&config).await?;
  let gateway = HttpGateway::new(&config.checkout).context("invalid checkout settings")?;

  let state = AppState::new(store, gateway, LogNotifier);
  let app = lectern_api::api_router(state).layer(TraceLayer::new_for_http());
  let address = config.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  Ok(())
}

/// Create a superuser, or a moderator when `superuser` is false. An existing
/// account with the same email is left alone.
async fn create_account(
  config_path: &Path,
  email:       String,
  username:    String,
  superuser:   bool,
) -> anyhow::Result<()> {
  let config = ServerConfig::load(config_path).context("failed to load configuration")?;
  let store = open_store(&config).await?;

  if store.get_credentials(&email).await?.is_some() {
    println!("account {email} already exists");
    return Ok(());
  }

  let password = read_password()?;
  let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
  let mut input = NewUser::new(username, email.clone(), hash);
  input.is_superuser = superuser;

  let user = store.create_user(input).await.context("failed to create account")?;
  if !superuser {
    store.set_moderator(user.id, true).await.context("failed to grant moderator")?;
  }

  tracing::info!(user = %user.id, superuser, "account created");
  println!("created account {email}");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::warn!(error = %e, "cannot listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
}

/// Read a password from stdin (no echo).
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  let password = line.trim_end_matches('\n').trim_end_matches('\r').to_string();
  anyhow::ensure!(!password.is_empty(), "password must not be empty");
  Ok(password)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
