//! `nemis` server binary and admin commands.
//!
//! Reads `config.toml` (or the path given with `--config`), layered with
//! `NEMIS_*` environment variables, and opens the SQLite store.
//!
//! ```text
//! nemis serve
//! nemis import-locations --file locations.csv
//! nemis create-user admin --superuser
//! nemis create-user cs1 --role cabinet_secretary --first-name Ezekiel
//! nemis set-active cs1 --active false
//! nemis hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::{ArgAction, Parser, Subcommand};
use nemis_core::{
  identity::{NewIdentity, Role},
  import::parse_locations_csv,
  store::SchoolStore,
};
use nemis_store_sqlite::SqliteStore;
use nemis_web::{AppState, ServerConfig, auth::hash_password, mail::LogMailer};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "NEMIS school management server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve HTTP (the default).
  Serve,

  /// Load counties, subcounties and wards from a CSV file. Safe to re-run.
  ImportLocations {
    #[arg(long)]
    file: PathBuf,
  },

  /// Create a login account. The password is read from stdin.
  CreateUser {
    username: String,
    #[arg(long, required_unless_present = "superuser")]
    role: Option<Role>,
    #[arg(long)]
    superuser: bool,
    #[arg(long, default_value = "")]
    first_name: String,
    #[arg(long, default_value = "")]
    last_name: String,
    #[arg(long, default_value = "")]
    email: String,
    #[arg(long)]
    county_id: Option<i64>,
    #[arg(long)]
    sub_county_id: Option<i64>,
    #[arg(long)]
    school_id: Option<i64>,
  },

  /// Enable or disable login for an account.
  SetActive {
    username: String,
    #[arg(long, action = ArgAction::Set)]
    active: bool,
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
  let command = cli.command.unwrap_or(Command::Serve);

  if let Command::HashPassword = command {
    let password = read_password_from_stdin()?;
    println!("{}", hash_password(&password)?);
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("NEMIS")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("allowed_hosts"),
    )
    .build()
    .context("failed to read config file")?;
  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match command {
    Command::Serve | Command::HashPassword => serve(store, server_cfg).await,
    Command::ImportLocations { file } => {
      let text = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("failed to read {file:?}"))?;
      let rows = parse_locations_csv(&text).context("invalid locations file")?;
      let summary = store
        .import_locations(rows)
        .await
        .context("location import failed")?;
      tracing::info!(
        rows = summary.rows,
        skipped = summary.skipped,
        counties = summary.counties_created,
        sub_counties = summary.sub_counties_created,
        wards = summary.wards_created,
        "locations imported"
      );
      Ok(())
    }
    Command::CreateUser {
      username,
      role,
      superuser,
      first_name,
      last_name,
      email,
      county_id,
      sub_county_id,
      school_id,
    } => {
      let password = read_password_from_stdin()?;
      anyhow::ensure!(!password.is_empty(), "password must not be empty");
      let input = NewIdentity {
        username,
        password_hash: hash_password(&password)?,
        first_name,
        last_name,
        email,
        role,
        is_superuser: superuser,
        county_id,
        sub_county_id,
        school_id,
      };
      input.validate()?;
      let identity = store
        .create_identity(input)
        .await
        .context("failed to create user")?;
      tracing::info!(id = identity.id, username = %identity.username, "user created");
      Ok(())
    }
    Command::SetActive { username, active } => {
      store
        .set_identity_active(&username, active)
        .await
        .with_context(|| format!("failed to update {username}"))?;
      Ok(())
    }
  }
}

async fn serve(store: SqliteStore, server_cfg: ServerConfig) -> anyhow::Result<()> {
  let state = AppState {
    store:  Arc::new(store),
    mailer: Arc::new(LogMailer { from: server_cfg.mail_from.clone() }),
    config: Arc::new(ServerConfig {
      media_dir: expand_tilde(&server_cfg.media_dir),
      ..server_cfg.clone()
    }),
  };

  let app = nemis_web::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password_from_stdin() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  eprint!("Password: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
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
