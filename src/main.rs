use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use vitrine::auth::{self, CredentialGenerator};
use vitrine::blob::{self, LocatorRenderer};
use vitrine::config::ServerConfig;
use vitrine::server::{AppState, create_router};
use vitrine::store::{SqliteStore, Store};
use vitrine::types::User;

#[derive(Parser)]
#[command(name = "vitrine")]
#[command(about = "A multi-tenant image gallery server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// TOML configuration file; flags below override its values
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database and local uploads
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Public base URL for external access (e.g., "https://gallery.example.com").
        /// Prepended to local image URLs. If not set, URLs are root-relative.
        #[arg(long)]
        public_base_url: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Create a user, generating credentials unless both are given
    CreateUser {
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        #[arg(long, requires = "password")]
        user_id: Option<String>,

        #[arg(long, requires = "user_id")]
        password: Option<String>,
    },

    /// List users, oldest first
    ListUsers {
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a user together with their images
    DeleteUser {
        user_id: String,

        /// TOML configuration file of the server whose blobs should be removed
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Overrides the data directory from the configuration file
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

fn open_store(data_dir: &Path) -> anyhow::Result<SqliteStore> {
    fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    let config = ServerConfig {
        data_dir: data_dir.to_path_buf(),
        ..ServerConfig::default()
    };
    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    Ok(store)
}

fn run_create_user(
    data_dir: PathBuf,
    user_id: Option<String>,
    password: Option<String>,
) -> anyhow::Result<()> {
    let store = open_store(&data_dir)?;

    let user = match (user_id, password) {
        (Some(user_id), Some(password)) => auth::add_user(&store, &user_id, &password)?,
        _ => auth::provision_user(&store, &CredentialGenerator::new())?,
    };

    println!();
    println!("========================================");
    println!("User ID:  {}", user.user_id);
    println!("Password: {}", user.password);
    println!("========================================");
    println!();

    Ok(())
}

fn print_users(users: &[User], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(users)?);
        return Ok(());
    }

    if users.is_empty() {
        println!("No users");
        return Ok(());
    }

    println!("{:<16} {:<24} CREATED", "USER ID", "NAME");
    for user in users {
        let name = if user.name.is_empty() { "-" } else { &user.name };
        println!(
            "{:<16} {:<24} {}",
            user.user_id,
            name,
            user.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

fn load_config(
    config_path: Option<&Path>,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<ServerConfig> {
    let mut config = match config_path {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }
    Ok(config)
}

async fn run_delete_user(
    user_id: String,
    config_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = load_config(config_path.as_deref(), data_dir)?;
    config.validate()?;

    let blobs = blob::from_config(&config).await?;
    let renderer = LocatorRenderer::from_config(&config);

    let store = open_store(&config.data_dir)?;
    let locators = store
        .delete_user(&user_id)
        .with_context(|| format!("Failed to delete user '{user_id}'"))?;

    for locator in &locators {
        let canonical = renderer.canonical(locator);
        match blobs.delete(&canonical).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!("Blob {} was already gone", canonical),
            Err(e) => tracing::warn!("Failed to delete blob {}: {}", canonical, e),
        }
    }

    println!("Deleted user '{user_id}' and {} image(s)", locators.len());
    Ok(())
}

async fn run_serve(
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
    public_base_url: Option<String>,
) -> anyhow::Result<()> {
    let mut config = load_config(config_path.as_deref(), data_dir)?;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if public_base_url.is_some() {
        config.public_base_url = public_base_url;
    }
    config.validate()?;

    fs::create_dir_all(&config.data_dir).with_context(|| {
        format!(
            "Failed to create data directory {}",
            config.data_dir.display()
        )
    })?;

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    let blobs = blob::from_config(&config).await?;
    info!("Using {} blob storage", blobs.backend());

    let addr = config.socket_addr()?;
    let state = Arc::new(AppState::new(Arc::new(store), blobs, config));
    let app = create_router(state);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vitrine=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::CreateUser {
                data_dir,
                user_id,
                password,
            } => run_create_user(data_dir, user_id, password)?,
            AdminCommands::ListUsers { data_dir, json } => {
                let store = open_store(&data_dir)?;
                print_users(&store.list_users()?, json)?;
            }
            AdminCommands::DeleteUser {
                user_id,
                config,
                data_dir,
            } => run_delete_user(user_id, config, data_dir).await?,
        },
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
            public_base_url,
        } => run_serve(config, host, port, data_dir, public_base_url).await?,
    }

    Ok(())
}
