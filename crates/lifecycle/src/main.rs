//! Plugin lifecycle CLI
//!
//! Installs, uninstalls and inspects the BrainDrive Basic AI Chat plugin for
//! individual users of the host database.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use plugin_lifecycle::Config;
use plugin_lifecycle::db;
use plugin_lifecycle::plugin::{
    InitializerRegistry, LifecycleManager, PluginInstallInitializer, PluginManifest,
    PluginRegistry, cli,
};

#[derive(Debug, Parser)]
#[command(name = "plugin-lifecycle", version, about)]
struct Cli {
    /// Database URL (overrides DATABASE_URL).
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Plugin manifest to use instead of the bundled one (overrides PLUGIN_MANIFEST).
    #[arg(long, global = true)]
    manifest: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Install the plugin for a user.
    Install {
        #[arg(long)]
        user: String,
    },
    /// Uninstall the plugin for a user.
    Uninstall {
        #[arg(long)]
        user: String,
    },
    /// Show whether the plugin is installed for a user.
    Status {
        #[arg(long)]
        user: String,
    },
    /// List every plugin installed for a user.
    List {
        #[arg(long)]
        user: String,
    },
    /// Print the metadata handed to the host plugin registry.
    Metadata,
    /// Run the per-user initializers for a new account.
    InitUser {
        #[arg(long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let args = Cli::parse();

    let mut config = Config::from_env().context("failed to load configuration")?;
    if let Some(url) = args.database_url {
        config.database_url = url;
    }
    if let Some(path) = args.manifest {
        config.manifest_path = Some(path);
    }

    let manifest = PluginManifest::load(config.manifest_path.as_deref())
        .context("failed to load plugin manifest")?;

    let pool = db::create_pool(&config).await?;
    db::ensure_schema(&pool).await?;
    info!(
        plugin = %manifest.plugin_slug,
        version = %manifest.version,
        "database ready"
    );

    let manager = Arc::new(LifecycleManager::new(pool.clone(), manifest));

    match args.command {
        Command::Install { user } => cli::cmd_install(&manager, &user).await,
        Command::Uninstall { user } => cli::cmd_uninstall(&manager, &user).await,
        Command::Status { user } => cli::cmd_status(&manager, &user).await,
        Command::List { user } => cli::cmd_list(&pool, &user).await,
        Command::Metadata => {
            let mut registry = PluginRegistry::new();
            registry.register(manager)?;
            cli::cmd_metadata(&registry)
        }
        Command::InitUser { user } => {
            let mut initializers = InitializerRegistry::new();
            initializers.register(Arc::new(PluginInstallInitializer::new(manager)))?;
            cli::cmd_init_user(&initializers, &pool, &user).await
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
