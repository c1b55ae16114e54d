mod commands;
mod config;
mod hosted;
mod server;

use std::process;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{
    cmd_filters, cmd_generate, cmd_recipe_delete, cmd_recipe_list, cmd_recipe_show, cmd_user_add,
    cmd_user_delete, cmd_user_list,
};
use crate::config::{Config, StorageArgs};
use pantry_core::models::{RecipeKey, Role};
use pantry_core::service::RecipeService;

#[derive(Parser)]
#[command(
    name = "pantry",
    version,
    about = "Random recipe drafts from an ingredient catalog, with per-user recipe storage"
)]
struct Cli {
    #[command(flatten)]
    storage: StorageArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080", env = "PANTRY_PORT")]
        port: u16,
        /// Address to bind to
        #[arg(long, default_value = "127.0.0.1", env = "PANTRY_BIND")]
        bind: String,
    },
    /// Draw one random choice per ingredient category
    Generate {
        /// Attach the draft to this user (must exist)
        #[arg(short, long)]
        user: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Browse and delete saved recipes
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Show the distinct ingredient choices across a user's recipes
    Filters {
        /// User ID
        #[arg(short, long)]
        user: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Add a user
    Add {
        /// Unique user name
        name: String,
        /// Role: user, coach, admin
        #[arg(short, long, default_value = "user")]
        role: Role,
        #[arg(long)]
        json: bool,
    },
    /// List all users
    List {
        #[arg(long)]
        json: bool,
    },
    /// Delete a user and their recipes
    Delete {
        id: i64,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// List recipes, optionally for one user
    List {
        #[arg(short, long)]
        user: Option<i64>,
        #[arg(long)]
        json: bool,
    },
    /// Show one recipe
    Show {
        /// Owner of the recipe
        #[arg(short, long)]
        user: i64,
        /// Recipe ID
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Delete a recipe by ID or title
    Delete {
        /// Recipe ID
        id: Option<i64>,
        /// Recipe title
        #[arg(long, conflicts_with = "id")]
        title: Option<String>,
        /// Owner of the titled recipe (required by the sqlite and hosted backends)
        #[arg(short, long, requires = "title")]
        user: Option<i64>,
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pantry=info,pantry_core=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.storage)?;
    let catalog = Arc::new(config.load_catalog()?);
    let storage = config.open_storage()?;
    tracing::debug!(backend = ?config.backend, "storage ready");

    let service = RecipeService::new(Arc::clone(&catalog), Arc::clone(&storage));

    match cli.command {
        Commands::Serve { port, bind } => server::start_server(catalog, storage, port, &bind).await,
        Commands::Generate { user, json } => cmd_generate(&service, user, json).await,
        Commands::User { command } => match command {
            UserCommands::Add { name, role, json } => {
                cmd_user_add(&service, &name, role, json).await
            }
            UserCommands::List { json } => cmd_user_list(&service, json).await,
            UserCommands::Delete { id, json } => cmd_user_delete(&service, id, json).await,
        },
        Commands::Recipe { command } => match command {
            RecipeCommands::List { user, json } => cmd_recipe_list(&service, user, json).await,
            RecipeCommands::Show { user, id, json } => {
                cmd_recipe_show(&service, user, id, json).await
            }
            RecipeCommands::Delete {
                id,
                title,
                user,
                json,
            } => {
                let key = match (id, title) {
                    (Some(id), _) => RecipeKey::Id(id),
                    (None, Some(title)) => RecipeKey::Title {
                        user_id: user,
                        title,
                    },
                    (None, None) => bail!("Pass a recipe ID or --title"),
                };
                cmd_recipe_delete(&service, key, json).await
            }
        },
        Commands::Filters { user, json } => cmd_filters(&service, user, json).await,
    }
}
