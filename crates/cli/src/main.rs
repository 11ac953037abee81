//! ChinChin CLI - browse the catalog, manage the cart and administer content
//! from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (password from --password, CHINCHIN_PASSWORD or stdin)
//! chinchin login -e lan@chinchin.vn
//!
//! # Browse, falling back to the local cache when offline
//! chinchin products list
//! chinchin posts show 12
//!
//! # Cart
//! chinchin cart add 7 --quantity 2
//! chinchin cart show
//!
//! # Admin
//! chinchin categories create '{"name": "Orchids"}'
//! chinchin posts rate 12 5
//!
//! # Local cache
//! chinchin cache status
//! ```
//!
//! # Environment Variables
//!
//! - `CHINCHIN_API_URL`, `CHINCHIN_STORE_PATH`, `CHINCHIN_REQUEST_TIMEOUT_SECS`,
//!   `CHINCHIN_CACHE_TTL_DAYS` - client configuration
//! - `RUST_LOG` - log filter (default: `warn`)
//! - `CHINCHIN_LOG_JSON` - set to `1` for JSON log lines
//! - `SENTRY_DSN` - report warnings and errors to Sentry

#![cfg_attr(not(test), forbid(unsafe_code))]

use chinchin_client::{ChinChinClient, ClientConfig};
use chinchin_core::EntityId;
use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "chinchin")]
#[command(author, version, about = "ChinChin storefront client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session locally
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password (read from stdin if omitted)
        #[arg(short, long, env = "CHINCHIN_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Catalog products
    Products {
        #[command(subcommand)]
        action: ResourceAction,
    },
    /// Product categories
    Categories {
        #[command(subcommand)]
        action: ResourceAction,
    },
    /// Blog categories
    PostCategories {
        #[command(subcommand)]
        action: ResourceAction,
    },
    /// Blog posts
    Posts {
        #[command(subcommand)]
        action: PostAction,
    },
    /// Shopping cart of the signed-in user
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Local offline cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
pub enum ResourceAction {
    /// List all records
    List,
    /// Show one record
    Show { id: EntityId },
    /// Create a record from a JSON object
    Create { json: String },
    /// Update fields of a record from a JSON object
    Update { id: EntityId, json: String },
    /// Delete a record
    Delete { id: EntityId },
}

#[derive(Subcommand)]
enum PostAction {
    #[command(flatten)]
    Crud(ResourceAction),
    /// Rate a post from 1 to 5
    Rate { id: EntityId, rating: u8 },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a product
    Add {
        product_id: EntityId,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a product
    Remove { product_id: EntityId },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show what is cached and when it expires
    Status,
    /// Drop every cached collection
    Purge,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|v| !v.is_empty())?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));
    Some(guard)
}

/// Map tracing levels to Sentry: WARN and above become events, INFO and DEBUG
/// breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(with_sentry: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn".into());
    let json = std::env::var("CHINCHIN_LOG_JSON")
        .is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));

    let (plain, json) = if json {
        (
            None,
            Some(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
        )
    } else {
        (
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
            None,
        )
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(plain)
        .with(json)
        .with(with_sentry.then(|| sentry_tracing::layer().event_filter(sentry_event_filter)))
        .init();
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let sentry_guard = init_sentry();
    init_tracing(sentry_guard.is_some());

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    let client = ChinChinClient::new(&config)?;
    let notifier = commands::Notifier::spawn(&client);

    let result = dispatch(&client, cli.command).await;

    notifier.finish().await;
    result
}

async fn dispatch(client: &ChinChinClient, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Login { email, password } => {
            commands::session::login(client, &email, password).await?;
        }
        Commands::Logout => commands::session::logout(client).await?,
        Commands::Whoami => commands::session::whoami(client).await?,
        Commands::Products { action } => commands::resource::run(client.products(), action).await?,
        Commands::Categories { action } => {
            commands::resource::run(client.categories(), action).await?;
        }
        Commands::PostCategories { action } => {
            commands::resource::run(client.post_categories(), action).await?;
        }
        Commands::Posts { action } => match action {
            PostAction::Crud(action) => commands::resource::run(client.posts(), action).await?,
            PostAction::Rate { id, rating } => commands::resource::rate(client, &id, rating).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(client).await?,
            CartAction::Add {
                product_id,
                quantity,
            } => commands::cart::add(client, &product_id, quantity).await?,
            CartAction::Remove { product_id } => commands::cart::remove(client, &product_id).await?,
        },
        Commands::Cache { action } => match action {
            CacheAction::Status => commands::cache::status(client)?,
            CacheAction::Purge => commands::cache::purge(client)?,
        },
    }
    Ok(())
}
