use std::path::PathBuf;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use storefront::settings::{ServerSettings, Settings};
use storefront::{auth, routes, AppState};

/// Storefront backend: product catalog, homepage hero and media uploads.
#[derive(Parser, Debug)]
#[command(name = "storefront", version)]
struct Cli {
    /// Settings file; defaults to `appsettings.{toml,json,yaml}` if present.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Print an argon2 hash to put in `admin.password_hash`.
    HashPassword { password: String },
}

fn build_cors(server: &ServerSettings) -> Cors {
    let cors = Cors::default()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600);
    if server.cors_origins.is_empty() {
        return cors.allow_any_origin();
    }
    server
        .cors_origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    if let Some(Command::HashPassword { password }) = &cli.command {
        let hash = auth::hash_password(password)
            .map_err(|e| anyhow::anyhow!("failed to hash password: {}", e))?;
        println!("{}", hash);
        return Ok(());
    }

    let settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    if settings.admin.password_hash.is_empty() {
        warn!("admin.password_hash is empty; admin login is disabled");
    }

    let state = web::Data::new(
        AppState::init(settings.clone())
            .await
            .context("failed to initialize storage")?,
    );
    let bind = (settings.server.host.clone(), settings.server.port);

    info!("Starting HTTP server on http://{}:{}", bind.0, bind.1);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(build_cors(&settings.server))
            .app_data(state.clone())
            .configure(routes::configure)
            .configure(routes::configure_files(&settings))
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}
