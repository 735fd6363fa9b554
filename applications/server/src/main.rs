/// Tether Server - Google sign-in and account linking
use clap::{Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tether_core::{NewUser, UserStore};
use tether_server::{
    api,
    config::ServerConfig,
    services::{AuthService, GoogleOAuthClient},
    state::AppState,
};
use tether_storage::SqliteUserStore;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tether-server")]
#[command(about = "Google sign-in and account linking server", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./config.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve,
    /// Create a user that signs in with a username
    AddUser {
        /// Username
        #[arg(short, long)]
        username: String,
        /// Email address
        #[arg(short, long)]
        email: Option<String>,
    },
    /// List all users
    ListUsers,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tether_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::load_from(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve => {
            serve(config).await?;
        }
        Commands::AddUser { username, email } => {
            add_user(&config, username, email).await?;
        }
        Commands::ListUsers => {
            list_users(&config).await?;
        }
    }

    Ok(())
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    config.validate()?;

    tracing::info!("Starting Tether Server");
    tracing::info!("Host: {}", config.server.host);
    tracing::info!("Port: {}", config.server.port);

    // Initialize database
    let store = SqliteUserStore::connect(&config.storage.database_url).await?;
    let store: Arc<dyn UserStore> = Arc::new(store);
    tracing::info!("Database connected");

    // Initialize auth service
    let auth_service = AuthService::new(
        config.auth.jwt_secret.clone(),
        config.auth.jwt_expiration_hours,
        config.auth.jwt_refresh_expiration_days,
    )
    .with_state_expiration_minutes(config.auth.state_token_expiration_minutes);
    let auth_service = Arc::new(auth_service);
    tracing::info!("Auth service initialized");

    // Google client is built once and shared by every request
    let google = Arc::new(GoogleOAuthClient::new(config.google.clone())?);
    tracing::info!("Google OAuth client initialized");

    // Build application state
    let app_state = AppState::new(store, auth_service, google)
        .with_public_url(config.server.public_url.clone());

    let app = api::router(app_state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false)),
        )
        .layer(CorsLayer::permissive());

    // Create server address
    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    tracing::info!("Server listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn add_user(
    config: &ServerConfig,
    username: String,
    email: Option<String>,
) -> anyhow::Result<()> {
    let store = SqliteUserStore::connect(&config.storage.database_url).await?;

    let user = store
        .create_user(NewUser {
            username: Some(username),
            email,
            ..NewUser::default()
        })
        .await?;

    println!("Created user {}", user.id);

    Ok(())
}

async fn list_users(config: &ServerConfig) -> anyhow::Result<()> {
    let store = SqliteUserStore::connect(&config.storage.database_url).await?;

    let users = store.list_users().await?;

    println!("Users:");
    for user in users {
        let providers: Vec<&str> = user.providers.iter().map(|p| p.name.as_str()).collect();
        println!(
            "  {} - {} [{}]",
            user.id,
            user.username
                .as_deref()
                .or(user.name.as_deref())
                .unwrap_or("(unnamed)"),
            providers.join(", ")
        );
    }

    Ok(())
}
