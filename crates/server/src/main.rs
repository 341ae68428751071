use db::DBService;
use services::services::claude_api::ClaudeApiClient;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod routes;

use config::Config;

#[derive(Clone)]
pub struct AppState {
    pub db: DBService,
    claude: Option<ClaudeApiClient>,
}

impl AppState {
    /// AI-backed endpoints need a configured client; everything else works
    /// without one.
    pub fn claude(&self) -> Result<&ClaudeApiClient, error::ApiError> {
        self.claude.as_ref().ok_or(error::ApiError::AiUnavailable)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let db = DBService::new(&config.database_url).await?;

    let claude = match ClaudeApiClient::from_env() {
        Ok(client) => Some(client),
        Err(e) => {
            warn!("AI features disabled: {e}");
            None
        }
    };

    let state = AppState { db, claude };
    let app = routes::router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("could not install ctrl-c handler: {e}");
    }
}
