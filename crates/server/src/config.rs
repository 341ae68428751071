/// Runtime configuration, read once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse()?,
            Err(_) => 3001,
        };
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:crewdesk.db".to_string());
        Ok(Self {
            host,
            port,
            database_url,
        })
    }
}
