use anyhow::Result;
use evaluation_engine::Config as EvaluationConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub evaluation: EvaluationConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let server_address =
            std::env::var("SERVER_ADDRESS").unwrap_or_else(|_| "0.0.0.0:5000".to_string());

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/judicia".to_string());

        let evaluation = EvaluationConfig::from_env()?;

        Ok(Config {
            server_address,
            database_url,
            evaluation,
        })
    }
}
