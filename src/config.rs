use std::env;

use crate::auth::token_service::AuthConfig;
use crate::Result;

#[derive(Clone, Debug)]
pub struct DbConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub user: String,
    pub password: String,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub root_dir: String,
    pub public_url: String,
    pub signing_key: String,
}

#[derive(Clone, Debug)]
pub struct PayosConfig {
    pub client_id: String,
    pub api_key: String,
    pub checksum_key: String,
}

#[derive(Clone)]
pub struct AppConfig {
    pub db: DbConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub payos: PayosConfig,
    pub cohere_api_key: Option<String>,
    pub frontend_url: String,
    pub bind_host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);
        let bind_host = env::var("BIND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        Ok(Self {
            db: DbConfig {
                url: env::var("DB_URL")?,
                namespace: env::var("DB_NS")?,
                database: env::var("DB_NAME")?,
                user: env::var("DB_USER")?,
                password: env::var("DB_PASSWORD")?,
            },
            auth: AuthConfig::from_env()?,
            storage: StorageConfig {
                root_dir: env::var("STORAGE_DIR").unwrap_or_else(|_| "./storage".to_string()),
                public_url: env::var("STORAGE_PUBLIC_URL")
                    .unwrap_or_else(|_| format!("http://localhost:{port}"))
                    .trim_end_matches('/')
                    .to_string(),
                signing_key: env::var("STORAGE_SIGNING_KEY")?,
            },
            payos: PayosConfig {
                client_id: env::var("PAYOS_CLIENT_ID")?,
                api_key: env::var("PAYOS_API_KEY")?,
                checksum_key: env::var("PAYOS_CHECKSUM_KEY")?,
            },
            cohere_api_key: env::var("COHERE_API_KEY").ok().filter(|k| !k.is_empty()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            bind_host,
            port,
        })
    }
}
