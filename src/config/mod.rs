use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub enable_cors: bool,
    /// Upper bound for request bodies, sized to fit the largest media category
    /// plus multipart framing overhead.
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Base URL under which public objects are reachable.
    pub public_base_url: String,
    /// Bucket name reported back to upload callers.
    pub bucket: String,
    /// Filesystem root for the local object store backend.
    pub storage_root: String,
    /// Secret for HMAC-signed access URLs.
    pub signing_secret: String,
    /// Lifetime of a signed access URL.
    pub signed_url_ttl_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("TIDEPOOL_PORT").or_else(|_| env::var("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("SERVER_ENABLE_CORS") {
            self.server.enable_cors = v.parse().unwrap_or(self.server.enable_cors);
        }
        if let Ok(v) = env::var("SERVER_MAX_BODY_BYTES") {
            self.server.max_body_bytes = v.parse().unwrap_or(self.server.max_body_bytes);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout_secs =
                v.parse().unwrap_or(self.database.connection_timeout_secs);
        }

        // Media overrides
        if let Ok(v) = env::var("MEDIA_PUBLIC_BASE_URL") {
            self.media.public_base_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("MEDIA_BUCKET") {
            self.media.bucket = v;
        }
        if let Ok(v) = env::var("MEDIA_STORAGE_ROOT") {
            self.media.storage_root = v;
        }
        if let Ok(v) = env::var("MEDIA_SIGNING_SECRET") {
            self.media.signing_secret = v;
        }
        if let Ok(v) = env::var("MEDIA_SIGNED_URL_TTL_SECS") {
            self.media.signed_url_ttl_secs = v.parse().unwrap_or(self.media.signed_url_ttl_secs);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                enable_cors: true,
                max_body_bytes: 32 * 1024 * 1024,
            },
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout_secs: 30,
            },
            media: MediaConfig {
                public_base_url: "http://localhost:3000/media".to_string(),
                bucket: "tidepool-media".to_string(),
                storage_root: "./data/media".to_string(),
                signing_secret: "dev-only-signing-secret".to_string(),
                signed_url_ttl_secs: 3600,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 3000,
                enable_cors: true,
                max_body_bytes: 32 * 1024 * 1024,
            },
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout_secs: 10,
            },
            media: MediaConfig {
                public_base_url: "https://media.staging.tidepool.example".to_string(),
                bucket: "tidepool-media-staging".to_string(),
                storage_root: "/var/lib/tidepool/media".to_string(),
                signing_secret: String::new(), // must come from env
                signed_url_ttl_secs: 3600,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 3000,
                enable_cors: false,
                max_body_bytes: 32 * 1024 * 1024,
            },
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout_secs: 5,
            },
            media: MediaConfig {
                public_base_url: "https://media.tidepool.example".to_string(),
                bucket: "tidepool-media".to_string(),
                storage_root: "/var/lib/tidepool/media".to_string(),
                signing_secret: String::new(), // must come from env
                signed_url_ttl_secs: 3600,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
