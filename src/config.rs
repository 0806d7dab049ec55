use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Base URL under which uploaded objects are publicly readable.
    pub public_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub cookie_secure: bool,
    pub max_upload_bytes: usize,
    pub cors_origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "ticketdesk".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "ticketdesk-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES").unwrap_or(60 * 24 * 7),
        };

        let endpoint = std::env::var("S3_ENDPOINT")?;
        let bucket = std::env::var("S3_BUCKET")?;
        let public_url = std::env::var("S3_PUBLIC_URL")
            .unwrap_or_else(|_| format!("{}/{}", endpoint.trim_end_matches('/'), bucket));
        let storage = StorageConfig {
            access_key: std::env::var("S3_ACCESS_KEY")?,
            secret_key: std::env::var("S3_SECRET_KEY")?,
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            public_url,
            endpoint,
            bucket,
        };

        let max_upload_mb: usize = env_parse("MAX_UPLOAD_MB").unwrap_or(100);

        Ok(Self {
            database_url,
            jwt,
            storage,
            cookie_secure: env_parse("COOKIE_SECURE").unwrap_or(true),
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            cors_origin: std::env::var("CORS_ORIGIN").ok().filter(|v| !v.is_empty()),
        })
    }

    pub fn max_upload_mb(&self) -> usize {
        self.max_upload_bytes / (1024 * 1024)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
