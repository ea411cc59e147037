use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_days: i64,
}

/// Where uploaded donation photos end up.
#[derive(Debug, Clone, Deserialize)]
pub enum StorageConfig {
    /// Files on local disk, served back under `/uploads`.
    Local { upload_dir: PathBuf },
    /// S3 or MinIO bucket.
    S3 {
        endpoint: String,
        bucket: String,
        access_key: String,
        secret_key: String,
        region: String,
        public_url: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| get(key).with_context(|| format!("{} must be set", key));

        let database_url = required("DATABASE_URL")?;
        let database_max_connections = get("DATABASE_MAX_CONNECTIONS")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "foodhive".into()),
            audience: get("JWT_AUDIENCE").unwrap_or_else(|| "foodhive-users".into()),
            ttl_days: get("JWT_TTL_DAYS")
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(30),
        };

        let storage = match get("STORAGE_BACKEND").as_deref().unwrap_or("local") {
            "local" => StorageConfig::Local {
                upload_dir: get("UPLOAD_DIR")
                    .unwrap_or_else(|| "uploads".into())
                    .into(),
            },
            "s3" => {
                let endpoint = required("S3_ENDPOINT")?;
                StorageConfig::S3 {
                    bucket: required("S3_BUCKET")?,
                    access_key: required("S3_ACCESS_KEY")?,
                    secret_key: required("S3_SECRET_KEY")?,
                    region: get("S3_REGION").unwrap_or_else(|| "us-east-1".into()),
                    public_url: get("S3_PUBLIC_URL").unwrap_or_else(|| endpoint.clone()),
                    endpoint,
                }
            }
            other => anyhow::bail!("unknown STORAGE_BACKEND {:?}", other),
        };

        Ok(Self {
            database_url,
            database_max_connections,
            jwt,
            storage,
        })
    }
}
