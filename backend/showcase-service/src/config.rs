//! Service configuration loaded from the environment.

use db_pool::{env_optional, env_or, DbConfig, EnvError};
use std::path::PathBuf;

const SERVICE_NAME: &str = "showcase-service";
const DEV_DATABASE_URL: &str = "postgres://localhost/showcase";
const DEV_JWT_SECRET: &str = "development-only-secret-change-me";
const MIN_PRODUCTION_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] EnvError),
    #[error("JWT_SECRET must be set to at least {} bytes in production", MIN_PRODUCTION_SECRET_LEN)]
    WeakJwtSecret,
    #[error("unknown STORE_BACKEND {0:?} (expected \"postgres\" or \"memory\")")]
    UnknownStoreBackend(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DbConfig,
    pub store_backend: StoreBackend,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub worker: WorkerConfig,
    pub media: MediaToolsConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub host: String,
    pub port: u16,
    /// Emit JSON log lines instead of the human format
    pub json_logs: bool,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    /// Process-local store; state is lost on restart
    Memory,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub root: PathBuf,
    pub max_file_size_mb: u64,
}

impl StorageConfig {
    pub fn max_file_size_bytes(&self) -> usize {
        (self.max_file_size_mb as usize) * 1024 * 1024
    }
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_expire_minutes: i64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("access_token_expire_minutes", &self.access_token_expire_minutes)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_count: usize,
    pub queue_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct MediaToolsConfig {
    pub ffprobe_path: PathBuf,
    pub ffmpeg_path: PathBuf,
    pub probe_timeout_secs: u64,
    pub intro_image: Option<PathBuf>,
    pub outro_image: Option<PathBuf>,
    pub watermark_image: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let app = AppConfig {
            env: env_or("APP_ENV", "development".to_string())?,
            host: env_or("APP_HOST", "0.0.0.0".to_string())?,
            port: env_or("APP_PORT", 8000)?,
            json_logs: env_or("LOG_FORMAT", "text".to_string())?.eq_ignore_ascii_case("json"),
        };

        let store_backend = match env_or("STORE_BACKEND", "postgres".to_string())?
            .to_ascii_lowercase()
            .as_str()
        {
            "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => return Err(ConfigError::UnknownStoreBackend(other.to_string())),
        };

        let database_fallback = (!app.is_production()).then_some(DEV_DATABASE_URL);
        let database = match store_backend {
            StoreBackend::Postgres => DbConfig::from_env(SERVICE_NAME, database_fallback)?,
            StoreBackend::Memory => DbConfig {
                service_name: SERVICE_NAME.to_string(),
                ..DbConfig::default()
            },
        };

        let jwt_secret = match env_optional::<String>("JWT_SECRET")? {
            Some(secret) => secret,
            None if !app.is_production() => DEV_JWT_SECRET.to_string(),
            None => return Err(ConfigError::WeakJwtSecret),
        };
        if app.is_production() && jwt_secret.len() < MIN_PRODUCTION_SECRET_LEN {
            return Err(ConfigError::WeakJwtSecret);
        }

        Ok(Config {
            database,
            store_backend,
            storage: StorageConfig {
                root: env_or("STORAGE_PATH", PathBuf::from("./storage"))?,
                max_file_size_mb: env_or("MAX_FILE_SIZE_MB", 100)?,
            },
            auth: AuthConfig {
                jwt_secret,
                access_token_expire_minutes: env_or("ACCESS_TOKEN_EXPIRE_MINUTES", 60)?,
            },
            worker: WorkerConfig {
                worker_count: env_or("WORKER_COUNT", 1usize)?.max(1),
                queue_capacity: env_or("JOB_QUEUE_CAPACITY", 100usize)?.max(1),
            },
            media: MediaToolsConfig {
                ffprobe_path: env_or("FFPROBE_PATH", PathBuf::from("ffprobe"))?,
                ffmpeg_path: env_or("FFMPEG_PATH", PathBuf::from("ffmpeg"))?,
                probe_timeout_secs: env_or("PROBE_TIMEOUT_SECS", 30)?,
                intro_image: env_optional("BRAND_INTRO_PATH")?,
                outro_image: env_optional("BRAND_OUTRO_PATH")?,
                watermark_image: env_optional("WATERMARK_PATH")?,
            },
            app,
        })
    }
}
