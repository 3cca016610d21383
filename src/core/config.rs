use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

/// Settings for the form page and the upload endpoint
#[derive(Clone)]
pub struct UploadConfig {
    /// Shared secret embedded in the form and required on every upload
    pub auth_token: String,
    /// Directory uploaded files are written into (created on demand)
    pub upload_dir: PathBuf,
    /// Maximum accepted request body in bytes
    pub max_upload_size: usize,
    /// Location of the form template on disk
    pub form_template_path: PathBuf,
}

// Keep the secret out of logs.
impl std::fmt::Debug for UploadConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadConfig")
            .field("auth_token", &"***")
            .field("upload_dir", &self.upload_dir)
            .field("max_upload_size", &self.max_upload_size)
            .field("form_template_path", &self.form_template_path)
            .finish()
    }
}

/// Reads a variable, parsing it when set and falling back to `default` otherwise
fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{} must be a valid number", key)),
        None => Ok(default),
    }
}

fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_lookup(&env_lookup)?,
            database: DatabaseConfig::from_lookup(&env_lookup)?,
            upload: UploadConfig::from_lookup(&env_lookup)?,
        })
    }
}

impl AppConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;

    pub fn from_lookup<F>(lookup: &F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let port = lookup("PORT")
            .map(|raw| raw.parse::<u16>().map_err(|e| format!("Invalid PORT: {}", e)))
            .transpose()?
            .unwrap_or(Self::DEFAULT_PORT);

        Ok(Self { host, port })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    // Default values for database connection pool (conservative defaults for small-medium apps)
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_lookup<F>(lookup: &F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("DATABASE_URL")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "DATABASE_URL must be set".to_string())?;

        Ok(Self {
            url,
            max_connections: parse_or(lookup, "DB_MAX_CONNECTIONS", Self::DEFAULT_MAX_CONNECTIONS)?,
            min_connections: parse_or(lookup, "DB_MIN_CONNECTIONS", Self::DEFAULT_MIN_CONNECTIONS)?,
            acquire_timeout_secs: parse_or(
                lookup,
                "DB_ACQUIRE_TIMEOUT_SECS",
                Self::DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?,
            idle_timeout_secs: parse_or(
                lookup,
                "DB_IDLE_TIMEOUT_SECS",
                Self::DEFAULT_IDLE_TIMEOUT_SECS,
            )?,
            max_lifetime_secs: parse_or(
                lookup,
                "DB_MAX_LIFETIME_SECS",
                Self::DEFAULT_MAX_LIFETIME_SECS,
            )?,
        })
    }
}

impl UploadConfig {
    pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 8 * 1024 * 1024; // 8MB
    const DEFAULT_UPLOAD_DIR: &'static str = "uploads";
    const DEFAULT_FORM_TEMPLATE_PATH: &'static str = "templates/form.html";

    pub fn from_lookup<F>(lookup: &F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        // An empty secret would let an empty `auth` field through
        let auth_token = lookup("AUTH_TOKEN")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "AUTH_TOKEN environment variable is required".to_string())?;

        let upload_dir = lookup("UPLOAD_DIR")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_UPLOAD_DIR.to_string());

        let max_upload_size =
            parse_or(lookup, "MAX_UPLOAD_SIZE", Self::DEFAULT_MAX_UPLOAD_SIZE)?;

        let form_template_path = lookup("FORM_TEMPLATE_PATH")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_FORM_TEMPLATE_PATH.to_string());

        Ok(Self {
            auth_token,
            upload_dir: PathBuf::from(upload_dir),
            max_upload_size,
            form_template_path: PathBuf::from(form_template_path),
        })
    }
}
