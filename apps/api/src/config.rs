use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

/// Deployment environment, read from `APP_ENV` (falls back to `NODE_ENV`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(raw: Option<String>) -> Self {
        match raw.as_deref().map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("production") => Environment::Production,
            _ => Environment::Development,
        }
    }
}

/// Outbound mail settings handed to the mailer at construction.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_pass: String,
    pub from_email: String,
    pub from_name: String,
    /// Fixed recipient of every application notification.
    pub to_email: String,
    pub timeout: Duration,
    /// Only ever true outside production. `SMTP_ACCEPT_INVALID_CERTS` is
    /// silently ignored when `APP_ENV=production`.
    pub accept_invalid_certs: bool,
}

/// Application configuration loaded from environment variables.
/// Every value has a default; only malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub mail: MailConfig,
    pub upload_dir: PathBuf,
    pub static_dir: PathBuf,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = Environment::parse(var("APP_ENV").or_else(|| var("NODE_ENV")));

        let smtp_user = var("SMTP_USER").unwrap_or_default();
        let from_email = var("FROM_EMAIL").unwrap_or_else(|| smtp_user.clone());
        let to_email = var("TO_EMAIL").unwrap_or_else(|| from_email.clone());

        let wants_invalid_certs = var("SMTP_ACCEPT_INVALID_CERTS")
            .map(|v| parse_bool(&v))
            .transpose()
            .context("SMTP_ACCEPT_INVALID_CERTS must be true or false")?
            .unwrap_or(false);

        let mail = MailConfig {
            smtp_host: var("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
            smtp_port: var("SMTP_PORT")
                .unwrap_or_else(|| "587".to_string())
                .parse::<u16>()
                .context("SMTP_PORT must be a valid port number")?,
            smtp_user,
            smtp_pass: var("SMTP_PASS").unwrap_or_default(),
            from_email,
            from_name: var("FROM_NAME").unwrap_or_else(|| "Careers Website".to_string()),
            to_email,
            timeout: Duration::from_secs(
                var("SMTP_TIMEOUT_SECS")
                    .unwrap_or_else(|| "30".to_string())
                    .parse::<u64>()
                    .context("SMTP_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            accept_invalid_certs: wants_invalid_certs && environment != Environment::Production,
        };

        Ok(Config {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: var("PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            environment,
            mail,
            upload_dir: var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join("careers-uploads")),
            static_dir: var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("public")),
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address '{}:{}'", self.host, self.port))
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("unrecognised boolean '{other}'"),
    }
}
