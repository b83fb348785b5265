use crate::oracle::OracleBackend;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, net::SocketAddr, path::PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub db_path: PathBuf,

    pub oracle_backend: OracleBackend,
    pub oracle_api_key: Option<String>,
    pub oracle_model: String,
    pub oracle_base_url: Option<String>,
    pub oracle_temperature: f32,
    pub oracle_max_tokens: u32,
    pub oracle_timeout_ms: u64,
    pub oracle_max_retries: u32,

    /// Empty host puts the email transport in no-op mode.
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_starttls: bool,
    pub email_from: String,

    pub fcm_project_id: Option<String>,
    pub fcm_access_token: Option<String>,
    pub fcm_timeout_ms: u64,

    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            db_path: PathBuf::from("./data/listings.db"),
            oracle_backend: OracleBackend::Gemini,
            oracle_api_key: None,
            oracle_model: OracleBackend::Gemini.default_model().to_string(),
            oracle_base_url: None,
            oracle_temperature: 1.0,
            oracle_max_tokens: 8192,
            oracle_timeout_ms: 30_000,
            oracle_max_retries: 0,
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_starttls: true,
            email_from: "Matutor <no-reply@localhost>".to_string(),
            fcm_project_id: None,
            fcm_access_token: None,
            fcm_timeout_ms: 10_000,
            log_dir: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let bind_addr = optional_env("BIND_ADDR")
            .as_deref()
            .map(parse_socket_addr)
            .transpose()
            .context("Invalid BIND_ADDR")?
            .unwrap_or(defaults.bind_addr);

        let db_path = optional_env("DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let oracle_backend = optional_env("ORACLE_BACKEND")
            .as_deref()
            .map(parse_oracle_backend)
            .transpose()?
            .unwrap_or(defaults.oracle_backend);

        let oracle_model = optional_env("ORACLE_MODEL")
            .unwrap_or_else(|| oracle_backend.default_model().to_string());

        let oracle_temperature = optional_env("ORACLE_TEMPERATURE")
            .as_deref()
            .map(parse_temperature)
            .transpose()?
            .unwrap_or(defaults.oracle_temperature);

        let oracle_max_tokens = optional_env("ORACLE_MAX_TOKENS")
            .as_deref()
            .map(parse_u32)
            .transpose()
            .context("Invalid ORACLE_MAX_TOKENS")?
            .unwrap_or(defaults.oracle_max_tokens);

        let oracle_timeout_ms = optional_env("ORACLE_TIMEOUT_MS")
            .as_deref()
            .map(parse_u64)
            .transpose()
            .context("Invalid ORACLE_TIMEOUT_MS")?
            .unwrap_or(defaults.oracle_timeout_ms);

        let oracle_max_retries = optional_env("ORACLE_MAX_RETRIES")
            .as_deref()
            .map(parse_u32)
            .transpose()
            .context("Invalid ORACLE_MAX_RETRIES")?
            .unwrap_or(defaults.oracle_max_retries);

        let smtp_port = optional_env("SMTP_PORT")
            .as_deref()
            .map(parse_u16)
            .transpose()
            .context("Invalid SMTP_PORT")?
            .unwrap_or(defaults.smtp_port);

        let smtp_starttls = optional_env("SMTP_STARTTLS")
            .as_deref()
            .map(parse_bool)
            .transpose()
            .context("Invalid SMTP_STARTTLS")?
            .unwrap_or(defaults.smtp_starttls);

        let fcm_timeout_ms = optional_env("FCM_TIMEOUT_MS")
            .as_deref()
            .map(parse_u64)
            .transpose()
            .context("Invalid FCM_TIMEOUT_MS")?
            .unwrap_or(defaults.fcm_timeout_ms);

        Ok(Self {
            bind_addr,
            db_path,
            oracle_backend,
            oracle_api_key: optional_env("ORACLE_API_KEY"),
            oracle_model,
            oracle_base_url: optional_env("ORACLE_BASE_URL"),
            oracle_temperature,
            oracle_max_tokens,
            oracle_timeout_ms,
            oracle_max_retries,
            smtp_host: optional_env("SMTP_HOST").unwrap_or(defaults.smtp_host),
            smtp_port,
            smtp_username: optional_env("SMTP_USERNAME"),
            smtp_password: optional_env("SMTP_PASSWORD"),
            smtp_starttls,
            email_from: optional_env("EMAIL_FROM").unwrap_or(defaults.email_from),
            fcm_project_id: optional_env("FCM_PROJECT_ID"),
            fcm_access_token: optional_env("FCM_ACCESS_TOKEN"),
            fcm_timeout_ms,
            log_dir: optional_env("LOG_DIR").map(PathBuf::from),
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|v| {
        let v = v.trim().to_string();
        if v.is_empty() {
            None
        } else {
            Some(v)
        }
    })
}

fn parse_oracle_backend(value: &str) -> Result<OracleBackend> {
    match value.trim().to_lowercase().as_str() {
        "gemini" => Ok(OracleBackend::Gemini),
        "openai" => Ok(OracleBackend::OpenAi),
        "anthropic" => Ok(OracleBackend::Anthropic),
        "mock" => Ok(OracleBackend::Mock),
        other => Err(anyhow!("Invalid ORACLE_BACKEND: {other}")),
    }
}

fn parse_socket_addr(value: &str) -> Result<SocketAddr> {
    value
        .trim()
        .parse::<SocketAddr>()
        .map_err(|err| anyhow!("Invalid socket address '{value}': {err}"))
}

fn parse_u16(value: &str) -> Result<u16> {
    value
        .trim()
        .parse::<u16>()
        .map_err(|err| anyhow!("Invalid port '{value}': {err}"))
}

fn parse_u32(value: &str) -> Result<u32> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|err| anyhow!("Invalid integer '{value}': {err}"))
}

fn parse_u64(value: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|err| anyhow!("Invalid integer '{value}': {err}"))
}

fn parse_temperature(value: &str) -> Result<f32> {
    let v = value
        .trim()
        .parse::<f32>()
        .map_err(|err| anyhow!("Invalid float '{value}': {err}"))?;

    if !(0.0..=2.0).contains(&v) {
        return Err(anyhow!("ORACLE_TEMPERATURE must be in 0..=2"));
    }

    Ok(v)
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        other => Err(anyhow!("Invalid boolean '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for k in [
            "BIND_ADDR",
            "DB_PATH",
            "ORACLE_BACKEND",
            "ORACLE_API_KEY",
            "ORACLE_MODEL",
            "ORACLE_BASE_URL",
            "ORACLE_TEMPERATURE",
            "ORACLE_MAX_TOKENS",
            "ORACLE_TIMEOUT_MS",
            "ORACLE_MAX_RETRIES",
            "SMTP_HOST",
            "SMTP_PORT",
            "SMTP_USERNAME",
            "SMTP_PASSWORD",
            "SMTP_STARTTLS",
            "EMAIL_FROM",
            "FCM_PROJECT_ID",
            "FCM_ACCESS_TOKEN",
            "FCM_TIMEOUT_MS",
            "LOG_DIR",
        ] {
            std::env::remove_var(k);
        }
    }

    #[test]
    fn from_env_uses_defaults() {
        let _g = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();

        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert_eq!(cfg.db_path, PathBuf::from("./data/listings.db"));
        assert_eq!(cfg.oracle_backend, OracleBackend::Gemini);
        assert_eq!(cfg.oracle_model, "gemini-1.5-flash-latest");
        assert_eq!(cfg.oracle_max_tokens, 8192);
        assert_eq!(cfg.oracle_max_retries, 0);
        assert!(cfg.smtp_host.is_empty());
        assert!(cfg.smtp_starttls);
        assert_eq!(cfg.fcm_timeout_ms, 10_000);
        assert_eq!(cfg.oracle_timeout_ms, 30_000);
    }

    #[test]
    fn model_defaults_follow_backend() {
        let _g = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        std::env::set_var("ORACLE_BACKEND", "OpenAI");

        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.oracle_backend, OracleBackend::OpenAi);
        assert_eq!(cfg.oracle_model, "gpt-4o-mini");

        std::env::set_var("ORACLE_MODEL", "gpt-4o");
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.oracle_model, "gpt-4o");
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let _g = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();

        std::env::set_var("ORACLE_BACKEND", "bard");
        let err = Config::from_env().unwrap_err().to_string();
        assert!(err.contains("ORACLE_BACKEND"));
        clear_env();

        std::env::set_var("SMTP_PORT", "smtp");
        let err = format!("{:#}", Config::from_env().unwrap_err());
        assert!(err.contains("SMTP_PORT"));
        clear_env();

        std::env::set_var("ORACLE_TEMPERATURE", "3");
        assert!(Config::from_env().is_err());
    }

    #[test]
    fn bool_parsing_accepts_multiple_spellings() {
        let _g = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        std::env::set_var("SMTP_STARTTLS", "no");
        std::env::set_var("FCM_TIMEOUT_MS", "2500");
        std::env::set_var("BIND_ADDR", "127.0.0.1:3000");

        let cfg = Config::from_env().unwrap();
        assert!(!cfg.smtp_starttls);
        assert_eq!(cfg.fcm_timeout_ms, 2500);
        assert_eq!(cfg.oracle_timeout_ms, 30_000);
        assert_eq!(cfg.bind_addr.to_string(), "127.0.0.1:3000");
    }

    #[test]
    fn blank_values_are_ignored() {
        let _g = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        std::env::set_var("ORACLE_API_KEY", "   ");
        std::env::set_var("SMTP_HOST", "");

        let cfg = Config::from_env().unwrap();
        assert!(cfg.oracle_api_key.is_none());
        assert!(cfg.smtp_host.is_empty());
    }
}
