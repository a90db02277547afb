use crate::error::{Error, Result};
use crate::services::quiz_validator::ValidationPolicy;
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub quiz_model: String,
    pub image_model: String,
    pub ai_timeout_secs: u64,
    pub generation_rps: u32,
    pub session_ttl_minutes: i64,
    pub max_reference_bytes: usize,
    pub validation_policy: ValidationPolicy,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            gemini_api_key: get_env("GEMINI_API_KEY")?,
            gemini_base_url: get_env_or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
            quiz_model: get_env_or("QUIZ_MODEL", "gemini-3-pro-preview"),
            image_model: get_env_or("IMAGE_MODEL", "gemini-2.5-flash-image"),
            ai_timeout_secs: get_env_parse_or("AI_TIMEOUT_SECS", 180)?,
            generation_rps: get_env_parse_or("GENERATION_RPS", 2)?,
            session_ttl_minutes: get_env_parse_or("SESSION_TTL_MINUTES", 240)?,
            max_reference_bytes: get_env_parse_or("MAX_REFERENCE_BYTES", 512 * 1024)?,
            validation_policy: get_env_parse_or("QUIZ_VALIDATION", ValidationPolicy::Strict)?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
