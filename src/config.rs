use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use crate::error::{PipelineError, Result};

pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 15_000;

#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct SummaryConfig {
    pub lines: usize,
    pub language: String,
    pub max_prompt_chars: usize,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub static_dir: PathBuf,
    pub fetch_timeout: Duration,
    pub gemini: GeminiConfig,
    pub summary: SummaryConfig,
}

impl Config {
    /// Reads `.env` (if any) and the process environment. Fails when the
    /// Gemini credential is missing so the server never starts without it.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                PipelineError::Configuration("GEMINI_API_KEY environment variable not set.".to_string())
            })?;

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let ip = IpAddr::from_str(&host)
            .map_err(|e| PipelineError::Configuration(format!("Invalid host address: {}", e)))?;
        let port: u16 = parse_or(&lookup, "PORT", 3000)?;

        let gemini = GeminiConfig {
            api_key: Some(api_key),
            model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: lookup("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            timeout: Duration::from_secs(parse_or(&lookup, "SUMMARIZE_TIMEOUT_SECS", 120)?),
        };

        let summary = SummaryConfig {
            lines: parse_or(&lookup, "SUMMARY_LINES", 5)?,
            language: lookup("SUMMARY_LANGUAGE").unwrap_or_else(|| "Japanese".to_string()),
            max_prompt_chars: parse_or(&lookup, "MAX_PROMPT_CHARS", DEFAULT_MAX_PROMPT_CHARS)?,
        };

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            static_dir: lookup("STATIC_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("public")),
            fetch_timeout: Duration::from_secs(parse_or(&lookup, "FETCH_TIMEOUT_SECS", 30)?),
            gemini,
            summary,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| PipelineError::Configuration(format!("Invalid {}: {}", key, e))),
        None => Ok(default),
    }
}
