//! Runtime configuration, resolved from environment variables with
//! sensible local-dev defaults.

use std::path::PathBuf;

pub const DEFAULT_API_HOST: &str = "127.0.0.1";
pub const DEFAULT_API_PORT: u16 = 7470;
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub api_host: String,
    pub api_port: u16,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub model: String,
}

impl Config {
    pub fn from_env() -> Self {
        let data_dir = std::env::var("CRAM_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("cram")
            });

        let api_host =
            std::env::var("CRAM_API_HOST").unwrap_or_else(|_| DEFAULT_API_HOST.to_string());
        let api_port = std::env::var("CRAM_API_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_API_PORT);

        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        let openai_base_url = std::env::var("CRAM_OPENAI_BASE_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string());
        let model = std::env::var("CRAM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Self {
            data_dir,
            api_host,
            api_port,
            openai_api_key,
            openai_base_url,
            model,
        }
    }
}
