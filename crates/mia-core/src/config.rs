//! Process settings
//!
//! Every knob is both a CLI flag and an environment variable, so the same
//! binary runs unchanged under `docker run -e ...` and from a shell.

use crate::error::ConfigError;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Default bind address
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default listen port
pub const DEFAULT_PORT: u16 = 8000;
/// Default audit database location
pub const DEFAULT_DATABASE_URL: &str = "sqlite:///./test.db";
/// Default vector store directory (relative to the working directory)
pub const DEFAULT_CHROMA_DIR: &str = "./chroma_db";
/// Default Groq chat model
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
/// Default Gemini chat model
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
/// Default HuggingFace feature-extraction endpoint (384-dim MiniLM)
pub const DEFAULT_HF_EMBED_URL: &str =
    "https://api-inference.huggingface.co/pipeline/feature-extraction/sentence-transformers/all-MiniLM-L6-v2";
/// Dimension of the offline hashing embedder
pub const DEFAULT_LOCAL_EMBED_DIM: usize = 384;

/// Chat-completion backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LlmProvider {
    /// Groq OpenAI-compatible API
    Groq,
    /// Google Gemini `generateContent`
    Gemini,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Human readable
    Pretty,
}

/// Where the audit log lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteTarget {
    /// Private in-memory database
    Memory,
    /// Database file
    File(PathBuf),
}

/// Service settings
#[derive(Debug, Clone, Parser)]
#[command(name = "mia-server", about = "Market Intelligence Agent HTTP service", version)]
pub struct Settings {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Audit log database (`sqlite:///path` or `sqlite://:memory:`)
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    pub database_url: String,

    /// Vector store persistence directory
    #[arg(long, env = "CHROMA_DB_DIR", default_value = DEFAULT_CHROMA_DIR)]
    pub chroma_dir: PathBuf,

    /// Chat-completion provider
    #[arg(long, env = "LLM_PROVIDER", value_enum, default_value_t = LlmProvider::Groq)]
    pub llm_provider: LlmProvider,

    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub groq_api_key: Option<String>,

    #[arg(long, env = "GROQ_MODEL_NAME", default_value = DEFAULT_GROQ_MODEL)]
    pub groq_model_name: String,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    #[arg(long, env = "GEMINI_MODEL_NAME", default_value = DEFAULT_GEMINI_MODEL)]
    pub gemini_model_name: String,

    /// Per-request LLM timeout in seconds
    #[arg(long, env = "LLM_REQUEST_TIMEOUT", default_value_t = 60)]
    pub llm_request_timeout: u64,

    /// `huggingface`, `gemini` or `local`
    #[arg(long, env = "EMBEDDING_PROVIDER", default_value = "huggingface")]
    pub embedding_provider: String,

    #[arg(long, env = "HF_API_TOKEN", hide_env_values = true)]
    pub hf_api_token: Option<String>,

    #[arg(long, env = "HF_EMBED_URL", default_value = DEFAULT_HF_EMBED_URL)]
    pub hf_embed_url: String,

    #[arg(long, env = "LOCAL_EMBED_DIM", default_value_t = DEFAULT_LOCAL_EMBED_DIM)]
    pub local_embed_dim: usize,

    /// Page load timeout in seconds
    #[arg(long, env = "SCRAPER_TIMEOUT", default_value_t = 30)]
    pub scraper_timeout: u64,

    /// Chromium binary used for rendering; plain HTTP fetch when unset
    #[arg(long, env = "CHROMIUM_PATH")]
    pub chromium_path: Option<PathBuf>,

    #[arg(long, env = "NOTION_API_KEY", hide_env_values = true)]
    pub notion_api_key: Option<String>,

    #[arg(long, env = "NOTION_DATABASE_ID")]
    pub notion_database_id: Option<String>,

    /// Report recipient
    #[arg(long, env = "EMAIL_USER")]
    pub email_user: Option<String>,

    #[arg(long, env = "EMAIL_RELAY_URL")]
    pub email_relay_url: Option<String>,

    #[arg(long, env = "EMAIL_RELAY_TOKEN", hide_env_values = true)]
    pub email_relay_token: Option<String>,

    /// Comma separated list of allowed CORS origins
    #[arg(long, env = "CORS_ORIGINS", default_value = "")]
    pub cors_origins: String,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

impl Settings {
    /// Allowed CORS origins, trimmed, empties dropped
    #[must_use]
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Resolve `database_url` into a SQLite target
    pub fn sqlite_target(&self) -> Result<SqliteTarget, ConfigError> {
        let url = self.database_url.trim();
        let rest = url
            .strip_prefix("sqlite:///")
            .or_else(|| url.strip_prefix("sqlite://"))
            .ok_or_else(|| ConfigError::UnsupportedDatabaseUrl(url.to_string()))?;

        match rest {
            "" | ":memory:" => Ok(SqliteTarget::Memory),
            path => Ok(SqliteTarget::File(PathBuf::from(path))),
        }
    }

    /// Socket address string for the listener
    #[inline]
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[inline]
    #[must_use]
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_request_timeout)
    }

    #[inline]
    #[must_use]
    pub fn scraper_timeout(&self) -> Duration {
        Duration::from_secs(self.scraper_timeout)
    }

    /// Groq key, if set to something non-blank
    #[inline]
    #[must_use]
    pub fn groq_key(&self) -> Option<&str> {
        secret(self.groq_api_key.as_ref())
    }

    #[inline]
    #[must_use]
    pub fn gemini_key(&self) -> Option<&str> {
        secret(self.gemini_api_key.as_ref())
    }

    #[inline]
    #[must_use]
    pub fn hf_token(&self) -> Option<&str> {
        secret(self.hf_api_token.as_ref())
    }

    #[inline]
    #[must_use]
    pub fn notion_key(&self) -> Option<&str> {
        secret(self.notion_api_key.as_ref())
    }

    #[inline]
    #[must_use]
    pub fn email_recipient(&self) -> Option<&str> {
        secret(self.email_user.as_ref())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            chroma_dir: PathBuf::from(DEFAULT_CHROMA_DIR),
            llm_provider: LlmProvider::Groq,
            groq_api_key: None,
            groq_model_name: DEFAULT_GROQ_MODEL.to_string(),
            gemini_api_key: None,
            gemini_model_name: DEFAULT_GEMINI_MODEL.to_string(),
            llm_request_timeout: 60,
            embedding_provider: "huggingface".to_string(),
            hf_api_token: None,
            hf_embed_url: DEFAULT_HF_EMBED_URL.to_string(),
            local_embed_dim: DEFAULT_LOCAL_EMBED_DIM,
            scraper_timeout: 30,
            chromium_path: None,
            notion_api_key: None,
            notion_database_id: None,
            email_user: None,
            email_relay_url: None,
            email_relay_token: None,
            cors_origins: String::new(),
            log_format: LogFormat::Json,
        }
    }
}

fn secret(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_settings_match_container_contract() {
        let settings = Settings::default();
        assert_eq!(settings.bind_addr(), "0.0.0.0:8000");
        assert_eq!(settings.chroma_dir, PathBuf::from("./chroma_db"));
        assert_eq!(settings.llm_provider, LlmProvider::Groq);
    }

    #[test]
    fn cors_origins_are_trimmed_and_filtered() {
        let settings = Settings {
            cors_origins: " https://a.example , ,https://b.example,".to_string(),
            ..Settings::default()
        };
        assert_eq!(
            settings.cors_origins(),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert!(Settings::default().cors_origins().is_empty());
    }

    #[test]
    fn sqlite_target_parsing() {
        let mut settings = Settings::default();
        assert_eq!(
            settings.sqlite_target().unwrap(),
            SqliteTarget::File(PathBuf::from("./test.db"))
        );

        settings.database_url = "sqlite:////var/lib/mia/audit.db".to_string();
        assert_eq!(
            settings.sqlite_target().unwrap(),
            SqliteTarget::File(PathBuf::from("/var/lib/mia/audit.db"))
        );

        settings.database_url = "sqlite://:memory:".to_string();
        assert_eq!(settings.sqlite_target().unwrap(), SqliteTarget::Memory);

        settings.database_url = "postgres://localhost/mia".to_string();
        assert!(matches!(
            settings.sqlite_target(),
            Err(ConfigError::UnsupportedDatabaseUrl(_))
        ));
    }

    #[test]
    fn blank_secrets_are_treated_as_missing() {
        let settings = Settings {
            groq_api_key: Some("   ".to_string()),
            gemini_api_key: Some("key".to_string()),
            ..Settings::default()
        };
        assert_eq!(settings.groq_key(), None);
        assert_eq!(settings.gemini_key(), Some("key"));
    }

    #[test]
    fn cli_flags_parse() {
        let settings = Settings::try_parse_from([
            "mia-server",
            "--port",
            "9100",
            "--llm-provider",
            "gemini",
            "--log-format",
            "pretty",
            "--scraper-timeout",
            "5",
        ])
        .unwrap();

        assert_eq!(settings.port, 9100);
        assert_eq!(settings.llm_provider, LlmProvider::Gemini);
        assert_eq!(settings.log_format, LogFormat::Pretty);
        assert_eq!(settings.scraper_timeout(), Duration::from_secs(5));
    }
}
